use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ycode_core::YcodeError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named partition of the memory store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Profile,
    Daily(NaiveDate),
    Project(String),
    Note(String),
}

impl Scope {
    /// Where this scope lives under the memory root.
    pub fn path(&self, root: &Path) -> PathBuf {
        match self {
            Scope::Profile => root.join("profile.json"),
            Scope::Daily(date) => root
                .join("daily")
                .join(format!("{}.json", date.format(DATE_FORMAT))),
            Scope::Project(key) => root.join("project").join(key).join("memory.json"),
            Scope::Note(title) => root.join("notes").join(format!("{title}.md")),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Scope::Profile => "profile".into(),
            Scope::Daily(date) => format!("daily {}", date.format(DATE_FORMAT)),
            Scope::Project(key) => format!("project {key}"),
            Scope::Note(title) => format!("note {title}"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Profile => write!(f, "profile"),
            Scope::Daily(date) => write!(f, "daily:{}", date.format(DATE_FORMAT)),
            Scope::Project(key) => write!(f, "project:{key}"),
            Scope::Note(title) => write!(f, "notes:{title}"),
        }
    }
}

/// Writable memory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryCategory {
    Profile,
    Daily,
    Project,
}

impl FromStr for MemoryCategory {
    type Err = YcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Ok(Self::Profile),
            "daily" => Ok(Self::Daily),
            "project" => Ok(Self::Project),
            _ => Err(YcodeError::validation(
                "category must be profile, daily or project",
            )),
        }
    }
}

/// Parse a `YYYY-MM-DD` date, or `today` when absent or blank.
pub fn parse_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, YcodeError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(today),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| {
            YcodeError::validation("date must be in YYYY-MM-DD format for daily memory")
        }),
    }
}

/// Turn a directory name or user-supplied key into a safe project key.
///
/// Keeps `[a-zA-Z0-9._-]`, maps everything else to `-`, collapses runs of
/// `-`, trims separators from both ends and lowercases.
pub fn sanitize_project_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c.to_ascii_lowercase()
        } else {
            '-'
        };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches(|c| matches!(c, '.' | '_' | '-')).to_string()
}

use serde::Serialize;
use std::path::{Path, PathBuf};
use ycode_core::{Result, YcodeError};

/// A skill parsed from a `SKILL.md` file.
#[derive(Debug, Clone, Serialize)]
pub struct SkillDefinition {
    pub name: String,
    /// Shown in the system prompt and the `Skill` tool description.
    pub description: String,
    pub tags: Vec<String>,
    /// Markdown after the frontmatter, with `{baseDir}` resolved.
    #[serde(skip)]
    pub body: String,
    pub file_path: PathBuf,
    /// Directory holding `SKILL.md`.
    pub base_dir: PathBuf,
}

impl SkillDefinition {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| YcodeError::Skill(format!("failed to read {}: {e}", path.display())))?;
        let base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&content, path.to_path_buf(), base_dir)
    }

    /// Parse `SKILL.md` text. Requires a `---` frontmatter block with `name`
    /// and `description`.
    pub fn parse(content: &str, file_path: PathBuf, base_dir: PathBuf) -> Result<Self> {
        let (frontmatter, body) = split_frontmatter(content)?;

        let mut name = String::new();
        let mut description = String::new();
        let mut tags = Vec::new();
        for line in frontmatter.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key.trim() {
                "name" => name = unquote(value),
                "description" => description = unquote(value),
                "tags" => {
                    tags = value
                        .trim()
                        .trim_start_matches('[')
                        .trim_end_matches(']')
                        .split(',')
                        .map(unquote)
                        .filter(|t| !t.is_empty())
                        .collect();
                }
                _ => {}
            }
        }

        if name.is_empty() {
            return Err(YcodeError::Skill(format!(
                "{}: skill name is empty",
                file_path.display()
            )));
        }
        if description.is_empty() {
            return Err(YcodeError::Skill(format!("skill '{name}' has no description")));
        }

        let body = body.replace("{baseDir}", &base_dir.to_string_lossy());
        Ok(Self {
            name,
            description,
            tags,
            body,
            file_path,
            base_dir,
        })
    }
}

fn split_frontmatter(content: &str) -> Result<(&str, &str)> {
    let trimmed = content.trim_start();
    let rest = trimmed
        .strip_prefix("---")
        .ok_or_else(|| YcodeError::Skill("SKILL.md must start with a --- frontmatter block".into()))?;
    let end = rest
        .find("\n---")
        .ok_or_else(|| YcodeError::Skill("SKILL.md: missing closing --- for frontmatter".into()))?;
    let frontmatter = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('-');
    Ok((frontmatter.trim(), body.trim()))
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let quoted = s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')));
    if quoted {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

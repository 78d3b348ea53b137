use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use ycode_core::{Result, YcodeError};

use crate::definition::SkillDefinition;

/// Resource folders listed after a loaded skill's body.
const RESOURCE_DIRS: [(&str, &str); 3] = [
    ("scripts", "Scripts"),
    ("references", "References"),
    ("assets", "Assets"),
];

/// Discovers and serves `SKILL.md` definitions.
///
/// Directories are searched in order; a skill name found in an earlier
/// directory shadows the same name in later ones.
pub struct SkillRegistry {
    skills: HashMap<String, SkillDefinition>,
    skills_dirs: Vec<PathBuf>,
}

impl SkillRegistry {
    pub fn new(dirs: &[PathBuf]) -> Self {
        Self {
            skills: HashMap::new(),
            skills_dirs: dirs.to_vec(),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Build a registry over `dirs` and load everything in them.
    pub fn discover_in(dirs: &[PathBuf]) -> Result<Self> {
        let mut registry = Self::new(dirs);
        registry.discover()?;
        Ok(registry)
    }

    /// Load every `<dir>/<skill>/SKILL.md`. Unparseable skills are logged and skipped.
    pub fn discover(&mut self) -> Result<Vec<String>> {
        let mut loaded = Vec::new();

        for dir in self.skills_dirs.clone() {
            if !dir.is_dir() {
                debug!(?dir, "skills directory does not exist, skipping");
                continue;
            }

            let entries = std::fs::read_dir(&dir).map_err(|e| {
                YcodeError::Skill(format!("failed to read skills dir {}: {e}", dir.display()))
            })?;
            let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
            paths.sort();

            for path in paths {
                let skill_md = path.join("SKILL.md");
                if !path.is_dir() || !skill_md.is_file() {
                    continue;
                }
                match SkillDefinition::from_file(&skill_md) {
                    Ok(def) if self.skills.contains_key(&def.name) => {
                        debug!(skill = %def.name, path = ?skill_md, "shadowed by an earlier skills directory");
                    }
                    Ok(def) => {
                        info!(skill = %def.name, path = ?skill_md, "loaded skill");
                        loaded.push(def.name.clone());
                        self.skills.insert(def.name.clone(), def);
                    }
                    Err(e) => warn!(path = ?skill_md, error = %e, "failed to load skill"),
                }
            }
        }

        Ok(loaded)
    }

    pub fn register(&mut self, def: SkillDefinition) {
        self.skills.insert(def.name.clone(), def);
    }

    pub fn get(&self, name: &str) -> Option<&SkillDefinition> {
        self.skills.get(name)
    }

    /// All skills, sorted by name.
    pub fn list(&self) -> Vec<&SkillDefinition> {
        let mut skills: Vec<_> = self.skills.values().collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    pub fn names(&self) -> Vec<String> {
        self.list().into_iter().map(|s| s.name.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// One `- name: description` line per skill.
    pub fn descriptions(&self) -> String {
        if self.skills.is_empty() {
            return "(no skills available)".to_string();
        }
        self.list()
            .iter()
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full text of a skill: heading, body, and any bundled resources.
    pub fn content(&self, name: &str) -> Option<String> {
        let skill = self.skills.get(name)?;
        let mut out = format!("# Skill: {}\n\n{}", skill.name, skill.body);

        let resources = list_resources(&skill.base_dir);
        if !resources.is_empty() {
            out.push_str(&format!(
                "\n\n**Available resources in {}:**\n",
                skill.base_dir.display()
            ));
            out.push_str(&resources.join("\n"));
        }
        Some(out)
    }
}

fn list_resources(base_dir: &Path) -> Vec<String> {
    RESOURCE_DIRS
        .iter()
        .filter_map(|(dir, label)| {
            let entries = std::fs::read_dir(base_dir.join(dir)).ok()?;
            let mut files: Vec<String> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            if files.is_empty() {
                return None;
            }
            files.sort();
            Some(format!("- {label}: {}", files.join(", ")))
        })
        .collect()
}

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use ycode_core::Result;

use crate::item::MemoryItem;

/// Read a scope list. Missing or blank files are empty lists.
///
/// A file that does not parse is copied aside to `<file>.broken-<timestamp>`,
/// reset to an empty list, and treated as empty.
pub(crate) fn load_list(path: &Path) -> Result<Vec<MemoryItem>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read(path)?;
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Vec<MemoryItem>>(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            let backup = quarantine(path)?;
            warn!(path = %path.display(), backup = %backup.display(), error = %e, "memory file is corrupt, starting empty");
            save_list(path, &[])?;
            Ok(Vec::new())
        }
    }
}

fn quarantine(path: &Path) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let backup = PathBuf::from(format!("{}.broken-{stamp}", path.display()));
    fs::copy(path, &backup)?;
    Ok(backup)
}

/// Write a scope list as pretty JSON via a sibling temp file and rename.
pub(crate) fn save_list(path: &Path, items: &[MemoryItem]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(items)?;
    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), items = items.len(), "memory file written");
    Ok(())
}

/// Stems of files in `dir` with the given extension, sorted.
pub(crate) fn list_stems(dir: &Path, extension: &str) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut stems = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

/// Names of subdirectories of `dir`, sorted.
pub(crate) fn list_dirs(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_missing_and_blank_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        assert!(load_list(&path).unwrap().is_empty());
        fs::write(&path, "  \n").unwrap();
        assert!(load_list(&path).unwrap().is_empty());
    }

    #[test]
    fn test_roundtrip_via_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily").join("2024-01-05.json");
        let item = MemoryItem::new("Buy milk", &[], Utc::now().fixed_offset());
        save_list(&path, std::slice::from_ref(&item)).unwrap();
        assert_eq!(load_list(&path).unwrap(), vec![item]);
        assert!(!dir.path().join("daily").join("2024-01-05.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(load_list(&path).unwrap().is_empty());

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("profile.json.broken-"))
            .collect();
        assert_eq!(backups.len(), 1);
        let saved = fs::read_to_string(dir.path().join(&backups[0])).unwrap();
        assert_eq!(saved, "{ not json");
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_list_stems_filters_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.md"), "").unwrap();
        fs::write(dir.path().join("a.md"), "").unwrap();
        fs::write(dir.path().join("c.txt"), "").unwrap();
        assert_eq!(list_stems(dir.path(), "md").unwrap(), vec!["a", "b"]);
        assert!(list_stems(&dir.path().join("nope"), "md").unwrap().is_empty());
    }
}

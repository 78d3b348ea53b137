#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use ycode_skills::SkillRegistry;

    fn write_skill(root: &Path, dir: &str, name: &str, description: &str, body: &str) {
        let skill_dir = root.join(dir);
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(
            skill_dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n\n{body}\n"),
        )
        .unwrap();
    }

    mod discovery {
        use super::*;

        #[test]
        fn test_discover_skips_non_skills() {
            let dir = tempfile::tempdir().unwrap();
            write_skill(dir.path(), "pdf", "pdf", "Work with PDFs", "# PDF");
            write_skill(dir.path(), "review", "review", "Review a diff", "# Review");
            fs::create_dir_all(dir.path().join("notes")).unwrap();
            fs::write(dir.path().join("notes/README.md"), "not a skill").unwrap();
            fs::write(dir.path().join("stray.md"), "loose file").unwrap();

            let reg = SkillRegistry::discover_in(&[dir.path().to_path_buf()]).unwrap();
            assert_eq!(reg.names(), vec!["pdf", "review"]);
        }

        #[test]
        fn test_invalid_skill_is_skipped() {
            let dir = tempfile::tempdir().unwrap();
            write_skill(dir.path(), "ok", "ok", "Fine", "Body");
            fs::create_dir_all(dir.path().join("broken")).unwrap();
            fs::write(dir.path().join("broken/SKILL.md"), "no frontmatter here").unwrap();

            let reg = SkillRegistry::discover_in(&[dir.path().to_path_buf()]).unwrap();
            assert_eq!(reg.names(), vec!["ok"]);
        }

        #[test]
        fn test_earlier_directory_wins() {
            let project = tempfile::tempdir().unwrap();
            let user = tempfile::tempdir().unwrap();
            write_skill(project.path(), "dup", "dup", "Project version", "P");
            write_skill(user.path(), "dup", "dup", "User version", "U");

            let reg = SkillRegistry::discover_in(&[
                project.path().to_path_buf(),
                user.path().to_path_buf(),
            ])
            .unwrap();
            assert_eq!(reg.get("dup").unwrap().description, "Project version");
        }

        #[test]
        fn test_missing_directory_is_empty() {
            let mut reg = SkillRegistry::new(&["/nonexistent/ycode/skills".into()]);
            assert!(reg.discover().unwrap().is_empty());
            assert!(reg.is_empty());
        }
    }

    mod content {
        use super::*;

        #[test]
        fn test_content_lists_resources() {
            let dir = tempfile::tempdir().unwrap();
            write_skill(
                dir.path(),
                "pdf",
                "pdf",
                "Work with PDFs",
                "Run {baseDir}/scripts/extract.py",
            );
            let base = dir.path().join("pdf");
            fs::create_dir_all(base.join("scripts")).unwrap();
            fs::write(base.join("scripts/extract.py"), "print()").unwrap();
            fs::write(base.join("scripts/merge.py"), "print()").unwrap();
            fs::create_dir_all(base.join("assets")).unwrap();

            let reg = SkillRegistry::discover_in(&[dir.path().to_path_buf()]).unwrap();
            let text = reg.content("pdf").unwrap();

            assert!(text.starts_with("# Skill: pdf\n\nRun "));
            assert!(text.contains(&format!("{}/scripts/extract.py", base.display())));
            assert!(text.contains(&format!("**Available resources in {}:**", base.display())));
            assert!(text.ends_with("- Scripts: extract.py, merge.py"));
            assert!(!text.contains("Assets"));
        }
    }
}

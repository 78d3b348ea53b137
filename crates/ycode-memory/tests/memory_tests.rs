#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, NaiveDate};
    use std::fs;
    use std::path::Path;
    use ycode_memory::{MemoryItem, MemorySettings, MemoryStore, MemoryWrite, Scope};

    fn settings(dir: &Path) -> MemorySettings {
        let mut settings = MemorySettings::new(dir.join("memory"), dir.join("My Repo"));
        // Fixed historical dates below must stay inside the window.
        settings.retention_days = 36_500;
        settings
    }

    fn open(dir: &Path) -> MemoryStore {
        MemoryStore::open(settings(dir)).unwrap()
    }

    // ── Writes ─────────────────────────────────────────────────

    mod writes {
        use super::*;

        #[test]
        fn test_profile_save_then_dedup() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());

            let status = store
                .add_memory(&MemoryWrite::new("profile", "Prefers tabs").tagged(&["style"]))
                .unwrap();
            assert_eq!(status, "Memory saved: profile.");

            let status = store
                .add_memory(&MemoryWrite::new("profile", "  PREFERS TABS ").tagged(&["errand"]))
                .unwrap();
            assert_eq!(status, "Memory updated: profile item already exists.");

            let items = store.load_scope(&Scope::Profile).unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].content, "Prefers tabs");
            assert!(items[0].updated_at.is_some());
            assert!(items[0].has_tag("style"));
            assert!(items[0].has_tag("errand"));
        }

        #[test]
        fn test_daily_with_explicit_date() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());

            let status = store
                .add_memory(&MemoryWrite::new("daily", "Buy milk").on_date("2024-01-05"))
                .unwrap();
            assert_eq!(status, "Memory saved: daily 2024-01-05.");
            assert!(dir.path().join("memory/daily/2024-01-05.json").is_file());

            let status = store
                .add_memory(&MemoryWrite::new("daily", "buy milk").on_date("2024-01-05"))
                .unwrap();
            assert_eq!(status, "Memory updated: daily 2024-01-05 item already exists.");
        }

        #[test]
        fn test_daily_defaults_to_today() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store.add_memory(&MemoryWrite::new("daily", "Standup at ten")).unwrap();
            let today = Local::now().date_naive();
            assert_eq!(store.load_scope(&Scope::Daily(today)).unwrap().len(), 1);
        }

        #[test]
        fn test_project_key_from_workdir_and_explicit() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());

            let status = store
                .add_memory(&MemoryWrite::new("project", "Uses cargo workspaces"))
                .unwrap();
            assert_eq!(status, "Memory saved: project my-repo.");
            assert!(dir.path().join("memory/project/my-repo/memory.json").is_file());

            let status = store
                .add_memory(&MemoryWrite::new("project", "Ships weekly").in_project("Other App"))
                .unwrap();
            assert_eq!(status, "Memory saved: project other-app.");
        }

        #[test]
        fn test_configured_project_override() {
            let dir = tempfile::tempdir().unwrap();
            let mut s = settings(dir.path());
            s.project = Some("Pinned".into());
            let store = MemoryStore::open(s).unwrap();
            assert_eq!(store.project_key(None).unwrap(), "pinned");
            assert_eq!(store.project_key(Some("explicit")).unwrap(), "explicit");
        }

        #[test]
        fn test_validation_errors() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());

            let err = store.add_memory(&MemoryWrite::new("profile", "   ")).unwrap_err();
            assert_eq!(err.to_string(), "memory content cannot be empty");

            let err = store.add_memory(&MemoryWrite::new("weekly", "x")).unwrap_err();
            assert_eq!(err.to_string(), "category must be profile, daily or project");

            let err = store
                .add_memory(&MemoryWrite::new("daily", "x").on_date("01/05/2024"))
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                "date must be in YYYY-MM-DD format for daily memory"
            );

            let err = store
                .add_memory(&MemoryWrite::new("project", "x").in_project("!!!"))
                .unwrap_err();
            assert_eq!(err.to_string(), "project key cannot be empty");
        }

        #[test]
        fn test_cap_evicts_least_recently_updated() {
            let dir = tempfile::tempdir().unwrap();
            let mut s = settings(dir.path());
            s.profile_cap = 2;
            let store = MemoryStore::open(s).unwrap();

            store.add_memory(&MemoryWrite::new("profile", "first")).unwrap();
            store.add_memory(&MemoryWrite::new("profile", "second")).unwrap();
            store.add_memory(&MemoryWrite::new("profile", "third")).unwrap();

            let contents: Vec<String> = store
                .load_scope(&Scope::Profile)
                .unwrap()
                .into_iter()
                .map(|i| i.content)
                .collect();
            assert_eq!(contents, vec!["second", "third"]);
        }

        #[test]
        fn test_corrupt_scope_file_recovers() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            fs::write(dir.path().join("memory/profile.json"), "[{oops").unwrap();

            let status = store.add_memory(&MemoryWrite::new("profile", "fresh")).unwrap();
            assert_eq!(status, "Memory saved: profile.");
            assert_eq!(store.load_scope(&Scope::Profile).unwrap().len(), 1);

            let broken = fs::read_dir(dir.path().join("memory"))
                .unwrap()
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().starts_with("profile.json.broken-"));
            assert!(broken);
        }

        #[test]
        fn test_concurrent_writes_same_scope_all_persist() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());

            std::thread::scope(|scope| {
                for i in 0..8 {
                    let store = &store;
                    scope.spawn(move || {
                        let status = store
                            .add_memory(&MemoryWrite::new("profile", &format!("habit number {i}")))
                            .unwrap();
                        assert_eq!(status, "Memory saved: profile.");
                    });
                }
            });

            let mut contents: Vec<String> = store
                .load_scope(&Scope::Profile)
                .unwrap()
                .into_iter()
                .map(|i| i.content)
                .collect();
            contents.sort();
            let expected: Vec<String> = (0..8).map(|i| format!("habit number {i}")).collect();
            assert_eq!(contents, expected);
        }

        #[test]
        fn test_saved_event_published() {
            let dir = tempfile::tempdir().unwrap();
            let bus = ycode_core::EventBus::default();
            let mut rx = bus.subscribe();
            let store = open(dir.path()).with_events(bus);

            store.add_memory(&MemoryWrite::new("profile", "Likes Rust")).unwrap();
            match rx.try_recv().unwrap() {
                ycode_core::Event::MemorySaved { scope, updated } => {
                    assert_eq!(scope, "profile");
                    assert!(!updated);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    // ── Retention ──────────────────────────────────────────────

    mod retention {
        use super::*;

        fn seed_daily(root: &Path, day: NaiveDate, content: &str) {
            let now = Local::now().fixed_offset();
            let items = vec![MemoryItem::new(content, &[], now)];
            let path = Scope::Daily(day).path(root);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, serde_json::to_string(&items).unwrap()).unwrap();
        }

        #[test]
        fn test_expired_daily_files_deleted_once() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("memory");
            let today = Local::now().date_naive();
            let old = today - Duration::days(40);
            let recent = today - Duration::days(2);
            seed_daily(&root, old, "ancient errand");
            seed_daily(&root, recent, "recent errand");

            let mut s = settings(dir.path());
            s.retention_days = 30;
            let store = MemoryStore::open(s).unwrap();
            store.add_memory(&MemoryWrite::new("profile", "anything")).unwrap();

            assert!(!Scope::Daily(old).path(&root).exists());
            assert!(Scope::Daily(recent).path(&root).exists());

            // Later expirations wait for the next process.
            seed_daily(&root, old, "ancient again");
            assert_eq!(store.purge_expired_daily().unwrap(), 0);
            assert!(Scope::Daily(old).path(&root).exists());
        }

        #[test]
        fn test_search_ignores_days_outside_window() {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("memory");
            let mut s = settings(dir.path());
            s.retention_days = 30;
            let store = MemoryStore::open(s).unwrap();
            // Purge has already run, so the stale file survives on disk.
            store.purge_expired_daily().unwrap();
            seed_daily(&root, Local::now().date_naive() - Duration::days(90), "lost errand");

            assert_eq!(store.search("errand", 8).unwrap(), "No matching memories.");
        }
    }

    // ── Search ─────────────────────────────────────────────────

    mod search {
        use super::*;

        #[test]
        fn test_search_finds_daily_item() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store
                .add_memory(&MemoryWrite::new("daily", "Buy milk").on_date("2024-01-05").tagged(&["errand"]))
                .unwrap();
            store.add_memory(&MemoryWrite::new("profile", "Likes coffee")).unwrap();

            let out = store.search("milk errand", 8).unwrap();
            assert_eq!(out, "- [daily:2024-01-05] (score 2) Buy milk  #errand");
        }

        #[test]
        fn test_search_orders_by_score() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store.add_memory(&MemoryWrite::new("profile", "rust tests")).unwrap();
            store.add_memory(&MemoryWrite::new("project", "rust tests run in ci")).unwrap();

            let hits = store.search_hits("rust tests ci", 8).unwrap();
            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].scope, Scope::Project("my-repo".into()));
            assert_eq!(hits[0].score, 3);
            assert_eq!(hits[1].scope, Scope::Profile);
        }

        #[test]
        fn test_search_no_match_and_limit() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            assert_eq!(store.search("anything", 8).unwrap(), "No matching memories.");

            for n in 0..3 {
                store
                    .add_memory(&MemoryWrite::new("profile", &format!("deploy step {n}")))
                    .unwrap();
            }
            assert_eq!(store.search_hits("deploy", 0).unwrap().len(), 1);
            assert_eq!(store.search_hits("deploy", 2).unwrap().len(), 2);
        }

        #[test]
        fn test_search_reads_notes() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            let notes = dir.path().join("memory/notes");
            fs::create_dir_all(&notes).unwrap();
            fs::write(notes.join("deploy.md"), "# Deploy checklist\n\nRun migrations first.").unwrap();

            let hits = store.search_hits("migrations", 8).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].scope, Scope::Note("deploy".into()));
            assert_eq!(hits[0].content, "Deploy checklist");
        }

        #[test]
        fn test_non_utf8_note_does_not_break_reads() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store.add_memory(&MemoryWrite::new("profile", "Prefers tabs")).unwrap();
            let notes = dir.path().join("memory/notes");
            fs::create_dir_all(&notes).unwrap();
            fs::write(notes.join("bin.md"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

            let rendered = store.search("tabs", 8).unwrap();
            assert!(rendered.contains("Prefers tabs"), "{rendered}");

            let text = store
                .build_context_block(Some("tabs"), 12)
                .unwrap()
                .unwrap()
                .text_content();
            assert!(text.contains("- Prefers tabs"));
        }

        #[test]
        fn test_search_cjk() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store.add_memory(&MemoryWrite::new("profile", "喜欢喝茶")).unwrap();
            let hits = store.search_hits("茶", 8).unwrap();
            assert_eq!(hits.len(), 1);
        }
    }

    // ── Context block ──────────────────────────────────────────

    mod context {
        use super::*;
        use ycode_core::Role;

        #[test]
        fn test_empty_store_has_no_block() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            assert!(store.build_context_block(Some("hello"), 12).unwrap().is_none());
        }

        #[test]
        fn test_block_sections_in_order() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            let yesterday = (Local::now().date_naive() - Duration::days(1))
                .format("%Y-%m-%d")
                .to_string();

            store.add_memory(&MemoryWrite::new("profile", "Prefers tabs")).unwrap();
            store.add_memory(&MemoryWrite::new("project", "Uses cargo")).unwrap();
            store.add_memory(&MemoryWrite::new("daily", "Standup at ten")).unwrap();
            store
                .add_memory(&MemoryWrite::new("daily", "Fixed parser bug").on_date(&yesterday))
                .unwrap();
            fs::write(
                dir.path().join("memory/project/my-repo/AGENTS.md"),
                "Run clippy before commits.\n",
            )
            .unwrap();
            let notes = dir.path().join("memory/notes");
            fs::create_dir_all(&notes).unwrap();
            fs::write(notes.join("parser.md"), "Parser design notes").unwrap();

            let msg = store
                .build_context_block(Some("what about the parser?"), 12)
                .unwrap()
                .unwrap();
            assert_eq!(msg.role, Role::User);
            let text = msg.text_content();
            assert!(text.starts_with("<memory>\n"));
            assert!(text.ends_with("\n</memory>"));

            let order = [
                "profile:\n- Prefers tabs",
                "project (my-repo):\n- Uses cargo",
                "project instructions (my-repo):\nRun clippy before commits.",
                "- Standup at ten",
                &format!("related daily:\n- [{yesterday}] Fixed parser bug"),
                "related notes:\n- parser: Parser design notes",
            ];
            let mut last = 0;
            for section in order {
                let pos = text.find(section).unwrap_or_else(|| panic!("missing {section}"));
                assert!(pos >= last, "{section} out of order");
                last = pos;
            }
        }

        #[test]
        fn test_profile_items_limited_newest_first() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store.add_memory(&MemoryWrite::new("profile", "older")).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
            store.add_memory(&MemoryWrite::new("profile", "newer")).unwrap();

            let text = store.build_context_block(None, 1).unwrap().unwrap().text_content();
            assert!(text.contains("- newer"));
            assert!(!text.contains("- older"));
        }

        #[test]
        fn test_related_daily_skips_without_input() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            store
                .add_memory(&MemoryWrite::new("daily", "Parser bug").on_date("2024-01-05"))
                .unwrap();
            assert!(store.build_context_block(None, 12).unwrap().is_none());
            let text = store
                .build_context_block(Some("parser"), 12)
                .unwrap()
                .unwrap()
                .text_content();
            assert!(text.contains("- [2024-01-05] Parser bug"));
        }
    }

    // ── Heartbeat ──────────────────────────────────────────────

    mod heartbeat {
        use super::*;

        #[test]
        fn test_heartbeat_capture_rules() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());
            let today = Scope::Daily(Local::now().date_naive());

            assert!(!store.maybe_save_heartbeat("hi", 1).unwrap());
            assert!(
                store
                    .maybe_save_heartbeat("refactor   the config\nloader please", 1)
                    .unwrap()
            );
            // Cooldown.
            assert!(!store.maybe_save_heartbeat("another substantial request", 3).unwrap());
            // Same text after cooldown.
            assert!(!store.maybe_save_heartbeat("Refactor the config loader please", 8).unwrap());
            assert!(store.maybe_save_heartbeat("another substantial request", 8).unwrap());

            let items = store.load_scope(&today).unwrap();
            assert_eq!(items.len(), 2);
            assert_eq!(items[0].content, "refactor the config loader please");
            assert!(items[0].has_tag("heartbeat"));
            assert!(items[0].has_tag("auto"));
        }

        #[test]
        fn test_concurrent_heartbeats_save_once() {
            let dir = tempfile::tempdir().unwrap();
            let store = open(dir.path());

            let saved = std::thread::scope(|scope| {
                let handles: Vec<_> = (0..6)
                    .map(|_| {
                        let store = &store;
                        scope.spawn(move || {
                            store
                                .maybe_save_heartbeat("please rework the session loader", 4)
                                .unwrap()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap())
                    .filter(|saved| *saved)
                    .count()
            });
            assert_eq!(saved, 1);

            let items = store
                .load_scope(&Scope::Daily(Local::now().date_naive()))
                .unwrap();
            assert_eq!(items.len(), 1);
        }

        #[test]
        fn test_heartbeat_truncates_long_input() {
            let dir = tempfile::tempdir().unwrap();
            let mut s = settings(dir.path());
            s.heartbeat_max_chars = 20;
            let store = MemoryStore::open(s).unwrap();

            let long = "word ".repeat(40);
            assert!(store.maybe_save_heartbeat(&long, 1).unwrap());
            let items = store
                .load_scope(&Scope::Daily(Local::now().date_naive()))
                .unwrap();
            assert_eq!(items[0].content.chars().count(), 20);
        }
    }
}

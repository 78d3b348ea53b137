use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

use ycode_config::YcodeConfig;
use ycode_core::{Event, EventBus, Message, Result, Role, YcodeError};

use crate::files::{list_dirs, list_stems, load_list, save_list};
use crate::heartbeat::{HeartbeatState, cap_chars, compact};
use crate::item::{MemoryItem, enforce_cap, newest_first, upsert};
use crate::scope::{DATE_FORMAT, MemoryCategory, Scope, parse_date, sanitize_project_key};
use crate::search::{MemoryHit, rank, score_item, score_text, tokenize};

const RELATED_DAILY_LIMIT: usize = 5;
const RELATED_NOTES_LIMIT: usize = 3;
const NOTE_SNIPPET_CHARS: usize = 160;
const INSTRUCTIONS_MAX_CHARS: usize = 4000;
const INSTRUCTIONS_FILE: &str = "AGENTS.md";

/// Limits and locations for a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemorySettings {
    pub root: PathBuf,
    /// Working directory; its name is the default project key.
    pub workdir: PathBuf,
    /// Explicit project key, overriding the working directory name.
    pub project: Option<String>,
    pub profile_cap: usize,
    pub daily_cap: usize,
    pub project_cap: usize,
    pub retention_days: u32,
    pub heartbeat_cooldown_rounds: i64,
    pub heartbeat_min_chars: usize,
    pub heartbeat_max_chars: usize,
}

impl MemorySettings {
    pub fn new(root: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        let defaults = ycode_config::MemoryConfig::default();
        Self {
            root: root.into(),
            workdir: workdir.into(),
            project: None,
            profile_cap: defaults.profile_cap,
            daily_cap: defaults.daily_cap,
            project_cap: defaults.project_cap,
            retention_days: defaults.retention_days,
            heartbeat_cooldown_rounds: defaults.heartbeat_cooldown_rounds,
            heartbeat_min_chars: defaults.heartbeat_min_chars,
            heartbeat_max_chars: defaults.heartbeat_max_chars,
        }
    }

    pub fn from_config(config: &YcodeConfig) -> Self {
        let m = &config.memory;
        Self {
            root: config.memory_root(),
            workdir: config.workdir(),
            project: m.project.clone(),
            profile_cap: m.profile_cap,
            daily_cap: m.daily_cap,
            project_cap: m.project_cap,
            retention_days: m.retention_days,
            heartbeat_cooldown_rounds: m.heartbeat_cooldown_rounds,
            heartbeat_min_chars: m.heartbeat_min_chars,
            heartbeat_max_chars: m.heartbeat_max_chars,
        }
    }
}

/// Arguments of a memory write, as the `MemoryWriter` tool receives them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryWrite {
    pub category: String,
    pub content: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project: Option<String>,
}

impl MemoryWrite {
    pub fn new(category: &str, content: &str) -> Self {
        Self {
            category: category.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn on_date(mut self, date: &str) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn in_project(mut self, project: &str) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Durable, scope-partitioned memory backed by JSON files under one root.
pub struct MemoryStore {
    settings: MemorySettings,
    /// Held across every read-modify-write of a scope file.
    write_lock: Mutex<()>,
    heartbeat: Mutex<HeartbeatState>,
    retention_checked: AtomicBool,
    events: Option<EventBus>,
}

impl MemoryStore {
    /// Open (creating if needed) the memory root.
    pub fn open(settings: MemorySettings) -> Result<Self> {
        info!(root = %settings.root.display(), "opening memory store");
        fs::create_dir_all(&settings.root)?;
        Ok(Self {
            settings,
            write_lock: Mutex::new(()),
            heartbeat: Mutex::new(HeartbeatState::default()),
            retention_checked: AtomicBool::new(false),
            events: None,
        })
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn root(&self) -> &Path {
        &self.settings.root
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Resolve a project key: explicit value, then configured override, then
    /// the working directory name.
    pub fn project_key(&self, explicit: Option<&str>) -> Result<String> {
        let raw = explicit
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.settings.project.clone())
            .or_else(|| {
                self.settings
                    .workdir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_default();
        let key = sanitize_project_key(&raw);
        if key.is_empty() {
            return Err(YcodeError::validation("project key cannot be empty"));
        }
        Ok(key)
    }

    /// Items of a list scope, in file order.
    pub fn load_scope(&self, scope: &Scope) -> Result<Vec<MemoryItem>> {
        if let Scope::Note(title) = scope {
            return Err(YcodeError::Memory(format!(
                "note '{title}' is a document, not an item list"
            )));
        }
        load_list(&scope.path(&self.settings.root))
    }

    fn cap_for(&self, scope: &Scope) -> usize {
        match scope {
            Scope::Profile => self.settings.profile_cap,
            Scope::Daily(_) => self.settings.daily_cap,
            Scope::Project(_) | Scope::Note(_) => self.settings.project_cap,
        }
    }

    fn oldest_retained(&self) -> NaiveDate {
        self.today() - Duration::days(i64::from(self.settings.retention_days))
    }

    /// Delete daily files older than the retention window. Runs at most once
    /// per store; later calls return 0 without touching the disk.
    pub fn purge_expired_daily(&self) -> Result<usize> {
        if self.retention_checked.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let _guard = self.write_lock.lock();
        let cutoff = self.oldest_retained();
        let dir = self.settings.root.join("daily");
        let mut removed = 0;
        for stem in list_stems(&dir, "json")? {
            let Ok(date) = NaiveDate::parse_from_str(&stem, DATE_FORMAT) else {
                continue;
            };
            if date < cutoff {
                fs::remove_file(Scope::Daily(date).path(&self.settings.root))?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "expired daily memory deleted");
        }
        Ok(removed)
    }

    fn ensure_retention(&self) {
        if let Err(e) = self.purge_expired_daily() {
            warn!(error = %e, "daily memory retention pass failed");
        }
    }

    /// Store `write.content` in its scope, or refresh the matching item.
    /// Returns a status line for the caller.
    pub fn add_memory(&self, write: &MemoryWrite) -> Result<String> {
        let content = write.content.trim();
        if content.is_empty() {
            return Err(YcodeError::validation("memory content cannot be empty"));
        }
        let category: MemoryCategory = write.category.parse()?;
        self.ensure_retention();

        let scope = match category {
            MemoryCategory::Profile => Scope::Profile,
            MemoryCategory::Daily => Scope::Daily(parse_date(write.date.as_deref(), self.today())?),
            MemoryCategory::Project => Scope::Project(self.project_key(write.project.as_deref())?),
        };
        let updated = self.write_item(&scope, content, &write.tags)?;

        Ok(if updated {
            format!("Memory updated: {} item already exists.", scope.label())
        } else {
            format!("Memory saved: {}.", scope.label())
        })
    }

    fn write_item(&self, scope: &Scope, content: &str, tags: &[String]) -> Result<bool> {
        let cap = self.cap_for(scope);
        let path = scope.path(&self.settings.root);

        let _guard = self.write_lock.lock();
        let mut items = load_list(&path)?;
        let updated = upsert(&mut items, content, tags, self.now());
        let evicted = enforce_cap(&mut items, cap);
        save_list(&path, &items)?;

        info!(scope = %scope, items = items.len(), updated, evicted, "memory saved");
        if let Some(events) = &self.events {
            events.publish(Event::MemorySaved {
                scope: scope.to_string(),
                updated,
            });
        }
        Ok(updated)
    }

    fn retained_daily_dates(&self) -> Result<Vec<NaiveDate>> {
        let cutoff = self.oldest_retained();
        let mut dates: Vec<NaiveDate> = list_stems(&self.settings.root.join("daily"), "json")?
            .iter()
            .filter_map(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .filter(|d| *d >= cutoff)
            .collect();
        dates.sort();
        Ok(dates)
    }

    fn note_titles(&self) -> Result<Vec<String>> {
        list_stems(&self.settings.root.join("notes"), "md")
    }

    /// Note text for scoring. Invalid UTF-8 is replaced; an unreadable note is skipped.
    fn read_note(&self, title: &str) -> Option<String> {
        let path = Scope::Note(title.into()).path(&self.settings.root);
        match fs::read(&path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable note");
                None
            }
        }
    }

    /// Every list scope that search should visit.
    fn searchable_scopes(&self) -> Result<Vec<Scope>> {
        let mut scopes = vec![Scope::Profile];
        scopes.extend(self.retained_daily_dates()?.into_iter().map(Scope::Daily));
        scopes.extend(
            list_dirs(&self.settings.root.join("project"))?
                .into_iter()
                .map(Scope::Project),
        );
        Ok(scopes)
    }

    /// Scored matches across all scopes, best first.
    pub fn search_hits(&self, query: &str, limit: usize) -> Result<Vec<MemoryHit>> {
        self.ensure_retention();
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for scope in self.searchable_scopes()? {
            for item in self.load_scope(&scope)? {
                let score = score_item(&item, &tokens);
                if score > 0 {
                    hits.push(MemoryHit {
                        scope: scope.clone(),
                        score,
                        content: item.content,
                        tags: item.tags,
                    });
                }
            }
        }
        for title in self.note_titles()? {
            let Some(text) = self.read_note(&title) else {
                continue;
            };
            let score = score_text(&text, &tokens);
            if score > 0 {
                hits.push(MemoryHit {
                    scope: Scope::Note(title),
                    score,
                    content: snippet(&text),
                    tags: Vec::new(),
                });
            }
        }

        rank(&mut hits);
        hits.truncate(limit.clamp(1, 30));
        debug!(query, hits = hits.len(), "memory search");
        Ok(hits)
    }

    /// Search rendered one hit per line.
    pub fn search(&self, query: &str, limit: usize) -> Result<String> {
        let hits = self.search_hits(query, limit)?;
        if hits.is_empty() {
            return Ok("No matching memories.".into());
        }
        Ok(hits.iter().map(MemoryHit::render).collect::<Vec<_>>().join("\n"))
    }

    /// Memory to show the model before a user turn, or `None` when there is nothing.
    pub fn build_context_block(
        &self,
        user_input: Option<&str>,
        max_profile_items: usize,
    ) -> Result<Option<Message>> {
        self.ensure_retention();
        let mut sections: Vec<String> = Vec::new();

        let profile = self.load_scope(&Scope::Profile)?;
        if let Some(s) = bullet_section("profile:", newest_first(&profile, max_profile_items)) {
            sections.push(s);
        }

        if let Ok(key) = self.project_key(None) {
            let project = self.load_scope(&Scope::Project(key.clone()))?;
            if let Some(s) = bullet_section(
                &format!("project ({key}):"),
                newest_first(&project, max_profile_items),
            ) {
                sections.push(s);
            }
            let instructions = self
                .settings
                .root
                .join("project")
                .join(&key)
                .join(INSTRUCTIONS_FILE);
            if instructions.is_file() {
                let text = fs::read_to_string(&instructions)?;
                let text = text.trim();
                if !text.is_empty() {
                    sections.push(format!(
                        "project instructions ({key}):\n{}",
                        cap_chars(text, INSTRUCTIONS_MAX_CHARS)
                    ));
                }
            }
        }

        let today = self.today();
        let todays = self.load_scope(&Scope::Daily(today))?;
        if let Some(s) = bullet_section(
            &format!("daily ({}):", today.format(DATE_FORMAT)),
            todays.iter().collect(),
        ) {
            sections.push(s);
        }

        let tokens = user_input.map(tokenize).unwrap_or_default();
        if !tokens.is_empty() {
            if let Some(s) = self.related_daily(&tokens, today)? {
                sections.push(s);
            }
            if let Some(s) = self.related_notes(&tokens)? {
                sections.push(s);
            }
        }

        if sections.is_empty() {
            return Ok(None);
        }
        let text = format!("<memory>\n{}\n</memory>", sections.join("\n"));
        Ok(Some(Message::text(Uuid::nil(), Role::User, text)))
    }

    fn related_daily(&self, tokens: &[String], today: NaiveDate) -> Result<Option<String>> {
        let mut scored: Vec<(usize, NaiveDate, String)> = Vec::new();
        for date in self.retained_daily_dates()? {
            if date == today {
                continue;
            }
            for item in self.load_scope(&Scope::Daily(date))? {
                let score = score_item(&item, tokens);
                if score > 0 {
                    scored.push((score, date, item.content));
                }
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        scored.truncate(RELATED_DAILY_LIMIT);
        if scored.is_empty() {
            return Ok(None);
        }
        let lines: Vec<String> = scored
            .iter()
            .map(|(_, date, content)| format!("- [{}] {content}", date.format(DATE_FORMAT)))
            .collect();
        Ok(Some(format!("related daily:\n{}", lines.join("\n"))))
    }

    fn related_notes(&self, tokens: &[String]) -> Result<Option<String>> {
        let mut scored: Vec<(usize, String, String)> = Vec::new();
        for title in self.note_titles()? {
            let Some(text) = self.read_note(&title) else {
                continue;
            };
            let score = score_text(&text, tokens);
            if score > 0 {
                scored.push((score, title, snippet(&text)));
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored.truncate(RELATED_NOTES_LIMIT);
        if scored.is_empty() {
            return Ok(None);
        }
        let lines: Vec<String> = scored
            .iter()
            .map(|(_, title, snippet)| format!("- {title}: {snippet}"))
            .collect();
        Ok(Some(format!("related notes:\n{}", lines.join("\n"))))
    }

    /// Capture a compact copy of substantial user input into today's daily
    /// scope, tagged `heartbeat` and `auto`. Returns whether anything was written.
    pub fn maybe_save_heartbeat(&self, user_input: &str, round: i64) -> Result<bool> {
        let compacted = compact(user_input);
        // Held from admission to record so two callers cannot both pass the cooldown.
        let mut state = self.heartbeat.lock();
        let Some(fingerprint) = state.admit(
            &compacted,
            round,
            self.settings.heartbeat_min_chars,
            self.settings.heartbeat_cooldown_rounds,
        ) else {
            return Ok(false);
        };

        self.ensure_retention();
        let content = cap_chars(&compacted, self.settings.heartbeat_max_chars);
        let tags = vec!["heartbeat".to_string(), "auto".to_string()];
        self.write_item(&Scope::Daily(self.today()), &content, &tags)?;
        state.record(round, fingerprint);
        debug!(round, "heartbeat saved");
        Ok(true)
    }
}

fn bullet_section(header: &str, items: Vec<&MemoryItem>) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let mut out = header.to_string();
    for item in items {
        out.push_str("\n- ");
        out.push_str(&item.content);
    }
    Some(out)
}

fn snippet(text: &str) -> String {
    let line = text
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    cap_chars(line, NOTE_SNIPPET_CHARS)
}

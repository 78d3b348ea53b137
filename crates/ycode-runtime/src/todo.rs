use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use ycode_core::{Result, YcodeError};

pub const DEFAULT_MAX_ITEMS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            None | Some("pending") => Ok(Self::Pending),
            Some("in_progress") => Ok(Self::InProgress),
            Some("completed") => Ok(Self::Completed),
            Some(_) => Err(YcodeError::validation(
                "Status must be one of pending, in_progress, completed",
            )),
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        })
    }
}

/// A validated entry on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub active_form: String,
    pub status: TodoStatus,
}

/// One item as the model sends it. Every field is optional here so the
/// board can report which rule an item breaks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTodo {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "activeForm", alias = "active_form")]
    pub active_form: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoCounts {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

/// The plan-tracking list. Updates replace the whole list or nothing.
pub struct TodoBoard {
    items: Mutex<Vec<TodoItem>>,
    max_items: usize,
}

impl Default for TodoBoard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

impl TodoBoard {
    pub fn new(max_items: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            max_items,
        }
    }

    /// Validate `raw` in order and, if every item passes, make it the board.
    pub fn update(&self, raw: &[RawTodo]) -> Result<String> {
        let mut cleaned = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();

        for (i, item) in raw.iter().enumerate() {
            let id = match &item.id {
                None | Some(Value::Null) => (i + 1).to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            if !seen.insert(id.clone()) {
                return Err(YcodeError::validation(format!("Duplicate todo id: {id}")));
            }

            let content = item.content.as_deref().unwrap_or_default().trim().to_string();
            if content.is_empty() {
                return Err(YcodeError::validation("Todo content cannot be empty"));
            }

            let status = TodoStatus::parse(item.status.as_deref())?;

            let active_form = item.active_form.as_deref().unwrap_or_default().trim().to_string();
            if active_form.is_empty() {
                return Err(YcodeError::validation("Todo activeForm cannot be empty"));
            }

            cleaned.push(TodoItem {
                id,
                content,
                active_form,
                status,
            });
            if cleaned.len() > self.max_items {
                return Err(YcodeError::validation(format!(
                    "Todo list is limited to {} items",
                    self.max_items
                )));
            }
        }

        let in_progress = cleaned
            .iter()
            .filter(|t| t.status == TodoStatus::InProgress)
            .count();
        if in_progress > 1 {
            return Err(YcodeError::validation("Only one task can be in_progress at a time"));
        }

        let mut items = self.items.lock();
        *items = cleaned;
        Ok(render_items(&items))
    }

    pub fn render(&self) -> String {
        render_items(&self.items.lock())
    }

    pub fn status(&self) -> TodoCounts {
        let items = self.items.lock();
        TodoCounts {
            total: items.len(),
            completed: items.iter().filter(|t| t.status == TodoStatus::Completed).count(),
            in_progress: items.iter().filter(|t| t.status == TodoStatus::InProgress).count(),
        }
    }

    pub fn items(&self) -> Vec<TodoItem> {
        self.items.lock().clone()
    }
}

fn render_items(items: &[TodoItem]) -> String {
    if items.is_empty() {
        return "☐ No todos yet".to_string();
    }
    items
        .iter()
        .map(|t| match t.status {
            TodoStatus::Completed => format!("☒ ✓ {}", t.content),
            TodoStatus::InProgress => format!("☐ → {}", t.active_form),
            TodoStatus::Pending => format!("☐ ○ {}", t.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

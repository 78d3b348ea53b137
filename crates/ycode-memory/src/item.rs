use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One remembered fact inside a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MemoryItem {
    pub fn new(content: &str, tags: &[String], now: DateTime<FixedOffset>) -> Self {
        let mut item = Self {
            id: Uuid::new_v4().simple().to_string(),
            content: content.trim().to_string(),
            created_at: now,
            updated_at: None,
            tags: Vec::new(),
        };
        item.merge_tags(tags);
        item
    }

    /// When this item was last touched.
    pub fn last_updated(&self) -> DateTime<FixedOffset> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Content as used for dedup and matching.
    pub fn normalized(&self) -> String {
        normalize(&self.content)
    }

    /// Add tags not already present, ignoring case. Blank tags are dropped.
    pub fn merge_tags(&mut self, tags: &[String]) {
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                self.tags.push(tag.to_string());
            }
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }
}

pub fn normalize(content: &str) -> String {
    content.trim().to_lowercase()
}

/// Insert `content` into `items`, or refresh the existing item with the same
/// normalized content. Returns true when an existing item was updated.
pub(crate) fn upsert(
    items: &mut Vec<MemoryItem>,
    content: &str,
    tags: &[String],
    now: DateTime<FixedOffset>,
) -> bool {
    let key = normalize(content);
    if let Some(existing) = items.iter_mut().find(|i| i.normalized() == key) {
        existing.updated_at = Some(now);
        existing.merge_tags(tags);
        return true;
    }
    items.push(MemoryItem::new(content, tags, now));
    false
}

/// Drop the least recently updated items until at most `cap` remain.
/// Ties go to the older `created_at`. Survivors keep their order.
pub(crate) fn enforce_cap(items: &mut Vec<MemoryItem>, cap: usize) -> usize {
    if items.len() <= cap {
        return 0;
    }
    let excess = items.len() - cap;
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| (items[i].last_updated(), items[i].created_at));
    let mut evict: Vec<usize> = order.into_iter().take(excess).collect();
    evict.sort_unstable();
    for i in evict.into_iter().rev() {
        items.remove(i);
    }
    excess
}

/// Most recently updated first.
pub(crate) fn newest_first(items: &[MemoryItem], limit: usize) -> Vec<&MemoryItem> {
    let mut sorted: Vec<&MemoryItem> = items.iter().collect();
    sorted.sort_by(|a, b| {
        b.last_updated()
            .cmp(&a.last_updated())
            .then(b.created_at.cmp(&a.created_at))
    });
    sorted.truncate(limit);
    sorted
}

use std::cmp::Ordering;

use crate::item::MemoryItem;
use crate::scope::Scope;

/// A scored match from [`MemoryStore::search_hits`](crate::MemoryStore::search_hits).
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryHit {
    pub scope: Scope,
    pub score: usize,
    pub content: String,
    pub tags: Vec<String>,
}

impl MemoryHit {
    pub fn render(&self) -> String {
        let mut line = format!("- [{}] (score {}) {}", self.scope, self.score, self.content);
        for tag in &self.tags {
            line.push_str(&format!("  #{tag}"));
        }
        line
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'   // hiragana, katakana
        | '\u{3400}'..='\u{4DBF}' // CJK extension A
        | '\u{4E00}'..='\u{9FFF}' // CJK unified
        | '\u{AC00}'..='\u{D7AF}' // hangul syllables
        | '\u{F900}'..='\u{FAFF}' // CJK compatibility
    )
}

/// Split text into distinct lowercase search terms.
///
/// Letter/digit runs of two or more characters become terms. CJK characters
/// are terms on their own. Everything else separates terms.
pub fn tokenize(text: &str) -> Vec<String> {
    fn flush(word: &mut String, tokens: &mut Vec<String>) {
        if word.chars().count() >= 2 && !tokens.contains(word) {
            tokens.push(word.clone());
        }
        word.clear();
    }

    let mut tokens: Vec<String> = Vec::new();
    let mut word = String::new();

    for c in text.chars() {
        if is_cjk(c) {
            flush(&mut word, &mut tokens);
            let single = c.to_string();
            if !tokens.contains(&single) {
                tokens.push(single);
            }
        } else if c.is_alphanumeric() {
            word.extend(c.to_lowercase());
        } else {
            flush(&mut word, &mut tokens);
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

/// Tokens found as substrings of the content, plus tags equal to a token.
pub fn score_item(item: &MemoryItem, tokens: &[String]) -> usize {
    let content = item.normalized();
    let in_content = tokens.iter().filter(|t| content.contains(t.as_str())).count();
    let in_tags = item
        .tags
        .iter()
        .filter(|tag| tokens.contains(&tag.trim().to_lowercase()))
        .count();
    in_content + in_tags
}

pub fn score_text(text: &str, tokens: &[String]) -> usize {
    let text = text.to_lowercase();
    tokens.iter().filter(|t| text.contains(t.as_str())).count()
}

/// Best score first, then by scope identifier.
pub(crate) fn rank(hits: &mut [MemoryHit]) {
    hits.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => a.scope.to_string().cmp(&b.scope.to_string()),
        other => other,
    });
}

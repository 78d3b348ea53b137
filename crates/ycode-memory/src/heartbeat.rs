/// Tracks the last automatic capture so heartbeats stay sparse.
#[derive(Debug, Default)]
pub(crate) struct HeartbeatState {
    last_round: Option<i64>,
    last_fingerprint: Option<String>,
}

/// Whitespace collapsed to single spaces.
pub(crate) fn compact(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis.
pub(crate) fn cap_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

impl HeartbeatState {
    /// Decide whether `input` at `round` should be captured.
    /// Returns the fingerprint to record on success.
    pub(crate) fn admit(
        &self,
        compacted: &str,
        round: i64,
        min_chars: usize,
        cooldown: i64,
    ) -> Option<String> {
        if compacted.chars().count() < min_chars {
            return None;
        }
        if let Some(last) = self.last_round
            && round - last < cooldown
        {
            return None;
        }
        let fingerprint = compacted.to_lowercase();
        if self.last_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            return None;
        }
        Some(fingerprint)
    }

    pub(crate) fn record(&mut self, round: i64, fingerprint: String) {
        self.last_round = Some(round);
        self.last_fingerprint = Some(fingerprint);
    }
}

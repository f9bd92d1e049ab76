//! One patch in, one URL out.
//!
//! [`Navigator`] ties the merge rules to URL generation: each call produces
//! exactly one [`Navigation`] (the next state plus the single URL to push)
//! and, when a history log is attached, exactly one history entry.

use serde_json::{Value, json};

use super::codec;
use super::merge::{StatePatch, apply_patch, toggle_series};
use super::schema::{ClipSlot, DashboardUrlState, EmoteKey};
use super::validation::ValidationError;
use crate::cursor;
use crate::history::HistoryLog;

/// Result of a single navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub state: DashboardUrlState,
    /// URL to push onto the history stack.
    pub url: String,
}

/// Produces navigations relative to the state parsed from the current URL.
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    current: Option<&'a DashboardUrlState>,
    param: &'a str,
    path: &'a str,
    history: Option<&'a HistoryLog>,
}

impl<'a> Navigator<'a> {
    pub fn new(current: Option<&'a DashboardUrlState>, param: &'a str) -> Self {
        Self {
            current,
            param,
            path: "/",
            history: None,
        }
    }

    /// Target path for generated URLs (default `/`).
    pub fn at_path(mut self, path: &'a str) -> Self {
        self.path = path;
        self
    }

    pub fn with_history(mut self, history: &'a HistoryLog) -> Self {
        self.history = Some(history);
        self
    }

    /// Merge `patch` into the current state.
    pub fn navigate(&self, patch: &Value) -> Result<Navigation, ValidationError> {
        let state = apply_patch(self.current, patch)?;
        Ok(self.finish("patch", patch, state))
    }

    /// Merge `patch`, then clamp each clip index it sets into the list that
    /// cursor pages through. `clip_count` reports that list's length for the
    /// merged state; `None` leaves the requested index as is.
    pub fn navigate_clamped<F>(&self, patch: &Value, clip_count: F) -> Result<Navigation, ValidationError>
    where
        F: Fn(ClipSlot, &DashboardUrlState) -> Option<usize>,
    {
        let mut state = apply_patch(self.current, patch)?;
        for slot in [ClipSlot::Max, ClipSlot::Min] {
            let Some(requested) = patch.get(slot.index_key()).and_then(Value::as_i64) else {
                continue;
            };
            if let Some(count) = clip_count(slot, &state) {
                let index = Some(cursor::clamp_index(requested, count));
                match slot {
                    ClipSlot::Max => state.max_clip_index = index,
                    ClipSlot::Min => state.min_clip_index = index,
                }
            }
        }
        Ok(self.finish("patch", patch, state))
    }

    pub fn apply(&self, patch: StatePatch) -> Result<Navigation, ValidationError> {
        self.navigate(&patch.into_value())
    }

    /// Add or remove one plotted emote.
    pub fn toggle_series(&self, emote: EmoteKey) -> Result<Navigation, ValidationError> {
        let state = toggle_series(self.current, emote)?;
        Ok(self.finish("toggle", &json!({ "toggle": emote.as_str() }), state))
    }

    /// Move a clip cursor. The requested index is clamped into the list
    /// bounds even when the caller skipped its own boundary checks.
    pub fn set_clip_index(
        &self,
        slot: ClipSlot,
        requested: i64,
        clip_count: usize,
    ) -> Result<Navigation, ValidationError> {
        let patch = StatePatch::new().clip_index(slot, requested).into_value();
        self.navigate_clamped(&patch, |_, _| Some(clip_count))
    }

    fn finish(&self, origin: &str, patch: &Value, state: DashboardUrlState) -> Navigation {
        let url = codec::href(self.path, &state, self.param);
        log::debug!("state.navigate origin={origin} url={url}");

        if let Some(history) = self.history {
            history.record(origin, patch, &url);
        }

        Navigation { state, url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::codec::state_from_url;
    use crate::state::schema::ChartType;

    #[test]
    fn navigation_url_parses_back_to_state() {
        let nav = Navigator::new(None, "data")
            .navigate(&json!({ "chartType": "bar" }))
            .unwrap();
        let parsed = state_from_url(&nav.url, "data").unwrap().unwrap();
        assert_eq!(parsed, nav.state);
        assert_eq!(parsed.chart_type, Some(ChartType::Bar));
    }

    #[test]
    fn clip_index_is_clamped() {
        let nav = Navigator::new(None, "data")
            .set_clip_index(ClipSlot::Max, 9, 3)
            .unwrap();
        assert_eq!(nav.state.max_clip_index, Some(2));

        let nav = Navigator::new(None, "data")
            .set_clip_index(ClipSlot::Min, -4, 3)
            .unwrap();
        assert_eq!(nav.state.min_clip_index, Some(0));
    }

    #[test]
    fn clamped_navigation_records_the_clamped_url() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::at(dir.path().join("history.jsonl"));
        let nav = Navigator::new(None, "data")
            .with_history(&log)
            .navigate_clamped(&json!({ "maxClipIndex": 99, "chartType": "bar" }), |slot, _| {
                (slot == ClipSlot::Max).then_some(4)
            })
            .unwrap();

        assert_eq!(nav.state.max_clip_index, Some(3));
        assert_eq!(nav.state.chart_type, Some(ChartType::Bar));

        let entries = log.read_recent(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, nav.url);
    }

    #[test]
    fn unknown_list_size_keeps_requested_index() {
        let nav = Navigator::new(None, "data")
            .navigate_clamped(&json!({ "minClipIndex": 7 }), |_, _| None)
            .unwrap();
        assert_eq!(nav.state.min_clip_index, Some(7));
    }

    #[test]
    fn custom_path_is_used() {
        let nav = Navigator::new(None, "data")
            .at_path("/dashboard")
            .apply(StatePatch::new().chart_type(ChartType::Line))
            .unwrap();
        assert!(nav.url.starts_with("/dashboard?data="));
    }

    #[test]
    fn each_navigation_records_one_history_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::at(dir.path().join("history.jsonl"));
        let nav = Navigator::new(None, "data").with_history(&log);

        nav.toggle_series(EmoteKey::Pog).unwrap();
        nav.apply(StatePatch::new().clicked_at(1.0)).unwrap();

        let entries = log.read_recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].origin, "toggle");
        assert_eq!(entries[1].origin, "patch");
    }
}

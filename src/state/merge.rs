//! Patch semantics for the URL state.
//!
//! A patch is a partial state in JSON form. Merging rules:
//!
//! - object + object: merged key by key, so setting `maxClipParams.grouping`
//!   keeps an existing `maxClipParams.span`
//! - array + array: existing entries first, then the patch's (append)
//! - anything else: the patch value replaces the current one
//! - `null` in the patch removes the key
//!
//! The merged document is validated again before it becomes a state.

use serde_json::{Map, Value, json};

use super::schema::{
    ChartType, ClipGrouping, ClipSlot, ClipSpan, DEFAULT_SERIES, DashboardUrlState, EmoteKey,
    SeriesGrouping, SeriesSpan,
};
use super::validation::{ValidationError, validate_value};

/// Compute the next state from `current` and a JSON patch.
///
/// With no current state the patch is the whole next state.
pub fn apply_patch(
    current: Option<&DashboardUrlState>,
    patch: &Value,
) -> Result<DashboardUrlState, ValidationError> {
    if !patch.is_object() {
        return Err(ValidationError::single("$", "patch must be a JSON object"));
    }

    let Some(current) = current else {
        return validate_value(patch);
    };

    let mut merged = serde_json::to_value(current)
        .map_err(|e| ValidationError::single("$", format!("failed to serialize state: {e}")))?;
    merge_value(&mut merged, patch);

    validate_value(&merged)
}

/// Recursive JSON merge used by [`apply_patch`].
pub fn merge_value(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                if value.is_null() {
                    existing.remove(key);
                    continue;
                }
                match existing.get_mut(key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        existing.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(existing), Value::Array(incoming)) => {
            existing.extend(incoming.iter().cloned());
        }
        (slot, value) => *slot = value.clone(),
    }
}

/// Add `emote` to the plotted series, or remove it when already plotted.
///
/// Adding goes through the append merge. Removal cannot be expressed as an
/// append, so the filtered list is written directly. Either way, toggling
/// the same emote twice restores the previous list.
pub fn toggle_series(
    current: Option<&DashboardUrlState>,
    emote: EmoteKey,
) -> Result<DashboardUrlState, ValidationError> {
    let mut next = current.cloned().unwrap_or_default();
    let plotted = next.effective_series();

    if plotted.contains(&emote) {
        let remaining: Vec<EmoteKey> = plotted.into_iter().filter(|e| *e != emote).collect();
        // Back at the default list: drop the key unless a nested list would
        // take over once the top-level one is gone.
        let nested = next
            .series_params
            .as_ref()
            .is_some_and(|params| params.series.is_some());
        next.series = (nested || remaining != DEFAULT_SERIES).then_some(remaining);
        return Ok(next);
    }

    if next.series.is_some() {
        return apply_patch(Some(&next), &StatePatch::new().append_series(&[emote]).into_value());
    }

    let mut seeded = plotted;
    seeded.push(emote);
    next.series = Some(seeded);
    Ok(next)
}

// ---------------------------------------------------------------------------
// Typed patch builder
// ---------------------------------------------------------------------------

/// Builder for the JSON patches the dashboard controls emit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    fields: Map<String, Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    fn set(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    fn set_nested(mut self, object: &str, key: &str, value: Value) -> Self {
        let entry = self
            .fields
            .entry(object.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value);
        }
        self
    }

    pub fn series_span(self, span: SeriesSpan) -> Self {
        self.set_nested("seriesParams", "span", json!(span.as_str()))
    }

    pub fn series_grouping(self, grouping: SeriesGrouping) -> Self {
        self.set_nested("seriesParams", "grouping", json!(grouping.as_str()))
    }

    pub fn rolling_average(self, window: u32) -> Self {
        self.set_nested("seriesParams", "rollingAverage", json!(window))
    }

    /// Set or clear (`None`) the explicit date range.
    pub fn date_range(self, from: Option<&str>, to: Option<&str>) -> Self {
        self.set_nested("seriesParams", "from", from.map_or(Value::Null, |f| json!(f)))
            .set_nested("seriesParams", "to", to.map_or(Value::Null, |t| json!(t)))
    }

    pub fn chart_type(self, chart_type: ChartType) -> Self {
        self.set("chartType", json!(chart_type.as_str()))
    }

    /// Entries appended after the current `series`.
    pub fn append_series(self, emotes: &[EmoteKey]) -> Self {
        let values = emotes.iter().map(|e| json!(e.as_str())).collect();
        self.set("series", Value::Array(values))
    }

    pub fn clicked_at(self, unix_seconds: f64) -> Self {
        self.set("clickedUnixSeconds", json!(unix_seconds))
    }

    pub fn clear_clicked(self) -> Self {
        self.set("clickedUnixSeconds", Value::Null)
    }

    pub fn clip_span(self, slot: ClipSlot, span: ClipSpan) -> Self {
        self.set_nested(slot.params_key(), "span", json!(span.as_str()))
    }

    pub fn clip_grouping(self, slot: ClipSlot, grouping: ClipGrouping) -> Self {
        self.set_nested(slot.params_key(), "grouping", json!(grouping.as_str()))
    }

    pub fn clip_emote(self, slot: ClipSlot, emote: Option<EmoteKey>) -> Self {
        let value = emote.map_or(Value::Null, |e| json!(e.as_str()));
        self.set_nested(slot.params_key(), "emote", value)
    }

    pub fn clip_index(self, slot: ClipSlot, index: i64) -> Self {
        self.set(slot.index_key(), json!(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(value: Value) -> DashboardUrlState {
        validate_value(&value).unwrap()
    }

    #[test]
    fn no_current_state_takes_patch_verbatim() {
        let patch = json!({ "chartType": "bar" });
        let next = apply_patch(None, &patch).unwrap();
        assert_eq!(next.chart_type, Some(ChartType::Bar));
        assert_eq!(next.series, None);
    }

    #[test]
    fn scalars_replace() {
        let current = state(json!({ "chartType": "line", "maxClipIndex": 3 }));
        let next = apply_patch(Some(&current), &json!({ "chartType": "bar", "maxClipIndex": 0 }))
            .unwrap();
        assert_eq!(next.chart_type, Some(ChartType::Bar));
        assert_eq!(next.max_clip_index, Some(0));
    }

    #[test]
    fn sequences_append() {
        let current = state(json!({ "series": ["two", "lol"] }));
        let next = apply_patch(Some(&current), &json!({ "series": ["pog"] })).unwrap();
        assert_eq!(
            next.series,
            Some(vec![EmoteKey::Two, EmoteKey::Lol, EmoteKey::Pog])
        );
    }

    #[test]
    fn nested_objects_merge_shallowly() {
        let current = state(json!({ "maxClipParams": { "span": "1 month" } }));
        let patch = StatePatch::new()
            .clip_grouping(ClipSlot::Max, ClipGrouping::FiveMinutes)
            .into_value();
        let next = apply_patch(Some(&current), &patch).unwrap();
        let params = next.max_clip_params.unwrap();
        assert_eq!(params.span, ClipSpan::OneMonth);
        assert_eq!(params.grouping, ClipGrouping::FiveMinutes);
    }

    #[test]
    fn null_clears_a_field() {
        let current = state(json!({
            "clickedUnixSeconds": 1700000000,
            "seriesParams": { "span": "custom", "from": "2024-01-01", "to": "2024-01-02" }
        }));
        let patch = StatePatch::new()
            .clear_clicked()
            .series_span(SeriesSpan::OneHour)
            .date_range(None, None)
            .into_value();
        let next = apply_patch(Some(&current), &patch).unwrap();
        assert_eq!(next.clicked_unix_seconds, None);
        let params = next.series_params.unwrap();
        assert_eq!(params.span, SeriesSpan::OneHour);
        assert_eq!(params.from, None);
        assert_eq!(params.to, None);
    }

    #[test]
    fn invalid_patch_values_are_rejected() {
        let current = DashboardUrlState::default();
        let err = apply_patch(Some(&current), &json!({ "chartType": "pie" })).unwrap_err();
        assert_eq!(err.paths(), vec!["chartType"]);

        let err = apply_patch(None, &json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(err.paths(), vec!["$"]);
    }

    #[test]
    fn appending_a_duplicate_is_rejected() {
        let current = state(json!({ "series": ["two"] }));
        let err = apply_patch(Some(&current), &json!({ "series": ["two"] })).unwrap_err();
        assert_eq!(err.paths(), vec!["series[1]"]);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let current = state(json!({ "series": ["two", "lol"] }));
        let added = toggle_series(Some(&current), EmoteKey::Pog).unwrap();
        assert_eq!(
            added.series,
            Some(vec![EmoteKey::Two, EmoteKey::Lol, EmoteKey::Pog])
        );
        let removed = toggle_series(Some(&added), EmoteKey::Pog).unwrap();
        assert_eq!(removed.series, current.series);
    }

    #[test]
    fn toggle_without_series_starts_from_default() {
        let added = toggle_series(None, EmoteKey::Lol).unwrap();
        assert_eq!(added.series, Some(vec![EmoteKey::Two, EmoteKey::Lol]));

        let removed = toggle_series(None, EmoteKey::Two).unwrap();
        assert_eq!(removed.series, Some(vec![]));
    }

    #[test]
    fn toggling_back_to_default_drops_the_key() {
        let added = toggle_series(None, EmoteKey::Lol).unwrap();
        let removed = toggle_series(Some(&added), EmoteKey::Lol).unwrap();
        assert_eq!(removed, DashboardUrlState::default());
    }

    #[test]
    fn default_list_is_kept_when_nested_series_would_win() {
        let current = state(json!({ "series": ["two", "lol"], "seriesParams": { "series": ["pog"] } }));
        let removed = toggle_series(Some(&current), EmoteKey::Lol).unwrap();
        assert_eq!(removed.series, Some(vec![EmoteKey::Two]));
    }

    #[test]
    fn patch_builder_groups_nested_keys() {
        let value = StatePatch::new()
            .series_span(SeriesSpan::OneHour)
            .series_grouping(SeriesGrouping::Second)
            .clip_index(ClipSlot::Min, 4)
            .into_value();
        assert_eq!(
            value,
            json!({
                "seriesParams": { "span": "1 hour", "grouping": "second" },
                "minClipIndex": 4
            })
        );
    }
}

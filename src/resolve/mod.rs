/// Default resolution for the dashboard's sub-views.
///
/// Some defaults cannot live in the schema because they depend on whether
/// the tracked stream is live right now. While live, the views favour
/// recency and resolution (short spans, fine groupings); offline they widen
/// out. Anything the URL states explicitly wins over these defaults.
///
/// Every function here is pure in `(state, live)`: the live flag is fetched
/// elsewhere and passed in, so identical inputs always resolve identically.
use serde::Serialize;

use crate::state::{
    ChartType, ClipGrouping, ClipOrder, ClipSlot, ClipSpan, DashboardUrlState, EmoteKey,
    SeriesGrouping, SeriesSpan,
};

/// Clip list length requested when the config does not say otherwise.
pub const DEFAULT_CLIP_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// Live / offline default tables
// ---------------------------------------------------------------------------

/// The context-dependent defaults for one live status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextDefaults {
    pub series_span: SeriesSpan,
    pub series_grouping: SeriesGrouping,
    pub rolling_average: u32,
    pub clip_span: ClipSpan,
    pub clip_grouping: ClipGrouping,
}

impl ContextDefaults {
    pub fn for_live(live: bool) -> Self {
        if live {
            Self {
                series_span: SeriesSpan::ThirtyMinutes,
                series_grouping: SeriesGrouping::Second,
                rolling_average: 0,
                clip_span: ClipSpan::NineHours,
                clip_grouping: ClipGrouping::TwentyFiveSeconds,
            }
        } else {
            Self {
                series_span: SeriesSpan::NineHours,
                series_grouping: SeriesGrouping::Minute,
                rolling_average: 15,
                clip_span: ClipSpan::NineHours,
                clip_grouping: ClipGrouping::OneMinute,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved parameter sets
// ---------------------------------------------------------------------------

/// Fully-populated chart query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    pub span: SeriesSpan,
    pub grouping: SeriesGrouping,
    pub rolling_average: u32,
    pub from: Option<String>,
    pub to: Option<String>,
    pub chart_type: ChartType,
    pub series: Vec<EmoteKey>,
}

/// Fully-populated clip list query for one cursor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipQuery {
    pub slot: ClipSlot,
    pub span: ClipSpan,
    pub grouping: ClipGrouping,
    pub order: ClipOrder,
    pub limit: u32,
    pub emote: Option<EmoteKey>,
    pub from: Option<String>,
    /// Cursor position; not part of the fetch itself.
    pub index: i64,
}

/// Everything the dashboard needs to issue its queries for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedView {
    pub live: bool,
    pub series: SeriesQuery,
    pub max_clips: ClipQuery,
    pub min_clips: ClipQuery,
    pub clicked_unix_seconds: Option<f64>,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

pub fn resolve_series(state: &DashboardUrlState, live: bool) -> SeriesQuery {
    let defaults = ContextDefaults::for_live(live);
    let params = state.series_params.as_ref();

    SeriesQuery {
        span: params.map_or(defaults.series_span, |p| p.span),
        grouping: params.map_or(defaults.series_grouping, |p| p.grouping),
        rolling_average: params
            .and_then(|p| p.rolling_average)
            .unwrap_or(defaults.rolling_average),
        from: params.and_then(|p| p.from.clone()),
        to: params.and_then(|p| p.to.clone()),
        chart_type: state.effective_chart_type(),
        series: state.effective_series(),
    }
}

pub fn resolve_clips(state: &DashboardUrlState, slot: ClipSlot, live: bool, limit: u32) -> ClipQuery {
    let defaults = ContextDefaults::for_live(live);
    let params = state.clip_params(slot);

    ClipQuery {
        slot,
        span: params.map_or(defaults.clip_span, |p| p.span),
        grouping: params.map_or(defaults.clip_grouping, |p| p.grouping),
        order: slot.order(),
        limit,
        emote: params.and_then(|p| p.emote),
        from: state.series_params.as_ref().and_then(|p| p.from.clone()),
        index: state
            .clip_index(slot)
            .or_else(|| params.and_then(|p| p.index))
            .unwrap_or(0),
    }
}

/// Resolve every sub-view. A missing state resolves like an empty one.
pub fn resolve(state: Option<&DashboardUrlState>, live: bool, clip_limit: u32) -> ResolvedView {
    let empty = DashboardUrlState::default();
    let state = state.unwrap_or(&empty);

    ResolvedView {
        live,
        series: resolve_series(state, live),
        max_clips: resolve_clips(state, ClipSlot::Max, live, clip_limit),
        min_clips: resolve_clips(state, ClipSlot::Min, live, clip_limit),
        clicked_unix_seconds: state.clicked_unix_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ClipParams, SeriesParams};

    #[test]
    fn live_series_defaults() {
        let q = resolve_series(&DashboardUrlState::default(), true);
        assert_eq!(q.span, SeriesSpan::ThirtyMinutes);
        assert_eq!(q.grouping, SeriesGrouping::Second);
        assert_eq!(q.rolling_average, 0);
        assert_eq!(q.chart_type, ChartType::Line);
        assert_eq!(q.series, vec![EmoteKey::Two]);
    }

    #[test]
    fn offline_series_defaults() {
        let q = resolve_series(&DashboardUrlState::default(), false);
        assert_eq!(q.span, SeriesSpan::NineHours);
        assert_eq!(q.grouping, SeriesGrouping::Minute);
        assert_eq!(q.rolling_average, 15);
    }

    #[test]
    fn explicit_rolling_average_wins() {
        let state = DashboardUrlState {
            series_params: Some(SeriesParams {
                rolling_average: Some(60),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(resolve_series(&state, true).rolling_average, 60);
        assert_eq!(resolve_series(&state, false).rolling_average, 60);
    }

    #[test]
    fn clip_slots_pick_their_own_order_and_index() {
        let state = DashboardUrlState {
            max_clip_index: Some(3),
            min_clip_params: Some(ClipParams {
                index: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let max = resolve_clips(&state, ClipSlot::Max, false, 10);
        let min = resolve_clips(&state, ClipSlot::Min, false, 10);

        assert_eq!(max.order, ClipOrder::Desc);
        assert_eq!(max.index, 3);
        assert_eq!(max.grouping, ClipGrouping::OneMinute);

        assert_eq!(min.order, ClipOrder::Asc);
        assert_eq!(min.index, 1);
        assert_eq!(min.grouping, ClipGrouping::OneHour);
    }

    #[test]
    fn clip_from_follows_series_range() {
        let state = DashboardUrlState {
            series_params: Some(SeriesParams {
                from: Some("2024-05-01".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let q = resolve_clips(&state, ClipSlot::Max, true, 5);
        assert_eq!(q.from.as_deref(), Some("2024-05-01"));
        assert_eq!(q.limit, 5);
    }

    #[test]
    fn missing_state_resolves_like_empty() {
        assert_eq!(
            resolve(None, true, DEFAULT_CLIP_LIMIT),
            resolve(Some(&DashboardUrlState::default()), true, DEFAULT_CLIP_LIMIT)
        );
    }
}

/// Default resolution tests.
///
/// Resolution is a pure function of `(state, live)`; these tests pin the
/// live/offline default tables and the precedence of explicit URL values.
use emote_dash::resolve::{ContextDefaults, DEFAULT_CLIP_LIMIT, resolve, resolve_clips};
use emote_dash::state::{
    ChartType, ClipGrouping, ClipOrder, ClipSlot, ClipSpan, DashboardUrlState, EmoteKey,
    SeriesGrouping, SeriesSpan, parse_state,
};

fn state(raw: &str) -> DashboardUrlState {
    parse_state(Some(raw)).unwrap().unwrap_or_default()
}

#[test]
fn resolution_is_deterministic() {
    let s = state(r#"{"chartType":"bar","maxClipIndex":2}"#);
    assert_eq!(
        resolve(Some(&s), true, DEFAULT_CLIP_LIMIT),
        resolve(Some(&s), true, DEFAULT_CLIP_LIMIT)
    );
    assert_eq!(
        resolve(Some(&s), false, DEFAULT_CLIP_LIMIT),
        resolve(Some(&s), false, DEFAULT_CLIP_LIMIT)
    );
}

#[test]
fn unset_fields_follow_live_status() {
    let s = DashboardUrlState::default();
    let live = resolve(Some(&s), true, DEFAULT_CLIP_LIMIT);
    let offline = resolve(Some(&s), false, DEFAULT_CLIP_LIMIT);

    assert_ne!(live, offline);
    assert_ne!(live.series.span, offline.series.span);
    assert_ne!(live.series.grouping, offline.series.grouping);
    assert_ne!(live.series.rolling_average, offline.series.rolling_average);
    assert_ne!(live.max_clips.grouping, offline.max_clips.grouping);
}

#[test]
fn default_tables() {
    let live = ContextDefaults::for_live(true);
    assert_eq!(live.series_span, SeriesSpan::ThirtyMinutes);
    assert_eq!(live.series_grouping, SeriesGrouping::Second);
    assert_eq!(live.rolling_average, 0);
    assert_eq!(live.clip_grouping, ClipGrouping::TwentyFiveSeconds);

    let offline = ContextDefaults::for_live(false);
    assert_eq!(offline.series_span, SeriesSpan::NineHours);
    assert_eq!(offline.series_grouping, SeriesGrouping::Minute);
    assert_eq!(offline.rolling_average, 15);
    assert_eq!(offline.clip_grouping, ClipGrouping::OneMinute);
}

#[test]
fn explicit_clip_span_beats_live_default() {
    let s = state(r#"{"maxClipParams":{"span":"1 week"}}"#);
    let query = resolve_clips(&s, ClipSlot::Max, true, DEFAULT_CLIP_LIMIT);
    assert_eq!(query.span, ClipSpan::OneWeek);

    // The other cursor is untouched.
    let other = resolve_clips(&s, ClipSlot::Min, true, DEFAULT_CLIP_LIMIT);
    assert_eq!(other.span, ClipSpan::NineHours);
    assert_eq!(other.grouping, ClipGrouping::TwentyFiveSeconds);
}

#[test]
fn explicit_series_params_are_independent_of_live_status() {
    let s = state(r#"{"seriesParams":{"span":"1 hour","rollingAverage":30}}"#);
    let live = resolve(Some(&s), true, DEFAULT_CLIP_LIMIT);
    let offline = resolve(Some(&s), false, DEFAULT_CLIP_LIMIT);

    assert_eq!(live.series.span, SeriesSpan::OneHour);
    assert_eq!(live.series, offline.series);
    assert_eq!(live.series.grouping, SeriesGrouping::Minute);
    assert_eq!(live.series.rolling_average, 30);
}

#[test]
fn clip_slots_rank_in_opposite_orders() {
    let view = resolve(None, false, 25);
    assert_eq!(view.max_clips.order, ClipOrder::Desc);
    assert_eq!(view.min_clips.order, ClipOrder::Asc);
    assert_eq!(view.max_clips.limit, 25);
}

#[test]
fn top_level_values_win_over_nested_copies() {
    let s = state(
        r#"{"chartType":"bar","series":["lol"],
            "seriesParams":{"chartType":"line","series":["pog"]},
            "minClipIndex":4,"minClipParams":{"index":1}}"#,
    );
    let view = resolve(Some(&s), false, DEFAULT_CLIP_LIMIT);
    assert_eq!(view.series.chart_type, ChartType::Bar);
    assert_eq!(view.series.series, vec![EmoteKey::Lol]);
    assert_eq!(view.min_clips.index, 4);
}

#[test]
fn nested_values_fill_in_when_top_level_is_absent() {
    let s = state(r#"{"seriesParams":{"chartType":"bar","series":["pog"]},"maxClipParams":{"index":3}}"#);
    let view = resolve(Some(&s), true, DEFAULT_CLIP_LIMIT);
    assert_eq!(view.series.chart_type, ChartType::Bar);
    assert_eq!(view.series.series, vec![EmoteKey::Pog]);
    assert_eq!(view.max_clips.index, 3);
}

#[test]
fn missing_state_uses_default_series_and_no_click() {
    let view = resolve(None, true, DEFAULT_CLIP_LIMIT);
    assert_eq!(view.series.series, vec![EmoteKey::Two]);
    assert_eq!(view.series.chart_type, ChartType::Line);
    assert_eq!(view.clicked_unix_seconds, None);
    assert_eq!(view.max_clips.index, 0);
}

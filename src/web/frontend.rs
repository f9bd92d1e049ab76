//! Server-rendered HTML for the web dashboard.
//!
//! There is no client-side script: every control is a plain link to
//! `/navigate` or `/toggle`, which redirect to the next state URL. The chart
//! is inline SVG whose points link back with `clickedUnixSeconds` set.

use std::fmt::Write;

use crate::api::{ApiError, Clip, clip_embed_url};
use crate::chart::ChartConfig;
use crate::cursor::ClipCursor;
use crate::resolve::{ClipQuery, ResolvedView};
use crate::state::{
    ChartType, ClipGrouping, ClipSlot, ClipSpan, DashboardUrlState, EmoteKey, SeriesGrouping,
    SeriesSpan, StatePatch, ValidationError, encode_query,
};

/// Smoothing windows offered by the rolling-average control.
const ROLLING_AVERAGE_CHOICES: &[u32] = &[0, 5, 10, 15, 30, 60];

const CHART_WIDTH: f64 = 960.0;
const CHART_HEIGHT: f64 = 320.0;
const CHART_PAD: f64 = 32.0;

/// Everything one dashboard render needs.
#[derive(Debug)]
pub struct DashboardPage<'a> {
    pub state: Option<&'a DashboardUrlState>,
    pub param: &'a str,
    pub view: &'a ResolvedView,
    pub chart: &'a ChartConfig,
    /// Already ranked for their slot.
    pub max_clips: &'a [Clip],
    pub min_clips: &'a [Clip],
    pub nearest: Option<&'a Clip>,
    /// Host name Twitch requires as the embed `parent`.
    pub embed_parent: &'a str,
}

impl DashboardPage<'_> {
    fn navigate_href(&self, patch: StatePatch) -> String {
        let patch = patch.into_value().to_string();
        format!(
            "/navigate?{}patch={}",
            self.current_query(),
            urlencoding::encode(&patch)
        )
    }

    fn toggle_href(&self, emote: EmoteKey) -> String {
        format!("/toggle?{}emote={}", self.current_query(), emote.as_str())
    }

    /// `param=<state>&`, or nothing for the default view.
    fn current_query(&self) -> String {
        match self.state {
            Some(state) if !state.is_empty() => format!("{}&", encode_query(state, self.param)),
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

pub fn render_dashboard(page: &DashboardPage<'_>) -> String {
    let mut body = String::new();

    let badge = if page.view.live {
        r#"<span class="badge live">LIVE</span>"#
    } else {
        r#"<span class="badge">offline</span>"#
    };
    let _ = write!(body, "<header><h1>emote-dash</h1>{badge}</header>");

    body.push_str(&series_controls(page));
    body.push_str(&emote_toggles(page));
    body.push_str(&chart_section(page));
    body.push_str(&nearest_clip_section(page));

    body.push_str(r#"<div class="clips">"#);
    body.push_str(&clip_section(page, &page.view.max_clips, page.max_clips));
    body.push_str(&clip_section(page, &page.view.min_clips, page.min_clips));
    body.push_str("</div>");

    layout("emote-dash", &body)
}

/// 400 page listing every violation path.
pub fn render_violations(error: &ValidationError) -> String {
    let mut body = String::from(
        "<h1>Invalid dashboard link</h1><p>The state in this URL does not match the schema.</p><ul class=\"violations\">",
    );
    for violation in &error.violations {
        let _ = write!(
            body,
            "<li><code>{}</code> {}</li>",
            escape(&violation.path),
            escape(&violation.message)
        );
    }
    body.push_str(r#"</ul><p><a href="/">Reset to the default view</a></p>"#);
    layout("Invalid link", &body)
}

/// 502 page for a failed series or clip fetch.
pub fn render_upstream_error(error: &ApiError) -> String {
    let body = format!(
        "<h1>Upstream unavailable</h1><p>{}</p><p><a href=\"\">Retry</a></p>",
        escape(&error.to_string())
    );
    layout("Upstream unavailable", &body)
}

pub fn render_not_found(path: &str) -> String {
    let body = format!(
        "<h1>Not found</h1><p><code>{}</code></p><p><a href=\"/\">Dashboard</a></p>",
        escape(path)
    );
    layout("Not found", &body)
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

fn series_controls(page: &DashboardPage<'_>) -> String {
    let query = &page.view.series;
    let mut html = String::from(r#"<section class="controls">"#);

    html.push_str(&option_row(
        "Span",
        SeriesSpan::ALL
            .iter()
            .filter(|&&s| s != SeriesSpan::Custom)
            .map(|&s| (s.to_string(), s == query.span, page.navigate_href(StatePatch::new().series_span(s).date_range(None, None)))),
    ));
    html.push_str(&option_row(
        "Grouping",
        SeriesGrouping::ALL.iter().map(|&g| {
            (g.to_string(), g == query.grouping, page.navigate_href(StatePatch::new().series_grouping(g)))
        }),
    ));
    html.push_str(&option_row(
        "Smoothing",
        ROLLING_AVERAGE_CHOICES.iter().map(|&w| {
            let label = if w == 0 { "None".to_string() } else { w.to_string() };
            (label, w == query.rolling_average, page.navigate_href(StatePatch::new().rolling_average(w)))
        }),
    ));
    html.push_str(&option_row(
        "Chart",
        ChartType::ALL.iter().map(|&c| {
            (c.to_string(), c == query.chart_type, page.navigate_href(StatePatch::new().chart_type(c)))
        }),
    ));

    if query.from.is_some() || query.to.is_some() {
        let _ = write!(
            html,
            "<div class=\"row\"><span class=\"label\">Range</span><span>{} to {}</span> <a href=\"{}\">clear</a></div>",
            escape(query.from.as_deref().unwrap_or("start")),
            escape(query.to.as_deref().unwrap_or("now")),
            escape(&page.navigate_href(StatePatch::new().date_range(None, None)))
        );
    }

    html.push_str("</section>");
    html
}

fn emote_toggles(page: &DashboardPage<'_>) -> String {
    let plotted = &page.view.series.series;
    let mut html = String::from(r#"<section class="emotes"><span class="label">Emotes</span>"#);
    for &emote in EmoteKey::ALL {
        let on = plotted.contains(&emote);
        let _ = write!(
            html,
            "<a class=\"chip{}\" style=\"border-color:{}\" href=\"{}\">{}</a>",
            if on { " on" } else { "" },
            emote.color(),
            escape(&page.toggle_href(emote)),
            emote
        );
    }
    html.push_str("</section>");
    html
}

fn option_row(label: &str, options: impl Iterator<Item = (String, bool, String)>) -> String {
    let mut html = format!("<div class=\"row\"><span class=\"label\">{}</span>", escape(label));
    for (text, active, href) in options {
        if active {
            let _ = write!(html, "<span class=\"opt active\">{}</span>", escape(&text));
        } else {
            let _ = write!(html, "<a class=\"opt\" href=\"{}\">{}</a>", escape(&href), escape(&text));
        }
    }
    html.push_str("</div>");
    html
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

fn chart_section(page: &DashboardPage<'_>) -> String {
    let chart = page.chart;
    let mut html = String::from(r#"<section class="chart">"#);

    if let Some(label) = chart.time_range_label() {
        let suffix = if chart.utc_aligned { " UTC" } else { "" };
        let _ = write!(html, "<p class=\"muted\">{}{suffix}</p>", escape(&label));
    }

    if chart.is_empty() {
        html.push_str(r#"<p class="muted">No data for this range.</p></section>"#);
        return html;
    }

    html.push_str(&chart_svg(page));
    html.push_str("</section>");
    html
}

fn chart_svg(page: &DashboardPage<'_>) -> String {
    let chart = page.chart;
    let Some((start, end)) = chart.range else {
        return String::new();
    };
    let t0 = start.timestamp_millis() as f64;
    let t_span = (end.timestamp_millis() as f64 - t0).max(1.0);
    let v_max = chart.max_value().max(1.0);

    let x = |unix_ms: i64| CHART_PAD + (unix_ms as f64 - t0) / t_span * (CHART_WIDTH - 2.0 * CHART_PAD);
    let y = |value: f64| CHART_HEIGHT - CHART_PAD - value / v_max * (CHART_HEIGHT - 2.0 * CHART_PAD);

    let mut svg = format!(
        "<svg viewBox=\"0 0 {CHART_WIDTH} {CHART_HEIGHT}\" role=\"img\" aria-label=\"emote counts\">\
         <line class=\"axis\" x1=\"{CHART_PAD}\" y1=\"{base}\" x2=\"{right}\" y2=\"{base}\"/>\
         <text class=\"tick\" x=\"4\" y=\"{top}\">{v_max:.0}</text>",
        base = CHART_HEIGHT - CHART_PAD,
        right = CHART_WIDTH - CHART_PAD,
        top = CHART_PAD,
    );

    let series_count = chart.series.len().max(1) as f64;
    for (n, series) in chart.series.iter().enumerate() {
        match chart.chart_type {
            ChartType::Line => {
                let points: Vec<String> = series
                    .points
                    .iter()
                    .map(|p| format!("{:.1},{:.1}", x(p.unix_ms), y(p.value)))
                    .collect();
                let _ = write!(
                    svg,
                    "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"2\" points=\"{}\"/>",
                    series.color,
                    points.join(" ")
                );
            }
            ChartType::Bar => {
                let slot = (CHART_WIDTH - 2.0 * CHART_PAD) / series.points.len().max(1) as f64;
                let width = (slot / series_count).max(1.0);
                for p in &series.points {
                    let top = y(p.value);
                    let _ = write!(
                        svg,
                        "<rect fill=\"{}\" x=\"{:.1}\" y=\"{top:.1}\" width=\"{width:.1}\" height=\"{:.1}\"/>",
                        series.color,
                        x(p.unix_ms) + width * n as f64,
                        CHART_HEIGHT - CHART_PAD - top
                    );
                }
            }
        }

        for p in &series.points {
            let unix_seconds = p.unix_ms as f64 / 1000.0;
            let _ = write!(
                svg,
                "<a href=\"{}\"><circle class=\"hit\" cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{}\"><title>{} {}</title></circle></a>",
                escape(&page.navigate_href(StatePatch::new().clicked_at(unix_seconds))),
                x(p.unix_ms),
                y(p.value),
                series.color,
                series.emote,
                p.value
            );
        }
    }

    svg.push_str("</svg>");
    svg
}

// ---------------------------------------------------------------------------
// Clips
// ---------------------------------------------------------------------------

fn nearest_clip_section(page: &DashboardPage<'_>) -> String {
    let Some(clicked) = page.view.clicked_unix_seconds else {
        return String::new();
    };

    let mut html = String::from(r#"<section class="nearest"><h2>Clip at selected time</h2>"#);
    match page.nearest {
        Some(clip) => html.push_str(&clip_embed(page, clip)),
        None => {
            let _ = write!(html, "<p class=\"muted\">No clip near {clicked}.</p>");
        }
    }
    let _ = write!(
        html,
        "<p><a href=\"{}\">close</a></p></section>",
        escape(&page.navigate_href(StatePatch::new().clear_clicked()))
    );
    html
}

fn clip_section(page: &DashboardPage<'_>, query: &ClipQuery, clips: &[Clip]) -> String {
    let slot = query.slot;
    let title = match slot {
        ClipSlot::Max => "Top clips",
        ClipSlot::Min => "Lowest clips",
    };
    let cursor = ClipCursor::new(clips, query.index);

    let mut html = format!("<section class=\"clip-list\"><h2>{title}</h2>");

    html.push_str(&option_row(
        "Span",
        ClipSpan::ALL.iter().map(|&s| {
            (s.to_string(), s == query.span, page.navigate_href(StatePatch::new().clip_span(slot, s)))
        }),
    ));
    html.push_str(&option_row(
        "Bin",
        ClipGrouping::ALL.iter().map(|&g| {
            (g.to_string(), g == query.grouping, page.navigate_href(StatePatch::new().clip_grouping(slot, g)))
        }),
    ));
    html.push_str(&option_row(
        "Emote",
        std::iter::once(None).chain(EmoteKey::ALL.iter().copied().map(Some)).map(|e| {
            let label = e.map_or_else(|| "all".to_string(), |e| e.to_string());
            (label, e == query.emote, page.navigate_href(StatePatch::new().clip_emote(slot, e)))
        }),
    ));

    match cursor.current().clip() {
        Some(clip) => {
            let _ = write!(
                html,
                "<p class=\"muted\">#{} of {} · count {}</p>",
                cursor.index() + 1,
                cursor.len(),
                clip.count
            );
            html.push_str(&clip_embed(page, clip));
        }
        None if cursor.is_empty() => html.push_str(r#"<p class="muted">No clips.</p>"#),
        None => {
            // Index outside a non-empty list: offer the nearest valid clip.
            let back = cursor.clamp(cursor.index());
            let _ = write!(
                html,
                "<p class=\"muted\">No clip at this position. <a href=\"{}\">back to #{}</a></p>",
                escape(&page.navigate_href(StatePatch::new().clip_index(slot, back))),
                back + 1
            );
        }
    }

    html.push_str(r#"<div class="pager">"#);
    pager_link(&mut html, page, slot, "previous", cursor.previous_index().map(|i| cursor.clamp(i)));
    pager_link(&mut html, page, slot, "next", cursor.next_index().map(|i| cursor.clamp(i)));
    html.push_str("</div></section>");
    html
}

fn pager_link(html: &mut String, page: &DashboardPage<'_>, slot: ClipSlot, label: &str, index: Option<i64>) {
    match index {
        Some(i) => {
            let _ = write!(
                html,
                "<a class=\"opt\" href=\"{}\">{label}</a>",
                escape(&page.navigate_href(StatePatch::new().clip_index(slot, i)))
            );
        }
        None => {
            let _ = write!(html, "<span class=\"opt disabled\">{label}</span>");
        }
    }
}

fn clip_embed(page: &DashboardPage<'_>, clip: &Clip) -> String {
    format!(
        "<iframe src=\"{}\" height=\"270\" width=\"480\" allowfullscreen></iframe><p class=\"muted\">{}</p>",
        escape(&clip_embed_url(&clip.clip_id, page.embed_parent)),
        escape(&clip.time)
    )
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body><main class="app">{body}</main></body>
</html>
"##,
        title = escape(title),
    )
}

const STYLE: &str = r#"
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; }
a { color: var(--accent); text-decoration: none; }
.app { max-width: 1200px; margin: 0 auto; padding: 24px; }
header { display: flex; align-items: center; gap: 12px; margin-bottom: 16px; padding-bottom: 12px; border-bottom: 1px solid var(--border); }
h1 { font-size: 22px; font-weight: 600; }
h2 { font-size: 16px; margin-bottom: 8px; }
section { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; margin-bottom: 16px; }
.badge { border: 1px solid var(--border); border-radius: 12px; padding: 0 8px; color: var(--text-muted); }
.badge.live { color: var(--red); border-color: var(--red); }
.row { display: flex; flex-wrap: wrap; align-items: center; gap: 6px; margin-bottom: 6px; }
.label { color: var(--text-muted); min-width: 80px; }
.opt { border: 1px solid var(--border); border-radius: 6px; padding: 2px 8px; }
.opt.active { background: var(--accent); color: var(--bg); }
.opt.disabled { color: var(--text-muted); }
.chip { display: inline-block; border: 2px solid; border-radius: 12px; padding: 0 8px; margin: 2px; color: var(--text-muted); }
.chip.on { color: var(--text); font-weight: 600; }
.muted { color: var(--text-muted); }
.clips { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; }
.pager { display: flex; gap: 8px; margin-top: 8px; }
svg { width: 100%; height: auto; }
.axis { stroke: var(--border); }
.tick { fill: var(--text-muted); font-size: 11px; }
.hit { opacity: 0; }
.hit:hover { opacity: 1; }
.violations { margin: 12px 0 12px 20px; }
"#;

//! CLI command implementations for emote-dash.
//!
//! Provides subcommand handlers for:
//! - `emote-dash state parse|patch|toggle`: inspect and edit state URLs offline
//! - `emote-dash resolve <url>`: show the queries a URL resolves to
//! - `emote-dash live|series|clips|clip-at`: fetch from the upstream API
//! - `emote-dash watch <url>`: poll the upstream and print updates
//! - `emote-dash serve`: run the web dashboard
//! - `emote-dash history`: recent navigations
//! - `emote-dash config show|init|set|reset`: configuration management

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::api::{ApiClient, Clip, DashboardSource, TimeSeries};
use crate::config::{self, DashConfig};
use crate::cursor::ClipCursor;
use crate::history::HistoryLog;
use crate::query::{Poller, QueryCache, QueryKey};
use crate::resolve::{resolve, resolve_clips, resolve_series};
use crate::state::{
    ClipSlot, DashboardUrlState, EmoteKey, Navigation, Navigator, codec, state_from_url,
};
use crate::web;

/// Output format for commands that print data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}

/// Parse the state out of a URL, printing every violation on failure.
fn load_state(url: &str, config: &DashConfig) -> Result<Option<DashboardUrlState>> {
    match state_from_url(url, &config.state.query_param) {
        Ok(state) => Ok(state),
        Err(e) => {
            eprintln!("{}", "Invalid dashboard state".bold().red());
            for violation in &e.violations {
                eprintln!("  {} {}", violation.path.yellow(), violation.message);
            }
            anyhow::bail!("{} violation(s) in '{}'", e.violations.len(), config.state.query_param)
        }
    }
}

// ---------------------------------------------------------------------------
// emote-dash state parse | patch | toggle
// ---------------------------------------------------------------------------

/// Print the validated state carried by a URL.
pub fn run_state_parse(config: &DashConfig, url: &str, format: OutputFormat) -> Result<()> {
    let state = load_state(url, config)?;

    match format {
        OutputFormat::Json => print_json(&state)?,
        OutputFormat::Table => match state {
            Some(state) if !state.is_empty() => {
                println!("{}", "Dashboard state".bold().cyan());
                println!("{}", codec::to_json(&state));
            }
            _ => println!("{}", "Default view (no state in URL)".dimmed()),
        },
    }
    Ok(())
}

/// Apply a JSON patch to the state in `url` and print the next URL.
pub fn run_state_patch(config: &DashConfig, url: &str, patch: &str) -> Result<()> {
    let patch: serde_json::Value =
        serde_json::from_str(patch).context("patch is not valid JSON")?;
    let current = load_state(url, config)?;

    let history = history_log(config);
    let navigation = with_navigator(config, url, current.as_ref(), history.as_ref(), |nav| {
        nav.navigate(&patch)
    })?;
    print_navigation(&navigation);
    Ok(())
}

/// Toggle one emote in the plotted series and print the next URL.
pub fn run_state_toggle(config: &DashConfig, url: &str, emote: &str) -> Result<()> {
    let emote = EmoteKey::from_str(emote)?;
    let current = load_state(url, config)?;

    let history = history_log(config);
    let navigation = with_navigator(config, url, current.as_ref(), history.as_ref(), |nav| {
        nav.toggle_series(emote)
    })?;
    print_navigation(&navigation);
    Ok(())
}

fn with_navigator(
    config: &DashConfig,
    url: &str,
    current: Option<&DashboardUrlState>,
    history: Option<&HistoryLog>,
    f: impl FnOnce(&Navigator<'_>) -> Result<Navigation, crate::state::ValidationError>,
) -> Result<Navigation> {
    let base = base_path(url);
    let mut navigator = Navigator::new(current, &config.state.query_param).at_path(base);
    if let Some(history) = history {
        navigator = navigator.with_history(history);
    }
    f(&navigator).map_err(|e| {
        for violation in &e.violations {
            eprintln!("  {} {}", violation.path.yellow(), violation.message);
        }
        anyhow::Error::new(e).context("patch produced an invalid state")
    })
}

/// Everything before the query string, or `/` for a bare query.
fn base_path(url: &str) -> &str {
    let base = url.split(['?', '#']).next().unwrap_or_default();
    if base.is_empty() || base.contains('=') { "/" } else { base }
}

fn print_navigation(navigation: &Navigation) {
    println!("{}", navigation.url);
    if navigation.state.is_empty() {
        eprintln!("{}", "(default view)".dimmed());
    } else {
        eprintln!("{}", codec::to_json(&navigation.state).dimmed());
    }
}

fn history_log(config: &DashConfig) -> Option<HistoryLog> {
    if config.logging.history {
        HistoryLog::default_location()
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// emote-dash resolve | live
// ---------------------------------------------------------------------------

/// Show the fully-resolved queries for a URL.
///
/// Without `live`, the live status is fetched from the upstream.
pub fn run_resolve(
    config: &DashConfig,
    url: &str,
    live: Option<bool>,
    format: OutputFormat,
) -> Result<()> {
    let state = load_state(url, config)?;
    let live = live.unwrap_or_else(|| ApiClient::from_config(config).is_live());
    let view = resolve(state.as_ref(), live, config.clips.limit);

    if format == OutputFormat::Json {
        return print_json(&view);
    }

    println!(
        "{} {}",
        "Resolved view".bold().cyan(),
        if live { "(live)".red() } else { "(offline)".dimmed() }
    );
    println!("{}", "=".repeat(50));

    let s = &view.series;
    println!("{}", "Series".bold());
    println!("  {:<16} {}", "span", s.span);
    println!("  {:<16} {}", "grouping", s.grouping);
    println!("  {:<16} {}", "rollingAverage", s.rolling_average);
    println!("  {:<16} {}", "from", s.from.as_deref().unwrap_or("-"));
    println!("  {:<16} {}", "to", s.to.as_deref().unwrap_or("-"));
    println!("  {:<16} {}", "chartType", s.chart_type);
    println!("  {:<16} {}", "series", join_emotes(&s.series));

    for clips in [&view.max_clips, &view.min_clips] {
        println!("{}", format!("Clips ({})", clips.slot).bold());
        println!("  {:<16} {}", "span", clips.span);
        println!("  {:<16} {}", "grouping", clips.grouping);
        println!("  {:<16} {}", "order", clips.order);
        println!("  {:<16} {}", "limit", clips.limit);
        println!(
            "  {:<16} {}",
            "emote",
            clips.emote.map_or("-".to_string(), |e| e.to_string())
        );
        println!("  {:<16} {}", "index", clips.index);
    }

    if let Some(clicked) = view.clicked_unix_seconds {
        println!("{} {clicked}", "Clicked:".bold());
    }
    Ok(())
}

pub fn run_live(config: &DashConfig, format: OutputFormat) -> Result<()> {
    let client = ApiClient::from_config(config);
    let live = client.is_live();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "live": live })),
        OutputFormat::Table => {
            if live {
                println!("{} stream is live", "●".red().bold());
            } else {
                println!("{} stream is offline", "○".dimmed());
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// emote-dash series | clips | clip-at
// ---------------------------------------------------------------------------

pub fn run_series(config: &DashConfig, url: &str, format: OutputFormat) -> Result<()> {
    let state = load_state(url, config)?.unwrap_or_default();
    let client = ApiClient::from_config(config);
    let query = resolve_series(&state, client.is_live());
    let buckets = client.series(&query)?;

    match format {
        OutputFormat::Json => print_json(&buckets),
        OutputFormat::Table => {
            print_series_table(&query.series, &buckets);
            Ok(())
        }
    }
}

fn print_series_table(series: &[EmoteKey], buckets: &[TimeSeries]) {
    if buckets.is_empty() {
        println!("{}", "No data for this range.".yellow());
        return;
    }

    print!("  {:<26}", "Time".bold());
    for emote in series {
        print!(" {:>10}", emote.as_str().bold());
    }
    println!();

    for (i, bucket) in buckets.iter().enumerate() {
        let mut line = format!("  {:<26}", bucket.time);
        for emote in series {
            let value = bucket.series.get(emote.as_str()).copied().unwrap_or(0.0);
            line.push_str(&format!(" {value:>10.1}"));
        }
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

pub fn run_clips(config: &DashConfig, url: &str, slot: &str, format: OutputFormat) -> Result<()> {
    let slot = ClipSlot::from_str(slot)?;
    let state = load_state(url, config)?.unwrap_or_default();
    let client = ApiClient::from_config(config);
    let query = resolve_clips(&state, slot, client.is_live(), config.clips.limit);

    let clips = client.ranked_clips(&query)?;

    match format {
        OutputFormat::Json => print_json(&clips),
        OutputFormat::Table => {
            print_clip_table(slot, &clips, query.index);
            Ok(())
        }
    }
}

fn print_clip_table(slot: ClipSlot, clips: &[Clip], index: i64) {
    let title = match slot {
        ClipSlot::Max => "Top clips",
        ClipSlot::Min => "Lowest clips",
    };
    println!("{}", title.bold().cyan());

    if clips.is_empty() {
        println!("  {}", "No clips.".yellow());
        return;
    }

    let cursor = ClipCursor::new(clips, index);
    let current = cursor.current().clip().map(|c| c.clip_id.as_str());
    println!("  {:<3} {:>6}  {:<26} Clip", "#", "Count", "Time");
    for (i, clip) in clips.iter().enumerate() {
        let line = format!("  {:<3} {:>6}  {:<26} {}", i + 1, clip.count, clip.time, clip.clip_id);
        if Some(clip.clip_id.as_str()) == current {
            println!("{}", line.green().bold());
        } else {
            println!("{line}");
        }
    }

    if cursor.current().clip().is_none() {
        println!("  {}", format!("cursor {index} is outside the list").dimmed());
    }
}

pub fn run_clip_at(config: &DashConfig, unix_seconds: f64, format: OutputFormat) -> Result<()> {
    let client = ApiClient::from_config(config);
    let clip = client.nearest_clip(unix_seconds)?;

    match (format, clip) {
        (OutputFormat::Json, clip) => print_json(&clip),
        (OutputFormat::Table, Some(clip)) => {
            println!("{} {} ({})", "Clip:".bold(), clip.clip_id, clip.time);
            println!(
                "  {}",
                crate::api::clip_embed_url(&clip.clip_id, "localhost").dimmed()
            );
            Ok(())
        }
        (OutputFormat::Table, None) => {
            println!("{}", "No clip near that time.".yellow());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// emote-dash watch
// ---------------------------------------------------------------------------

/// Poll the upstream for the view in `url` and print each result that
/// differs from the last one settled for its key.
///
/// Runs until the process is interrupted.
pub fn run_watch(config: &DashConfig, url: &str) -> Result<()> {
    let state = Arc::new(load_state(url, config)?.unwrap_or_default());
    let client = Arc::new(ApiClient::from_config(config));
    let live = Arc::new(AtomicBool::new(false));
    let polling = &config.polling;

    println!(
        "{} {} (Ctrl+C to stop)",
        "Watching".bold().cyan(),
        client.base_url()
    );

    let live_poller = {
        let client = Arc::clone(&client);
        let live = Arc::clone(&live);
        Poller::spawn("live", polling.live_status_interval(), move || {
            let now = client.is_live();
            if live.swap(now, Ordering::SeqCst) != now {
                println!("{} live={now}", timestamp());
            }
        })?
    };

    let series_cache: Arc<QueryCache<Vec<TimeSeries>>> = Arc::new(QueryCache::new());
    let series_poller = {
        let (client, live, state, cache) = (
            Arc::clone(&client),
            Arc::clone(&live),
            Arc::clone(&state),
            Arc::clone(&series_cache),
        );
        let mut first = true;
        Poller::spawn("series", polling.series_interval(), move || {
            let is_live = live.load(Ordering::SeqCst);
            // Offline data does not change; fetch it once.
            if !is_live && !first {
                return;
            }
            first = false;

            let query = resolve_series(&state, is_live);
            let key = QueryKey::series(&query);
            let ticket = cache.issue(key);
            match client.series(&query) {
                Ok(buckets) => {
                    let summary = summarize_series(&query.series, &buckets);
                    if cache.settle_changed(&ticket, buckets) {
                        println!("{} series {summary}", timestamp());
                    }
                }
                Err(e) => log::warn!("watch.series_failed error={e}"),
            }
        })?
    };

    let clip_cache: Arc<QueryCache<Vec<Clip>>> = Arc::new(QueryCache::new());
    let clip_limit = config.clips.limit;
    let clips_poller = {
        let (client, live, state, cache) = (
            Arc::clone(&client),
            Arc::clone(&live),
            Arc::clone(&state),
            Arc::clone(&clip_cache),
        );
        Poller::spawn("clips", polling.clips_interval(), move || {
            let is_live = live.load(Ordering::SeqCst);
            for slot in [ClipSlot::Max, ClipSlot::Min] {
                let query = resolve_clips(&state, slot, is_live, clip_limit);
                let ticket = cache.issue(QueryKey::clips(&query));
                match client.ranked_clips(&query) {
                    Ok(clips) => {
                        let current = ClipCursor::new(&clips, query.index)
                            .current()
                            .clip()
                            .map(|c| format!("{} ({})", c.clip_id, c.count))
                            .unwrap_or_else(|| "none".to_string());
                        if cache.settle_changed(&ticket, clips) {
                            println!("{} clips[{slot}] current={current}", timestamp());
                        }
                    }
                    Err(e) => log::warn!("watch.clips_failed slot={slot} error={e}"),
                }
            }
        })?
    };

    log::info!(
        "watch.start pollers={},{},{}",
        live_poller.name(),
        series_poller.name(),
        clips_poller.name()
    );

    loop {
        std::thread::park();
    }
}

fn summarize_series(series: &[EmoteKey], buckets: &[TimeSeries]) -> String {
    let Some(last) = buckets.last() else {
        return "empty".to_string();
    };
    let values: Vec<String> = series
        .iter()
        .map(|e| format!("{e}={}", last.series.get(e.as_str()).copied().unwrap_or(0.0)))
        .collect();
    format!("buckets={} last={} {}", buckets.len(), last.time, values.join(" "))
}

fn timestamp() -> colored::ColoredString {
    chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
}

// ---------------------------------------------------------------------------
// emote-dash serve
// ---------------------------------------------------------------------------

pub fn run_serve(config: &DashConfig, addr: Option<&str>) -> Result<()> {
    let addr = addr.unwrap_or(&config.web.addr);
    web::serve(config, addr)
}

// ---------------------------------------------------------------------------
// emote-dash history
// ---------------------------------------------------------------------------

pub fn run_history(limit: usize, format: OutputFormat) -> Result<()> {
    let log = HistoryLog::default_location().context("could not determine home directory")?;
    let entries = log.read_recent(limit);

    if format == OutputFormat::Json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("{}", "No navigations recorded yet.".yellow());
        return Ok(());
    }

    println!("{}", "Recent navigations".bold().cyan());
    for entry in &entries {
        println!(
            "  {} {:<7} {}",
            entry.timestamp.dimmed(),
            entry.origin,
            entry.url
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// emote-dash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective emote-dash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file().is_some_and(|p| p.exists());
    let project_exists = config::project_config_file().is_some_and(|p| p.exists());

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.emote-dash/config.toml", global_exists);
    print_source(".emote-dash.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "EMOTE_DASH_* environment variables".dimmed()
    );
    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    let path = config::set_config_value(key, value)?;
    println!(
        "{} Set {} = {} in {}",
        "✓".green().bold(),
        key.bold(),
        value,
        path.display()
    );
    Ok(())
}

pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn join_emotes(emotes: &[EmoteKey]) -> String {
    emotes.iter().map(|e| e.as_str()).collect::<Vec<_>>().join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Table);
    }

    #[test]
    fn base_path_keeps_the_origin() {
        assert_eq!(base_path("http://localhost:9747/?data=%7B%7D"), "http://localhost:9747/");
        assert_eq!(base_path("/dash?data=x"), "/dash");
        assert_eq!(base_path("?data=x"), "/");
        assert_eq!(base_path("data=x"), "/");
        assert_eq!(base_path(""), "/");
    }

    #[test]
    fn navigator_targets_the_input_origin() {
        let config = DashConfig::default();
        let navigation = with_navigator(&config, "http://host:1/?data=x", None, None, |nav| {
            nav.navigate(&serde_json::json!({ "chartType": "bar" }))
        })
        .unwrap();
        assert!(navigation.url.starts_with("http://host:1/?data="));
    }

    #[test]
    fn invalid_patch_is_an_error() {
        let config = DashConfig::default();
        let result = with_navigator(&config, "/", None, None, |nav| {
            nav.navigate(&serde_json::json!({ "chartType": "pie" }))
        });
        assert!(result.is_err());
    }

    #[test]
    fn series_summary_reads_last_bucket() {
        let buckets = vec![TimeSeries {
            time: "t1".to_string(),
            series: BTreeMap::from([("two".to_string(), 3.0)]),
        }];
        assert_eq!(
            summarize_series(&[EmoteKey::Two, EmoteKey::Lol], &buckets),
            "buckets=1 last=t1 two=3 lol=0"
        );
        assert_eq!(summarize_series(&[EmoteKey::Two], &[]), "empty");
    }

    #[test]
    fn join_emotes_uses_wire_names() {
        assert_eq!(join_emotes(&[EmoteKey::WhoAsked, EmoteKey::Two]), "who_asked, two");
    }
}

//! Embedded web dashboard for emote-dash.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - The server-rendered dashboard, driven entirely by the `data` query
//!   parameter
//! - `/navigate` and `/toggle`, which apply one patch and redirect (303) to
//!   the resulting URL
//! - JSON endpoints exposing the validated state and chart configuration
//!
//! Launched via `emote-dash serve` (default: `http://127.0.0.1:9747`).

mod api;
mod frontend;

use std::io::Cursor;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::api::{ApiClient, Clip, DashboardSource, TimeSeries};
use crate::chart::ChartConfig;
use crate::config::DashConfig;
use crate::history::HistoryLog;
use crate::resolve::{ResolvedView, resolve, resolve_clips};
use crate::state::{
    ClipSlot, DashboardUrlState, EmoteKey, Navigator, ValidationError, codec::query_param,
    state_from_url,
};

pub use frontend::escape;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Everything a request handler needs, borrowed for the server's lifetime.
#[derive(Debug)]
pub struct WebContext<'a, S> {
    pub source: &'a S,
    /// Query parameter carrying the state.
    pub param: &'a str,
    pub clip_limit: u32,
    pub history: Option<&'a HistoryLog>,
    /// Host name passed to Twitch as the embed `parent`.
    pub embed_parent: String,
}

/// Start the web dashboard server on `addr`.
///
/// Blocks the current thread. Handles requests sequentially (sufficient for
/// a local single-user dashboard).
pub fn serve(config: &DashConfig, addr: &str) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    let client = ApiClient::from_config(config);
    let history = config
        .logging
        .history
        .then(HistoryLog::default_location)
        .flatten();
    let ctx = WebContext {
        source: &client,
        param: &config.state.query_param,
        clip_limit: config.clips.limit,
        history: history.as_ref(),
        embed_parent: embed_parent(addr),
    };

    println!("emote-dash running at http://{addr} (upstream {})", client.base_url());
    println!("Press Ctrl+C to stop.\n");
    log::info!("web.start addr={addr} upstream={}", client.base_url());

    if config.web.open_browser
        && let Err(e) = open_browser(&format!("http://{addr}"))
    {
        log::debug!("web.open_browser_failed error={e}");
    }

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let reply = dispatch(&ctx, &method, &url);
        let status = reply.status;

        match reply.into_response() {
            Ok(resp) => {
                if let Err(e) = request.respond(resp) {
                    log::debug!("web.respond_failed error={e}");
                }
            }
            Err(e) => {
                log::error!("web.reply_failed url={url} error={e:#}");
                let _ = request.respond(Response::from_string("internal error").with_status_code(StatusCode(500)));
            }
        }

        log::info!("web.request method={method} url={url} status={status}");
    }

    Ok(())
}

/// Twitch only embeds for named parents; bind addresses map to `localhost`.
fn embed_parent(addr: &str) -> String {
    let host = addr.rsplit_once(':').map_or(addr, |(host, _)| host);
    match host {
        "" | "0.0.0.0" | "127.0.0.1" | "[::]" | "[::1]" => "localhost".to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Dispatch an incoming request to the appropriate handler.
pub fn dispatch<S: DashboardSource>(ctx: &WebContext<'_, S>, method: &Method, url: &str) -> Reply {
    let path = url.split(['?', '#']).next().unwrap_or(url);

    match (method, path) {
        // Dashboard
        (&Method::Get, "/") | (&Method::Get, "/index.html") => get_dashboard(ctx, url),

        // Navigation
        (&Method::Get, "/navigate") => get_navigate(ctx, url),
        (&Method::Get, "/toggle") => get_toggle(ctx, url),

        // API
        (&Method::Get, "/api/state") => api::get_state(ctx, url),
        (&Method::Get, "/api/chart") => api::get_chart(ctx, url),

        // 404
        _ if path.starts_with("/api/") => Reply::json(404, &serde_json::json!({ "error": "not found" })),
        _ => Reply::html(404, frontend::render_not_found(path)),
    }
}

// ---------------------------------------------------------------------------
// Page handlers
// ---------------------------------------------------------------------------

fn get_dashboard<S: DashboardSource>(ctx: &WebContext<'_, S>, url: &str) -> Reply {
    let state = match state_from_url(url, ctx.param) {
        Ok(state) => state,
        Err(e) => {
            log::info!("web.invalid_state violations={}", e.violations.len());
            return Reply::html(400, frontend::render_violations(&e));
        }
    };

    let view = resolve(state.as_ref(), ctx.source.is_live(), ctx.clip_limit);
    let data = match fetch_view(ctx.source, &view) {
        Ok(data) => data,
        Err(e) => {
            log::warn!("web.fetch_failed error={e}");
            return Reply::html(502, frontend::render_upstream_error(&e));
        }
    };

    let nearest = view
        .clicked_unix_seconds
        .and_then(|t| match ctx.source.nearest_clip(t) {
            Ok(clip) => clip,
            Err(e) => {
                log::warn!("web.nearest_clip_failed error={e}");
                None
            }
        });

    let chart = ChartConfig::build(&view.series, &data.buckets);
    Reply::html(
        200,
        frontend::render_dashboard(&frontend::DashboardPage {
            state: state.as_ref(),
            param: ctx.param,
            view: &view,
            chart: &chart,
            max_clips: &data.max_clips,
            min_clips: &data.min_clips,
            nearest: nearest.as_ref(),
            embed_parent: &ctx.embed_parent,
        }),
    )
}

struct ViewData {
    buckets: Vec<TimeSeries>,
    max_clips: Vec<Clip>,
    min_clips: Vec<Clip>,
}

fn fetch_view<S: DashboardSource>(
    source: &S,
    view: &ResolvedView,
) -> Result<ViewData, crate::api::ApiError> {
    Ok(ViewData {
        buckets: source.series(&view.series)?,
        max_clips: source.ranked_clips(&view.max_clips)?,
        min_clips: source.ranked_clips(&view.min_clips)?,
    })
}

/// `GET /navigate?data=<current>&patch=<json>`
///
/// A clip index in the patch is clamped against the list it points into,
/// so a stale or hand-written link still lands on a clip.
fn get_navigate<S: DashboardSource>(ctx: &WebContext<'_, S>, url: &str) -> Reply {
    let result = read_patch(url).and_then(|patch| {
        let current = state_from_url(url, ctx.param)?;
        navigator(ctx, current.as_ref())
            .navigate_clamped(&patch, |slot, next| clip_count(ctx, next, slot))
    });
    navigation_reply(result)
}

/// Size of the list `slot` shows for `state`, or `None` when it cannot be
/// fetched (the index is then left as requested).
fn clip_count<S: DashboardSource>(
    ctx: &WebContext<'_, S>,
    state: &DashboardUrlState,
    slot: ClipSlot,
) -> Option<usize> {
    let query = resolve_clips(state, slot, ctx.source.is_live(), ctx.clip_limit);
    match ctx.source.ranked_clips(&query) {
        Ok(clips) => Some(clips.len()),
        Err(e) => {
            log::warn!("web.clip_count_failed slot={slot} error={e}");
            None
        }
    }
}

/// `GET /toggle?data=<current>&emote=<key>`
fn get_toggle<S: DashboardSource>(ctx: &WebContext<'_, S>, url: &str) -> Reply {
    let result = read_emote(url).and_then(|emote| {
        let current = state_from_url(url, ctx.param)?;
        navigator(ctx, current.as_ref()).toggle_series(emote)
    });
    navigation_reply(result)
}

fn navigator<'a, S>(ctx: &'a WebContext<'_, S>, current: Option<&'a DashboardUrlState>) -> Navigator<'a> {
    let navigator = Navigator::new(current, ctx.param);
    match ctx.history {
        Some(history) => navigator.with_history(history),
        None => navigator,
    }
}

fn navigation_reply(result: Result<crate::state::Navigation, ValidationError>) -> Reply {
    match result {
        Ok(navigation) => Reply::redirect(navigation.url),
        Err(e) => Reply::html(400, frontend::render_violations(&e)),
    }
}

fn read_patch(url: &str) -> Result<serde_json::Value, ValidationError> {
    let raw = query_param(url, "patch")?
        .ok_or_else(|| ValidationError::single("patch", "missing patch parameter"))?;
    serde_json::from_str(&raw).map_err(|e| ValidationError::single("patch", format!("not valid JSON: {e}")))
}

fn read_emote(url: &str) -> Result<EmoteKey, ValidationError> {
    let raw = query_param(url, "emote")?
        .ok_or_else(|| ValidationError::single("emote", "missing emote parameter"))?;
    EmoteKey::from_str(&raw).map_err(|e| ValidationError::single("emote", e.to_string()))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// A handler's answer before it is turned into a `tiny_http` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Redirect target for `303` replies.
    pub location: Option<String>,
}

impl Reply {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body,
            location: None,
        }
    }

    pub fn json<T: Serialize>(status: u16, data: &T) -> Self {
        match serde_json::to_string(data) {
            Ok(body) => Self {
                status,
                content_type: "application/json; charset=utf-8",
                body,
                location: None,
            },
            Err(e) => {
                log::error!("web.serialize_failed error={e}");
                Self::json(500, &serde_json::json!({ "error": "serialization failed" }))
            }
        }
    }

    pub fn redirect(location: String) -> Self {
        Self {
            status: 303,
            content_type: "text/plain; charset=utf-8",
            body: String::new(),
            location: Some(location),
        }
    }

    fn into_response(self) -> Result<Response<Cursor<Vec<u8>>>> {
        let mut response = Response::from_data(self.body.into_bytes())
            .with_header(header("Content-Type", self.content_type)?)
            .with_status_code(StatusCode(self.status));
        if let Some(location) = &self.location {
            response.add_header(header("Location", location)?);
        }
        Ok(response)
    }
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name, value).map_err(|()| anyhow::anyhow!("invalid {name} header value"))
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

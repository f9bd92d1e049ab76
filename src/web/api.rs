//! JSON API handlers for the web dashboard.
//!
//! Each handler reads the state from the request URL and returns a
//! [`Reply`] with JSON content.

use serde::Serialize;

use crate::api::{ApiError, DashboardSource};
use crate::chart::ChartConfig;
use crate::resolve::{ResolvedView, resolve};
use crate::state::{DashboardUrlState, ValidationError, Violation, state_from_url};

use super::{Reply, WebContext};

// ---------------------------------------------------------------------------
// JSON response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StateResponse<'a> {
    state: Option<&'a DashboardUrlState>,
    resolved: &'a ResolvedView,
    live: bool,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    #[serde(skip_serializing_if = "no_violations")]
    violations: &'a [Violation],
}

fn no_violations(violations: &&[Violation]) -> bool {
    violations.is_empty()
}

fn validation_failed(error: &ValidationError) -> Reply {
    Reply::json(
        400,
        &ErrorResponse {
            error: error.to_string(),
            violations: &error.violations,
        },
    )
}

fn upstream_failed(error: &ApiError) -> Reply {
    Reply::json(
        502,
        &ErrorResponse {
            error: error.to_string(),
            violations: &[],
        },
    )
}

// ---------------------------------------------------------------------------
// GET /api/state
// ---------------------------------------------------------------------------

/// Validated state plus every resolved query for it.
pub fn get_state<S: DashboardSource>(ctx: &WebContext<'_, S>, url: &str) -> Reply {
    let state = match state_from_url(url, ctx.param) {
        Ok(state) => state,
        Err(e) => return validation_failed(&e),
    };

    let live = ctx.source.is_live();
    let resolved = resolve(state.as_ref(), live, ctx.clip_limit);

    Reply::json(
        200,
        &StateResponse {
            state: state.as_ref(),
            resolved: &resolved,
            live,
        },
    )
}

// ---------------------------------------------------------------------------
// GET /api/chart
// ---------------------------------------------------------------------------

/// The typed chart configuration the dashboard would render.
pub fn get_chart<S: DashboardSource>(ctx: &WebContext<'_, S>, url: &str) -> Reply {
    let state = match state_from_url(url, ctx.param) {
        Ok(state) => state,
        Err(e) => return validation_failed(&e),
    };

    let view = resolve(state.as_ref(), ctx.source.is_live(), ctx.clip_limit);
    match ctx.source.series(&view.series) {
        Ok(buckets) => Reply::json(200, &ChartConfig::build(&view.series, &buckets)),
        Err(e) => {
            log::warn!("web.chart_fetch_failed error={e}");
            upstream_failed(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_omits_empty_violations() {
        let body = serde_json::to_value(ErrorResponse {
            error: "boom".to_string(),
            violations: &[],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "error": "boom" }));
    }

    #[test]
    fn validation_failure_is_400_with_paths() {
        let reply = validation_failed(&ValidationError::single("series[0]", "unknown emote"));
        assert_eq!(reply.status, 400);
        let body: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
        assert_eq!(body["violations"][0]["path"], "series[0]");
    }
}

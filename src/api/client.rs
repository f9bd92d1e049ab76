/// Synchronous HTTP client for the upstream emote analytics API.
///
/// Built once from the resolved config and shared by the CLI, the web
/// dashboard and the pollers. All requests are plain `GET`s with query
/// parameters and JSON bodies.
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use super::{ApiError, Clip, DashboardSource, TimeSeries};
use crate::config::DashConfig;
use crate::resolve::{ClipQuery, SeriesQuery};
use crate::state::EmoteKey;

#[derive(Debug, Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    /// Upstream numeric ids for emote keys (`clip_counts?emote_id=`).
    emote_ids: BTreeMap<String, i64>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, emote_ids: BTreeMap<String, i64>) -> Self {
        // "localhost" may resolve to ::1 first and stall when the API only
        // binds IPv4.
        let base_url = base_url
            .trim_end_matches('/')
            .replace("://localhost", "://127.0.0.1");

        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url,
            emote_ids,
        }
    }

    pub fn from_config(config: &DashConfig) -> Self {
        Self::new(
            &config.api_base_url(),
            Duration::from_millis(config.api.timeout_ms),
            config.clips.emote_ids.clone(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn emote_id(&self, emote: EmoteKey) -> Option<i64> {
        let id = self.emote_ids.get(emote.as_str()).copied();
        if id.is_none() {
            log::warn!("api.emote_id_missing emote={emote}");
        }
        id
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{endpoint}", self.base_url);
        let request = query
            .iter()
            .fold(self.agent.get(&url), |req, (key, value)| req.query(key, value));

        let started = Instant::now();
        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(code, _) => ApiError::Status { endpoint, code },
            ureq::Error::Transport(t) => ApiError::Transport {
                endpoint,
                message: t.to_string(),
            },
        })?;

        log::debug!(
            "api.get endpoint={endpoint} status={} elapsed_ms={}",
            response.status(),
            started.elapsed().as_millis()
        );

        response.into_json::<T>().map_err(|e| ApiError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

impl DashboardSource for ApiClient {
    fn is_live(&self) -> bool {
        match self.get_json::<bool>("/api/is_live", &[]) {
            Ok(live) => live,
            Err(e) => {
                log::warn!("api.is_live_failed error={e}");
                false
            }
        }
    }

    fn series(&self, query: &SeriesQuery) -> Result<Vec<TimeSeries>, ApiError> {
        self.get_json("/api/series", &series_params(query))
    }

    fn clip_counts(&self, query: &ClipQuery) -> Result<Vec<Clip>, ApiError> {
        let emote_id = query.emote.and_then(|e| self.emote_id(e));
        self.get_json("/api/clip_counts", &clip_params(query, emote_id))
    }

    fn nearest_clip(&self, unix_seconds: f64) -> Result<Option<Clip>, ApiError> {
        let Some(time) = unix_to_rfc3339(unix_seconds) else {
            return Ok(None);
        };

        match self.get_json::<Clip>("/api/clip", &[("time", time)]) {
            Ok(clip) if clip.is_placeholder() => Ok(None),
            Ok(clip) => Ok(Some(clip)),
            Err(ApiError::Status { code, .. }) => {
                log::debug!("api.nearest_clip_none status={code}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Query parameter builders
// ---------------------------------------------------------------------------

pub(crate) fn series_params(query: &SeriesQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("span", query.span.as_str().to_string()),
        ("grouping", query.grouping.as_str().to_string()),
        ("rollingAverage", query.rolling_average.to_string()),
    ];
    if let Some(from) = &query.from {
        params.push(("from", from.clone()));
    }
    if let Some(to) = &query.to {
        params.push(("to", to.clone()));
    }
    params
}

pub(crate) fn clip_params(query: &ClipQuery, emote_id: Option<i64>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("span", query.span.as_str().to_string()),
        ("grouping", query.grouping.as_str().to_string()),
        ("order", query.order.as_str().to_string()),
        ("limit", query.limit.to_string()),
    ];
    if let Some(id) = emote_id {
        params.push(("emote_id", id.to_string()));
    }
    if let Some(from) = &query.from {
        params.push(("from", from.clone()));
    }
    params
}

/// Chart timestamps arrive as fractional seconds.
pub fn unix_to_rfc3339(unix_seconds: f64) -> Option<String> {
    if !unix_seconds.is_finite() {
        return None;
    }
    let millis = (unix_seconds * 1000.0).round() as i64;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{DEFAULT_CLIP_LIMIT, resolve};
    use crate::state::{ClipOrder, EmoteKey};

    #[test]
    fn base_url_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/", Duration::from_secs(1), BTreeMap::new());
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn series_params_use_upstream_names() {
        let view = resolve(None, false, DEFAULT_CLIP_LIMIT);
        let params = series_params(&view.series);
        assert_eq!(
            params,
            vec![
                ("span", "9 hours".to_string()),
                ("grouping", "minute".to_string()),
                ("rollingAverage", "15".to_string()),
            ]
        );
    }

    #[test]
    fn clip_params_include_order_and_emote_id() {
        let mut view = resolve(None, true, 10);
        view.min_clips.emote = Some(EmoteKey::Two);
        assert_eq!(view.min_clips.order, ClipOrder::Asc);

        let params = clip_params(&view.min_clips, Some(2));
        assert!(params.contains(&("order", "ASC".to_string())));
        assert!(params.contains(&("grouping", "25 seconds".to_string())));
        assert!(params.contains(&("emote_id", "2".to_string())));
        assert!(params.contains(&("limit", "10".to_string())));
    }

    #[test]
    fn unmapped_emote_is_omitted() {
        let client = ApiClient::new("http://x", Duration::from_secs(1), BTreeMap::new());
        assert_eq!(client.emote_id(EmoteKey::Pog), None);
    }

    #[test]
    fn unix_seconds_format_as_utc_millis() {
        assert_eq!(
            unix_to_rfc3339(1_700_000_000.25).as_deref(),
            Some("2023-11-14T22:13:20.250Z")
        );
        assert_eq!(unix_to_rfc3339(f64::NAN), None);
    }

    #[test]
    fn unreachable_upstream_is_not_live() {
        // Port 9 (discard) is not expected to serve HTTP.
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200), BTreeMap::new());
        assert!(!client.is_live());
    }
}

/// Configuration schema and defaults for emote-dash.
///
/// Defines the TOML-serializable configuration structure with the sections
/// `[general]`, `[api]`, `[web]`, `[state]`, `[clips]`, `[polling]` and
/// `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// API base URL for local development.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:8000";

/// API base URL of the hosted service.
pub const PRODUCTION_API_URL: &str = "https://nljokeval-production.up.railway.app";

/// Shortest refresh interval a poller will run at.
pub const MIN_POLL_SECS: u64 = 1;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level emote-dash configuration.
///
/// Maps directly to `~/.emote-dash/config.toml` and `.emote-dash.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub general: GeneralConfig,
    pub api: ApiConfig,
    pub web: WebConfig,
    pub state: StateConfig,
    pub clips: ClipsConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [general]
// ---------------------------------------------------------------------------

/// Which upstream deployment to talk to by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub environment: Environment,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Explicit upstream URL. When unset, derived from `general.environment`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 5000,
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Listen address for `emote-dash serve`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [state]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Query parameter carrying the JSON state.
    pub query_param: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            query_param: crate::state::DEFAULT_QUERY_PARAM.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [clips]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipsConfig {
    /// Clips requested per list.
    pub limit: u32,
    /// Upstream numeric id for each emote key.
    pub emote_ids: BTreeMap<String, i64>,
}

impl Default for ClipsConfig {
    fn default() -> Self {
        Self {
            limit: crate::resolve::DEFAULT_CLIP_LIMIT,
            emote_ids: BTreeMap::from([("two".to_string(), 2)]),
        }
    }
}

// ---------------------------------------------------------------------------
// [polling]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub live_status_secs: u64,
    /// Series refresh; only applied while the stream is live.
    pub series_secs: u64,
    pub clips_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            live_status_secs: 30,
            series_secs: 10,
            clips_secs: 30,
        }
    }
}

impl PollingConfig {
    pub fn live_status_interval(&self) -> Duration {
        poll_interval(self.live_status_secs)
    }

    pub fn series_interval(&self) -> Duration {
        poll_interval(self.series_secs)
    }

    pub fn clips_interval(&self) -> Duration {
        poll_interval(self.clips_secs)
    }

    /// Keys whose value is below [`MIN_POLL_SECS`].
    pub fn too_short(&self) -> Vec<&'static str> {
        [
            ("live_status_secs", self.live_status_secs),
            ("series_secs", self.series_secs),
            ("clips_secs", self.clips_secs),
        ]
        .into_iter()
        .filter(|(_, secs)| *secs < MIN_POLL_SECS)
        .map(|(key, _)| key)
        .collect()
    }
}

/// A zero interval would refetch in a tight loop; floor it.
fn poll_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.max(MIN_POLL_SECS))
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `env_logger` filter; `RUST_LOG` still takes precedence.
    pub level: String,
    /// Append navigations to `~/.emote-dash/history.jsonl`.
    pub history: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            history: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

impl DashConfig {
    /// Effective upstream URL: explicit `api.base_url`, else the default
    /// for the configured environment.
    pub fn api_base_url(&self) -> String {
        match &self.api.base_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => match self.general.environment {
                Environment::Development => DEVELOPMENT_API_URL.to_string(),
                Environment::Production => PRODUCTION_API_URL.to_string(),
            },
        }
    }

    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `emote-dash config init`.
    pub fn default_toml() -> String {
        r#"# emote-dash configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (EMOTE_DASH_*)
#   2. Project config (.emote-dash.toml in current directory)
#   3. User global config (~/.emote-dash/config.toml)
#   4. Built-in defaults

[general]
environment = "development"   # development | production

[api]
# base_url = "http://localhost:8000"   # Unset: chosen by general.environment
timeout_ms = 5000

[web]
addr = "127.0.0.1:9747"
open_browser = true

[state]
query_param = "data"          # Query parameter carrying the JSON state

[clips]
limit = 10

[clips.emote_ids]             # Upstream numeric id per emote key
two = 2

[polling]
live_status_secs = 30
series_secs = 10              # Only while the stream is live
clips_secs = 30

[logging]
level = "info"                # error | warn | info | debug | trace
history = true                # Record navigations in ~/.emote-dash/history.jsonl
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Upstream emote analytics API.
///
/// The aggregation, clip ranking and live detection all happen in an
/// external REST service. This module holds its response shapes, a
/// synchronous `ureq` client, and the [`DashboardSource`] seam the web
/// dashboard and the pollers fetch through.
///
/// Failure policy:
///
/// - **live status**: optional, degrades to "not live"
/// - **series / clip lists**: required, surfaced as [`ApiError`]
/// - **nearest clip**: optional, degrades to "no clip"
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod client;

pub use client::ApiClient;

use crate::cursor::sort_for;
use crate::resolve::{ClipQuery, SeriesQuery};

/// Clip ids the upstream uses to say "nothing here".
const NO_CLIP_IDS: &[&str] = &["", "no_clip"];

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One bucket of the emote time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Bucket start, RFC 3339.
    pub time: String,
    /// Count per emote key.
    #[serde(default)]
    pub series: BTreeMap<String, f64>,
}

/// A ranked Twitch clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    pub clip_id: String,
    pub count: i64,
    pub time: String,
}

impl Clip {
    /// Whether the upstream returned its "no clip" sentinel.
    pub fn is_placeholder(&self) -> bool {
        NO_CLIP_IDS.contains(&self.clip_id.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{endpoint} returned HTTP {code}")]
    Status { endpoint: &'static str, code: u16 },
    #[error("{endpoint} request failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint} returned an unexpected body: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Source seam
// ---------------------------------------------------------------------------

/// Where dashboard data comes from.
pub trait DashboardSource {
    /// Never fails: an unreachable upstream counts as "not live".
    fn is_live(&self) -> bool;

    fn series(&self, query: &SeriesQuery) -> Result<Vec<TimeSeries>, ApiError>;

    fn clip_counts(&self, query: &ClipQuery) -> Result<Vec<Clip>, ApiError>;

    /// Clip list ready for a cursor: placeholders dropped, ranked in the
    /// query's order.
    fn ranked_clips(&self, query: &ClipQuery) -> Result<Vec<Clip>, ApiError> {
        let mut clips = self.clip_counts(query)?;
        clips.retain(|clip| !clip.is_placeholder());
        sort_for(query.order, &mut clips);
        Ok(clips)
    }

    /// Clip closest to a chart timestamp, or `None` when there is none.
    fn nearest_clip(&self, unix_seconds: f64) -> Result<Option<Clip>, ApiError>;
}

/// Twitch player URL for embedding a clip.
pub fn clip_embed_url(clip_id: &str, parent: &str) -> String {
    format!(
        "https://clips.twitch.tv/embed?clip={}&parent={}",
        urlencoding::encode(clip_id),
        urlencoding::encode(parent)
    )
}

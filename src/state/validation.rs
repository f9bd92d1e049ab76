//! Parse and validate a raw URL-state blob into [`DashboardUrlState`].
//!
//! Validation walks the JSON tree by hand so that every violation is
//! reported with its field path in one pass. A state is only produced when
//! the walk found nothing wrong; there is no partially-populated result and
//! no coercion of out-of-vocabulary values.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

use super::schema::{
    ChartType, ClipGrouping, ClipParams, ClipSpan, DashboardUrlState, EmoteKey, SeriesGrouping,
    SeriesParams, SeriesSpan, Vocabulary,
};

const STATE_KEYS: &[&str] = &[
    "seriesParams",
    "minClipParams",
    "maxClipParams",
    "clickedUnixSeconds",
    "chartType",
    "series",
    "maxClipIndex",
    "minClipIndex",
];

const SERIES_PARAM_KEYS: &[&str] = &[
    "span",
    "grouping",
    "rollingAverage",
    "from",
    "to",
    "chartType",
    "series",
];

const CLIP_PARAM_KEYS: &[&str] = &["span", "grouping", "index", "emote"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A single field-level problem.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// Dotted path to the offending field (`seriesParams.span`, `series[1]`),
    /// or `$` for the document itself.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The URL state was malformed. Carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid dashboard state: {}", join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// Paths of every violation, in discovery order.
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse the raw value of the state query parameter.
///
/// `None` (parameter absent) yields `Ok(None)`; callers then apply their own
/// defaults. Anything present must be a valid state object.
pub fn parse_state(raw: Option<&str>) -> Result<Option<DashboardUrlState>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ValidationError::single("$", format!("invalid JSON: {e}")))?;

    validate_value(&value).map(Some)
}

/// Validate an already-parsed JSON value.
pub fn validate_value(value: &Value) -> Result<DashboardUrlState, ValidationError> {
    let mut walker = Walker::default();
    let state = walker.state(value);

    if walker.violations.is_empty() {
        Ok(state)
    } else {
        Err(ValidationError {
            violations: walker.violations,
        })
    }
}

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Walker {
    violations: Vec<Violation>,
}

fn child(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// `null` is treated the same as an absent key.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

impl Walker {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }

    fn object<'a>(&mut self, path: &str, value: &'a Value) -> Option<&'a Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                let at = if path.is_empty() { "$" } else { path };
                self.push(at, format!("expected an object, found {}", kind_of(value)));
                None
            }
        }
    }

    fn reject_unknown(&mut self, path: &str, map: &Map<String, Value>, allowed: &[&str]) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.push(child(path, key), "unknown field");
            }
        }
    }

    fn state(&mut self, value: &Value) -> DashboardUrlState {
        let Some(map) = self.object("", value) else {
            return DashboardUrlState::default();
        };
        self.reject_unknown("", map, STATE_KEYS);

        DashboardUrlState {
            series_params: present(map, "seriesParams")
                .and_then(|v| self.series_params("seriesParams", v)),
            min_clip_params: present(map, "minClipParams")
                .and_then(|v| self.clip_params("minClipParams", v)),
            max_clip_params: present(map, "maxClipParams")
                .and_then(|v| self.clip_params("maxClipParams", v)),
            clicked_unix_seconds: present(map, "clickedUnixSeconds")
                .and_then(|v| self.number("clickedUnixSeconds", v)),
            chart_type: present(map, "chartType")
                .and_then(|v| self.vocab::<ChartType>("chartType", v)),
            series: present(map, "series").and_then(|v| self.series("series", v)),
            max_clip_index: present(map, "maxClipIndex")
                .and_then(|v| self.integer("maxClipIndex", v)),
            min_clip_index: present(map, "minClipIndex")
                .and_then(|v| self.integer("minClipIndex", v)),
        }
    }

    fn series_params(&mut self, path: &str, value: &Value) -> Option<SeriesParams> {
        let map = self.object(path, value)?;
        self.reject_unknown(path, map, SERIES_PARAM_KEYS);

        Some(SeriesParams {
            span: present(map, "span")
                .and_then(|v| self.vocab::<SeriesSpan>(&child(path, "span"), v))
                .unwrap_or_default(),
            grouping: present(map, "grouping")
                .and_then(|v| self.vocab::<SeriesGrouping>(&child(path, "grouping"), v))
                .unwrap_or_default(),
            rolling_average: present(map, "rollingAverage")
                .and_then(|v| self.rolling_average(&child(path, "rollingAverage"), v)),
            from: present(map, "from").and_then(|v| self.timestamp(&child(path, "from"), v)),
            to: present(map, "to").and_then(|v| self.timestamp(&child(path, "to"), v)),
            chart_type: present(map, "chartType")
                .and_then(|v| self.vocab::<ChartType>(&child(path, "chartType"), v)),
            series: present(map, "series").and_then(|v| self.series(&child(path, "series"), v)),
        })
    }

    fn clip_params(&mut self, path: &str, value: &Value) -> Option<ClipParams> {
        let map = self.object(path, value)?;
        self.reject_unknown(path, map, CLIP_PARAM_KEYS);

        Some(ClipParams {
            span: present(map, "span")
                .and_then(|v| self.vocab::<ClipSpan>(&child(path, "span"), v))
                .unwrap_or_default(),
            grouping: present(map, "grouping")
                .and_then(|v| self.vocab::<ClipGrouping>(&child(path, "grouping"), v))
                .unwrap_or_default(),
            index: present(map, "index").and_then(|v| self.integer(&child(path, "index"), v)),
            emote: present(map, "emote").and_then(|v| self.vocab::<EmoteKey>(&child(path, "emote"), v)),
        })
    }

    fn vocab<T: Vocabulary>(&mut self, path: &str, value: &Value) -> Option<T> {
        let Some(raw) = value.as_str() else {
            self.push(
                path,
                format!("expected a {} string, found {}", T::KIND, kind_of(value)),
            );
            return None;
        };

        let parsed = T::from_wire(raw);
        if parsed.is_none() {
            self.push(
                path,
                format!("unknown {} \"{raw}\", expected one of {}", T::KIND, T::expected()),
            );
        }
        parsed
    }

    fn series(&mut self, path: &str, value: &Value) -> Option<Vec<EmoteKey>> {
        let Some(items) = value.as_array() else {
            self.push(path, format!("expected an array of emotes, found {}", kind_of(value)));
            return None;
        };

        let before = self.violations.len();
        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let item_path = format!("{path}[{i}]");
            if let Some(key) = self.vocab::<EmoteKey>(&item_path, item) {
                if seen.insert(key) {
                    keys.push(key);
                } else {
                    self.push(item_path, format!("duplicate emote \"{key}\""));
                }
            }
        }

        (self.violations.len() == before).then_some(keys)
    }

    fn integer(&mut self, path: &str, value: &Value) -> Option<i64> {
        let parsed = value.as_i64();
        if parsed.is_none() {
            self.push(path, format!("expected an integer, found {}", describe(value)));
        }
        parsed
    }

    fn rolling_average(&mut self, path: &str, value: &Value) -> Option<u32> {
        let parsed = value.as_u64().and_then(|n| u32::try_from(n).ok());
        if parsed.is_none() {
            self.push(
                path,
                format!("expected a non-negative integer, found {}", describe(value)),
            );
        }
        parsed
    }

    fn number(&mut self, path: &str, value: &Value) -> Option<f64> {
        let parsed = value.as_f64().filter(|n| n.is_finite());
        if parsed.is_none() {
            self.push(path, format!("expected a number, found {}", describe(value)));
        }
        parsed
    }

    fn timestamp(&mut self, path: &str, value: &Value) -> Option<String> {
        let Some(raw) = value.as_str() else {
            self.push(path, format!("expected a timestamp string, found {}", kind_of(value)));
            return None;
        };

        if is_timestamp(raw) {
            Some(raw.to_string())
        } else {
            self.push(
                path,
                format!("\"{raw}\" is not an RFC 3339 timestamp or YYYY-MM-DD date"),
            );
            None
        }
    }
}

/// Accepts full RFC 3339 timestamps and plain calendar dates.
pub fn is_timestamp(raw: &str) -> bool {
    DateTime::parse_from_rfc3339(raw).is_ok() || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{s}\""),
        other => kind_of(other).to_string(),
    }
}

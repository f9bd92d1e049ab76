/// Typed model of the dashboard URL state and its closed vocabularies.
///
/// Every enumerated field serializes to the exact wire string the upstream
/// API and the shared URLs use (`"9 hours"`, `"25 seconds"`, `"who_asked"`).
/// Parsing from raw JSON goes through [`super::validation`], which collects
/// every violation instead of stopping at the first one, so the state types
/// only implement `Serialize`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Emote plotted when the URL does not name any series.
pub const DEFAULT_SERIES: &[EmoteKey] = &[EmoteKey::Two];

// ---------------------------------------------------------------------------
// Closed vocabularies
// ---------------------------------------------------------------------------

/// A fixed set of wire strings with a typed variant for each.
pub trait Vocabulary: Sized + Copy + 'static {
    /// Human-readable name used in validation messages.
    const KIND: &'static str;

    fn all() -> &'static [Self];

    fn as_str(self) -> &'static str;

    fn from_wire(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|v| v.as_str() == value)
    }

    /// Quoted, comma-separated list of accepted values.
    fn expected() -> String {
        Self::all()
            .iter()
            .map(|v| format!("\"{}\"", v.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Returned by `FromStr` when a value is outside its vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} \"{value}\", expected one of {expected}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $($variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl Vocabulary for $name {
            const KIND: &'static str = $kind;

            fn all() -> &'static [Self] {
                Self::ALL
            }

            fn as_str(self) -> &'static str {
                $name::as_str(self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$name as Vocabulary>::from_wire(s).ok_or_else(|| UnknownValue {
                    kind: $kind,
                    value: s.to_string(),
                    expected: <$name as Vocabulary>::expected(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

vocabulary! {
    /// Look-back window for the emote time series.
    SeriesSpan ("series span") {
        OneMinute => "1 minute",
        ThirtyMinutes => "30 minutes",
        OneHour => "1 hour",
        NineHours => "9 hours",
        Custom => "custom",
    }
}

vocabulary! {
    /// Bucket width for the emote time series.
    SeriesGrouping ("series grouping") {
        Second => "second",
        Minute => "minute",
        Hour => "hour",
        Day => "day",
        Week => "week",
        Month => "month",
        Year => "year",
    }
}

vocabulary! {
    /// Look-back window when browsing clips.
    ClipSpan ("clip span") {
        NineHours => "9 hours",
        OneWeek => "1 week",
        OneMonth => "1 month",
        OneYear => "1 year",
    }
}

vocabulary! {
    /// Bin size used to rank clips.
    ClipGrouping ("clip grouping") {
        TwentyFiveSeconds => "25 seconds",
        OneMinute => "1 minute",
        FiveMinutes => "5 minutes",
        FifteenMinutes => "15 minutes",
        OneHour => "1 hour",
        OneDay => "1 day",
    }
}

vocabulary! {
    ChartType ("chart type") {
        Line => "line",
        Bar => "bar",
    }
}

vocabulary! {
    /// Sort direction for clip rankings, in the upstream's upper-case form.
    ClipOrder ("clip order") {
        Asc => "ASC",
        Desc => "DESC",
    }
}

vocabulary! {
    /// Tracked emotes. Insertion order in `series` is display order.
    EmoteKey ("emote") {
        Two => "two",
        Lol => "lol",
        Cereal => "cereal",
        Monkas => "monkas",
        Joel => "joel",
        Pog => "pog",
        Huh => "huh",
        No => "no",
        Cocka => "cocka",
        Shock => "shock",
        WhoAsked => "who_asked",
        Copium => "copium",
        Ratjam => "ratjam",
        Sure => "sure",
        Classic => "classic",
        MonkaGiga => "monka_giga",
        Caught => "caught",
        Life => "life",
    }
}

impl Default for SeriesSpan {
    fn default() -> Self {
        Self::NineHours
    }
}

impl Default for SeriesGrouping {
    fn default() -> Self {
        Self::Minute
    }
}

impl Default for ClipSpan {
    fn default() -> Self {
        Self::NineHours
    }
}

impl Default for ClipGrouping {
    fn default() -> Self {
        Self::OneHour
    }
}

impl Default for ChartType {
    fn default() -> Self {
        Self::Line
    }
}

impl EmoteKey {
    /// Plot colour for this emote.
    pub fn color(self) -> &'static str {
        match self {
            Self::Two => "#7cb5ec",
            Self::Lol => "#434348",
            Self::Cereal => "#90ed7d",
            Self::Monkas => "#f7a35c",
            Self::Joel => "#8085e9",
            Self::Pog => "#f15c80",
            Self::Huh => "#e4d354",
            Self::No => "#2b908f",
            Self::Cocka => "#f45b5b",
            Self::Shock => "#8d4654",
            Self::WhoAsked => "#91e8e1",
            Self::Copium => "#696969",
            Self::Ratjam | Self::Sure => "#000000",
            Self::Classic => "#ffff00",
            Self::MonkaGiga => "#808080",
            Self::Caught => "#0000ff",
            Self::Life => "#ff0000",
        }
    }
}

// ---------------------------------------------------------------------------
// Clip slots
// ---------------------------------------------------------------------------

/// The two independent clip-browsing cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipSlot {
    /// Highest counts first ("top clips").
    Max,
    /// Lowest counts first.
    Min,
}

impl ClipSlot {
    pub fn params_key(self) -> &'static str {
        match self {
            Self::Max => "maxClipParams",
            Self::Min => "minClipParams",
        }
    }

    pub fn index_key(self) -> &'static str {
        match self {
            Self::Max => "maxClipIndex",
            Self::Min => "minClipIndex",
        }
    }

    pub fn order(self) -> ClipOrder {
        match self {
            Self::Max => ClipOrder::Desc,
            Self::Min => ClipOrder::Asc,
        }
    }
}

impl fmt::Display for ClipSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
        }
    }
}

impl FromStr for ClipSlot {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" | "top" => Ok(Self::Max),
            "min" | "lowest" => Ok(Self::Min),
            _ => Err(UnknownValue {
                kind: "clip slot",
                value: s.to_string(),
                expected: "\"max\", \"min\"".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything a viewer can adjust, as carried in the shareable URL.
///
/// Absent fields mean "apply the default"; see [`crate::resolve`] for the
/// context-dependent ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUrlState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_params: Option<SeriesParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_clip_params: Option<ClipParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clip_params: Option<ClipParams>,
    /// Chart timestamp the viewer clicked. `None` means no clip is focused,
    /// which is not the same as `Some(0.0)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_unix_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<EmoteKey>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clip_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_clip_index: Option<i64>,
}

impl DashboardUrlState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Series currently plotted: top-level `series`, then
    /// `seriesParams.series`, then [`DEFAULT_SERIES`].
    pub fn effective_series(&self) -> Vec<EmoteKey> {
        self.series
            .clone()
            .or_else(|| self.series_params.as_ref().and_then(|p| p.series.clone()))
            .unwrap_or_else(|| DEFAULT_SERIES.to_vec())
    }

    pub fn effective_chart_type(&self) -> ChartType {
        self.chart_type
            .or_else(|| self.series_params.as_ref().and_then(|p| p.chart_type))
            .unwrap_or_default()
    }

    pub fn clip_params(&self, slot: ClipSlot) -> Option<&ClipParams> {
        match slot {
            ClipSlot::Max => self.max_clip_params.as_ref(),
            ClipSlot::Min => self.min_clip_params.as_ref(),
        }
    }

    pub fn clip_index(&self, slot: ClipSlot) -> Option<i64> {
        match slot {
            ClipSlot::Max => self.max_clip_index,
            ClipSlot::Min => self.min_clip_index,
        }
    }
}

/// Chart query configuration.
///
/// `span` and `grouping` default at the schema level once the object is
/// present, so they are never absent here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesParams {
    pub span: SeriesSpan,
    pub grouping: SeriesGrouping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_average: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<ChartType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<EmoteKey>>,
}

/// One clip-browsing cursor's query settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipParams {
    pub span: ClipSpan,
    pub grouping: ClipGrouping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emote: Option<EmoteKey>,
}

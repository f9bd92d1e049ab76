//! Dashboard URL state: schema, validation, URL codec, and patch semantics.
//!
//! The URL is the only source of truth. Every render reparses it into a
//! [`DashboardUrlState`], and every control produces a patch that becomes
//! the next URL through a [`Navigator`].

pub mod codec;
pub mod merge;
pub mod navigate;
pub mod schema;
pub mod validation;

pub use codec::{DEFAULT_QUERY_PARAM, encode_query, href, state_from_url};
pub use merge::{StatePatch, apply_patch, toggle_series};
pub use navigate::{Navigation, Navigator};
pub use schema::{
    ChartType, ClipGrouping, ClipOrder, ClipParams, ClipSlot, ClipSpan, DEFAULT_SERIES,
    DashboardUrlState, EmoteKey, SeriesGrouping, SeriesParams, SeriesSpan, Vocabulary,
};
pub use validation::{ValidationError, Violation, parse_state, validate_value};

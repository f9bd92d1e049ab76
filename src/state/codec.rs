//! Moving the state in and out of a URL.
//!
//! The whole state travels as one JSON document in a single query parameter
//! (`data` unless configured otherwise), percent-encoded with `urlencoding`.

use super::schema::DashboardUrlState;
use super::validation::{ValidationError, parse_state};

/// Query parameter carrying the state when none is configured.
pub const DEFAULT_QUERY_PARAM: &str = "data";

/// Serialize the state to its compact JSON form.
pub fn to_json(state: &DashboardUrlState) -> String {
    serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string())
}

/// `param=<percent-encoded JSON>`.
pub fn encode_query(state: &DashboardUrlState, param: &str) -> String {
    format!("{}={}", urlencoding::encode(param), urlencoding::encode(&to_json(state)))
}

/// Link to `path` carrying `state`. An empty state produces the bare path so
/// that the default view keeps a clean URL.
pub fn href(path: &str, state: &DashboardUrlState, param: &str) -> String {
    if state.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", encode_query(state, param))
    }
}

/// Extract and decode one query parameter.
///
/// Accepts a full URL, a path with a query string, or a bare query string.
/// Fragments are ignored. Returns the first occurrence when the parameter is
/// repeated.
pub fn query_param(url_or_query: &str, param: &str) -> Result<Option<String>, ValidationError> {
    let without_fragment = url_or_query.split('#').next().unwrap_or_default();
    let query = match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None if without_fragment.contains('=') => without_fragment,
        None => return Ok(None),
    };

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(raw_key)? == param {
            return decode_component(raw_value).map(Some);
        }
    }

    Ok(None)
}

/// Read the state out of a URL, with `None` when the parameter is absent.
pub fn state_from_url(
    url_or_query: &str,
    param: &str,
) -> Result<Option<DashboardUrlState>, ValidationError> {
    let raw = query_param(url_or_query, param)?;
    parse_state(raw.as_deref())
}

fn decode_component(raw: &str) -> Result<String, ValidationError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ValidationError::single("$", format!("query parameter is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::schema::{ChartType, EmoteKey, SeriesParams, SeriesSpan};

    #[test]
    fn empty_state_links_to_bare_path() {
        assert_eq!(href("/", &DashboardUrlState::default(), "data"), "/");
    }

    #[test]
    fn encoded_query_has_no_raw_json_characters() {
        let state = DashboardUrlState {
            chart_type: Some(ChartType::Bar),
            ..Default::default()
        };
        let query = encode_query(&state, "data");
        assert!(query.starts_with("data="));
        assert!(!query.contains('{'));
        assert!(!query.contains('"'));
    }

    #[test]
    fn reads_param_from_full_url_path_and_bare_query() {
        let state = DashboardUrlState {
            series: Some(vec![EmoteKey::Pog]),
            ..Default::default()
        };
        let query = encode_query(&state, "data");

        for input in [
            format!("http://localhost:9747/?{query}"),
            format!("/?other=1&{query}#top"),
            query.clone(),
        ] {
            assert_eq!(state_from_url(&input, "data").unwrap(), Some(state.clone()));
        }
    }

    #[test]
    fn missing_param_is_none() {
        assert_eq!(state_from_url("/?series=two", "data").unwrap(), None);
        assert_eq!(state_from_url("http://localhost/", "data").unwrap(), None);
    }

    #[test]
    fn plus_decodes_to_space() {
        let url = "/?data=%7B%22seriesParams%22%3A%7B%22span%22%3A%229+hours%22%7D%7D";
        let state = state_from_url(url, "data").unwrap().unwrap();
        assert_eq!(state.series_params.unwrap().span, SeriesSpan::NineHours);
    }

    #[test]
    fn custom_param_name_is_honoured() {
        let state = DashboardUrlState {
            series_params: Some(SeriesParams::default()),
            ..Default::default()
        };
        let link = href("/", &state, "view");
        assert!(link.starts_with("/?view="));
        assert_eq!(state_from_url(&link, "view").unwrap(), Some(state));
    }

    #[test]
    fn malformed_param_surfaces_validation_error() {
        let err = state_from_url("/?data=%7Bnope", "data").unwrap_err();
        assert_eq!(err.paths(), vec!["$"]);
    }
}

//! Typed chart configuration.
//!
//! Built once per render from the resolved series query and the fetched
//! buckets; the renderer only ever sees this struct.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::TimeSeries;
use crate::resolve::SeriesQuery;
use crate::state::{ChartType, EmoteKey, SeriesGrouping};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub unix_ms: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub emote: EmoteKey,
    pub color: &'static str,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    pub chart_type: ChartType,
    pub series: Vec<ChartSeries>,
    /// First and last bucket covered by the data.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Day buckets are plotted in UTC; a local offset would shift them
    /// across day boundaries.
    pub utc_aligned: bool,
}

impl ChartConfig {
    pub fn build(query: &SeriesQuery, buckets: &[TimeSeries]) -> Self {
        let times: Vec<Option<DateTime<Utc>>> = buckets
            .iter()
            .map(|b| match DateTime::parse_from_rfc3339(&b.time) {
                Ok(t) => Some(t.with_timezone(&Utc)),
                Err(e) => {
                    log::debug!("chart.skip_bucket time={} error={e}", b.time);
                    None
                }
            })
            .collect();

        let series = query
            .series
            .iter()
            .map(|&emote| ChartSeries {
                emote,
                color: emote.color(),
                points: buckets
                    .iter()
                    .zip(&times)
                    .filter_map(|(bucket, time)| {
                        Some(ChartPoint {
                            unix_ms: time.as_ref()?.timestamp_millis(),
                            value: bucket.series.get(emote.as_str()).copied().unwrap_or(0.0),
                        })
                    })
                    .collect(),
            })
            .collect();

        let mut parsed = times.iter().flatten();
        let range = parsed
            .next()
            .map(|first| (*first, *parsed.last().unwrap_or(first)));

        Self {
            chart_type: query.chart_type,
            series,
            range,
            utc_aligned: query.grouping == SeriesGrouping::Day,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Largest plotted value, `0.0` for an empty chart.
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.value))
            .fold(0.0, f64::max)
    }

    /// `"2024-01-01 10:00 - 2024-01-01 19:00"` for the covered range.
    pub fn time_range_label(&self) -> Option<String> {
        let (start, end) = self.range?;
        let fmt = "%Y-%m-%d %H:%M";
        Some(format!("{} - {}", start.format(fmt), end.format(fmt)))
    }
}

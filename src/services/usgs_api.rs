use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::data_type::DataType;
use crate::domain::series::{Observation, Reading, TimeSeries};
use crate::services::series_csv::parse_timestamp;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Parse(String),
}

/// A downloaded series together with the raw payload it came from.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub raw: Value,
    pub series: TimeSeries,
    /// Records whose `dateTime` could not be read.
    pub skipped: usize,
    /// Records dropped because an earlier one had the same timestamp.
    pub duplicates: usize,
}

/// Result of flattening an NWIS payload.
#[derive(Debug, Clone)]
pub struct ParsedSeries {
    pub series: TimeSeries,
    pub skipped: usize,
    pub duplicates: usize,
}

/// Blocking client for the NWIS `dv` / `iv` JSON services.
pub struct UsgsApiClient {
    base_url: String,
    client: Client,
}

impl UsgsApiClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        if base_url.trim().is_empty() {
            return Err(FetchError::Connection("service url is empty".to_string()));
        }
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| FetchError::Connection(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn fetch_json(
        &self,
        site: &str,
        data_type: DataType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Value, FetchError> {
        let url = format!("{}/{}/", self.base_url, data_type.service().code());
        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();
        debug!(%url, site, parameter = data_type.parameter_code(), %start, %end, "requesting series");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("sites", site),
                ("parameterCd", data_type.parameter_code()),
                ("startDT", start.as_str()),
                ("endDT", end.as_str()),
            ])
            .send()
            .map_err(|err| FetchError::Connection(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        response
            .json::<Value>()
            .map_err(|err| FetchError::Parse(err.to_string()))
    }

    pub fn fetch(
        &self,
        site: &str,
        data_type: DataType,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FetchedSeries, FetchError> {
        let raw = self.fetch_json(site, data_type, start_date, end_date)?;
        let parsed = parse_series(&raw, data_type)?;
        Ok(FetchedSeries {
            raw,
            series: parsed.series,
            skipped: parsed.skipped,
            duplicates: parsed.duplicates,
        })
    }
}

/// Daily records keep their local calendar date at midnight. Instantaneous
/// records with an offset are converted to UTC so the repeated hour at the
/// fall-back change stays distinct.
fn record_timestamp(text: &str, data_type: DataType) -> Option<NaiveDateTime> {
    if data_type.is_daily() {
        let date = DateTime::parse_from_rfc3339(text.trim())
            .map(|timestamp| timestamp.date_naive())
            .ok()
            .or_else(|| parse_timestamp(text).map(|timestamp| timestamp.date()))?;
        return Some(date.and_time(NaiveTime::MIN));
    }
    parse_timestamp(text)
}

/// Flattens `value.timeSeries[].values[0].value[]` into a series.
pub fn parse_series(payload: &Value, data_type: DataType) -> Result<ParsedSeries, FetchError> {
    let time_series = payload
        .get("value")
        .and_then(|value| value.as_object())
        .ok_or_else(|| FetchError::Parse("missing `value` object".to_string()))?
        .get("timeSeries")
        .and_then(|value| value.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut observations = Vec::new();
    let mut skipped = 0;
    for entry in time_series {
        let records = entry
            .get("values")
            .and_then(|values| values.get(0))
            .and_then(|values| values.get("value"))
            .and_then(|records| records.as_array())
            .ok_or_else(|| FetchError::Parse("timeSeries entry without values".to_string()))?;

        for record in records {
            let timestamp = record
                .get("dateTime")
                .and_then(|value| value.as_str())
                .and_then(|text| record_timestamp(text, data_type));
            let Some(timestamp) = timestamp else {
                skipped += 1;
                continue;
            };
            observations.push(Observation::new(timestamp, reading_from_json(record.get("value"))));
        }
    }

    let (series, duplicates) = TimeSeries::from_observations(data_type, observations);
    Ok(ParsedSeries {
        series,
        skipped,
        duplicates,
    })
}

fn reading_from_json(value: Option<&Value>) -> Reading {
    match value {
        Some(Value::String(text)) => Reading::parse(text),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(Reading::from_value)
            .unwrap_or(Reading::Missing),
        _ => Reading::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::at;

    #[test]
    fn parse_series_reads_nested_values() {
        let payload = serde_json::json!({
            "value": {
                "timeSeries": [{
                    "values": [{
                        "value": [
                            {"dateTime": "2020-01-01T00:00:00.000-05:00", "value": "120"},
                            {"dateTime": "2020-01-01T00:15:00.000-05:00", "value": "-999999"},
                            {"dateTime": "2020-01-01T00:30:00.000-05:00", "value": "Eqp"},
                            {"dateTime": "garbage", "value": "1"}
                        ]
                    }]
                }]
            }
        });

        let parsed = parse_series(&payload, DataType::InstQw).unwrap();
        let series = parsed.series;

        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.duplicates, 0);
        assert_eq!(series.len(), 3);
        assert_eq!(series.observations()[0].timestamp, at(2020, 1, 1, 5, 0));
        assert_eq!(series.observations()[0].value(), Some(120.0));
        assert_eq!(series.observations()[1].reading, Reading::Ice);
        assert_eq!(series.observations()[2].reading, Reading::Missing);
    }

    #[test]
    fn daily_values_are_placed_at_midnight() {
        let payload = serde_json::json!({
            "value": {"timeSeries": [{"values": [{"value": [
                {"dateTime": "2020-01-02T00:00:00.000", "value": 15.5}
            ]}]}]}
        });

        let series = parse_series(&payload, DataType::DailyQw).unwrap().series;
        assert_eq!(series.observations()[0].timestamp, at(2020, 1, 2, 0, 0));
        assert_eq!(series.observations()[0].value(), Some(15.5));
    }

    #[test]
    fn empty_time_series_list_is_an_empty_series() {
        let payload = serde_json::json!({"value": {"timeSeries": []}});
        let series = parse_series(&payload, DataType::InstHw).unwrap().series;
        assert!(series.is_empty());
    }

    #[test]
    fn repeated_hour_at_fall_back_keeps_both_readings() {
        let payload = serde_json::json!({
            "value": {"timeSeries": [{"values": [{"value": [
                {"dateTime": "2019-11-03T01:00:00.000-04:00", "value": "100"},
                {"dateTime": "2019-11-03T01:15:00.000-04:00", "value": "101"},
                {"dateTime": "2019-11-03T01:00:00.000-05:00", "value": "200"},
                {"dateTime": "2019-11-03T01:15:00.000-05:00", "value": "201"}
            ]}]}]}
        });

        let parsed = parse_series(&payload, DataType::InstQw).unwrap();

        assert_eq!(parsed.duplicates, 0);
        let values: Vec<(NaiveDateTime, Option<f64>)> = parsed
            .series
            .observations()
            .iter()
            .map(|observation| (observation.timestamp, observation.value()))
            .collect();
        assert_eq!(
            values,
            vec![
                (at(2019, 11, 3, 5, 0), Some(100.0)),
                (at(2019, 11, 3, 5, 15), Some(101.0)),
                (at(2019, 11, 3, 6, 0), Some(200.0)),
                (at(2019, 11, 3, 6, 15), Some(201.0)),
            ]
        );
    }

    #[test]
    fn spring_forward_keeps_a_regular_step() {
        let payload = serde_json::json!({
            "value": {"timeSeries": [{"values": [{"value": [
                {"dateTime": "2020-03-08T01:45:00.000-05:00", "value": "10"},
                {"dateTime": "2020-03-08T03:00:00.000-04:00", "value": "11"}
            ]}]}]}
        });

        let series = parse_series(&payload, DataType::InstHw).unwrap().series;

        let gap = series.observations()[1].timestamp - series.observations()[0].timestamp;
        assert_eq!(gap.num_minutes(), 15);
    }

    #[test]
    fn repeated_timestamps_are_counted() {
        let payload = serde_json::json!({
            "value": {"timeSeries": [{"values": [{"value": [
                {"dateTime": "2020-01-01T00:00:00.000-05:00", "value": "1"},
                {"dateTime": "2020-01-01T00:00:00.000-05:00", "value": "2"},
                {"dateTime": "2020-01-01T05:00:00.000Z", "value": "3"},
                {"dateTime": "2020-01-01T00:15:00.000-05:00", "value": "4"}
            ]}]}]}
        });

        let parsed = parse_series(&payload, DataType::InstQw).unwrap();

        assert_eq!(parsed.duplicates, 2);
        assert_eq!(parsed.series.len(), 2);
        assert_eq!(parsed.series.observations()[0].value(), Some(1.0));
    }

    #[test]
    fn daily_offsets_keep_the_local_date() {
        let payload = serde_json::json!({
            "value": {"timeSeries": [{"values": [{"value": [
                {"dateTime": "2020-01-02T00:00:00.000+09:00", "value": 3}
            ]}]}]}
        });

        let series = parse_series(&payload, DataType::DailyQw).unwrap().series;
        assert_eq!(series.observations()[0].timestamp, at(2020, 1, 2, 0, 0));
    }

    #[test]
    fn missing_value_object_is_a_parse_error() {
        let payload = serde_json::json!({"error": "nope"});
        let err = parse_series(&payload, DataType::InstHw).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}

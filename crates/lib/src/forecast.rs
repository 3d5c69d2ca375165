//! JMA forecast API client (fixed-region endpoint).
//!
//! One GET, no auth. The condition string is taken from
//! `[0].timeSeries[0].areas[0].weathers[0]` of the response.

use serde_json::Value;
use std::time::Duration;

/// Tokyo-region (130000) forecast endpoint. The region is baked into the URL; the
/// city label in a user message is display-only and never part of the lookup.
pub const DEFAULT_ENDPOINT: &str =
    "https://www.jma.go.jp/bosai/forecast/data/forecast/130000.json";

/// Why a forecast fetch produced no condition string.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    /// Network failure or a body that is not JSON.
    #[error("forecast request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Provider answered with a non-2xx status.
    #[error("forecast api returned status {0}")]
    BadStatus(u16),
    /// JSON parsed but the expected path was absent.
    #[error("forecast response missing {0}")]
    MissingData(&'static str),
}

/// Client for the JMA forecast API.
#[derive(Clone)]
pub struct ForecastClient {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ForecastClient {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            client: reqwest::Client::new(),
        }
    }

    /// GET the forecast JSON and extract the current condition string.
    pub async fn current_conditions(&self) -> Result<String, ForecastError> {
        let res = self
            .client
            .get(&self.endpoint)
            .timeout(self.timeout)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(ForecastError::BadStatus(res.status().as_u16()));
        }
        let data: Value = res.json().await?;
        parse_conditions(&data).map(|s| s.to_string())
    }
}

/// Descend `[0].timeSeries[0].areas[0].weathers[0]` of the forecast JSON.
pub fn parse_conditions(data: &Value) -> Result<&str, ForecastError> {
    let series = data
        .get(0)
        .and_then(|v| v.get("timeSeries"))
        .and_then(|v| v.get(0))
        .ok_or(ForecastError::MissingData("timeSeries[0]"))?;
    let area = series
        .get("areas")
        .and_then(|v| v.get(0))
        .ok_or(ForecastError::MissingData("areas[0]"))?;
    area.get("weathers")
        .and_then(|v| v.get(0))
        .and_then(|v| v.as_str())
        .ok_or(ForecastError::MissingData("weathers[0]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_condition_from_expected_shape() {
        let data = json!([{"timeSeries":[{"areas":[{"weathers":["晴れ"]}]}]}]);
        assert_eq!(parse_conditions(&data).expect("conditions"), "晴れ");
    }

    #[test]
    fn empty_time_series_is_missing_data() {
        let data = json!([{"timeSeries":[]}]);
        assert!(matches!(
            parse_conditions(&data),
            Err(ForecastError::MissingData("timeSeries[0]"))
        ));
    }

    #[test]
    fn empty_top_level_array_is_missing_data() {
        let data = json!([]);
        assert!(matches!(
            parse_conditions(&data),
            Err(ForecastError::MissingData(_))
        ));
    }

    #[test]
    fn missing_weathers_is_missing_data() {
        let data = json!([{"timeSeries":[{"areas":[{"area":{"name":"東京地方"}}]}]}]);
        assert!(matches!(
            parse_conditions(&data),
            Err(ForecastError::MissingData("weathers[0]"))
        ));
    }

    #[test]
    fn non_string_condition_is_missing_data() {
        let data = json!([{"timeSeries":[{"areas":[{"weathers":[42]}]}]}]);
        assert!(matches!(
            parse_conditions(&data),
            Err(ForecastError::MissingData("weathers[0]"))
        ));
    }
}

//! Weather responder: map one inbound text message to one reply string.
//!
//! Two branches: messages containing the weather trigger get a forecast reply,
//! everything else gets the usage hint. Fetch failures are downgraded to fixed
//! replies here and never escape to the gateway.

use crate::forecast::{ForecastClient, ForecastError};

/// Substring that marks a message as a weather query.
const WEATHER_TRIGGER: &str = "天気";

/// Suffix phrase removed from the message text to derive the display city label
/// (e.g. "東京の天気" -> "東京").
const CITY_SUFFIX: &str = "の天気";

const HELP_REPLY: &str = "「〇〇の天気」と入力してください（例: 東京の天気）";
const FETCH_FAILED_REPLY: &str = "天気情報を取得できませんでした。";
const FETCH_ERROR_REPLY: &str = "天気情報の取得中にエラーが発生しました。";

/// True when the message should take the weather branch.
pub fn is_weather_query(text: &str) -> bool {
    text.contains(WEATHER_TRIGGER)
}

/// Display label for the queried city: the trigger suffix removed, whitespace trimmed.
/// The label is cosmetic only; the forecast endpoint is fixed to one region.
pub fn city_label(text: &str) -> String {
    text.replace(CITY_SUFFIX, "").trim().to_string()
}

/// The fixed usage-hint reply.
pub fn help_reply() -> &'static str {
    HELP_REPLY
}

/// Reply text for a weather query given the fetch outcome. A non-2xx provider status
/// and all other failures each map to their fixed string.
pub fn weather_reply(city: &str, conditions: Result<String, ForecastError>) -> String {
    match conditions {
        Ok(c) => format!("{}の天気: {}", city, c),
        Err(ForecastError::BadStatus(status)) => {
            log::warn!("forecast fetch returned status {}", status);
            FETCH_FAILED_REPLY.to_string()
        }
        Err(e) => {
            log::warn!("forecast fetch failed: {}", e);
            FETCH_ERROR_REPLY.to_string()
        }
    }
}

/// Compute the reply for one inbound text message. Never fails; every fetch or
/// parse problem becomes a fixed-text reply.
pub async fn respond(text: &str, forecast: &ForecastClient) -> String {
    let trimmed = text.trim();
    if is_weather_query(trimmed) {
        let city = city_label(trimmed);
        weather_reply(&city, forecast.current_conditions().await)
    } else {
        HELP_REPLY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::parse_conditions;
    use serde_json::json;

    #[test]
    fn city_label_strips_suffix_and_whitespace() {
        assert_eq!(city_label("東京の天気"), "東京");
        assert_eq!(city_label("  大阪の天気  "), "大阪");
        assert_eq!(city_label("天気"), "天気");
    }

    #[test]
    fn trigger_detection() {
        assert!(is_weather_query("東京の天気"));
        assert!(is_weather_query("天気"));
        assert!(!is_weather_query("こんにちは"));
        assert!(!is_weather_query(""));
    }

    #[test]
    fn weather_reply_formats_conditions() {
        let data = json!([{"timeSeries":[{"areas":[{"weathers":["晴れ"]}]}]}]);
        let conditions = parse_conditions(&data).map(|s| s.to_string());
        assert_eq!(weather_reply("東京", conditions), "東京の天気: 晴れ");
    }

    #[test]
    fn bad_status_maps_to_fetch_failed_reply() {
        let reply = weather_reply("東京", Err(super::ForecastError::BadStatus(500)));
        assert_eq!(reply, "天気情報を取得できませんでした。");
    }

    #[test]
    fn missing_data_maps_to_generic_error_reply() {
        let reply = weather_reply(
            "東京",
            Err(super::ForecastError::MissingData("timeSeries[0]")),
        );
        assert_eq!(reply, "天気情報の取得中にエラーが発生しました。");
    }

    #[tokio::test]
    async fn non_query_gets_help_reply() {
        let forecast = ForecastClient::new(
            "http://127.0.0.1:9/forecast.json".to_string(),
            std::time::Duration::from_secs(1),
        );
        assert_eq!(
            respond("こんにちは", &forecast).await,
            "「〇〇の天気」と入力してください（例: 東京の天気）"
        );
        assert_eq!(
            respond("", &forecast).await,
            "「〇〇の天気」と入力してください（例: 東京の天気）"
        );
    }
}

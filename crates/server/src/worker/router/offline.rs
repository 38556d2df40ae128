//! Synthetic offline response for the weather data path.

use chrono::{DateTime, Local};
use serde_json::json;
use skycache_core::Response;

/// Placeholder returned when the data API is unreachable and nothing is cached.
///
/// Always status 200 `OK` with a JSON body of exactly two fields:
/// `status` (`"offline"`) and `message` (`"<notice>: <local time>"`).
pub fn offline_response(notice: &str) -> Response {
    offline_response_at(notice, Local::now())
}

fn offline_response_at(notice: &str, now: DateTime<Local>) -> Response {
    let body = json!({
        "status": "offline",
        "message": format!("{}: {}", notice, now.format("%Y-%m-%d %H:%M:%S")),
    });

    Response::new(200, body.to_string()).with_header("Content-Type", "application/json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_offline_response_shape() {
        let response = offline_response("You are offline");
        assert_eq!(response.status, 200);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.content_type(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["status"], "offline");
        assert!(fields["message"].as_str().unwrap().starts_with("You are offline: "));
    }

    #[test]
    fn test_offline_message_timestamp() {
        let now = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let response = offline_response_at("Last updated", now);

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["message"], "Last updated: 2026-03-14 09:26:53");
    }
}

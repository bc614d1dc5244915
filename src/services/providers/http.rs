use std::time::Duration;

use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{FetchError, FetchResult};

const USER_AGENT: &str = concat!("cinegraph/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with a request timeout
pub fn build_client(timeout: Duration) -> reqwest::Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Maps a non-success status onto the fetch taxonomy
///
/// 5xx and 429 are transient, 404 means the source has no such record,
/// every other 4xx is permanent.
pub fn classify_status(status: StatusCode, body: &str) -> FetchError {
    let message = format!("API returned status {}: {}", status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        FetchError::Transient(message)
    } else if status == StatusCode::NOT_FOUND {
        FetchError::NotFound(message)
    } else {
        FetchError::Permanent(message)
    }
}

/// Maps a transport or decoding error onto the fetch taxonomy
pub fn classify_transport(error: reqwest::Error) -> FetchError {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        FetchError::Transient(error.to_string())
    } else if let Some(status) = error.status() {
        classify_status(status, "")
    } else {
        FetchError::Permanent(error.to_string())
    }
}

/// Sends the request and decodes a JSON body
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> FetchResult<T> {
    let response = request.send().await.map_err(classify_transport)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::Permanent(format!("Unreadable response body: {}", e)))
}

/// Renders a JSON scalar as text; OMDb-style "N/A" and blanks become `None`
pub fn value_text(value: Option<&serde_json::Value>) -> Option<String> {
    let text = match value? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };

    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(text)
    }
}

/// Splits a comma-separated list such as "Action, Sci-Fi", dropping "N/A"
pub fn split_list(value: Option<&str>) -> Vec<String> {
    crate::models::catalog::unique_names(
        value
            .unwrap_or_default()
            .split(',')
            .filter(|part| !part.trim().eq_ignore_ascii_case("n/a")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_errors_and_rate_limits_are_transient() {
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, ""),
            FetchError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            FetchError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            FetchError::Transient(_)
        ));
    }

    #[test]
    fn test_client_errors_are_permanent() {
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, ""),
            FetchError::Permanent(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            FetchError::Permanent(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, ""),
            FetchError::NotFound(_)
        ));
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(Some(&json!(" Drama "))), Some("Drama".to_string()));
        assert_eq!(value_text(Some(&json!(2010))), Some("2010".to_string()));
        assert_eq!(value_text(Some(&json!("N/A"))), None);
        assert_eq!(value_text(Some(&json!(null))), None);
        assert_eq!(value_text(None), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("Keanu Reeves, Laurence Fishburne, N/A")),
            vec!["keanu reeves".to_string(), "laurence fishburne".to_string()]
        );
        assert!(split_list(None).is_empty());
    }
}

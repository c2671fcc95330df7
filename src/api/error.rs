use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Cannot reach the server at {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("Unexpected response from the server: {0}")]
    Decode(String),
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Map a transport failure onto a user-facing error.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_builder() {
            ApiError::InvalidUrl(url.to_string())
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

/// Default message for an HTTP status when the body carries none.
pub fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        400 => "The server rejected the request".to_string(),
        401 => "Not authorised; check API_TOKEN".to_string(),
        403 => "Access denied".to_string(),
        404 => "Record not found".to_string(),
        409 => "The record conflicts with an existing one".to_string(),
        413 => "Upload is too large".to_string(),
        422 => "The server rejected the submitted values".to_string(),
        s if s >= 500 => "Server error".to_string(),
        _ => "Unexpected response from the server".to_string(),
    }
}

/// Build a status error from a failed response body.
///
/// JSON bodies are searched for `message` then `error`; a `message` array
/// (as some validation layers return) is joined with `; `.
pub fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            let field = json.get("message").or_else(|| json.get("error"))?;
            match field {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Array(items) => Some(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                _ => None,
            }
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status_message(status));

    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

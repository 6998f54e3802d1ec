//! Error surface shared by the request pipeline and all services.
//!
//! Every service call either resolves with a typed payload or fails with an
//! [`ApiError`] carrying a human-readable message and, where one exists, the
//! HTTP status code.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of API errors for consistent handling at the call-site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// No response at all (connect, DNS, TLS, reset)
    Network,
    /// The fixed client timeout elapsed
    Timeout,
    /// HTTP 401
    Unauthorized,
    /// 4xx other than 401, possibly with field-level errors
    Validation,
    /// 5xx
    Server,
    /// 2xx whose body did not match the expected shape
    Parse,
    /// Local key-value storage failed
    Storage,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Network => write!(f, "network"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::Validation => write!(f, "validation"),
            ApiErrorKind::Server => write!(f, "server"),
            ApiErrorKind::Parse => write!(f, "parse"),
            ApiErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Structured error with kind, display message and optional HTTP details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Field-level validation errors, verbatim from the backend
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
    /// Raw response body or transport detail, for logs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new error without HTTP context.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            fields: BTreeMap::new(),
            details: None,
        }
    }

    /// Creates a connectivity error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    /// Creates a response-shape error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Creates a local storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Storage, message)
    }

    /// Wraps a key-value store failure.
    pub fn from_storage(err: &anyhow::Error) -> Self {
        let mut mapped = Self::storage("Could not access device storage");
        mapped.details = Some(format!("{err:#}"));
        mapped
    }

    /// Creates a validation error raised before any network call.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut err = Self::new(ApiErrorKind::Validation, message.clone());
        err.fields.insert(field.to_string(), vec![message]);
        err
    }

    /// Maps a transport failure (no HTTP response) to `Network` or `Timeout`.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let detail = err.to_string();
        let mut mapped = if err.is_timeout() {
            Self::timeout("Request timed out")
        } else {
            Self::network("Could not reach the Kaizoo servers. Check your connection.")
        };
        mapped.details = Some(detail);
        mapped
    }

    /// Maps a non-2xx HTTP response to a typed error.
    ///
    /// 401 becomes `Unauthorized`, 5xx becomes a generic `Server` failure and
    /// every other status is a `Validation` failure whose field errors are kept
    /// verbatim.
    pub fn http_status(status: u16, body: &str) -> Self {
        let parsed = parse_error_body(body);
        let details = if body.is_empty() {
            None
        } else {
            Some(body.to_string())
        };

        let (kind, message) = match status {
            401 => (
                ApiErrorKind::Unauthorized,
                parsed
                    .message
                    .unwrap_or_else(|| "Your session has expired. Please sign in again.".into()),
            ),
            500..=599 => (
                ApiErrorKind::Server,
                format!("Server error (HTTP {status}). Please try again later."),
            ),
            _ => (
                ApiErrorKind::Validation,
                parsed
                    .message
                    .unwrap_or_else(|| format!("Request rejected (HTTP {status})")),
            ),
        };

        let fields = if kind == ApiErrorKind::Validation {
            parsed.fields
        } else {
            BTreeMap::new()
        };

        Self {
            kind,
            message,
            status: Some(status),
            fields,
            details,
        }
    }

    /// Returns true for 401 failures.
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    /// Returns true when no response was received at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Network | ApiErrorKind::Timeout)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Default)]
struct ParsedBody {
    message: Option<String>,
    fields: BTreeMap<String, Vec<String>>,
}

/// Extracts a message and field errors from the common backend error shapes:
/// `{"message", "errors": {field: [..]}}`, `{"error": {"message"}}`,
/// `{"error": "..."}` or a plain-text body.
fn parse_error_body(body: &str) -> ParsedBody {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return ParsedBody::default();
    }

    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return ParsedBody {
            message: Some(trimmed.to_string()),
            fields: BTreeMap::new(),
        };
    };

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| match json.get("error") {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(obj) => obj.get("message").and_then(Value::as_str),
            None => None,
        })
        .map(str::to_string);

    let mut fields = BTreeMap::new();
    if let Some(Value::Object(errors)) = json.get("errors") {
        for (field, value) in errors {
            let messages = match value {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => continue,
            };
            fields.insert(field.clone(), messages);
        }
    }

    ParsedBody { message, fields }
}

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// A queued outbound call, relative to the API base URL.
///
/// `retried` is the one-shot flag: a request is retried at most once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON payload.
    ///
    /// # Errors
    /// Returns a `Parse` error if `body` cannot be represented as JSON.
    pub fn body<T: Serialize>(self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::parse(format!("Failed to encode request body: {e}")))?;
        Ok(self.json(value))
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Treats the request as already retried, so a 401 is returned as-is
    /// without a refresh. Used for the credential endpoints themselves.
    #[must_use]
    pub fn no_refresh(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// A received HTTP response with its body read to completion.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts non-2xx responses into a typed [`ApiError`].
    ///
    /// # Errors
    /// Returns the mapped error for any non-2xx status.
    pub fn error_for_status(self) -> ApiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::http_status(self.status, &self.body))
        }
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    /// Returns a `Parse` error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::parse(format!("Unexpected response from the server: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let req = ApiRequest::post("/activities")
            .json(serde_json::json!({"kind": "run"}))
            .query("page", 2);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/activities");
        assert_eq!(req.query, vec![("page".to_string(), "2".to_string())]);
        assert_eq!(req.body.unwrap()["kind"], "run");
    }

    #[test]
    fn test_retried_flag_is_one_shot() {
        let mut req = ApiRequest::get("/profile");
        assert!(!req.is_retried());
        req.mark_retried();
        assert!(req.is_retried());
        assert!(req.clone().is_retried());
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse {
            status: 204,
            headers: HeaderMap::new(),
            body: String::new(),
        };
        assert!(ok.error_for_status().is_ok());

        let bad = ApiResponse {
            status: 422,
            headers: HeaderMap::new(),
            body: r#"{"message":"nope"}"#.into(),
        };
        let err = bad.error_for_status().unwrap_err();
        assert_eq!(err.status, Some(422));
        assert_eq!(err.message, "nope");
    }
}

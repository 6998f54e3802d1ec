//! Authenticated request pipeline.
//!
//! Every call goes through [`ApiClient::send`], which attaches the bearer
//! token, and recovers from exactly one failure mode: a 401 on the first
//! attempt. In that case it joins or starts the single in-flight refresh and
//! retries the request once with the new token. Everything else (transport
//! failures, timeouts, other statuses, a second 401) is returned unchanged.

mod request;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

pub use request::{ApiRequest, ApiResponse};

use crate::auth::{CredentialProvider, TokenRefresher};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Standard User-Agent header for Kaizoo API requests.
pub const USER_AGENT: &str = concat!("kaizoo/", env!("CARGO_PKG_VERSION"));

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
    refresher: TokenRefresher,
}

impl ApiClient {
    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &Config, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let base_url = config.api_base_url()?;
        Self::with_base_url(&base_url, config.request_timeout(), credentials)
    }

    /// Creates a client against an explicit base URL.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: &str,
        timeout: Option<Duration>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let refresher = TokenRefresher::new(http.clone(), &base_url, Arc::clone(&credentials));

        Ok(Self {
            http,
            base_url,
            credentials,
            refresher,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Sends a request through the pipeline and returns the 2xx response.
    ///
    /// # Errors
    /// Returns the typed failure. A 401 is only returned after the single
    /// refresh-and-retry has been exhausted or the refresh itself failed.
    pub async fn send(&self, mut request: ApiRequest) -> ApiResult<ApiResponse> {
        let token = self.credentials.access_token().await?;
        set_bearer(&mut request.headers, token.as_deref())?;

        let response = self.dispatch(&request).await?;
        if response.status != 401 || request.is_retried() {
            return response.error_for_status();
        }

        request.mark_retried();
        let original = ApiError::http_status(response.status, &response.body);

        let Some(fresh) = self.refresher.refresh(token.as_deref()).await else {
            return Err(original);
        };

        set_bearer(&mut request.headers, Some(&fresh))?;
        self.dispatch(&request).await?.error_for_status()
    }

    /// Sends a request and decodes the JSON body.
    ///
    /// # Errors
    /// Returns the pipeline failure, or a `Parse` error for an unexpected body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        self.send(request).await?.json()
    }

    /// Sends a request whose response body is ignored.
    ///
    /// # Errors
    /// Returns the pipeline failure.
    pub async fn send_empty(&self, request: ApiRequest) -> ApiResult<()> {
        self.send(request).await.map(|_| ())
    }

    async fn dispatch(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let attempt = if request.is_retried() { 2 } else { 1 };
        debug!(method = %request.method, path = %request.path, attempt, "dispatching request");

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            debug!(path = %request.path, error = %e, "request failed without a response");
            ApiError::from_transport(&e)
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        debug!(path = %request.path, status, attempt, "response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Sets `Authorization: Bearer <token>`, or removes the header when there is
/// no token.
fn set_bearer(headers: &mut HeaderMap, token: Option<&str>) -> ApiResult<()> {
    match token {
        Some(token) => {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                let mut err = ApiError::storage("Stored access token is not a valid header value");
                err.details = Some(e.to_string());
                err
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        None => {
            headers.remove(AUTHORIZATION);
        }
    }
    Ok(())
}

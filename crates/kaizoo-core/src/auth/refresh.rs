//! Single-flight access-token refresh.
//!
//! At most one refresh runs process-wide. Callers that hit a 401 while a
//! refresh is running join it and receive the same result. The slot holding
//! the in-flight run is a mutex-guarded shared future, cleared by the run
//! that filled it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::{CredentialProvider, mask_token};

/// Refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "/auth/refresh";

type RefreshFuture = Shared<BoxFuture<'static, Option<String>>>;

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

#[derive(Debug, thiserror::Error)]
enum RefreshFailure {
    #[error("no refresh token stored")]
    NoRefreshToken,
    #[error("storage: {0}")]
    Storage(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("rejected with HTTP {0}")]
    Rejected(u16),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

pub struct TokenRefresher {
    http: reqwest::Client,
    endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
    slot: Arc<Mutex<Option<InFlight>>>,
    next_id: AtomicU64,
}

impl TokenRefresher {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}{REFRESH_PATH}", base_url.trim_end_matches('/')),
            credentials,
            slot: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Obtains a fresh access token after a request carrying `stale_token`
    /// was rejected with 401.
    ///
    /// Joins the in-flight refresh when there is one. When none is running
    /// but the stored token no longer matches `stale_token`, another caller
    /// already refreshed and the stored token is returned without a network
    /// call; when the stored token is gone, the session already ended and
    /// `None` is returned. Returns `None` if the refresh failed; credentials
    /// have been cleared by then.
    pub async fn refresh(&self, stale_token: Option<&str>) -> Option<String> {
        let future = {
            let mut slot = self.slot.lock().await;
            if let Some(in_flight) = slot.as_ref() {
                debug!("joining in-flight token refresh");
                in_flight.future.clone()
            } else {
                match self.credentials.access_token().await {
                    Ok(Some(current)) if Some(current.as_str()) != stale_token => {
                        debug!("access token already refreshed by another request");
                        return Some(current);
                    }
                    Ok(None) if stale_token.is_some() => {
                        debug!("credentials cleared since the request was sent");
                        return None;
                    }
                    _ => {}
                }

                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let future = self.start_run(id);
                *slot = Some(InFlight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        future.await
    }

    /// Returns true while a refresh run is in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    fn start_run(&self, id: u64) -> RefreshFuture {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let credentials = Arc::clone(&self.credentials);
        let slot = Arc::clone(&self.slot);

        async move {
            let token = run_refresh(&http, &endpoint, credentials.as_ref()).await;

            let mut slot = slot.lock().await;
            if slot.as_ref().is_some_and(|in_flight| in_flight.id == id) {
                *slot = None;
            }
            token
        }
        .boxed()
        .shared()
    }
}

/// One refresh run. Any failure clears the stored credentials exactly once.
async fn run_refresh(
    http: &reqwest::Client,
    endpoint: &str,
    credentials: &dyn CredentialProvider,
) -> Option<String> {
    info!("refreshing access token");

    match request_new_tokens(http, endpoint, credentials).await {
        Ok(access) => {
            info!(token = %mask_token(&access), "access token refreshed");
            Some(access)
        }
        Err(reason) => {
            warn!(%reason, "token refresh failed, clearing credentials");
            if let Err(e) = credentials.clear().await {
                warn!(error = %e, "failed to clear credentials after refresh failure");
            }
            None
        }
    }
}

async fn request_new_tokens(
    http: &reqwest::Client,
    endpoint: &str,
    credentials: &dyn CredentialProvider,
) -> Result<String, RefreshFailure> {
    let refresh_token = credentials
        .refresh_token()
        .await
        .map_err(|e| RefreshFailure::Storage(e.to_string()))?
        .ok_or(RefreshFailure::NoRefreshToken)?;

    let response = http
        .post(endpoint)
        .json(&serde_json::json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RefreshFailure::Rejected(status.as_u16()));
    }

    let body: RefreshResponse = response
        .json()
        .await
        .map_err(|e| RefreshFailure::InvalidResponse(e.to_string()))?;

    let access = body
        .access_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| RefreshFailure::InvalidResponse("missing accessToken".into()))?;
    let rotated = body.refresh_token.filter(|t| !t.trim().is_empty());

    credentials
        .store(&access, rotated.as_deref())
        .await
        .map_err(|e| RefreshFailure::Storage(e.to_string()))?;

    Ok(access)
}

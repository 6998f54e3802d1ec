//! Login, registration and logout.
//!
//! These are the only paths besides the refresh routine that write the
//! credential pair.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{CredentialPair, CredentialProvider, SessionUser, StoredCredentials};
use crate::client::{ApiClient, ApiRequest};
use crate::error::{ApiError, ApiResult};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    access_token: String,
    refresh_token: String,
    user: SessionUser,
}

pub struct AuthService {
    client: Arc<ApiClient>,
    credentials: Arc<StoredCredentials>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>, credentials: Arc<StoredCredentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Signs in and persists the returned session.
    ///
    /// # Errors
    /// `Validation` for malformed input (no request is sent), otherwise the
    /// pipeline failure. A 401 here means bad credentials and is never refreshed.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<SessionUser> {
        let email = validate_email(email)?;
        if password.is_empty() {
            return Err(ApiError::invalid_field("password", "Password is required"));
        }

        let request = ApiRequest::post("/auth/login")
            .body(&LoginBody { email, password })?
            .no_refresh();
        self.start_session(request).await
    }

    /// Creates an account and persists the returned session.
    ///
    /// # Errors
    /// `Validation` for malformed input (no request is sent), otherwise the
    /// pipeline failure, with backend field errors kept verbatim.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> ApiResult<SessionUser> {
        let email = validate_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::invalid_field(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let request = ApiRequest::post("/auth/register")
            .body(&RegisterBody {
                email,
                password,
                name,
            })?
            .no_refresh();
        self.start_session(request).await
    }

    /// Clears the local session. The remote session is owned by the backend.
    ///
    /// # Errors
    /// Returns a `Storage` error if the tokens cannot be deleted.
    pub async fn logout(&self) -> ApiResult<()> {
        self.credentials.clear().await?;
        info!("signed out");
        Ok(())
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.credentials.current_user()
    }

    async fn start_session(&self, request: ApiRequest) -> ApiResult<SessionUser> {
        let response: AuthResponse = self.client.send_json(request).await?;
        let pair = CredentialPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        };
        self.credentials
            .start_session(&pair, response.user.clone())
            .await?;
        info!(user_id = %response.user.id, "session started");
        Ok(response.user)
    }
}

fn validate_email(email: &str) -> ApiResult<&str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::invalid_field("email", "Email is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ApiError::invalid_field("email", "Enter a valid email address")),
    }
}

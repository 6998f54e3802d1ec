//! Credential ownership and the single-flight token refresh.

mod credentials;
mod refresh;

pub use credentials::{
    CredentialPair, CredentialProvider, SessionUser, StoredCredentials, mask_token,
};
pub use refresh::{REFRESH_PATH, TokenRefresher};

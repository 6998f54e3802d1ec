//! Typed service calls over the request pipeline.

pub mod activity;
pub mod auth;
pub mod challenges;
pub mod profile;

pub use activity::{Activity, ActivityKind, ActivityService, NewActivity};
pub use auth::AuthService;
pub use challenges::{Challenge, ChallengeService};
pub use profile::{Profile, ProfileService, ProfileUpdate};

use crate::error::{ApiError, ApiResult};

/// Validates an opaque server id before it is placed in a URL path.
pub(crate) fn path_segment<'a>(field: &str, id: &'a str) -> ApiResult<&'a str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(id)
    } else {
        Err(ApiError::invalid_field(field, format!("Invalid id: {id:?}")))
    }
}

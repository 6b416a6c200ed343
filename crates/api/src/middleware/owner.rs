//! Caller identity extractor.
//!
//! Authentication happens upstream: the gateway in front of this service
//! verifies the user and forwards their id in the `x-user-id` header.

use aigc_core::error::CoreError;
use aigc_core::task::MAX_OWNER_LEN;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

/// Header carrying the authenticated user id.
pub const OWNER_HEADER: &str = "x-user-id";

/// The requesting user, taken from the [`OWNER_HEADER`] header.
///
/// ```ignore
/// async fn my_handler(owner: OwnerId) -> AppResult<Json<()>> {
///     tracing::info!(owner_id = %owner.0, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner = parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!(
                    "Missing {OWNER_HEADER} header"
                )))
            })?;

        if owner.chars().count() > MAX_OWNER_LEN {
            return Err(AppError::Core(CoreError::Unauthorized(format!(
                "{OWNER_HEADER} header exceeds {MAX_OWNER_LEN} characters"
            ))));
        }

        Ok(OwnerId(owner.to_string()))
    }
}

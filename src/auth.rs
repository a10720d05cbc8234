use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

/// Check `Authorization: Bearer <token>` against the configured admin token.
///
/// With no token configured every request is rejected.
pub fn require_admin(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Err(AppError::Auth("Admin access is not configured".into()));
    };

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| AppError::Auth("Missing bearer token".into()))?;

    // Compare digests so the comparison does not depend on the token length.
    if Sha256::digest(provided.as_bytes()) != Sha256::digest(expected.as_bytes()) {
        return Err(AppError::Auth("Invalid admin token".into()));
    }

    Ok(())
}

/// Extractor guarding every `/api/admin` handler.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_admin(&parts.headers, state.settings.admin_token.as_deref()).inspect_err(|e| {
            tracing::debug!(path = %parts.uri.path(), "Admin request rejected: {e}");
        })?;
        Ok(AdminAuth)
    }
}

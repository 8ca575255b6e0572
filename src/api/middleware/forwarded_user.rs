//! Caller identity from the authenticating reverse proxy

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::UserId;

/// Header set by the proxy in front of this service
pub const FORWARDED_EMAIL_HEADER: &str = "x-forwarded-email";

/// Extractor that requires a forwarded identity and provisions it upstream
///
/// The user is created in the directory on first sight, so handlers can
/// assume it exists.
#[derive(Debug, Clone)]
pub struct RequireUser(pub UserId);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = extract_forwarded_user(&parts.headers)?;

        debug!(user_id = %user_id, "Ensuring caller is provisioned");
        state.provisioning_service.ensure_provisioned(&user_id).await?;

        Ok(RequireUser(user_id))
    }
}

/// Read and normalise the forwarded email
pub fn extract_forwarded_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get(FORWARDED_EMAIL_HEADER)
        .ok_or_else(|| {
            ApiError::unauthorized(format!("Missing {} header", FORWARDED_EMAIL_HEADER))
        })?
        .to_str()
        .map_err(|_| ApiError::bad_request("Invalid X-Forwarded-Email header encoding"))?;

    if raw.trim().is_empty() {
        return Err(ApiError::unauthorized(format!(
            "Missing {} header",
            FORWARDED_EMAIL_HEADER
        )));
    }

    UserId::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_extract_normalises_email() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_EMAIL_HEADER, " Dev@Example.COM ".parse().unwrap());

        let user = extract_forwarded_user(&headers).unwrap();
        assert_eq!(user.as_str(), "dev@example.com");
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = extract_forwarded_user(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_blank_header_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_EMAIL_HEADER, "   ".parse().unwrap());

        let err = extract_forwarded_user(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_identity_is_bad_request() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_EMAIL_HEADER, "dev/../admin".parse().unwrap());

        let err = extract_forwarded_user(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}

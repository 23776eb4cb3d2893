use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub const INVALID_SECRET: &str = "Invalid secret token";
pub const MISSING_USER_ID: &str = "No userId provided";
pub const INTERNAL_ERROR: &str = "Internal error updating role";

// ---------------------------------------------------------------------------
// Internal sentinels carried through the anyhow chain
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct AuthDenied;

impl std::fmt::Display for AuthDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(INVALID_SECRET)
    }
}

impl std::error::Error for AuthDenied {}

#[derive(Debug)]
struct ValidationFailed(String);

impl std::fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationFailed {}

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Only the two client errors expose a message; anything else becomes a
/// generic 500 and the cause goes to the log, not the caller.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// 403 for a missing or wrong shared secret.
    pub fn auth_denied() -> Self {
        Self(AuthDenied.into())
    }

    /// 400 with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ValidationFailed(msg.into()).into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.downcast_ref::<AuthDenied>().is_some() {
            let body = serde_json::json!({ "error": INVALID_SECRET });
            return (StatusCode::FORBIDDEN, axum::Json(body)).into_response();
        }
        if let Some(v) = self.0.downcast_ref::<ValidationFailed>() {
            let body = serde_json::json!({ "error": v.0.clone() });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }

        tracing::error!(error = %format!("{:#}", self.0), "request failed");
        let body = serde_json::json!({ "error": INTERNAL_ERROR });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolesync_core::SyncError;

    #[test]
    fn auth_denied_maps_to_403() {
        let response = AppError::auth_denied().into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let response = AppError::bad_request(MISSING_USER_ID).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_error_maps_to_500() {
        let err = AppError::from(SyncError::UpstreamUnavailable("503".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn platform_error_maps_to_500() {
        let err = AppError::from(SyncError::Platform("Missing Permissions".into()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn non_sync_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError::auth_denied().into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}

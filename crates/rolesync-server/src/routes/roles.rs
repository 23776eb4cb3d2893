use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use rolesync_core::OperationKind;

use crate::auth::secret_matches;
use crate::error::{AppError, MISSING_USER_ID};
use crate::state::AppState;

/// Fields read from a webhook body. Anything that is not a JSON object with
/// string fields reads as absent, so a garbled body fails the secret check.
#[derive(Debug, Default, PartialEq)]
pub struct WebhookBody {
    pub user_id: Option<String>,
    pub secret: Option<String>,
}

impl WebhookBody {
    pub fn parse(raw: &[u8]) -> Self {
        let value: serde_json::Value = serde_json::from_slice(raw).unwrap_or_default();
        let field = |name: &str| {
            value
                .get(name)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        Self {
            user_id: field("userId"),
            secret: field("secret"),
        }
    }
}

/// POST /update-role — grant or revoke the subscriber role to match the
/// user's current subscription.
pub async fn update_role(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    handle(&app, OperationKind::Update, &body).await
}

/// POST /remove-role — revoke the subscriber role if held. Never grants.
pub async fn remove_role(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    handle(&app, OperationKind::Remove, &body).await
}

async fn handle(
    app: &AppState,
    kind: OperationKind,
    raw: &[u8],
) -> Result<Json<serde_json::Value>, AppError> {
    let body = WebhookBody::parse(raw);

    // Nothing else is looked at before the secret.
    if !secret_matches(body.secret.as_deref(), &app.webhook_secret) {
        tracing::info!(operation = %kind, "rejected webhook with invalid secret");
        return Err(AppError::auth_denied());
    }

    let Some(user_id) = body.user_id.filter(|id| !id.trim().is_empty()) else {
        tracing::info!(operation = %kind, "rejected webhook without userId");
        return Err(AppError::bad_request(MISSING_USER_ID));
    };

    app.sync.run(kind, &user_id).await.map_err(|e| {
        AppError(anyhow::Error::new(e).context(format!("{kind} failed for user {user_id}")))
    })?;

    Ok(Json(serde_json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_fields() {
        let body = WebhookBody::parse(br#"{"userId":"u1","secret":"s"}"#);
        assert_eq!(body.user_id.as_deref(), Some("u1"));
        assert_eq!(body.secret.as_deref(), Some("s"));
    }

    #[test]
    fn invalid_json_reads_as_empty() {
        assert_eq!(WebhookBody::parse(b"not json"), WebhookBody::default());
        assert_eq!(WebhookBody::parse(b""), WebhookBody::default());
        assert_eq!(WebhookBody::parse(b"[1,2]"), WebhookBody::default());
    }

    #[test]
    fn non_string_user_id_reads_as_missing() {
        let body = WebhookBody::parse(br#"{"userId":42,"secret":"s"}"#);
        assert_eq!(body.user_id, None);
        assert_eq!(body.secret.as_deref(), Some("s"));
    }
}

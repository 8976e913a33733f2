//! Authentication route handlers.
//!
//! JSON endpoints for password login, registration and logout. A successful
//! login or registration stores the principal in the session.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequirePrincipal, clear_current_principal, set_current_principal};
use crate::models::{CurrentPrincipal, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Login and registration payload.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in principal.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub user_id: String,
    pub email: String,
}

impl From<&CurrentPrincipal> for PrincipalResponse {
    fn from(principal: &CurrentPrincipal) -> Self {
        Self {
            user_id: principal.id.to_string(),
            email: principal.email.to_string(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CredentialsRequest>,
) -> Result<StatusCode> {
    let user = AuthService::new(state.db())
        .login_with_password(&form.email, &form.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Logged in");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<PrincipalResponse>)> {
    let user = AuthService::new(state.db())
        .register_with_password(&form.email, &form.password)
        .await?;

    let principal = start_session(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(PrincipalResponse::from(&principal))))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_principal(&session)
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
pub async fn me(RequirePrincipal(principal): RequirePrincipal) -> Json<PrincipalResponse> {
    Json(PrincipalResponse::from(&principal))
}

async fn start_session(session: &Session, user: &User) -> Result<CurrentPrincipal> {
    let principal = CurrentPrincipal {
        id: user.id.clone(),
        email: user.email.clone(),
    };
    set_current_principal(session, &principal)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store session: {e}")))?;
    set_sentry_user(&principal.id);
    Ok(principal)
}

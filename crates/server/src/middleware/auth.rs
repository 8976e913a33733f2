//! Authentication extractors.
//!
//! The signed-in principal lives in the session under
//! [`session_keys::CURRENT_PRINCIPAL`]. These extractors are the only way
//! handlers learn who is calling; request bodies never carry identity.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentPrincipal, session_keys};

/// Extractor that requires a signed-in principal.
///
/// Rejects with `401` JSON when there is none.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequirePrincipal(principal): RequirePrincipal,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", principal.email)
/// }
/// ```
pub struct RequirePrincipal(pub CurrentPrincipal);

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))?;

        let principal: CurrentPrincipal = session
            .get(session_keys::CURRENT_PRINCIPAL)
            .await
            .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

        Ok(Self(principal))
    }
}

/// Extractor that optionally gets the signed-in principal.
///
/// Never rejects. An unreadable session counts as signed out.
pub struct OptionalPrincipal(pub Option<CurrentPrincipal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentPrincipal>(session_keys::CURRENT_PRINCIPAL)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Could not read principal from session");
                    None
                }),
            None => None,
        };

        Ok(Self(principal))
    }
}

/// Store the signed-in principal in the session.
///
/// Rotates the session id first so a pre-login session id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_principal(
    session: &Session,
    principal: &CurrentPrincipal,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_PRINCIPAL, principal)
        .await
}

/// Remove the signed-in principal and drop the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_principal(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentPrincipal>(session_keys::CURRENT_PRINCIPAL)
        .await?;
    session.flush().await
}

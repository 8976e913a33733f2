//! Callable functions.
//!
//! `deleteUserData` takes no payload. The caller's identity comes from the
//! verified session only; any request body is ignored.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::OptionalPrincipal;
use crate::services::account::{AccountService, DeleteUserDataResponse};
use crate::state::AppState;

/// POST /api/functions/deleteUserData
///
/// Deletes every rating owned by the caller. Responds `{"success": true}`,
/// `401 UNAUTHENTICATED` without a session, or `500 INTERNAL` if nothing
/// could be deleted.
pub async fn delete_user_data(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Result<Json<DeleteUserDataResponse>> {
    tracing::info!(authenticated = principal.is_some(), "deleteUserData");

    AccountService::new(state.db(), state.config().delete_max_attempts)
        .delete_user_data(principal.as_ref().map(|p| &p.id))
        .await?;

    Ok(Json(DeleteUserDataResponse { success: true }))
}

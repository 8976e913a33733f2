//! Store route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use scout_core::StoreId;

use crate::db::stores::StoreRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequirePrincipal;
use crate::models::{NewStore, Store, StorePatch};
use crate::state::AppState;

/// Response body for created documents.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// GET /api/stores
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Store>>> {
    let stores = StoreRepository::new(state.db()).list().await?;
    Ok(Json(stores))
}

/// GET /api/stores/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Store>> {
    let id = StoreId::new(id);
    StoreRepository::new(state.db())
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("store {id}")))
}

/// POST /api/stores
///
/// The new store is owned by the signed-in principal.
pub async fn create(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Json(store): Json<NewStore>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    store.validate()?;

    let id = StoreRepository::new(state.db())
        .create(&store, Some(&principal.id))
        .await?;

    tracing::info!(store_id = %id, user_id = %principal.id, "Store created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.into_inner(),
        }),
    ))
}

/// PATCH /api/stores/{id}
///
/// Any signed-in principal may correct store details; the owner and
/// creation time never change.
pub async fn update(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
    Json(patch): Json<StorePatch>,
) -> Result<StatusCode> {
    patch.validate()?;

    let id = StoreId::new(id);
    StoreRepository::new(state.db()).update(&id, &patch).await?;

    tracing::info!(store_id = %id, user_id = %principal.id, "Store updated");
    Ok(StatusCode::NO_CONTENT)
}

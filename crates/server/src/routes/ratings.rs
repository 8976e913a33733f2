//! Rating route handlers.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};

use scout_core::{RatingId, StoreId};

use super::stores::CreatedResponse;
use crate::db::ratings::RatingRepository;
use crate::db::stores::StoreRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequirePrincipal;
use crate::models::{NewRating, Rating, RatingAverage, RatingPatch};
use crate::state::AppState;

/// SSE event name for rating snapshots.
const RATINGS_EVENT: &str = "ratings";

/// GET /api/stores/{id}/ratings
pub async fn for_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<Vec<Rating>>> {
    let store_id = StoreId::new(store_id);
    ensure_store_exists(&state, &store_id).await?;

    let ratings = RatingRepository::new(state.db())
        .list_for_store(&store_id)
        .await?;
    Ok(Json(ratings))
}

/// POST /api/stores/{id}/ratings
///
/// The rating is owned by the signed-in principal; payloads naming an
/// owner or a store are rejected.
pub async fn create(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(store_id): Path<String>,
    Json(rating): Json<NewRating>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    rating.validate()?;

    let store_id = StoreId::new(store_id);
    let id = RatingRepository::new(state.db())
        .create(&store_id, &rating, Some(&principal.id))
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound(format!("store {store_id}"))
            }
            other => other.into(),
        })?;

    tracing::info!(
        rating_id = %id,
        store_id = %store_id,
        user_id = %principal.id,
        "Rating created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: id.into_inner(),
        }),
    ))
}

/// PATCH /api/ratings/{id}
///
/// Only the principal that created a rating may change it.
pub async fn update(
    State(state): State<AppState>,
    RequirePrincipal(principal): RequirePrincipal,
    Path(id): Path<String>,
    Json(patch): Json<RatingPatch>,
) -> Result<StatusCode> {
    patch.validate()?;

    let id = RatingId::new(id);
    let repo = RatingRepository::new(state.db());
    let rating = repo
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rating {id}")))?;

    if !rating.owner.is_owned_by(&principal.id) {
        tracing::warn!(rating_id = %id, user_id = %principal.id, "Rating update by non-owner");
        return Err(AppError::Forbidden(
            "only the author can edit this rating".to_owned(),
        ));
    }

    repo.update(&id, &patch).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/ratings/averages
pub async fn averages(State(state): State<AppState>) -> Result<Json<Vec<RatingAverage>>> {
    let averages = RatingRepository::new(state.db()).averages().await?;
    Ok(Json(averages))
}

/// GET /api/stores/{id}/ratings/stream
///
/// Sends the store's ratings (newest first) as a `ratings` event, then again
/// after every change. The subscription ends when the client disconnects.
pub async fn stream_for_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>>> {
    let store_id = StoreId::new(store_id);
    ensure_store_exists(&state, &store_id).await?;

    let mut subscription = RatingRepository::new(state.db()).watch_for_store(&store_id);

    let events = stream! {
        while let Some(ratings) = subscription.changed().await {
            match Event::default().event(RATINGS_EVENT).json_data(&ratings) {
                Ok(event) => yield Ok(event),
                Err(e) => {
                    tracing::warn!(store_id = %store_id, error = %e, "Failed to encode ratings event");
                }
            }
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn ensure_store_exists(state: &AppState, store_id: &StoreId) -> Result<()> {
    if StoreRepository::new(state.db()).exists(store_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("store {store_id}")))
    }
}

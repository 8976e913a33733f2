//! Rating documents and per-store aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use scout_core::{Owner, RatingId, Score, StoreId};

use super::{ValidationError, check_length};

const MAX_REVIEW_LENGTH: usize = 5000;
const MAX_IMAGE_URL_LENGTH: usize = 2048;

/// A rating as stored in the `ratings` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub store_id: StoreId,
    pub rating: Score,
    #[serde(default)]
    pub review: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "userId", default)]
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    /// Missing on ratings written before updates were tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating a rating. The store comes from the route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRating {
    pub rating: Score,
    #[serde(default)]
    pub review: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewRating {
    /// Validate the review and image reference.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the review is too long or the image URL
    /// is not an http(s) URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("review", &self.review, MAX_REVIEW_LENGTH)?;
        if let Some(url) = &self.image_url {
            validate_image_url(url)?;
        }
        Ok(())
    }
}

/// Partial update of a rating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RatingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl RatingPatch {
    /// Validate the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the patch is empty or a field is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rating.is_none() && self.review.is_none() && self.image_url.is_none() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(review) = &self.review {
            check_length("review", review, MAX_REVIEW_LENGTH)?;
        }
        if let Some(url) = &self.image_url {
            validate_image_url(url)?;
        }
        Ok(())
    }
}

fn validate_image_url(value: &str) -> Result<(), ValidationError> {
    check_length("imageUrl", value, MAX_IMAGE_URL_LENGTH)?;
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
        _ => Err(ValidationError::InvalidImageUrl),
    }
}

/// Average score of one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAverage {
    pub store_id: StoreId,
    pub average: f64,
    pub count: usize,
}

//! Domain models for stores, ratings and accounts.
//!
//! Each model is the decoded form of one document. `New*` types are create
//! payloads and `*Patch` types are partial updates; neither can carry an
//! id, owner or timestamp, so those fields are only ever stamped by the
//! repositories.

pub mod rating;
pub mod session;
pub mod store;
pub mod user;

pub use rating::{NewRating, Rating, RatingAverage, RatingPatch};
pub use session::{CurrentPrincipal, keys as session_keys};
pub use store::{NewStore, Store, StorePatch};
pub use user::User;

use thiserror::Error;

/// Errors from validating a create or update payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is blank.
    #[error("{0} cannot be empty")]
    Empty(&'static str),

    /// A text field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed characters.
        max: usize,
    },

    /// The image reference is not an absolute http(s) URL.
    #[error("imageUrl must be an http or https URL")]
    InvalidImageUrl,

    /// An update carried no fields.
    #[error("update must change at least one field")]
    EmptyPatch,
}

/// Check a required text field.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    check_length(field, value, max)
}

pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

//! Account types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use scout_core::{Email, PrincipalId};

/// A login account from the `users` collection.
///
/// The document id is the account's principal id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: PrincipalId,
    pub email: Email,
    /// PHC-format Argon2id hash.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

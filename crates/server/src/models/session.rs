//! Session-related types.

use serde::{Deserialize, Serialize};

use scout_core::{Email, PrincipalId};

/// Session-stored identity of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPrincipal {
    pub id: PrincipalId,
    pub email: Email,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the signed-in principal.
    pub const CURRENT_PRINCIPAL: &str = "current_principal";
}

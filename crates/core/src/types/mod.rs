//! Core types for Scout.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! stores, ratings and accounts.

pub mod email;
pub mod id;
pub mod location;
pub mod principal;
pub mod score;

pub use email::{Email, EmailError};
pub use id::*;
pub use location::{GeoPoint, LocationError};
pub use principal::{LEGACY_UNSET_OWNER, Owner, PrincipalId, PrincipalIdError, UNSET_OWNER};
pub use score::{Score, ScoreError};

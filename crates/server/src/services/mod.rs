//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Account registration and password login
//! - `account` - Account data deletion (the `deleteUserData` function)

pub mod account;
pub mod auth;

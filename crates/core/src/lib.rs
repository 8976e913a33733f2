//! Scout Core - Shared domain types.
//!
//! This crate provides the validated types used across all Scout components:
//! - `server` - HTTP API, authorization gate and account deletion
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP. Documents read back from the store are re-validated through
//! these types, so a malformed record is caught at the repository boundary.
//!
//! # Modules
//!
//! - [`types`] - Document IDs, principals and ownership, locations, scores, emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

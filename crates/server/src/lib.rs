//! Scout server library.
//!
//! Store and rating documents, the page navigation gate and account data
//! deletion, exposed as a library so the router can be exercised in tests
//! without a listening socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

//! Snagtrak Server Library
//!
//! Turns crash notifications into deduplicated error groups. The modules are
//! exposed for the binary and for tests.

pub mod auth;
pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

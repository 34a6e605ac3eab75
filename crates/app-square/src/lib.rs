//! AI App Square: application directory, submission review, and multi-dimensional
//! leaderboards backed by SQLite.

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
mod http;
pub mod ranking;
pub mod repository;
pub mod store;
pub mod telemetry;
pub mod validation;

pub use store::SqliteStore;

//! CLI parsing, validation, and the Kokoro voice table.

#[allow(clippy::module_inception)]
mod config;
pub mod voices;

pub use config::AppConfig;

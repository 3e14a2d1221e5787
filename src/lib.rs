/// OAuth token requests against the Salesforce login endpoints.
pub mod auth;
/// File-backed response cache keyed by request hash.
pub mod cache;
/// JSON configuration (cache settings and named environments).
pub mod config;
/// Error types shared across the crate.
pub mod error;
/// CSV output of aggregated permissions.
pub mod export;
/// Cached access to metadata, SOQL and bulk queries.
pub mod fetcher;
/// Permission resolution and per-user aggregation.
pub mod permissions;
/// Salesforce API types, query builder and HTTP client.
pub mod salesforce;
/// Best-effort fan-out helpers.
pub mod settle;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};

/// Logging verbosity for tool operations.
#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    /// Emit verbose debug output, including every request URL.
    Debug,
    /// Emit standard informational output.
    Information,
}

impl Default for LogLevel {
    /// Defaults to `Information` logging.
    fn default() -> Self {
        LogLevel::Information
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Information => log::LevelFilter::Info,
        }
    }
}

//! Error types for the permission export.
//!
//! Cache misses never reach this level: the fetcher treats every cache read
//! failure as a miss. What remains is fatal to the run.

use std::time::Duration;

use thiserror::Error;

use crate::cache::CacheError;
use crate::export::ExportError;

/// Failures talking to Salesforce.
#[derive(Debug, Error)]
pub enum SalesforceError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status with the response body.
    #[error("Salesforce API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The requested record does not exist (e.g. metadata deleted since listing).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response did not have the expected shape.
    #[error("Invalid response from Salesforce: {0}")]
    InvalidResponse(String),

    /// JSON parsing error.
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error in bulk results.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Bulk job ended in `Failed` or `Aborted`.
    #[error("Bulk job {job_id} ended in state {state}: {message}")]
    BulkJobFailed {
        job_id: String,
        state: String,
        message: String,
    },

    /// Bulk job did not complete within the poll timeout.
    #[error("Bulk job {job_id} did not complete within {waited:?}")]
    BulkTimeout { job_id: String, waited: Duration },
}

impl SalesforceError {
    /// Check if the error means the record is gone rather than the call failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Top-level error for a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Salesforce(#[from] SalesforceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, Error>;

use serde::de::DeserializeOwned;

use crate::error::SalesforceError;
use crate::salesforce::metadata::{MetadataListing, MetadataRecord, MetadataType};

/// Bulk 2.0 query jobs.
pub mod bulk;
/// HTTP client for the REST and Tooling APIs.
pub mod client;
/// Profile and Permission Set metadata types.
pub mod metadata;
pub(crate) mod parse;
/// Record types returned by SOQL queries.
pub mod sobjects;
/// SOQL text assembly.
pub mod soql;

/// The calls the permission export makes against an org.
///
/// [`client::SalesforceClient`] talks HTTP; tests substitute an in-memory
/// implementation.
#[allow(async_fn_in_trait)]
pub trait SalesforceApi {
    /// Every record of `metadata_type` with its full name and id.
    async fn list_metadata(
        &self,
        metadata_type: MetadataType,
    ) -> Result<Vec<MetadataListing>, SalesforceError>;

    /// The record behind one listing entry, read by id and tagged with the
    /// listing's full name. A record that no longer exists is
    /// [`SalesforceError::NotFound`].
    async fn read_metadata(
        &self,
        metadata_type: MetadataType,
        listing: &MetadataListing,
    ) -> Result<MetadataRecord, SalesforceError>;

    /// Synchronous SOQL query, all pages.
    async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, SalesforceError>;

    /// Bulk query job, polled to completion.
    async fn bulk_query<T: DeserializeOwned>(&self, soql: &str)
    -> Result<Vec<T>, SalesforceError>;
}

//! Cached access to the org.
//!
//! Every call is memoized in the [`ContentCache`]: a cache hit returns the
//! stored payload, anything else (missing, expired, unreadable) falls through
//! to a live call whose result is written back before it is returned.

use std::future::Future;

use log::{debug, error, info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{self, ContentCache};
use crate::error::{Error, Result, SalesforceError};
use crate::salesforce::SalesforceApi;
use crate::salesforce::metadata::{MetadataListing, MetadataRecord, MetadataType};
use crate::settle::settle_all;

/// Metadata and query access through the response cache.
pub struct MetadataFetcher<'a, A> {
    api: &'a A,
    cache: &'a ContentCache,
}

impl<'a, A: SalesforceApi> MetadataFetcher<'a, A> {
    pub fn new(api: &'a A, cache: &'a ContentCache) -> Self {
        Self { api, cache }
    }

    /// Full names and ids of every record of `metadata_type`.
    pub async fn list(&self, metadata_type: MetadataType) -> Result<Vec<MetadataListing>> {
        let key = format!("metadataList-{}", metadata_type);
        self.cached(&key, self.api.list_metadata(metadata_type)).await
    }

    pub async fn read(
        &self,
        metadata_type: MetadataType,
        listing: &MetadataListing,
    ) -> Result<MetadataRecord> {
        let key = format!("{}-{}", metadata_type, listing.full_name);
        self.cached(&key, self.api.read_metadata(metadata_type, listing))
            .await
    }

    /// Read every listed record concurrently, each paired with its listing.
    /// Records that fail are logged and left out; the order of the result is
    /// not tied to the order of `listings`.
    pub async fn read_all<'l>(
        &self,
        metadata_type: MetadataType,
        listings: &'l [MetadataListing],
    ) -> Vec<(&'l MetadataListing, MetadataRecord)> {
        info!(
            "Reading {} metadata for {} names",
            metadata_type,
            listings.len()
        );

        let settled = settle_all(listings.iter().map(|listing| async move {
            match self.read(metadata_type, listing).await {
                Ok(record) => Ok((listing, record)),
                Err(e) => Err((listing, e)),
            }
        }))
        .await;

        settled.into_fulfilled(|(listing, e)| match e {
            Error::Salesforce(ref cause) if cause.is_not_found() => {
                warn!(
                    "Skipping {} {}: no longer exists",
                    metadata_type, listing.full_name
                );
            }
            _ => error!("Skipping {} {}: {}", metadata_type, listing.full_name, e),
        })
    }

    /// SOQL query, cached by its text.
    pub async fn query<T>(&self, soql: &str) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.cached(soql, self.api.query(soql)).await
    }

    /// Bulk query, cached by its text.
    pub async fn bulk_query<T>(&self, soql: &str) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        self.cached(soql, self.api.bulk_query(soql)).await
    }

    async fn cached<T, F>(&self, key: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = std::result::Result<T, SalesforceError>>,
    {
        let hash = cache::hash(key);

        match self.cache.read(&hash).await {
            Ok(data) => {
                debug!("Cache hit {} for {}", hash, key);
                return Ok(data);
            }
            Err(e) if e.is_miss() => debug!("Cache miss {} for {}: {}", hash, key, e),
            Err(e) => warn!("Ignoring unreadable cache entry {} for {}: {}", hash, key, e),
        }

        let data = fetch.await?;
        self.cache.write(&hash, data).await.map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::salesforce::sobjects::User;
    use crate::testing::{FakeApi, granting_record};

    fn fake_with_profiles(names: &[&str]) -> FakeApi {
        let mut api = FakeApi::default();
        for (n, name) in names.iter().enumerate() {
            api.add_metadata(
                MetadataType::Profile,
                name,
                &format!("00e00000000000{}", n),
                granting_record(name, "Account"),
            );
        }
        api
    }

    #[tokio::test]
    async fn test_read_all_drops_failures() {
        let mut api = fake_with_profiles(&["Admin", "Standard", "ReadOnly"]);
        api.fail_metadata("Broken");
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path(), 7);
        let fetcher = MetadataFetcher::new(&api, &cache);

        let listings = fetcher.list(MetadataType::Profile).await.unwrap();
        assert_eq!(listings.len(), 4);
        let records = fetcher.read_all(MetadataType::Profile, &listings).await;

        let mut names: Vec<&str> = records.iter().map(|(_, r)| r.full_name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["Admin", "ReadOnly", "Standard"]);
        for (listing, record) in &records {
            assert_eq!(listing.full_name, record.full_name);
        }
    }

    #[tokio::test]
    async fn test_reads_are_issued_per_listing_id() {
        let api = fake_with_profiles(&["Admin"]);
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path(), 7);
        let fetcher = MetadataFetcher::new(&api, &cache);

        let listings = fetcher.list(MetadataType::Profile).await.unwrap();
        fetcher.read(MetadataType::Profile, &listings[0]).await.unwrap();
        fetcher.read(MetadataType::Profile, &listings[0]).await.unwrap();

        assert_eq!(api.calls(), vec!["list Profile", "read Profile 00e000000000000"]);
        assert!(cache.entry_path(&cache::hash("Profile-Admin")).exists());
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let api = fake_with_profiles(&["Admin"]);
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path(), 7);
        let fetcher = MetadataFetcher::new(&api, &cache);

        let first = fetcher.list(MetadataType::Profile).await.unwrap();
        let second = fetcher.list(MetadataType::Profile).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(api.call_count("list Profile"), 1);
        assert!(cache.entry_path(&cache::hash("metadataList-Profile")).exists());
    }

    #[tokio::test]
    async fn test_query_failure_is_not_cached() {
        let mut api = FakeApi::default();
        api.fail_queries();
        let dir = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(dir.path(), 7);
        let fetcher = MetadataFetcher::new(&api, &cache);

        let soql = "select Id,Username,ProfileId from User";
        let result = fetcher.query::<User>(soql).await;

        assert!(matches!(result, Err(Error::Salesforce(_))));
        assert!(!cache.entry_path(&cache::hash(soql)).exists());
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let api = fake_with_profiles(&["Admin"]);
        let dir = tempfile::tempdir().unwrap();
        let stale = ContentCache::new(dir.path(), 7);
        stale
            .write(&cache::hash("metadataList-Profile"), Vec::<MetadataListing>::new())
            .await
            .unwrap();
        let path = stale.entry_path(&cache::hash("metadataList-Profile"));
        let old = std::time::SystemTime::now() - std::time::Duration::from_secs(10 * 86_400);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(old)).unwrap();

        let fetcher = MetadataFetcher::new(&api, &stale);
        let listings = fetcher.list(MetadataType::Profile).await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(api.call_count("list Profile"), 1);
    }
}

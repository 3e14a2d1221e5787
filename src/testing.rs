//! In-memory org for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SalesforceError;
use crate::salesforce::SalesforceApi;
use crate::salesforce::metadata::{
    MetadataListing, MetadataRecord, MetadataType, ObjectPermission, ObjectPermissionFlags,
};

#[derive(Default)]
pub(crate) struct FakeApi {
    listings: HashMap<MetadataType, Vec<MetadataListing>>,
    // keyed by listing id
    records: HashMap<(MetadataType, String), MetadataRecord>,
    broken: HashSet<String>,
    // (needle, rows): the first needle contained in the SOQL answers it.
    responses: Vec<(String, Value)>,
    queries_fail: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub(crate) fn add_metadata(
        &mut self,
        metadata_type: MetadataType,
        full_name: &str,
        id: &str,
        record: MetadataRecord,
    ) {
        self.listings
            .entry(metadata_type)
            .or_default()
            .push(MetadataListing {
                full_name: full_name.to_string(),
                id: id.to_string(),
            });
        self.records.insert((metadata_type, id.to_string()), record);
    }

    /// List `full_name` under profiles but fail every read of it.
    pub(crate) fn fail_metadata(&mut self, full_name: &str) {
        self.listings
            .entry(MetadataType::Profile)
            .or_default()
            .push(MetadataListing {
                full_name: full_name.to_string(),
                id: "00e000000000BAD".to_string(),
            });
        self.broken.insert(full_name.to_string());
    }

    pub(crate) fn respond(&mut self, needle: &str, rows: Value) {
        self.responses.push((needle.to_string(), rows));
    }

    pub(crate) fn fail_queries(&mut self) {
        self.queries_fail = true;
    }

    pub(crate) fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn answer<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, SalesforceError> {
        if self.queries_fail {
            return Err(SalesforceError::Api {
                status: 400,
                message: "MALFORMED_QUERY".to_string(),
            });
        }
        let rows = self
            .responses
            .iter()
            .find(|(needle, _)| soql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_else(|| Value::Array(vec![]));
        Ok(serde_json::from_value(rows)?)
    }
}

impl SalesforceApi for FakeApi {
    async fn list_metadata(
        &self,
        metadata_type: MetadataType,
    ) -> Result<Vec<MetadataListing>, SalesforceError> {
        self.record_call(format!("list {}", metadata_type));
        Ok(self
            .listings
            .get(&metadata_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn read_metadata(
        &self,
        metadata_type: MetadataType,
        listing: &MetadataListing,
    ) -> Result<MetadataRecord, SalesforceError> {
        self.record_call(format!("read {} {}", metadata_type, listing.id));
        if self.broken.contains(&listing.full_name) {
            return Err(SalesforceError::Api {
                status: 500,
                message: "UNKNOWN_EXCEPTION".to_string(),
            });
        }
        self.records
            .get(&(metadata_type, listing.id.clone()))
            .cloned()
            .ok_or_else(|| {
                SalesforceError::NotFound(format!("{} {}", metadata_type, listing.full_name))
            })
    }

    async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, SalesforceError> {
        self.record_call(format!("query {}", soql));
        self.answer(soql)
    }

    async fn bulk_query<T: DeserializeOwned>(
        &self,
        soql: &str,
    ) -> Result<Vec<T>, SalesforceError> {
        self.record_call(format!("bulk {}", soql));
        self.answer(soql)
    }
}

/// A record whose only object permission is read access on `object`.
pub(crate) fn granting_record(full_name: &str, object: &str) -> MetadataRecord {
    record_with(
        full_name,
        object,
        ObjectPermissionFlags {
            allow_read: true,
            ..Default::default()
        },
    )
}

pub(crate) fn record_with(
    full_name: &str,
    object: &str,
    flags: ObjectPermissionFlags,
) -> MetadataRecord {
    MetadataRecord {
        full_name: full_name.to_string(),
        object_permissions: vec![ObjectPermission {
            object: object.to_string(),
            flags,
        }],
    }
}

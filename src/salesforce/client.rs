use std::time::Duration;

use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SalesforceError;
use crate::salesforce::SalesforceApi;
use crate::salesforce::bulk::{self, BulkOptions};
use crate::salesforce::metadata::{MetadataListing, MetadataRecord, MetadataType};
use crate::salesforce::parse::{QueryPage, parse_error_body, parse_records};
use crate::salesforce::soql::{generate_query, quote_string};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 120;

const PROFILE_LISTING_FIELDS: [&str; 2] = ["Id", "Name"];
const PERMISSION_SET_LISTING_FIELDS: [&str; 3] = ["Id", "Name", "NamespacePrefix"];
const TOOLING_METADATA_FIELDS: [&str; 3] = ["Id", "FullName", "Metadata"];

/// Listing row. Profiles have no namespace; permission sets also select `NamespacePrefix`.
#[derive(Debug, serde::Deserialize)]
struct ListingRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "NamespacePrefix", default)]
    namespace_prefix: Option<String>,
}

impl ListingRow {
    /// `Name` is only unique within a namespace; qualify managed records as `ns__Name`.
    fn full_name(&self) -> String {
        match self.namespace_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{}__{}", prefix, self.name),
            _ => self.name.clone(),
        }
    }
}

/// Tooling API row carrying a metadata body.
#[derive(Debug, serde::Deserialize)]
struct ToolingMetadataRow {
    #[serde(rename = "Metadata")]
    metadata: Value,
}

/// HTTP client for one authenticated org.
pub struct SalesforceClient {
    client: Client,
    instance_url: String,
    token: String,
    api_version: String,
    bulk_options: BulkOptions,
}

impl SalesforceClient {
    /// Create a client for the given instance URL and access token.
    pub fn new(
        instance_url: &str,
        token: &str,
        api_version: &str,
    ) -> Result<Self, SalesforceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            api_version: api_version.trim_start_matches('v').to_string(),
            bulk_options: BulkOptions::default(),
        })
    }

    /// Override bulk polling behaviour.
    pub fn with_bulk_options(mut self, bulk_options: BulkOptions) -> Self {
        self.bulk_options = bulk_options;
        self
    }

    /// `{instance}/services/data/v{version}/{path}`
    pub(crate) fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Authenticate and send a request, turning non-success statuses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, SalesforceError> {
        let resp = request.bearer_auth(&self.token).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SalesforceError::Api {
                status: status.as_u16(),
                message: parse_error_body(&body),
            });
        }

        Ok(resp)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SalesforceError> {
        debug!("GET {}", url);
        let resp = self
            .send(self.client.get(url).header("Accept", "application/json"))
            .await?;
        Ok(resp.json().await?)
    }

    /// Run a query against `endpoint` (`query` or `tooling/query`), following `nextRecordsUrl`.
    async fn query_records(&self, endpoint: &str, soql: &str) -> Result<Vec<Value>, SalesforceError> {
        debug!("SOQL: {}", soql);

        let mut url = self.data_url(endpoint);
        url.push_str("?q=");
        url.push_str(&urlencoding::encode(soql));

        let mut records = vec![];
        loop {
            let page: QueryPage = self.get_json(&url).await?;
            let next = page.next_page().map(|path| format!("{}{}", self.instance_url, path));
            records.extend(page.records);

            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }

        Ok(records)
    }
}

impl SalesforceApi for SalesforceClient {
    async fn list_metadata(
        &self,
        metadata_type: MetadataType,
    ) -> Result<Vec<MetadataListing>, SalesforceError> {
        let soql = match metadata_type {
            MetadataType::Profile => {
                generate_query(&PROFILE_LISTING_FIELDS, "Profile", None, None, None)
            }
            MetadataType::PermissionSet => generate_query(
                &PERMISSION_SET_LISTING_FIELDS,
                "PermissionSet",
                Some("IsOwnedByProfile = false".into()),
                None,
                None,
            ),
        };

        let rows: Vec<ListingRow> = parse_records(self.query_records("query", &soql).await?)?;

        Ok(rows
            .into_iter()
            .map(|row| MetadataListing {
                full_name: row.full_name(),
                id: row.id,
            })
            .collect())
    }

    async fn read_metadata(
        &self,
        metadata_type: MetadataType,
        listing: &MetadataListing,
    ) -> Result<MetadataRecord, SalesforceError> {
        let full_name = listing.full_name.as_str();
        let predicate = format!("Id = {}", quote_string(&listing.id));
        let soql = generate_query(
            &TOOLING_METADATA_FIELDS,
            metadata_type.as_str(),
            Some(predicate.as_str().into()),
            None,
            None,
        );

        let rows: Vec<ToolingMetadataRow> =
            parse_records(self.query_records("tooling/query", &soql).await?)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| SalesforceError::NotFound(format!("{} {}", metadata_type, full_name)))?;

        let mut body = row.metadata;
        match body.as_object_mut() {
            Some(object) => {
                object.insert("fullName".to_string(), Value::String(full_name.to_string()));
            }
            None => {
                return Err(SalesforceError::InvalidResponse(format!(
                    "{} {} has no Metadata body",
                    metadata_type, full_name
                )));
            }
        }

        Ok(serde_json::from_value(body)?)
    }

    async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>, SalesforceError> {
        parse_records(self.query_records("query", soql).await?)
    }

    async fn bulk_query<T: DeserializeOwned>(
        &self,
        soql: &str,
    ) -> Result<Vec<T>, SalesforceError> {
        bulk::run_query(self, soql, &self.bulk_options).await
    }
}

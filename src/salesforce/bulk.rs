//! Bulk API 2.0 query jobs: create, poll until the job settles, then page
//! through CSV results by locator.

use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::SalesforceError;
use crate::salesforce::client::SalesforceClient;
use crate::salesforce::parse::{parse_bulk_csv, parse_locator};

const POLL_INTERVAL_SECS: u64 = 5;
const POLL_TIMEOUT_SECS: u64 = 600;
const MAX_RECORDS_PER_PAGE: usize = 50_000;

const STATE_COMPLETE: &str = "JobComplete";
const STATE_FAILED: &str = "Failed";
const STATE_ABORTED: &str = "Aborted";

/// Polling behaviour for bulk jobs.
#[derive(Debug, Clone)]
pub struct BulkOptions {
    pub poll_interval: Duration,
    /// Give up once a job has been polled for this long.
    pub poll_timeout: Duration,
    pub max_records: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            poll_timeout: Duration::from_secs(POLL_TIMEOUT_SECS),
            max_records: MAX_RECORDS_PER_PAGE,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobInfo {
    id: String,
    state: String,
    #[serde(default)]
    error_message: Option<String>,
}

pub(crate) async fn run_query<T: DeserializeOwned>(
    client: &SalesforceClient,
    soql: &str,
    options: &BulkOptions,
) -> Result<Vec<T>, SalesforceError> {
    debug!("Bulk SOQL: {}", soql);

    let job = create_job(client, soql).await?;
    let job_url = client.data_url(&format!("jobs/query/{}", job.id));
    info!("Bulk job {} created", job.id);

    wait_for_completion(client, &job_url, &job.id, options).await?;
    fetch_results(client, &job_url, options).await
}

async fn create_job(client: &SalesforceClient, soql: &str) -> Result<JobInfo, SalesforceError> {
    let resp = client
        .send(
            client
                .http()
                .post(client.data_url("jobs/query"))
                .header("Accept", "application/json")
                .json(&json!({ "operation": "query", "query": soql })),
        )
        .await?;

    Ok(resp.json().await?)
}

async fn wait_for_completion(
    client: &SalesforceClient,
    job_url: &str,
    job_id: &str,
    options: &BulkOptions,
) -> Result<(), SalesforceError> {
    let started = Instant::now();

    loop {
        let job: JobInfo = client.get_json(job_url).await?;
        debug!("Bulk job {} is {}", job_id, job.state);

        match job.state.as_str() {
            STATE_COMPLETE => return Ok(()),
            STATE_FAILED | STATE_ABORTED => {
                return Err(SalesforceError::BulkJobFailed {
                    job_id: job_id.to_string(),
                    state: job.state,
                    message: job.error_message.unwrap_or_default(),
                });
            }
            _ => {}
        }

        let waited = started.elapsed();
        if waited >= options.poll_timeout {
            return Err(SalesforceError::BulkTimeout {
                job_id: job_id.to_string(),
                waited,
            });
        }

        tokio::time::sleep(options.poll_interval).await;
    }
}

async fn fetch_results<T: DeserializeOwned>(
    client: &SalesforceClient,
    job_url: &str,
    options: &BulkOptions,
) -> Result<Vec<T>, SalesforceError> {
    let mut rows = vec![];
    let mut locator: Option<String> = None;

    loop {
        let mut url = format!("{}/results?maxRecords={}", job_url, options.max_records);
        if let Some(locator) = &locator {
            url.push_str("&locator=");
            url.push_str(&urlencoding::encode(locator));
        }
        debug!("GET {}", url);

        let resp = client
            .send(client.http().get(&url).header("Accept", "text/csv"))
            .await?;
        let next = parse_locator(
            resp.headers()
                .get("Sforce-Locator")
                .and_then(|value| value.to_str().ok()),
        );
        let body = resp.text().await?;
        rows.extend(parse_bulk_csv::<T>(&body)?);

        match next {
            Some(next_locator) => locator = Some(next_locator),
            None => break,
        }
    }

    Ok(rows)
}

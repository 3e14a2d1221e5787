use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SalesforceError;

const LOCATOR_DONE: &str = "null";

/// One page of a REST or Tooling query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryPage {
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    pub records: Vec<Value>,
}

impl QueryPage {
    /// Path of the next page, if the server says there is one.
    pub(crate) fn next_page(&self) -> Option<&str> {
        if self.done {
            return None;
        }
        self.next_records_url.as_deref()
    }
}

/// Convert raw query records into typed rows.
pub(crate) fn parse_records<T: DeserializeOwned>(
    records: Vec<Value>,
) -> Result<Vec<T>, SalesforceError> {
    records
        .into_iter()
        .map(|record| serde_json::from_value(record).map_err(SalesforceError::from))
        .collect()
}

/// Parse a Bulk 2.0 result page (CSV with a header row).
pub(crate) fn parse_bulk_csv<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, SalesforceError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut rows = vec![];
    for row in reader.deserialize::<T>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Read the `Sforce-Locator` value; `None` when the last page has been served.
pub(crate) fn parse_locator(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|locator| !locator.is_empty() && *locator != LOCATOR_DONE)
        .map(str::to_string)
}

/// Salesforce reports errors as `[{"message": .., "errorCode": ..}]`; fall back to the raw body.
pub(crate) fn parse_error_body(body: &str) -> String {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ApiError {
        message: String,
        #[serde(default)]
        error_code: Option<String>,
    }

    match serde_json::from_str::<Vec<ApiError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .into_iter()
            .map(|error| match error.error_code {
                Some(code) => format!("{}: {}", code, error.message),
                None => error.message,
            })
            .collect::<Vec<String>>()
            .join("; "),
        _ => body.to_string(),
    }
}

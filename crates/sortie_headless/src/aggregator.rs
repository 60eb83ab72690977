//! Aggregator clients.
//!
//! The aggregator accumulates feature rows into a shared dataset. Its HTTP
//! contract:
//!
//! - `GET /headers` returns `{ "headers": [...] }`
//! - `GET /data` returns `{ "headers": [...], "data": [{...}, ...] }`
//! - `POST /update` takes a feature row and returns `{ "message": "..." }`,
//!   or a JSON body with `description` on failure
//!
//! [`CsvFileAggregator`] writes the same rows to a local CSV for offline runs
//! and [`MemoryAggregator`] keeps them in memory for tests.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::features::FeatureRow;

/// Timeout for every aggregator request.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Error type for aggregator calls.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Transport or decoding failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The aggregator answered with a failure status.
    #[error("Server error: {status} - {description}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided description.
        description: String,
    },
    /// No header schema could be retrieved.
    #[error("Could not retrieve CSV headers, aborting update")]
    EmptyHeaders,
    /// Local file failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Local CSV failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// `GET /headers` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadersResponse {
    /// Column names.
    #[serde(default)]
    pub headers: Vec<String>,
}

/// `GET /data` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataResponse {
    /// Column names.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Rows keyed by column name.
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    description: Option<String>,
}

/// Overview of the accumulated dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    /// Rows in the dataset.
    pub rows: usize,
    /// Columns in the schema.
    pub columns: usize,
    /// Rows labelled favourable for side A.
    pub side_a_favourable: usize,
    /// Rows labelled favourable for side B.
    pub side_b_favourable: usize,
}

impl DataResponse {
    /// Count rows and favourable labels.
    ///
    /// Labels may arrive as numbers or as CSV strings.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        let favourable = |column: &str| {
            self.data
                .iter()
                .filter(|row| match row.get(column) {
                    Some(Value::Number(n)) => n.as_f64() == Some(1.0),
                    Some(Value::String(s)) => s.trim() == "1",
                    _ => false,
                })
                .count()
        };
        DatasetSummary {
            rows: self.data.len(),
            columns: self.headers.len(),
            side_a_favourable: favourable("side_a_outcome"),
            side_b_favourable: favourable("side_b_outcome"),
        }
    }
}

/// Backend that accumulates feature rows.
#[allow(async_fn_in_trait)]
pub trait Aggregator {
    /// Column schema the backend accepts.
    async fn fetch_headers(&self) -> Result<Vec<String>, AggregatorError>;

    /// Everything accumulated so far.
    async fn fetch_data(&self) -> Result<DataResponse, AggregatorError>;

    /// Append one row. Returns the backend's confirmation message.
    async fn submit_row(&self, row: &FeatureRow) -> Result<String, AggregatorError>;
}

/// HTTP aggregator client
#[derive(Debug, Clone)]
pub struct HttpAggregator {
    client: Client,
    base_url: String,
}

impl HttpAggregator {
    /// Create a client for `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, AggregatorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Aggregator for HttpAggregator {
    async fn fetch_headers(&self) -> Result<Vec<String>, AggregatorError> {
        let resp = self
            .client
            .get(self.url("/headers"))
            .send()
            .await?
            .error_for_status()?;

        let body: HeadersResponse = resp.json().await?;
        Ok(body.headers)
    }

    async fn fetch_data(&self) -> Result<DataResponse, AggregatorError> {
        let resp = self
            .client
            .get(self.url("/data"))
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }

    async fn submit_row(&self, row: &FeatureRow) -> Result<String, AggregatorError> {
        debug!(scenario = %row.scenario_name, url = %self.url("/update"), "Sending row to aggregator");
        let resp = self
            .client
            .post(self.url("/update"))
            .json(row)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let description = resp
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.description)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(AggregatorError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        let body: UpdateResponse = resp.json().await?;
        Ok(body.message)
    }
}

/// Appends rows to a local CSV file.
///
/// The header is written when the file is new or empty.
#[derive(Debug, Clone)]
pub struct CsvFileAggregator {
    path: PathBuf,
}

impl CsvFileAggregator {
    /// Aggregate into `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_new(&self) -> bool {
        std::fs::metadata(&self.path).map_or(true, |meta| meta.len() == 0)
    }
}

impl Aggregator for CsvFileAggregator {
    async fn fetch_headers(&self) -> Result<Vec<String>, AggregatorError> {
        if self.is_new() {
            return Ok(FeatureRow::schema());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        Ok(reader.headers()?.iter().map(str::to_string).collect())
    }

    async fn fetch_data(&self) -> Result<DataResponse, AggregatorError> {
        if self.is_new() {
            return Ok(DataResponse::default());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut data = Vec::new();
        for record in reader.records() {
            let record = record?;
            data.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(header, value)| (header.clone(), Value::String(value.to_string())))
                    .collect(),
            );
        }
        Ok(DataResponse { headers, data })
    }

    async fn submit_row(&self, row: &FeatureRow) -> Result<String, AggregatorError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let write_header = self.is_new();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if write_header {
            writer.write_record(row.header())?;
        }
        writer.write_record(row.csv_record())?;
        writer.flush()?;
        Ok(format!("Data appended to {}", self.path.display()))
    }
}

/// In-memory aggregator for tests and dry runs.
#[derive(Debug)]
pub struct MemoryAggregator {
    headers: Vec<String>,
    rows: Mutex<Vec<Value>>,
    rejection: Option<(u16, String)>,
}

impl Default for MemoryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAggregator {
    /// Accepts every row, advertising the full feature schema.
    pub fn new() -> Self {
        Self {
            headers: FeatureRow::schema(),
            rows: Mutex::new(Vec::new()),
            rejection: None,
        }
    }

    /// Advertise a different header schema.
    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.headers = headers;
        self
    }

    /// Reject every submission with `status`.
    pub fn rejecting(mut self, status: u16, description: impl Into<String>) -> Self {
        self.rejection = Some((status, description.into()));
        self
    }

    /// Rows accepted so far, as submitted JSON.
    pub fn rows(&self) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Aggregator for MemoryAggregator {
    async fn fetch_headers(&self) -> Result<Vec<String>, AggregatorError> {
        Ok(self.headers.clone())
    }

    async fn fetch_data(&self) -> Result<DataResponse, AggregatorError> {
        let data = self
            .rows()
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        Ok(DataResponse {
            headers: self.headers.clone(),
            data,
        })
    }

    async fn submit_row(&self, row: &FeatureRow) -> Result<String, AggregatorError> {
        if let Some((status, description)) = &self.rejection {
            return Err(AggregatorError::Rejected {
                status: *status,
                description: description.clone(),
            });
        }
        let value = serde_json::to_value(row).unwrap_or(Value::Null);
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        rows.push(value);
        Ok(format!("Row {} stored", rows.len()))
    }
}

/// Validate the schema and submit one row.
///
/// Aborts with [`AggregatorError::EmptyHeaders`] when the backend reports no
/// columns; warns about columns the backend does not know.
pub async fn submit_feature_row<A: Aggregator>(
    aggregator: &A,
    row: &FeatureRow,
) -> Result<String, AggregatorError> {
    let headers = aggregator.fetch_headers().await?;
    if headers.is_empty() {
        error!(scenario = %row.scenario_name, "Could not retrieve CSV headers from the aggregator, aborting update");
        return Err(AggregatorError::EmptyHeaders);
    }

    let unknown: Vec<String> = row
        .header()
        .into_iter()
        .filter(|column| !headers.contains(column))
        .collect();
    if !unknown.is_empty() {
        warn!(
            scenario = %row.scenario_name,
            count = unknown.len(),
            first = %unknown[0],
            "Row carries columns the aggregator does not know"
        );
    }

    let message = aggregator.submit_row(row).await?;
    info!(scenario = %row.scenario_name, %message, "Aggregator accepted row");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutcomeThresholds;
    use crate::features::extract_features;
    use sortie_test_utils::fixtures::engagement_scenario;

    fn row(name: &str) -> FeatureRow {
        let line = engagement_scenario(name).to_snapshot_line().unwrap();
        extract_features(&line, &line, &OutcomeThresholds::default()).unwrap()
    }

    #[test]
    fn test_http_aggregator_trims_trailing_slash() {
        let aggregator = HttpAggregator::new("http://127.0.0.1:8009/").unwrap();
        assert_eq!(aggregator.base_url(), "http://127.0.0.1:8009");
        assert_eq!(aggregator.url("/update"), "http://127.0.0.1:8009/update");
    }

    #[tokio::test]
    async fn test_empty_headers_abort_submission() {
        let aggregator = MemoryAggregator::new().with_headers(Vec::new());
        let err = submit_feature_row(&aggregator, &row("Empty")).await.unwrap_err();
        assert!(matches!(err, AggregatorError::EmptyHeaders));
        assert!(aggregator.rows().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_columns_still_submitted() {
        let aggregator = MemoryAggregator::new().with_headers(vec!["side_a_outcome".into()]);
        submit_feature_row(&aggregator, &row("Partial")).await.unwrap();
        assert_eq!(aggregator.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_carries_description() {
        let aggregator = MemoryAggregator::new().rejecting(400, "Invalid columns");
        let err = submit_feature_row(&aggregator, &row("Rejected")).await.unwrap_err();
        assert_eq!(err.to_string(), "Server error: 400 - Invalid columns");
    }

    #[tokio::test]
    async fn test_csv_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let aggregator = CsvFileAggregator::new(dir.path().join("results").join("rows.csv"));
        assert_eq!(aggregator.fetch_headers().await.unwrap(), FeatureRow::schema());

        submit_feature_row(&aggregator, &row("First")).await.unwrap();
        submit_feature_row(&aggregator, &row("Second")).await.unwrap();

        let contents = std::fs::read_to_string(aggregator.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("side_a_outcome,side_b_outcome,"));
        assert_eq!(contents.matches("side_a_outcome").count(), 1);

        let data = aggregator.fetch_data().await.unwrap();
        assert_eq!(data.data.len(), 2);
        assert_eq!(data.summary().rows, 2);
        assert_eq!(data.summary().side_a_favourable, 0);
    }

    #[test]
    fn test_summary_reads_numbers_and_strings() {
        let mut first = Map::new();
        first.insert("side_a_outcome".into(), Value::from(1));
        first.insert("side_b_outcome".into(), Value::from("0"));
        let mut second = Map::new();
        second.insert("side_a_outcome".into(), Value::from("1"));
        second.insert("side_b_outcome".into(), Value::from("1"));
        let data = DataResponse {
            headers: vec!["side_a_outcome".into(), "side_b_outcome".into()],
            data: vec![first, second],
        };
        let summary = data.summary();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, 2);
        assert_eq!(summary.side_a_favourable, 2);
        assert_eq!(summary.side_b_favourable, 1);
    }
}

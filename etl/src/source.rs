use crate::records::{parse_records, records_to_batch};
use crate::utils::retry::retry_with_backoff;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::config::SourceConfig;
use common::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Supplies the raw, unvalidated record batch every pipeline starts from.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<RecordBatch>;
}

/// Fetches a JSON array of records from an HTTP endpoint.
pub struct HttpDataSource {
    client: Client,
    url: Url,
    max_retries: u32,
    base_delay_ms: u64,
}

impl HttpDataSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let url = Url::parse(&config.url)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidInput(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidInput(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url,
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
        })
    }

    async fn fetch_once(&self) -> Result<Vec<u8>> {
        debug!(url = %self.url, "Requesting dataset");
        let response = self.client.get(self.url.clone()).send().await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(Error::RateLimit),
            status if !status.is_success() => Err(Error::HttpStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            }),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(&self) -> Result<RecordBatch> {
        let body = retry_with_backoff(self.max_retries, self.base_delay_ms, move || {
            self.fetch_once()
        })
        .await?;

        let records = parse_records(&body)?;
        let batch = records_to_batch(&records)?;
        info!(
            url = %self.url,
            records = batch.num_rows(),
            fields = batch.num_columns(),
            "Fetched dataset"
        );
        Ok(batch)
    }
}

/// Serves a fixed batch. Used for replaying captured datasets and in tests.
#[derive(Clone)]
pub struct MemoryDataSource {
    batch: RecordBatch,
}

impl MemoryDataSource {
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn from_json(body: &[u8]) -> Result<Self> {
        let records = parse_records(body)?;
        Ok(Self::new(records_to_batch(&records)?))
    }
}

#[async_trait]
impl DataSource for MemoryDataSource {
    async fn fetch(&self) -> Result<RecordBatch> {
        Ok(self.batch.clone())
    }
}

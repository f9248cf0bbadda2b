//! Fetching the most recent value of a metric from graphite
//!
//! Each action asks graphite's render API for its metric in `raw` format:
//!
//! ```text
//! <base>?target=keepLastValue(<metric>)&format=raw&from=-2hours
//! ```
//!
//! `keepLastValue` carries the last known value over gaps so that a short
//! absence of data does not read as a threshold breach. The raw body ends in
//! a comma-separated list of samples and only the last one is used.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::{instrument, trace};

use crate::error::FetchError;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[ \n\t\r]+").expect("whitespace pattern is valid"));

/// Remove every run of whitespace from a configured metric
pub fn clean_metric(metric: &str) -> String {
    WHITESPACE.replace_all(metric, "").into_owned()
}

/// Build the render URL for an already cleaned metric
pub fn query_url(base: &str, metric: &str) -> String {
    format!("{base}?target=keepLastValue({metric})&format=raw&from=-2hours")
}

/// Extract the newest sample from a raw render body
pub fn extract_last_value(raw: &str) -> Result<f64, FetchError> {
    let last = raw
        .trim_matches(['\n', '\t', ' ', '\r'])
        .rsplit(',')
        .next()
        .unwrap_or_default();

    last.parse::<f64>().map_err(|e| FetchError::Parse {
        last: last.to_string(),
        reason: e.to_string(),
    })
}

/// A completed HTTP exchange, before any interpretation
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can perform a GET against graphite
///
/// The daemon uses [`HttpSource`]; tests swap in canned or failing sources.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError>;
}

/// [`MetricSource`] backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Create a source whose requests are abandoned after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetricSource for HttpSource {
    async fn get(&self, url: &str) -> Result<RawResponse, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}

/// Fetches a single metric through a [`MetricSource`]
#[derive(Clone)]
pub struct MetricFetcher {
    url: String,
    source: Arc<dyn MetricSource>,
}

impl MetricFetcher {
    pub fn new(base: &str, metric: &str, source: Arc<dyn MetricSource>) -> Self {
        Self {
            url: query_url(base, &clean_metric(metric)),
            source,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform exactly one request and return the newest sample
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<f64, FetchError> {
        let RawResponse { status, body } = self.source.get(&self.url).await?;

        if status != 200 {
            return Err(FetchError::Status { got: status });
        }

        let value = extract_last_value(&body)?;
        trace!(value, "fetched latest value");

        Ok(value)
    }
}

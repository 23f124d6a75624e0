//! Remote archive access: inventory download and ranged message fetch.
//!
//! The ranged fetch is the point of the whole pipeline. An HRRR pressure
//! archive is several hundred megabytes; the composite reflectivity message
//! is about one. A server that ignores `Range` and answers `200 OK` is
//! treated as an error, and the response is dropped before its body is read.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use grib2_parser::ByteRange;
use metrics::{counter, histogram};
use radar_common::ForecastTarget;
use reqwest::{header, Client, Response, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::config::{HttpConfig, SourceConfig};
use crate::error::FatalError;

/// Access to the archives of one model run.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Archive URL for a target, used for fetching and in logs.
    fn archive_url(&self, target: &ForecastTarget) -> String;

    /// Inventory URL for a target.
    fn index_url(&self, target: &ForecastTarget) -> String;

    /// Confirm the source answers before walking the horizon.
    async fn preflight(&self) -> Result<(), FetchError> {
        Ok(())
    }

    /// Download the inventory text for a target.
    async fn fetch_index(&self, target: &ForecastTarget) -> Result<String, FetchError>;

    /// Write exactly `range` of the target's archive to `dest`, returning
    /// the number of bytes written.
    async fn fetch_range(
        &self,
        target: &ForecastTarget,
        range: ByteRange,
        dest: &Path,
    ) -> Result<u64, FetchError>;
}

/// [`ArchiveSource`] over HTTP(S).
pub struct HttpArchive {
    client: Client,
    source: SourceConfig,
}

impl HttpArchive {
    pub fn new(source: SourceConfig, http: &HttpConfig) -> Result<Self, FatalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FatalError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, source })
    }

    async fn get(&self, url: &str, range: Option<&ByteRange>) -> Result<Response, FetchError> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(header::RANGE, range.http_header());
        }
        request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ArchiveSource for HttpArchive {
    fn archive_url(&self, target: &ForecastTarget) -> String {
        self.source.archive_url(target)
    }

    fn index_url(&self, target: &ForecastTarget) -> String {
        self.source.index_url(target)
    }

    /// Any answer short of a server error counts as reachable: some mirrors
    /// refuse directory listings at the root.
    #[instrument(skip_all, fields(url = %self.source.root_url))]
    async fn preflight(&self) -> Result<(), FetchError> {
        let url = self.source.root_url.as_str();
        let response = self.get(url, None).await?;
        let status = response.status();
        if status.is_server_error() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        debug!(status = status.as_u16(), "Archive root reachable");
        Ok(())
    }

    #[instrument(skip_all, fields(target = %target))]
    async fn fetch_index(&self, target: &ForecastTarget) -> Result<String, FetchError> {
        let url = self.source.index_url(target);
        let started = Instant::now();

        let response = self.get(&url, None).await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.clone(),
                source,
            })?;

        histogram!("refc_fetch_duration_seconds", "kind" => "index")
            .record(started.elapsed().as_secs_f64());
        debug!(url = %url, bytes = text.len(), "Fetched inventory");
        Ok(text)
    }

    #[instrument(skip_all, fields(target = %target, range = %range))]
    async fn fetch_range(
        &self,
        target: &ForecastTarget,
        range: ByteRange,
        dest: &Path,
    ) -> Result<u64, FetchError> {
        if range.is_empty() {
            return Err(FetchError::EmptyRange { range });
        }

        let url = self.source.archive_url(target);
        let started = Instant::now();

        let response = self.get(&url, Some(&range)).await?;
        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            // Dropping the response closes the connection without reading the archive
            StatusCode::OK => return Err(FetchError::NotPartial { url }),
            status => {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                })
            }
        }

        if let Some(start) = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_start)
        {
            if start != range.start() {
                return Err(FetchError::RangeMismatch {
                    url,
                    expected: range.start(),
                    actual: start,
                });
            }
        }

        let written = stream_to_file(response, &url, dest).await?;

        if let Some(expected) = range.len() {
            if written != expected {
                return Err(FetchError::ShortBody {
                    url,
                    expected,
                    actual: written,
                });
            }
        }

        counter!("refc_bytes_fetched_total").increment(written);
        histogram!("refc_fetch_duration_seconds", "kind" => "range")
            .record(started.elapsed().as_secs_f64());
        debug!(
            url = %url,
            bytes = written,
            path = %dest.display(),
            "Fetched byte range"
        );
        Ok(written)
    }
}

/// Stream a response body into `path`, replacing any previous content.
async fn stream_to_file(response: Response, url: &str, path: &Path) -> Result<u64, FetchError> {
    let io_err = |source: std::io::Error| FetchError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::create(path).await.map_err(io_err)?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk).await.map_err(io_err)?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(io_err)?;
    file.sync_all().await.map_err(io_err)?;

    Ok(written)
}

/// First byte of a `Content-Range: bytes start-end/total` value.
fn content_range_start(value: &str) -> Option<u64> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = spec.split_once('-')?;
    start.trim().parse().ok()
}

/// Ranged fetch failures. Each is a distinct outcome for the caller.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} ignored the Range header and answered with the whole file")]
    NotPartial { url: String },

    #[error("Refusing to fetch empty range {range}")]
    EmptyRange { range: ByteRange },

    #[error("{url} served a range starting at {actual}, expected {expected}")]
    RangeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("Body from {url} was {actual} bytes, expected {expected}")]
    ShortBody {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("Staging write to {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

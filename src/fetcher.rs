//! Dataset download.
//!
//! A single best-effort transfer of the whole dataset. There is no retry or
//! backoff. Failures are returned as [`FetchError`] so the caller decides how
//! to report them; [`Fetcher::fetch_best_effort`] logs and swallows them.
//!
//! The destination is overwritten in place, so a crash mid-write can leave a
//! truncated file behind.

use crate::models::FetchStatus;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on the buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Errors raised while fetching the dataset.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// An `http://` or `https://` endpoint.
    Remote(String),
    /// A file on disk, given as a path or a `file://` URL.
    Local(PathBuf),
}

impl Source {
    /// Interpret a source string from the config or command line.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Remote(location.to_string())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            Source::Local(PathBuf::from(path))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Remote(url) => write!(f, "{}", url),
            Source::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    /// Bytes written to the destination.
    pub bytes: u64,
}

/// Downloads the dataset to a local file.
pub struct Fetcher {
    client: reqwest::Client,
    show_progress: bool,
}

impl Fetcher {
    /// Create a fetcher with a default HTTP client.
    pub fn new(show_progress: bool) -> Self {
        Self::with_client(reqwest::Client::new(), show_progress)
    }

    /// Create a fetcher around an existing HTTP client.
    pub fn with_client(client: reqwest::Client, show_progress: bool) -> Self {
        Self {
            client,
            show_progress,
        }
    }

    /// Fetch `source` and write it to `destination`.
    ///
    /// Nothing is written unless the whole body was received with a
    /// success status.
    pub async fn fetch(&self, destination: &Path, source: &Source) -> Result<FetchSummary, FetchError> {
        info!("Fetching dataset from {}", source);

        let body = match source {
            Source::Remote(url) => self.download(url).await?,
            Source::Local(path) => tokio::fs::read(path).await.map_err(|e| FetchError::Read {
                path: path.clone(),
                source: e,
            })?,
        };

        let write_err = |e: std::io::Error| FetchError::Write {
            path: destination.to_path_buf(),
            source: e,
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(destination, &body).await.map_err(write_err)?;

        info!("Saved {} bytes to {}", body.len(), destination.display());
        Ok(FetchSummary {
            bytes: body.len() as u64,
        })
    }

    /// Fetch, logging any failure instead of returning it.
    ///
    /// The previous file at `destination`, if any, is left untouched on failure.
    pub async fn fetch_best_effort(&self, destination: &Path, source: &Source) -> FetchStatus {
        match self.fetch(destination, source).await {
            Ok(summary) => FetchStatus::Fetched {
                bytes: summary.bytes,
            },
            Err(e) => {
                warn!("Failed to download dataset from {}: {}", source, e);
                if destination.exists() {
                    warn!("Continuing with existing file {}", destination.display());
                } else {
                    warn!("No existing dataset at {}", destination.display());
                }
                FetchStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Single GET, reading the whole body into memory.
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source: e,
        };

        let mut response = self.client.get(url).send().await.map_err(transport_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let length = response.content_length();
        debug!("Response {} with content length {:?}", status, length);

        let progress = self.progress_bar(length);
        // The header is untrusted; the buffer grows past the cap as chunks arrive.
        let mut body = Vec::with_capacity(length.map_or(0, |l| l.min(MAX_PREALLOCATION)) as usize);

        while let Some(chunk) = response.chunk().await.map_err(transport_err)? {
            progress.inc(chunk.len() as u64);
            body.extend_from_slice(&chunk);
        }

        progress.finish_and_clear();
        Ok(body)
    }

    fn progress_bar(&self, length: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        match length {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("#>-"),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {bytes} received")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                pb
            }
        }
    }
}

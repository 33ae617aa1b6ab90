//! Installer artifact download.

use crate::event_log::Logger;
use crate::install::{InstallError, InstallOptions};
use crate::SoftwareItem;
use async_trait::async_trait;
use futures::StreamExt;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Extension given to artifacts whose URL carries no usable file name.
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "exe";

/// Fetches an item's installer artifact to local storage.
///
/// `on_progress` receives the percentage of this download (0 to 100)
/// whenever the total size is known.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(
        &self,
        item: &SoftwareItem,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError>;
}

/// Local file name for an artifact downloaded from `url`.
///
/// Uses the percent-decoded last path segment when it has an extension,
/// otherwise falls back to `<item_name>.exe` (redirecting endpoints such as
/// `.../download?os=win` or `.../latest/win64` land here). Characters that
/// Windows forbids in file names become `_` either way.
///
/// # Example
///
/// ```rust
/// use autoinstaller::artifact_file_name;
///
/// assert_eq!(
///     artifact_file_name("https://get.videolan.org/vlc/3.0.20/win64/vlc-3.0.20-win64.exe", "VLC"),
///     "vlc-3.0.20-win64.exe"
/// );
/// assert_eq!(artifact_file_name("https://laptop-updates.brave.com/latest/winx64", "Brave"), "Brave.exe");
/// ```
pub fn artifact_file_name(url: &str, item_name: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| sanitize(&percent_decode_str(&segment).decode_utf8_lossy()))
        .filter(|segment| {
            Path::new(segment)
                .extension()
                .is_some_and(|ext| !ext.is_empty())
        })
        .unwrap_or_else(|| format!("{}.{DEFAULT_ARTIFACT_EXTENSION}", sanitize(item_name)))
}

/// Replace characters Windows does not allow in file names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*') {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Streams artifacts over HTTP(S) into the download directory.
pub struct HttpFetcher {
    client: reqwest::Client,
    download_dir: PathBuf,
    logger: Arc<dyn Logger>,
}

impl HttpFetcher {
    pub fn new(options: &InstallOptions, logger: Arc<dyn Logger>) -> Result<Self, InstallError> {
        let client = reqwest::Client::builder()
            .connect_timeout(options.connect_timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| InstallError::Network {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
                fix: "Check the system TLS configuration".to_string(),
            })?;
        Ok(Self {
            client,
            download_dir: options.download_dir.clone(),
            logger,
        })
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        dest: &Path,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<u64, InstallError> {
        let total = response.content_length().filter(|&len| len > 0);
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| InstallError::io(dest, e))?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_reported: Option<u64> = None;

        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                _ = cancel.cancelled() => return Err(InstallError::cancelled()),
            };
            let chunk = match chunk {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Err(network_error(&e)),
                None => break,
            };

            file.write_all(&chunk)
                .await
                .map_err(|e| InstallError::io(dest, e))?;
            downloaded += chunk.len() as u64;

            if let Some(total) = total {
                // Whole percents only; chunks are often a few KiB.
                let whole = (downloaded.min(total) * 100) / total;
                if last_reported != Some(whole) {
                    on_progress(whole as f64);
                    last_reported = Some(whole);
                }
            }
        }

        file.flush().await.map_err(|e| InstallError::io(dest, e))?;
        Ok(downloaded)
    }
}

fn network_error(e: &reqwest::Error) -> InstallError {
    let fix = if e.is_connect() || e.is_timeout() {
        "Check your internet connection and try again"
    } else {
        "Retry the download; the server closed the connection"
    };
    InstallError::Network {
        message: e.to_string(),
        status: e.status().map(|s| s.as_u16()),
        fix: fix.to_string(),
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(
        &self,
        item: &SoftwareItem,
        on_progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<PathBuf, InstallError> {
        let source = item.download_source().ok_or_else(|| InstallError::Configuration {
            message: format!("{} has no download URL", item.name),
            fix: "Set downloadUrl in the catalog entry".to_string(),
        })?;
        let url = Url::parse(source).map_err(|e| InstallError::Configuration {
            message: format!("invalid download URL {source:?}: {e}"),
            fix: "Use an absolute http(s) URL".to_string(),
        })?;

        let dest = self.download_dir.join(artifact_file_name(source, &item.name));
        tracing::debug!(item = %item.name, %url, dest = %dest.display(), "downloading artifact");

        let response = tokio::select! {
            response = self.client.get(url).send() => response.map_err(|e| network_error(&e))?,
            _ = cancel.cancelled() => return Err(InstallError::cancelled()),
        };
        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::Network {
                message: format!("server responded with {status}"),
                status: Some(status.as_u16()),
                fix: "Check that the download URL is still valid".to_string(),
            });
        }

        let bytes = self.stream_to_file(response, &dest, on_progress, cancel).await?;
        self.logger.info(&format!(
            "{}: downloaded {} bytes to {}",
            item.name,
            bytes,
            dest.display()
        ));
        Ok(dest)
    }
}

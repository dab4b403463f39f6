//! Single-file HTTP downloads
//!
//! Used for one resolved file at a time, including files under product roots
//! that the stream backends refuse. Writes go to a temporary sibling file that
//! is renamed into place once complete.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::app::path::{Keywords, PathResolver};
use crate::app::remote::exists::set_modified;
use crate::app::remote::RemoteConfig;
use crate::auth::Credentials;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult, Result};

/// Downloads individual files over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpAccess {
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpAccess {
    pub fn new(config: &RemoteConfig, credentials: Option<Credentials>) -> DownloadResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    /// Download the file `name` resolves to into its local path
    ///
    /// Returns `Ok(None)` when the template does not resolve.
    pub async fn get(
        &self,
        resolver: &PathResolver,
        name: &str,
        keywords: &Keywords,
        force: bool,
    ) -> Result<Option<PathBuf>> {
        let Some(full) = resolver.full(name, keywords)? else {
            warn!("There is no file with filetype={} to access", name);
            return Ok(None);
        };
        let url = resolver.url_for_path(&full)?;
        let destination = PathBuf::from(full);
        self.download_file(&url, &destination, force).await?;
        Ok(Some(destination))
    }

    /// Download `url` to `destination` through a temporary file
    ///
    /// # Returns
    ///
    /// The number of bytes written
    ///
    /// # Errors
    ///
    /// `FileExists` when the destination exists and `force` is not set;
    /// `ServerError` on a non-success status; `IncompleteDownload` when fewer
    /// bytes arrive than announced.
    pub async fn download_file(
        &self,
        url: &str,
        destination: &Path,
        force: bool,
    ) -> DownloadResult<u64> {
        if destination.exists() && !force {
            return Err(DownloadError::FileExists {
                path: destination.display().to_string(),
            });
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);
        match self.download_attempt(url, &temp_path).await {
            Ok((written, modified)) => {
                tokio::fs::rename(&temp_path, destination)
                    .await
                    .map_err(|_| DownloadError::AtomicOperationFailed {
                        temp_path: temp_path.clone(),
                        final_path: destination.to_path_buf(),
                    })?;
                if let Some(modified) = modified {
                    if let Err(e) = set_modified(destination, modified) {
                        debug!("Could not set modification time of {}: {}", destination.display(), e);
                    }
                }
                info!("Downloaded {} ({} bytes)", destination.display(), written);
                Ok(written)
            }
            Err(e) => {
                if temp_path.exists() {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                }
                Err(e)
            }
        }
    }

    async fn download_attempt(
        &self,
        url: &str,
        temp_path: &Path,
    ) -> DownloadResult<(u64, Option<DateTime<Utc>>)> {
        let mut request = self.client.get(url);
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, Some(credentials.password()));
        }
        let mut response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::ServerError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let expected = response.content_length();
        let modified = response
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
            .map(|value| value.with_timezone(&Utc));

        let mut file = File::create(temp_path).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if let Some(expected) = expected {
            if written < expected {
                return Err(DownloadError::IncompleteDownload {
                    received: written,
                    expected,
                });
            }
        }
        Ok((written, modified))
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nLast-Modified: Mon, 12 Jul 2021 10:01:02 GMT\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}/sas/dr17/spec.fits", addr)
    }

    #[test]
    fn test_temp_path() {
        assert_eq!(
            temp_path_for(Path::new("/sas/dr17/spec.fits.gz")),
            PathBuf::from("/sas/dr17/spec.fits.gz.tmp")
        );
    }

    #[tokio::test]
    async fn test_existing_file_needs_force() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("spec.fits");
        std::fs::write(&destination, b"old").unwrap();

        let http = HttpAccess::new(&RemoteConfig::default(), None).unwrap();
        let result = http
            .download_file("http://127.0.0.1:9/spec.fits", &destination, false)
            .await;
        assert!(matches!(result, Err(DownloadError::FileExists { .. })));
    }

    const HEADER: &[u8] = b"SIMPLE  =                    T";

    #[tokio::test]
    async fn test_download_writes_atomically() {
        let url = serve_once("200 OK", HEADER).await;
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("dr17").join("spec.fits");

        let http = HttpAccess::new(&RemoteConfig::default(), None).unwrap();
        let written = http.download_file(&url, &destination, false).await.unwrap();

        assert_eq!(written, HEADER.len() as u64);
        assert_eq!(std::fs::read(&destination).unwrap(), HEADER);
        assert!(!temp_path_for(&destination).exists());
    }

    #[tokio::test]
    async fn test_server_error_leaves_nothing_behind() {
        let url = serve_once("404 Not Found", b"missing").await;
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("spec.fits");

        let http = HttpAccess::new(&RemoteConfig::default(), None).unwrap();
        let result = http.download_file(&url, &destination, false).await;
        assert!(matches!(
            result,
            Err(DownloadError::ServerError { status: 404, .. })
        ));
        assert!(!destination.exists());
        assert!(!temp_path_for(&destination).exists());
    }
}

//! Remote archive download
//!
//! [`ArchiveFetcher`] pulls `taxdmp.zip` through an [`ArchiveTransport`] and
//! writes it into the working directory in one piece before handing it to
//! the [`ArchiveExpander`]. Transport failures are logged and reported as
//! `Ok(false)`; the pipeline decides what a failed download means.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};
use taxdb_common::dump::ARCHIVE_FILE_NAME;
use tracing::{debug, error, info, warn};
use url::Url;

use super::archive::ArchiveExpander;
use crate::config::SourceSettings;
use crate::error::{FetchError, LoaderError, Result};

/// FTP user when the URL carries none
const ANONYMOUS_USER: &str = "anonymous";

/// Conventional anonymous FTP password
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Connect and read limits applied to every transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportTimeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl From<&SourceSettings> for TransportTimeouts {
    fn from(source: &SourceSettings) -> Self {
        Self {
            connect: source.connect_timeout,
            read: source.read_timeout,
        }
    }
}

/// Retrieves the raw bytes behind a URL
#[async_trait]
pub trait ArchiveTransport: Send + Sync {
    async fn retrieve(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Pick the transport for the URL scheme
pub fn transport_for(url: &Url, timeouts: TransportTimeouts) -> Result<Box<dyn ArchiveTransport>> {
    match url.scheme() {
        "ftp" => Ok(Box::new(FtpTransport::new(timeouts))),
        "http" | "https" => Ok(Box::new(HttpTransport::new(timeouts)?)),
        other => Err(LoaderError::config(format!(
            "no transport for URL scheme '{}'",
            other
        ))),
    }
}

/// Anonymous FTP in extended passive mode
///
/// `suppaftp`'s stream is blocking, so every retrieval runs on the blocking
/// pool.
#[derive(Debug, Clone)]
pub struct FtpTransport {
    timeouts: TransportTimeouts,
}

impl FtpTransport {
    pub fn new(timeouts: TransportTimeouts) -> Self {
        Self { timeouts }
    }

    fn retrieve_sync(url: &Url, timeouts: TransportTimeouts) -> std::result::Result<Vec<u8>, FetchError> {
        let addr = resolve(url)?;
        let user = match url.username() {
            "" => ANONYMOUS_USER,
            user => user,
        };
        let password = url.password().unwrap_or(ANONYMOUS_PASSWORD);
        let map_err = |e: FtpError| map_ftp_error(url, e);

        debug!(%addr, "Connecting to FTP server");
        let mut ftp_stream = FtpStream::connect_timeout(addr, timeouts.connect).map_err(map_err)?;
        ftp_stream
            .get_ref()
            .set_read_timeout(Some(timeouts.read))
            .map_err(|e| FetchError::transport(url, e))?;

        // Extended passive mode copes with NAT between us and the server
        ftp_stream.set_mode(Mode::ExtendedPassive);

        debug!(user, "Logging in");
        ftp_stream.login(user, password).map_err(map_err)?;
        ftp_stream.transfer_type(FileType::Binary).map_err(map_err)?;

        debug!(path = url.path(), "Retrieving file");
        let data = ftp_stream.retr_as_buffer(url.path()).map_err(map_err)?.into_inner();

        if let Err(e) = ftp_stream.quit() {
            warn!(error = %e, "Failed to quit FTP session gracefully");
        }

        Ok(data)
    }
}

#[async_trait]
impl ArchiveTransport for FtpTransport {
    async fn retrieve(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        let timeouts = self.timeouts;
        let task_url = url.clone();

        tokio::task::spawn_blocking(move || Self::retrieve_sync(&task_url, timeouts))
            .await
            .map_err(|e| FetchError::transport(url, format!("download task panicked: {}", e)))?
    }
}

fn resolve(url: &Url) -> std::result::Result<SocketAddr, FetchError> {
    let host = url.host_str().ok_or_else(|| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: "missing host".to_string(),
    })?;
    let port = url.port_or_known_default().unwrap_or(21);

    (host, port)
        .to_socket_addrs()
        .map_err(|e| FetchError::transport(url, e))?
        .next()
        .ok_or_else(|| FetchError::transport(url, format!("{} did not resolve", host)))
}

fn map_ftp_error(url: &Url, e: FtpError) -> FetchError {
    match e {
        FtpError::ConnectionError(io) => FetchError::transport(url, io),
        FtpError::InvalidAddress(addr) => FetchError::InvalidUrl {
            url: url.to_string(),
            reason: addr.to_string(),
        },
        other => FetchError::protocol(url, other),
    }
}

/// Plain HTTP(S) GET
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeouts: TransportTimeouts) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.read)
            .user_agent(concat!("taxdb-load/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LoaderError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArchiveTransport for HttpTransport {
    async fn retrieve(&self, url: &Url) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::protocol(url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        Ok(body.to_vec())
    }
}

/// Downloads `taxdmp.zip` and expands it in place
pub struct ArchiveFetcher {
    url: Url,
    transport: Box<dyn ArchiveTransport>,
    expander: ArchiveExpander,
}

impl ArchiveFetcher {
    /// Fetcher for the configured source, with the transport its scheme needs
    pub fn new(source: &SourceSettings) -> Result<Self> {
        let transport = transport_for(&source.url, source.into())?;
        Ok(Self::with_transport(source.url.clone(), transport))
    }

    pub fn with_transport(url: Url, transport: Box<dyn ArchiveTransport>) -> Self {
        Self {
            url,
            transport,
            expander: ArchiveExpander::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Download the archive into `directory` and expand it
    ///
    /// Returns `Ok(false)` when the download itself failed. Failures writing
    /// or expanding the archive are errors.
    pub async fn fetch(&self, directory: &Path) -> Result<bool> {
        info!(url = %self.url, "Downloading taxonomy archive");

        let data = match self.transport.retrieve(&self.url).await {
            Ok(data) => data,
            Err(e) => {
                error!(
                    url = %self.url,
                    error = %e,
                    transient = e.is_transient(),
                    "Archive download failed"
                );
                return Ok(false);
            },
        };

        let archive_path = directory.join(ARCHIVE_FILE_NAME);
        tokio::fs::write(&archive_path, &data)
            .await
            .map_err(|e| LoaderError::io(&archive_path, e))?;
        info!(path = %archive_path.display(), bytes = data.len(), "Archive saved");

        self.expander.expand(directory)?;
        Ok(true)
    }
}

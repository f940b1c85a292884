//! Fetching remote resources into the local destination tree.
//!
//! # Architecture
//!
//! ```text
//! Fetcher (skip check, atomic write)
//!    │
//!    └── Transport (trait)
//!           ├── HttpTransport    (http, https, file)
//!           └── MemoryTransport  (in-process map, used by tests)
//! ```
//!
//! A fetch is skipped when the destination already exists with exactly the
//! declared size. Size is the only staleness signal: a changed remote file
//! of the same length is never detected, and a damaged local file of the
//! right length is kept.

mod http;
mod memory;

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::TransferError;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

/// Buffer size for copying response bodies to disk (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Source of remote bytes.
pub trait Transport {
    /// Open a byte stream for `url`.
    fn open(&self, url: &Url) -> Result<Box<dyn Read>, TransferError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn open(&self, url: &Url) -> Result<Box<dyn Read>, TransferError> {
        (**self).open(url)
    }
}

/// What [`Fetcher::ensure_local`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The local file already had the expected size.
    Skipped,
    /// The file was transferred.
    Fetched { bytes: u64 },
}

/// Brings remote files to disk, skipping those already present.
#[derive(Debug)]
pub struct Fetcher<T> {
    transport: T,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Make sure `local` holds the resource at `remote`.
    ///
    /// Existing files whose length equals `expected_size` are left alone
    /// without touching the transport. Anything else is (re)downloaded
    /// through a temporary file that replaces `local` only once the whole
    /// body has been written.
    pub fn ensure_local(
        &self,
        remote: &Url,
        local: &Path,
        expected_size: u64,
    ) -> Result<FetchOutcome, TransferError> {
        if is_satisfied(local, expected_size) {
            debug!(path = %local.display(), size = expected_size, "File already present, skipping");
            return Ok(FetchOutcome::Skipped);
        }

        let bytes = self.download(remote, local)?;
        if bytes != expected_size {
            warn!(
                url = %remote,
                path = %local.display(),
                expected = expected_size,
                actual = bytes,
                "Downloaded size differs from declared size"
            );
        }
        info!(url = %remote, path = %local.display(), bytes, "Fetched");
        Ok(FetchOutcome::Fetched { bytes })
    }

    fn download(&self, remote: &Url, local: &Path) -> Result<u64, TransferError> {
        let parent = match local.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| TransferError::CreateDirFailed {
            path: parent.to_path_buf(),
            source,
        })?;

        let mut response = self.transport.open(remote)?;

        let temp = NamedTempFile::new_in(parent).map_err(|source| TransferError::WriteFailed {
            path: local.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(temp);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| TransferError::Request {
                    url: remote.to_string(),
                    reason: format!("Read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|source| TransferError::WriteFailed {
                    path: local.to_path_buf(),
                    source,
                })?;

            downloaded += bytes_read as u64;
        }

        let temp = writer
            .into_inner()
            .map_err(|e| TransferError::WriteFailed {
                path: local.to_path_buf(),
                source: e.into_error(),
            })?;
        temp.persist(local)
            .map_err(|e| TransferError::WriteFailed {
                path: local.to_path_buf(),
                source: e.error,
            })?;

        Ok(downloaded)
    }
}

/// Whether `local` is an existing file of exactly `expected_size` bytes.
fn is_satisfied(local: &Path, expected_size: u64) -> bool {
    fs::metadata(local)
        .map(|meta| meta.is_file() && meta.len() == expected_size)
        .unwrap_or(false)
}

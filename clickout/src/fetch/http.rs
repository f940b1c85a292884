//! Blocking HTTP(S) transport, with `file://` support for local mirrors.

use std::fs::File;
use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use super::Transport;
use crate::config::FetchConfig;
use crate::error::TransferError;

/// Transport backed by a blocking `reqwest` client.
///
/// `http` and `https` URLs are fetched with a plain GET; `file` URLs are
/// opened from the local filesystem. Any other scheme is rejected.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    pub(crate) timeout: Duration,
}

impl HttpTransport {
    /// Create a transport using the timeout and user agent from `config`.
    pub fn new(config: &FetchConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransferError::Client(e.to_string()))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    fn get(&self, url: &Url) -> Result<Box<dyn Read>, TransferError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url.as_str()).send().map_err(|e| {
            if e.is_timeout() {
                TransferError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                TransferError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(Box::new(response))
    }

    fn open_file(url: &Url) -> Result<Box<dyn Read>, TransferError> {
        let path = url.to_file_path().map_err(|()| TransferError::Request {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        debug!(path = %path.display(), "Reading local file");
        let file = File::open(&path).map_err(|source| TransferError::ReadFailed { path, source })?;
        Ok(Box::new(file))
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Read>, TransferError> {
        match url.scheme() {
            "http" | "https" => self.get(url),
            "file" => Self::open_file(url),
            scheme => Err(TransferError::UnsupportedScheme {
                url: url.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_http_transport_uses_config_timeout() {
        let config = FetchConfig::default().with_timeout(Duration::from_secs(60));
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.timeout.as_secs(), 60);
    }

    #[test]
    fn test_file_url_is_read_from_disk() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        source.write_all(b"payload").unwrap();

        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        let url = Url::from_file_path(source.path()).unwrap();
        let mut body = String::new();
        transport
            .open(&url)
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "payload");
    }

    #[test]
    fn test_missing_file_url_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.deploy")).unwrap();
        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        assert!(matches!(
            transport.open(&url),
            Err(TransferError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_unsupported_scheme() {
        let transport = HttpTransport::new(&FetchConfig::default()).unwrap();
        let url = Url::parse("ftp://example.test/a.deploy").unwrap();
        match transport.open(&url) {
            Err(TransferError::UnsupportedScheme { scheme, .. }) => assert_eq!(scheme, "ftp"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("ftp should not be supported"),
        }
    }
}

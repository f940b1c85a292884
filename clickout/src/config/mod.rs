//! Configuration for deployment downloads.

mod file;

use std::path::PathBuf;
use std::time::Duration;

pub use file::{default_config_path, ConfigFile};

/// Default destination directory, relative to the working directory.
pub const DEFAULT_DESTINATION: &str = "unpack";

/// Default timeout for a single transfer in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Default limit on manifest nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Settings for one deployment download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Directory the deployment is mirrored into.
    pub destination: PathBuf,

    /// Timeout applied to each transfer.
    pub timeout: Duration,

    /// User agent sent with HTTP requests.
    pub user_agent: String,

    /// Maximum manifest nesting below the application manifest.
    pub max_depth: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from(DEFAULT_DESTINATION),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("clickout/{}", env!("CARGO_PKG_VERSION")),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FetchConfig {
    /// Create a configuration writing into `destination`.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            ..Default::default()
        }
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set how many levels of nested manifests are followed below the
    /// application manifest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

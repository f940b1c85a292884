//! clickout - mirror ClickOnce deployments
//!
//! This library walks a ClickOnce deployment starting from its
//! `.application` manifest, fetches every referenced manifest and file from
//! the deployment server, and lays them out on disk the way the installer
//! would see them.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use clickout::{download_application, FetchConfig};
//!
//! let config = FetchConfig::new("unpack");
//! let report = download_application(Path::new("Tool.application"), &config)?;
//! println!("{} files fetched, {} already present", report.fetched, report.skipped);
//! # Ok::<(), clickout::ClickoutError>(())
//! ```

pub mod application;
pub mod assembly;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod manifest;
pub mod path;
pub mod resolver;

pub use application::download_application;
pub use assembly::{AssemblyReference, FileReference, ReferenceKind, DEPLOY_SUFFIX};
pub use config::{ConfigFile, FetchConfig};
pub use error::{ClickoutError, Result, TransferError};
pub use fetch::{FetchOutcome, Fetcher, HttpTransport, MemoryTransport, Transport};
pub use manifest::{ManifestDocument, ManifestEntry};
pub use resolver::{ManifestResolver, ResolutionContext, ResolveEvent, ResolveReport};

//! ClickOnce manifest documents.
//!
//! Only the handful of elements needed to walk a deployment are read:
//!
//! ```text
//! <assembly>                                   (document root)
//!   <deployment>
//!     <deploymentProvider codebase="..."/>     (root .application only)
//!   </deployment>
//!   <dependency>
//!     <dependentAssembly dependencyType="install" codebase="..." size="..."/>
//!   </dependency>
//!   <file name="..." size="..."/>
//! </assembly>
//! ```
//!
//! All of them live in the `urn:schemas-microsoft-com:asm.v2` namespace and
//! must be direct children (or grandchildren, for the nested elements) of the
//! root. Everything else is ignored.

mod parser;

use std::fs;
use std::path::Path;

use crate::error::{ClickoutError, Result};

pub use parser::parse_manifest;

/// Namespace of the deployment elements.
pub const ASM_V2_NAMESPACE: &str = "urn:schemas-microsoft-com:asm.v2";

/// A `dependentAssembly` with `dependencyType="install"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    /// Path of the referenced manifest, relative to the current base.
    pub codebase: String,
    /// Declared size in bytes.
    pub size: u64,
}

/// A plain `file` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// One resolvable element of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Dependency(DependencyEntry),
    File(FileEntry),
}

/// A parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDocument {
    /// `deploymentProvider` codebase, present on application manifests.
    pub deployment_codebase: Option<String>,
    /// Dependencies and files in document order.
    pub entries: Vec<ManifestEntry>,
}

impl ManifestDocument {
    /// Read and parse a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ClickoutError::manifest(path, e.to_string()))?;
        parse_manifest(&content, path)
    }

    /// Install dependencies in document order.
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            ManifestEntry::Dependency(dependency) => Some(dependency),
            ManifestEntry::File(_) => None,
        })
    }

    /// Plain files in document order.
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter_map(|entry| match entry {
            ManifestEntry::File(file) => Some(file),
            ManifestEntry::Dependency(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Referenced assemblies and files, and their remote and local forms.

use std::path::{Path, PathBuf};

use url::Url;

use crate::manifest::{DependencyEntry, FileEntry};
use crate::path::{split_native, to_address, to_address_segments};

/// Suffix a deployment server appends to every packaged file.
pub const DEPLOY_SUFFIX: &str = ".deploy";

/// How a referenced assembly is addressed on the deployment server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Top-level application manifest, served under its plain name.
    Direct,
    /// Nested assembly manifest, served with the deploy suffix.
    Indirect,
}

/// One referenced installable component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReference {
    relative_path: String,
    declared_size: u64,
    kind: ReferenceKind,
}

impl AssemblyReference {
    /// Create a reference from its manifest path and declared size.
    pub fn new(relative_path: impl Into<String>, declared_size: u64, kind: ReferenceKind) -> Self {
        Self {
            relative_path: relative_path.into(),
            declared_size,
            kind,
        }
    }

    /// Build a reference from a parsed `dependentAssembly` entry.
    pub fn from_entry(entry: &DependencyEntry, kind: ReferenceKind) -> Self {
        Self::new(entry.codebase.clone(), entry.size, kind)
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Encoded remote path segments.
    ///
    /// Indirect references are addressed with [`DEPLOY_SUFFIX`] appended to
    /// the final component; direct references are not.
    pub fn segments(&self) -> Vec<String> {
        match self.kind {
            ReferenceKind::Direct => to_address_segments(&self.relative_path),
            ReferenceKind::Indirect => {
                to_address_segments(&format!("{}{}", self.relative_path, DEPLOY_SUFFIX))
            }
        }
    }

    /// Full remote address of this assembly below `base`.
    pub fn remote_address(&self, base: &Url) -> Url {
        to_address(base, &self.segments())
    }

    /// Remote directory holding this assembly, used as the base for the
    /// nested manifest's own references.
    pub fn remote_directory(&self, base: &Url) -> Url {
        let segments = self.segments();
        let parent = &segments[..segments.len().saturating_sub(1)];
        to_address(base, parent)
    }

    /// Local destination of this assembly below `destination`.
    pub fn local_path(&self, destination: &Path) -> PathBuf {
        local_join(destination, &self.relative_path)
    }
}

/// A plain file listed by a manifest. Always a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    relative_path: String,
    declared_size: u64,
}

impl FileReference {
    pub fn new(relative_path: impl Into<String>, declared_size: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            declared_size,
        }
    }

    pub fn from_entry(entry: &FileEntry) -> Self {
        Self::new(entry.name.clone(), entry.size)
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Remote address, always carrying [`DEPLOY_SUFFIX`].
    pub fn remote_address(&self, base: &Url) -> Url {
        let segments = to_address_segments(&format!("{}{}", self.relative_path, DEPLOY_SUFFIX));
        to_address(base, &segments)
    }

    pub fn local_path(&self, destination: &Path) -> PathBuf {
        local_join(destination, &self.relative_path)
    }
}

/// Join the undecorated components of a manifest path onto a local
/// directory, using the host's own separator.
fn local_join(destination: &Path, relative_path: &str) -> PathBuf {
    split_native(relative_path)
        .into_iter()
        .fold(destination.to_path_buf(), |path, part| path.join(part))
}

//! Recursive manifest resolution.
//!
//! Each call to [`ManifestResolver::resolve`] handles one manifest at one
//! `(remote base, local destination)` pair. Dependent assemblies are fetched
//! and then resolved as manifests in their own right, with a context derived
//! from the assembly's own remote directory and local parent directory:
//!
//! ```text
//! resolve(App.exe.manifest, https://host/app/Files, unpack/Files)
//!   ├── dependentAssembly Lib\Lib.manifest
//!   │     fetch https://host/app/Files/Lib/Lib.manifest.deploy -> unpack/Files/Lib/Lib.manifest
//!   │     resolve(unpack/Files/Lib/Lib.manifest, https://host/app/Files/Lib, unpack/Files/Lib)
//!   └── file App.exe
//!         fetch https://host/app/Files/App.exe.deploy -> unpack/Files/App.exe
//! ```
//!
//! Dependencies are handled before files, each group in document order.
//! Nothing is deduplicated across branches: a manifest referenced twice is
//! fetched (or skip-checked) twice. A manifest that appears on its own
//! ancestor chain is reported as a cycle.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::assembly::{AssemblyReference, FileReference, ReferenceKind};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{ClickoutError, Result, TransferError};
use crate::fetch::{FetchOutcome, Fetcher, Transport};
use crate::manifest::ManifestDocument;

/// Progress callback invoked for every [`ResolveEvent`].
pub type ProgressCallback = Box<dyn Fn(&ResolveEvent) + Send + Sync>;

/// Notable steps of a resolution, reported in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    /// A manifest is about to be walked.
    ManifestStarted {
        path: PathBuf,
        remote_base: Url,
        depth: usize,
    },
    /// A file was transferred.
    Fetched { url: Url, path: PathBuf, bytes: u64 },
    /// A file was already present with the declared size.
    Skipped { url: Url, path: PathBuf },
}

/// Totals for a finished resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Manifests walked, including the one resolution started from.
    pub manifests: usize,
    /// Files transferred.
    pub fetched: usize,
    /// Files already present.
    pub skipped: usize,
    /// Bytes transferred.
    pub bytes_downloaded: u64,
}

impl ResolveReport {
    fn record(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Skipped => self.skipped += 1,
            FetchOutcome::Fetched { bytes } => {
                self.fetched += 1;
                self.bytes_downloaded += bytes;
            }
        }
    }

    pub(crate) fn merge(&mut self, other: ResolveReport) {
        self.manifests += other.manifests;
        self.fetched += other.fetched;
        self.skipped += other.skipped;
        self.bytes_downloaded += other.bytes_downloaded;
    }

    /// Number of fetch decisions taken (fetched plus skipped).
    pub fn files(&self) -> usize {
        self.fetched + self.skipped
    }
}

/// Where one manifest's references are resolved from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    remote_base: Url,
    local_destination: PathBuf,
    depth: usize,
    /// Remote addresses of the manifests enclosing this one.
    ancestors: Vec<Url>,
}

impl ResolutionContext {
    pub fn new(remote_base: Url, local_destination: impl Into<PathBuf>) -> Self {
        Self {
            remote_base,
            local_destination: local_destination.into(),
            depth: 0,
            ancestors: Vec::new(),
        }
    }

    /// Root context for a deployment whose own manifest lives at `origin`.
    pub(crate) fn for_deployment(
        remote_base: Url,
        local_destination: impl Into<PathBuf>,
        origin: Url,
    ) -> Self {
        Self {
            ancestors: vec![origin],
            ..Self::new(remote_base, local_destination)
        }
    }

    pub fn remote_base(&self) -> &Url {
        &self.remote_base
    }

    pub fn local_destination(&self) -> &Path {
        &self.local_destination
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for the nested manifest fetched from `manifest_url`.
    fn descend(
        &self,
        manifest_url: &Url,
        remote_base: Url,
        local_destination: PathBuf,
        max_depth: usize,
    ) -> Result<Self> {
        if self.ancestors.contains(manifest_url) {
            return Err(ClickoutError::CycleDetected {
                url: manifest_url.to_string(),
            });
        }
        if self.depth >= max_depth {
            return Err(ClickoutError::DepthExceeded {
                max_depth,
                url: manifest_url.to_string(),
            });
        }

        let mut ancestors = self.ancestors.clone();
        ancestors.push(manifest_url.clone());
        Ok(Self {
            remote_base,
            local_destination,
            depth: self.depth + 1,
            ancestors,
        })
    }
}

/// Walks manifests and fetches everything they reference.
pub struct ManifestResolver<T> {
    fetcher: Fetcher<T>,
    max_depth: usize,
    progress: Option<ProgressCallback>,
}

impl<T: Transport> ManifestResolver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            fetcher: Fetcher::new(transport),
            max_depth: DEFAULT_MAX_DEPTH,
            progress: None,
        }
    }

    /// Limit how many levels of nested manifests are followed.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Report progress through `callback`.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolve the manifest at `manifest_path`, fetching its references
    /// from below `remote_base` into `local_destination`.
    pub fn resolve(
        &self,
        manifest_path: &Path,
        remote_base: &Url,
        local_destination: &Path,
    ) -> Result<ResolveReport> {
        let context = ResolutionContext::new(remote_base.clone(), local_destination);
        self.resolve_in(manifest_path, &context)
    }

    /// Resolve one manifest within an existing context.
    pub fn resolve_in(
        &self,
        manifest_path: &Path,
        context: &ResolutionContext,
    ) -> Result<ResolveReport> {
        let document = ManifestDocument::load(manifest_path)?;
        create_dir(&context.local_destination)?;

        debug!(
            manifest = %manifest_path.display(),
            remote = %context.remote_base,
            local = %context.local_destination.display(),
            depth = context.depth,
            "Resolving manifest"
        );
        self.emit(ResolveEvent::ManifestStarted {
            path: manifest_path.to_path_buf(),
            remote_base: context.remote_base.clone(),
            depth: context.depth,
        });

        let mut report = ResolveReport {
            manifests: 1,
            ..Default::default()
        };

        for entry in document.dependencies() {
            let assembly = AssemblyReference::from_entry(entry, ReferenceKind::Indirect);
            report.merge(self.resolve_assembly(&assembly, context)?);
        }

        for entry in document.files() {
            let file = FileReference::from_entry(entry);
            let remote = file.remote_address(&context.remote_base);
            let local = file.local_path(&context.local_destination);
            debug!(name = file.relative_path(), size = file.declared_size(), "Found file");
            report.record(self.fetch(&remote, &local, file.declared_size())?);
        }

        Ok(report)
    }

    /// Fetch an assembly's manifest, then resolve it.
    pub(crate) fn resolve_assembly(
        &self,
        assembly: &AssemblyReference,
        context: &ResolutionContext,
    ) -> Result<ResolveReport> {
        let remote = assembly.remote_address(&context.remote_base);
        let local = assembly.local_path(&context.local_destination);
        let local_parent = local
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| context.local_destination.clone());

        debug!(
            codebase = assembly.relative_path(),
            size = assembly.declared_size(),
            kind = ?assembly.kind(),
            "Found dependent assembly"
        );

        let nested = context.descend(
            &remote,
            assembly.remote_directory(&context.remote_base),
            local_parent,
            self.max_depth,
        )?;

        let mut report = ResolveReport::default();
        report.record(self.fetch(&remote, &local, assembly.declared_size())?);
        report.merge(self.resolve_in(&local, &nested)?);
        Ok(report)
    }

    fn fetch(&self, remote: &Url, local: &Path, expected_size: u64) -> Result<FetchOutcome> {
        let outcome = self.fetcher.ensure_local(remote, local, expected_size)?;
        self.emit(match outcome {
            FetchOutcome::Skipped => ResolveEvent::Skipped {
                url: remote.clone(),
                path: local.to_path_buf(),
            },
            FetchOutcome::Fetched { bytes } => ResolveEvent::Fetched {
                url: remote.clone(),
                path: local.to_path_buf(),
                bytes,
            },
        });
        Ok(outcome)
    }

    fn emit(&self, event: ResolveEvent) {
        if let Some(callback) = &self.progress {
            callback(&event);
        }
    }
}

pub(crate) fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| {
        ClickoutError::from(TransferError::CreateDirFailed {
            path: path.to_path_buf(),
            source,
        })
    })
}

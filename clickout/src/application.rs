//! Entry point for a whole deployment.
//!
//! An `.application` file names the deployment's location in its
//! `deploymentProvider` codebase and lists the application manifest as a
//! direct dependency. The application manifest is fetched under its plain
//! name, then resolved like any other manifest.

use std::fs;
use std::path::Path;

use tracing::info;
use url::Url;

use crate::assembly::{AssemblyReference, ReferenceKind};
use crate::config::FetchConfig;
use crate::error::{ClickoutError, Result};
use crate::fetch::{HttpTransport, Transport};
use crate::manifest::ManifestDocument;
use crate::resolver::{create_dir, ManifestResolver, ResolutionContext, ResolveReport};

impl<T: Transport> ManifestResolver<T> {
    /// Mirror the deployment described by `app_manifest` into `destination`.
    ///
    /// Fails before any transfer if the manifest lacks a
    /// `deploymentProvider` codebase.
    pub fn resolve_application(
        &self,
        app_manifest: &Path,
        destination: &Path,
    ) -> Result<ResolveReport> {
        let document = ManifestDocument::load(app_manifest)?;
        let codebase = document.deployment_codebase.as_deref().ok_or_else(|| {
            ClickoutError::manifest(app_manifest, "missing deployment/deploymentProvider codebase")
        })?;

        let deployment_url = deployment_url(codebase, app_manifest)?;
        let deployment_base = deployment_url.join(".").map_err(|e| {
            ClickoutError::manifest(app_manifest, format!("invalid codebase {:?}: {}", codebase, e))
        })?;
        info!(codebase = %deployment_base, destination = %destination.display(), "Using codebase");

        create_dir(destination)?;
        let root = ResolutionContext::for_deployment(deployment_base, destination, deployment_url);

        let mut report = ResolveReport {
            manifests: 1,
            ..Default::default()
        };
        for entry in document.dependencies() {
            let assembly = AssemblyReference::from_entry(entry, ReferenceKind::Direct);
            report.merge(self.resolve_assembly(&assembly, &root)?);
        }

        info!(
            manifests = report.manifests,
            fetched = report.fetched,
            skipped = report.skipped,
            bytes = report.bytes_downloaded,
            "Deployment resolved"
        );
        Ok(report)
    }
}

impl ManifestResolver<HttpTransport> {
    /// Resolver using the HTTP transport and limits from `config`.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(transport).with_max_depth(config.max_depth))
    }
}

/// Download the deployment described by `app_manifest` into
/// `config.destination`.
pub fn download_application(app_manifest: &Path, config: &FetchConfig) -> Result<ResolveReport> {
    ManifestResolver::from_config(config)?.resolve_application(app_manifest, &config.destination)
}

/// Absolute URL of the deployment manifest.
///
/// A relative codebase is taken relative to the directory holding the
/// application manifest, as a `file://` URL.
fn deployment_url(codebase: &str, app_manifest: &Path) -> Result<Url> {
    match Url::parse(codebase) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let manifest = fs::canonicalize(app_manifest)
                .map_err(|e| ClickoutError::manifest(app_manifest, e.to_string()))?;
            let directory = manifest.parent().unwrap_or(&manifest);
            let base = Url::from_directory_path(directory).map_err(|()| {
                ClickoutError::manifest(
                    app_manifest,
                    format!("cannot express {} as a URL", directory.display()),
                )
            })?;
            base.join(codebase).map_err(|e| {
                ClickoutError::manifest(
                    app_manifest,
                    format!("invalid codebase {:?}: {}", codebase, e),
                )
            })
        }
        Err(e) => Err(ClickoutError::manifest(
            app_manifest,
            format!("invalid codebase {:?}: {}", codebase, e),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryTransport;

    const APPLICATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<asmv1:assembly xmlns="urn:schemas-microsoft-com:asm.v2" xmlns:asmv1="urn:schemas-microsoft-com:asm.v1">
  <deployment install="true">
    <deploymentProvider codebase="https://example.test/app/app.application" />
  </deployment>
  <dependency>
    <dependentAssembly dependencyType="install" codebase="Sub\Sub.manifest" size="100" />
  </dependency>
</asmv1:assembly>"#;

    fn sub_manifest() -> String {
        let body = r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v2"><file name="data.bin" size="50"/></assembly>"#;
        // Pad to the declared size so a second run skips it.
        format!("{:<100}", body)
    }

    #[test]
    fn test_resolve_application_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.application");
        fs::write(&app, APPLICATION).unwrap();
        let dest = dir.path().join("unpack");

        let sub = sub_manifest();
        let transport = MemoryTransport::new()
            .with_resource("https://example.test/app/Sub/Sub.manifest", sub.clone())
            .with_resource("https://example.test/app/Sub/data.bin.deploy", vec![9u8; 50]);
        let resolver = ManifestResolver::new(&transport);

        let report = resolver.resolve_application(&app, &dest).unwrap();

        assert_eq!(
            transport.requests(),
            vec![
                "https://example.test/app/Sub/Sub.manifest".to_string(),
                "https://example.test/app/Sub/data.bin.deploy".to_string(),
            ]
        );
        assert_eq!(fs::read_to_string(dest.join("Sub").join("Sub.manifest")).unwrap(), sub);
        assert_eq!(fs::read(dest.join("Sub").join("data.bin")).unwrap(), vec![9u8; 50]);
        assert_eq!(report.manifests, 2);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.bytes_downloaded, 150);

        let again = resolver.resolve_application(&app, &dest).unwrap();
        assert_eq!(again.fetched, 0);
        assert_eq!(again.skipped, 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[test]
    fn test_missing_deployment_provider_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.application");
        fs::write(
            &app,
            r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v2">
  <dependency><dependentAssembly dependencyType="install" codebase="a.manifest" size="1"/></dependency>
</assembly>"#,
        )
        .unwrap();
        let transport = MemoryTransport::new();

        let err = ManifestResolver::new(&transport)
            .resolve_application(&app, &dir.path().join("unpack"))
            .unwrap_err();

        assert!(matches!(err, ClickoutError::ManifestParse { .. }));
        assert!(transport.requests().is_empty());
        assert!(!dir.path().join("unpack").exists());
    }

    #[test]
    fn test_provider_without_codebase_is_manifest_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.application");
        fs::write(
            &app,
            r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v2"><deployment><deploymentProvider/></deployment></assembly>"#,
        )
        .unwrap();

        let err = ManifestResolver::new(MemoryTransport::new())
            .resolve_application(&app, &dir.path().join("unpack"))
            .unwrap_err();
        assert!(matches!(err, ClickoutError::ManifestParse { .. }));
    }

    #[test]
    fn test_application_without_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.application");
        fs::write(
            &app,
            r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v2"><deployment><deploymentProvider codebase="https://example.test/a.application"/></deployment></assembly>"#,
        )
        .unwrap();
        let transport = MemoryTransport::new();

        let report = ManifestResolver::new(&transport)
            .resolve_application(&app, &dir.path().join("unpack"))
            .unwrap();
        assert_eq!(report.manifests, 1);
        assert_eq!(report.files(), 0);
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_relative_codebase_resolves_next_to_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.application");
        fs::write(&app, "").unwrap();

        let url = deployment_url("mirror/app.application", &app).unwrap();
        let expected = Url::from_directory_path(fs::canonicalize(dir.path()).unwrap())
            .unwrap()
            .join("mirror/app.application")
            .unwrap();
        assert_eq!(url, expected);
        assert_eq!(url.scheme(), "file");
    }

    #[test]
    fn test_absolute_codebase_is_kept() {
        let url =
            deployment_url("https://example.test/app/app.application", Path::new("x")).unwrap();
        assert_eq!(url.as_str(), "https://example.test/app/app.application");
        assert_eq!(url.join(".").unwrap().as_str(), "https://example.test/app/");
    }
}

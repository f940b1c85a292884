//! Integration tests resolving a deployment from a local `file://` mirror.
//!
//! These exercise the real transport, the skip check and the on-disk layout
//! without any network access.
//!
//! Run with: `cargo test --test file_mirror`

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use clickout::{download_application, ClickoutError, FetchConfig};

// ============================================================================
// Helper Functions
// ============================================================================

fn manifest(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<asmv1:assembly manifestVersion="1.0" xmlns:asmv1="urn:schemas-microsoft-com:asm.v1" xmlns="urn:schemas-microsoft-com:asm.v2">
{}
</asmv1:assembly>"#,
        body
    )
}

/// Write `content` under `root` and return its size.
fn publish(root: &Path, relative: &str, content: &[u8]) -> u64 {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    content.len() as u64
}

/// Lay out a small deployment the way a publish step would:
///
/// ```text
/// mirror/Tool.application
/// mirror/Application Files/Tool_1_0/Tool.exe.manifest
/// mirror/Application Files/Tool_1_0/Tool.exe.deploy
/// mirror/Application Files/Tool_1_0/Data/config#1.xml.deploy
/// mirror/Application Files/Tool_1_0/Plugins/Plugin.manifest.deploy
/// mirror/Application Files/Tool_1_0/Plugins/Plugin.dll.deploy
/// ```
fn publish_deployment(mirror: &Path, codebase: &str) -> PathBuf {
    let version_dir = "Application Files/Tool_1_0";

    let plugin_dll = publish(
        mirror,
        &format!("{version_dir}/Plugins/Plugin.dll.deploy"),
        b"plugin",
    );
    let plugin_manifest = manifest(&format!(r#"<file name="Plugin.dll" size="{plugin_dll}" />"#));
    let plugin_size = publish(
        mirror,
        &format!("{version_dir}/Plugins/Plugin.manifest.deploy"),
        plugin_manifest.as_bytes(),
    );

    let exe = publish(mirror, &format!("{version_dir}/Tool.exe.deploy"), b"MZ tool binary");
    let config = publish(mirror, &format!("{version_dir}/Data/config#1.xml.deploy"), b"<config/>");
    let app_manifest = manifest(&format!(
        r#"  <dependency>
    <dependentAssembly dependencyType="install" codebase="Plugins\Plugin.manifest" size="{plugin_size}" />
  </dependency>
  <file name="Tool.exe" size="{exe}" />
  <file name="Data\config#1.xml" size="{config}" />"#
    ));
    let app_size = publish(
        mirror,
        &format!("{version_dir}/Tool.exe.manifest"),
        app_manifest.as_bytes(),
    );

    let application = manifest(&format!(
        r#"  <deployment install="true" mapFileExtensions="true">
    <deploymentProvider codebase="{codebase}" />
  </deployment>
  <dependency>
    <dependentAssembly dependencyType="install" codebase="Application Files\Tool_1_0\Tool.exe.manifest" size="{app_size}" />
  </dependency>"#
    ));
    publish(mirror, "Tool.application", application.as_bytes());
    mirror.join("Tool.application")
}

fn mirror_url(mirror: &Path) -> String {
    Url::from_file_path(mirror.join("Tool.application"))
        .unwrap()
        .to_string()
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_mirror_layout_matches_deployment() {
    let temp = tempfile::tempdir().unwrap();
    let mirror = temp.path().join("mirror");
    let application = publish_deployment(&mirror, &mirror_url(&mirror));
    let dest = temp.path().join("unpack");

    let report = download_application(&application, &FetchConfig::new(&dest)).unwrap();

    let version_dir = dest.join("Application Files").join("Tool_1_0");
    assert_eq!(fs::read(version_dir.join("Tool.exe")).unwrap(), b"MZ tool binary");
    assert_eq!(
        fs::read(version_dir.join("Data").join("config#1.xml")).unwrap(),
        b"<config/>"
    );
    assert_eq!(
        fs::read(version_dir.join("Plugins").join("Plugin.dll")).unwrap(),
        b"plugin"
    );
    assert!(version_dir.join("Tool.exe.manifest").is_file());
    assert!(version_dir.join("Plugins").join("Plugin.manifest").is_file());

    assert_eq!(report.manifests, 3);
    assert_eq!(report.fetched, 5);
    assert_eq!(report.skipped, 0);
}

#[test]
fn test_second_run_skips_everything() {
    let temp = tempfile::tempdir().unwrap();
    let mirror = temp.path().join("mirror");
    let application = publish_deployment(&mirror, &mirror_url(&mirror));
    let config = FetchConfig::new(temp.path().join("unpack"));

    download_application(&application, &config).unwrap();
    let report = download_application(&application, &config).unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.skipped, 5);
    assert_eq!(report.bytes_downloaded, 0);
}

#[test]
fn test_wrong_size_file_is_refetched() {
    let temp = tempfile::tempdir().unwrap();
    let mirror = temp.path().join("mirror");
    let application = publish_deployment(&mirror, &mirror_url(&mirror));
    let dest = temp.path().join("unpack");
    let config = FetchConfig::new(&dest);

    download_application(&application, &config).unwrap();
    let exe = dest.join("Application Files").join("Tool_1_0").join("Tool.exe");
    fs::write(&exe, b"truncated").unwrap();

    let report = download_application(&application, &config).unwrap();

    assert_eq!(report.fetched, 1);
    assert_eq!(fs::read(&exe).unwrap(), b"MZ tool binary");
}

#[test]
fn test_relative_codebase_resolves_next_to_application() {
    let temp = tempfile::tempdir().unwrap();
    let mirror = temp.path().join("mirror");
    let application = publish_deployment(&mirror, "Tool.application");
    let dest = temp.path().join("unpack");

    let report = download_application(&application, &FetchConfig::new(&dest)).unwrap();

    assert_eq!(report.fetched, 5);
    assert!(dest
        .join("Application Files")
        .join("Tool_1_0")
        .join("Tool.exe")
        .is_file());
}

#[test]
fn test_missing_remote_file_aborts() {
    let temp = tempfile::tempdir().unwrap();
    let mirror = temp.path().join("mirror");
    let application = publish_deployment(&mirror, &mirror_url(&mirror));
    fs::remove_file(mirror.join("Application Files/Tool_1_0/Tool.exe.deploy")).unwrap();

    let err = download_application(&application, &FetchConfig::new(temp.path().join("unpack")))
        .unwrap_err();

    assert!(matches!(err, ClickoutError::Transfer(_)));
}

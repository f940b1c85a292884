//! Single-pass manifest parser built on a namespace-aware XML reader.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use super::{DependencyEntry, FileEntry, ManifestDocument, ManifestEntry, ASM_V2_NAMESPACE};
use crate::error::{ClickoutError, Result};
use crate::path::split_native;

/// Only dependencies of this type are deployed.
const INSTALL_DEPENDENCY: &str = "install";

/// Root child whose descendants are currently being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    Dependency,
    Deployment,
}

/// Parse a manifest document.
///
/// `origin` is only used to label errors.
pub fn parse_manifest(xml: &str, origin: &Path) -> Result<ManifestDocument> {
    let mut reader = NsReader::from_str(xml.trim_start_matches('\u{feff}'));
    let mut builder = Builder::new(origin);

    loop {
        let (in_asm_v2, event) = match reader.read_resolved_event() {
            Ok((ns, event)) => (is_asm_v2(&ns), event),
            Err(e) => {
                return Err(ClickoutError::manifest(
                    origin,
                    format!("malformed XML: {}", e),
                ))
            }
        };

        match event {
            Event::Start(e) => builder.element(&e, in_asm_v2, true)?,
            Event::Empty(e) => builder.element(&e, in_asm_v2, false)?,
            Event::End(_) => builder.leave(),
            Event::Eof => break,
            _ => {}
        }
    }

    builder.finish()
}

fn is_asm_v2(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == ASM_V2_NAMESPACE.as_bytes())
}

/// Accumulates entries while tracking where in the tree the reader is.
struct Builder<'a> {
    origin: &'a Path,
    document: ManifestDocument,
    /// Number of currently open elements.
    depth: usize,
    section: Section,
    seen_root: bool,
}

impl<'a> Builder<'a> {
    fn new(origin: &'a Path) -> Self {
        Self {
            origin,
            document: ManifestDocument::default(),
            depth: 0,
            section: Section::Other,
            seen_root: false,
        }
    }

    fn element(&mut self, e: &BytesStart<'_>, in_asm_v2: bool, opens: bool) -> Result<()> {
        let local = e.local_name();
        match self.depth {
            0 => self.seen_root = true,
            1 => {
                self.section = Section::Other;
                if in_asm_v2 {
                    match local.as_ref() {
                        b"dependency" => self.section = Section::Dependency,
                        b"deployment" => self.section = Section::Deployment,
                        b"file" => {
                            let entry = self.file_entry(e)?;
                            self.document.entries.push(ManifestEntry::File(entry));
                        }
                        _ => {}
                    }
                }
            }
            2 if in_asm_v2 => match (self.section, local.as_ref()) {
                (Section::Dependency, b"dependentAssembly") => {
                    if let Some(entry) = self.dependency_entry(e)? {
                        self.document.entries.push(ManifestEntry::Dependency(entry));
                    }
                }
                (Section::Deployment, b"deploymentProvider") => {
                    self.document.deployment_codebase =
                        self.attribute(e, "deploymentProvider", "codebase")?;
                }
                _ => {}
            },
            _ => {}
        }

        if opens {
            self.depth += 1;
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth <= 1 {
            self.section = Section::Other;
        }
    }

    fn finish(self) -> Result<ManifestDocument> {
        if !self.seen_root {
            return Err(ClickoutError::manifest(
                self.origin,
                "document has no root element",
            ));
        }
        Ok(self.document)
    }

    fn dependency_entry(&self, e: &BytesStart<'_>) -> Result<Option<DependencyEntry>> {
        const ELEMENT: &str = "dependentAssembly";

        let dependency_type = self.attribute(e, ELEMENT, "dependencyType")?;
        if dependency_type.as_deref() != Some(INSTALL_DEPENDENCY) {
            return Ok(None);
        }

        let codebase = self.relative_path(e, ELEMENT, "codebase")?;
        let size = self.size(e, ELEMENT)?;
        Ok(Some(DependencyEntry { codebase, size }))
    }

    fn file_entry(&self, e: &BytesStart<'_>) -> Result<FileEntry> {
        const ELEMENT: &str = "file";

        let name = self.relative_path(e, ELEMENT, "name")?;
        let size = self.size(e, ELEMENT)?;
        Ok(FileEntry { name, size })
    }

    fn attribute(
        &self,
        e: &BytesStart<'_>,
        element: &'static str,
        name: &str,
    ) -> Result<Option<String>> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| {
                ClickoutError::manifest(
                    self.origin,
                    format!("invalid attribute on <{}>: {}", element, err),
                )
            })?;
            if attr.key.local_name().as_ref() == name.as_bytes() {
                let value = attr.unescape_value().map_err(|err| {
                    ClickoutError::manifest(
                        self.origin,
                        format!("invalid {} attribute on <{}>: {}", name, element, err),
                    )
                })?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    /// Read a required path attribute and make sure it stays below the
    /// destination once joined onto it.
    fn relative_path(
        &self,
        e: &BytesStart<'_>,
        element: &'static str,
        name: &str,
    ) -> Result<String> {
        let value = self.attribute(e, element, name)?.ok_or_else(|| {
            ClickoutError::manifest(
                self.origin,
                format!("<{}> is missing the {} attribute", element, name),
            )
        })?;

        check_relative(&value).map_err(|reason| {
            ClickoutError::manifest(
                self.origin,
                format!("{} {:?} on <{}> {}", name, value, element, reason),
            )
        })?;
        Ok(value)
    }

    fn size(&self, e: &BytesStart<'_>, element: &'static str) -> Result<u64> {
        match self.attribute(e, element, "size")? {
            None => Err(ClickoutError::size(element, None, None)),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|err| ClickoutError::size(element, Some(&value), Some(err))),
        }
    }
}

/// Reject paths that are empty, rooted, or climb out of their base.
fn check_relative(native_path: &str) -> std::result::Result<(), &'static str> {
    let parts = split_native(native_path);
    let Some(first) = parts.first() else {
        return Err("is empty");
    };
    if native_path.starts_with(['/', '\\']) || first.contains(':') {
        return Err("is not a relative path");
    }
    // Drive-relative names and alternate data streams.
    if parts.iter().any(|part| part.contains(':')) {
        return Err("contains a drive or stream separator");
    }
    if parts.iter().any(|part| *part == "..") {
        return Err("escapes the deployment directory");
    }
    Ok(())
}

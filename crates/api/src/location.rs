//! Location model for resolved resources.

use std::path::{Path, PathBuf};

/// Where resolved bytes physically live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ByteSource {
    /// A file at `rel` under a directory root.
    File { root: PathBuf, rel: String },
    /// An entry inside a jar archive.
    ArchiveEntry { archive: PathBuf, entry: String },
}

impl ByteSource {
    pub fn file(root: impl Into<PathBuf>, rel: impl Into<String>) -> Self {
        ByteSource::File {
            root: root.into(),
            rel: rel.into(),
        }
    }

    pub fn archive_entry(archive: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        ByteSource::ArchiveEntry {
            archive: archive.into(),
            entry: entry.into(),
        }
    }

    /// The directory or archive containing the resource.
    pub fn container(&self) -> &Path {
        match self {
            ByteSource::File { root, .. } => root,
            ByteSource::ArchiveEntry { archive, .. } => archive,
        }
    }

    /// The resource name relative to its container.
    pub fn member(&self) -> &str {
        match self {
            ByteSource::File { rel, .. } => rel,
            ByteSource::ArchiveEntry { entry, .. } => entry,
        }
    }
}

/// Which step of the resolution chain produced a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The override root at this position in the configured list.
    Override(usize),
    /// The resolver's own base root.
    SelfBase,
    /// The delegate chain.
    Delegate,
}

/// A located byte source plus its provenance. Transient: used while a
/// resolution is in flight, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub source: ByteSource,
    pub origin: Origin,
}

impl ResolvedLocation {
    pub fn new(source: ByteSource, origin: Origin) -> Self {
        Self { source, origin }
    }
}

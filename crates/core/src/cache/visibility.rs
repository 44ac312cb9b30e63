//! Suffix visibility declarations.
//!
//! A root or archive opts into shadowed lookup by listing suffixes in a
//! plain-text marker at [`VISIBILITY_MARKER`], one per line; blank lines and
//! `#` comments are ignored. Answers are memoized per resolver instance and
//! any read failure memoizes as "not declared"; a missing or unreadable
//! marker must never break a hosting build.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use zip::ZipArchive;

/// Conventional marker path inside a root or archive.
pub const VISIBILITY_MARKER: &str = "META-INF/shadeload";

/// Reserved runtime namespaces. Names under these are always delegated,
/// never intercepted, regardless of what any root declares.
pub const RESERVED_PREFIXES: [&str; 2] = ["java/", "sun/"];

/// Instance-local memo of `(root, suffix)` to `declared`.
#[derive(Default)]
pub struct SuffixDeclarations {
    memo: DashMap<(PathBuf, String), bool>,
}

impl SuffixDeclarations {
    pub fn new() -> Self {
        Self {
            memo: DashMap::new(),
        }
    }

    /// Does the directory root declare `suffix`?
    pub fn dir_declares(&self, root: &Path, suffix: &str) -> bool {
        self.memoized(root, suffix, || read_dir_marker(root, suffix))
    }

    /// Does the archive declare `suffix`?
    pub fn archive_declares(&self, archive: &Path, suffix: &str) -> bool {
        self.memoized(archive, suffix, || read_archive_marker(archive, suffix))
    }

    fn memoized(&self, path: &Path, suffix: &str, probe: impl FnOnce() -> bool) -> bool {
        let key = (path.to_path_buf(), suffix.to_string());
        if let Some(known) = self.memo.get(&key) {
            return *known;
        }
        let declared = probe();
        self.memo.insert(key, declared);
        declared
    }
}

fn read_dir_marker(root: &Path, suffix: &str) -> bool {
    match File::open(root.join(VISIBILITY_MARKER)) {
        Ok(file) => marker_declares(BufReader::new(file), suffix),
        Err(_) => false,
    }
}

fn read_archive_marker(archive: &Path, suffix: &str) -> bool {
    let Ok(file) = File::open(archive) else {
        return false;
    };
    let Ok(mut jar) = ZipArchive::new(file) else {
        return false;
    };
    let Ok(mut entry) = jar.by_name(VISIBILITY_MARKER) else {
        return false;
    };
    let mut text = String::new();
    if entry.read_to_string(&mut text).is_err() {
        return false;
    }
    marker_declares(text.as_bytes(), suffix)
}

fn marker_declares(reader: impl BufRead, suffix: &str) -> bool {
    for line in reader.lines() {
        let Ok(line) = line else {
            return false;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == suffix {
            return true;
        }
    }
    false
}

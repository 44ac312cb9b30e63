//! Root probing: maps a (root, name) pair to a located byte source.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use shadeload_api::ByteSource;
use zip::ZipArchive;

use crate::cache::listing::{ListingCache, LocalListings};

/// Probe one root for `alt` (the decorated form) and then `name`.
///
/// The decorated form wins because it is the real artifact; the plain form
/// is a compatibility shim. A root that is neither a directory nor a
/// readable file yields nothing.
pub fn probe_root(
    cache: &ListingCache,
    local: &LocalListings,
    root: &Path,
    name: &str,
    alt: Option<&str>,
) -> Option<ByteSource> {
    if root.is_dir() {
        if let Some(alt) = alt {
            if let Some(found) = probe_dir(root, alt) {
                return Some(found);
            }
        }
        return probe_dir(root, name);
    }

    if !root.is_file() {
        return None;
    }
    let archive = canonical_or_absolute(root);
    let listing = cache.listing_for(local, &archive);
    if let Some(alt) = alt {
        if listing.contains(alt) {
            return Some(ByteSource::archive_entry(archive, alt));
        }
    }
    if listing.contains(name) {
        return Some(ByteSource::archive_entry(archive, name));
    }
    None
}

fn probe_dir(root: &Path, rel: &str) -> Option<ByteSource> {
    if root.join(rel).is_file() {
        Some(ByteSource::file(root, rel))
    } else {
        None
    }
}

/// Canonical path when the file system cooperates, absolute otherwise.
pub fn canonical_or_absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Read the bytes behind a located source.
pub fn read_bytes(source: &ByteSource) -> io::Result<Vec<u8>> {
    match source {
        ByteSource::File { root, rel } => std::fs::read(root.join(rel)),
        ByteSource::ArchiveEntry { archive, entry } => {
            let file = File::open(archive)?;
            let mut jar = ZipArchive::new(file).map_err(io::Error::other)?;
            let mut member = jar.by_name(entry).map_err(io::Error::other)?;
            let mut bytes = Vec::new();
            member.read_to_end(&mut bytes)?;
            Ok(bytes)
        }
    }
}

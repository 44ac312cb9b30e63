//! Process-wide archive listing cache.
//!
//! Scanning a jar for its member names is the dominant cost of resolution,
//! so each distinct archive is scanned at most once per process: a global
//! table maps the archive path to a weak handle on its listing, while every
//! resolver instance that asked keeps a strong handle in its own local map.
//! The member set therefore stays alive exactly as long as at least one
//! interested resolver instance does, and is reclaimed with the last one.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Strong handles held by one resolver instance. Dropping the instance drops
/// the map and with it the instance's claim on every listing.
pub type LocalListings = DashMap<PathBuf, Arc<ArchiveListing>>;

/// Immutable member-name set of one scanned archive.
#[derive(Debug)]
pub struct ArchiveListing {
    path: PathBuf,
    members: HashSet<String>,
}

impl ArchiveListing {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

static PROCESS_LISTINGS: Lazy<Arc<ListingCache>> = Lazy::new(|| Arc::new(ListingCache::new()));

/// The global path-to-listing table. Holds only weak handles; strong
/// ownership lives in the [`LocalListings`] of resolver instances.
pub struct ListingCache {
    by_path: Mutex<HashMap<PathBuf, Weak<ArchiveListing>>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self {
            by_path: Mutex::new(HashMap::new()),
        }
    }

    /// The cache shared by every resolver instance in this process. Lives
    /// until process exit.
    pub fn process() -> Arc<ListingCache> {
        PROCESS_LISTINGS.clone()
    }

    /// The listing for the archive at `path`, scanned at most once
    /// process-wide. Adopting the result into `local` is what keeps it
    /// alive.
    pub fn listing_for(&self, local: &LocalListings, path: &Path) -> Arc<ArchiveListing> {
        if let Some(listing) = local.get(path) {
            return listing.value().clone();
        }

        let mut by_path = self.by_path.lock().unwrap();
        if let Some(listing) = by_path.get(path).and_then(Weak::upgrade) {
            local.insert(path.to_path_buf(), listing.clone());
            return listing;
        }

        let listing = Arc::new(ArchiveListing {
            path: path.to_path_buf(),
            members: scan_members(path),
        });
        by_path.retain(|_, weak| weak.strong_count() > 0);
        by_path.insert(path.to_path_buf(), Arc::downgrade(&listing));
        local.insert(path.to_path_buf(), listing.clone());
        listing
    }

    /// Whether a live listing currently exists for `path`.
    pub fn is_live(&self, path: &Path) -> bool {
        self.by_path
            .lock()
            .unwrap()
            .get(path)
            .and_then(Weak::upgrade)
            .is_some()
    }
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Enumerate the non-directory entries of the archive. A corrupt or
/// unreadable archive behaves as if it contained nothing; an engine that
/// sits underneath a build must not abort it over a bad jar.
fn scan_members(path: &Path) -> HashSet<String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("cannot open archive {:?}: {}", path, err);
            return HashSet::new();
        }
    };
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(err) => {
            warn!("cannot read archive {:?}: {}", path, err);
            return HashSet::new();
        }
    };

    let mut members = HashSet::with_capacity(archive.len());
    for index in 0..archive.len() {
        match archive.by_index(index) {
            Ok(entry) if entry.is_dir() => {}
            Ok(entry) => {
                members.insert(entry.name().to_string());
            }
            // A bad entry hides only itself.
            Err(_) => {}
        }
    }
    debug!("scanned {:?}: {} members", path, members.len());
    members
}

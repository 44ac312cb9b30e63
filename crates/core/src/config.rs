//! Override path configuration.
//!
//! An override specification is a single string in the platform's path-list
//! convention (`:` on Unix, `;` on Windows). Entries are directories, single
//! jar files, or a directory suffixed with `/*` meaning "every jar directly
//! inside". Wildcards are expanded eagerly at configuration time, not at
//! lookup time; a missing or unreadable wildcard directory expands to
//! nothing.

use std::path::{Path, PathBuf};

#[cfg(windows)]
const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: char = ':';

/// Ordered override roots parsed from a specification string. Ordering is
/// significant: the first root with a match wins.
#[derive(Debug, Clone, Default)]
pub struct OverridePaths {
    roots: Vec<PathBuf>,
}

impl OverridePaths {
    pub fn parse(spec: &str) -> Self {
        let mut roots = Vec::new();
        for part in spec.split(PATH_LIST_SEPARATOR) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match strip_wildcard(part) {
                Some(dir) => roots.extend(jars_directly_inside(Path::new(dir))),
                None => roots.push(PathBuf::from(part)),
            }
        }
        Self { roots }
    }

    /// Read the override specification for `suffix` from the environment
    /// (`SHADELOAD_OVERRIDE_<SUFFIX>`). Absent or empty means no overrides.
    pub fn from_env(suffix: &str) -> Self {
        match std::env::var(env_key(suffix)) {
            Ok(spec) if !spec.trim().is_empty() => Self::parse(&spec),
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(PathBuf::as_path)
    }
}

pub(crate) fn env_key(suffix: &str) -> String {
    format!("SHADELOAD_OVERRIDE_{}", suffix.to_uppercase())
}

fn strip_wildcard(part: &str) -> Option<&str> {
    if let Some(dir) = part.strip_suffix("/*") {
        return Some(dir);
    }
    if cfg!(windows) {
        if let Some(dir) = part.strip_suffix("\\*") {
            return Some(dir);
        }
    }
    None
}

/// Non-recursive scan for jars, sorted by name so expansion order is
/// deterministic across platforms.
fn jars_directly_inside(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut jars: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_jar_extension(path))
        .collect();
    jars.sort();
    jars
}

fn has_jar_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("jar"))
}

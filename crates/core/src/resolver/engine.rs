//! The resolution engine: layered override/self/delegate lookup and unit
//! loading.
//!
//! One engine hides the contents of its own base root behind a suffix tag:
//! most members of that root are stored decorated (`foo/Bar.SCL.<suffix>`
//! instead of `foo/Bar.class`) so the host's ordinary lookup never sees
//! them, while this engine resolves the plain names back onto the decorated
//! bytes. An override path lets a developer shadow those hidden members with
//! locally built artifacts, and the delegate chain covers everything that is
//! not ours to intercept.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};
use url::Url;

use shadeload_api::{
    ByteSource, ConfigError, DefineError, Delegate, LoadError, NullDelegate, Origin,
    ResolvedLocation, UnitDefiner, UnitHandle,
};

use crate::cache::listing::{ListingCache, LocalListings};
use crate::cache::visibility::{RESERVED_PREFIXES, SuffixDeclarations, VISIBILITY_MARKER};
use crate::config::OverridePaths;
use crate::registry::ExclusiveRegistry;
use crate::resolver::locate;

/// Plain resource names with this extension get a decorated alternate.
pub const UNIT_EXTENSION: &str = ".class";
/// Infix separating a decorated name from its suffix tag.
pub const DECORATION_INFIX: &str = ".SCL.";
/// Synthetic root consulted as the loading path's last resort.
const SECONDARY_ROOT: &str = "secondaryLoading";

/// One resolver instance.
///
/// Immutable after construction except for the prepended-delegate list and
/// the two local caches, all of which grow monotonically. Safe to share
/// across threads; every operation is synchronous.
pub struct ResolutionEngine {
    suffix: String,
    self_base: PathBuf,
    overrides: OverridePaths,
    parent_exclusions: Vec<String>,
    exclusive_names: HashSet<String>,
    delegate: Arc<dyn Delegate>,
    prepended: RwLock<Vec<Arc<dyn Delegate>>>,
    definer: Arc<dyn UnitDefiner>,
    listings: Arc<ListingCache>,
    local_listings: LocalListings,
    declarations: SuffixDeclarations,
    exclusives: Arc<ExclusiveRegistry>,
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("suffix", &self.suffix)
            .field("self_base", &self.self_base)
            .field("override_roots", &self.overrides.roots())
            .field("exclusive_names", &self.exclusive_names)
            .finish_non_exhaustive()
    }
}

impl ResolutionEngine {
    pub fn builder(suffix: impl Into<String>) -> EngineBuilder {
        EngineBuilder::new(suffix)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn self_base(&self) -> &Path {
        &self.self_base
    }

    pub fn override_roots(&self) -> &[PathBuf] {
        self.overrides.roots()
    }

    /// Register an extra delegate consulted ahead of the formal one during
    /// unit loading. The formal delegate and already-known delegates (by
    /// identity) are ignored.
    pub fn prepend_delegate(&self, delegate: Arc<dyn Delegate>) {
        if Arc::ptr_eq(&delegate, &self.delegate) {
            return;
        }
        let mut prepended = self.prepended.write().unwrap();
        if prepended.iter().any(|known| Arc::ptr_eq(known, &delegate)) {
            return;
        }
        prepended.push(delegate);
    }

    /// The first location for `name`, in precedence order: override roots,
    /// then (with overrides configured) the delegate minus our own hidden
    /// namespace, or (without overrides) the self base followed by the
    /// delegate's decorated and plain lookups.
    pub fn resource(&self, name: &str) -> Option<ResolvedLocation> {
        self.resolve(name, false)
    }

    /// Every location for `name`: one match per override root, the self
    /// base only when no overrides are configured, plus each delegate
    /// result whose container declares the active suffix, for the plain and
    /// the decorated name.
    pub fn resources(&self, name: &str) -> Vec<ResolvedLocation> {
        let alt = self.decorated(name);
        let alt = alt.as_deref();
        let mut found = Vec::new();

        for (index, root) in self.overrides.iter().enumerate() {
            if let Some(source) = self.probe(root, name, alt) {
                found.push(ResolvedLocation::new(source, Origin::Override(index)));
            }
        }
        if self.overrides.is_empty() {
            if let Some(source) = self.probe(&self.self_base, name, alt) {
                found.push(ResolvedLocation::new(source, Origin::SelfBase));
            }
        }

        for source in self.delegate.resources(name) {
            if self.declares_active_suffix(&source) {
                found.push(ResolvedLocation::new(source, Origin::Delegate));
            }
        }
        if let Some(alt) = alt {
            for source in self.delegate.resources(alt) {
                if self.declares_active_suffix(&source) {
                    found.push(ResolvedLocation::new(source, Origin::Delegate));
                }
            }
        }
        found
    }

    /// Materialize the unit named `name` (dotted form).
    ///
    /// Precedence: already-defined units, the exclusive registry, local
    /// shadow resolution, prepended delegates, the formal delegate, and one
    /// secondary-root retry. Duplicate-definition races are recovered by
    /// adopting whichever unit already exists.
    pub fn load_unit(&self, name: &str, link: bool) -> Result<UnitHandle, LoadError> {
        if let Some(existing) = self.definer.already_defined(name) {
            return Ok(existing);
        }
        let exclusive = self.exclusive_names.contains(name);
        if exclusive {
            if let Some(winner) = self.exclusives.winner(name) {
                return Ok(winner);
            }
        }

        let unit_path = unit_resource_name(name);
        let mut location = self.resolve(&unit_path, true);

        if location.is_none() && !self.excluded_from_parent(&unit_path) {
            match self.load_via_delegates(name) {
                Ok(unit) => return Ok(unit),
                Err(LoadError::NotFound(missing)) => {
                    debug!("delegates cannot load `{}`, trying secondary root", name);
                    location = self.resolve(&self.secondary_name(name), true);
                    if location.is_none() {
                        return Err(LoadError::NotFound(missing));
                    }
                }
                Err(other) => return Err(other),
            }
        }

        let Some(location) = location else {
            return Err(LoadError::NotFound(name.to_string()));
        };

        let bytes = match locate::read_bytes(&location.source) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed reading `{}` from {:?}: {}", name, location.source, err);
                return Err(LoadError::NotFound(name.to_string()));
            }
        };

        let unit = match self.definer.define(name, &bytes) {
            Ok(unit) => unit,
            Err(conflict @ DefineError::AlreadyDefined(_)) => {
                if exclusive {
                    if let Some(winner) = self.exclusives.winner(name) {
                        return Ok(winner);
                    }
                }
                match self.definer.already_defined(name) {
                    Some(existing) => existing,
                    None => return Err(LoadError::Definition(conflict)),
                }
            }
            Err(rejected) => return Err(LoadError::Definition(rejected)),
        };

        let unit = if exclusive {
            self.exclusives.publish_if_absent(name, unit)
        } else {
            unit
        };

        if link {
            self.definer.link(&unit).map_err(LoadError::Definition)?;
        }
        Ok(unit)
    }

    /// Is this delegate-reported location part of our shadow namespace for
    /// `name`? True iff the name is not reserved and the location either
    /// sits in our own base or its container declares the active suffix.
    ///
    /// The instrumentation side uses this to decide which of the host's
    /// results actually belong to us.
    pub fn is_visible(&self, source: &ByteSource, name: &str) -> bool {
        if RESERVED_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
            return false;
        }
        self.in_own_base(source, name) || self.declares_active_suffix(source)
    }

    fn resolve(&self, name: &str, shadow_only_delegate: bool) -> Option<ResolvedLocation> {
        let alt = self.decorated(name);
        let alt = alt.as_deref();

        for (index, root) in self.overrides.iter().enumerate() {
            if let Some(source) = self.probe(root, name, alt) {
                return Some(ResolvedLocation::new(source, Origin::Override(index)));
            }
        }

        if !self.overrides.is_empty() {
            // With overrides configured our own base is never consulted:
            // the base root only launches, the overrides are the program.
            if shadow_only_delegate {
                return None;
            }
            if let Some(alt) = alt {
                if let Some(found) = self.delegate_skipping_self(alt) {
                    return Some(found);
                }
            }
            return self.delegate_skipping_self(name);
        }

        if let Some(source) = self.probe(&self.self_base, name, alt) {
            return Some(ResolvedLocation::new(source, Origin::SelfBase));
        }

        if let Some(alt) = alt {
            if let Some(source) = self.delegate.resource(alt) {
                if !shadow_only_delegate || self.is_visible(&source, alt) {
                    return Some(ResolvedLocation::new(source, Origin::Delegate));
                }
            }
        }
        if let Some(source) = self.delegate.resource(name) {
            if !shadow_only_delegate || self.is_visible(&source, name) {
                return Some(ResolvedLocation::new(source, Origin::Delegate));
            }
        }
        None
    }

    /// Delegate lookup that refuses results pointing back into our own
    /// shadow namespace; "overriding" a hidden member with our own hidden
    /// copy would defeat the override.
    fn delegate_skipping_self(&self, name: &str) -> Option<ResolvedLocation> {
        let candidate = self.delegate.resource(name)?;
        if !self.is_visible(&candidate, name) {
            return Some(ResolvedLocation::new(candidate, Origin::Delegate));
        }
        self.delegate
            .resources(name)
            .into_iter()
            .find(|source| !self.is_visible(source, name))
            .map(|source| ResolvedLocation::new(source, Origin::Delegate))
    }

    /// Prepended delegates first, their failures swallowed, then the formal
    /// delegate.
    fn load_via_delegates(&self, name: &str) -> Result<UnitHandle, LoadError> {
        let prepended = self.prepended.read().unwrap().clone();
        for delegate in prepended {
            if let Ok(unit) = delegate.load_unit(name) {
                return Ok(unit);
            }
        }
        self.delegate.load_unit(name)
    }

    fn probe(&self, root: &Path, name: &str, alt: Option<&str>) -> Option<ByteSource> {
        locate::probe_root(&self.listings, &self.local_listings, root, name, alt)
    }

    fn decorated(&self, name: &str) -> Option<String> {
        name.strip_suffix(UNIT_EXTENSION)
            .map(|stem| format!("{stem}{DECORATION_INFIX}{}", self.suffix))
    }

    fn secondary_name(&self, unit_name: &str) -> String {
        format!(
            "{SECONDARY_ROOT}{DECORATION_INFIX}{suffix}/{path}{DECORATION_INFIX}{suffix}",
            suffix = self.suffix,
            path = unit_name.replace('.', "/"),
        )
    }

    fn excluded_from_parent(&self, unit_path: &str) -> bool {
        self.parent_exclusions
            .iter()
            .any(|prefix| unit_path.starts_with(prefix.as_str()))
    }

    fn in_own_base(&self, source: &ByteSource, name: &str) -> bool {
        match source {
            ByteSource::File { root, rel } => root == &self.self_base && rel == name,
            ByteSource::ArchiveEntry { archive, entry } => {
                archive == &self.self_base && entry == name
            }
        }
    }

    fn declares_active_suffix(&self, source: &ByteSource) -> bool {
        match source {
            ByteSource::File { root, .. } => self.declarations.dir_declares(root, &self.suffix),
            ByteSource::ArchiveEntry { archive, .. } => {
                self.declarations.archive_declares(archive, &self.suffix)
            }
        }
    }
}

fn unit_resource_name(unit_name: &str) -> String {
    format!("{}{UNIT_EXTENSION}", unit_name.replace('.', "/"))
}

/// `foo.bar.` style exclusion prefixes arrive dotted; matching happens on
/// slashed resource paths.
fn normalize_exclusion(prefix: &str) -> String {
    let mut slashed = prefix.replace('.', "/");
    if !slashed.ends_with('/') {
        slashed.push('/');
    }
    slashed
}

/// Derive the engine's own root from the URL its marker resource was loaded
/// from: strip the known relative path, URL-decode the remainder, and unwrap
/// the `jar:file:...!/` and `file:` forms.
fn self_base_from_origin(origin: &str) -> Result<PathBuf, ConfigError> {
    let inconsistent = || ConfigError::SelfLocation(origin.to_string());

    let base = origin.strip_suffix(VISIBILITY_MARKER).ok_or_else(inconsistent)?;
    if base.is_empty() {
        return Err(inconsistent());
    }

    if let Some(inner) = base.strip_prefix("jar:").and_then(|rest| rest.strip_suffix("!/")) {
        return file_url_to_path(inner).ok_or_else(inconsistent);
    }
    if base.starts_with("file:") {
        return file_url_to_path(base.trim_end_matches('/')).ok_or_else(inconsistent);
    }
    Ok(PathBuf::from(base.trim_end_matches('/')))
}

fn file_url_to_path(url: &str) -> Option<PathBuf> {
    Url::parse(url).ok()?.to_file_path().ok()
}

/// Builder for [`ResolutionEngine`].
pub struct EngineBuilder {
    suffix: String,
    self_base: Option<PathBuf>,
    self_origin: Option<String>,
    override_spec: Option<String>,
    parent_exclusions: Vec<String>,
    exclusive_names: Vec<String>,
    delegate: Option<Arc<dyn Delegate>>,
    definer: Option<Arc<dyn UnitDefiner>>,
    listings: Option<Arc<ListingCache>>,
    exclusives: Option<Arc<ExclusiveRegistry>>,
}

impl EngineBuilder {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            self_base: None,
            self_origin: None,
            override_spec: None,
            parent_exclusions: Vec::new(),
            exclusive_names: Vec::new(),
            delegate: None,
            definer: None,
            listings: None,
            exclusives: None,
        }
    }

    /// The engine's own base root, explicitly.
    pub fn self_base(mut self, path: impl Into<PathBuf>) -> Self {
        self.self_base = Some(path.into());
        self
    }

    /// Discover the base root from the URL the engine's marker resource was
    /// loaded from. Ignored when an explicit base is set.
    pub fn self_origin(mut self, origin: impl Into<String>) -> Self {
        self.self_origin = Some(origin.into());
        self
    }

    /// Override specification string. When not set, the
    /// `SHADELOAD_OVERRIDE_<SUFFIX>` environment variable is consulted.
    pub fn override_spec(mut self, spec: impl Into<String>) -> Self {
        self.override_spec = Some(spec.into());
        self
    }

    /// A dotted prefix (`foo.bar.`) whose units are never asked of the
    /// delegate chain during loading.
    pub fn parent_exclusion(mut self, prefix: impl Into<String>) -> Self {
        self.parent_exclusions.push(prefix.into());
        self
    }

    /// A dotted unit name that must stay a process-wide singleton.
    pub fn exclusive_name(mut self, name: impl Into<String>) -> Self {
        self.exclusive_names.push(name.into());
        self
    }

    pub fn delegate(mut self, delegate: Arc<dyn Delegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    pub fn definer(mut self, definer: Arc<dyn UnitDefiner>) -> Self {
        self.definer = Some(definer);
        self
    }

    /// Listing cache to share; defaults to the process-wide one. Tests
    /// inject a fresh cache for isolation.
    pub fn listing_cache(mut self, cache: Arc<ListingCache>) -> Self {
        self.listings = Some(cache);
        self
    }

    /// Exclusive registry to share; defaults to the process-wide one.
    pub fn exclusive_registry(mut self, registry: Arc<ExclusiveRegistry>) -> Self {
        self.exclusives = Some(registry);
        self
    }

    pub fn build(self) -> Result<ResolutionEngine, ConfigError> {
        let definer = self.definer.ok_or(ConfigError::Missing("unit definer"))?;
        let delegate = self.delegate.unwrap_or_else(|| Arc::new(NullDelegate));

        let self_base = match (self.self_base, self.self_origin) {
            (Some(path), _) => path,
            (None, Some(origin)) => self_base_from_origin(&origin)?,
            (None, None) => std::env::current_exe()
                .map_err(|_| ConfigError::SelfLocation("current executable".to_string()))?,
        };
        let self_base = locate::canonical_or_absolute(&self_base);

        let overrides = match self.override_spec {
            Some(spec) => OverridePaths::parse(&spec),
            None => OverridePaths::from_env(&self.suffix),
        };

        Ok(ResolutionEngine {
            suffix: self.suffix,
            self_base,
            overrides,
            parent_exclusions: self
                .parent_exclusions
                .iter()
                .map(|prefix| normalize_exclusion(prefix))
                .collect(),
            exclusive_names: self.exclusive_names.into_iter().collect(),
            delegate,
            prepended: RwLock::new(Vec::new()),
            definer,
            listings: self.listings.unwrap_or_else(ListingCache::process),
            local_listings: LocalListings::new(),
            declarations: SuffixDeclarations::new(),
            exclusives: self.exclusives.unwrap_or_else(ExclusiveRegistry::process),
        })
    }
}

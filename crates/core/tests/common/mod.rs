#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use shadeload_core::api::{
    ByteSource, DefineError, Delegate, DefinedUnit, LoadError, UnitDefiner, UnitHandle,
};

/// Build a jar containing the given entries, plus a visibility marker
/// declaring `suffixes` when non-empty.
pub fn build_jar(path: &Path, entries: &[(&str, &[u8])], suffixes: &[&str]) {
    let file = File::create(path).unwrap();
    let mut jar = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (entry, bytes) in entries {
        jar.start_file(*entry, options).unwrap();
        jar.write_all(bytes).unwrap();
    }
    if !suffixes.is_empty() {
        jar.start_file("META-INF/shadeload", options).unwrap();
        jar.write_all(suffixes.join("\n").as_bytes()).unwrap();
    }
    jar.finish().unwrap();
}

/// Write `rel` under `root`, creating parent directories.
pub fn write_tree(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

/// Mark a directory root as declaring the given suffixes.
pub fn declare_suffixes(root: &Path, suffixes: &[&str]) {
    write_tree(root, "META-INF/shadeload", suffixes.join("\n").as_bytes());
}

pub struct TestUnit {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DefinedUnit for TestUnit {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Bytes a loaded unit was defined from.
pub fn unit_bytes(unit: &UnitHandle) -> Vec<u8> {
    unit.as_any().downcast_ref::<TestUnit>().unwrap().bytes.clone()
}

/// A definer that records definitions and refuses redefinition, the way a
/// real host-side definer does.
#[derive(Default)]
pub struct RecordingDefiner {
    defined: Mutex<HashMap<String, UnitHandle>>,
    pub define_calls: AtomicUsize,
    pub link_calls: AtomicUsize,
}

impl RecordingDefiner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defined_count(&self) -> usize {
        self.defined.lock().unwrap().len()
    }
}

impl UnitDefiner for RecordingDefiner {
    fn already_defined(&self, name: &str) -> Option<UnitHandle> {
        self.defined.lock().unwrap().get(name).cloned()
    }

    fn define(&self, name: &str, bytes: &[u8]) -> Result<UnitHandle, DefineError> {
        let mut defined = self.defined.lock().unwrap();
        if defined.contains_key(name) {
            return Err(DefineError::AlreadyDefined(name.to_string()));
        }
        self.define_calls.fetch_add(1, Ordering::SeqCst);
        let unit: UnitHandle = Arc::new(TestUnit {
            name: name.to_string(),
            bytes: bytes.to_vec(),
        });
        defined.insert(name.to_string(), unit.clone());
        Ok(unit)
    }

    fn link(&self, _unit: &UnitHandle) -> Result<(), DefineError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A delegate backed by fixed maps, with call counters.
#[derive(Default)]
pub struct MapDelegate {
    resources: HashMap<String, Vec<ByteSource>>,
    units: HashMap<String, UnitHandle>,
    pub resource_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
}

impl MapDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, name: &str, source: ByteSource) -> Self {
        self.resources.entry(name.to_string()).or_default().push(source);
        self
    }

    pub fn with_unit(mut self, name: &str, unit: UnitHandle) -> Self {
        self.units.insert(name.to_string(), unit);
        self
    }
}

impl Delegate for MapDelegate {
    fn resource(&self, name: &str) -> Option<ByteSource> {
        self.resource_calls.fetch_add(1, Ordering::SeqCst);
        self.resources.get(name).and_then(|sources| sources.first()).cloned()
    }

    fn resources(&self, name: &str) -> Vec<ByteSource> {
        self.resources.get(name).cloned().unwrap_or_default()
    }

    fn load_unit(&self, name: &str) -> Result<UnitHandle, LoadError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}

//! Process-wide single-definition registry.
//!
//! Independent resolver instances (one per isolated container, say) may race
//! to define the same must-be-a-singleton unit. Defining it twice yields two
//! incompatible identities even when the bytes are identical, so the
//! registry deduplicates after the fact: the first successful publish wins
//! and every later racer discards its own definition and adopts the winner.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use shadeload_api::UnitHandle;

static PROCESS_REGISTRY: Lazy<Arc<ExclusiveRegistry>> =
    Lazy::new(|| Arc::new(ExclusiveRegistry::new()));

pub struct ExclusiveRegistry {
    winners: Mutex<HashMap<String, UnitHandle>>,
}

impl ExclusiveRegistry {
    pub fn new() -> Self {
        Self {
            winners: Mutex::new(HashMap::new()),
        }
    }

    /// The registry shared by every resolver instance in this process.
    /// Lives until process exit.
    pub fn process() -> Arc<ExclusiveRegistry> {
        PROCESS_REGISTRY.clone()
    }

    /// The published winner for `name`, if any.
    pub fn winner(&self, name: &str) -> Option<UnitHandle> {
        self.winners.lock().unwrap().get(name).cloned()
    }

    /// Publish `unit` for `name` unless a winner already exists, and return
    /// the unit every caller must use from now on.
    pub fn publish_if_absent(&self, name: &str, unit: UnitHandle) -> UnitHandle {
        self.winners
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(unit)
            .clone()
    }
}

impl Default for ExclusiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! The host's bytes-to-unit boundary.

use std::any::Any;
use std::sync::Arc;

use crate::error::DefineError;

/// A successfully defined loadable unit.
///
/// Handle identity is unit identity: two callers hold "the same unit"
/// exactly when their handles point at the same allocation.
pub trait DefinedUnit: Send + Sync {
    /// The dotted unit name this handle was defined under.
    fn unit_name(&self) -> &str;

    /// Host-side downcast hook.
    fn as_any(&self) -> &dyn Any;
}

pub type UnitHandle = Arc<dyn DefinedUnit>;

/// Turns resolved bytes into defined units.
///
/// One definer belongs to one resolver instance; cross-instance
/// single-definition guarantees are the engine's job, not the definer's.
pub trait UnitDefiner: Send + Sync {
    /// A unit this definer has already produced for `name`, if any.
    fn already_defined(&self, name: &str) -> Option<UnitHandle>;

    /// Define `name` from `bytes`. A second definition of a name this
    /// definer already holds reports [`DefineError::AlreadyDefined`].
    fn define(&self, name: &str, bytes: &[u8]) -> Result<UnitHandle, DefineError>;

    /// Link the unit after definition. Only called when the loading entry
    /// point asked for it.
    fn link(&self, unit: &UnitHandle) -> Result<(), DefineError> {
        let _ = unit;
        Ok(())
    }
}

//! The fallback chain the engine consults after its local roots.

use crate::error::LoadError;
use crate::location::ByteSource;
use crate::UnitHandle;

/// A fallback resolver consulted after override roots and the self base are
/// exhausted.
///
/// Implementations wrap whatever lookup the host already has: a parent
/// engine, a classpath walker, another container's resolver. The engine
/// preserves the delegate's own enumeration order and applies its visibility
/// filter on top; delegates report locations as-is.
pub trait Delegate: Send + Sync {
    /// The first matching location for `name`, if any.
    fn resource(&self, name: &str) -> Option<ByteSource>;

    /// Every matching location for `name`, in the delegate's own order.
    fn resources(&self, name: &str) -> Vec<ByteSource>;

    /// Materialize the unit `name` (dotted form) through the host's own
    /// loading path.
    fn load_unit(&self, name: &str) -> Result<UnitHandle, LoadError>;
}

/// Delegate for embeddings without a fallback chain.
pub struct NullDelegate;

impl Delegate for NullDelegate {
    fn resource(&self, _name: &str) -> Option<ByteSource> {
        None
    }

    fn resources(&self, _name: &str) -> Vec<ByteSource> {
        Vec::new()
    }

    fn load_unit(&self, name: &str) -> Result<UnitHandle, LoadError> {
        Err(LoadError::NotFound(name.to_string()))
    }
}

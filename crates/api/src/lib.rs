//! Boundary surface of the shadeload resolution engine.
//!
//! This crate defines the types that cross between the engine and its host:
//! the location model for resolved byte sources, the delegate and definer
//! traits the host implements, and the error taxonomy. It deliberately pulls
//! in nothing beyond `thiserror`; all I/O lives in `shadeload-core`.

pub mod delegate;
pub mod definer;
pub mod error;
pub mod location;

pub use delegate::{Delegate, NullDelegate};
pub use definer::{DefinedUnit, UnitDefiner, UnitHandle};
pub use error::{ConfigError, DefineError, LoadError};
pub use location::{ByteSource, Origin, ResolvedLocation};

//! # devmap Device Library
//!
//! JSON loader, bundled defaults and a versioned registry for the
//! [`DeviceLibrary`] catalog used by `devmap-core`.
//!
//! ## Overview
//!
//! A library on disk is one directory:
//!
//! ```text
//!   my-library/
//!   ├── generic_device.json     array of generic devices
//!   └── devices/
//!       ├── arduino_uno.json    one actual device per file
//!       ├── bme280.json
//!       └── ...
//! ```
//!
//! Loading runs in two passes. Generic devices are registered first so that
//! the compatibility entries of actual devices can refer to actions,
//! conditions, values and parameters by name:
//!
//! ```text
//!   generic_device.json ──► GenericDoc ──► GenericDevice ──┐
//!                                                          ├──► LibraryBuilder ──► DeviceLibrary
//!   devices/*.json ───────► DeviceDoc ──► ActualDevice ────┘
//!                              │
//!                              └── names resolved against the generics above
//! ```
//!
//! ## Constraint Documents
//!
//! | JSON | Constraint |
//! |------|------------|
//! | `[]` | none |
//! | `{"min": 0, "max": 100, "unit": "PERCENT"}` | numeric |
//! | `[{"min": ..}, {"min": ..}]` | numeric, one range per unit |
//! | `["red", "green"]` | categorical |
//! | `[1, 2, 4]` | integer categorical |
//! | `[{"key": "Fast", "value": 2}]` | string-integer categorical |
//!
//! Bounds may be the sentinels `MIN_DOUBLE`, `MAX_DOUBLE`, `MIN_INTEGER` and
//! `MAX_INTEGER`.
//!
//! ## Load-Time Rules
//!
//! Any violation fails the whole load:
//!
//! - a CONTROLLER must declare `pio_boardid` and `wiring_method`
//! - every referenced generic device, action, condition, value and parameter
//!   must exist
//! - connections may only list declared ports (checked by the core builder)
//!
//! ## Example
//!
//! ```rust
//! use devmap_library::{bundled, LibraryRegistry};
//!
//! let library = bundled()?;
//! assert!(library.find_generic("LED").is_some());
//!
//! let registry = LibraryRegistry::new();
//! registry.load_defaults()?;
//! assert!(registry.get_latest("default").is_ok());
//! # Ok::<(), devmap_library::LibraryError>(())
//! ```

#![deny(unsafe_code)]

use devmap_core::{CatalogError, ConstraintError};

pub mod bundled;
pub mod document;
pub mod loader;
pub mod registry;

pub use bundled::bundled;
pub use loader::{load_dir, load_str};
pub use registry::LibraryRegistry;

/// Result type for library loading
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Library loading and registry errors
#[derive(Debug, Clone, PartialEq, thiserror_no_std::Error)]
pub enum LibraryError {
    /// Malformed JSON or a value of the wrong shape
    #[error("Failed to parse {document}: {reason}")]
    Parse {
        /// File name or document label
        document: String,
        /// Parser message
        reason: String,
    },

    /// Required field absent for this kind of device
    #[error("Device {device} is missing field '{field}'")]
    MissingField {
        /// Device id
        device: String,
        /// Field name
        field: &'static str,
    },

    /// Name that does not resolve against the generic devices
    #[error("Device {device} refers to unknown {kind} '{name}'")]
    UnknownReference {
        /// Device id
        device: String,
        /// "generic device", "action", "condition", "value" or "parameter"
        kind: &'static str,
        /// Unresolved name
        name: String,
    },

    /// Structural rule enforced by the catalog builder
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Range with min above max or similar
    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    /// Reading the library from disk failed
    #[error("Cannot read {path}: {reason}")]
    Io {
        /// Path that failed
        path: String,
        /// OS message
        reason: String,
    },

    /// No library registered under that name or version
    #[error("Library not found: {0}")]
    NotFound(String),

    /// Name and version already registered
    #[error("Library {0} already registered")]
    Duplicate(String),

    /// A registry lock was poisoned by a panicking writer
    #[error("Registry lock poisoned")]
    Poisoned,
}

/// Crate version, used as the version of the bundled library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

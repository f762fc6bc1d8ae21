//! Error Types for Catalog, Project and Connection Operations
//!
//! ## Design
//!
//! Incompatibility between a project device and a candidate part is not an error
//! here. It is an expected, frequent outcome and is reported as a
//! [`DeviceMappingResult`](crate::mapping::DeviceMappingResult) or a
//! [`ProjectMappingResult`](crate::assignment::ProjectMappingResult) value.
//!
//! The enums below cover the operations a caller asked for and which could not
//! be carried out:
//!
//! ### Constraint algebra
//! - `ConstraintError`: union/intersect of unlike kinds, malformed ranges
//!
//! ### Catalog construction
//! - `CatalogError`: duplicate ids, dangling port references
//!
//! ### Project edits
//! - `ProjectError`: unknown slots, alias chains, bad property values
//!
//! ### Connection commits
//! - `ConnectionError`: unbound devices, unknown or incompatible connections,
//!   pins already claimed by another slot
//!
//! Every failing operation leaves the state it was called on untouched.
//!
//! ```rust
//! use devmap_core::{Constraint, ConstraintError, Unit};
//!
//! let range = Constraint::numeric(0.0, 100.0, Unit::Percent).unwrap();
//! let colors = Constraint::categorical(["red", "green"]);
//! match range.union(&colors) {
//!     Err(ConstraintError::KindMismatch { .. }) => {}
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

use crate::unit::Unit;

/// Result type for constraint operations
pub type ConstraintResult<T> = Result<T, ConstraintError>;

/// Result type for catalog construction
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for project edits
pub type ProjectResult<T> = Result<T, ProjectError>;

/// Result type for connection commits
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Constraint algebra errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// Union or intersection of two different constraint kinds
    #[error("Cannot combine {left} constraint with {right} constraint")]
    KindMismatch {
        /// Kind of the receiver
        left: &'static str,
        /// Kind of the argument
        right: &'static str,
    },

    /// Numeric constraint built from an empty unit map
    #[error("Numeric constraint needs at least one unit")]
    EmptyNumeric,

    /// Range with min above max or a NaN bound
    #[error("Invalid range [{min}, {max}] for unit {unit:?}")]
    InvalidRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
        /// Unit the range was declared for
        unit: Unit,
    },

    /// Intersection left nothing
    #[error("Constraints have no value in common")]
    EmptyIntersection,
}

/// Catalog construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Two generic devices with one name
    #[error("Duplicate generic device: {0}")]
    DuplicateGeneric(String),

    /// Two actual devices with one id
    #[error("Duplicate device id: {0}")]
    DuplicateDevice(String),

    /// Two parts of one generic device share a name
    #[error("Generic device {generic} declares {kind} {name} twice")]
    DuplicateCapability {
        /// Generic device name
        generic: String,
        /// "action", "condition", "value" or "parameter"
        kind: &'static str,
        /// Offending name
        name: String,
    },

    /// Connection lists a port the device does not declare
    #[error("Device {device}: connection {connection} refers to unknown port {port}")]
    UnknownPort {
        /// Device id
        device: String,
        /// Connection name
        connection: String,
        /// Missing port name
        port: String,
    },

    /// Compatibility entry points at a generic device the catalog lacks
    #[error("Device {device} refers to an unknown generic device")]
    UnknownGeneric {
        /// Device id
        device: String,
    },

    /// Integrated sub-device wired with something other than INTEGRATED
    #[error("Integrated device {device} must only use INTEGRATED connections")]
    IntegratedWiring {
        /// Device id
        device: String,
    },

    /// Parameter default does not match its own data type or constraint
    #[error("Parameter {parameter} has an invalid default value")]
    InvalidDefault {
        /// Parameter name
        parameter: String,
    },
}

/// Project edit errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectError {
    /// No slot with that id
    #[error("Unknown project device #{0}")]
    UnknownDevice(u32),

    /// Alias target is itself an alias or the device is an alias target
    #[error("Alias chain: {0}")]
    AliasChain(String),

    /// Alias to oneself
    #[error("A device cannot be identical to itself")]
    AliasToSelf,

    /// Alias target has no concrete device yet
    #[error("Alias target #{0} is not bound to a device")]
    AliasTargetUnbound(u32),

    /// Device id is not in the catalog
    #[error("Unknown catalog device #{0}")]
    UnknownCatalogDevice(u32),

    /// Controller does not support the project platform
    #[error("Controller {controller} does not support the project platform")]
    ControllerPlatformMismatch {
        /// Controller id
        controller: String,
    },

    /// Device chosen as controller is not one
    #[error("Device {0} is not a controller")]
    NotAController(String),

    /// Property value rejected
    #[error("Invalid value for property {property}")]
    InvalidProperty {
        /// Property name
        property: String,
    },

    /// Property not declared by the bound device
    #[error("Unknown property {0}")]
    UnknownProperty(String),

    /// Constraint union failed while recording a usage
    #[error("Usage constraint: {0}")]
    Constraint(#[from] ConstraintError),
}

/// Connection commit errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Slot does not exist
    #[error("Unknown project device #{0}")]
    UnknownDevice(u32),

    /// Device has no concrete part (unbound or an alias)
    #[error("Project device #{0} has no concrete device to wire")]
    NotBound(u32),

    /// Consume connection name not declared by the device
    #[error("Unknown consume connection {0}")]
    UnknownConsume(String),

    /// Provide connection name not declared by the provider
    #[error("Unknown provide connection {0}")]
    UnknownProvide(String),

    /// Topologically incompatible pair
    #[error("Connection {consume} cannot be served by {provide}")]
    Incompatible {
        /// Consume connection name
        consume: String,
        /// Provide connection name
        provide: String,
    },

    /// A pin of the provide connection is held exclusively by another slot
    #[error("Pin {pin} is already claimed by another connection")]
    AlreadyClaimed {
        /// Physical pin name
        pin: String,
    },

    /// A device cannot provide to itself
    #[error("A device cannot be connected to itself")]
    SelfConnection,
}

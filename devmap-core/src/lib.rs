//! Core resolution engine for devmap
//!
//! Maps abstract project devices ("led", "temperature sensor") onto concrete
//! hardware parts and wires them to a controller without pin conflicts.
//!
//! The pieces, leaves first:
//!
//! - [`constraint`]: typed predicates over parameter values
//! - [`capability`]: the generic device vocabulary (actions, conditions, values)
//! - [`topology`]: ports, pin roles and the consume/provide matching rules
//! - [`device`]: concrete hardware descriptors
//! - [`library`]: the immutable catalog everything else borrows
//! - [`project`] and [`wiring`]: the mutable state owned by the caller
//! - [`mapping`]: per-slot candidate lists with classified results
//! - [`resolver`] and [`assignment`]: connection options, commits and auto-assign
//!
//! ```no_run
//! use devmap_core::{DeviceLibrary, DeviceMapper, MappingConfig, Project, Platform};
//!
//! # fn demo(library: &DeviceLibrary) {
//! let mut project = Project::new("blink", Platform::ArduinoAvr8);
//! let led = library.find_generic("LED").unwrap();
//! let slot = project.add_device("led1", led);
//!
//! let mapper = DeviceMapper::new(library, MappingConfig::default());
//! for (candidate, result) in mapper.compute_compatible_devices(&project, slot).iter() {
//!     println!("{:?}: {}", candidate, result);
//! }
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

// Macros for optional logging
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

pub mod assignment;
pub mod capability;
pub mod config;
pub mod constraint;
pub mod device;
pub mod errors;
pub mod library;
pub mod mapping;
pub mod project;
pub mod resolver;
pub mod rules;
pub mod topology;
pub mod traits;
pub mod unit;
pub mod wiring;

// Public API
pub use assignment::{auto_assign_devices, validate_assignment, ProjectMappingResult};
pub use capability::{
    Action, ActionId, Condition, ConditionId, ControlType, DataType, GenericDevice,
    GenericDeviceId, GenericKind, Parameter, ParameterId, Property, Value, ValueId,
};
pub use config::MappingConfig;
pub use constraint::{Constraint, NumericConstraint, ParamValue, Range};
pub use device::{
    ActualDevice, CloudPlatform, Compatibility, DeviceId, DeviceType, FormFactor,
    LibraryBinding, Platform, WiringMethod,
};
pub use errors::{
    CatalogError, CatalogResult, ConnectionError, ConnectionResult, ConstraintError,
    ConstraintResult, ProjectError, ProjectResult,
};
pub use library::{DeviceLibrary, LibraryBuilder};
pub use mapping::{Candidate, CompatibleDevices, DeviceMapper, DeviceMappingResult, MappingCode};
pub use project::{Binding, DeviceUsage, Project, ProjectDevice, ProjectDeviceId};
pub use resolver::{
    ConnectionResolver, ConnectionStatus, DeviceConnectionResult, ProvideOption, ProvideSource, WiringPlan,
};
pub use topology::{
    Connection, ConnectionKind, Direction, Peripheral, PinRole, Port, PortFunction, VoltageRange,
};
pub use traits::{CandidateView, MappingContext, MappingRule, RuleResult};
pub use unit::Unit;
pub use wiring::{Assignment, Owner, PinClaim, ProvideRef, Wiring};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}

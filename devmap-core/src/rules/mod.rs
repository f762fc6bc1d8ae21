//! Candidate Mapping Rules
//!
//! ## Overview
//!
//! Each rule checks one reason a part may be unusable for a project device.
//! The mapper runs them in this order and stops at the first failure:
//!
//! | # | Rule | Rejects with |
//! |---|------|--------------|
//! | 1 | [`PlatformRule`] | `PLATFORM_MISMATCH` |
//! | 2 | [`CapabilityRule`] | `UNSUPPORTED_GENERIC_DEVICE`, `UNSUPPORTED_ACTION`, `UNSUPPORTED_CONDITION`, `UNSUPPORTED_VALUE`, `CONSTRAINT_MISMATCH` |
//! | 3 | [`CloudRule`] | `CLOUD_PLATFORM_MISMATCH` |
//! | 4 | [`ConnectionRule`] | `NO_AVAILABLE_CONNECTION`, `PIN_CONFLICT` |
//! | 5 | [`CountRule`] | `COUNT_EXCEEDED` |
//!
//! The order matters for diagnostics only: a part that fails several rules is
//! reported with the earliest, cheapest reason. Capability checks are pure
//! lookups; the connection rule runs a wiring dry run and therefore comes late.

mod capability;
mod cloud;
mod connection;
mod count;
mod platform;

pub use capability::CapabilityRule;
pub use cloud::CloudRule;
pub use connection::ConnectionRule;
pub use count::CountRule;
pub use platform::PlatformRule;

use crate::library::DeviceLibrary;
use crate::traits::MappingRule;

/// The standard pipeline
pub fn default_rules(library: &DeviceLibrary) -> Vec<Box<dyn MappingRule + '_>> {
    vec![
        Box::new(PlatformRule),
        Box::new(CapabilityRule),
        Box::new(CloudRule),
        Box::new(ConnectionRule::new(library)),
        Box::new(CountRule),
    ]
}

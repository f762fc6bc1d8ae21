//! Mapping and search configuration
//!
//! The host application may keep this in its settings file; it round-trips
//! through serde with every field optional.

use serde::{Deserialize, Serialize};

/// Knobs of the mapping engine and the auto-assignment search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Offer already-bound project devices as "identical device" candidates
    pub include_identical_devices: bool,

    /// Run the connection dry run while mapping
    pub check_connections: bool,

    /// Search steps auto-assignment may take before giving up
    pub max_search_steps: usize,

    /// Complete wiring options enumerated per candidate during search
    pub max_wiring_options: usize,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            include_identical_devices: true,
            check_connections: true,
            max_search_steps: 10_000,
            max_wiring_options: 32,
        }
    }
}

impl MappingConfig {
    /// Small budget for calls made on every UI edit
    pub fn interactive() -> Self {
        Self {
            max_search_steps: 1_000,
            max_wiring_options: 8,
            ..Self::default()
        }
    }

    /// Large budget for an explicit "auto assign" request on big projects
    pub fn exhaustive() -> Self {
        Self {
            max_search_steps: 1_000_000,
            max_wiring_options: 256,
            ..Self::default()
        }
    }
}

//! Core traits for mapping rules
//!
//! The mapping engine runs a fixed sequence of rules against every candidate.
//! Each rule looks at one concern (platform, capabilities, cloud, wiring,
//! instance count) and either passes or returns the classified failure.

use crate::capability::GenericDevice;
use crate::config::MappingConfig;
use crate::device::{ActualDevice, DeviceId};
use crate::library::DeviceLibrary;
use crate::mapping::{Candidate, DeviceMappingResult};
use crate::project::{Project, ProjectDevice};

/// Outcome of one rule: pass, or the reason the candidate is rejected
pub type RuleResult = Result<(), DeviceMappingResult>;

/// Everything a rule may consult about the slot being mapped
#[derive(Clone, Copy)]
pub struct MappingContext<'a> {
    /// Catalog
    pub library: &'a DeviceLibrary,
    /// Project owning the slot
    pub project: &'a Project,
    /// Slot being mapped
    pub device: &'a ProjectDevice,
    /// Generic device of the slot
    pub generic: &'a GenericDevice,
    /// Engine configuration
    pub config: &'a MappingConfig,
}

/// A candidate resolved to the catalog part it would run on
#[derive(Clone, Copy)]
pub struct CandidateView<'a> {
    /// Candidate as listed to the user
    pub candidate: Candidate,
    /// Catalog id of the part
    pub part_id: DeviceId,
    /// The part (for aliases, the target's part)
    pub part: &'a ActualDevice,
}

/// One step of the candidate check
pub trait MappingRule {
    /// Short rule name for diagnostics
    fn name(&self) -> &'static str;

    /// Pass, or reject with a classified result
    fn check(&self, candidate: &CandidateView<'_>, context: &MappingContext<'_>) -> RuleResult;
}

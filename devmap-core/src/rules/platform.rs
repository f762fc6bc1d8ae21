//! Platform support
//!
//! Integrated devices have no platform list of their own; they run wherever
//! their parent board runs.

use crate::mapping::{DeviceMappingResult, MappingCode};
use crate::traits::{CandidateView, MappingContext, MappingRule, RuleResult};

/// Rejects parts without firmware for the project platform
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformRule;

impl MappingRule for PlatformRule {
    fn name(&self) -> &'static str {
        "platform"
    }

    fn check(&self, candidate: &CandidateView<'_>, context: &MappingContext<'_>) -> RuleResult {
        let platform = context.project.platform();
        if context.library.supports_platform(candidate.part_id, platform) {
            Ok(())
        } else {
            Err(DeviceMappingResult::with_detail(
                MappingCode::PlatformMismatch,
                format!("{:?}", platform),
            ))
        }
    }
}

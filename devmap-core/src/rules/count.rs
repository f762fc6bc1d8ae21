//! Instance count of single-instance hardware
//!
//! Integrated devices exist once per controller, and an alias candidate shares
//! the one part its target is bound to. A part declares in its compatibility
//! entry how many project devices of a generic can share one instance (an RGB
//! module may serve three "LED" slots).

use crate::mapping::{Candidate, DeviceMappingResult, MappingCode};
use crate::project::Binding;
use crate::traits::{CandidateView, MappingContext, MappingRule, RuleResult};

/// Rejects single-instance parts already shared by too many slots
#[derive(Debug, Clone, Copy, Default)]
pub struct CountRule;

impl MappingRule for CountRule {
    fn name(&self) -> &'static str {
        "count"
    }

    fn check(&self, candidate: &CandidateView<'_>, context: &MappingContext<'_>) -> RuleResult {
        let slot = context.device;
        let generic = slot.generic();
        let project = context.project;

        let sharing = match candidate.candidate {
            Candidate::Identical(target) => project
                .devices()
                .filter(|d| d.id() != slot.id() && d.generic() == generic)
                .filter(|d| d.id() == target || d.binding() == Binding::AliasOf(target))
                .count(),
            Candidate::Device(_) if candidate.part.is_integrated() => project
                .devices()
                .filter(|d| d.id() != slot.id() && d.generic() == generic)
                .filter(|d| project.resolved_device(d.id()) == Some(candidate.part_id))
                .count(),
            Candidate::Device(_) => return Ok(()),
        };

        let limit = candidate.part.compatibility(generic).map_or(1, |c| c.count) as usize;
        if sharing < limit {
            Ok(())
        } else {
            Err(DeviceMappingResult::with_detail(
                MappingCode::CountExceeded,
                format!("{} of {} in use", sharing, limit),
            ))
        }
    }
}

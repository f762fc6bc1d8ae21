//! Cloud platform availability

use crate::mapping::{DeviceMappingResult, MappingCode};
use crate::traits::{CandidateView, MappingContext, MappingRule, RuleResult};

/// Rejects parts needing a cloud service the selected controller cannot host
#[derive(Debug, Clone, Copy, Default)]
pub struct CloudRule;

impl MappingRule for CloudRule {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn check(&self, candidate: &CandidateView<'_>, context: &MappingContext<'_>) -> RuleResult {
        let Some(cloud) = candidate.part.cloud_consume else {
            return Ok(());
        };
        let hosted = context
            .project
            .controller()
            .and_then(|id| context.library.device(id))
            .map_or(false, |controller| controller.cloud_platforms.contains_key(&cloud));
        if hosted {
            Ok(())
        } else {
            Err(DeviceMappingResult::with_detail(
                MappingCode::CloudPlatformMismatch,
                format!("{:?}", cloud),
            ))
        }
    }
}

//! Wiring dry run
//!
//! The candidate is wired on a scratch copy of the project's wiring with the
//! slot's own connections released. It passes when at least one complete,
//! conflict-free wiring exists.

use crate::library::DeviceLibrary;
use crate::mapping::{Candidate, DeviceMappingResult, MappingCode};
use crate::resolver::{ConnectionResolver, ConnectionStatus};
use crate::traits::{CandidateView, MappingContext, MappingRule, RuleResult};

/// Rejects parts that cannot be wired to the current project
#[derive(Debug, Clone, Copy)]
pub struct ConnectionRule<'a> {
    resolver: ConnectionResolver<'a>,
}

impl<'a> ConnectionRule<'a> {
    /// Rule resolving against `library`
    pub fn new(library: &'a DeviceLibrary) -> Self {
        Self { resolver: ConnectionResolver::new(library) }
    }
}

impl MappingRule for ConnectionRule<'_> {
    fn name(&self) -> &'static str {
        "connection"
    }

    fn check(&self, candidate: &CandidateView<'_>, context: &MappingContext<'_>) -> RuleResult {
        let project = context.project;
        if !context.config.check_connections
            || project.controller().is_none()
            || matches!(candidate.candidate, Candidate::Identical(_))
            || !candidate.part.needs_wiring()
        {
            return Ok(());
        }

        let slot = context.device.id();
        let sources = self.resolver.provide_sources(
            project.controller(),
            project.devices().map(|d| (d.id(), d.binding())),
            slot,
        );
        let options = self
            .resolver
            .generate_possible_connections(&sources, project.wiring(), slot, candidate.part);
        let failed = || options.failed.clone().unwrap_or_default();
        match options.status {
            ConnectionStatus::NotEnoughPort => {
                return Err(DeviceMappingResult::with_detail(MappingCode::NoAvailableConnection, failed()))
            }
            ConnectionStatus::PortConflict => {
                return Err(DeviceMappingResult::with_detail(MappingCode::PinConflict, failed()))
            }
            ConnectionStatus::Ok => {}
        }

        let mut released = project.wiring().staged();
        released.release_device(slot);
        if self.resolver.enumerate_wirings(&options, &released, slot, 1).is_empty() {
            // Every port has a free option, but not all at once
            return Err(DeviceMappingResult::new(MappingCode::PinConflict));
        }
        Ok(())
    }
}

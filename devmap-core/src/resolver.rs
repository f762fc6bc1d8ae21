//! Connection Resolution Engine
//!
//! ## Overview
//!
//! Given a bound device, the resolver lists for each of its consume connections
//! the provide connections that could serve it right now, commits or releases
//! single connections, and enumerates complete wirings for the search in
//! [`assignment`](crate::assignment).
//!
//! ```text
//!   consume "I2C" of BME280 ──► [ Controller:I2C (2 consumers) ]
//!   consume "IN"  of LED    ──► [ Controller:D2, Controller:D3, Hub#4:PORT1 ]
//! ```
//!
//! ## Providers
//!
//! The selected controller provides first, then every project device bound to
//! a concrete part with provide connections (hubs, shields), in id order.
//! INTEGRATED consume connections are served only by the device's own parent.
//!
//! ## Ordering
//!
//! Options are ranked by fewest consumers among the other devices, then connection name, then
//! owner (controller before project devices, then by id). Auto-assignment tries
//! them in this order, so it spreads load across buses and stays deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::device::{ActualDevice, DeviceId};
use crate::errors::{ConnectionError, ConnectionResult};
use crate::library::DeviceLibrary;
use crate::project::{Binding, Project, ProjectDeviceId};
use crate::topology::{match_connection, ConnectionKind, Direction};
use crate::wiring::{Assignment, Owner, PinClaim, ProvideRef, Wiring};

/// Overall outcome of a connection check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// Every consume connection has at least one free option
    Ok,
    /// Some consume connection has no topologically compatible provide
    NotEnoughPort,
    /// Compatible provides exist but their pins are taken
    PortConflict,
}

/// A provide connection that could serve one consume connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvideOption {
    /// Serving provide connection
    pub provide: ProvideRef,
    /// Pins the assignment would hold
    pub claims: Vec<PinClaim>,
    /// Slots of other devices already served by this provide
    pub consumers: usize,
}

impl ProvideOption {
    /// Assignment this option stands for
    pub fn to_assignment(&self) -> Assignment {
        Assignment { provide: self.provide.clone(), claims: self.claims.clone() }
    }
}

/// Options per consume connection of one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceConnectionResult {
    /// Overall outcome
    pub status: ConnectionStatus,
    /// Ranked options by consume connection name
    pub options: BTreeMap<String, Vec<ProvideOption>>,
    /// First consume connection that caused a non-OK status
    pub failed: Option<String>,
}

impl DeviceConnectionResult {
    /// Every consume connection has an option
    pub fn is_ok(&self) -> bool {
        self.status == ConnectionStatus::Ok
    }

    /// Options of one consume connection
    pub fn options_for(&self, consume: &str) -> &[ProvideOption] {
        self.options.get(consume).map_or(&[], Vec::as_slice)
    }
}

/// A device that may serve provide connections
#[derive(Debug, Clone, Copy)]
pub struct ProvideSource<'a> {
    /// Owner as recorded in the wiring
    pub owner: Owner,
    /// Catalog id of the part
    pub device_id: DeviceId,
    /// The part
    pub device: &'a ActualDevice,
}

/// One complete wiring of a device: an assignment per consume connection
pub type WiringPlan = Vec<(String, Assignment)>;

/// Connection queries and commits against a borrowed library
#[derive(Debug, Clone, Copy)]
pub struct ConnectionResolver<'a> {
    library: &'a DeviceLibrary,
}

impl<'a> ConnectionResolver<'a> {
    /// Resolver over `library`
    pub fn new(library: &'a DeviceLibrary) -> Self {
        Self { library }
    }

    /// Controller first, then project devices with provide connections
    ///
    /// `bindings` is the binding of every project device; `exclude` never
    /// provides (a device cannot serve itself).
    pub fn provide_sources(
        &self,
        controller: Option<DeviceId>,
        bindings: impl IntoIterator<Item = (ProjectDeviceId, Binding)>,
        exclude: ProjectDeviceId,
    ) -> Vec<ProvideSource<'a>> {
        let mut sources = Vec::new();
        if let Some((device_id, device)) = controller.and_then(|id| Some((id, self.library.device(id)?))) {
            sources.push(ProvideSource { owner: Owner::Controller, device_id, device });
        }
        for (id, binding) in bindings {
            let Binding::Concrete(device_id) = binding else { continue };
            if id == exclude {
                continue;
            }
            let Some(device) = self.library.device(device_id) else { continue };
            if device.provide_connections().next().is_some() {
                sources.push(ProvideSource { owner: Owner::Device(id), device_id, device });
            }
        }
        sources
    }

    /// Free options for every consume connection of `candidate`
    ///
    /// Slots of `exclude` (the device being wired) are treated as released.
    pub fn generate_possible_connections(
        &self,
        sources: &[ProvideSource<'_>],
        wiring: &Wiring,
        exclude: ProjectDeviceId,
        candidate: &ActualDevice,
    ) -> DeviceConnectionResult {
        let mut result = DeviceConnectionResult {
            status: ConnectionStatus::Ok,
            options: BTreeMap::new(),
            failed: None,
        };

        for consume in candidate.consume_connections() {
            let mut compatible = false;
            let mut options = Vec::new();
            for source in sources {
                if source.owner == Owner::Device(exclude) {
                    continue;
                }
                if consume.kind == ConnectionKind::Integrated && Some(source.device_id) != candidate.parent() {
                    continue;
                }
                for provide in source.device.provide_connections() {
                    let Some(claims) =
                        match_connection(consume, |n| candidate.port(n), provide, |n| source.device.port(n))
                    else {
                        continue;
                    };
                    compatible = true;
                    if wiring.conflict_outside(exclude, source.owner, &claims).is_some() {
                        continue;
                    }
                    let provide = ProvideRef::new(source.owner, provide.name.clone());
                    let consumers = wiring.consumers_outside(exclude, &provide);
                    options.push(ProvideOption { provide, claims, consumers });
                }
            }

            options.sort_by(|a, b| {
                a.consumers
                    .cmp(&b.consumers)
                    .then_with(|| a.provide.connection.cmp(&b.provide.connection))
                    .then_with(|| a.provide.owner.cmp(&b.provide.owner))
            });

            let status = if !compatible {
                ConnectionStatus::NotEnoughPort
            } else if options.is_empty() {
                ConnectionStatus::PortConflict
            } else {
                ConnectionStatus::Ok
            };
            // A missing port outranks a taken one
            let worse = match (result.status, status) {
                (ConnectionStatus::Ok, ConnectionStatus::Ok) => false,
                (ConnectionStatus::Ok, _) => true,
                (ConnectionStatus::PortConflict, ConnectionStatus::NotEnoughPort) => true,
                _ => false,
            };
            if worse {
                result.status = status;
                result.failed = Some(consume.name.clone());
            }
            result.options.insert(consume.name.clone(), options);
        }
        result
    }

    /// [`generate_possible_connections`](Self::generate_possible_connections)
    /// for a project device, with every input taken from the project
    pub fn possible_connections(
        &self,
        project: &Project,
        device: ProjectDeviceId,
    ) -> ConnectionResult<DeviceConnectionResult> {
        let part = self.concrete_part(project, device)?;
        let sources = self.provide_sources(
            project.controller(),
            project.devices().map(|d| (d.id(), d.binding())),
            device,
        );
        Ok(self.generate_possible_connections(&sources, project.wiring(), device, part))
    }

    /// Up to `limit` complete, mutually conflict-free wirings of `device`
    ///
    /// Consume connections with fewer options are decided first. A device
    /// without consume connections has exactly one (empty) plan.
    pub fn enumerate_wirings(
        &self,
        options: &DeviceConnectionResult,
        wiring: &Wiring,
        device: ProjectDeviceId,
        limit: usize,
    ) -> Vec<WiringPlan> {
        let mut slots: Vec<(&str, &[ProvideOption])> =
            options.options.iter().map(|(name, opts)| (name.as_str(), opts.as_slice())).collect();
        slots.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.0.cmp(b.0)));

        let mut plans = Vec::new();
        if limit == 0 {
            return plans;
        }
        if slots.is_empty() {
            plans.push(Vec::new());
            return plans;
        }

        let mut scratch = wiring.staged();
        let mut cursors = vec![0usize];
        let mut checkpoints = vec![scratch.checkpoint()];

        while let Some(depth) = cursors.len().checked_sub(1) {
            let (name, opts) = slots[depth];
            scratch.rollback_to(checkpoints[depth]);

            let Some(option) = opts.get(cursors[depth]) else {
                cursors.pop();
                checkpoints.pop();
                if let Some(parent) = cursors.last_mut() {
                    *parent += 1;
                }
                continue;
            };

            if scratch.conflict((device, name), option.provide.owner, &option.claims).is_some() {
                cursors[depth] += 1;
                continue;
            }
            scratch.set(device, name, option.to_assignment());

            if depth + 1 == slots.len() {
                plans.push(
                    slots
                        .iter()
                        .zip(&cursors)
                        .map(|((name, opts), i)| (name.to_string(), opts[*i].to_assignment()))
                        .collect(),
                );
                if plans.len() >= limit {
                    break;
                }
                cursors[depth] += 1;
            } else {
                checkpoints.push(scratch.checkpoint());
                cursors.push(0);
            }
        }
        plans
    }

    /// Commit `provide` as the serving connection of `device`'s `consume`
    ///
    /// Fails without touching the project when the device is not bound to a
    /// concrete part, a name is unknown, the pair does not match, or a pin is
    /// held exclusively by another slot.
    pub fn set_connection(
        &self,
        project: &mut Project,
        device: ProjectDeviceId,
        consume: &str,
        provide: ProvideRef,
    ) -> ConnectionResult<()> {
        let part = self.concrete_part(project, device)?;
        let consume_connection = part
            .connection(consume, Direction::Consume)
            .ok_or_else(|| ConnectionError::UnknownConsume(consume.to_string()))?;
        if provide.owner == Owner::Device(device) {
            return Err(ConnectionError::SelfConnection);
        }

        let unknown_provide = || ConnectionError::UnknownProvide(provide.connection.clone());
        let provider_id = match provide.owner {
            Owner::Controller => project.controller(),
            Owner::Device(owner) => match project.binding(owner) {
                Some(Binding::Concrete(id)) => Some(id),
                _ => None,
            },
        }
        .ok_or_else(unknown_provide)?;
        let provider = self.library.device(provider_id).ok_or_else(unknown_provide)?;
        let provide_connection = provider
            .connection(&provide.connection, Direction::Provide)
            .ok_or_else(unknown_provide)?;

        let incompatible = || ConnectionError::Incompatible {
            consume: consume.to_string(),
            provide: provide.connection.clone(),
        };
        if consume_connection.kind == ConnectionKind::Integrated && part.parent() != Some(provider_id) {
            return Err(incompatible());
        }
        let claims = match_connection(
            consume_connection,
            |n| part.port(n),
            provide_connection,
            |n| provider.port(n),
        )
        .ok_or_else(incompatible)?;

        let assignment = Assignment { provide, claims };
        if project.wiring().assignment(device, consume) == Some(&assignment) {
            return Ok(());
        }
        if let Some(pin) = project.wiring().conflict((device, consume), assignment.provide.owner, &assignment.claims) {
            log_warn!("{}: {} rejected, pin {} already claimed", device, consume, pin);
            return Err(ConnectionError::AlreadyClaimed { pin: pin.to_string() });
        }
        project.wiring_mut().set(device, consume, assignment);
        Ok(())
    }

    /// Release one consume slot, returning what it held
    pub fn unset_connection(
        &self,
        project: &mut Project,
        device: ProjectDeviceId,
        consume: &str,
    ) -> Option<Assignment> {
        project.wiring_mut().unset(device, consume)
    }

    fn concrete_part(&self, project: &Project, device: ProjectDeviceId) -> ConnectionResult<&'a ActualDevice> {
        match project.binding(device) {
            None => Err(ConnectionError::UnknownDevice(device.get())),
            Some(Binding::Concrete(id)) => self.library.device(id).ok_or(ConnectionError::NotBound(device.get())),
            Some(_) => Err(ConnectionError::NotBound(device.get())),
        }
    }
}

/// Write every assignment of `plan` into `wiring`
pub(crate) fn apply_plan(wiring: &mut Wiring, device: ProjectDeviceId, plan: &WiringPlan) {
    for (consume, assignment) in plan {
        wiring.set(device, consume, assignment.clone());
    }
}

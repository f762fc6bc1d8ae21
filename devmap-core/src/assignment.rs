//! Project-wide validation and auto-assignment
//!
//! ## Overview
//!
//! [`validate_assignment`] checks a hand-configured project: controller chosen,
//! every device bound, cloud services hosted, every port wired.
//!
//! [`auto_assign_devices`] binds every unbound device to a part and wires every
//! device with open consume connections, or changes nothing at all.
//!
//! ## Search
//!
//! ```text
//!   targets (fewest candidates first, then by name)
//!
//!   depth 0  temp1   [BME280]            plan 0 ─┐
//!   depth 1  led1    [NeoPixel, 5mm LED] plan 1  │ rollback_to(checkpoint)
//!   depth 2  btn1    [Button]            ✗ ──────┘ on exhaustion
//! ```
//!
//! Each frame on the explicit stack holds the target, its candidate cursor,
//! the wiring plans of the current candidate with their cursor, and the
//! journal checkpoint of the staged wiring taken when the frame was entered.
//! Exhausting a frame restores the target's binding, pops it and advances the
//! parent's plan cursor. Bindings and wiring are written to the project only
//! when the last target is wired.
//!
//! The search is bounded by [`MappingConfig::max_search_steps`]; running out is
//! reported, not an error, and also leaves the project untouched.

use core::fmt;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::MappingConfig;
use crate::device::DeviceId;
use crate::library::DeviceLibrary;
use crate::mapping::DeviceMapper;
use crate::project::{Binding, Project, ProjectDeviceId};
use crate::resolver::{apply_plan, ConnectionResolver, WiringPlan};
use crate::wiring::Wiring;

/// Project-level outcome of validation or auto-assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "code", content = "device", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectMappingResult {
    /// Everything bound and wired
    Ok,
    /// No controller selected
    NoControllerSelected,
    /// Controller does not support the project platform
    ControllerPlatformMismatch,
    /// Device has no binding
    DeviceNotSelected(ProjectDeviceId),
    /// Device needs a cloud service the controller cannot host
    NoSupportedCloudPlatform(ProjectDeviceId),
    /// Device has an unwired consume connection
    PortNotSelected(ProjectDeviceId),
    /// Device has no compatible part
    NoSupportedDevice(ProjectDeviceId),
    /// Compatible parts exist but none could be wired
    CantAssignPort(ProjectDeviceId),
    /// Search budget exhausted while working on the device
    SearchLimitReached(ProjectDeviceId),
}

impl ProjectMappingResult {
    /// Success
    pub fn is_ok(&self) -> bool {
        *self == ProjectMappingResult::Ok
    }

    /// Device the outcome is about
    pub fn device(&self) -> Option<ProjectDeviceId> {
        match *self {
            ProjectMappingResult::DeviceNotSelected(id)
            | ProjectMappingResult::NoSupportedCloudPlatform(id)
            | ProjectMappingResult::PortNotSelected(id)
            | ProjectMappingResult::NoSupportedDevice(id)
            | ProjectMappingResult::CantAssignPort(id)
            | ProjectMappingResult::SearchLimitReached(id) => Some(id),
            _ => None,
        }
    }

    /// Fixed user-facing message
    pub fn message(&self) -> &'static str {
        match self {
            ProjectMappingResult::Ok => "OK",
            ProjectMappingResult::NoControllerSelected => "Controller hasn't been selected",
            ProjectMappingResult::ControllerPlatformMismatch => "Controller doesn't support the selected platform",
            ProjectMappingResult::DeviceNotSelected(_) => "Device hasn't been selected",
            ProjectMappingResult::NoSupportedCloudPlatform(_) => "Controller doesn't support the cloud platform",
            ProjectMappingResult::PortNotSelected(_) => "Port hasn't been selected",
            ProjectMappingResult::NoSupportedDevice(_) => "No supported device",
            ProjectMappingResult::CantAssignPort(_) => "Can't assign port",
            ProjectMappingResult::SearchLimitReached(_) => "Search limit reached",
        }
    }
}

impl fmt::Display for ProjectMappingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.device() {
            Some(id) => write!(f, "{} ({})", self.message(), id),
            None => f.write_str(self.message()),
        }
    }
}

/// Check a manually configured project
pub fn validate_assignment(library: &DeviceLibrary, project: &Project) -> ProjectMappingResult {
    let Some(controller) = project.controller().and_then(|id| library.device(id)) else {
        return ProjectMappingResult::NoControllerSelected;
    };
    if !controller.supports_platform(project.platform()) {
        return ProjectMappingResult::ControllerPlatformMismatch;
    }

    if let Some(unbound) = project.devices().find(|d| project.resolved_device(d.id()).is_none()) {
        return ProjectMappingResult::DeviceNotSelected(unbound.id());
    }

    for slot in project.devices() {
        let Some(part) = project.resolved_device(slot.id()).and_then(|id| library.device(id)) else {
            continue;
        };
        if let Some(cloud) = part.cloud_consume {
            if !controller.cloud_platforms.contains_key(&cloud) {
                return ProjectMappingResult::NoSupportedCloudPlatform(slot.id());
            }
        }
    }

    for slot in project.devices() {
        let Binding::Concrete(id) = slot.binding() else { continue };
        let Some(part) = library.device(id) else { continue };
        if !part.needs_wiring() {
            continue;
        }
        if part
            .consume_connections()
            .any(|c| project.wiring().assignment(slot.id(), &c.name).is_none())
        {
            return ProjectMappingResult::PortNotSelected(slot.id());
        }
    }
    ProjectMappingResult::Ok
}

struct Target {
    id: ProjectDeviceId,
    name: String,
    original: Binding,
    candidates: Vec<DeviceId>,
}

struct Frame {
    target: usize,
    candidate: usize,
    plans: Option<Vec<WiringPlan>>,
    plan: usize,
    checkpoint: usize,
}

impl Frame {
    fn enter(target: usize, checkpoint: usize) -> Self {
        Self { target, candidate: 0, plans: None, plan: 0, checkpoint }
    }
}

/// Bind and wire every open device, atomically
///
/// Unbound devices get a part from their OK candidates; bound devices keep
/// their part and only have their unwired consume connections filled.
/// Aliases need nothing. On any failure the project is left exactly as it was.
pub fn auto_assign_devices(
    library: &DeviceLibrary,
    project: &mut Project,
    config: &MappingConfig,
) -> ProjectMappingResult {
    let Some(controller) = project.controller().and_then(|id| library.device(id)) else {
        return ProjectMappingResult::NoControllerSelected;
    };
    if !controller.supports_platform(project.platform()) {
        return ProjectMappingResult::ControllerPlatformMismatch;
    }

    let targets = match collect_targets(library, project, config) {
        Ok(targets) => targets,
        Err(result) => return result,
    };
    if targets.is_empty() {
        return ProjectMappingResult::Ok;
    }

    let mut bindings: BTreeMap<ProjectDeviceId, Binding> =
        project.devices().map(|d| (d.id(), d.binding())).collect();
    let mut staged = project.wiring().staged();
    let mut stack = vec![Frame::enter(0, staged.checkpoint())];
    let mut first_failure: Option<ProjectDeviceId> = None;
    let mut steps = 0usize;

    while let Some(top) = stack.len().checked_sub(1) {
        let target = &targets[stack[top].target];
        steps += 1;
        if steps > config.max_search_steps {
            log_warn!("auto-assign: step budget {} exhausted at {}", config.max_search_steps, target.name);
            return ProjectMappingResult::SearchLimitReached(target.id);
        }
        staged.rollback_to(stack[top].checkpoint);

        if stack[top].plans.is_none() {
            let Some(&device) = target.candidates.get(stack[top].candidate) else {
                log_debug!("auto-assign: {} exhausted, backtracking", target.name);
                bindings.insert(target.id, target.original);
                first_failure.get_or_insert(target.id);
                stack.pop();
                if let Some(parent) = stack.last_mut() {
                    parent.plan += 1;
                }
                continue;
            };

            bindings.insert(target.id, Binding::Concrete(device));
            if !instance_available(library, project, &bindings, target.id, device) {
                stack[top].candidate += 1;
                continue;
            }
            let plans = wiring_plans(library, project, &bindings, &staged, target.id, device, config);
            let frame = &mut stack[top];
            frame.plans = Some(plans);
            frame.plan = 0;
        }

        let frame = &mut stack[top];
        let plans = frame.plans.as_deref().unwrap_or_default();
        let Some(plan) = plans.get(frame.plan) else {
            frame.plans = None;
            frame.candidate += 1;
            continue;
        };
        apply_plan(&mut staged, target.id, plan);

        let next = frame.target + 1;
        if next == targets.len() {
            project.commit(bindings, staged);
            return ProjectMappingResult::Ok;
        }
        stack.push(Frame::enter(next, staged.checkpoint()));
    }

    let failed = first_failure.unwrap_or(targets[0].id);
    log_warn!("auto-assign: no complete wiring, {} cannot be assigned", failed);
    ProjectMappingResult::CantAssignPort(failed)
}

/// Open devices with their candidate parts, most constrained first
fn collect_targets(
    library: &DeviceLibrary,
    project: &Project,
    config: &MappingConfig,
) -> Result<Vec<Target>, ProjectMappingResult> {
    let mapper = DeviceMapper::new(library, config.clone());
    let mut targets = Vec::new();
    for slot in project.devices() {
        match slot.binding() {
            Binding::Unbound => {
                let candidates = mapper.compute_compatible_devices(project, slot.id()).ok_devices().collect();
                targets.push(Target {
                    id: slot.id(),
                    name: slot.name().to_string(),
                    original: Binding::Unbound,
                    candidates,
                });
            }
            Binding::Concrete(id) => {
                let Some(part) = library.device(id) else { continue };
                let open = part.needs_wiring()
                    && part
                        .consume_connections()
                        .any(|c| project.wiring().assignment(slot.id(), &c.name).is_none());
                if open {
                    targets.push(Target {
                        id: slot.id(),
                        name: slot.name().to_string(),
                        original: Binding::Concrete(id),
                        candidates: vec![id],
                    });
                }
            }
            Binding::AliasOf(_) => {}
        }
    }

    targets.sort_by(|a, b| a.candidates.len().cmp(&b.candidates.len()).then_with(|| a.name.cmp(&b.name)));
    if let Some(stuck) = targets.iter().find(|t| t.candidates.is_empty()) {
        return Err(ProjectMappingResult::NoSupportedDevice(stuck.id));
    }
    Ok(targets)
}

/// Wirings of `device` filling the target's unwired consume connections
fn wiring_plans(
    library: &DeviceLibrary,
    project: &Project,
    bindings: &BTreeMap<ProjectDeviceId, Binding>,
    staged: &Wiring,
    target: ProjectDeviceId,
    device: DeviceId,
    config: &MappingConfig,
) -> Vec<WiringPlan> {
    let Some(part) = library.device(device) else {
        return Vec::new();
    };
    if !part.needs_wiring() {
        return vec![Vec::new()];
    }
    let resolver = ConnectionResolver::new(library);
    let sources = resolver.provide_sources(project.controller(), bindings.iter().map(|(id, b)| (*id, *b)), target);
    let mut options = resolver.generate_possible_connections(&sources, staged, target, part);
    options.options.retain(|consume, _| staged.assignment(target, consume).is_none());
    resolver.enumerate_wirings(&options, staged, target, config.max_wiring_options)
}

/// A single-instance part still has room for the target's generic
fn instance_available(
    library: &DeviceLibrary,
    project: &Project,
    bindings: &BTreeMap<ProjectDeviceId, Binding>,
    target: ProjectDeviceId,
    device: DeviceId,
) -> bool {
    let Some(part) = library.device(device) else { return false };
    if !part.is_integrated() {
        return true;
    }
    let Some(generic) = project.device(target).map(|d| d.generic()) else { return false };
    let resolves_here = |id: ProjectDeviceId| match bindings.get(&id) {
        Some(Binding::Concrete(d)) => *d == device,
        Some(Binding::AliasOf(t)) => bindings.get(t) == Some(&Binding::Concrete(device)),
        _ => false,
    };
    let sharing = project
        .devices()
        .filter(|d| d.id() != target && d.generic() == generic && resolves_here(d.id()))
        .count();
    sharing < part.compatibility(generic).map_or(1, |c| c.count) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_name_their_device() {
        let id = ProjectDeviceId(3);
        assert_eq!(ProjectMappingResult::CantAssignPort(id).device(), Some(id));
        assert_eq!(ProjectMappingResult::NoControllerSelected.device(), None);
        assert_eq!(ProjectMappingResult::PortNotSelected(id).to_string(), "Port hasn't been selected (#3)");
        assert!(ProjectMappingResult::Ok.is_ok());
    }

    #[test]
    fn results_serialize_with_code_and_device() {
        let json = serde_json::to_string(&ProjectMappingResult::NoSupportedDevice(ProjectDeviceId(2))).unwrap();
        assert_eq!(json, r#"{"code":"NO_SUPPORTED_DEVICE","device":2}"#);
        let json = serde_json::to_string(&ProjectMappingResult::Ok).unwrap();
        assert_eq!(json, r#"{"code":"OK"}"#);
    }
}

//! Device Mapping Engine
//!
//! ## Overview
//!
//! For one project device the engine lists every part it could run on and
//! says, for each, either OK or exactly why not:
//!
//! ```text
//!   led1 (LED, uses On(brightness 0..100) and Off)
//!
//!   ✓ Identical to status_led         (alias, shares that part)
//!   ✓ Adafruit NeoPixel               OK
//!   ✓ Generic 5mm LED                 OK
//!   ✗ Generic Mini LED                Parameter constraint mismatch: On.brightness
//!   ✗ Bosch BME280                    Generic device not supported
//! ```
//!
//! ## Design
//!
//! Candidates are checked by a fixed pipeline of [`MappingRule`]s (see
//! [`rules`](crate::rules)); the first failing rule classifies the candidate.
//! The OK / not-OK partition is what auto-assignment relies on; the order inside
//! each partition is for display.

use core::cmp::Ordering;
use core::fmt;

use serde::Serialize;

use crate::config::MappingConfig;
use crate::device::DeviceId;
use crate::library::DeviceLibrary;
use crate::project::{Binding, Project, ProjectDeviceId};
use crate::rules;
use crate::traits::{CandidateView, MappingContext, MappingRule};

/// Something a project device can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Candidate {
    /// Reuse another project device's part
    Identical(ProjectDeviceId),
    /// A catalog part
    Device(DeviceId),
}

impl Candidate {
    /// Binding this candidate stands for
    pub fn binding(self) -> Binding {
        match self {
            Candidate::Identical(target) => Binding::AliasOf(target),
            Candidate::Device(device) => Binding::Concrete(device),
        }
    }
}

/// Classified mapping outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum MappingCode {
    Ok,
    PlatformMismatch,
    UnsupportedGenericDevice,
    UnsupportedAction,
    UnsupportedCondition,
    UnsupportedValue,
    ConstraintMismatch,
    CloudPlatformMismatch,
    NoAvailableConnection,
    PinConflict,
    CountExceeded,
}

impl MappingCode {
    /// Fixed message shown next to a greyed-out candidate
    pub fn message(self) -> &'static str {
        match self {
            MappingCode::Ok => "OK",
            MappingCode::PlatformMismatch => "Platform not supported",
            MappingCode::UnsupportedGenericDevice => "Generic device not supported",
            MappingCode::UnsupportedAction => "Action not supported",
            MappingCode::UnsupportedCondition => "Condition not supported",
            MappingCode::UnsupportedValue => "Value not supported",
            MappingCode::ConstraintMismatch => "Parameter constraint mismatch",
            MappingCode::CloudPlatformMismatch => "Cloud platform not supported by the controller",
            MappingCode::NoAvailableConnection => "No compatible port available",
            MappingCode::PinConflict => "Compatible ports are already in use",
            MappingCode::CountExceeded => "Device is already used by too many devices",
        }
    }
}

/// Mapping outcome with optional detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceMappingResult {
    /// Classified outcome
    pub code: MappingCode,
    /// What exactly failed (action name, parameter, platform...)
    pub detail: Option<String>,
}

impl DeviceMappingResult {
    /// Compatible
    pub const OK: DeviceMappingResult = DeviceMappingResult { code: MappingCode::Ok, detail: None };

    /// Outcome without detail
    pub fn new(code: MappingCode) -> Self {
        Self { code, detail: None }
    }

    /// Outcome with detail
    pub fn with_detail(code: MappingCode, detail: impl Into<String>) -> Self {
        Self { code, detail: Some(detail.into()) }
    }

    /// Compatible
    pub fn is_ok(&self) -> bool {
        self.code == MappingCode::Ok
    }
}

impl fmt::Display for DeviceMappingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.code.message(), detail),
            None => f.write_str(self.code.message()),
        }
    }
}

/// Sorted candidate list of one project device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompatibleDevices {
    entries: Vec<(Candidate, DeviceMappingResult)>,
}

impl CompatibleDevices {
    /// All candidates in display order
    pub fn iter(&self) -> impl Iterator<Item = (&Candidate, &DeviceMappingResult)> {
        self.entries.iter().map(|(c, r)| (c, r))
    }

    /// OK candidates in display order
    pub fn ok(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.entries.iter().filter(|(_, r)| r.is_ok()).map(|(c, _)| *c)
    }

    /// OK catalog parts in display order
    pub fn ok_devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.ok().filter_map(|c| match c {
            Candidate::Device(device) => Some(device),
            Candidate::Identical(_) => None,
        })
    }

    /// Result for one candidate
    pub fn get(&self, candidate: &Candidate) -> Option<&DeviceMappingResult> {
        self.entries.iter().find(|(c, _)| c == candidate).map(|(_, r)| r)
    }

    /// Result for one catalog part
    pub fn get_device(&self, device: DeviceId) -> Option<&DeviceMappingResult> {
        self.get(&Candidate::Device(device))
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No candidates at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Computes candidate lists against a borrowed library
pub struct DeviceMapper<'a> {
    library: &'a DeviceLibrary,
    config: MappingConfig,
    rules: Vec<Box<dyn MappingRule + 'a>>,
}

impl<'a> DeviceMapper<'a> {
    /// Mapper with the standard rule pipeline
    pub fn new(library: &'a DeviceLibrary, config: MappingConfig) -> Self {
        Self { library, config, rules: rules::default_rules(library) }
    }

    /// Engine configuration
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Every candidate for `device` with its result, sorted for display
    pub fn compute_compatible_devices(&self, project: &Project, device: ProjectDeviceId) -> CompatibleDevices {
        let Some(context) = self.context(project, device) else {
            return CompatibleDevices::default();
        };

        let mut entries: Vec<(Candidate, DeviceMappingResult, String)> = self
            .candidates(project, device)
            .into_iter()
            .filter_map(|candidate| {
                let view = self.view(project, candidate)?;
                let result = self.run_rules(&view, &context);
                Some((candidate, result, self.display_name(project, candidate)))
            })
            .collect();
        entries.sort_by(|a, b| display_order(a, b));

        CompatibleDevices {
            entries: entries.into_iter().map(|(c, r, _)| (c, r)).collect(),
        }
    }

    /// Result for a single candidate
    pub fn check(&self, project: &Project, device: ProjectDeviceId, candidate: Candidate) -> Option<DeviceMappingResult> {
        let context = self.context(project, device)?;
        let view = self.view(project, candidate)?;
        Some(self.run_rules(&view, &context))
    }

    fn context<'p>(&'p self, project: &'p Project, device: ProjectDeviceId) -> Option<MappingContext<'p>> {
        let slot = project.device(device)?;
        let generic = self.library.generic(slot.generic())?;
        Some(MappingContext {
            library: self.library,
            project,
            device: slot,
            generic,
            config: &self.config,
        })
    }

    fn run_rules(&self, view: &CandidateView<'_>, context: &MappingContext<'_>) -> DeviceMappingResult {
        for rule in &self.rules {
            if let Err(result) = rule.check(view, context) {
                return result;
            }
        }
        DeviceMappingResult::OK
    }

    /// Catalog parts outside controllers and foreign integrated devices,
    /// the controller's integrated devices, then alias targets
    fn candidates(&self, project: &Project, device: ProjectDeviceId) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .library
            .devices()
            .filter(|(_, d)| !d.is_controller() && d.parent().is_none())
            .map(|(id, _)| Candidate::Device(id))
            .collect();

        if let Some(controller) = project.controller().and_then(|id| self.library.device(id)) {
            candidates.extend(controller.integrated_devices().iter().map(|id| Candidate::Device(*id)));
        }

        if self.config.include_identical_devices {
            candidates.extend(
                project
                    .devices()
                    .filter(|d| d.id() != device && matches!(d.binding(), Binding::Concrete(_)))
                    .map(|d| Candidate::Identical(d.id())),
            );
        }
        candidates
    }

    fn view(&self, project: &Project, candidate: Candidate) -> Option<CandidateView<'a>> {
        let part_id = match candidate {
            Candidate::Device(device) => device,
            Candidate::Identical(target) => match project.binding(target)? {
                Binding::Concrete(device) => device,
                _ => return None,
            },
        };
        let part = self.library.device(part_id)?;
        Some(CandidateView { candidate, part_id, part })
    }

    fn display_name(&self, project: &Project, candidate: Candidate) -> String {
        match candidate {
            Candidate::Identical(target) => {
                project.device(target).map(|d| d.name().to_string()).unwrap_or_default()
            }
            Candidate::Device(device) => {
                self.library.device(device).map(|d| d.display_name()).unwrap_or_default()
            }
        }
    }
}

fn display_order(
    a: &(Candidate, DeviceMappingResult, String),
    b: &(Candidate, DeviceMappingResult, String),
) -> Ordering {
    let rank = |(candidate, result, _): &(Candidate, DeviceMappingResult, String)| match (result.is_ok(), candidate) {
        (true, Candidate::Identical(_)) => 0,
        (true, Candidate::Device(_)) => 1,
        (false, _) => 2,
    };
    rank(a)
        .cmp(&rank(b))
        .then_with(|| a.2.cmp(&b.2))
        .then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_display_includes_detail() {
        let r = DeviceMappingResult::with_detail(MappingCode::UnsupportedAction, "Blink");
        assert_eq!(r.to_string(), "Action not supported: Blink");
        assert_eq!(DeviceMappingResult::OK.to_string(), "OK");
        assert!(!r.is_ok());
    }

    #[test]
    fn ok_aliases_sort_first_and_failures_last() {
        let mk = |c: Candidate, ok: bool, name: &str| {
            let r = if ok { DeviceMappingResult::OK } else { DeviceMappingResult::new(MappingCode::PinConflict) };
            (c, r, name.to_string())
        };
        let mut entries = vec![
            mk(Candidate::Device(DeviceId(0)), false, "Aardvark"),
            mk(Candidate::Device(DeviceId(1)), true, "Zed"),
            mk(Candidate::Identical(ProjectDeviceId(1)), true, "zz_alias"),
            mk(Candidate::Device(DeviceId(2)), true, "Alpha"),
        ];
        entries.sort_by(display_order);
        let names: Vec<&str> = entries.iter().map(|e| e.2.as_str()).collect();
        assert_eq!(names, ["zz_alias", "Alpha", "Zed", "Aardvark"]);
    }
}

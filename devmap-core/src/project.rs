//! Project state: abstract device slots, their bindings and wiring
//!
//! A [`Project`] is owned by the caller and only mutated through `&mut self`,
//! so edits are serialized by the borrow checker. The library is borrowed per
//! call and never stored.
//!
//! ## Bindings
//!
//! ```text
//!   led1   ── Concrete(WS2812)
//!   temp1  ── Concrete(BME280)
//!   humid1 ── AliasOf(temp1)        same physical BME280
//!   btn1   ── Unbound
//! ```
//!
//! Aliases always point at a `Concrete` slot; chains are rejected when the alias
//! is created. When a slot's binding changes, its wiring is released and any
//! alias pointing at it falls back to `Unbound`.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::{ActionId, ConditionId, GenericDeviceId, ParameterId, ValueId};
use crate::constraint::{Constraint, ParamValue};
use crate::device::{DeviceId, Platform};
use crate::errors::{ConstraintResult, ProjectError, ProjectResult};
use crate::library::DeviceLibrary;
use crate::wiring::Wiring;

/// Interned id of a project device, assigned by the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectDeviceId(pub(crate) u32);

impl ProjectDeviceId {
    /// Raw id
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProjectDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What hardware a project device runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Binding {
    /// Nothing chosen yet
    #[default]
    Unbound,
    /// A catalog part
    Concrete(DeviceId),
    /// The same physical part as another project device
    AliasOf(ProjectDeviceId),
}

/// Capabilities a project device's program actually exercises
///
/// Parameters and values without a recorded constraint fall back to the generic
/// device's declared constraint during mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceUsage {
    actions: BTreeMap<ActionId, BTreeMap<ParameterId, Constraint>>,
    conditions: BTreeMap<ConditionId, BTreeMap<ParameterId, Constraint>>,
    values: BTreeMap<ValueId, Option<Constraint>>,
}

impl DeviceUsage {
    /// Mark an action as used
    pub fn use_action(&mut self, action: ActionId) {
        self.actions.entry(action).or_default();
    }

    /// Mark a condition as used
    pub fn use_condition(&mut self, condition: ConditionId) {
        self.conditions.entry(condition).or_default();
    }

    /// Record the values a parameter of a used action takes; merged by union
    pub fn record_action_parameter(
        &mut self,
        action: ActionId,
        parameter: ParameterId,
        constraint: Constraint,
    ) -> ConstraintResult<()> {
        merge(self.actions.entry(action).or_default(), parameter, constraint)
    }

    /// Record the values a parameter of a used condition takes; merged by union
    pub fn record_condition_parameter(
        &mut self,
        condition: ConditionId,
        parameter: ParameterId,
        constraint: Constraint,
    ) -> ConstraintResult<()> {
        merge(self.conditions.entry(condition).or_default(), parameter, constraint)
    }

    /// Mark a value as read, optionally with the range the program relies on
    pub fn read_value(&mut self, value: ValueId, constraint: Option<Constraint>) -> ConstraintResult<()> {
        let slot = self.values.entry(value).or_default();
        *slot = match (slot.take(), constraint) {
            (Some(existing), Some(new)) => Some(existing.union(&new)?),
            (existing, new) => existing.or(new),
        };
        Ok(())
    }

    /// Used actions with recorded parameter constraints
    pub fn actions(&self) -> &BTreeMap<ActionId, BTreeMap<ParameterId, Constraint>> {
        &self.actions
    }

    /// Used conditions with recorded parameter constraints
    pub fn conditions(&self) -> &BTreeMap<ConditionId, BTreeMap<ParameterId, Constraint>> {
        &self.conditions
    }

    /// Read values with recorded constraints
    pub fn values(&self) -> &BTreeMap<ValueId, Option<Constraint>> {
        &self.values
    }

    /// Nothing used
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.conditions.is_empty() && self.values.is_empty()
    }
}

fn merge(
    parameters: &mut BTreeMap<ParameterId, Constraint>,
    parameter: ParameterId,
    constraint: Constraint,
) -> ConstraintResult<()> {
    match parameters.get(&parameter) {
        Some(existing) => {
            let merged = existing.union(&constraint)?;
            parameters.insert(parameter, merged);
        }
        None => {
            parameters.insert(parameter, constraint);
        }
    }
    Ok(())
}

/// Abstract device slot
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDevice {
    id: ProjectDeviceId,
    name: String,
    generic: GenericDeviceId,
    /// Capabilities used by the program
    pub usage: DeviceUsage,
    binding: Binding,
    properties: BTreeMap<String, ParamValue>,
}

impl ProjectDevice {
    /// Slot id
    pub fn id(&self) -> ProjectDeviceId {
        self.id
    }

    /// User-facing name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generic device this slot stands for
    pub fn generic(&self) -> GenericDeviceId {
        self.generic
    }

    /// Current binding
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// User-set property values
    pub fn properties(&self) -> &BTreeMap<String, ParamValue> {
        &self.properties
    }
}

/// A user's project as seen by the resolution engine
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    name: String,
    platform: Platform,
    controller: Option<DeviceId>,
    devices: BTreeMap<ProjectDeviceId, ProjectDevice>,
    next_id: u32,
    wiring: Wiring,
}

impl Project {
    /// Empty project targeting `platform`
    pub fn new(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            platform,
            controller: None,
            devices: BTreeMap::new(),
            next_id: 1,
            wiring: Wiring::new(),
        }
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target platform
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Change the target platform; bindings are kept and re-checked by mapping
    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    /// Selected controller
    pub fn controller(&self) -> Option<DeviceId> {
        self.controller
    }

    /// Select or clear the controller
    ///
    /// Changing the controller releases all wiring and unbinds slots bound to
    /// the old controller's integrated devices.
    pub fn set_controller(
        &mut self,
        library: &DeviceLibrary,
        controller: Option<DeviceId>,
    ) -> ProjectResult<()> {
        if let Some(id) = controller {
            let device = library.device(id).ok_or(ProjectError::UnknownCatalogDevice(id.0))?;
            if !device.is_controller() {
                return Err(ProjectError::NotAController(device.id.clone()));
            }
            if !device.supports_platform(self.platform) {
                return Err(ProjectError::ControllerPlatformMismatch {
                    controller: device.id.clone(),
                });
            }
        }
        if controller == self.controller {
            return Ok(());
        }

        if let Some(old) = self.controller.and_then(|id| library.device(id)) {
            let stale: Vec<ProjectDeviceId> = self
                .devices
                .values()
                .filter(|d| matches!(d.binding, Binding::Concrete(id) if old.integrated_devices().contains(&id)))
                .map(|d| d.id)
                .collect();
            for id in stale {
                self.rebind(id, Binding::Unbound);
            }
        }
        self.wiring.clear();
        self.controller = controller;
        Ok(())
    }

    /// Add a slot for `generic`
    pub fn add_device(&mut self, name: impl Into<String>, generic: GenericDeviceId) -> ProjectDeviceId {
        let id = ProjectDeviceId(self.next_id);
        self.next_id += 1;
        self.devices.insert(
            id,
            ProjectDevice {
                id,
                name: name.into(),
                generic,
                usage: DeviceUsage::default(),
                binding: Binding::Unbound,
                properties: BTreeMap::new(),
            },
        );
        id
    }

    /// Remove a slot, releasing everything that references it
    pub fn remove_device(&mut self, id: ProjectDeviceId) -> ProjectResult<ProjectDevice> {
        if !self.devices.contains_key(&id) {
            return Err(ProjectError::UnknownDevice(id.0));
        }
        self.rebind(id, Binding::Unbound);
        self.devices.remove(&id).ok_or(ProjectError::UnknownDevice(id.0))
    }

    /// Slot by id
    pub fn device(&self, id: ProjectDeviceId) -> Option<&ProjectDevice> {
        self.devices.get(&id)
    }

    /// Usage of a slot, for the program model to fill in
    pub fn usage_mut(&mut self, id: ProjectDeviceId) -> ProjectResult<&mut DeviceUsage> {
        self.devices
            .get_mut(&id)
            .map(|d| &mut d.usage)
            .ok_or(ProjectError::UnknownDevice(id.0))
    }

    /// Every slot in id order
    pub fn devices(&self) -> impl Iterator<Item = &ProjectDevice> {
        self.devices.values()
    }

    /// Slot by name
    pub fn find_device(&self, name: &str) -> Option<&ProjectDevice> {
        self.devices.values().find(|d| d.name == name)
    }

    /// Binding of a slot
    pub fn binding(&self, id: ProjectDeviceId) -> Option<Binding> {
        self.devices.get(&id).map(|d| d.binding)
    }

    /// Catalog part a slot ends up on, following one alias hop
    pub fn resolved_device(&self, id: ProjectDeviceId) -> Option<DeviceId> {
        match self.binding(id)? {
            Binding::Concrete(device) => Some(device),
            Binding::AliasOf(target) => match self.binding(target)? {
                Binding::Concrete(device) => Some(device),
                _ => None,
            },
            Binding::Unbound => None,
        }
    }

    /// Slots aliasing `target`
    pub fn aliases_of(&self, target: ProjectDeviceId) -> impl Iterator<Item = &ProjectDevice> {
        self.devices
            .values()
            .filter(move |d| d.binding == Binding::AliasOf(target))
    }

    /// Change a slot's binding
    ///
    /// Aliases must point at a `Concrete` slot other than `id`, and `id` must
    /// not itself be an alias target. Rebinding releases the slot's wiring.
    pub fn bind(
        &mut self,
        library: &DeviceLibrary,
        id: ProjectDeviceId,
        binding: Binding,
    ) -> ProjectResult<()> {
        let current = self.binding(id).ok_or(ProjectError::UnknownDevice(id.0))?;
        match binding {
            Binding::Unbound => {}
            Binding::Concrete(device) => {
                library.device(device).ok_or(ProjectError::UnknownCatalogDevice(device.0))?;
            }
            Binding::AliasOf(target) => self.check_alias(id, target)?,
        }
        if binding != current {
            self.rebind(id, binding);
        }
        Ok(())
    }

    fn check_alias(&self, id: ProjectDeviceId, target: ProjectDeviceId) -> ProjectResult<()> {
        if id == target {
            return Err(ProjectError::AliasToSelf);
        }
        match self.binding(target).ok_or(ProjectError::UnknownDevice(target.0))? {
            Binding::Concrete(_) => {}
            Binding::AliasOf(_) => {
                return Err(ProjectError::AliasChain(format!("{} is itself an alias", target)))
            }
            Binding::Unbound => return Err(ProjectError::AliasTargetUnbound(target.0)),
        }
        if self.aliases_of(id).next().is_some() {
            return Err(ProjectError::AliasChain(format!("{} is an alias target", id)));
        }
        Ok(())
    }

    /// Unchecked binding change with its side effects
    pub(crate) fn rebind(&mut self, id: ProjectDeviceId, binding: Binding) {
        self.wiring.release_device(id);

        let orphans: Vec<ProjectDeviceId> = self.aliases_of(id).map(|d| d.id).collect();
        for orphan in orphans {
            log_debug!("alias {} reset: target {} rebound", orphan, id);
            if let Some(device) = self.devices.get_mut(&orphan) {
                device.binding = Binding::Unbound;
                device.properties.clear();
            }
        }
        if let Some(device) = self.devices.get_mut(&id) {
            device.binding = binding;
            device.properties.clear();
        }
    }

    /// Set a property of a slot's bound part
    pub fn set_property(
        &mut self,
        library: &DeviceLibrary,
        id: ProjectDeviceId,
        name: &str,
        value: ParamValue,
    ) -> ProjectResult<()> {
        let bound = self
            .resolved_device(id)
            .and_then(|d| library.device(d))
            .ok_or(ProjectError::UnknownProperty(name.to_string()))?;
        let property = bound
            .property(name)
            .ok_or_else(|| ProjectError::UnknownProperty(name.to_string()))?;
        if !property.accepts(&value) {
            return Err(ProjectError::InvalidProperty { property: name.to_string() });
        }
        let device = self.devices.get_mut(&id).ok_or(ProjectError::UnknownDevice(id.0))?;
        device.properties.insert(name.to_string(), value);
        Ok(())
    }

    /// Effective property value: user-set, else the part's default
    pub fn property<'a>(
        &'a self,
        library: &'a DeviceLibrary,
        id: ProjectDeviceId,
        name: &str,
    ) -> Option<&'a ParamValue> {
        let device = self.devices.get(&id)?;
        device.properties.get(name).or_else(|| {
            let bound = library.device(self.resolved_device(id)?)?;
            bound.property(name).map(|p| p.default_value())
        })
    }

    /// Committed connections
    pub fn wiring(&self) -> &Wiring {
        &self.wiring
    }

    pub(crate) fn wiring_mut(&mut self) -> &mut Wiring {
        &mut self.wiring
    }

    /// Replace bindings and wiring in one step
    pub(crate) fn commit(&mut self, bindings: BTreeMap<ProjectDeviceId, Binding>, wiring: Wiring) {
        for (id, binding) in bindings {
            if let Some(device) = self.devices.get_mut(&id) {
                if device.binding != binding {
                    device.binding = binding;
                    device.properties.clear();
                }
            }
        }
        self.wiring = wiring.into_committed();
    }
}

//! Immutable device catalog
//!
//! Built once through [`LibraryBuilder`] and then only borrowed. Generic devices
//! and actual devices are interned into dense vectors; ids are positions.
//!
//! ```text
//!   LibraryBuilder::add_generic ──► GenericDeviceId
//!   LibraryBuilder::add_device  ──► DeviceId   (integrated children flattened)
//!   LibraryBuilder::build       ──► DeviceLibrary (Send + Sync, read-only)
//! ```

use std::collections::{BTreeSet, HashMap};

use crate::capability::{GenericDevice, GenericDeviceId};
use crate::device::{ActualDevice, DeviceId, DeviceType, Platform};
use crate::errors::{CatalogError, CatalogResult};
use crate::topology::ConnectionKind;

/// Read-only catalog of generic and actual devices
#[derive(Debug, Clone, Default)]
pub struct DeviceLibrary {
    generics: Vec<GenericDevice>,
    devices: Vec<ActualDevice>,
    generic_index: HashMap<String, GenericDeviceId>,
    device_index: HashMap<String, DeviceId>,
}

impl DeviceLibrary {
    /// Start a new catalog
    pub fn builder() -> LibraryBuilder {
        LibraryBuilder::new()
    }

    /// Generic device by id
    pub fn generic(&self, id: GenericDeviceId) -> Option<&GenericDevice> {
        self.generics.get(id.index())
    }

    /// Actual device by id
    pub fn device(&self, id: DeviceId) -> Option<&ActualDevice> {
        self.devices.get(id.index())
    }

    /// Generic device id by name
    pub fn find_generic(&self, name: &str) -> Option<GenericDeviceId> {
        self.generic_index.get(name).copied()
    }

    /// Actual device id by library id string
    pub fn find_device(&self, id: &str) -> Option<DeviceId> {
        self.device_index.get(id).copied()
    }

    /// All generic devices with their ids
    pub fn generics(&self) -> impl Iterator<Item = (GenericDeviceId, &GenericDevice)> {
        self.generics.iter().enumerate().map(|(i, g)| (GenericDeviceId(i as u32), g))
    }

    /// All actual devices with their ids, integrated children included
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &ActualDevice)> {
        self.devices.iter().enumerate().map(|(i, d)| (DeviceId(i as u32), d))
    }

    /// All controllers
    pub fn controllers(&self) -> impl Iterator<Item = (DeviceId, &ActualDevice)> {
        self.devices().filter(|(_, d)| d.is_controller())
    }

    /// Controllers supporting `platform`
    pub fn controllers_for(&self, platform: Platform) -> impl Iterator<Item = (DeviceId, &ActualDevice)> {
        self.controllers().filter(move |(_, d)| d.supports_platform(platform))
    }

    /// Platform support, deferring to the parent for integrated devices
    pub fn supports_platform(&self, id: DeviceId, platform: Platform) -> bool {
        match self.device(id) {
            Some(device) => match device.parent() {
                Some(parent) => self.supports_platform(parent, platform),
                None => device.supports_platform(platform),
            },
            None => false,
        }
    }

    /// Number of generic devices
    pub fn generic_count(&self) -> usize {
        self.generics.len()
    }

    /// Number of actual devices
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

/// Incremental catalog construction with validation
#[derive(Debug, Default)]
pub struct LibraryBuilder {
    library: DeviceLibrary,
}

impl LibraryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generic device
    pub fn add_generic(&mut self, generic: GenericDevice) -> CatalogResult<GenericDeviceId> {
        if self.library.generic_index.contains_key(generic.name()) {
            return Err(CatalogError::DuplicateGeneric(generic.name().to_string()));
        }
        generic.check_unique_names()?;

        let id = GenericDeviceId(self.library.generics.len() as u32);
        self.library.generic_index.insert(generic.name().to_string(), id);
        self.library.generics.push(generic);
        Ok(id)
    }

    /// Register an actual device and its integrated children
    ///
    /// Children get the id `"<parent id>/<child id>"` and type INTEGRATED.
    pub fn add_device(&mut self, mut device: ActualDevice) -> CatalogResult<DeviceId> {
        let children = std::mem::take(&mut device.integrated);
        self.validate(&device)?;
        let mut staged = Vec::with_capacity(children.len());
        let mut staged_ids = BTreeSet::new();
        for mut child in children {
            if !child.integrated.is_empty() {
                return Err(CatalogError::IntegratedWiring { device: child.id });
            }
            child.id = format!("{}/{}", device.id, child.id);
            child.device_type = DeviceType::Integrated;
            if child.connections.iter().any(|c| c.kind != ConnectionKind::Integrated) {
                return Err(CatalogError::IntegratedWiring { device: child.id });
            }
            self.validate(&child)?;
            if !staged_ids.insert(child.id.clone()) {
                return Err(CatalogError::DuplicateDevice(child.id));
            }
            staged.push(child);
        }

        let parent_id = self.push(device);
        for mut child in staged {
            child.parent = Some(parent_id);
            let child_id = self.push(child);
            self.library.devices[parent_id.index()].integrated_ids.push(child_id);
        }
        Ok(parent_id)
    }

    fn validate(&self, device: &ActualDevice) -> CatalogResult<()> {
        if self.library.device_index.contains_key(&device.id) {
            return Err(CatalogError::DuplicateDevice(device.id.clone()));
        }
        if device.compatibility.keys().any(|g| self.library.generic(*g).is_none()) {
            return Err(CatalogError::UnknownGeneric { device: device.id.clone() });
        }
        for connection in &device.connections {
            if let Some(port) = connection.ports.iter().find(|p| device.port(p).is_none()) {
                return Err(CatalogError::UnknownPort {
                    device: device.id.clone(),
                    connection: connection.name.clone(),
                    port: port.clone(),
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, device: ActualDevice) -> DeviceId {
        let id = DeviceId(self.library.devices.len() as u32);
        self.library.device_index.insert(device.id.clone(), id);
        self.library.devices.push(device);
        id
    }

    /// Finish the catalog
    pub fn build(self) -> DeviceLibrary {
        self.library
    }
}

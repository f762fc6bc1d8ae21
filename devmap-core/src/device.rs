//! Concrete hardware descriptors
//!
//! An [`ActualDevice`] is one vendor part: a controller board, a sensor
//! breakout, a motor driver. Besides its physical description (ports and
//! connections) it carries a compatibility map saying which generic devices it
//! implements and under which constraints.
//!
//! Sub-parts soldered onto a board (an on-board LED, a built-in IMU) are
//! *integrated devices*. They are declared nested in their parent and flattened
//! into their own catalog entries by the
//! [`LibraryBuilder`](crate::library::LibraryBuilder).

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::{ActionId, ConditionId, GenericDeviceId, ParameterId, Property, ValueId};
use crate::constraint::Constraint;
use crate::topology::{Connection, Direction, Port};

/// Interned catalog id of an actual device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub(crate) u32);

impl DeviceId {
    /// Position in the library
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Role of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    /// Main board running the generated firmware
    Controller,
    /// Wired add-on part
    Peripheral,
    /// Standalone part with its own connectivity
    Device,
    /// Sub-part fused with its parent
    Integrated,
    /// Software-only device, never wired
    Virtual,
}

/// Physical packaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum FormFactor {
    BreakoutBoard,
    Shield,
    Standalone,
    #[default]
    None,
}

/// Firmware target platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Platform {
    ArduinoAvr8,
    ArduinoEsp32,
    ArduinoEsp8266,
    ArduinoAtsamd21,
    ArduinoAtsamd51,
    Raspberrypi,
    MicropythonEsp32,
    MicropythonRpiPico,
}

/// Cloud service a part talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum CloudPlatform {
    Blynk,
    Netpie,
    AzureIothub,
    AzureCognitiveServices,
    AdafruitIo,
}

/// How a controller is wired to its peripherals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum WiringMethod {
    Wire,
    Grove,
    Mp,
    Inex,
}

/// Firmware class and external libraries used for one platform or cloud service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibraryBinding {
    /// Firmware class name
    pub classname: String,
    /// External library dependencies
    pub dependencies: Vec<String>,
}

impl LibraryBinding {
    /// Binding without external dependencies
    pub fn new(classname: impl Into<String>) -> Self {
        Self { classname: classname.into(), dependencies: Vec::new() }
    }

    /// Add an external dependency
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }
}

/// What a part supports of one generic device
///
/// Parameters missing from an action's map are unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compatibility {
    /// Project devices of this generic that may share one physical instance
    pub count: u32,
    /// Supported actions with per-parameter constraints
    pub actions: BTreeMap<ActionId, BTreeMap<ParameterId, Constraint>>,
    /// Supported conditions with per-parameter constraints
    pub conditions: BTreeMap<ConditionId, BTreeMap<ParameterId, Constraint>>,
    /// Supported values with their constraints
    pub values: BTreeMap<ValueId, Constraint>,
}

impl Default for Compatibility {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Compatibility {
    /// Empty entry
    pub fn new(count: u32) -> Self {
        Self {
            count,
            actions: BTreeMap::new(),
            conditions: BTreeMap::new(),
            values: BTreeMap::new(),
        }
    }

    /// Support an action
    pub fn with_action(
        mut self,
        action: ActionId,
        parameters: impl IntoIterator<Item = (ParameterId, Constraint)>,
    ) -> Self {
        self.actions.insert(action, parameters.into_iter().collect());
        self
    }

    /// Support a condition
    pub fn with_condition(
        mut self,
        condition: ConditionId,
        parameters: impl IntoIterator<Item = (ParameterId, Constraint)>,
    ) -> Self {
        self.conditions.insert(condition, parameters.into_iter().collect());
        self
    }

    /// Support a value
    pub fn with_value(mut self, value: ValueId, constraint: Constraint) -> Self {
        self.values.insert(value, constraint);
        self
    }
}

/// A concrete hardware part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualDevice {
    /// Library-unique id
    pub id: String,
    /// Manufacturer
    pub brand: String,
    /// Model name
    pub model: String,
    /// Product page
    pub url: String,
    /// Drawing width
    pub width: f64,
    /// Drawing height
    pub height: f64,
    /// Role of the part
    pub device_type: DeviceType,
    /// Packaging
    pub form_factor: FormFactor,
    /// Supported platforms with their firmware bindings
    pub platforms: BTreeMap<Platform, LibraryBinding>,
    /// Cloud service the part needs
    pub cloud_consume: Option<CloudPlatform>,
    /// Cloud services a controller can host
    pub cloud_platforms: BTreeMap<CloudPlatform, LibraryBinding>,
    /// PlatformIO board id (controllers)
    pub pio_boardid: Option<String>,
    /// Wiring method (controllers)
    pub wiring_method: Option<WiringMethod>,
    /// Physical ports
    pub ports: Vec<Port>,
    /// Port groups
    pub connections: Vec<Connection>,
    /// Implemented generic devices
    pub compatibility: BTreeMap<GenericDeviceId, Compatibility>,
    /// Device-level configuration
    pub properties: Vec<Property>,
    /// Nested sub-parts, moved into the catalog on build
    pub integrated: Vec<ActualDevice>,
    #[serde(skip)]
    pub(crate) parent: Option<DeviceId>,
    #[serde(skip)]
    pub(crate) integrated_ids: Vec<DeviceId>,
}

impl ActualDevice {
    /// Part with only identity fields set
    pub fn new(
        id: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            id: id.into(),
            brand: brand.into(),
            model: model.into(),
            url: String::new(),
            width: 0.0,
            height: 0.0,
            device_type,
            form_factor: FormFactor::None,
            platforms: BTreeMap::new(),
            cloud_consume: None,
            cloud_platforms: BTreeMap::new(),
            pio_boardid: None,
            wiring_method: None,
            ports: Vec::new(),
            connections: Vec::new(),
            compatibility: BTreeMap::new(),
            properties: Vec::new(),
            integrated: Vec::new(),
            parent: None,
            integrated_ids: Vec::new(),
        }
    }

    /// Support a platform
    pub fn with_platform(mut self, platform: Platform, binding: LibraryBinding) -> Self {
        self.platforms.insert(platform, binding);
        self
    }

    /// Add a port
    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Add a connection
    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Implement a generic device
    pub fn with_compatibility(mut self, generic: GenericDeviceId, entry: Compatibility) -> Self {
        self.compatibility.insert(generic, entry);
        self
    }

    /// Declare a property
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Require a cloud service
    pub fn with_cloud_consume(mut self, cloud: CloudPlatform) -> Self {
        self.cloud_consume = Some(cloud);
        self
    }

    /// Host a cloud service (controllers)
    pub fn with_cloud_platform(mut self, cloud: CloudPlatform, binding: LibraryBinding) -> Self {
        self.cloud_platforms.insert(cloud, binding);
        self
    }

    /// Attach an integrated sub-part
    pub fn with_integrated(mut self, device: ActualDevice) -> Self {
        self.integrated.push(device);
        self
    }

    /// Set controller build metadata
    pub fn with_board(mut self, pio_boardid: impl Into<String>, wiring: WiringMethod) -> Self {
        self.pio_boardid = Some(pio_boardid.into());
        self.wiring_method = Some(wiring);
        self
    }

    /// Brand and model
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    /// Main board
    pub fn is_controller(&self) -> bool {
        self.device_type == DeviceType::Controller
    }

    /// Fused with a parent
    pub fn is_integrated(&self) -> bool {
        self.parent.is_some() || self.device_type == DeviceType::Integrated
    }

    /// Parent of an integrated device
    pub fn parent(&self) -> Option<DeviceId> {
        self.parent
    }

    /// Catalog ids of the integrated sub-parts
    pub fn integrated_devices(&self) -> &[DeviceId] {
        &self.integrated_ids
    }

    /// Declared platform support (integrated devices defer to the parent)
    pub fn supports_platform(&self, platform: Platform) -> bool {
        self.platforms.contains_key(&platform)
    }

    /// Compatibility entry for a generic device
    pub fn compatibility(&self, generic: GenericDeviceId) -> Option<&Compatibility> {
        self.compatibility.get(&generic)
    }

    /// Port by name
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Connection by name and direction
    pub fn connection(&self, name: &str, direction: Direction) -> Option<&Connection> {
        self.connections.iter().find(|c| c.name == name && c.direction == direction)
    }

    /// Connections this part requires
    pub fn consume_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| c.is_consume())
    }

    /// Connections this part offers
    pub fn provide_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| c.is_provide())
    }

    /// Has consume connections that must be wired
    pub fn needs_wiring(&self) -> bool {
        self.device_type != DeviceType::Virtual && self.consume_connections().next().is_some()
    }

    /// Property by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for ActualDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.brand, self.model)
    }
}

//! Library loading
//!
//! Turns [`document`](crate::document) shapes into core types and feeds them to
//! a [`LibraryBuilder`]. Generic devices go first; actual devices resolve their
//! compatibility entries by name against them.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use devmap_core::{
    Action, ActualDevice, Compatibility, Connection, Constraint, DeviceLibrary, DeviceType,
    GenericDevice, GenericDeviceId, LibraryBinding, LibraryBuilder, Parameter, ParameterId, Port,
    Property, Value,
};
use serde::de::DeserializeOwned;

use crate::document::{
    default_value, parse_error, ActionDoc, CompatibilityDoc, ConnectionDoc, DeviceDoc, GenericDoc,
    IntegratedDoc, ParameterDoc, PortDoc, SupportDoc,
};
use crate::{LibraryError, LibraryResult};

/// File holding the array of generic devices
pub const GENERIC_FILE: &str = "generic_device.json";

/// Directory holding one file per actual device
pub const DEVICE_DIR: &str = "devices";

/// Generic devices by name, kept beside the builder for name resolution
type GenericIndex = HashMap<String, (GenericDeviceId, GenericDevice)>;

/// Load a library directory laid out as `generic_device.json` plus `devices/*.json`
///
/// Device files load in file-name order. Files without a `.json` extension
/// are skipped.
pub fn load_dir(path: impl AsRef<Path>) -> LibraryResult<DeviceLibrary> {
    let root = path.as_ref();
    let generics: Vec<GenericDoc> = parse(GENERIC_FILE, &read(&root.join(GENERIC_FILE))?)?;

    let device_dir = root.join(DEVICE_DIR);
    let mut paths = fs::read_dir(&device_dir)
        .map_err(|e| io_error(&device_dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| io_error(&device_dir, e)))
        .collect::<LibraryResult<Vec<_>>>()?;
    paths.sort();

    let mut devices = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
            log::debug!("Skipping {}: not a JSON device file", path.display());
            continue;
        }
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        devices.push(parse::<DeviceDoc>(&name, &read(&path)?)?);
    }

    let library = build(&generics, devices)?;
    log::info!(
        "Loaded {} generic devices and {} devices from {}",
        library.generic_count(),
        library.device_count(),
        root.display()
    );
    Ok(library)
}

/// Load a library from in-memory documents
pub fn load_str(generic_json: &str, device_json: &[&str]) -> LibraryResult<DeviceLibrary> {
    let generics: Vec<GenericDoc> = parse(GENERIC_FILE, generic_json)?;
    let devices = device_json
        .iter()
        .enumerate()
        .map(|(i, json)| parse::<DeviceDoc>(&format!("device #{}", i), json))
        .collect::<LibraryResult<Vec<_>>>()?;
    build(&generics, devices)
}

/// Build a catalog from parsed documents
pub(crate) fn build(
    generics: &[GenericDoc],
    devices: impl IntoIterator<Item = DeviceDoc>,
) -> LibraryResult<DeviceLibrary> {
    let mut builder = LibraryBuilder::new();
    let mut index = GenericIndex::new();
    for doc in generics {
        let generic = generic_device(doc)?;
        let id = builder.add_generic(generic.clone())?;
        index.insert(doc.name.clone(), (id, generic));
    }
    for doc in devices {
        builder.add_device(actual_device(doc, &index)?)?;
    }
    Ok(builder.build())
}

pub(crate) fn parse<T: DeserializeOwned>(document: &str, json: &str) -> LibraryResult<T> {
    serde_json::from_str(json).map_err(|e| parse_error(document, e.to_string()))
}

fn read(path: &Path) -> LibraryResult<String> {
    fs::read_to_string(path).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, err: std::io::Error) -> LibraryError {
    LibraryError::Io { path: path.display().to_string(), reason: err.to_string() }
}

fn generic_device(doc: &GenericDoc) -> LibraryResult<GenericDevice> {
    let mut generic = GenericDevice::new(&doc.name, doc.kind).with_description(&doc.description);
    for action in &doc.action {
        generic = generic.with_action(action_from(action, &doc.name)?);
    }
    for condition in &doc.condition {
        generic = generic.with_condition(action_from(condition, &doc.name)?);
    }
    for value in &doc.value {
        let constraint = value.constraint.to_constraint(value.datatype, &doc.name)?;
        generic = generic.with_value(Value::new(&value.name, value.datatype, constraint));
    }
    Ok(generic)
}

fn action_from(doc: &ActionDoc, document: &str) -> LibraryResult<Action> {
    doc.parameter.iter().try_fold(Action::new(&doc.name), |action, parameter| {
        Ok(action.with_parameter(parameter_from(parameter, document)?))
    })
}

fn parameter_from(doc: &ParameterDoc, document: &str) -> LibraryResult<Parameter> {
    let constraint = doc.constraint.to_constraint(doc.datatype, document)?;
    let default = default_value(doc.datatype, &doc.value, &constraint, document)?;
    Ok(Parameter::new(&doc.name, doc.datatype, default, constraint, doc.control())?)
}

fn property_from(doc: &ParameterDoc, document: &str) -> LibraryResult<Property> {
    let constraint = doc.constraint.to_constraint(doc.datatype, document)?;
    let default = default_value(doc.datatype, &doc.value, &constraint, document)?;
    let property = Property::new(&doc.name, doc.datatype, default, constraint, doc.control());
    Ok(if doc.optional { property.optional() } else { property })
}

fn actual_device(doc: DeviceDoc, generics: &GenericIndex) -> LibraryResult<ActualDevice> {
    if doc.device_type == DeviceType::Controller {
        if doc.pio_boardid.is_none() {
            return Err(LibraryError::MissingField { device: doc.id, field: "pio_boardid" });
        }
        if doc.wiring_method.is_none() {
            return Err(LibraryError::MissingField { device: doc.id, field: "wiring_method" });
        }
    }

    let mut device = ActualDevice::new(&doc.id, &doc.brand, &doc.model, doc.device_type);
    device.url = doc.url;
    device.width = doc.width;
    device.height = doc.height;
    device.form_factor = doc.formfactor;
    device.pio_boardid = doc.pio_boardid;
    device.wiring_method = doc.wiring_method;
    device.cloud_consume = doc.cloud_platform;
    for platform in &doc.platforms {
        device.platforms.insert(platform.platform, binding(&platform.classname, &platform.library_dependency));
    }
    for cloud in &doc.support_cloudplatform {
        device.cloud_platforms.insert(cloud.cloud_platform, binding(&cloud.classname, &cloud.library_dependency));
    }
    device.ports = doc.port.iter().map(port_from).collect();
    device.connections = doc.connection.iter().map(connection_from).collect();
    device.properties = doc
        .property
        .iter()
        .map(|p| property_from(p, &doc.id))
        .collect::<LibraryResult<_>>()?;
    device.compatibility = compatibility(&doc.id, &doc.compatibility, generics)?;
    device.integrated = doc
        .integrated_device
        .iter()
        .map(|child| integrated_device(&doc.id, &doc.brand, child, generics))
        .collect::<LibraryResult<_>>()?;
    Ok(device)
}

// The builder prefixes the id with the parent's and retypes the child.
fn integrated_device(
    parent: &str,
    brand: &str,
    doc: &IntegratedDoc,
    generics: &GenericIndex,
) -> LibraryResult<ActualDevice> {
    let model = doc.model.clone().unwrap_or_else(|| doc.name.clone());
    let label = format!("{}/{}", parent, doc.name);
    let mut device = ActualDevice::new(&doc.name, brand, model, DeviceType::Integrated);
    for platform in &doc.platforms {
        device.platforms.insert(platform.platform, binding(&platform.classname, &platform.library_dependency));
    }
    device.ports = doc.port.iter().map(port_from).collect();
    device.connections = doc.connection.iter().map(connection_from).collect();
    device.properties = doc
        .property
        .iter()
        .map(|p| property_from(p, &label))
        .collect::<LibraryResult<_>>()?;
    device.compatibility = compatibility(&label, &doc.compatibility, generics)?;
    Ok(device)
}

fn binding(classname: &str, dependencies: &[String]) -> LibraryBinding {
    dependencies
        .iter()
        .fold(LibraryBinding::new(classname), |binding, dep| binding.with_dependency(dep.as_str()))
}

fn port_from(doc: &PortDoc) -> Port {
    let mut port = doc
        .function
        .iter()
        .fold(Port::new(&doc.name).at(doc.x, doc.y), |port, f| port.with_function(f.peripheral, f.pintype));
    if let (Some(min), Some(max)) = (doc.v_min, doc.v_max) {
        port = port.with_voltage(min, max);
    }
    if let Some(pin) = &doc.ref_to {
        port = port.with_ref(pin.as_str());
    }
    port
}

fn connection_from(doc: &ConnectionDoc) -> Connection {
    Connection {
        name: doc.name.clone(),
        kind: doc.kind,
        direction: doc.direction,
        ports: doc.pins.clone(),
    }
}

fn compatibility(
    device: &str,
    docs: &[CompatibilityDoc],
    generics: &GenericIndex,
) -> LibraryResult<BTreeMap<GenericDeviceId, Compatibility>> {
    let mut map = BTreeMap::new();
    for doc in docs {
        let (id, generic) = generics
            .get(&doc.name)
            .ok_or_else(|| unknown(device, "generic device", &doc.name))?;
        let mut entry = Compatibility::new(doc.count);

        for support in &doc.action {
            if let Some(action_id) = generic.action_id(&support.name) {
                let action = generic.action(action_id).ok_or_else(|| unknown(device, "action", &support.name))?;
                entry.actions.insert(action_id, supported_parameters(device, action, support)?);
            } else if let Some(condition_id) = generic.condition_id(&support.name) {
                let condition = generic
                    .condition(condition_id)
                    .ok_or_else(|| unknown(device, "condition", &support.name))?;
                entry.conditions.insert(condition_id, supported_parameters(device, condition, support)?);
            } else {
                return Err(unknown(device, "action", &support.name));
            }
        }
        for support in &doc.condition {
            let (condition_id, condition) = generic
                .condition_id(&support.name)
                .and_then(|id| generic.condition(id).map(|c| (id, c)))
                .ok_or_else(|| unknown(device, "condition", &support.name))?;
            entry.conditions.insert(condition_id, supported_parameters(device, condition, support)?);
        }
        for support in &doc.value {
            let (value_id, value) = generic
                .value_id(&support.name)
                .and_then(|id| generic.value(id).map(|v| (id, v)))
                .ok_or_else(|| unknown(device, "value", &support.name))?;
            entry.values.insert(value_id, support.constraint.to_constraint(value.data_type(), device)?);
        }
        map.insert(*id, entry);
    }
    Ok(map)
}

fn supported_parameters(
    device: &str,
    owner: &Action,
    support: &SupportDoc,
) -> LibraryResult<BTreeMap<ParameterId, Constraint>> {
    support
        .parameter
        .iter()
        .map(|doc| {
            let id = owner
                .parameter_id(&doc.name)
                .ok_or_else(|| unknown(device, "parameter", &format!("{}.{}", owner.name(), doc.name)))?;
            let data_type = owner.parameter(id).map(|p| p.data_type()).ok_or_else(|| unknown(device, "parameter", &doc.name))?;
            Ok((id, doc.constraint.to_constraint(data_type, device)?))
        })
        .collect()
}

fn unknown(device: &str, kind: &'static str, name: &str) -> LibraryError {
    LibraryError::UnknownReference { device: device.to_string(), kind, name: name.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devmap_core::{ActionId, Constraint, ParameterId, Platform, Unit, WiringMethod};

    const GENERICS: &str = r#"[
        {
            "name": "LED",
            "type": "ACTUATOR",
            "action": [
                {
                    "name": "On",
                    "parameter": [
                        {
                            "name": "brightness",
                            "datatype": "INTEGER",
                            "value": 100,
                            "constraint": {"min": 0, "max": 100, "unit": "NOT_SPECIFIED"},
                            "controltype": ["SLIDER"]
                        }
                    ]
                },
                {"name": "Off"}
            ]
        },
        {
            "name": "Button",
            "type": "SENSOR",
            "condition": [{"name": "Press"}]
        }
    ]"#;

    const LED: &str = r#"{
        "id": "led_5mm",
        "brand": "Generic",
        "model": "5mm LED",
        "type": "PERIPHERAL",
        "platforms": [{"platform": "ARDUINO_AVR8", "classname": "MP_Led"}],
        "port": [
            {"name": "IN", "function": [{"type": "GPIO", "pintype": "DIGITAL_IN"}], "v_min": 0, "v_max": 5.5},
            {"name": "GND", "function": [{"type": "POWER", "pintype": "GND"}]}
        ],
        "connection": [{"name": "IN", "type": "WIRE", "direction": "CONSUME", "pins": ["IN", "GND"]}],
        "compatibility": [
            {
                "name": "LED",
                "action": [
                    {"name": "On", "parameter": [{"name": "brightness", "constraint": {"min": 0, "max": 255, "unit": "NOT_SPECIFIED"}}]},
                    {"name": "Off"}
                ]
            }
        ]
    }"#;

    #[test]
    fn names_resolve_to_ids() {
        let library = load_str(GENERICS, &[LED]).unwrap();
        let led = library.find_generic("LED").unwrap();
        let part = library.device(library.find_device("led_5mm").unwrap()).unwrap();

        let entry = part.compatibility(led).unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(
            entry.actions[&ActionId(0)][&ParameterId(0)],
            Constraint::numeric(0.0, 255.0, Unit::NotSpecified).unwrap()
        );
        assert!(entry.actions[&ActionId(1)].is_empty());
        assert!(part.supports_platform(Platform::ArduinoAvr8));
        assert_eq!(part.port("IN").unwrap().voltage.map(|v| v.max), Some(5.5));
    }

    #[test]
    fn condition_listed_under_action_is_a_condition() {
        let button = r#"{
            "id": "button", "brand": "Generic", "model": "Tactile", "type": "PERIPHERAL",
            "compatibility": [{"name": "Button", "action": [{"name": "Press"}]}]
        }"#;
        let library = load_str(GENERICS, &[button]).unwrap();
        let generic = library.find_generic("Button").unwrap();
        let part = library.device(library.find_device("button").unwrap()).unwrap();
        let entry = part.compatibility(generic).unwrap();
        assert!(entry.actions.is_empty());
        assert_eq!(entry.conditions.len(), 1);
    }

    #[test]
    fn controller_needs_board_metadata() {
        let board = r#"{"id": "uno", "brand": "Arduino", "model": "Uno", "type": "CONTROLLER", "wiring_method": "WIRE"}"#;
        assert_eq!(
            load_str(GENERICS, &[board]).unwrap_err(),
            LibraryError::MissingField { device: "uno".into(), field: "pio_boardid" }
        );

        let board = r#"{"id": "uno", "brand": "Arduino", "model": "Uno", "type": "CONTROLLER", "pio_boardid": "uno"}"#;
        assert_eq!(
            load_str(GENERICS, &[board]).unwrap_err(),
            LibraryError::MissingField { device: "uno".into(), field: "wiring_method" }
        );

        let board = r#"{"id": "uno", "brand": "Arduino", "model": "Uno", "type": "CONTROLLER",
                        "pio_boardid": "uno", "wiring_method": "WIRE"}"#;
        let library = load_str(GENERICS, &[board]).unwrap();
        let uno = library.device(library.find_device("uno").unwrap()).unwrap();
        assert_eq!(uno.wiring_method, Some(WiringMethod::Wire));
    }

    #[test]
    fn unknown_names_fail_the_load() {
        let wrong_generic = LED.replace(r#""name": "LED","#, r#""name": "Lamp","#);
        assert!(matches!(
            load_str(GENERICS, &[&wrong_generic]),
            Err(LibraryError::UnknownReference { kind: "generic device", .. })
        ));

        let wrong_param = LED.replace(r#""name": "brightness""#, r#""name": "level""#);
        assert!(matches!(
            load_str(GENERICS, &[&wrong_param]),
            Err(LibraryError::UnknownReference { kind: "parameter", .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(load_str("[{", &[]), Err(LibraryError::Parse { .. })));
        assert!(matches!(
            load_str(GENERICS, &[r#"{"id": "x"}"#]),
            Err(LibraryError::Parse { document, .. }) if document == "device #0"
        ));
    }

    #[test]
    fn dangling_port_is_a_catalog_error() {
        let broken = LED.replace(r#""pins": ["IN", "GND"]"#, r#""pins": ["IN", "VCC"]"#);
        assert!(matches!(load_str(GENERICS, &[&broken]), Err(LibraryError::Catalog(_))));
    }
}

//! Common fixtures for integration tests
//!
//! This module provides:
//! - A small catalog: one controller with GPIO, I2C and an on-board LED
//! - LED parts with different brightness ranges
//! - An I2C temperature sensor
//! - Helpers to record program usage on project devices

#![allow(dead_code)]

pub mod scenarios;

use devmap_core::{
    Action, ActionId, ActualDevice, Compatibility, Connection, ConnectionKind, Constraint,
    ControlType, DataType, DeviceId, DeviceLibrary, DeviceType, Direction, GenericDevice,
    GenericDeviceId, GenericKind, LibraryBinding, Parameter, ParamValue, ParameterId, Peripheral,
    PinRole, Platform, Port, Project, ProjectDeviceId, Unit, Value, ValueId, WiringMethod,
};

/// Catalog with the ids tests refer to
pub struct Catalog {
    pub library: DeviceLibrary,
    pub led: GenericDeviceId,
    pub temperature: GenericDeviceId,
    pub uno: DeviceId,
    pub builtin_led: DeviceId,
    pub led_255: DeviceId,
    pub led_50: DeviceId,
    pub bme280: DeviceId,
}

pub const ON: ActionId = ActionId(0);
pub const OFF: ActionId = ActionId(1);
pub const BRIGHTNESS: ParameterId = ParameterId(0);
pub const READING: ValueId = ValueId(0);

fn range(min: f64, max: f64, unit: Unit) -> Constraint {
    Constraint::numeric(min, max, unit).expect("valid range")
}

pub fn led_generic() -> GenericDevice {
    let brightness = Parameter::new(
        "brightness",
        DataType::Integer,
        ParamValue::number(100.0),
        range(0.0, 100.0, Unit::NotSpecified),
        ControlType::Slider,
    )
    .expect("default in range");
    GenericDevice::new("LED", GenericKind::Actuator)
        .with_action(Action::new("On").with_parameter(brightness))
        .with_action(Action::new("Off"))
}

pub fn temperature_generic() -> GenericDevice {
    GenericDevice::new("Temperature", GenericKind::Sensor).with_value(Value::new(
        "Temperature",
        DataType::Double,
        range(-40.0, 85.0, Unit::Celsius),
    ))
}

pub fn controller(led: GenericDeviceId) -> ActualDevice {
    let builtin = ActualDevice::new("led", "Arduino", "On-board LED", DeviceType::Peripheral)
        .with_connection(Connection::integrated("LED_BUILTIN", Direction::Consume))
        .with_compatibility(led, led_support(255.0));

    ActualDevice::new("uno", "Arduino", "Uno R3", DeviceType::Controller)
        .with_platform(Platform::ArduinoAvr8, LibraryBinding::new("MP_ArduinoUno"))
        .with_board("uno", WiringMethod::Wire)
        .with_port(Port::new("5V").with_function(Peripheral::Power, PinRole::Vcc).with_voltage(5.0, 5.0))
        .with_port(Port::new("GND").with_function(Peripheral::Power, PinRole::Gnd))
        .with_port(Port::new("D2").with_function(Peripheral::Gpio, PinRole::DigitalOut).with_voltage(0.0, 5.0))
        .with_port(Port::new("D3").with_function(Peripheral::Gpio, PinRole::DigitalOut).with_voltage(0.0, 5.0))
        .with_port(Port::new("A4").with_function(Peripheral::I2c, PinRole::Sda).with_voltage(0.0, 5.0))
        .with_port(Port::new("A5").with_function(Peripheral::I2c, PinRole::Scl).with_voltage(0.0, 5.0))
        .with_connection(Connection::provide("D2", ConnectionKind::Wire, &["D2", "GND"]))
        .with_connection(Connection::provide("D3", ConnectionKind::Wire, &["D3", "GND"]))
        .with_connection(Connection::provide("I2C", ConnectionKind::Wire, &["5V", "GND", "A4", "A5"]))
        .with_connection(Connection::integrated("LED_BUILTIN", Direction::Provide))
        .with_integrated(builtin)
}

fn led_support(max: f64) -> Compatibility {
    Compatibility::new(1)
        .with_action(ON, [(BRIGHTNESS, range(0.0, max, Unit::NotSpecified))])
        .with_action(OFF, [])
}

pub fn led_part(id: &str, model: &str, max: f64, led: GenericDeviceId) -> ActualDevice {
    ActualDevice::new(id, "Generic", model, DeviceType::Peripheral)
        .with_platform(Platform::ArduinoAvr8, LibraryBinding::new("MP_Led"))
        .with_port(Port::new("IN").with_function(Peripheral::Gpio, PinRole::DigitalIn).with_voltage(0.0, 5.5))
        .with_port(Port::new("GND").with_function(Peripheral::Power, PinRole::Gnd))
        .with_connection(Connection::consume("IN", ConnectionKind::Wire, &["IN", "GND"]))
        .with_compatibility(led, led_support(max))
}

pub fn i2c_sensor(id: &str, temperature: GenericDeviceId) -> ActualDevice {
    ActualDevice::new(id, "Bosch", "BME280", DeviceType::Peripheral)
        .with_platform(Platform::ArduinoAvr8, LibraryBinding::new("MP_BME280"))
        .with_port(Port::new("VCC").with_function(Peripheral::Power, PinRole::Vcc).with_voltage(3.3, 5.5))
        .with_port(Port::new("GND").with_function(Peripheral::Power, PinRole::Gnd))
        .with_port(Port::new("SDA").with_function(Peripheral::I2c, PinRole::Sda).with_voltage(0.0, 5.5))
        .with_port(Port::new("SCL").with_function(Peripheral::I2c, PinRole::Scl).with_voltage(0.0, 5.5))
        .with_connection(Connection::consume("I2C", ConnectionKind::Wire, &["VCC", "GND", "SDA", "SCL"]))
        .with_compatibility(
            temperature,
            Compatibility::new(1).with_value(READING, range(-40.0, 85.0, Unit::Celsius)),
        )
}

impl Catalog {
    pub fn new() -> Self {
        let mut builder = DeviceLibrary::builder();
        let led = builder.add_generic(led_generic()).unwrap();
        let temperature = builder.add_generic(temperature_generic()).unwrap();
        let uno = builder.add_device(controller(led)).unwrap();
        let led_255 = builder.add_device(led_part("led_255", "PWM LED", 255.0, led)).unwrap();
        let led_50 = builder.add_device(led_part("led_50", "Mini LED", 50.0, led)).unwrap();
        let bme280 = builder.add_device(i2c_sensor("bme280", temperature)).unwrap();
        let library = builder.build();
        let builtin_led = library.find_device("uno/led").unwrap();
        Self { library, led, temperature, uno, builtin_led, led_255, led_50, bme280 }
    }

    /// Empty project on the Uno
    pub fn project(&self) -> Project {
        let mut project = Project::new("test", Platform::ArduinoAvr8);
        project.set_controller(&self.library, Some(self.uno)).unwrap();
        project
    }
}

/// Record `On(brightness)` with the given range
pub fn use_on(project: &mut Project, device: ProjectDeviceId, min: f64, max: f64) {
    let usage = project.usage_mut(device).unwrap();
    usage.use_action(ON);
    usage
        .record_action_parameter(ON, BRIGHTNESS, range(min, max, Unit::NotSpecified))
        .unwrap();
}

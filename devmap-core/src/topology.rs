//! Connection Topology: Ports, Pin Roles and Consume/Provide Matching
//!
//! ## Overview
//!
//! Every device exposes ports (physical pins or pads). Ports are grouped into
//! named connections. A controller *provides* connections; a peripheral
//! *consumes* them:
//!
//! ```text
//!   controller                         BME280 breakout
//!   ┌──────────────┐  provide "I2C"    consume "I2C"  ┌──────────┐
//!   │ 5V  ─────────┼────────────────────────────────── │ VCC      │
//!   │ GND ─────────┼────────────────────────────────── │ GND      │
//!   │ A4 (SDA) ────┼────────────────────────────────── │ SDA      │
//!   │ A5 (SCL) ────┼────────────────────────────────── │ SCL      │
//!   └──────────────┘                                   └──────────┘
//! ```
//!
//! ## Matching Rules
//!
//! A provide connection can serve a consume connection when:
//!
//! 1. both use the same [`ConnectionKind`] (a Grove plug needs a Grove socket)
//! 2. INTEGRATED connections match by name and carry no pins
//! 3. both list the same number of ports
//! 4. at position `k`, every function of the consumer port finds a provider
//!    function on the same peripheral whose role it can consume
//! 5. the provider port's voltage lies within what the consumer port tolerates
//!
//! The outcome of a match is the list of [`PinClaim`]s the consumer would take
//! on the provider's physical pins. Shareable roles (power and bus lines) can be
//! claimed by any number of consumers; everything else is exclusive.

use serde::{Deserialize, Serialize};

use crate::wiring::PinClaim;

/// Peripheral a port function belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Peripheral {
    Gpio,
    Analog,
    Pwm,
    Interrupt,
    I2c,
    Spi,
    Uart,
    OneWire,
    Power,
}

/// Electrical role of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum PinRole {
    Vcc,
    Gnd,
    Sda,
    Scl,
    Mosi,
    Miso,
    Sck,
    Ss,
    Rx,
    Tx,
    DigitalIn,
    DigitalOut,
    AnalogIn,
    AnalogOut,
    PwmIn,
    PwmOut,
    Interrupt,
    Aref,
    NoFunction,
}

impl PinRole {
    /// Provider roles that can feed a consumer pin with this role
    pub fn possible_consume(self) -> &'static [PinRole] {
        use PinRole::*;
        match self {
            Vcc => &[Vcc],
            Gnd => &[Gnd],
            Sda => &[Sda],
            Scl => &[Scl],
            Mosi => &[Mosi],
            Miso => &[Miso],
            Sck => &[Sck],
            Ss => &[Ss],
            Rx => &[Tx],
            Tx => &[Rx],
            DigitalIn => &[DigitalOut],
            DigitalOut => &[DigitalIn],
            AnalogIn => &[AnalogOut],
            AnalogOut => &[AnalogIn],
            PwmIn => &[PwmOut],
            PwmOut => &[PwmIn],
            Interrupt => &[Interrupt],
            Aref => &[],
            NoFunction => &[
                Vcc, Gnd, Sda, Scl, Mosi, Miso, Sck, Ss, Rx, Tx, DigitalIn, DigitalOut, AnalogIn,
                AnalogOut, PwmIn, PwmOut, Interrupt, Aref, NoFunction,
            ],
        }
    }

    /// Several consumers may share a pin used in this role
    pub fn is_shareable(self) -> bool {
        matches!(
            self,
            PinRole::Vcc
                | PinRole::Gnd
                | PinRole::Sda
                | PinRole::Scl
                | PinRole::Mosi
                | PinRole::Miso
                | PinRole::Sck
                | PinRole::NoFunction
        )
    }
}

/// One (peripheral, role) pair a port can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortFunction {
    /// Peripheral
    pub peripheral: Peripheral,
    /// Pin role
    pub role: PinRole,
}

impl PortFunction {
    /// Create a function
    pub fn new(peripheral: Peripheral, role: PinRole) -> Self {
        Self { peripheral, role }
    }

    /// `self` (a consumer function) can be fed by `provider`
    pub fn can_consume(&self, provider: &PortFunction) -> bool {
        (self.peripheral == provider.peripheral || self.role == PinRole::NoFunction)
            && self.role.possible_consume().contains(&provider.role)
    }
}

/// Inclusive voltage window of a port
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageRange {
    /// Lowest level in volts
    pub min: f64,
    /// Highest level in volts
    pub max: f64,
}

impl VoltageRange {
    /// Create a window
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Consumer window tolerates every level of `provided`
    pub fn tolerates(&self, provided: &VoltageRange) -> bool {
        self.min <= provided.min && provided.max <= self.max
    }
}

/// Physical pin or pad of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within the device
    pub name: String,
    /// Horizontal position on the device image
    pub x: f64,
    /// Vertical position on the device image
    pub y: f64,
    /// Electrical window, if declared
    pub voltage: Option<VoltageRange>,
    /// Physical pin this port is routed to, if it shares one with other ports
    pub ref_to: Option<String>,
    /// Functions the port can serve
    pub functions: Vec<PortFunction>,
}

impl Port {
    /// Port with no position, voltage or functions
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), x: 0.0, y: 0.0, voltage: None, ref_to: None, functions: Vec::new() }
    }

    /// Add a function
    pub fn with_function(mut self, peripheral: Peripheral, role: PinRole) -> Self {
        self.functions.push(PortFunction::new(peripheral, role));
        self
    }

    /// Set the voltage window
    pub fn with_voltage(mut self, min: f64, max: f64) -> Self {
        self.voltage = Some(VoltageRange::new(min, max));
        self
    }

    /// Route to a shared physical pin
    pub fn with_ref(mut self, pin: impl Into<String>) -> Self {
        self.ref_to = Some(pin.into());
        self
    }

    /// Set the drawing position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Name of the physical pin this port occupies
    pub fn physical_pin(&self) -> &str {
        self.ref_to.as_deref().unwrap_or(&self.name)
    }
}

/// Physical connector family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionKind {
    /// Loose jumper wires
    Wire,
    /// Seeed Grove connector
    Grove,
    /// MakerPlayground port
    Mp,
    /// INEX connector
    Inex,
    /// Logically fused with the parent device, no wiring
    Integrated,
}

/// Side of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Offered by a host
    Provide,
    /// Required by a peripheral
    Consume,
}

/// Named group of ports wired as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Name, unique within the device and direction
    pub name: String,
    /// Connector family
    pub kind: ConnectionKind,
    /// Provide or consume
    pub direction: Direction,
    /// Port names in pin order
    pub ports: Vec<String>,
}

impl Connection {
    /// Provide connection
    pub fn provide(name: impl Into<String>, kind: ConnectionKind, ports: &[&str]) -> Self {
        Self::build(name, kind, Direction::Provide, ports)
    }

    /// Consume connection
    pub fn consume(name: impl Into<String>, kind: ConnectionKind, ports: &[&str]) -> Self {
        Self::build(name, kind, Direction::Consume, ports)
    }

    /// INTEGRATED connection; no ports
    pub fn integrated(name: impl Into<String>, direction: Direction) -> Self {
        Self { name: name.into(), kind: ConnectionKind::Integrated, direction, ports: Vec::new() }
    }

    fn build(name: impl Into<String>, kind: ConnectionKind, direction: Direction, ports: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind,
            direction,
            ports: ports.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Provide side
    pub fn is_provide(&self) -> bool {
        self.direction == Direction::Provide
    }

    /// Consume side
    pub fn is_consume(&self) -> bool {
        self.direction == Direction::Consume
    }
}

/// Pin claims a consume connection would take on a provide connection, or
/// `None` when the pair does not match.
///
/// `consumer_ports` and `provider_ports` resolve port names of the respective
/// device.
pub fn match_connection<'a>(
    consume: &Connection,
    consumer_ports: impl Fn(&str) -> Option<&'a Port>,
    provide: &Connection,
    provider_ports: impl Fn(&str) -> Option<&'a Port>,
) -> Option<Vec<PinClaim>> {
    if !consume.is_consume() || !provide.is_provide() || consume.kind != provide.kind {
        return None;
    }
    if consume.kind == ConnectionKind::Integrated {
        return (consume.name == provide.name).then(Vec::new);
    }
    if consume.ports.len() != provide.ports.len() {
        return None;
    }

    let mut claims = Vec::with_capacity(consume.ports.len());
    for (consumer_name, provider_name) in consume.ports.iter().zip(&provide.ports) {
        let consumer = consumer_ports(consumer_name)?;
        let provider = provider_ports(provider_name)?;

        if let (Some(tolerated), Some(provided)) = (&consumer.voltage, &provider.voltage) {
            if !tolerated.tolerates(provided) {
                return None;
            }
        }

        // Every consumer function must be served; the first serving provider
        // function fixes the role claimed on the physical pin.
        let mut role = None;
        for function in &consumer.functions {
            let served = provider.functions.iter().find(|p| function.can_consume(p))?;
            role.get_or_insert(served.role);
        }
        let role = role.unwrap_or(PinRole::NoFunction);
        claims.push(PinClaim::new(provider.physical_pin(), role));
    }
    Some(claims)
}

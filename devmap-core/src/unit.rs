//! Measurement units attached to numeric constraints
//!
//! Units are compared by identity only. A range declared in `°C` never covers a
//! request in `°F`; the library is expected to declare every unit a part supports.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Unit of a numeric parameter, value or property
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum Unit {
    Time,
    #[serde(alias = "METERPERSECSQUARE")]
    MeterPerSecSquare,
    Hectopascal,
    Meter,
    Celsius,
    Fahrenheit,
    Kelvin,
    #[serde(alias = "RADIUSPERSEC")]
    RadianPerSec,
    #[serde(alias = "DEGREEPERSEC")]
    DegreePerSec,
    Decibel,
    Microtesla,
    Centimeter,
    Lux,
    Degree,
    Second,
    Millisecond,
    Wav,
    Number,
    Percent,
    NotSpecified,
    Hertz,
    Bpm,
}

impl Unit {
    /// Every unit, in declaration order
    pub const ALL: [Unit; 22] = [
        Unit::Time,
        Unit::MeterPerSecSquare,
        Unit::Hectopascal,
        Unit::Meter,
        Unit::Celsius,
        Unit::Fahrenheit,
        Unit::Kelvin,
        Unit::RadianPerSec,
        Unit::DegreePerSec,
        Unit::Decibel,
        Unit::Microtesla,
        Unit::Centimeter,
        Unit::Lux,
        Unit::Degree,
        Unit::Second,
        Unit::Millisecond,
        Unit::Wav,
        Unit::Number,
        Unit::Percent,
        Unit::NotSpecified,
        Unit::Hertz,
        Unit::Bpm,
    ];

    /// Short symbol shown next to a number in the UI
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Time => "",
            Unit::MeterPerSecSquare => "m/s²",
            Unit::Hectopascal => "hPa",
            Unit::Meter => "m",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::RadianPerSec => "rad/s",
            Unit::DegreePerSec => "°/s",
            Unit::Decibel => "dB",
            Unit::Microtesla => "µT",
            Unit::Centimeter => "cm",
            Unit::Lux => "lux",
            Unit::Degree => "°",
            Unit::Second => "s",
            Unit::Millisecond => "ms",
            Unit::Wav => "wav",
            Unit::Number => "",
            Unit::Percent => "%",
            Unit::NotSpecified => "",
            Unit::Hertz => "Hz",
            Unit::Bpm => "bpm",
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::NotSpecified
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

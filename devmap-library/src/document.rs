//! Serde shapes of the JSON library documents
//!
//! These structs mirror the files one to one. Nothing here resolves names;
//! the [`loader`](crate::loader) turns documents into core types once the
//! generic devices they refer to are known.

use std::collections::BTreeMap;

use devmap_core::{
    CloudPlatform, ConnectionKind, Constraint, ControlType, DataType, DeviceType, Direction,
    FormFactor, GenericKind, NumericConstraint, ParamValue, Peripheral, PinRole, Platform, Range,
    Unit, WiringMethod,
};
use serde::Deserialize;
use serde_json::Value as Json;

use crate::{LibraryError, LibraryResult};

/// Entry of `generic_device.json`
#[derive(Debug, Clone, Deserialize)]
pub struct GenericDoc {
    /// Unique name, referenced by compatibility entries
    pub name: String,
    /// Sensor, actuator, virtual, ...
    #[serde(rename = "type")]
    pub kind: GenericKind,
    /// Free text for the UI
    #[serde(default)]
    pub description: String,
    /// Actions, in declaration order
    #[serde(default)]
    pub action: Vec<ActionDoc>,
    /// Conditions, in declaration order
    #[serde(default)]
    pub condition: Vec<ActionDoc>,
    /// Values read from the device
    #[serde(default)]
    pub value: Vec<ValueDoc>,
}

/// Action or condition of a generic device
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDoc {
    /// Name, unique within its list
    pub name: String,
    /// Parameters, in declaration order
    #[serde(default)]
    pub parameter: Vec<ParameterDoc>,
}

/// Parameter or property declaration
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterDoc {
    /// Name, unique within its owner
    pub name: String,
    /// Declared type; decides how `value` and `constraint` are read
    pub datatype: DataType,
    /// Default value, shaped by `datatype`
    #[serde(default)]
    pub value: Json,
    /// Allowed values
    #[serde(default)]
    pub constraint: ConstraintDoc,
    /// Suggested UI controls, preferred first
    #[serde(default)]
    pub controltype: Vec<ControlType>,
    /// Properties only: hidden unless the user opts in
    #[serde(default)]
    pub optional: bool,
}

impl ParameterDoc {
    /// First listed control, `NONE` when the list is empty
    pub fn control(&self) -> ControlType {
        self.controltype.first().copied().unwrap_or_default()
    }
}

/// Value reported by a generic device
#[derive(Debug, Clone, Deserialize)]
pub struct ValueDoc {
    /// Name, unique within the generic device
    pub name: String,
    /// Declared type
    pub datatype: DataType,
    /// Full range the value can take
    #[serde(default)]
    pub constraint: ConstraintDoc,
}

/// One actual device file
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDoc {
    /// Catalog id, unique across the library
    pub id: String,
    pub brand: String,
    pub model: String,
    /// Product page
    #[serde(default)]
    pub url: String,
    /// Drawing width
    #[serde(default)]
    pub width: f64,
    /// Drawing height
    #[serde(default)]
    pub height: f64,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub formfactor: FormFactor,
    /// PlatformIO board id; required for controllers
    #[serde(default)]
    pub pio_boardid: Option<String>,
    /// Required for controllers
    #[serde(default)]
    pub wiring_method: Option<WiringMethod>,
    /// Cloud service the part needs
    #[serde(default)]
    pub cloud_platform: Option<CloudPlatform>,
    /// Supported platforms with their driver classes
    #[serde(default)]
    pub platforms: Vec<PlatformDoc>,
    /// Cloud services a controller hosts
    #[serde(default)]
    pub support_cloudplatform: Vec<CloudDoc>,
    #[serde(default)]
    pub port: Vec<PortDoc>,
    #[serde(default)]
    pub connection: Vec<ConnectionDoc>,
    /// Device-level settings
    #[serde(default)]
    pub property: Vec<ParameterDoc>,
    /// Generic devices this part can stand in for
    #[serde(default)]
    pub compatibility: Vec<CompatibilityDoc>,
    /// On-board parts, e.g. a built-in LED
    #[serde(default)]
    pub integrated_device: Vec<IntegratedDoc>,
}

/// Sub-part nested in a device file
///
/// Brand is inherited from the parent; the model defaults to the name.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegratedDoc {
    /// Id suffix; the catalog id is `parent/name`
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub platforms: Vec<PlatformDoc>,
    #[serde(default)]
    pub port: Vec<PortDoc>,
    #[serde(default)]
    pub connection: Vec<ConnectionDoc>,
    #[serde(default)]
    pub property: Vec<ParameterDoc>,
    #[serde(default)]
    pub compatibility: Vec<CompatibilityDoc>,
}

/// Driver binding for one platform
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformDoc {
    pub platform: Platform,
    /// Driver class the code generator instantiates
    pub classname: String,
    /// Libraries the driver needs
    #[serde(default)]
    pub library_dependency: Vec<String>,
}

/// Driver binding for one hosted cloud service
#[derive(Debug, Clone, Deserialize)]
pub struct CloudDoc {
    pub cloud_platform: CloudPlatform,
    pub classname: String,
    #[serde(default)]
    pub library_dependency: Vec<String>,
}

/// Physical port
#[derive(Debug, Clone, Deserialize)]
pub struct PortDoc {
    /// Name, unique within the device
    pub name: String,
    /// Position on the drawing
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Lowest accepted voltage
    #[serde(default)]
    pub v_min: Option<f64>,
    /// Highest accepted voltage
    #[serde(default)]
    pub v_max: Option<f64>,
    /// Physical pin shared with other ports
    #[serde(default, rename = "ref")]
    pub ref_to: Option<String>,
    /// Peripheral roles the port can take
    #[serde(default)]
    pub function: Vec<FunctionDoc>,
}

/// One role of a port
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FunctionDoc {
    #[serde(rename = "type")]
    pub peripheral: Peripheral,
    pub pintype: PinRole,
}

/// Named group of ports that is wired as a unit
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDoc {
    /// Name, unique within the device
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ConnectionKind,
    /// Provide or consume
    pub direction: Direction,
    /// Port names, in role order
    #[serde(default)]
    pub pins: Vec<String>,
}

/// Support of one generic device
#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilityDoc {
    /// Generic device name
    pub name: String,
    /// Project devices one instance can serve
    #[serde(default = "one")]
    pub count: u32,
    /// Supported actions; an entry naming a condition is read as one
    #[serde(default)]
    pub action: Vec<SupportDoc>,
    #[serde(default)]
    pub condition: Vec<SupportDoc>,
    #[serde(default)]
    pub value: Vec<ValueSupportDoc>,
}

fn one() -> u32 {
    1
}

/// Supported action or condition
#[derive(Debug, Clone, Deserialize)]
pub struct SupportDoc {
    /// Action or condition name
    pub name: String,
    /// Parameter ranges the part supports
    #[serde(default)]
    pub parameter: Vec<ParameterSupportDoc>,
}

/// Parameter range the part supports
#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSupportDoc {
    pub name: String,
    #[serde(default)]
    pub constraint: ConstraintDoc,
}

/// Value range the part reports
#[derive(Debug, Clone, Deserialize)]
pub struct ValueSupportDoc {
    pub name: String,
    #[serde(default)]
    pub constraint: ConstraintDoc,
}

/// Constraint as written in a document
///
/// List shapes are tried first; a range is only ever read from an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConstraintDoc {
    /// `[]`, a list of ranges, or a list of allowed values
    List(Vec<ConstraintItem>),
    /// `{"min", "max", "unit"}`
    Range(RangeDoc),
}

impl Default for ConstraintDoc {
    fn default() -> Self {
        ConstraintDoc::List(Vec::new())
    }
}

/// Entry of a constraint list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConstraintItem {
    /// Range for one unit
    Range(RangeDoc),
    /// `STRING_INT_ENUM` entry
    Labelled {
        /// Label shown to the user
        key: String,
        /// Encoded value
        value: i64,
    },
    /// `INTEGER_ENUM` entry
    Integer(i64),
    /// `ENUM`, `BOOLEAN_ENUM` or `STRING` entry
    Label(String),
}

/// Numeric range of one unit
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "serde_json::Map<String, Json>")]
pub struct RangeDoc {
    /// Lower bound, inclusive
    pub min: Bound,
    /// Upper bound, inclusive
    pub max: Bound,
    /// Unit of both bounds
    pub unit: Unit,
}

#[derive(Deserialize)]
struct RangeFields {
    min: Bound,
    max: Bound,
    #[serde(default)]
    unit: Unit,
}

// Object only: a derived struct would also accept `[min, max]`
impl TryFrom<serde_json::Map<String, Json>> for RangeDoc {
    type Error = serde_json::Error;

    fn try_from(map: serde_json::Map<String, Json>) -> Result<Self, Self::Error> {
        let RangeFields { min, max, unit } = serde_json::from_value(Json::Object(map))?;
        Ok(Self { min, max, unit })
    }
}

/// Range bound: a number or one of the sentinel words
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    /// Literal bound
    Number(f64),
    /// `MIN_DOUBLE`, `MAX_DOUBLE`, `MIN_INTEGER` or `MAX_INTEGER`
    Sentinel(String),
}

impl Bound {
    fn resolve(&self, document: &str) -> LibraryResult<f64> {
        match self {
            Bound::Number(value) => Ok(*value),
            Bound::Sentinel(word) => match word.as_str() {
                "MIN_DOUBLE" => Ok(f64::MIN),
                "MAX_DOUBLE" => Ok(f64::MAX),
                "MIN_INTEGER" => Ok(f64::from(i32::MIN)),
                "MAX_INTEGER" => Ok(f64::from(i32::MAX)),
                other => Err(parse_error(document, format!("unknown bound '{}'", other))),
            },
        }
    }
}

impl RangeDoc {
    fn to_range(&self, document: &str) -> LibraryResult<Range> {
        let min = self.min.resolve(document)?;
        let max = self.max.resolve(document)?;
        Ok(Range::new(min, max, self.unit)?)
    }
}

impl ConstraintDoc {
    /// Build the constraint; the list shape must agree with `data_type`
    pub fn to_constraint(&self, data_type: DataType, document: &str) -> LibraryResult<Constraint> {
        let items = match self {
            ConstraintDoc::Range(range) => {
                let bounds = range.to_range(document)?;
                return Ok(Constraint::numeric(bounds.min, bounds.max, range.unit)?);
            }
            ConstraintDoc::List(items) if items.is_empty() => return Ok(Constraint::None),
            ConstraintDoc::List(items) => items,
        };

        match (&items[0], data_type) {
            (ConstraintItem::Range(_), _) => {
                let mut ranges = BTreeMap::new();
                for item in items {
                    let ConstraintItem::Range(doc) = item else {
                        return Err(mixed(document));
                    };
                    if ranges.insert(doc.unit, doc.to_range(document)?).is_some() {
                        return Err(parse_error(document, format!("unit {:?} listed twice", doc.unit)));
                    }
                }
                Ok(Constraint::Numeric(NumericConstraint::new(ranges)?))
            }
            (ConstraintItem::Labelled { .. }, DataType::StringIntEnum) => {
                let mut pairs = Vec::with_capacity(items.len());
                for item in items {
                    let ConstraintItem::Labelled { key, value } = item else {
                        return Err(mixed(document));
                    };
                    pairs.push((key.clone(), *value));
                }
                Ok(Constraint::labelled(pairs))
            }
            (ConstraintItem::Integer(_), DataType::IntegerEnum) => {
                let mut codes = Vec::with_capacity(items.len());
                for item in items {
                    let ConstraintItem::Integer(code) = item else {
                        return Err(mixed(document));
                    };
                    codes.push(*code);
                }
                Ok(Constraint::integers(codes))
            }
            (ConstraintItem::Label(_), DataType::Enum | DataType::BooleanEnum | DataType::String) => {
                let mut labels = Vec::with_capacity(items.len());
                for item in items {
                    let ConstraintItem::Label(label) = item else {
                        return Err(mixed(document));
                    };
                    labels.push(label.clone());
                }
                Ok(Constraint::categorical(labels))
            }
            (_, data_type) => Err(parse_error(
                document,
                format!("constraint list does not fit datatype {:?}", data_type),
            )),
        }
    }
}

/// Default value of a parameter or property, shaped by its data type
///
/// Numbers take the first unit of a numeric constraint.
pub fn default_value(
    data_type: DataType,
    value: &Json,
    constraint: &Constraint,
    document: &str,
) -> LibraryResult<ParamValue> {
    let wrong = || parse_error(document, format!("default {} is not a {:?}", value, data_type));
    match data_type {
        DataType::Integer | DataType::Double => {
            let number = value.as_f64().ok_or_else(wrong)?;
            let unit = match constraint {
                Constraint::Numeric(numeric) => numeric.units().next().unwrap_or_default(),
                _ => Unit::NotSpecified,
            };
            Ok(ParamValue::with_unit(number, unit))
        }
        DataType::IntegerEnum => value.as_i64().map(ParamValue::Integer).ok_or_else(wrong),
        DataType::String | DataType::Enum | DataType::BooleanEnum => {
            value.as_str().map(ParamValue::text).ok_or_else(wrong)
        }
        DataType::StringIntEnum => match value {
            Json::String(label) => Ok(ParamValue::text(label.as_str())),
            Json::Number(_) => value.as_i64().map(ParamValue::Integer).ok_or_else(wrong),
            _ => Err(wrong()),
        },
        // Free-form types: keep whatever text there is
        _ => Ok(ParamValue::text(value.as_str().unwrap_or_default())),
    }
}

fn mixed(document: &str) -> LibraryError {
    parse_error(document, "constraint list mixes item shapes".to_string())
}

pub(crate) fn parse_error(document: &str, reason: String) -> LibraryError {
    LibraryError::Parse { document: document.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint(json: &str, data_type: DataType) -> LibraryResult<Constraint> {
        let doc: ConstraintDoc = serde_json::from_str(json).unwrap();
        doc.to_constraint(data_type, "test")
    }

    #[test]
    fn empty_list_is_none() {
        assert_eq!(constraint("[]", DataType::Double).unwrap(), Constraint::None);
    }

    #[test]
    fn single_range() {
        let c = constraint(r#"{"min": 0, "max": 100, "unit": "PERCENT"}"#, DataType::Double).unwrap();
        assert_eq!(c, Constraint::numeric(0.0, 100.0, Unit::Percent).unwrap());
    }

    #[test]
    fn ranges_per_unit() {
        let c = constraint(
            r#"[{"min": -40, "max": 85, "unit": "CELSIUS"}, {"min": -40, "max": 185, "unit": "FAHRENHEIT"}]"#,
            DataType::Double,
        )
        .unwrap();
        let Constraint::Numeric(numeric) = c else { panic!("numeric expected") };
        assert_eq!(numeric.units().collect::<Vec<_>>(), [Unit::Celsius, Unit::Fahrenheit]);
    }

    #[test]
    fn sentinels_are_unbounded() {
        let c = constraint(
            r#"{"min": "MIN_DOUBLE", "max": "MAX_DOUBLE", "unit": "NOT_SPECIFIED"}"#,
            DataType::Double,
        )
        .unwrap();
        let Constraint::Numeric(numeric) = c else { panic!("numeric expected") };
        assert_eq!(numeric.range(Unit::NotSpecified), Some(&Range::UNBOUNDED));

        let c = constraint(r#"{"min": "MIN_INTEGER", "max": "MAX_INTEGER"}"#, DataType::Integer).unwrap();
        assert!(c.test_number(f64::from(i32::MAX), Unit::NotSpecified));
        assert!(!c.test_number(f64::from(i32::MAX) + 1.0, Unit::NotSpecified));

        assert!(matches!(
            constraint(r#"{"min": "LOWEST", "max": 1}"#, DataType::Double),
            Err(LibraryError::Parse { .. })
        ));
    }

    #[test]
    fn list_shape_follows_datatype() {
        assert_eq!(
            constraint(r#"["red", "green"]"#, DataType::Enum).unwrap(),
            Constraint::categorical(["red", "green"])
        );
        assert_eq!(constraint("[1, 2, 4]", DataType::IntegerEnum).unwrap(), Constraint::integers([1, 2, 4]));
        assert_eq!(
            constraint(r#"[{"key": "Fast", "value": 2}]"#, DataType::StringIntEnum).unwrap(),
            Constraint::labelled([("Fast", 2)])
        );
        assert!(constraint("[1, 2]", DataType::Enum).is_err());
        assert!(constraint(r#"["a", 1]"#, DataType::Enum).is_err());
    }

    #[test]
    fn two_item_lists_are_not_ranges() {
        assert_eq!(
            constraint(r#"["ON", "OFF"]"#, DataType::BooleanEnum).unwrap(),
            Constraint::categorical(["ON", "OFF"])
        );
        assert_eq!(
            constraint(r#"["Low", "High"]"#, DataType::Enum).unwrap(),
            Constraint::categorical(["Low", "High"])
        );
        let address = constraint("[118, 119]", DataType::IntegerEnum).unwrap();
        assert_eq!(address, Constraint::integers([118, 119]));
        assert!(!address.test_number(118.5, Unit::NotSpecified));
        assert!(constraint("[0, 1]", DataType::Integer).is_err());
    }

    #[test]
    fn range_needs_an_object() {
        assert!(serde_json::from_str::<RangeDoc>("[0, 10]").is_err());
        let range: RangeDoc = serde_json::from_str(r#"{"min": 0, "max": 10}"#).unwrap();
        assert_eq!(range.unit, Unit::NotSpecified);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            constraint(r#"{"min": 5, "max": 1, "unit": "LUX"}"#, DataType::Double),
            Err(LibraryError::Constraint(_))
        ));
    }

    #[test]
    fn default_takes_constraint_unit() {
        let c = Constraint::numeric(0.0, 50.0, Unit::Celsius).unwrap();
        let value = default_value(DataType::Double, &serde_json::json!(20), &c, "t").unwrap();
        assert_eq!(value, ParamValue::with_unit(20.0, Unit::Celsius));
        assert!(default_value(DataType::IntegerEnum, &serde_json::json!("x"), &c, "t").is_err());
    }
}

//! Generic device vocabulary
//!
//! A [`GenericDevice`] is the abstract capability a user drags onto the canvas
//! ("LED", "Temperature sensor"). It lists the actions it can perform, the
//! conditions it can wait on and the values it can report. Concrete parts in the
//! [`DeviceLibrary`](crate::library::DeviceLibrary) declare which of these they
//! implement and with what constraints.
//!
//! Everything here is referenced by interned ids. Generic devices get a
//! [`GenericDeviceId`] from the library; actions, conditions, values and
//! parameters get positional ids within their owner.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, ParamValue};
use crate::errors::{CatalogError, CatalogResult};

/// Interned generic device id, assigned by the library builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GenericDeviceId(pub(crate) u32);

impl GenericDeviceId {
    /// Position in the library
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Position of an action within its generic device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u16);

/// Position of a condition within its generic device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionId(pub u16);

/// Position of a value within its generic device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u16);

/// Position of a parameter within its action or condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterId(pub u16);

/// Declared data type of a parameter, value or property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum DataType {
    Integer,
    Double,
    String,
    Enum,
    IntegerEnum,
    BooleanEnum,
    StringIntEnum,
    Mix,
    AzureCognitiveKey,
    AzureIothubKey,
    Datetime,
    Record,
    Image,
}

impl DataType {
    /// Value has the shape this data type expects
    pub fn accepts(self, value: &ParamValue) -> bool {
        match self {
            DataType::Integer | DataType::Double => matches!(value, ParamValue::Number { .. }),
            DataType::String | DataType::Enum | DataType::BooleanEnum => {
                matches!(value, ParamValue::Text(_))
            }
            DataType::IntegerEnum => matches!(value, ParamValue::Integer(_)),
            DataType::StringIntEnum => {
                matches!(value, ParamValue::Text(_) | ParamValue::Integer(_))
            }
            DataType::Mix
            | DataType::AzureCognitiveKey
            | DataType::AzureIothubKey
            | DataType::Datetime
            | DataType::Record
            | DataType::Image => true,
        }
    }
}

/// Suggested UI control, passed through untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum ControlType {
    Spinbox,
    Slider,
    Dropdown,
    Textbox,
    Customsegment,
    Datetimepicker,
    ImageSelector,
    Record,
    #[default]
    None,
}

/// Classification tag of a generic device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum GenericKind {
    Sensor,
    Actuator,
    Utility,
    Cloud,
    Interface,
}

/// Typed argument of an action or condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    data_type: DataType,
    default: ParamValue,
    constraint: Constraint,
    control: ControlType,
}

impl Parameter {
    /// Create a parameter; the default must fit the data type and constraint
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        default: ParamValue,
        constraint: Constraint,
        control: ControlType,
    ) -> CatalogResult<Self> {
        let name = name.into();
        if !data_type.accepts(&default) || !default_fits(data_type, &default, &constraint) {
            return Err(CatalogError::InvalidDefault { parameter: name });
        }
        Ok(Self { name, data_type, default, constraint, control })
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Default value
    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    /// Declared constraint
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Suggested UI control
    pub fn control(&self) -> ControlType {
        self.control
    }
}

// Free-form types carry placeholders that the constraint does not describe.
fn default_fits(data_type: DataType, default: &ParamValue, constraint: &Constraint) -> bool {
    match data_type {
        DataType::Integer | DataType::Double | DataType::Enum | DataType::IntegerEnum
        | DataType::BooleanEnum | DataType::StringIntEnum => constraint.test(default),
        _ => true,
    }
}

/// Named operation with an ordered parameter list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    name: String,
    parameters: Vec<Parameter>,
}

/// Conditions share the shape of actions
pub type Condition = Action;

impl Action {
    /// Action without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Vec::new() }
    }

    /// Append a parameter
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Action name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Parameter by id
    pub fn parameter(&self, id: ParameterId) -> Option<&Parameter> {
        self.parameters.get(id.0 as usize)
    }

    /// Id of the parameter with this name
    pub fn parameter_id(&self, name: &str) -> Option<ParameterId> {
        position(&self.parameters, |p| p.name == name).map(ParameterId)
    }

    /// Parameters with their ids
    pub fn parameter_ids(&self) -> impl Iterator<Item = (ParameterId, &Parameter)> {
        self.parameters.iter().enumerate().map(|(i, p)| (ParameterId(i as u16), p))
    }
}

/// Observable reading of a generic device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    name: String,
    data_type: DataType,
    constraint: Constraint,
}

impl Value {
    /// Create a value
    pub fn new(name: impl Into<String>, data_type: DataType, constraint: Constraint) -> Self {
        Self { name: name.into(), data_type, constraint }
    }

    /// Value name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Declared constraint
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }
}

/// Abstract capability descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericDevice {
    name: String,
    kind: GenericKind,
    description: String,
    actions: Vec<Action>,
    conditions: Vec<Condition>,
    values: Vec<Value>,
}

impl GenericDevice {
    /// Empty generic device
    pub fn new(name: impl Into<String>, kind: GenericKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            actions: Vec::new(),
            conditions: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Set the description shown in the device picker
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append an action
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Append a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Append a value
    pub fn with_value(mut self, value: Value) -> Self {
        self.values.push(value);
        self
    }

    /// Generic device name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Classification tag
    pub fn kind(&self) -> GenericKind {
        self.kind
    }

    /// Description shown in the device picker
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Actions in declaration order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Conditions in declaration order
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Action by id
    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(id.0 as usize)
    }

    /// Condition by id
    pub fn condition(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.get(id.0 as usize)
    }

    /// Value by id
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id.0 as usize)
    }

    /// Id of the action with this name
    pub fn action_id(&self, name: &str) -> Option<ActionId> {
        position(&self.actions, |a| a.name == name).map(ActionId)
    }

    /// Id of the condition with this name
    pub fn condition_id(&self, name: &str) -> Option<ConditionId> {
        position(&self.conditions, |c| c.name == name).map(ConditionId)
    }

    /// Id of the value with this name
    pub fn value_id(&self, name: &str) -> Option<ValueId> {
        position(&self.values, |v| v.name == name).map(ValueId)
    }

    /// Reject duplicate names at every level
    pub(crate) fn check_unique_names(&self) -> CatalogResult<()> {
        let duplicate = |kind: &'static str, name: &str| CatalogError::DuplicateCapability {
            generic: self.name.clone(),
            kind,
            name: name.to_string(),
        };
        if let Some(name) = first_duplicate(self.actions.iter().map(Action::name)) {
            return Err(duplicate("action", name));
        }
        if let Some(name) = first_duplicate(self.conditions.iter().map(Action::name)) {
            return Err(duplicate("condition", name));
        }
        if let Some(name) = first_duplicate(self.values.iter().map(Value::name)) {
            return Err(duplicate("value", name));
        }
        for action in self.actions.iter().chain(self.conditions.iter()) {
            if let Some(name) = first_duplicate(action.parameters.iter().map(Parameter::name)) {
                return Err(duplicate("parameter", name));
            }
        }
        Ok(())
    }
}

impl fmt::Display for GenericDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Device-level configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    name: String,
    data_type: DataType,
    default: ParamValue,
    constraint: Constraint,
    control: ControlType,
    optional: bool,
}

impl Property {
    /// Required property
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        default: ParamValue,
        constraint: Constraint,
        control: ControlType,
    ) -> Self {
        Self { name: name.into(), data_type, default, constraint, control, optional: false }
    }

    /// Mark as optional (hidden unless the user opts in)
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared data type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Default value
    pub fn default_value(&self) -> &ParamValue {
        &self.default
    }

    /// Declared constraint
    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Suggested UI control
    pub fn control(&self) -> ControlType {
        self.control
    }

    /// Hidden unless the user opts in
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Value fits both the data type and the constraint
    pub fn accepts(&self, value: &ParamValue) -> bool {
        self.data_type.accepts(value) && self.constraint.test(value)
    }
}

fn position<T>(items: &[T], pred: impl Fn(&T) -> bool) -> Option<u16> {
    items.iter().position(pred).map(|i| i as u16)
}

fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = std::collections::BTreeSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}

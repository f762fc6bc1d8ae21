//! Typed Constraints over Parameter, Value and Property Values
//!
//! ## Overview
//!
//! A constraint bounds the legal values of one parameter. It shows up on both
//! sides of a compatibility check:
//!
//! ```text
//!   generic "led" / action "on" / brightness      declared by the vocabulary
//!   project led1 uses brightness in [0, 100]      requested (used) constraint
//!   part "WS2812" supports brightness [0, 255]    offered constraint
//!
//!   offered.is_compatible(requested)  ==  requested ⊆ offered
//! ```
//!
//! ## Kinds
//!
//! | Kind | Domain | `is_compatible` |
//! |------|--------|-----------------|
//! | `None` | anything | always true |
//! | `Numeric` | number + unit | per unit range containment |
//! | `Categorical` | text | superset |
//! | `IntegerCategorical` | integer | superset |
//! | `StringIntegerCategorical` | label or code | same pairs present |
//!
//! Testing a value of the wrong kind returns `false`. Bounds of `f64::MIN` and
//! `f64::MAX` mean "unbounded" and are printed as `-∞` and `∞`.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::{ConstraintError, ConstraintResult};
use crate::unit::Unit;

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
    /// Lower bound (`f64::MIN` when unbounded)
    pub min: f64,
    /// Upper bound (`f64::MAX` when unbounded)
    pub max: f64,
}

impl Range {
    /// Range covering every finite number
    pub const UNBOUNDED: Range = Range { min: f64::MIN, max: f64::MAX };

    /// Create a range, rejecting NaN bounds and `min > max`
    pub fn new(min: f64, max: f64, unit: Unit) -> ConstraintResult<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(ConstraintError::InvalidRange { min, max, unit });
        }
        Ok(Self { min, max })
    }

    /// Inclusive membership
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// `other` lies entirely inside `self`
    pub fn covers(&self, other: &Range) -> bool {
        self.min <= other.min && self.max >= other.max
    }

    fn hull(&self, other: &Range) -> Range {
        Range { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    fn overlap(&self, other: &Range) -> Option<Range> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(Range { min, max })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        write_bound(f, self.min)?;
        write!(f, ", ")?;
        write_bound(f, self.max)?;
        write!(f, "]")
    }
}

#[derive(Deserialize)]
struct RawRange {
    min: f64,
    max: f64,
}

impl TryFrom<RawRange> for Range {
    type Error = ConstraintError;

    fn try_from(raw: RawRange) -> ConstraintResult<Self> {
        Range::new(raw.min, raw.max, Unit::NotSpecified)
    }
}

fn write_bound(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value <= f64::MIN || value == f64::NEG_INFINITY {
        f.write_str("-∞")
    } else if value >= f64::MAX || value == f64::INFINITY {
        f.write_str("∞")
    } else {
        write!(f, "{}", value)
    }
}

/// Numeric constraint with one range per supported unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNumeric")]
pub struct NumericConstraint {
    ranges: BTreeMap<Unit, Range>,
}

#[derive(Deserialize)]
struct RawNumeric {
    ranges: BTreeMap<Unit, Range>,
}

impl TryFrom<RawNumeric> for NumericConstraint {
    type Error = ConstraintError;

    fn try_from(raw: RawNumeric) -> ConstraintResult<Self> {
        NumericConstraint::new(raw.ranges)
    }
}

impl NumericConstraint {
    /// Build from a non-empty unit map
    pub fn new(ranges: BTreeMap<Unit, Range>) -> ConstraintResult<Self> {
        if ranges.is_empty() {
            return Err(ConstraintError::EmptyNumeric);
        }
        for (unit, range) in &ranges {
            Range::new(range.min, range.max, *unit)?;
        }
        Ok(Self { ranges })
    }

    /// Single-unit constraint
    pub fn single(min: f64, max: f64, unit: Unit) -> ConstraintResult<Self> {
        let range = Range::new(min, max, unit)?;
        Ok(Self { ranges: BTreeMap::from([(unit, range)]) })
    }

    /// Range declared for `unit`
    pub fn range(&self, unit: Unit) -> Option<&Range> {
        self.ranges.get(&unit)
    }

    /// All declared units with their ranges
    pub fn ranges(&self) -> impl Iterator<Item = (Unit, &Range)> {
        self.ranges.iter().map(|(unit, range)| (*unit, range))
    }

    /// Declared units
    pub fn units(&self) -> impl Iterator<Item = Unit> + '_ {
        self.ranges.keys().copied()
    }

    /// Value lies inside the range declared for its unit
    pub fn test(&self, value: f64, unit: Unit) -> bool {
        self.ranges.get(&unit).map_or(false, |range| range.contains(value))
    }

    /// Every unit of `other` is declared here with a covering range
    pub fn covers(&self, other: &NumericConstraint) -> bool {
        other.ranges.iter().all(|(unit, requested)| {
            self.ranges.get(unit).map_or(false, |offered| offered.covers(requested))
        })
    }

    fn union(&self, other: &NumericConstraint) -> NumericConstraint {
        let mut ranges = self.ranges.clone();
        for (unit, range) in &other.ranges {
            ranges
                .entry(*unit)
                .and_modify(|existing| *existing = existing.hull(range))
                .or_insert(*range);
        }
        NumericConstraint { ranges }
    }

    fn intersect(&self, other: &NumericConstraint) -> Option<NumericConstraint> {
        let ranges: BTreeMap<Unit, Range> = self
            .ranges
            .iter()
            .filter_map(|(unit, range)| {
                other.ranges.get(unit).and_then(|o| range.overlap(o)).map(|r| (*unit, r))
            })
            .collect();
        (!ranges.is_empty()).then_some(NumericConstraint { ranges })
    }
}

/// A typed value that can be tested against a constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// Number with its unit
    Number {
        /// Magnitude
        value: f64,
        /// Unit of the magnitude
        unit: Unit,
    },
    /// Integer code (integer enums, encoded string-integer labels)
    Integer(i64),
    /// Free text or a categorical label
    Text(String),
}

impl ParamValue {
    /// Number without a unit
    pub fn number(value: f64) -> Self {
        ParamValue::Number { value, unit: Unit::NotSpecified }
    }

    /// Number with a unit
    pub fn with_unit(value: f64, unit: Unit) -> Self {
        ParamValue::Number { value, unit }
    }

    /// Text value
    pub fn text(value: impl Into<String>) -> Self {
        ParamValue::Text(value.into())
    }

    /// Point constraint that accepts exactly this value
    pub fn to_constraint(&self) -> Constraint {
        match self {
            ParamValue::Number { value, unit } => Constraint::Numeric(NumericConstraint {
                ranges: BTreeMap::from([(*unit, Range { min: *value, max: *value })]),
            }),
            ParamValue::Integer(code) => {
                Constraint::IntegerCategorical(BTreeSet::from([*code]))
            }
            ParamValue::Text(text) => Constraint::Categorical(BTreeSet::from([text.clone()])),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number { value, unit } => match unit.symbol() {
                "" => write!(f, "{}", value),
                symbol => write!(f, "{} {}", value, symbol),
            },
            ParamValue::Integer(code) => write!(f, "{}", code),
            ParamValue::Text(text) => f.write_str(text),
        }
    }
}

/// Typed predicate over a single value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "allowed", rename_all = "snake_case")]
pub enum Constraint {
    /// Accepts every value
    #[default]
    None,
    /// Per-unit numeric ranges
    Numeric(NumericConstraint),
    /// Allowed text labels
    Categorical(BTreeSet<String>),
    /// Allowed integer codes
    IntegerCategorical(BTreeSet<i64>),
    /// Display label to encoded value
    StringIntegerCategorical(BTreeMap<String, i64>),
}

impl Constraint {
    /// Single-unit numeric constraint
    pub fn numeric(min: f64, max: f64, unit: Unit) -> ConstraintResult<Self> {
        NumericConstraint::single(min, max, unit).map(Constraint::Numeric)
    }

    /// Numeric constraint covering a linked value range, e.g. a sensor reading
    /// feeding an actuator parameter
    pub fn range(low: f64, high: f64, unit: Unit) -> ConstraintResult<Self> {
        let (low, high) = if low > high { (high, low) } else { (low, high) };
        Self::numeric(low, high, unit)
    }

    /// Categorical constraint from labels
    pub fn categorical<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::Categorical(labels.into_iter().map(Into::into).collect())
    }

    /// Integer-categorical constraint from codes
    pub fn integers<I: IntoIterator<Item = i64>>(codes: I) -> Self {
        Constraint::IntegerCategorical(codes.into_iter().collect())
    }

    /// String-integer constraint from `(label, code)` pairs
    pub fn labelled<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Constraint::StringIntegerCategorical(
            pairs.into_iter().map(|(label, code)| (label.into(), code)).collect(),
        )
    }

    /// Kind name used in errors and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::None => "none",
            Constraint::Numeric(_) => "numeric",
            Constraint::Categorical(_) => "categorical",
            Constraint::IntegerCategorical(_) => "integer categorical",
            Constraint::StringIntegerCategorical(_) => "string-integer categorical",
        }
    }

    /// Unconstrained
    pub fn is_none(&self) -> bool {
        matches!(self, Constraint::None)
    }

    /// Numeric value in `unit`
    pub fn test_number(&self, value: f64, unit: Unit) -> bool {
        match self {
            Constraint::None => true,
            Constraint::Numeric(numeric) => numeric.test(value, unit),
            _ => false,
        }
    }

    /// Text label
    pub fn test_text(&self, value: &str) -> bool {
        match self {
            Constraint::None => true,
            Constraint::Categorical(allowed) => allowed.contains(value),
            Constraint::StringIntegerCategorical(allowed) => allowed.contains_key(value),
            _ => false,
        }
    }

    /// Integer code
    pub fn test_integer(&self, value: i64) -> bool {
        match self {
            Constraint::None => true,
            Constraint::IntegerCategorical(allowed) => allowed.contains(&value),
            Constraint::StringIntegerCategorical(allowed) => {
                allowed.values().any(|code| *code == value)
            }
            _ => false,
        }
    }

    /// Any typed value
    pub fn test(&self, value: &ParamValue) -> bool {
        match value {
            ParamValue::Number { value, unit } => self.test_number(*value, *unit),
            ParamValue::Integer(code) => self.test_integer(*code),
            ParamValue::Text(text) => self.test_text(text),
        }
    }

    /// Every value accepted by `other` is accepted by `self`
    ///
    /// A `None` request places no demand and is always covered.
    pub fn is_compatible(&self, other: &Constraint) -> bool {
        match (self, other) {
            (Constraint::None, _) | (_, Constraint::None) => true,
            (Constraint::Numeric(offered), Constraint::Numeric(requested)) => {
                offered.covers(requested)
            }
            (Constraint::Categorical(offered), Constraint::Categorical(requested)) => {
                offered.is_superset(requested)
            }
            (Constraint::IntegerCategorical(offered), Constraint::IntegerCategorical(requested)) => {
                offered.is_superset(requested)
            }
            (
                Constraint::StringIntegerCategorical(offered),
                Constraint::StringIntegerCategorical(requested),
            ) => requested.iter().all(|(label, code)| offered.get(label) == Some(code)),
            _ => false,
        }
    }

    /// Merge two constraints of one kind; `None` is the identity
    pub fn union(&self, other: &Constraint) -> ConstraintResult<Constraint> {
        match (self, other) {
            (Constraint::None, c) | (c, Constraint::None) => Ok(c.clone()),
            (Constraint::Numeric(a), Constraint::Numeric(b)) => Ok(Constraint::Numeric(a.union(b))),
            (Constraint::Categorical(a), Constraint::Categorical(b)) => {
                Ok(Constraint::Categorical(a.union(b).cloned().collect()))
            }
            (Constraint::IntegerCategorical(a), Constraint::IntegerCategorical(b)) => {
                Ok(Constraint::IntegerCategorical(a.union(b).copied().collect()))
            }
            (Constraint::StringIntegerCategorical(a), Constraint::StringIntegerCategorical(b)) => {
                let mut merged = a.clone();
                for (label, code) in b {
                    merged.entry(label.clone()).or_insert(*code);
                }
                Ok(Constraint::StringIntegerCategorical(merged))
            }
            _ => Err(self.mismatch(other)),
        }
    }

    /// Values accepted by both; `None` is the identity
    pub fn intersect(&self, other: &Constraint) -> ConstraintResult<Constraint> {
        let result = match (self, other) {
            (Constraint::None, c) | (c, Constraint::None) => return Ok(c.clone()),
            (Constraint::Numeric(a), Constraint::Numeric(b)) => {
                a.intersect(b).map(Constraint::Numeric)
            }
            (Constraint::Categorical(a), Constraint::Categorical(b)) => {
                let common: BTreeSet<String> = a.intersection(b).cloned().collect();
                (!common.is_empty()).then_some(Constraint::Categorical(common))
            }
            (Constraint::IntegerCategorical(a), Constraint::IntegerCategorical(b)) => {
                let common: BTreeSet<i64> = a.intersection(b).copied().collect();
                (!common.is_empty()).then_some(Constraint::IntegerCategorical(common))
            }
            (Constraint::StringIntegerCategorical(a), Constraint::StringIntegerCategorical(b)) => {
                let common: BTreeMap<String, i64> = a
                    .iter()
                    .filter(|(label, code)| b.get(*label) == Some(*code))
                    .map(|(label, code)| (label.clone(), *code))
                    .collect();
                (!common.is_empty()).then_some(Constraint::StringIntegerCategorical(common))
            }
            _ => return Err(self.mismatch(other)),
        };
        result.ok_or(ConstraintError::EmptyIntersection)
    }

    fn mismatch(&self, other: &Constraint) -> ConstraintError {
        ConstraintError::KindMismatch { left: self.kind(), right: other.kind() }
    }
}

impl From<NumericConstraint> for Constraint {
    fn from(numeric: NumericConstraint) -> Self {
        Constraint::Numeric(numeric)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::None => f.write_str("any"),
            Constraint::Numeric(numeric) => {
                for (i, (unit, range)) in numeric.ranges().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", range)?;
                    if !unit.symbol().is_empty() {
                        write!(f, " {}", unit)?;
                    }
                }
                Ok(())
            }
            Constraint::Categorical(allowed) => write_set(f, allowed.iter()),
            Constraint::IntegerCategorical(allowed) => write_set(f, allowed.iter()),
            Constraint::StringIntegerCategorical(allowed) => write_set(f, allowed.keys()),
        }
    }
}

fn write_set<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(min: f64, max: f64) -> Constraint {
        Constraint::numeric(min, max, Unit::Percent).unwrap()
    }

    #[test]
    fn numeric_test_is_inclusive_and_unit_bound() {
        let c = pct(0.0, 100.0);
        assert!(c.test_number(0.0, Unit::Percent));
        assert!(c.test_number(100.0, Unit::Percent));
        assert!(!c.test_number(100.5, Unit::Percent));
        assert!(!c.test_number(50.0, Unit::Celsius));
    }

    #[test]
    fn wrong_kind_is_rejected_not_panicking() {
        let c = pct(0.0, 100.0);
        assert!(!c.test_text("50"));
        assert!(!c.test_integer(50));

        let colors = Constraint::categorical(["red", "green"]);
        assert!(colors.test_text("red"));
        assert!(!colors.test_number(1.0, Unit::NotSpecified));
    }

    #[test]
    fn string_integer_accepts_label_or_code() {
        let c = Constraint::labelled([("low", 0), ("high", 1)]);
        assert!(c.test_text("high"));
        assert!(c.test_integer(0));
        assert!(!c.test_integer(2));
        assert!(!c.test_text("medium"));
    }

    #[test]
    fn numeric_compatibility_is_containment() {
        let wide = Constraint::numeric(0.0, 255.0, Unit::NotSpecified).unwrap();
        let narrow = Constraint::numeric(0.0, 50.0, Unit::NotSpecified).unwrap();
        let request = Constraint::numeric(0.0, 100.0, Unit::NotSpecified).unwrap();
        assert!(wide.is_compatible(&request));
        assert!(!narrow.is_compatible(&request));
    }

    #[test]
    fn numeric_compatibility_needs_every_requested_unit() {
        let celsius = Constraint::numeric(-40.0, 125.0, Unit::Celsius).unwrap();
        let fahrenheit = Constraint::numeric(0.0, 100.0, Unit::Fahrenheit).unwrap();
        assert!(!celsius.is_compatible(&fahrenheit));

        let both = celsius.union(&Constraint::numeric(-40.0, 257.0, Unit::Fahrenheit).unwrap()).unwrap();
        assert!(both.is_compatible(&fahrenheit));
    }

    #[test]
    fn none_on_either_side_is_compatible() {
        let c = Constraint::categorical(["red"]);
        assert!(Constraint::None.is_compatible(&c));
        assert!(c.is_compatible(&Constraint::None));
    }

    #[test]
    fn mismatched_kinds_are_incompatible() {
        assert!(!pct(0.0, 1.0).is_compatible(&Constraint::categorical(["a"])));
        assert!(!Constraint::integers([1]).is_compatible(&Constraint::categorical(["1"])));
    }

    #[test]
    fn categorical_compatibility_is_superset() {
        let offered = Constraint::categorical(["red", "green", "blue"]);
        assert!(offered.is_compatible(&Constraint::categorical(["red", "blue"])));
        assert!(!offered.is_compatible(&Constraint::categorical(["red", "white"])));
    }

    #[test]
    fn string_integer_compatibility_checks_codes() {
        let offered = Constraint::labelled([("low", 0), ("high", 1)]);
        assert!(offered.is_compatible(&Constraint::labelled([("high", 1)])));
        assert!(!offered.is_compatible(&Constraint::labelled([("high", 2)])));
    }

    #[test]
    fn numeric_union_merges_per_unit() {
        let a = pct(0.0, 10.0);
        let b = pct(5.0, 50.0);
        let c = Constraint::numeric(1.0, 2.0, Unit::Lux).unwrap();
        let merged = a.union(&b).unwrap().union(&c).unwrap();
        let Constraint::Numeric(numeric) = merged else { panic!("numeric expected") };
        assert_eq!(numeric.range(Unit::Percent), Some(&Range { min: 0.0, max: 50.0 }));
        assert_eq!(numeric.range(Unit::Lux), Some(&Range { min: 1.0, max: 2.0 }));
    }

    #[test]
    fn union_with_none_is_identity() {
        let c = Constraint::integers([1, 2]);
        assert_eq!(Constraint::None.union(&c).unwrap(), c);
        assert_eq!(c.union(&Constraint::None).unwrap(), c);
    }

    #[test]
    fn union_of_unlike_kinds_is_an_error() {
        let err = pct(0.0, 1.0).union(&Constraint::integers([1])).unwrap_err();
        assert!(matches!(err, ConstraintError::KindMismatch { left: "numeric", .. }));
    }

    #[test]
    fn intersect_narrows() {
        let c = pct(0.0, 50.0).intersect(&pct(25.0, 100.0)).unwrap();
        assert_eq!(c, pct(25.0, 50.0));

        let colors = Constraint::categorical(["red", "green"])
            .intersect(&Constraint::categorical(["green", "blue"]))
            .unwrap();
        assert_eq!(colors, Constraint::categorical(["green"]));
    }

    #[test]
    fn disjoint_intersection_is_an_error() {
        let err = pct(0.0, 10.0).intersect(&pct(20.0, 30.0)).unwrap_err();
        assert_eq!(err, ConstraintError::EmptyIntersection);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(Constraint::numeric(10.0, 0.0, Unit::Meter).is_err());
        assert!(Constraint::numeric(f64::NAN, 0.0, Unit::Meter).is_err());
        assert_eq!(NumericConstraint::new(BTreeMap::new()), Err(ConstraintError::EmptyNumeric));
    }

    #[test]
    fn deserialized_ranges_are_checked() {
        let numeric: NumericConstraint =
            serde_json::from_str(r#"{"ranges": {"PERCENT": {"min": 0, "max": 100}}}"#).unwrap();
        assert_eq!(numeric, NumericConstraint::single(0.0, 100.0, Unit::Percent).unwrap());

        assert!(serde_json::from_str::<Range>(r#"{"min": 5, "max": 1}"#).is_err());
        assert!(serde_json::from_str::<NumericConstraint>(r#"{"ranges": {}}"#).is_err());
        assert!(serde_json::from_str::<Constraint>(
            r#"{"kind": "numeric", "allowed": {"ranges": {"PERCENT": {"min": 9, "max": 1}}}}"#
        )
        .is_err());
    }

    #[test]
    fn range_constructor_orders_bounds() {
        assert_eq!(Constraint::range(80.0, 20.0, Unit::Percent).unwrap(), pct(20.0, 80.0));
    }

    #[test]
    fn sentinels_render_as_infinity_but_test_normally() {
        let c = Constraint::numeric(f64::MIN, f64::MAX, Unit::Celsius).unwrap();
        assert_eq!(c.to_string(), "[-∞, ∞] °C");
        assert!(c.test_number(1e300, Unit::Celsius));
        assert_eq!(pct(0.0, 100.0).to_string(), "[0, 100] %");
    }

    #[test]
    fn point_constraints_from_values() {
        let v = ParamValue::with_unit(21.5, Unit::Celsius);
        let c = v.to_constraint();
        assert!(c.test(&v));
        assert!(!c.test_number(21.6, Unit::Celsius));
        assert_eq!(ParamValue::text("red").to_constraint(), Constraint::categorical(["red"]));
    }
}

//! Capability support with constraint checks
//!
//! A part supports a project device when it implements the generic device, every
//! used action and condition, and every used value; and for each parameter the
//! part's declared constraint covers what the program needs.
//!
//! What the program needs for a parameter is the constraint recorded in the
//! slot's usage, or the generic parameter's own declared constraint when nothing
//! was recorded. Values only have a requirement when one was recorded.

use std::collections::BTreeMap;

use crate::capability::{Action, ParameterId};
use crate::constraint::Constraint;
use crate::mapping::{DeviceMappingResult, MappingCode};
use crate::traits::{CandidateView, MappingContext, MappingRule, RuleResult};

/// Rejects parts that do not implement what the program uses
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityRule;

impl MappingRule for CapabilityRule {
    fn name(&self) -> &'static str {
        "capability"
    }

    fn check(&self, candidate: &CandidateView<'_>, context: &MappingContext<'_>) -> RuleResult {
        let generic = context.generic;
        let usage = &context.device.usage;
        let compat = candidate
            .part
            .compatibility(context.device.generic())
            .ok_or_else(|| {
                DeviceMappingResult::with_detail(MappingCode::UnsupportedGenericDevice, generic.name())
            })?;

        for (id, used) in usage.actions() {
            let action = generic.action(*id).ok_or_else(|| unsupported(MappingCode::UnsupportedAction, "?"))?;
            let offered = compat
                .actions
                .get(id)
                .ok_or_else(|| unsupported(MappingCode::UnsupportedAction, action.name()))?;
            check_parameters(action, offered, used)?;
        }

        for (id, used) in usage.conditions() {
            let condition = generic
                .condition(*id)
                .ok_or_else(|| unsupported(MappingCode::UnsupportedCondition, "?"))?;
            let offered = compat
                .conditions
                .get(id)
                .ok_or_else(|| unsupported(MappingCode::UnsupportedCondition, condition.name()))?;
            check_parameters(condition, offered, used)?;
        }

        for (id, used) in usage.values() {
            let value = generic.value(*id).ok_or_else(|| unsupported(MappingCode::UnsupportedValue, "?"))?;
            let offered = compat
                .values
                .get(id)
                .ok_or_else(|| unsupported(MappingCode::UnsupportedValue, value.name()))?;
            if let Some(used) = used {
                if !offered.is_compatible(used) {
                    return Err(DeviceMappingResult::with_detail(
                        MappingCode::ConstraintMismatch,
                        format!("{} needs {}, part offers {}", value.name(), used, offered),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn unsupported(code: MappingCode, name: &str) -> DeviceMappingResult {
    DeviceMappingResult::with_detail(code, name)
}

/// Every parameter of `action` is covered by the part's declared constraint
fn check_parameters(
    action: &Action,
    offered: &BTreeMap<ParameterId, Constraint>,
    used: &BTreeMap<ParameterId, Constraint>,
) -> RuleResult {
    for (id, parameter) in action.parameter_ids() {
        let needed = used.get(&id).unwrap_or(parameter.constraint());
        let declared = offered.get(&id).unwrap_or(&Constraint::None);
        if !declared.is_compatible(needed) {
            return Err(DeviceMappingResult::with_detail(
                MappingCode::ConstraintMismatch,
                format!("{}.{} needs {}, part offers {}", action.name(), parameter.name(), needed, declared),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ControlType, DataType, Parameter};
    use crate::constraint::ParamValue;
    use crate::unit::Unit;

    fn on() -> Action {
        Action::new("On").with_parameter(
            Parameter::new(
                "brightness",
                DataType::Integer,
                ParamValue::number(100.0),
                Constraint::numeric(0.0, 100.0, Unit::NotSpecified).unwrap(),
                ControlType::Slider,
            )
            .unwrap(),
        )
    }

    fn offering(max: f64) -> BTreeMap<ParameterId, Constraint> {
        BTreeMap::from([(ParameterId(0), Constraint::numeric(0.0, max, Unit::NotSpecified).unwrap())])
    }

    #[test]
    fn generic_constraint_is_the_default_need() {
        assert!(check_parameters(&on(), &offering(255.0), &BTreeMap::new()).is_ok());
        let err = check_parameters(&on(), &offering(50.0), &BTreeMap::new()).unwrap_err();
        assert_eq!(err.code, MappingCode::ConstraintMismatch);
        assert!(err.detail.unwrap().starts_with("On.brightness"));
    }

    #[test]
    fn recorded_usage_overrides_default_need() {
        let used = BTreeMap::from([(
            ParameterId(0),
            Constraint::numeric(0.0, 40.0, Unit::NotSpecified).unwrap(),
        )]);
        assert!(check_parameters(&on(), &offering(50.0), &used).is_ok());
    }

    #[test]
    fn undeclared_parameter_is_unconstrained() {
        assert!(check_parameters(&on(), &BTreeMap::new(), &BTreeMap::new()).is_ok());
    }
}

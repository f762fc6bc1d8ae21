//! Property tests for the constraint algebra

use devmap_core::{Constraint, Unit};
use proptest::prelude::*;

fn numeric() -> impl Strategy<Value = Constraint> {
    (-1000.0f64..1000.0, 0.0f64..500.0)
        .prop_map(|(min, width)| Constraint::numeric(min, min + width, Unit::Celsius).unwrap())
}

fn any_constraint() -> impl Strategy<Value = Constraint> {
    prop_oneof![
        Just(Constraint::None),
        numeric(),
        prop::collection::btree_set("[a-z]{1,6}", 1..5).prop_map(Constraint::categorical),
        prop::collection::btree_set(-50i64..50, 1..5).prop_map(Constraint::integers),
    ]
}

proptest! {
    /// Union with itself changes nothing
    #[test]
    fn union_is_idempotent(c in any_constraint()) {
        prop_assert_eq!(c.union(&c).unwrap(), c);
    }

    /// Same-unit compatibility is interval containment
    #[test]
    fn numeric_compatibility_is_containment(
        a_min in -100.0f64..100.0, a_width in 0.0f64..100.0,
        b_min in -100.0f64..100.0, b_width in 0.0f64..100.0,
    ) {
        let (a_max, b_max) = (a_min + a_width, b_min + b_width);
        let a = Constraint::numeric(a_min, a_max, Unit::Percent).unwrap();
        let b = Constraint::numeric(b_min, b_max, Unit::Percent).unwrap();
        prop_assert_eq!(a.is_compatible(&b), a_min <= b_min && b_max <= a_max);
    }

    /// A union covers both of its inputs
    #[test]
    fn union_covers_inputs(a in numeric(), b in numeric()) {
        let merged = a.union(&b).unwrap();
        prop_assert!(merged.is_compatible(&a));
        prop_assert!(merged.is_compatible(&b));
    }

    /// None never places a demand
    #[test]
    fn none_is_always_covered(c in any_constraint()) {
        prop_assert!(c.is_compatible(&Constraint::None));
        prop_assert!(Constraint::None.is_compatible(&c));
    }
}

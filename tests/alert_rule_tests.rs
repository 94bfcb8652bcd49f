//! Alert rule integration tests
//!
//! Covers threshold construction and matching:
//! - a rule carries exactly one threshold shape (scalar or range)
//! - scalar comparisons follow the operator
//! - range rules fire outside [min, max]

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use meteowatch::services::alert_rules::{AlertCondition, AlertThreshold};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_scalar_operators_match_correctly() {
        let gt = AlertThreshold::Scalar {
            condition: AlertCondition::Gt,
            value: dec("30.0"),
        };
        assert!(gt.matches(dec("32.0")));
        assert!(!gt.matches(dec("30.0")));
        assert!(!gt.matches(dec("28.0")));

        let lt = AlertThreshold::Scalar {
            condition: AlertCondition::Lt,
            value: dec("4.0"),
        };
        assert!(lt.matches(dec("2.0")));
        assert!(!lt.matches(dec("4.0")));

        let ge = AlertThreshold::Scalar {
            condition: AlertCondition::Ge,
            value: dec("100.0"),
        };
        assert!(ge.matches(dec("100.0")));
        assert!(ge.matches(dec("101.0")));
        assert!(!ge.matches(dec("99.9")));

        let le = AlertThreshold::Scalar {
            condition: AlertCondition::Le,
            value: dec("0.0"),
        };
        assert!(le.matches(dec("0.0")));
        assert!(le.matches(dec("-1.0")));
        assert!(!le.matches(dec("0.1")));

        let eq = AlertThreshold::Scalar {
            condition: AlertCondition::Eq,
            value: dec("1013.0"),
        };
        assert!(eq.matches(dec("1013.0")));
        assert!(!eq.matches(dec("1012.0")));
    }

    #[test]
    fn test_range_fires_outside_bounds() {
        let range = AlertThreshold::Range {
            min: dec("10.0"),
            max: dec("20.0"),
        };

        assert!(range.matches(dec("25.0")));
        assert!(range.matches(dec("5.0")));

        // Inside and on the bounds: no breach
        assert!(!range.matches(dec("15.0")));
        assert!(!range.matches(dec("10.0")));
        assert!(!range.matches(dec("20.0")));
    }

    #[test]
    fn test_from_parts_accepts_exactly_one_shape() {
        let scalar = AlertThreshold::from_parts(
            Some(AlertCondition::Gt),
            Some(dec("30.0")),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            scalar,
            AlertThreshold::Scalar {
                condition: AlertCondition::Gt,
                value: dec("30.0"),
            }
        );

        let range =
            AlertThreshold::from_parts(None, None, Some(dec("10.0")), Some(dec("20.0"))).unwrap();
        assert_eq!(
            range,
            AlertThreshold::Range {
                min: dec("10.0"),
                max: dec("20.0"),
            }
        );
    }

    #[test]
    fn test_from_parts_rejects_both_shapes() {
        let result = AlertThreshold::from_parts(
            Some(AlertCondition::Gt),
            Some(dec("30.0")),
            Some(dec("10.0")),
            Some(dec("20.0")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_parts_rejects_neither_shape() {
        assert!(AlertThreshold::from_parts(None, None, None, None).is_err());
    }

    #[test]
    fn test_from_parts_rejects_half_shapes() {
        // Condition without value
        assert!(
            AlertThreshold::from_parts(Some(AlertCondition::Gt), None, None, None).is_err()
        );
        // Value without condition
        assert!(AlertThreshold::from_parts(None, Some(dec("30.0")), None, None).is_err());
        // Min without max
        assert!(AlertThreshold::from_parts(None, None, Some(dec("10.0")), None).is_err());
        // Max without min
        assert!(AlertThreshold::from_parts(None, None, None, Some(dec("20.0"))).is_err());
    }

    #[test]
    fn test_from_parts_rejects_inverted_range() {
        let result =
            AlertThreshold::from_parts(None, None, Some(dec("20.0")), Some(dec("10.0")));
        assert!(result.is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating measured values (-50.0 to 150.0)
    fn measured_strategy() -> impl Strategy<Value = Decimal> {
        (-500i64..=1500i64).prop_map(|n| Decimal::new(n, 1))
    }

    /// Strategy for generating scalar operators
    fn condition_strategy() -> impl Strategy<Value = AlertCondition> {
        prop_oneof![
            Just(AlertCondition::Gt),
            Just(AlertCondition::Lt),
            Just(AlertCondition::Eq),
            Just(AlertCondition::Ge),
            Just(AlertCondition::Le),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A greater-than rule fires exactly when the measured value exceeds
        /// the threshold
        #[test]
        fn prop_gt_matches_iff_exceeded(
            measured in measured_strategy(),
            value in measured_strategy()
        ) {
            let threshold = AlertThreshold::Scalar {
                condition: AlertCondition::Gt,
                value,
            };
            prop_assert_eq!(threshold.matches(measured), measured > value);
        }

        /// A range rule fires exactly when the measured value falls outside
        /// [min, max]
        #[test]
        fn prop_range_matches_iff_outside(
            measured in measured_strategy(),
            a in measured_strategy(),
            b in measured_strategy()
        ) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let threshold = AlertThreshold::Range { min, max };
            prop_assert_eq!(threshold.matches(measured), measured < min || measured > max);
        }

        /// Opposite scalar operators never fire together
        #[test]
        fn prop_gt_and_le_are_exclusive(
            measured in measured_strategy(),
            value in measured_strategy()
        ) {
            let gt = AlertThreshold::Scalar { condition: AlertCondition::Gt, value };
            let le = AlertThreshold::Scalar { condition: AlertCondition::Le, value };
            prop_assert!(gt.matches(measured) != le.matches(measured));
        }

        /// Supplying both threshold shapes is always rejected
        #[test]
        fn prop_both_shapes_always_rejected(
            condition in condition_strategy(),
            value in measured_strategy(),
            min in measured_strategy(),
            max in measured_strategy()
        ) {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            let result = AlertThreshold::from_parts(
                Some(condition),
                Some(value),
                Some(min),
                Some(max),
            );
            prop_assert!(result.is_err());
        }

        /// An ordered min/max pair always constructs a valid range rule
        #[test]
        fn prop_ordered_range_constructs(
            a in measured_strategy(),
            b in measured_strategy()
        ) {
            let (min, max) = if a <= b { (a, b) } else { (b, a) };
            let threshold = AlertThreshold::from_parts(None, None, Some(min), Some(max));
            prop_assert!(threshold.is_ok());
        }
    }
}

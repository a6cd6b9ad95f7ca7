use crate::error::TallyError;
use crate::model::NO_UNIT;
use crate::provider::UnitProvider;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts values between named units using single-hop conversion edges.
pub struct UnitConverter<'a> {
    units: &'a dyn UnitProvider,
}

impl<'a> UnitConverter<'a> {
    pub fn new(units: &'a dyn UnitProvider) -> Self {
        Self { units }
    }

    /// Convert `value` from `from` to `to`.
    ///
    /// Equal units and zero values short-circuit without consulting the unit
    /// table. Otherwise a direct edge is applied (multiply by rate) or its
    /// inverse (divide by rate). The result is rounded to 2 decimals.
    pub fn convert(&self, value: Decimal, from: &str, to: &str) -> Result<Decimal, TallyError> {
        if from == to || value.is_zero() {
            return Ok(value);
        }

        let edges = self.units.find_matching_edges(from)?;

        if let Some(edge) = edges.iter().find(|e| e.input == from && e.output == to) {
            debug!(from, to, rate = %edge.rate, "direct unit edge");
            let converted = value
                .checked_mul(edge.rate)
                .ok_or_else(|| TallyError::Overflow {
                    context: format!("converting {value} {from} to {to}"),
                })?;
            return Ok(round2(converted));
        }

        if let Some(edge) = edges.iter().find(|e| e.input == to && e.output == from) {
            debug!(from, to, rate = %edge.rate, "inverse unit edge");
            if edge.rate.is_zero() {
                return Err(TallyError::InvalidRate {
                    input: edge.input.clone(),
                    output: edge.output.clone(),
                });
            }
            let converted = value
                .checked_div(edge.rate)
                .ok_or_else(|| TallyError::Overflow {
                    context: format!("converting {value} {from} to {to}"),
                })?;
            return Ok(round2(converted));
        }

        Err(TallyError::UnitMismatch {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Convert a submitted cell into its column's canonical unit.
    ///
    /// A missing or `N/A` unit on either side takes the value as-is.
    pub fn normalize(
        &self,
        value: Decimal,
        declared: Option<&str>,
        canonical: &str,
    ) -> Result<Decimal, TallyError> {
        match declared {
            Some(unit) if unit != NO_UNIT && canonical != NO_UNIT => {
                self.convert(value, unit, canonical)
            }
            _ => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnitEdge;
    use rust_decimal_macros::dec;

    struct Edges(Vec<UnitEdge>);

    impl UnitProvider for Edges {
        fn find_matching_edges(&self, unit: &str) -> Result<Vec<UnitEdge>, TallyError> {
            Ok(self
                .0
                .iter()
                .filter(|e| e.input == unit || e.output == unit)
                .cloned()
                .collect())
        }
    }

    fn table() -> Edges {
        Edges(vec![
            UnitEdge {
                input: "mL".into(),
                output: "L".into(),
                rate: dec!(0.001),
            },
            UnitEdge {
                input: "kWh".into(),
                output: "MJ".into(),
                rate: dec!(3.6),
            },
        ])
    }

    #[test]
    fn test_identity() {
        let units = table();
        let converter = UnitConverter::new(&units);
        assert_eq!(converter.convert(dec!(12.345), "L", "L").unwrap(), dec!(12.345));
        assert_eq!(converter.convert(dec!(7), "furlong", "furlong").unwrap(), dec!(7));
    }

    #[test]
    fn test_zero_needs_no_edge() {
        let units = table();
        let converter = UnitConverter::new(&units);
        assert_eq!(converter.convert(dec!(0), "unknown", "other").unwrap(), dec!(0));
    }

    #[test]
    fn test_direct_edge() {
        let units = table();
        let converter = UnitConverter::new(&units);
        assert_eq!(converter.convert(dec!(1000), "mL", "L").unwrap(), dec!(1));
        assert_eq!(converter.convert(dec!(100230), "mL", "L").unwrap(), dec!(100.23));
    }

    #[test]
    fn test_inverse_edge() {
        let units = table();
        let converter = UnitConverter::new(&units);
        assert_eq!(converter.convert(dec!(2), "L", "mL").unwrap(), dec!(2000));
        assert_eq!(converter.convert(dec!(10), "MJ", "kWh").unwrap(), dec!(2.78));
    }

    #[test]
    fn test_no_multi_hop() {
        let units = table();
        let converter = UnitConverter::new(&units);
        let err = converter.convert(dec!(5), "mL", "MJ").unwrap_err();
        assert!(matches!(err, TallyError::UnitMismatch { .. }));
    }

    #[test]
    fn test_overflowing_conversion_is_an_error() {
        let units = Edges(vec![UnitEdge {
            input: "kL".into(),
            output: "L".into(),
            rate: dec!(1000),
        }]);
        let converter = UnitConverter::new(&units);
        let huge = Decimal::from_scientific("1e27").unwrap();

        let err = converter.convert(huge, "kL", "L").unwrap_err();
        assert!(matches!(err, TallyError::Overflow { .. }));

        let tiny = Edges(vec![UnitEdge {
            input: "mL".into(),
            output: "L".into(),
            rate: dec!(0.001),
        }]);
        let converter = UnitConverter::new(&tiny);
        let err = converter.convert(huge, "L", "mL").unwrap_err();
        assert!(matches!(err, TallyError::Overflow { .. }));
    }

    #[test]
    fn test_zero_rate_rejected() {
        let units = Edges(vec![UnitEdge {
            input: "x".into(),
            output: "y".into(),
            rate: dec!(0),
        }]);
        let converter = UnitConverter::new(&units);
        let err = converter.convert(dec!(3), "y", "x").unwrap_err();
        assert!(matches!(err, TallyError::InvalidRate { .. }));
    }

    #[test]
    fn test_normalize_skips_na() {
        let units = table();
        let converter = UnitConverter::new(&units);
        assert_eq!(converter.normalize(dec!(5), Some(NO_UNIT), "L").unwrap(), dec!(5));
        assert_eq!(converter.normalize(dec!(5), None, "L").unwrap(), dec!(5));
        assert_eq!(converter.normalize(dec!(5), Some("mL"), NO_UNIT).unwrap(), dec!(5));
        assert_eq!(converter.normalize(dec!(5000), Some("mL"), "L").unwrap(), dec!(5));
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round2(dec!(2.344)), dec!(2.34));
    }
}

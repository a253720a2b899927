//! Shipment settlement: contract price less temperature penalties
use crate::error::ValidationError;
use crate::model::{Contract, TemperatureReading};
use crate::types::TimeStamp;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// `unit_price × quantity`, before lateness or penalties.
    pub gross: Decimal,
    pub penalty_per_unit: Decimal,
    /// What the importer owes the grower. Never negative, never above `gross`.
    pub payout: Decimal,
    pub late: bool,
    pub lowest: Option<Decimal>,
    pub highest: Option<Decimal>,
}

/// Computes the payout for `quantity` units shipped under `contract`.
///
/// A shipment arriving after the contract deadline forfeits the whole
/// payment. Otherwise every degree the coldest reading falls below the
/// contract minimum costs `min_penalty_factor` per unit, every degree the
/// warmest reading rises above the maximum costs `max_penalty_factor` per
/// unit, and the two add up. Penalties can take the payout to zero but not
/// below it.
///
/// The result depends only on the arguments.
pub fn settle_shipment(
    contract: &Contract,
    quantity: u64,
    readings: &[TemperatureReading],
    arrival: &TimeStamp,
) -> Result<Settlement, ValidationError> {
    contract.validate()?;

    let gross = contract
        .unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or(ValidationError::AmountOverflow("gross price"))?;

    if *arrival > contract.arrival_deadline {
        tracing::warn!(
            contract = %contract.id,
            %arrival,
            deadline = %contract.arrival_deadline,
            "late shipment, payout forfeited"
        );
        return Ok(Settlement {
            gross,
            penalty_per_unit: Decimal::ZERO,
            payout: Decimal::ZERO,
            late: true,
            lowest: None,
            highest: None,
        });
    }

    let lowest = readings.iter().map(|r| r.centigrade).min();
    let highest = readings.iter().map(|r| r.centigrade).max();

    let mut penalty_per_unit = Decimal::ZERO;
    if let Some(lowest) = lowest.filter(|t| *t < contract.min_temperature) {
        let below = contract
            .min_temperature
            .checked_sub(lowest)
            .and_then(|degrees| degrees.checked_mul(contract.min_penalty_factor))
            .ok_or(ValidationError::AmountOverflow("min temperature penalty"))?;
        penalty_per_unit += below;
        tracing::debug!(contract = %contract.id, %lowest, penalty = %below, "min temperature breached");
    }
    if let Some(highest) = highest.filter(|t| *t > contract.max_temperature) {
        let above = highest
            .checked_sub(contract.max_temperature)
            .and_then(|degrees| degrees.checked_mul(contract.max_penalty_factor))
            .ok_or(ValidationError::AmountOverflow("max temperature penalty"))?;
        penalty_per_unit = penalty_per_unit
            .checked_add(above)
            .ok_or(ValidationError::AmountOverflow("temperature penalty"))?;
        tracing::debug!(contract = %contract.id, %highest, penalty = %above, "max temperature breached");
    }

    let total_penalty = penalty_per_unit
        .checked_mul(Decimal::from(quantity))
        .ok_or(ValidationError::AmountOverflow("total penalty"))?;
    let payout = (gross - total_penalty).max(Decimal::ZERO);

    Ok(Settlement {
        gross,
        penalty_per_unit,
        payout,
        late: false,
        lowest,
        highest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract() -> Contract {
        Contract::draft("CON_001")
            .grower("grower@email.com")
            .importer("importer@email.com")
            .shipper("shipper@email.com")
            .arrival_deadline(TimeStamp::new_with(2024, 6, 15, 12, 0, 0).unwrap())
            .unit_price(dec!(0.5))
            .temperature_range(dec!(2), dec!(10))
            .penalty_factors(dec!(0.2), dec!(0.1))
            .build()
            .unwrap()
    }

    fn readings(values: &[Decimal]) -> Vec<TemperatureReading> {
        values
            .iter()
            .map(|c| TemperatureReading::new(*c, TimeStamp::new(), "LOT_001").unwrap())
            .collect()
    }

    fn on_time() -> TimeStamp {
        TimeStamp::new_with(2024, 6, 15, 11, 0, 0).unwrap()
    }

    #[test]
    fn both_breaches_wipe_out_payment() {
        let s = settle_shipment(&contract(), 100, &readings(&[dec!(1), dec!(13)]), &on_time())
            .unwrap();

        assert_eq!(s.penalty_per_unit, dec!(0.5));
        assert_eq!(s.gross, dec!(50));
        assert_eq!(s.payout, dec!(0));
    }

    #[test]
    fn readings_within_bounds_pay_in_full() {
        let s = settle_shipment(&contract(), 100, &readings(&[dec!(3), dec!(9)]), &on_time())
            .unwrap();
        assert_eq!(s.payout, dec!(50));
        assert_eq!(s.penalty_per_unit, dec!(0));
    }

    #[test]
    fn only_max_breach() {
        // (13 - 10) * 0.1 = 0.3 per unit, 50 - 30 = 20
        let s = settle_shipment(&contract(), 100, &readings(&[dec!(5), dec!(13)]), &on_time())
            .unwrap();
        assert_eq!(s.payout, dec!(20));
    }

    #[test]
    fn late_arrival_forfeits_payment() {
        let late = TimeStamp::new_with(2024, 6, 15, 12, 0, 1).unwrap();
        let s = settle_shipment(&contract(), 100, &readings(&[dec!(5)]), &late).unwrap();

        assert!(s.late);
        assert_eq!(s.payout, dec!(0));
    }

    #[test]
    fn arrival_exactly_at_deadline_is_on_time() {
        let deadline = contract().arrival_deadline;
        let s = settle_shipment(&contract(), 10, &[], &deadline).unwrap();
        assert!(!s.late);
        assert_eq!(s.payout, dec!(5));
    }

    #[test]
    fn no_readings_means_no_penalty() {
        let s = settle_shipment(&contract(), 100, &[], &on_time()).unwrap();
        assert_eq!(s.payout, dec!(50));
        assert_eq!(s.lowest, None);
    }

    #[test]
    fn extreme_readings_overflow_instead_of_panicking() {
        let cold = settle_shipment(&contract(), 1, &readings(&[Decimal::MIN]), &on_time());
        assert_eq!(
            cold,
            Err(ValidationError::AmountOverflow("min temperature penalty"))
        );

        let hot = settle_shipment(&contract(), 1000, &readings(&[Decimal::MAX]), &on_time());
        assert!(matches!(hot, Err(ValidationError::AmountOverflow(_))));
    }

    #[test]
    fn invalid_contract_is_rejected() {
        let mut bad = contract();
        bad.unit_price = dec!(-1);
        assert!(matches!(
            settle_shipment(&bad, 1, &[], &on_time()),
            Err(ValidationError::NonPositiveUnitPrice(_))
        ));
    }
}

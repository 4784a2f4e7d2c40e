//! Fully escalated cost of a single allocation.

use rust_decimal::Decimal;

use staffplan_db::models::EscalationPeriod;

use super::escalation::EscalationSchedule;
use super::{WEEKS_PER_MONTH, round_money};

/// Flat monthly cost of an allocation: `hours_per_week x 4.33 x hourly_rate`.
pub fn monthly_cost(hours_per_week: Decimal, hourly_rate: Decimal) -> Decimal {
    hours_per_week * WEEKS_PER_MONTH * hourly_rate
}

/// Total cost of an allocation over `[start_month, end_month]`, with every
/// month's flat cost scaled by its escalation multiplier.
///
/// A non-positive monthly cost or an inverted range costs nothing. The
/// periods need not be sorted. The result is rounded to cents.
pub fn compute_allocation_total_cost(
    monthly_cost: Decimal,
    start_month: i32,
    end_month: i32,
    escalation_periods: &[EscalationPeriod],
) -> Decimal {
    if monthly_cost <= Decimal::ZERO || end_month < start_month {
        return Decimal::ZERO;
    }

    let schedule = EscalationSchedule::new(escalation_periods);
    if schedule.is_flat() {
        return round_money(monthly_cost * Decimal::from(end_month - start_month + 1));
    }
    let total: Decimal = (start_month..=end_month)
        .map(|month| monthly_cost * schedule.multiplier(month))
        .sum();

    round_money(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn monthly_cost_uses_4_33_weeks() {
        assert_eq!(monthly_cost(dec("40"), dec("50")), dec("8660"));
        assert_eq!(monthly_cost(dec("20"), dec("62.50")), dec("5412.5"));
    }

    #[test]
    fn flat_rate_twelve_months() {
        let total = compute_allocation_total_cost(dec("10000"), 1, 12, &[]);
        assert_eq!(total, dec("120000.00"));
    }

    #[test]
    fn flat_rate_equals_rounded_product() {
        let cases = [
            ("8660", 1, 24),
            ("1234.565", 3, 3),
            ("0.333", 1, 7),
            ("5412.5", 6, 18),
        ];
        for (cost, start, end) in cases {
            let cost = dec(cost);
            let months = Decimal::from(end - start + 1);
            assert_eq!(
                compute_allocation_total_cost(cost, start, end, &[]),
                round_money(cost * months),
                "cost {cost} over {start}..={end}"
            );
        }
    }

    #[test]
    fn zero_rate_periods_cost_the_same_as_flat() {
        let periods = [
            EscalationPeriod::new(1, 6, Decimal::ZERO),
            EscalationPeriod::new(7, 12, Decimal::ZERO),
        ];
        assert_eq!(
            compute_allocation_total_cost(dec("8660"), 1, 12, &periods),
            compute_allocation_total_cost(dec("8660"), 1, 12, &[])
        );
    }

    #[test]
    fn inverted_range_costs_nothing() {
        assert_eq!(compute_allocation_total_cost(dec("10000"), 8, 3, &[]), Decimal::ZERO);
    }

    #[test]
    fn non_positive_monthly_cost_costs_nothing() {
        let periods = [EscalationPeriod::new(1, 12, dec("5"))];
        assert_eq!(compute_allocation_total_cost(Decimal::ZERO, 1, 12, &periods), Decimal::ZERO);
        assert_eq!(compute_allocation_total_cost(dec("-100"), 1, 12, &periods), Decimal::ZERO);
    }

    #[test]
    fn single_month_is_never_escalated() {
        let periods = [EscalationPeriod::new(4, 4, dec("50"))];
        assert_eq!(compute_allocation_total_cost(dec("999.99"), 4, 4, &periods), dec("999.99"));
    }

    #[test]
    fn twelve_percent_over_one_year() {
        let periods = [EscalationPeriod::new(1, 12, dec("12"))];
        let total = compute_allocation_total_cost(dec("10000"), 1, 12, &periods);
        // sum over k = 0..=11 of 10000 * 1.12^(k/12) = 126464.9790835...
        assert_eq!(total, dec("126464.98"));
        assert_eq!(total.scale(), 2);
    }

    #[test]
    fn two_sequential_periods() {
        let periods = [
            EscalationPeriod::new(1, 6, dec("10")),
            EscalationPeriod::new(7, 12, dec("20")),
        ];
        let total = compute_allocation_total_cost(dec("10000"), 1, 12, &periods);
        // 126595.6837673...
        assert_eq!(total, dec("126595.68"));
    }

    #[test]
    fn period_order_does_not_matter() {
        let sorted = [
            EscalationPeriod::new(1, 6, dec("10")),
            EscalationPeriod::new(7, 12, dec("20")),
        ];
        let reversed = [sorted[1], sorted[0]];
        assert_eq!(
            compute_allocation_total_cost(dec("7500"), 1, 12, &sorted),
            compute_allocation_total_cost(dec("7500"), 1, 12, &reversed)
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let periods = [
            EscalationPeriod::new(2, 9, dec("7.25")),
            EscalationPeriod::new(10, 30, dec("3")),
        ];
        let first = compute_allocation_total_cost(dec("8660"), 1, 30, &periods);
        let second = compute_allocation_total_cost(dec("8660"), 1, 30, &periods);
        assert_eq!(first, second);
    }

    #[test]
    fn raising_a_rate_never_lowers_the_total() {
        let mut previous = Decimal::ZERO;
        for rate in ["0", "0.5", "1", "3", "7.5", "12", "25", "100"] {
            let periods = [
                EscalationPeriod::new(1, 12, dec("4")),
                EscalationPeriod::new(13, 36, dec(rate)),
            ];
            let total = compute_allocation_total_cost(dec("5000"), 1, 36, &periods);
            assert!(total >= previous, "rate {rate}: {total} < {previous}");
            previous = total;
        }
    }

    #[test]
    fn escalation_outside_allocation_range_still_compounds() {
        // A period that ended before the allocation starts is fully elapsed
        // for every month of the allocation.
        let periods = [EscalationPeriod::new(1, 12, dec("12"))];
        let total = compute_allocation_total_cost(dec("1000"), 13, 14, &periods);
        assert_eq!(total, dec("2240.00"));
    }
}

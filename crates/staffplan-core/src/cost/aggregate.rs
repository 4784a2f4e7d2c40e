//! Plan-wide aggregation: monthly labor vector, yearly breakdown, totals.

use rust_decimal::Decimal;

use staffplan_db::models::{EscalationPeriod, PlanAggregates, StaffAllocation, YearlyCost};

use super::calculator::compute_allocation_total_cost;
use super::escalation::EscalationSchedule;
use super::round_money;

const MONTHS_PER_YEAR: usize = 12;

/// The inputs the cost engine needs from an allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CostBasis {
    pub monthly_cost: Decimal,
    pub start_month: i32,
    pub end_month: i32,
    pub escalation_periods: Vec<EscalationPeriod>,
}

impl CostBasis {
    /// The allocation's own total cost (unclamped to any plan window).
    pub fn total_cost(&self) -> Decimal {
        compute_allocation_total_cost(
            self.monthly_cost,
            self.start_month,
            self.end_month,
            &self.escalation_periods,
        )
    }
}

impl From<&StaffAllocation> for CostBasis {
    fn from(allocation: &StaffAllocation) -> Self {
        Self {
            monthly_cost: allocation.monthly_cost,
            start_month: allocation.start_month,
            end_month: allocation.end_month,
            escalation_periods: allocation.escalation_periods.0.clone(),
        }
    }
}

/// Unrounded labor cost per plan month, index 0 being month 1.
///
/// Each allocation is clamped to `[1, duration_months]`; allocations with a
/// non-positive monthly cost or an empty clamped range contribute nothing.
pub fn monthly_labor(allocations: &[CostBasis], duration_months: i32) -> Vec<Decimal> {
    let Ok(len) = usize::try_from(duration_months) else {
        return Vec::new();
    };
    let mut months = vec![Decimal::ZERO; len];

    for allocation in allocations {
        if allocation.monthly_cost <= Decimal::ZERO {
            continue;
        }
        let start = allocation.start_month.max(1);
        let end = allocation.end_month.min(duration_months);
        if start > end {
            continue;
        }

        let schedule = EscalationSchedule::new(&allocation.escalation_periods);
        for month in start..=end {
            // start >= 1 and end <= len, so the index is in bounds.
            let idx = (month - 1) as usize;
            months[idx] += allocation.monthly_cost * schedule.multiplier(month);
        }
    }

    months
}

/// Aggregate a plan's allocations into yearly figures and plan totals.
///
/// Each 12-month window (the last may be partial) gets labor, overhead at
/// `overhead_rate` percent of labor, cost, profit at `profit_margin` percent
/// of cost, and price, each rounded to cents. Plan totals sum the unrounded
/// yearly figures and are rounded once at the end.
pub fn compute_plan_costs(
    allocations: &[CostBasis],
    duration_months: i32,
    overhead_rate: Decimal,
    profit_margin: Decimal,
) -> PlanAggregates {
    if duration_months <= 0 {
        return PlanAggregates::default();
    }

    let months = monthly_labor(allocations, duration_months);

    let mut labor_sum = Decimal::ZERO;
    let mut overhead_sum = Decimal::ZERO;
    let mut cost_sum = Decimal::ZERO;
    let mut profit_sum = Decimal::ZERO;
    let mut price_sum = Decimal::ZERO;
    let mut yearly_breakdown = Vec::with_capacity(months.len().div_ceil(MONTHS_PER_YEAR));

    for (idx, window) in months.chunks(MONTHS_PER_YEAR).enumerate() {
        let labor: Decimal = window.iter().copied().sum();
        let overhead = labor * overhead_rate / Decimal::ONE_HUNDRED;
        let cost = labor + overhead;
        let profit = cost * profit_margin / Decimal::ONE_HUNDRED;
        let price = cost + profit;

        yearly_breakdown.push(YearlyCost {
            year: idx as i32 + 1,
            labor_cost: round_money(labor),
            overhead: round_money(overhead),
            total_cost: round_money(cost),
            profit: round_money(profit),
            total_price: round_money(price),
        });

        labor_sum += labor;
        overhead_sum += overhead;
        cost_sum += cost;
        profit_sum += profit;
        price_sum += price;
    }

    PlanAggregates {
        total_labor_cost: round_money(labor_sum),
        total_overhead: round_money(overhead_sum),
        total_cost: round_money(cost_sum),
        total_profit: round_money(profit_sum),
        total_price: round_money(price_sum),
        yearly_breakdown,
    }
}

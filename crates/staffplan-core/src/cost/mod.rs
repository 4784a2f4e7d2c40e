//! The cost engine.
//!
//! Pure functions over plain values: no I/O, no shared state. Amounts are
//! [`Decimal`] and are rounded to cents only where they become an output
//! figure (an allocation total, a yearly breakdown field, a plan total).

pub mod aggregate;
pub mod calculator;
pub mod escalation;

use rust_decimal::{Decimal, RoundingStrategy};

pub use aggregate::{CostBasis, compute_plan_costs, monthly_labor};
pub use calculator::{compute_allocation_total_cost, monthly_cost};
pub use escalation::{EscalationError, EscalationInput, EscalationSchedule};

/// Average number of weeks in a month used to turn weekly hours into a
/// monthly figure.
pub const WEEKS_PER_MONTH: Decimal = Decimal::from_parts(433, 0, 0, false, 2);

/// Round an amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

//! Allocation inputs, their validation, and the coordinator that keeps
//! cached allocation and plan figures consistent across mutations.

pub mod coordinator;

use rust_decimal::Decimal;
use thiserror::Error;

use staffplan_db::models::{AllocationRecord, StaffAllocation};

use crate::cost::escalation::MAX_ESCALATION_MULTIPLIER;
use crate::cost::{
    EscalationError, EscalationInput, EscalationSchedule, compute_allocation_total_cost,
    monthly_cost,
};

pub use coordinator::{
    create_allocation, delete_allocation, recompute_plan, update_allocation, update_plan_terms,
};

/// Hours in a week.
pub const MAX_HOURS_PER_WEEK: Decimal = Decimal::from_parts(168, 0, 0, false, 0);

/// Highest accepted hourly rate.
pub const MAX_HOURLY_RATE: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Validation failures for allocation input.
///
/// An end month before the start month is *not* an error: such an
/// allocation simply costs nothing until it is fixed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AllocationInputError {
    #[error("allocation role must not be empty")]
    EmptyRole,

    #[error("{field} {value} is outside the plan window 1..={duration_months}")]
    MonthOutOfRange {
        field: &'static str,
        value: i32,
        duration_months: i32,
    },

    #[error("hours per week must not be negative, got {0}")]
    NegativeHours(Decimal),

    #[error("hours per week must be at most {max}, got {0}", max = MAX_HOURS_PER_WEEK)]
    TooManyHours(Decimal),

    #[error("hourly rate must not be negative, got {0}")]
    NegativeHourlyRate(Decimal),

    #[error("hourly rate must be at most {max}, got {0}", max = MAX_HOURLY_RATE)]
    HourlyRateTooHigh(Decimal),

    #[error(transparent)]
    Escalation(#[from] EscalationError),
}

/// Everything needed to create an allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationInput {
    pub role: String,
    pub start_month: i32,
    pub end_month: i32,
    pub hours_per_week: Decimal,
    pub hourly_rate: Decimal,
    pub escalation: EscalationInput,
}

impl AllocationInput {
    /// Check the input against the window of the plan it belongs to.
    pub fn validate(&self, duration_months: i32) -> Result<(), AllocationInputError> {
        if self.role.trim().is_empty() {
            return Err(AllocationInputError::EmptyRole);
        }
        for (field, value) in [("start_month", self.start_month), ("end_month", self.end_month)] {
            if value < 1 || value > duration_months {
                return Err(AllocationInputError::MonthOutOfRange {
                    field,
                    value,
                    duration_months,
                });
            }
        }
        if self.hours_per_week < Decimal::ZERO {
            return Err(AllocationInputError::NegativeHours(self.hours_per_week));
        }
        if self.hours_per_week > MAX_HOURS_PER_WEEK {
            return Err(AllocationInputError::TooManyHours(self.hours_per_week));
        }
        if self.hourly_rate < Decimal::ZERO {
            return Err(AllocationInputError::NegativeHourlyRate(self.hourly_rate));
        }
        if self.hourly_rate > MAX_HOURLY_RATE {
            return Err(AllocationInputError::HourlyRateTooHigh(self.hourly_rate));
        }
        self.escalation.validate()?;

        let periods = self.escalation.normalize(self.start_month, self.end_month);
        let bound = EscalationSchedule::new(&periods).max_multiplier(self.end_month);
        if bound.is_none_or(|m| m > MAX_ESCALATION_MULTIPLIER) {
            return Err(EscalationError::CompoundingTooLarge {
                last_month: self.end_month,
            }
            .into());
        }
        Ok(())
    }

    /// Derive the persisted record: normalized escalation periods, flat
    /// monthly cost, and escalated total cost.
    pub fn to_record(&self) -> AllocationRecord {
        let escalation_periods = self.escalation.normalize(self.start_month, self.end_month);
        let (escalation_rate, escalation_start_month) = self.escalation.legacy_fields();
        let monthly_cost = monthly_cost(self.hours_per_week, self.hourly_rate);
        let total_cost = compute_allocation_total_cost(
            monthly_cost,
            self.start_month,
            self.end_month,
            &escalation_periods,
        );
        AllocationRecord {
            role: self.role.clone(),
            start_month: self.start_month,
            end_month: self.end_month,
            hours_per_week: self.hours_per_week,
            hourly_rate: self.hourly_rate,
            monthly_cost,
            escalation_periods,
            escalation_rate,
            escalation_start_month,
            total_cost,
        }
    }
}

impl From<&StaffAllocation> for AllocationInput {
    fn from(allocation: &StaffAllocation) -> Self {
        Self {
            role: allocation.role.clone(),
            start_month: allocation.start_month,
            end_month: allocation.end_month,
            hours_per_week: allocation.hours_per_week,
            hourly_rate: allocation.hourly_rate,
            escalation: match allocation.escalation_rate {
                Some(rate) => EscalationInput::Legacy {
                    rate,
                    start_month: allocation.escalation_start_month,
                },
                None => EscalationInput::Periods(allocation.escalation_periods.0.clone()),
            },
        }
    }
}

/// A partial update of an allocation; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationPatch {
    pub role: Option<String>,
    pub start_month: Option<i32>,
    pub end_month: Option<i32>,
    pub hours_per_week: Option<Decimal>,
    pub hourly_rate: Option<Decimal>,
    pub escalation: Option<EscalationInput>,
}

impl AllocationPatch {
    /// Whether the patch touches any input of the cost calculation.
    pub fn changes_cost_inputs(&self) -> bool {
        self.start_month.is_some()
            || self.end_month.is_some()
            || self.hours_per_week.is_some()
            || self.hourly_rate.is_some()
            || self.escalation.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.role.is_none() && !self.changes_cost_inputs()
    }

    /// Merge the patch over an existing allocation.
    ///
    /// Single-rate escalation is carried over in that form, so its period is
    /// re-derived from the merged months.
    pub fn apply_to(&self, current: &StaffAllocation) -> AllocationInput {
        let base = AllocationInput::from(current);
        AllocationInput {
            role: self.role.clone().unwrap_or(base.role),
            start_month: self.start_month.unwrap_or(base.start_month),
            end_month: self.end_month.unwrap_or(base.end_month),
            hours_per_week: self.hours_per_week.unwrap_or(base.hours_per_week),
            hourly_rate: self.hourly_rate.unwrap_or(base.hourly_rate),
            escalation: self.escalation.clone().unwrap_or(base.escalation),
        }
    }
}

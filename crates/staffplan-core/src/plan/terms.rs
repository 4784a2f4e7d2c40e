//! Plan-level terms: the projection window and the overhead/profit rates.

use rust_decimal::Decimal;
use thiserror::Error;

use staffplan_db::models::StaffPlan;

/// Longest supported projection window: fifty years.
pub const MAX_DURATION_MONTHS: i32 = 600;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanTermsError {
    #[error("plan name must not be empty")]
    EmptyName,

    #[error("duration must be between 1 and {max} months, got {0}", max = MAX_DURATION_MONTHS)]
    InvalidDuration(i32),

    #[error("{field} must be between 0 and 100, got {value}")]
    RateOutOfRange { field: &'static str, value: Decimal },
}

/// The inputs of a plan that feed its cost projection.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTerms {
    pub name: String,
    pub duration_months: i32,
    pub overhead_rate: Decimal,
    pub profit_margin: Decimal,
}

impl PlanTerms {
    pub fn validate(&self) -> Result<(), PlanTermsError> {
        if self.name.trim().is_empty() {
            return Err(PlanTermsError::EmptyName);
        }
        if !(1..=MAX_DURATION_MONTHS).contains(&self.duration_months) {
            return Err(PlanTermsError::InvalidDuration(self.duration_months));
        }
        check_percentage("overhead_rate", self.overhead_rate)?;
        check_percentage("profit_margin", self.profit_margin)?;
        Ok(())
    }

    /// Apply a patch on top of these terms.
    pub fn patched(&self, patch: &PlanTermsPatch) -> Self {
        Self {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            duration_months: patch.duration_months.unwrap_or(self.duration_months),
            overhead_rate: patch.overhead_rate.unwrap_or(self.overhead_rate),
            profit_margin: patch.profit_margin.unwrap_or(self.profit_margin),
        }
    }
}

impl From<&StaffPlan> for PlanTerms {
    fn from(plan: &StaffPlan) -> Self {
        Self {
            name: plan.name.clone(),
            duration_months: plan.duration_months,
            overhead_rate: plan.overhead_rate,
            profit_margin: plan.profit_margin,
        }
    }
}

/// A partial update of [`PlanTerms`]; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanTermsPatch {
    pub name: Option<String>,
    pub duration_months: Option<i32>,
    pub overhead_rate: Option<Decimal>,
    pub profit_margin: Option<Decimal>,
}

impl PlanTermsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn check_percentage(field: &'static str, value: Decimal) -> Result<(), PlanTermsError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(PlanTermsError::RateOutOfRange { field, value });
    }
    Ok(())
}

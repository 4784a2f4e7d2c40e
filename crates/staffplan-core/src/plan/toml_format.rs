//! TOML format types for staffing plan files.
//!
//! These types map directly to the on-disk `plan.toml` format and are
//! deserialized via `serde` + the `toml` crate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use staffplan_db::models::EscalationPeriod;

use super::terms::PlanTerms;
use crate::allocation::AllocationInput;
use crate::cost::EscalationInput;

/// Top-level structure of a plan file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanFile {
    pub plan: PlanMeta,
    #[serde(default)]
    pub allocations: Vec<AllocationToml>,
}

/// Plan-level settings in `[plan]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanMeta {
    /// Set once the plan has been created in the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub duration_months: i32,
    /// Overhead as a percentage of labor cost.
    #[serde(default)]
    pub overhead_rate: Decimal,
    /// Profit as a percentage of labor plus overhead.
    #[serde(default)]
    pub profit_margin: Decimal,
}

impl PlanMeta {
    pub fn terms(&self) -> PlanTerms {
        PlanTerms {
            name: self.name.clone(),
            duration_months: self.duration_months,
            overhead_rate: self.overhead_rate,
            profit_margin: self.profit_margin,
        }
    }
}

/// A single `[[allocations]]` entry.
///
/// Escalation is given either as `escalation_periods` or with the legacy
/// `escalation_rate` / `escalation_start_month` pair. When both are present
/// the period list wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationToml {
    pub role: String,
    pub start_month: i32,
    pub end_month: i32,
    pub hours_per_week: Decimal,
    pub hourly_rate: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub escalation_periods: Vec<EscalationPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_start_month: Option<i32>,
}

impl AllocationToml {
    pub fn has_both_escalation_forms(&self) -> bool {
        !self.escalation_periods.is_empty() && self.escalation_rate.is_some()
    }

    pub fn to_input(&self) -> AllocationInput {
        AllocationInput {
            role: self.role.clone(),
            start_month: self.start_month,
            end_month: self.end_month,
            hours_per_week: self.hours_per_week,
            hourly_rate: self.hourly_rate,
            escalation: EscalationInput::from_fields(
                self.escalation_periods.clone(),
                self.escalation_rate,
                self.escalation_start_month,
            ),
        }
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Value objects stored as JSONB
// ---------------------------------------------------------------------------

/// A sub-range of an allocation's months during which an annual rate
/// compounds the monthly cost.
///
/// Wire shape: `{"start_month": 1, "end_month": 12, "rate": 3.5}` where
/// `rate` is an annual percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPeriod {
    pub start_month: i32,
    pub end_month: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
}

impl EscalationPeriod {
    pub fn new(start_month: i32, end_month: i32, rate: Decimal) -> Self {
        Self {
            start_month,
            end_month,
            rate,
        }
    }

    /// Number of months covered, inclusive on both ends.
    pub fn len_months(&self) -> i32 {
        self.end_month - self.start_month + 1
    }

    pub fn contains(&self, month: i32) -> bool {
        self.start_month <= month && month <= self.end_month
    }
}

/// Cost figures for one 12-month window of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyCost {
    /// 1-based year index.
    pub year: i32,
    pub labor_cost: Decimal,
    pub overhead: Decimal,
    pub total_cost: Decimal,
    pub profit: Decimal,
    pub total_price: Decimal,
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A staffing plan -- the aggregate root owning its allocations.
///
/// The `total_*` columns and `yearly_breakdown` are derived figures. They
/// are only ever written by a full plan recompute.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffPlan {
    pub id: Uuid,
    pub name: String,
    pub duration_months: i32,
    pub overhead_rate: Decimal,
    pub profit_margin: Decimal,
    pub total_labor_cost: Decimal,
    pub total_overhead: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_price: Decimal,
    pub yearly_breakdown: Json<Vec<YearlyCost>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One resource's assignment to a plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffAllocation {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub role: String,
    pub start_month: i32,
    pub end_month: i32,
    pub hours_per_week: Decimal,
    pub hourly_rate: Decimal,
    pub monthly_cost: Decimal,
    pub escalation_periods: Json<Vec<EscalationPeriod>>,
    /// Set when escalation was entered in the single-rate form.
    pub escalation_rate: Option<Decimal>,
    pub escalation_start_month: Option<i32>,
    pub total_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when an allocation is inserted or its inputs change.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRecord {
    pub role: String,
    pub start_month: i32,
    pub end_month: i32,
    pub hours_per_week: Decimal,
    pub hourly_rate: Decimal,
    pub monthly_cost: Decimal,
    pub escalation_periods: Vec<EscalationPeriod>,
    pub escalation_rate: Option<Decimal>,
    pub escalation_start_month: Option<i32>,
    pub total_cost: Decimal,
}

/// Plan-level aggregate figures as produced by a recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAggregates {
    pub total_labor_cost: Decimal,
    pub total_overhead: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_price: Decimal,
    pub yearly_breakdown: Vec<YearlyCost>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Plan service layer.
//!
//! Creates a plan and its allocations from a parsed [`PlanFile`] inside a
//! single database transaction, finishing with a full recompute so the
//! stored figures are consistent from the first commit.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use staffplan_db::models::{PlanAggregates, StaffAllocation, StaffPlan};
use staffplan_db::queries::{allocations as alloc_db, plans as plan_db};

use super::toml_format::PlanFile;
use crate::allocation::recompute_plan;
use crate::cost::{CostBasis, compute_plan_costs};

/// Create a plan and all its allocations from a parsed and validated
/// [`PlanFile`].
///
/// If any step fails, nothing is committed.
pub async fn create_plan_from_file(
    pool: &PgPool,
    file: &PlanFile,
) -> Result<(StaffPlan, Vec<StaffAllocation>)> {
    let terms = file.plan.terms();
    terms.validate()?;

    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = plan_db::insert_plan(
        &mut *tx,
        &terms.name,
        terms.duration_months,
        terms.overhead_rate,
        terms.profit_margin,
    )
    .await?;

    for (idx, entry) in file.allocations.iter().enumerate() {
        let input = entry.to_input();
        input
            .validate(terms.duration_months)
            .with_context(|| format!("allocation #{} ({:?}) is invalid", idx + 1, entry.role))?;
        alloc_db::insert_allocation(&mut *tx, plan.id, &input.to_record()).await?;
    }

    let plan = recompute_plan(&mut tx, plan.id).await?;
    let allocations = alloc_db::list_allocations_for_plan(&mut *tx, plan.id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        plan_id = %plan.id,
        name = %plan.name,
        allocations = allocations.len(),
        total_price = %plan.total_price,
        "plan created"
    );
    Ok((plan, allocations))
}

/// Fetch a plan and all its allocations.
pub async fn get_plan_with_allocations(
    pool: &PgPool,
    plan_id: Uuid,
) -> Result<(StaffPlan, Vec<StaffAllocation>)> {
    let plan = plan_db::get_plan(pool, plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found"))?;

    let allocations = alloc_db::list_allocations_for_plan(pool, plan_id).await?;

    Ok((plan, allocations))
}

/// Delete a plan together with its allocations.
pub async fn delete_plan(pool: &PgPool, plan_id: Uuid) -> Result<()> {
    plan_db::delete_plan(pool, plan_id).await?;
    info!(plan_id = %plan_id, "plan deleted");
    Ok(())
}

/// The cost of one allocation in a projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationProjection {
    pub role: String,
    pub start_month: i32,
    pub end_month: i32,
    pub monthly_cost: Decimal,
    pub total_cost: Decimal,
}

/// What a plan file would cost, computed without touching the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanProjection {
    pub name: String,
    pub duration_months: i32,
    pub allocations: Vec<AllocationProjection>,
    #[serde(flatten)]
    pub aggregates: PlanAggregates,
}

/// Project a plan file's costs in memory.
///
/// The file is expected to have passed [`super::parse_plan_file`].
pub fn project_plan_file(file: &PlanFile) -> PlanProjection {
    let mut allocations = Vec::with_capacity(file.allocations.len());
    let mut bases = Vec::with_capacity(file.allocations.len());

    for entry in &file.allocations {
        let record = entry.to_input().to_record();
        allocations.push(AllocationProjection {
            role: record.role.clone(),
            start_month: record.start_month,
            end_month: record.end_month,
            monthly_cost: record.monthly_cost,
            total_cost: record.total_cost,
        });
        bases.push(CostBasis {
            monthly_cost: record.monthly_cost,
            start_month: record.start_month,
            end_month: record.end_month,
            escalation_periods: record.escalation_periods,
        });
    }

    let aggregates = compute_plan_costs(
        &bases,
        file.plan.duration_months,
        file.plan.overhead_rate,
        file.plan.profit_margin,
    );

    PlanProjection {
        name: file.plan.name.clone(),
        duration_months: file.plan.duration_months,
        allocations,
        aggregates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::parse_plan_file;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn projection_of_flat_plan() {
        let file = parse_plan_file(
            r#"
[plan]
name = "Flat"
duration_months = 12
overhead_rate = 10
profit_margin = 10

[[allocations]]
role = "Engineer"
start_month = 1
end_month = 12
hours_per_week = 40
hourly_rate = 50
"#,
        )
        .expect("should parse");

        let projection = project_plan_file(&file);
        assert_eq!(projection.allocations.len(), 1);
        assert_eq!(projection.allocations[0].monthly_cost, dec("8660"));
        assert_eq!(projection.allocations[0].total_cost, dec("103920.00"));

        let agg = &projection.aggregates;
        assert_eq!(agg.total_labor_cost, dec("103920.00"));
        assert_eq!(agg.total_overhead, dec("10392.00"));
        assert_eq!(agg.total_cost, dec("114312.00"));
        assert_eq!(agg.total_profit, dec("11431.20"));
        assert_eq!(agg.total_price, dec("125743.20"));
        assert_eq!(agg.yearly_breakdown.len(), 1);
    }

    #[test]
    fn projection_clamps_to_plan_window_in_aggregates_only() {
        let file = parse_plan_file(
            r#"
[plan]
name = "Two years"
duration_months = 24

[[allocations]]
role = "Engineer"
start_month = 7
end_month = 18
hours_per_week = 40
hourly_rate = 50
"#,
        )
        .expect("should parse");

        let projection = project_plan_file(&file);
        let years = &projection.aggregates.yearly_breakdown;
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].labor_cost, dec("51960.00"));
        assert_eq!(years[1].labor_cost, dec("51960.00"));
        assert_eq!(projection.aggregates.total_labor_cost, dec("103920.00"));
    }

    #[test]
    fn projection_of_empty_plan_is_zero() {
        let file = parse_plan_file("[plan]\nname = \"Empty\"\nduration_months = 30\n")
            .expect("should parse");
        let projection = project_plan_file(&file);
        assert!(projection.allocations.is_empty());
        assert_eq!(projection.aggregates.total_price, Decimal::ZERO);
        assert_eq!(projection.aggregates.yearly_breakdown.len(), 3);
    }
}

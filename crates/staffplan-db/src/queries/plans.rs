//! Database query functions for the `staff_plans` table.
//!
//! Every function takes a generic [`PgExecutor`] so it can run either
//! directly on a pool or inside a caller-owned transaction.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{PlanAggregates, StaffPlan};

/// Insert a new plan. Aggregates start at zero.
pub async fn insert_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
    duration_months: i32,
    overhead_rate: Decimal,
    profit_margin: Decimal,
) -> Result<StaffPlan> {
    let plan = sqlx::query_as::<_, StaffPlan>(
        "INSERT INTO staff_plans (name, duration_months, overhead_rate, profit_margin) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(name)
    .bind(duration_months)
    .bind(overhead_rate)
    .bind(profit_margin)
    .fetch_one(executor)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<StaffPlan>> {
    let plan = sqlx::query_as::<_, StaffPlan>("SELECT * FROM staff_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// Fetch a plan and take a row lock on it for the rest of the transaction.
///
/// Every mutation that ends in a plan recompute takes this lock first, so
/// two writers on the same plan queue up instead of interleaving their
/// read-allocations / write-aggregates phases.
pub async fn lock_plan<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<StaffPlan>> {
    let plan = sqlx::query_as::<_, StaffPlan>("SELECT * FROM staff_plans WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to lock plan")?;

    Ok(plan)
}

/// List all plans, newest first.
pub async fn list_plans<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<StaffPlan>> {
    let plans = sqlx::query_as::<_, StaffPlan>("SELECT * FROM staff_plans ORDER BY created_at DESC")
        .fetch_all(executor)
        .await
        .context("failed to list plans")?;

    Ok(plans)
}

/// Overwrite the plan's terms (name, window and rates).
///
/// Aggregates are left untouched; the caller is expected to recompute in
/// the same transaction.
pub async fn update_plan_terms<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    name: &str,
    duration_months: i32,
    overhead_rate: Decimal,
    profit_margin: Decimal,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE staff_plans \
         SET name = $1, duration_months = $2, overhead_rate = $3, profit_margin = $4, \
             updated_at = now() \
         WHERE id = $5",
    )
    .bind(name)
    .bind(duration_months)
    .bind(overhead_rate)
    .bind(profit_margin)
    .bind(id)
    .execute(executor)
    .await
    .context("failed to update plan terms")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("plan {id} not found");
    }

    Ok(())
}

/// Write the derived aggregate figures of a plan. Returns the updated row.
pub async fn write_plan_aggregates<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    aggregates: &PlanAggregates,
) -> Result<StaffPlan> {
    let plan = sqlx::query_as::<_, StaffPlan>(
        "UPDATE staff_plans \
         SET total_labor_cost = $1, total_overhead = $2, total_cost = $3, \
             total_profit = $4, total_price = $5, yearly_breakdown = $6, \
             updated_at = now() \
         WHERE id = $7 \
         RETURNING *",
    )
    .bind(aggregates.total_labor_cost)
    .bind(aggregates.total_overhead)
    .bind(aggregates.total_cost)
    .bind(aggregates.total_profit)
    .bind(aggregates.total_price)
    .bind(Json(&aggregates.yearly_breakdown))
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to write plan aggregates")?;

    plan.with_context(|| format!("plan {id} not found"))
}

/// Delete a plan. Its allocations are removed by the foreign-key cascade.
pub async fn delete_plan<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM staff_plans WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete plan")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("plan {id} not found");
    }

    Ok(())
}

//! Database query functions for the `staff_allocations` table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use sqlx::types::Json;
use uuid::Uuid;

use crate::models::{AllocationRecord, StaffAllocation};

/// Insert an allocation with its already-computed cost figures.
pub async fn insert_allocation<'e, E: PgExecutor<'e>>(
    executor: E,
    plan_id: Uuid,
    record: &AllocationRecord,
) -> Result<StaffAllocation> {
    let allocation = sqlx::query_as::<_, StaffAllocation>(
        "INSERT INTO staff_allocations \
             (plan_id, role, start_month, end_month, hours_per_week, hourly_rate, \
              monthly_cost, escalation_periods, escalation_rate, escalation_start_month, \
              total_cost) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(&record.role)
    .bind(record.start_month)
    .bind(record.end_month)
    .bind(record.hours_per_week)
    .bind(record.hourly_rate)
    .bind(record.monthly_cost)
    .bind(Json(&record.escalation_periods))
    .bind(record.escalation_rate)
    .bind(record.escalation_start_month)
    .bind(record.total_cost)
    .fetch_one(executor)
    .await
    .with_context(|| format!("failed to insert allocation {:?}", record.role))?;

    Ok(allocation)
}

/// Fetch a single allocation by ID.
pub async fn get_allocation<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<StaffAllocation>> {
    let allocation =
        sqlx::query_as::<_, StaffAllocation>("SELECT * FROM staff_allocations WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to fetch allocation")?;

    Ok(allocation)
}

/// Look up which plan an allocation belongs to.
pub async fn get_allocation_plan_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Uuid>> {
    let plan_id: Option<Uuid> =
        sqlx::query_scalar("SELECT plan_id FROM staff_allocations WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
            .context("failed to look up allocation plan")?;

    Ok(plan_id)
}

/// List all allocations of a plan in creation order.
pub async fn list_allocations_for_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    plan_id: Uuid,
) -> Result<Vec<StaffAllocation>> {
    let allocations = sqlx::query_as::<_, StaffAllocation>(
        "SELECT * FROM staff_allocations WHERE plan_id = $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(plan_id)
    .fetch_all(executor)
    .await
    .context("failed to list allocations for plan")?;

    Ok(allocations)
}

/// Overwrite every input and derived field of an allocation.
pub async fn update_allocation<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    record: &AllocationRecord,
) -> Result<StaffAllocation> {
    let allocation = sqlx::query_as::<_, StaffAllocation>(
        "UPDATE staff_allocations \
         SET role = $1, start_month = $2, end_month = $3, hours_per_week = $4, \
             hourly_rate = $5, monthly_cost = $6, escalation_periods = $7, \
             escalation_rate = $8, escalation_start_month = $9, \
             total_cost = $10, updated_at = now() \
         WHERE id = $11 \
         RETURNING *",
    )
    .bind(&record.role)
    .bind(record.start_month)
    .bind(record.end_month)
    .bind(record.hours_per_week)
    .bind(record.hourly_rate)
    .bind(record.monthly_cost)
    .bind(Json(&record.escalation_periods))
    .bind(record.escalation_rate)
    .bind(record.escalation_start_month)
    .bind(record.total_cost)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update allocation")?;

    allocation.with_context(|| format!("allocation {id} not found"))
}

/// Write the cached `total_cost` of an allocation.
pub async fn write_allocation_total_cost<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    total_cost: Decimal,
) -> Result<()> {
    let result = sqlx::query("UPDATE staff_allocations SET total_cost = $1 WHERE id = $2")
        .bind(total_cost)
        .bind(id)
        .execute(executor)
        .await
        .context("failed to write allocation total cost")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("allocation {id} not found");
    }

    Ok(())
}

/// Delete an allocation, returning the removed row.
pub async fn delete_allocation<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<StaffAllocation>> {
    let allocation = sqlx::query_as::<_, StaffAllocation>(
        "DELETE FROM staff_allocations WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to delete allocation")?;

    Ok(allocation)
}

/// Count allocations in a plan.
pub async fn count_allocations<'e, E: PgExecutor<'e>>(executor: E, plan_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff_allocations WHERE plan_id = $1")
        .bind(plan_id)
        .fetch_one(executor)
        .await
        .context("failed to count allocations")?;

    Ok(count)
}

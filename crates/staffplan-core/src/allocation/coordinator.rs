//! Transactional recompute discipline for plans and their allocations.
//!
//! Every mutation follows the same shape inside one transaction:
//!
//! ```text
//! begin -> lock plan row -> mutate -> recompute_plan -> commit
//! ```
//!
//! The plan row lock serializes writers on the same plan, so a recompute
//! always reads a complete, current allocation set. Writers on different
//! plans never contend. Any error drops the transaction, leaving the last
//! committed figures untouched.

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use staffplan_db::models::{AllocationRecord, StaffAllocation, StaffPlan};
use staffplan_db::queries::{allocations as alloc_db, plans as plan_db};

use super::{AllocationInput, AllocationInputError, AllocationPatch};
use crate::cost::{CostBasis, compute_plan_costs};
use crate::plan::terms::{PlanTerms, PlanTermsPatch};

/// Recompute every allocation's `total_cost` and the plan aggregates from
/// the plan's full allocation set, writing all of them.
///
/// Must run on the connection of the transaction that performed the
/// mutation, after the plan row has been locked.
pub async fn recompute_plan(conn: &mut PgConnection, plan_id: Uuid) -> Result<StaffPlan> {
    let plan = plan_db::get_plan(&mut *conn, plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found"))?;
    let allocations = alloc_db::list_allocations_for_plan(&mut *conn, plan_id).await?;

    let mut bases = Vec::with_capacity(allocations.len());
    for allocation in &allocations {
        let basis = CostBasis::from(allocation);
        let total_cost = basis.total_cost();
        if total_cost != allocation.total_cost {
            debug!(
                allocation_id = %allocation.id,
                previous = %allocation.total_cost,
                current = %total_cost,
                "allocation total cost changed"
            );
        }
        alloc_db::write_allocation_total_cost(&mut *conn, allocation.id, total_cost).await?;
        bases.push(basis);
    }

    let aggregates = compute_plan_costs(
        &bases,
        plan.duration_months,
        plan.overhead_rate,
        plan.profit_margin,
    );
    let plan = plan_db::write_plan_aggregates(&mut *conn, plan_id, &aggregates).await?;

    debug!(
        plan_id = %plan_id,
        allocations = allocations.len(),
        years = aggregates.yearly_breakdown.len(),
        total_price = %plan.total_price,
        "plan recomputed"
    );
    Ok(plan)
}

/// Lock the plan row for the rest of the transaction.
async fn lock_plan(conn: &mut PgConnection, plan_id: Uuid) -> Result<StaffPlan> {
    plan_db::lock_plan(conn, plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found"))
}

/// Resolve an allocation's plan and lock it.
async fn lock_plan_of(conn: &mut PgConnection, allocation_id: Uuid) -> Result<StaffPlan> {
    let plan_id = alloc_db::get_allocation_plan_id(&mut *conn, allocation_id)
        .await?
        .with_context(|| format!("allocation {allocation_id} not found"))?;
    lock_plan(conn, plan_id).await
}

/// Add an allocation to a plan and recompute the plan.
pub async fn create_allocation(
    pool: &PgPool,
    plan_id: Uuid,
    input: &AllocationInput,
) -> Result<StaffAllocation> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = lock_plan(&mut tx, plan_id).await?;
    input.validate(plan.duration_months)?;

    let record = input.to_record();
    let inserted = alloc_db::insert_allocation(&mut *tx, plan_id, &record).await?;
    let plan = recompute_plan(&mut tx, plan_id).await?;

    let allocation = alloc_db::get_allocation(&mut *tx, inserted.id)
        .await?
        .with_context(|| format!("allocation {} vanished during recompute", inserted.id))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        plan_id = %plan_id,
        allocation_id = %allocation.id,
        total_cost = %allocation.total_cost,
        plan_total_price = %plan.total_price,
        "allocation created"
    );
    Ok(allocation)
}

/// Apply a patch to an allocation and recompute its plan.
///
/// The allocation's monthly and total cost are re-derived when the patch
/// touches a cost input; the plan recompute runs in every case.
pub async fn update_allocation(
    pool: &PgPool,
    allocation_id: Uuid,
    patch: &AllocationPatch,
) -> Result<StaffAllocation> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = lock_plan_of(&mut tx, allocation_id).await?;
    // Read after taking the lock so the patch applies to the latest row.
    let current = alloc_db::get_allocation(&mut *tx, allocation_id)
        .await?
        .with_context(|| format!("allocation {allocation_id} not found"))?;

    let merged = patch.apply_to(&current);
    let record = if patch.changes_cost_inputs() {
        merged.validate(plan.duration_months)?;
        merged.to_record()
    } else {
        // A rename must not fail on months left outside a since-shrunk
        // plan window, so only the role is checked here.
        if merged.role.trim().is_empty() {
            return Err(AllocationInputError::EmptyRole.into());
        }
        AllocationRecord {
            role: merged.role,
            start_month: current.start_month,
            end_month: current.end_month,
            hours_per_week: current.hours_per_week,
            hourly_rate: current.hourly_rate,
            monthly_cost: current.monthly_cost,
            escalation_periods: current.escalation_periods.0.clone(),
            escalation_rate: current.escalation_rate,
            escalation_start_month: current.escalation_start_month,
            total_cost: current.total_cost,
        }
    };
    alloc_db::update_allocation(&mut *tx, allocation_id, &record).await?;
    let plan = recompute_plan(&mut tx, plan.id).await?;

    let allocation = alloc_db::get_allocation(&mut *tx, allocation_id)
        .await?
        .with_context(|| format!("allocation {allocation_id} vanished during recompute"))?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        plan_id = %plan.id,
        allocation_id = %allocation_id,
        cost_inputs_changed = patch.changes_cost_inputs(),
        total_cost = %allocation.total_cost,
        plan_total_price = %plan.total_price,
        "allocation updated"
    );
    Ok(allocation)
}

/// Remove an allocation and recompute its plan from the remaining set.
///
/// Returns the removed allocation as it was before deletion.
pub async fn delete_allocation(pool: &PgPool, allocation_id: Uuid) -> Result<StaffAllocation> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let plan = lock_plan_of(&mut tx, allocation_id).await?;
    let removed = alloc_db::delete_allocation(&mut *tx, allocation_id)
        .await?
        .with_context(|| format!("allocation {allocation_id} not found"))?;
    let plan = recompute_plan(&mut tx, plan.id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        plan_id = %plan.id,
        allocation_id = %allocation_id,
        removed_total_cost = %removed.total_cost,
        plan_total_price = %plan.total_price,
        "allocation deleted"
    );
    Ok(removed)
}

/// Change a plan's name, window or rates and recompute it.
///
/// Shrinking the window is allowed even when allocations extend past the
/// new end; the aggregator clamps them.
pub async fn update_plan_terms(
    pool: &PgPool,
    plan_id: Uuid,
    patch: &PlanTermsPatch,
) -> Result<StaffPlan> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    let current = lock_plan(&mut tx, plan_id).await?;
    let terms = PlanTerms::from(&current).patched(patch);
    terms.validate()?;

    plan_db::update_plan_terms(
        &mut *tx,
        plan_id,
        &terms.name,
        terms.duration_months,
        terms.overhead_rate,
        terms.profit_margin,
    )
    .await?;
    let plan = recompute_plan(&mut tx, plan_id).await?;

    tx.commit().await.context("failed to commit transaction")?;

    info!(
        plan_id = %plan_id,
        duration_months = plan.duration_months,
        total_price = %plan.total_price,
        "plan terms updated"
    );
    Ok(plan)
}

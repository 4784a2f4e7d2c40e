//! CLI handlers for `staffplan alloc` subcommands.
//!
//! Every mutation goes through the coordinator, so the plan figures printed
//! afterwards always reflect the full allocation set.

use anyhow::{Result, bail};
use rust_decimal::Decimal;
use sqlx::PgPool;

use staffplan_core::allocation::{
    AllocationInput, AllocationPatch, create_allocation, delete_allocation, update_allocation,
};
use staffplan_core::cost::EscalationInput;
use staffplan_db::models::{EscalationPeriod, StaffAllocation};
use staffplan_db::queries::{allocations as alloc_db, plans as plan_db};

use crate::report_cmd::{money, render_allocations};
use crate::resolve::{parse_allocation_id, resolve_plan_id};
use crate::{AllocCommands, EscalationArgs};

/// Dispatch an `AllocCommands` variant to the appropriate handler.
pub async fn run_alloc_command(command: AllocCommands, pool: &PgPool) -> Result<()> {
    match command {
        AllocCommands::Add {
            plan,
            role,
            start,
            end,
            hours,
            rate,
            escalation,
        } => {
            let input = AllocationInput {
                role,
                start_month: start,
                end_month: end,
                hours_per_week: hours,
                hourly_rate: rate,
                escalation: escalation_input(&escalation).unwrap_or_default(),
            };
            cmd_add(pool, &plan, &input).await
        }
        AllocCommands::Update {
            id,
            role,
            start,
            end,
            hours,
            rate,
            escalation,
            no_escalation,
        } => {
            let escalation = if no_escalation {
                if escalation_input(&escalation).is_some() {
                    bail!("--no-escalation cannot be combined with --period or --escalation-rate");
                }
                Some(EscalationInput::None)
            } else {
                escalation_input(&escalation)
            };
            let patch = AllocationPatch {
                role,
                start_month: start,
                end_month: end,
                hours_per_week: hours,
                hourly_rate: rate,
                escalation,
            };
            cmd_update(pool, &id, &patch).await
        }
        AllocCommands::Remove { id } => cmd_remove(pool, &id).await,
        AllocCommands::List { plan } => cmd_list(pool, &plan).await,
    }
}

/// Escalation given on the command line, if any.
///
/// `--period` wins over the legacy `--escalation-rate` form.
fn escalation_input(args: &EscalationArgs) -> Option<EscalationInput> {
    if args.period.is_empty() && args.escalation_rate.is_none() {
        return None;
    }
    Some(EscalationInput::from_fields(
        args.period.clone(),
        args.escalation_rate,
        args.escalation_start,
    ))
}

/// Parse a `--period` value of the form `start:end:rate`, e.g. `13:24:3.5`.
pub fn parse_period(s: &str) -> Result<EscalationPeriod, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let [start, end, rate] = parts.as_slice() else {
        return Err(format!("expected start:end:rate, got {s:?}"));
    };
    let start_month = start
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid start month {start:?}: {e}"))?;
    let end_month = end
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid end month {end:?}: {e}"))?;
    let rate = rate
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid rate {rate:?}: {e}"))?;
    Ok(EscalationPeriod::new(start_month, end_month, rate))
}

async fn print_plan_total(pool: &PgPool, allocation: &StaffAllocation) -> Result<()> {
    if let Some(plan) = plan_db::get_plan(pool, allocation.plan_id).await? {
        println!("  Plan price:   {}", money(plan.total_price));
    }
    Ok(())
}

async fn cmd_add(pool: &PgPool, plan_id_str: &str, input: &AllocationInput) -> Result<()> {
    let plan_id = resolve_plan_id(plan_id_str)?;
    let allocation = create_allocation(pool, plan_id, input).await?;

    println!("Allocation added.");
    println!();
    println!("  ID:           {}", allocation.id);
    println!("  Role:         {}", allocation.role);
    println!("  Monthly cost: {}", money(allocation.monthly_cost));
    println!("  Total cost:   {}", money(allocation.total_cost));
    print_plan_total(pool, &allocation).await
}

async fn cmd_update(pool: &PgPool, id_str: &str, patch: &AllocationPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("nothing to update; pass at least one field to change");
    }
    let id = parse_allocation_id(id_str)?;
    let allocation = update_allocation(pool, id, patch).await?;

    println!("Allocation updated.");
    println!();
    println!("  ID:           {}", allocation.id);
    println!("  Role:         {}", allocation.role);
    println!("  Total cost:   {}", money(allocation.total_cost));
    print_plan_total(pool, &allocation).await
}

async fn cmd_remove(pool: &PgPool, id_str: &str) -> Result<()> {
    let id = parse_allocation_id(id_str)?;
    let removed = delete_allocation(pool, id).await?;

    println!("Allocation {} ({}) removed.", removed.id, removed.role);
    print_plan_total(pool, &removed).await
}

async fn cmd_list(pool: &PgPool, plan_id_str: &str) -> Result<()> {
    let plan_id = resolve_plan_id(plan_id_str)?;
    let allocations = alloc_db::list_allocations_for_plan(pool, plan_id).await?;
    print!("{}", render_allocations(&allocations));
    Ok(())
}

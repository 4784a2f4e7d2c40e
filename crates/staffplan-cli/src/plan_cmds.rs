//! CLI handlers for `staffplan plan` subcommands.
//!
//! Implements:
//! - `staffplan plan create <file>`  -- create a plan from a plan file
//! - `staffplan plan show [plan]`    -- show plan details or list all plans
//! - `staffplan plan update <plan>`  -- change name, window or rates
//! - `staffplan plan delete <plan>`  -- delete a plan and its allocations
//! - `staffplan plan export <plan>`  -- materialize a plan as a plan file

use anyhow::{Context, Result, bail};
use sqlx::PgPool;

use staffplan_core::allocation::update_plan_terms;
use staffplan_core::plan::{
    PlanTermsPatch, create_plan_from_file, delete_plan, get_plan_with_allocations,
    materialize_plan, parse_plan_file,
};
use staffplan_db::queries::{allocations as alloc_db, plans as plan_db};

use crate::PlanCommands;
use crate::report_cmd::{money, render_allocations, render_breakdown, plan_aggregates};
use crate::resolve::{resolve_plan_id, write_plan_id_to_file};

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    match command {
        PlanCommands::Create { file } => cmd_create(pool, &file).await,
        PlanCommands::Show { plan_id } => match plan_id {
            Some(id) => cmd_show_one(pool, &id).await,
            None => cmd_show_all(pool).await,
        },
        PlanCommands::Update {
            plan_id,
            name,
            duration,
            overhead,
            profit,
        } => {
            let patch = PlanTermsPatch {
                name,
                duration_months: duration,
                overhead_rate: overhead,
                profit_margin: profit,
            };
            cmd_update(pool, &plan_id, &patch).await
        }
        PlanCommands::Delete { plan_id } => cmd_delete(pool, &plan_id).await,
        PlanCommands::Export { plan_id, output } => {
            cmd_export(pool, &plan_id, output.as_deref()).await
        }
    }
}

// -----------------------------------------------------------------------
// staffplan plan create <file>
// -----------------------------------------------------------------------

/// Read a plan file from disk, parse and validate it, insert into the DB,
/// write the new plan ID back into the file, and print a summary.
async fn cmd_create(pool: &PgPool, file_path: &str) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read plan file: {file_path}"))?;

    let plan_file = parse_plan_file(&content)
        .with_context(|| format!("failed to parse plan file: {file_path}"))?;

    if let Some(existing) = plan_file.plan.id {
        eprintln!(
            "Note: {file_path} already references plan {existing}; creating a new plan and \
             replacing the id."
        );
    }

    let (plan, allocations) = create_plan_from_file(pool, &plan_file).await?;
    write_plan_id_to_file(file_path, plan.id)?;

    println!("Plan created successfully.");
    println!();
    println!("  Plan ID:      {}", plan.id);
    println!("  Name:         {}", plan.name);
    println!("  Duration:     {} months", plan.duration_months);
    println!("  Allocations:  {}", allocations.len());
    println!("  Total price:  {}", money(plan.total_price));
    println!();
    println!("Plan ID written to {file_path}.");

    Ok(())
}

// -----------------------------------------------------------------------
// staffplan plan show (list all)
// -----------------------------------------------------------------------

/// List all plans with summary info.
async fn cmd_show_all(pool: &PgPool) -> Result<()> {
    let plans = plan_db::list_plans(pool).await?;

    if plans.is_empty() {
        println!("No plans found. Use `staffplan plan create <file>` to create one.");
        return Ok(());
    }

    let mut counts = Vec::with_capacity(plans.len());
    for plan in &plans {
        counts.push(alloc_db::count_allocations(pool, plan.id).await?);
    }

    let id_w = 36;
    let name_w = plans
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<id_w$}  {:<name_w$}  {:>6}  {:>5}  {:>16}  CREATED",
        "ID", "NAME", "MONTHS", "ALLOC", "PRICE",
    );
    for (plan, count) in plans.iter().zip(&counts) {
        let created = plan.created_at.format("%Y-%m-%d %H:%M");
        println!(
            "{:<id_w$}  {:<name_w$}  {:>6}  {:>5}  {:>16}  {}",
            plan.id,
            plan.name,
            plan.duration_months,
            count,
            money(plan.total_price),
            created,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// staffplan plan show <plan>
// -----------------------------------------------------------------------

/// Show detailed info for a single plan.
async fn cmd_show_one(pool: &PgPool, plan_id_str: &str) -> Result<()> {
    let plan_id = resolve_plan_id(plan_id_str)?;
    let (plan, allocations) = get_plan_with_allocations(pool, plan_id).await?;

    println!("Plan: {}", plan.name);
    println!("  ID:             {}", plan.id);
    println!("  Duration:       {} months", plan.duration_months);
    println!("  Overhead rate:  {}%", plan.overhead_rate.normalize());
    println!("  Profit margin:  {}%", plan.profit_margin.normalize());
    println!(
        "  Created:        {}",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Updated:        {}",
        plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    print!("{}", render_allocations(&allocations));
    println!();
    print!("{}", render_breakdown(&plan_aggregates(&plan)));

    Ok(())
}

// -----------------------------------------------------------------------
// staffplan plan update <plan>
// -----------------------------------------------------------------------

async fn cmd_update(pool: &PgPool, plan_id_str: &str, patch: &PlanTermsPatch) -> Result<()> {
    if patch.is_empty() {
        bail!("nothing to update; pass at least one of --name, --duration, --overhead, --profit");
    }
    let plan_id = resolve_plan_id(plan_id_str)?;
    let plan = update_plan_terms(pool, plan_id, patch).await?;

    println!("Plan updated.");
    println!();
    println!("  Plan ID:      {}", plan.id);
    println!("  Name:         {}", plan.name);
    println!("  Duration:     {} months", plan.duration_months);
    println!("  Total price:  {}", money(plan.total_price));

    Ok(())
}

// -----------------------------------------------------------------------
// staffplan plan delete <plan>
// -----------------------------------------------------------------------

async fn cmd_delete(pool: &PgPool, plan_id_str: &str) -> Result<()> {
    let plan_id = resolve_plan_id(plan_id_str)?;
    delete_plan(pool, plan_id).await?;
    println!("Plan {plan_id} deleted.");
    Ok(())
}

// -----------------------------------------------------------------------
// staffplan plan export <plan> [--output <file>]
// -----------------------------------------------------------------------

/// Materialize a plan from the database and write to a file or stdout.
async fn cmd_export(pool: &PgPool, plan_id_str: &str, output: Option<&str>) -> Result<()> {
    let plan_id = resolve_plan_id(plan_id_str)?;
    let toml_content = materialize_plan(pool, plan_id).await?;

    match output {
        Some(path) => {
            std::fs::write(path, &toml_content)
                .with_context(|| format!("failed to write to {path}"))?;
            println!("Plan exported to {path}");
        }
        None => {
            print!("{toml_content}");
        }
    }

    Ok(())
}

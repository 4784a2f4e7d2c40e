//! `staffplan report` command: yearly breakdown and totals for a plan.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use staffplan_core::cost::round_money;
use staffplan_core::plan::get_plan_with_allocations;
use staffplan_db::models::{PlanAggregates, StaffAllocation, StaffPlan};

/// JSON shape of `staffplan report --json`.
#[derive(Serialize)]
struct Report<'a> {
    plan: &'a StaffPlan,
    allocations: &'a [StaffAllocation],
}

/// Run the report command.
pub async fn run_report(pool: &PgPool, plan_id_str: &str, json: bool) -> Result<()> {
    let plan_id = crate::resolve::resolve_plan_id(plan_id_str)?;
    let (plan, allocations) = get_plan_with_allocations(pool, plan_id).await?;

    if json {
        let report = Report {
            plan: &plan,
            allocations: &allocations,
        };
        let out = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{out}");
        return Ok(());
    }

    println!("Plan: {} ({})", plan.name, plan.id);
    println!(
        "Duration: {} months, overhead {}%, profit {}%",
        plan.duration_months,
        plan.overhead_rate.normalize(),
        plan.profit_margin.normalize()
    );
    println!();
    print!("{}", render_allocations(&allocations));
    println!();
    print!("{}", render_breakdown(&plan_aggregates(&plan)));

    Ok(())
}

/// The stored aggregate figures of a plan.
pub fn plan_aggregates(plan: &StaffPlan) -> PlanAggregates {
    PlanAggregates {
        total_labor_cost: plan.total_labor_cost,
        total_overhead: plan.total_overhead,
        total_cost: plan.total_cost,
        total_profit: plan.total_profit,
        total_price: plan.total_price,
        yearly_breakdown: plan.yearly_breakdown.0.clone(),
    }
}

/// Format an amount rounded to cents with exactly two decimals.
pub fn money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

/// Render the per-year table followed by a totals row.
pub fn render_breakdown(aggregates: &PlanAggregates) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:>16} {:>16} {:>16} {:>16} {:>16}",
        "YEAR", "LABOR", "OVERHEAD", "COST", "PROFIT", "PRICE"
    );
    let _ = writeln!(out, "{}", "-".repeat(91));

    for year in &aggregates.yearly_breakdown {
        let _ = writeln!(
            out,
            "{:<6} {:>16} {:>16} {:>16} {:>16} {:>16}",
            year.year,
            money(year.labor_cost),
            money(year.overhead),
            money(year.total_cost),
            money(year.profit),
            money(year.total_price),
        );
    }

    let _ = writeln!(out, "{}", "-".repeat(91));
    let _ = writeln!(
        out,
        "{:<6} {:>16} {:>16} {:>16} {:>16} {:>16}",
        "TOTAL",
        money(aggregates.total_labor_cost),
        money(aggregates.total_overhead),
        money(aggregates.total_cost),
        money(aggregates.total_profit),
        money(aggregates.total_price),
    );
    out
}

/// Render the allocation table of a plan.
pub fn render_allocations(allocations: &[StaffAllocation]) -> String {
    let mut out = String::new();
    if allocations.is_empty() {
        out.push_str("No allocations.\n");
        return out;
    }

    let role_w = allocations
        .iter()
        .map(|a| a.role.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let _ = writeln!(
        out,
        "{:<36}  {:<role_w$}  {:>7}  {:>12}  {:>14}  {:>16}",
        "ID", "ROLE", "MONTHS", "ESCALATION", "MONTHLY", "TOTAL"
    );
    for allocation in allocations {
        let months = format!("{}-{}", allocation.start_month, allocation.end_month);
        let periods = &allocation.escalation_periods.0;
        let escalation = match periods.len() {
            0 => "-".to_string(),
            1 => format!("{}%", periods[0].rate.normalize()),
            n => format!("{n} periods"),
        };
        let _ = writeln!(
            out,
            "{:<36}  {:<role_w$}  {:>7}  {:>12}  {:>14}  {:>16}",
            allocation.id,
            allocation.role,
            months,
            escalation,
            money(allocation.monthly_cost),
            money(allocation.total_cost),
        );
    }
    out
}

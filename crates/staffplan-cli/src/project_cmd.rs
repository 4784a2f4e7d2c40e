//! `staffplan project` command: cost a plan file without a database.

use anyhow::{Context, Result};

use staffplan_core::plan::{parse_plan_file, project_plan_file};

use crate::report_cmd::{money, render_breakdown};

/// Run the projection for a plan file and print it.
pub fn run_project(file_path: &str, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("failed to read plan file: {file_path}"))?;
    let plan_file = parse_plan_file(&content)
        .with_context(|| format!("failed to parse plan file: {file_path}"))?;

    let projection = project_plan_file(&plan_file);

    if json {
        let out =
            serde_json::to_string_pretty(&projection).context("failed to serialize projection")?;
        println!("{out}");
        return Ok(());
    }

    println!(
        "Projection: {} ({} months)",
        projection.name, projection.duration_months
    );
    println!();
    if projection.allocations.is_empty() {
        println!("No allocations.");
    } else {
        let role_w = projection
            .allocations
            .iter()
            .map(|a| a.role.chars().count())
            .max()
            .unwrap_or(4)
            .max(4);
        println!(
            "{:<role_w$}  {:>7}  {:>14}  {:>16}",
            "ROLE", "MONTHS", "MONTHLY", "TOTAL"
        );
        for allocation in &projection.allocations {
            println!(
                "{:<role_w$}  {:>7}  {:>14}  {:>16}",
                allocation.role,
                format!("{}-{}", allocation.start_month, allocation.end_month),
                money(allocation.monthly_cost),
                money(allocation.total_cost),
            );
        }
    }
    println!();
    print!("{}", render_breakdown(&projection.aggregates));

    Ok(())
}

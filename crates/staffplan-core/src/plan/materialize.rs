//! Plan materialization: reconstruct a plan file from DB state.
//!
//! The output parses back with [`super::parse_plan_file`]. Escalation is
//! written in the form it was entered: `escalation_rate` for single-rate
//! allocations, an explicit `escalation_periods` list otherwise. Derived
//! figures are emitted as comments only.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use staffplan_db::models::{StaffAllocation, StaffPlan};
use staffplan_db::queries::{allocations as alloc_db, plans as plan_db};

/// Materialize a plan from the database back to plan file content.
pub async fn materialize_plan(pool: &PgPool, plan_id: Uuid) -> Result<String> {
    let plan = plan_db::get_plan(pool, plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found"))?;

    let allocations = alloc_db::list_allocations_for_plan(pool, plan_id).await?;

    Ok(render_plan_toml(&plan, &allocations))
}

/// Render a plan and its allocations as plan file content.
pub fn render_plan_toml(plan: &StaffPlan, allocations: &[StaffAllocation]) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "# total_price = {}", plan.total_price);
    out.push_str("[plan]\n");
    let _ = writeln!(out, "id = {}", toml_quote(&plan.id.to_string()));
    let _ = writeln!(out, "name = {}", toml_quote(&plan.name));
    let _ = writeln!(out, "duration_months = {}", plan.duration_months);
    let _ = writeln!(out, "overhead_rate = {}", plan.overhead_rate.normalize());
    let _ = writeln!(out, "profit_margin = {}", plan.profit_margin.normalize());

    for allocation in allocations {
        out.push('\n');
        let _ = writeln!(out, "# total_cost = {}", allocation.total_cost);
        out.push_str("[[allocations]]\n");
        let _ = writeln!(out, "role = {}", toml_quote(&allocation.role));
        let _ = writeln!(out, "start_month = {}", allocation.start_month);
        let _ = writeln!(out, "end_month = {}", allocation.end_month);
        let _ = writeln!(out, "hours_per_week = {}", allocation.hours_per_week.normalize());
        let _ = writeln!(out, "hourly_rate = {}", allocation.hourly_rate.normalize());

        if let Some(rate) = allocation.escalation_rate {
            let _ = writeln!(out, "escalation_rate = {}", rate.normalize());
            if let Some(start) = allocation.escalation_start_month {
                let _ = writeln!(out, "escalation_start_month = {start}");
            }
            continue;
        }

        let periods = &allocation.escalation_periods.0;
        if periods.is_empty() {
            out.push_str("escalation_periods = []\n");
        } else {
            out.push_str("escalation_periods = [\n");
            for period in periods {
                let _ = writeln!(
                    out,
                    "  {{ start_month = {}, end_month = {}, rate = {} }},",
                    period.start_month,
                    period.end_month,
                    period.rate.normalize()
                );
            }
            out.push_str("]\n");
        }
    }

    out
}

/// Quote a string as a single-line TOML basic string.
fn toml_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{:04X}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

//! Plan ID resolution and TOML write-back.
//!
//! - [`resolve_plan_id`] accepts either a UUID string or a path to a plan
//!   file. If given a file, it reads the `[plan].id` field.
//! - [`write_plan_id_to_file`] uses `toml_edit` to insert `id = "..."` into
//!   the `[plan]` section without disturbing comments or formatting.

use std::path::Path;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use staffplan_core::plan::PlanFile;

/// Determine whether `input` refers to a file path or a bare UUID, and
/// return the resolved plan UUID.
///
/// Heuristic: if the string ends with `.toml`, contains a path separator,
/// or names a file that exists on disk, treat it as a file path. Otherwise,
/// try parsing as a UUID.
pub fn resolve_plan_id(input: &str) -> Result<Uuid> {
    if looks_like_file_path(input) {
        return read_plan_id_from_file(input);
    }
    match Uuid::parse_str(input) {
        Ok(uuid) => Ok(uuid),
        Err(_) if Path::new(input).is_file() => read_plan_id_from_file(input),
        Err(uuid_err) => Err(uuid_err).with_context(|| {
            format!("invalid plan ID: {input:?} (not a valid UUID and not a file)")
        }),
    }
}

/// Parse an allocation ID.
pub fn parse_allocation_id(input: &str) -> Result<Uuid> {
    Uuid::parse_str(input).with_context(|| format!("invalid allocation ID: {input:?}"))
}

fn looks_like_file_path(input: &str) -> bool {
    input.ends_with(".toml") || input.contains('/')
}

/// Read the `[plan].id` field from a plan file.
fn read_plan_id_from_file(path: &str) -> Result<Uuid> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan file: {path}"))?;

    let plan_file: PlanFile =
        toml::from_str(&content).with_context(|| format!("failed to parse TOML from {path}"))?;

    match plan_file.plan.id {
        Some(id) => Ok(id),
        None => bail!(
            "plan file {path:?} has no id field in [plan] section.\n\
             Run `staffplan plan create {path}` first to register it."
        ),
    }
}

/// Set `id = "<uuid>"` as the first key of the `[plan]` section of an
/// existing plan file, preserving all other content including comments.
pub fn write_plan_id_to_file(path: &str, plan_id: Uuid) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;

    let mut doc: toml_edit::DocumentMut = content
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse {path} as TOML document"))?;

    let plan_table = doc
        .get_mut("plan")
        .and_then(|v| v.as_table_mut())
        .with_context(|| format!("{path} has no [plan] table"))?;

    // Re-insert the remaining keys after `id`, dropping any stale id.
    let entries: Vec<(String, toml_edit::Item)> = plan_table
        .iter()
        .filter(|(k, _)| *k != "id")
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();

    plan_table.clear();
    plan_table.insert("id", toml_edit::value(plan_id.to_string()));
    for (key, value) in entries {
        plan_table.insert(&key, value);
    }

    std::fs::write(path, doc.to_string()).with_context(|| format!("failed to write {path}"))?;

    Ok(())
}

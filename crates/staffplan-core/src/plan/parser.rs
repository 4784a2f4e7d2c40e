//! Plan file parser with validation.
//!
//! Parses a plan file into a [`PlanFile`] and checks the plan terms and
//! every allocation against the plan window before anything reaches the
//! database or the cost engine.

use thiserror::Error;
use tracing::warn;

use super::terms::PlanTermsError;
use super::toml_format::PlanFile;
use crate::allocation::AllocationInputError;

/// Errors that can occur during plan parsing and validation.
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("invalid plan: {0}")]
    InvalidTerms(#[from] PlanTermsError),

    #[error("allocation #{index} ({role:?}): {source}")]
    InvalidAllocation {
        index: usize,
        role: String,
        source: AllocationInputError,
    },
}

/// Parse and validate a plan file.
pub fn parse_plan_file(content: &str) -> Result<PlanFile, PlanParseError> {
    let file: PlanFile = toml::from_str(content)?;
    validate(&file)?;
    Ok(file)
}

fn validate(file: &PlanFile) -> Result<(), PlanParseError> {
    file.plan.terms().validate()?;

    for (idx, allocation) in file.allocations.iter().enumerate() {
        if allocation.has_both_escalation_forms() {
            warn!(
                role = %allocation.role,
                "allocation has both escalation_periods and escalation_rate; using the periods"
            );
        }
        allocation
            .to_input()
            .validate(file.plan.duration_months)
            .map_err(|source| PlanParseError::InvalidAllocation {
                index: idx + 1,
                role: allocation.role.clone(),
                source,
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::EscalationError;

    #[test]
    fn parse_valid_plan() {
        let toml_str = r#"
[plan]
name = "Mobile app"
duration_months = 18
overhead_rate = 20
profit_margin = 10

[[allocations]]
role = "iOS engineer"
start_month = 1
end_month = 18
hours_per_week = 40
hourly_rate = 85
escalation_periods = [{ start_month = 13, end_month = 18, rate = 4 }]

[[allocations]]
role = "Designer"
start_month = 1
end_month = 6
hours_per_week = 16
hourly_rate = 70
"#;
        let file = parse_plan_file(toml_str).expect("should parse");
        assert_eq!(file.allocations.len(), 2);
    }

    #[test]
    fn plan_without_allocations_is_valid() {
        let file = parse_plan_file("[plan]\nname = \"Empty\"\nduration_months = 3\n")
            .expect("should parse");
        assert!(file.allocations.is_empty());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = parse_plan_file("[plan\nname = ").unwrap_err();
        assert!(matches!(err, PlanParseError::TomlError(_)));
    }

    #[test]
    fn rejects_zero_duration() {
        let err = parse_plan_file("[plan]\nname = \"Zero\"\nduration_months = 0\n").unwrap_err();
        assert!(matches!(
            err,
            PlanParseError::InvalidTerms(PlanTermsError::InvalidDuration(0))
        ));
    }

    #[test]
    fn rejects_profit_margin_over_one_hundred() {
        let toml_str = r#"
[plan]
name = "Greedy"
duration_months = 12
profit_margin = 150
"#;
        let err = parse_plan_file(toml_str).unwrap_err();
        assert!(matches!(err, PlanParseError::InvalidTerms(_)));
    }

    #[test]
    fn rejects_allocation_past_plan_window() {
        let toml_str = r#"
[plan]
name = "Short"
duration_months = 6

[[allocations]]
role = "Contractor"
start_month = 2
end_month = 9
hours_per_week = 40
hourly_rate = 100
"#;
        let err = parse_plan_file(toml_str).unwrap_err();
        match err {
            PlanParseError::InvalidAllocation { index, role, source } => {
                assert_eq!(index, 1);
                assert_eq!(role, "Contractor");
                assert!(matches!(
                    source,
                    AllocationInputError::MonthOutOfRange { field: "end_month", .. }
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_negative_escalation_rate() {
        let toml_str = r#"
[plan]
name = "Deflation"
duration_months = 12

[[allocations]]
role = "Tester"
start_month = 1
end_month = 12
hours_per_week = 30
hourly_rate = 45
escalation_rate = -2
"#;
        let err = parse_plan_file(toml_str).unwrap_err();
        assert!(matches!(
            err,
            PlanParseError::InvalidAllocation {
                source: AllocationInputError::Escalation(EscalationError::NegativeRate { .. }),
                ..
            }
        ));
    }

    #[test]
    fn accepts_inverted_allocation_months() {
        let toml_str = r#"
[plan]
name = "Draft"
duration_months = 12

[[allocations]]
role = "TBD"
start_month = 10
end_month = 4
hours_per_week = 40
hourly_rate = 50
"#;
        assert!(parse_plan_file(toml_str).is_ok());
    }
}

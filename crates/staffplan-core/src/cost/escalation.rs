//! Escalation input normalization and the per-month compounding schedule.
//!
//! Callers may describe escalation either as an explicit list of periods or
//! with the legacy single-rate form (`escalation_rate` plus an optional
//! `escalation_start_month`). Both are normalized once, at the input
//! boundary, into a list of [`EscalationPeriod`]; the calculator and the
//! aggregator only ever see that list.

use rust_decimal::{Decimal, MathematicalOps};
use thiserror::Error;

use staffplan_db::models::EscalationPeriod;

/// Highest accepted annual escalation rate, in percent.
pub const MAX_ESCALATION_RATE: Decimal = Decimal::ONE_HUNDRED;

/// Largest cumulative multiplier an allocation's escalation may reach.
/// Together with the bounds on hours, rates and plan length this keeps every
/// engine figure far inside the range of [`Decimal`].
// 10^15
pub const MAX_ESCALATION_MULTIPLIER: Decimal =
    Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Errors for escalation input that must be rejected before it reaches the
/// cost engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EscalationError {
    #[error("escalation period starting at month {start_month} has negative rate {rate}")]
    NegativeRate { start_month: i32, rate: Decimal },

    #[error("escalation period start month must be at least 1, got {0}")]
    InvalidStartMonth(i32),

    #[error("escalation period ends (month {end_month}) before it starts (month {start_month})")]
    InvertedPeriod { start_month: i32, end_month: i32 },

    #[error(
        "escalation rate {rate} starting at month {start_month} exceeds {max}%",
        max = MAX_ESCALATION_RATE
    )]
    RateTooHigh { start_month: i32, rate: Decimal },

    #[error(
        "escalation compounds past {max}x by month {last_month}",
        max = MAX_ESCALATION_MULTIPLIER
    )]
    CompoundingTooLarge { last_month: i32 },
}

/// Escalation as supplied by a caller, before normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EscalationInput {
    /// No escalation: the monthly cost stays flat.
    #[default]
    None,
    /// Legacy single rate, escalating from `start_month` (or the
    /// allocation's own start when absent) to the allocation's end.
    Legacy {
        rate: Decimal,
        start_month: Option<i32>,
    },
    /// Explicit periods, in any order.
    Periods(Vec<EscalationPeriod>),
}

impl EscalationInput {
    /// Pick the canonical form from the raw fields of an input record.
    ///
    /// A non-empty period list wins over the legacy fields; a legacy rate is
    /// only meaningful when positive.
    pub fn from_fields(
        periods: Vec<EscalationPeriod>,
        legacy_rate: Option<Decimal>,
        legacy_start_month: Option<i32>,
    ) -> Self {
        if !periods.is_empty() {
            return Self::Periods(periods);
        }
        match legacy_rate {
            Some(rate) if rate != Decimal::ZERO => Self::Legacy {
                rate,
                start_month: legacy_start_month,
            },
            _ => Self::None,
        }
    }

    /// Reject malformed escalation input.
    pub fn validate(&self) -> Result<(), EscalationError> {
        match self {
            Self::None => Ok(()),
            Self::Legacy { rate, start_month } => {
                if let Some(start) = start_month.filter(|m| *m < 1) {
                    return Err(EscalationError::InvalidStartMonth(start));
                }
                check_rate(start_month.unwrap_or(1), *rate)
            }
            Self::Periods(periods) => periods.iter().try_for_each(validate_period),
        }
    }

    /// The single-rate fields to persist next to the normalized periods, so
    /// the period can be re-derived when the allocation's months change.
    pub fn legacy_fields(&self) -> (Option<Decimal>, Option<i32>) {
        match self {
            Self::Legacy { rate, start_month } => (Some(*rate), *start_month),
            _ => (None, None),
        }
    }

    /// Normalize into the canonical period list for an allocation spanning
    /// `[start_month, end_month]`.
    ///
    /// The legacy form becomes a single period starting no earlier than the
    /// allocation itself. A legacy window that would start after the
    /// allocation ends produces no period at all.
    pub fn normalize(&self, start_month: i32, end_month: i32) -> Vec<EscalationPeriod> {
        match self {
            Self::None => Vec::new(),
            Self::Periods(periods) => periods.clone(),
            Self::Legacy { rate, start_month: legacy_start } => {
                if *rate <= Decimal::ZERO {
                    return Vec::new();
                }
                let start = legacy_start.unwrap_or(start_month).max(start_month);
                if start > end_month {
                    return Vec::new();
                }
                vec![EscalationPeriod::new(start, end_month, *rate)]
            }
        }
    }
}

fn validate_period(period: &EscalationPeriod) -> Result<(), EscalationError> {
    if period.start_month < 1 {
        return Err(EscalationError::InvalidStartMonth(period.start_month));
    }
    if period.end_month < period.start_month {
        return Err(EscalationError::InvertedPeriod {
            start_month: period.start_month,
            end_month: period.end_month,
        });
    }
    check_rate(period.start_month, period.rate)
}

fn check_rate(start_month: i32, rate: Decimal) -> Result<(), EscalationError> {
    if rate < Decimal::ZERO {
        return Err(EscalationError::NegativeRate { start_month, rate });
    }
    if rate > MAX_ESCALATION_RATE {
        return Err(EscalationError::RateTooHigh { start_month, rate });
    }
    Ok(())
}

/// Compounding factor applied once per month for an annual `rate` (in
/// percent): `(1 + rate/100)^(1/12)`.
pub fn monthly_rate(rate: Decimal) -> Decimal {
    let annual = Decimal::ONE + rate / Decimal::ONE_HUNDRED;
    annual.powd(Decimal::ONE / Decimal::from(12))
}

#[derive(Debug, Clone)]
struct Step {
    period: EscalationPeriod,
    /// `None` for periods with a non-positive rate, which never compound.
    monthly_rate: Option<Decimal>,
}

/// Escalation periods sorted by start month, with each period's monthly
/// compounding factor computed once.
#[derive(Debug, Clone, Default)]
pub struct EscalationSchedule {
    steps: Vec<Step>,
}

impl EscalationSchedule {
    pub fn new(periods: &[EscalationPeriod]) -> Self {
        let mut sorted = periods.to_vec();
        // Stable: periods sharing a start month keep the caller's order.
        sorted.sort_by_key(|p| p.start_month);

        let steps = sorted
            .into_iter()
            .map(|period| Step {
                monthly_rate: (period.rate > Decimal::ZERO).then(|| monthly_rate(period.rate)),
                period,
            })
            .collect();
        Self { steps }
    }

    pub fn is_flat(&self) -> bool {
        self.steps.iter().all(|s| s.monthly_rate.is_none())
    }

    /// Upper bound on [`Self::multiplier`] over months `1..=last_month`, or
    /// `None` when that bound does not fit in a [`Decimal`].
    ///
    /// Every compounding period counts with the most months it can
    /// contribute by `last_month`, overlapping or not.
    pub fn max_multiplier(&self, last_month: i32) -> Option<Decimal> {
        let mut bound = Decimal::ONE;
        for step in &self.steps {
            let Some(rate) = step.monthly_rate else {
                continue;
            };
            let period = &step.period;
            let months = if period.end_month < last_month {
                period.len_months()
            } else {
                last_month - period.start_month
            };
            if months <= 0 {
                continue;
            }
            bound = bound.checked_mul(rate.checked_powi(i64::from(months))?)?;
        }
        Some(bound)
    }

    /// Cumulative multiplier on the flat monthly cost for `month`.
    ///
    /// Periods that ended before `month` contribute their full compounding
    /// (`monthly_rate ^ length`). The first period containing `month`
    /// contributes `monthly_rate ^ (months elapsed in it - 1)`, so its first
    /// month is unescalated, and ends the scan: a later-starting period that
    /// overlaps it is never applied to this month.
    pub fn multiplier(&self, month: i32) -> Decimal {
        let mut multiplier = Decimal::ONE;

        for step in &self.steps {
            let period = &step.period;
            if period.start_month > month {
                continue;
            }
            if period.contains(month) {
                if let Some(rate) = step.monthly_rate {
                    multiplier *= rate.powi(i64::from(month - period.start_month));
                }
                break;
            }
            if let Some(rate) = step.monthly_rate {
                multiplier *= rate.powi(i64::from(period.len_months()));
            }
        }

        multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn close(a: Decimal, b: Decimal, tolerance: &str) -> bool {
        (a - b).abs() <= dec(tolerance)
    }

    // -- normalization ------------------------------------------------------

    #[test]
    fn from_fields_prefers_period_list() {
        let periods = vec![EscalationPeriod::new(1, 6, dec("3"))];
        let input = EscalationInput::from_fields(periods.clone(), Some(dec("5")), Some(2));
        assert_eq!(input, EscalationInput::Periods(periods));
    }

    #[test]
    fn from_fields_falls_back_to_legacy_rate() {
        let input = EscalationInput::from_fields(Vec::new(), Some(dec("4.5")), Some(3));
        assert_eq!(
            input,
            EscalationInput::Legacy {
                rate: dec("4.5"),
                start_month: Some(3)
            }
        );
    }

    #[test]
    fn from_fields_zero_legacy_rate_means_none() {
        let input = EscalationInput::from_fields(Vec::new(), Some(Decimal::ZERO), Some(3));
        assert_eq!(input, EscalationInput::None);
    }

    #[test]
    fn legacy_start_is_clamped_to_allocation_start() {
        let input = EscalationInput::Legacy {
            rate: dec("5"),
            start_month: Some(2),
        };
        assert_eq!(
            input.normalize(4, 10),
            vec![EscalationPeriod::new(4, 10, dec("5"))]
        );
    }

    #[test]
    fn legacy_without_start_uses_allocation_start() {
        let input = EscalationInput::Legacy {
            rate: dec("5"),
            start_month: None,
        };
        assert_eq!(
            input.normalize(3, 8),
            vec![EscalationPeriod::new(3, 8, dec("5"))]
        );
    }

    #[test]
    fn legacy_starting_after_allocation_end_yields_no_period() {
        let input = EscalationInput::Legacy {
            rate: dec("5"),
            start_month: Some(13),
        };
        assert!(input.normalize(1, 12).is_empty());
    }

    #[test]
    fn explicit_periods_are_kept_verbatim() {
        let periods = vec![
            EscalationPeriod::new(7, 12, dec("20")),
            EscalationPeriod::new(1, 6, dec("10")),
        ];
        let input = EscalationInput::Periods(periods.clone());
        assert_eq!(input.normalize(1, 12), periods);
    }

    // -- validation ---------------------------------------------------------

    #[test]
    fn rejects_negative_period_rate() {
        let input = EscalationInput::Periods(vec![EscalationPeriod::new(1, 12, dec("-1"))]);
        assert!(matches!(
            input.validate(),
            Err(EscalationError::NegativeRate { start_month: 1, .. })
        ));
    }

    #[test]
    fn rejects_inverted_period() {
        let input = EscalationInput::Periods(vec![EscalationPeriod::new(6, 3, dec("2"))]);
        assert_eq!(
            input.validate(),
            Err(EscalationError::InvertedPeriod {
                start_month: 6,
                end_month: 3
            })
        );
    }

    #[test]
    fn rejects_period_starting_before_month_one() {
        let input = EscalationInput::Periods(vec![EscalationPeriod::new(0, 3, dec("2"))]);
        assert_eq!(input.validate(), Err(EscalationError::InvalidStartMonth(0)));
    }

    #[test]
    fn rejects_negative_legacy_rate() {
        let input = EscalationInput::Legacy {
            rate: dec("-2"),
            start_month: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_rate_above_one_hundred_percent() {
        let periods = EscalationInput::Periods(vec![EscalationPeriod::new(1, 12, dec("100.01"))]);
        assert_eq!(
            periods.validate(),
            Err(EscalationError::RateTooHigh {
                start_month: 1,
                rate: dec("100.01")
            })
        );

        let legacy = EscalationInput::Legacy {
            rate: dec("1000"),
            start_month: Some(4),
        };
        assert!(matches!(
            legacy.validate(),
            Err(EscalationError::RateTooHigh { start_month: 4, .. })
        ));

        let at_limit = EscalationInput::Periods(vec![EscalationPeriod::new(1, 12, dec("100"))]);
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn legacy_fields_only_for_single_rate_form() {
        let legacy = EscalationInput::Legacy {
            rate: dec("4"),
            start_month: Some(6),
        };
        assert_eq!(legacy.legacy_fields(), (Some(dec("4")), Some(6)));
        assert_eq!(EscalationInput::None.legacy_fields(), (None, None));
        let periods = EscalationInput::Periods(vec![EscalationPeriod::new(1, 6, dec("4"))]);
        assert_eq!(periods.legacy_fields(), (None, None));
    }

    #[test]
    fn accepts_zero_rate_period() {
        let input = EscalationInput::Periods(vec![EscalationPeriod::new(1, 12, Decimal::ZERO)]);
        assert!(input.validate().is_ok());
    }

    // -- schedule -----------------------------------------------------------

    #[test]
    fn monthly_rate_compounds_to_annual_rate() {
        let r = monthly_rate(dec("12"));
        assert!(close(r.powi(12), dec("1.12"), "0.000000001"), "got {}", r.powi(12));
    }

    #[test]
    fn empty_schedule_is_flat() {
        let schedule = EscalationSchedule::new(&[]);
        assert!(schedule.is_flat());
        for month in 1..=24 {
            assert_eq!(schedule.multiplier(month), Decimal::ONE);
        }
    }

    #[test]
    fn first_month_of_period_is_unescalated() {
        let schedule = EscalationSchedule::new(&[EscalationPeriod::new(1, 12, dec("12"))]);
        assert_eq!(schedule.multiplier(1), Decimal::ONE);
        assert_eq!(schedule.multiplier(2), monthly_rate(dec("12")));
    }

    #[test]
    fn month_twelve_of_twelve_percent_period() {
        let schedule = EscalationSchedule::new(&[EscalationPeriod::new(1, 12, dec("12"))]);
        // 1.12^(11/12)
        assert!(close(schedule.multiplier(12), dec("1.1094724457"), "0.0000001"));
    }

    #[test]
    fn months_before_any_period_are_unescalated() {
        let schedule = EscalationSchedule::new(&[EscalationPeriod::new(6, 12, dec("10"))]);
        for month in 1..=6 {
            assert_eq!(schedule.multiplier(month), Decimal::ONE);
        }
        assert!(schedule.multiplier(7) > Decimal::ONE);
    }

    #[test]
    fn adjacent_periods_compound_continuously() {
        let schedule = EscalationSchedule::new(&[
            EscalationPeriod::new(7, 12, dec("20")),
            EscalationPeriod::new(1, 6, dec("10")),
        ]);
        let full_first = monthly_rate(dec("10")).powi(6);

        // Month 7 carries all six months of the first period, and the first
        // month of the second period adds nothing.
        assert_eq!(schedule.multiplier(7), full_first);
        assert!(close(schedule.multiplier(7), dec("1.0488088482"), "0.0000001"));
        assert_eq!(
            schedule.multiplier(8),
            full_first * monthly_rate(dec("20"))
        );
    }

    #[test]
    fn months_after_last_period_keep_full_compounding() {
        let schedule = EscalationSchedule::new(&[EscalationPeriod::new(1, 3, dec("12"))]);
        let full = monthly_rate(dec("12")).powi(3);
        assert_eq!(schedule.multiplier(4), full);
        assert_eq!(schedule.multiplier(10), full);
    }

    #[test]
    fn overlapping_period_is_ignored_while_earlier_period_is_open() {
        let schedule = EscalationSchedule::new(&[
            EscalationPeriod::new(1, 12, dec("10")),
            EscalationPeriod::new(6, 18, dec("50")),
        ]);
        let solo = EscalationSchedule::new(&[EscalationPeriod::new(1, 12, dec("10"))]);
        for month in 1..=12 {
            assert_eq!(schedule.multiplier(month), solo.multiplier(month));
        }
    }

    #[test]
    fn max_multiplier_bounds_every_month() {
        let schedule = EscalationSchedule::new(&[
            EscalationPeriod::new(1, 6, dec("10")),
            EscalationPeriod::new(4, 9, dec("30")),
            EscalationPeriod::new(10, 40, dec("5")),
        ]);
        let bound = schedule.max_multiplier(24).unwrap();
        for month in 1..=24 {
            assert!(schedule.multiplier(month) <= bound, "month {month}");
        }
    }

    #[test]
    fn max_multiplier_of_flat_schedule_is_one() {
        let schedule = EscalationSchedule::new(&[EscalationPeriod::new(1, 12, Decimal::ZERO)]);
        assert!(schedule.is_flat());
        assert_eq!(schedule.max_multiplier(12), Some(Decimal::ONE));
    }

    #[test]
    fn max_multiplier_grows_past_limit_for_long_steep_escalation() {
        // Doubling every year for 50 years.
        let schedule = EscalationSchedule::new(&[EscalationPeriod::new(1, 600, dec("100"))]);
        assert!(schedule.max_multiplier(600).unwrap() > MAX_ESCALATION_MULTIPLIER);
        assert!(schedule.max_multiplier(120).unwrap() < MAX_ESCALATION_MULTIPLIER);
    }

    #[test]
    fn max_multiplier_overflow_is_none() {
        // Each elapsed copy compounds in full, so stacked duplicates blow
        // past the range of Decimal.
        let periods = vec![EscalationPeriod::new(1, 300, dec("100")); 20];
        let schedule = EscalationSchedule::new(&periods);
        assert_eq!(schedule.max_multiplier(301), None);
    }

    #[test]
    fn zero_rate_period_still_governs_its_months() {
        let schedule = EscalationSchedule::new(&[
            EscalationPeriod::new(1, 6, Decimal::ZERO),
            EscalationPeriod::new(3, 12, dec("25")),
        ]);
        for month in 1..=6 {
            assert_eq!(schedule.multiplier(month), Decimal::ONE);
        }
        // Month 7: the zero-rate period is complete, the 25% period started
        // at month 3 and has been open for 5 months.
        assert_eq!(schedule.multiplier(7), monthly_rate(dec("25")).powi(4));
    }
}

//! Recurrence rules and their evaluation.
//!
//! A [`RecurrenceRule`] describes "every N days/weeks/months/years", with
//! optional weekday, day-of-month, and month constraints layered on top. The
//! JSON shape is shared between catalog templates and user-authored recurring
//! tasks, so the serde field names are part of the wire contract.
//!
//! All arithmetic operates on [`chrono::NaiveDate`] -- plain calendar dates
//! with no time-of-day or timezone component. The household's timezone only
//! matters at the boundary where a caller decides what "today" is.

mod evaluator;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use evaluator::{next_occurrence, preview};

/// Base frequency of a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(RecurrenceError::UnsupportedFrequency(other.to_owned())),
        }
    }
}

/// Errors from validating or evaluating a recurrence rule.
#[derive(Debug, Error)]
pub enum RecurrenceError {
    /// Malformed rule: non-positive interval, out-of-range set members,
    /// zero count. Rejected before evaluation, never silently coerced.
    #[error("invalid recurrence rule: {0}")]
    Validation(String),

    /// Unrecognized frequency value. Fatal for that single rule.
    #[error("unsupported recurrence frequency: {0:?}")]
    UnsupportedFrequency(String),
}

/// A recurrence rule.
///
/// Constraint sets that do not apply to the base frequency (e.g.
/// `byDayOfMonth` with `frequency = weekly`) are ignored during evaluation,
/// not rejected: the rule is well-formed, the constraint is just meaningless
/// there.
///
/// Weekdays use the 0..=6 convention with 0 = Sunday, matching the source
/// format of user-authored rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    /// Required on the wire; a rule without a frequency is malformed.
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub by_day_of_week: Option<BTreeSet<u8>>,
    #[serde(default)]
    pub by_day_of_month: Option<BTreeSet<u32>>,
    #[serde(default)]
    pub by_month: Option<BTreeSet<u32>>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub count: Option<u32>,
}

fn default_interval() -> u32 {
    1
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self {
            frequency: Frequency::Daily,
            interval: 1,
            by_day_of_week: None,
            by_day_of_month: None,
            by_month: None,
            end_date: None,
            count: None,
        }
    }
}

impl RecurrenceRule {
    /// A plain "every N <frequency>" rule with no extra constraints.
    pub fn simple(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            ..Self::default()
        }
    }

    /// Check structural validity. Evaluation calls this first, so malformed
    /// rules fail before any date arithmetic runs.
    pub fn validate(&self) -> Result<(), RecurrenceError> {
        if self.interval == 0 {
            return Err(RecurrenceError::Validation(
                "interval must be >= 1".to_owned(),
            ));
        }
        if let Some(count) = self.count {
            if count == 0 {
                return Err(RecurrenceError::Validation("count must be >= 1".to_owned()));
            }
        }
        if let Some(days) = &self.by_day_of_week {
            if days.is_empty() {
                return Err(RecurrenceError::Validation(
                    "byDayOfWeek must not be empty".to_owned(),
                ));
            }
            if let Some(bad) = days.iter().find(|d| **d > 6) {
                return Err(RecurrenceError::Validation(format!(
                    "byDayOfWeek value {bad} out of range 0..=6"
                )));
            }
        }
        if let Some(days) = &self.by_day_of_month {
            if days.is_empty() {
                return Err(RecurrenceError::Validation(
                    "byDayOfMonth must not be empty".to_owned(),
                ));
            }
            if let Some(bad) = days.iter().find(|d| **d == 0 || **d > 31) {
                return Err(RecurrenceError::Validation(format!(
                    "byDayOfMonth value {bad} out of range 1..=31"
                )));
            }
        }
        if let Some(months) = &self.by_month {
            if months.is_empty() {
                return Err(RecurrenceError::Validation(
                    "byMonth must not be empty".to_owned(),
                ));
            }
            if let Some(bad) = months.iter().find(|m| **m == 0 || **m > 12) {
                return Err(RecurrenceError::Validation(format!(
                    "byMonth value {bad} out of range 1..=12"
                )));
            }
        }
        Ok(())
    }
}

/// Sentinel label for the absence of a rule.
pub const NO_RECURRENCE_LABEL: &str = "no recurrence";

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Human-readable summary of a rule, e.g. "every 2 weeks on Mon, Wed".
///
/// `None` yields the [`NO_RECURRENCE_LABEL`] sentinel.
pub fn label(rule: Option<&RecurrenceRule>) -> String {
    let Some(rule) = rule else {
        return NO_RECURRENCE_LABEL.to_owned();
    };

    let unit = match rule.frequency {
        Frequency::Daily => "day",
        Frequency::Weekly => "week",
        Frequency::Monthly => "month",
        Frequency::Yearly => "year",
    };
    let mut out = if rule.interval == 1 {
        format!("every {unit}")
    } else {
        format!("every {} {unit}s", rule.interval)
    };

    if rule.frequency == Frequency::Weekly {
        if let Some(days) = &rule.by_day_of_week {
            let names: Vec<&str> = days
                .iter()
                .filter(|d| **d < 7)
                .map(|d| WEEKDAY_NAMES[*d as usize])
                .collect();
            out.push_str(&format!(" on {}", names.join(", ")));
        }
    }
    if rule.frequency == Frequency::Monthly {
        if let Some(days) = &rule.by_day_of_month {
            let nums: Vec<String> = days.iter().map(|d| d.to_string()).collect();
            out.push_str(&format!(" on day {}", nums.join(", ")));
        }
    }
    if let Some(months) = &rule.by_month {
        let names: Vec<&str> = months
            .iter()
            .filter(|m| (1..=12).contains(*m))
            .map(|m| MONTH_NAMES[(*m - 1) as usize])
            .collect();
        out.push_str(&format!(" in {}", names.join(", ")));
    }
    if let Some(end) = rule.end_date {
        out.push_str(&format!(" until {end}"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn frequency_display_roundtrip() {
        let variants = [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Yearly,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: Frequency = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn frequency_unknown_is_unsupported() {
        let result = "fortnightly".parse::<Frequency>();
        assert!(matches!(
            result,
            Err(RecurrenceError::UnsupportedFrequency(_))
        ));
    }

    #[test]
    fn serde_wire_shape_is_camel_case() {
        let json = r#"{
            "frequency": "weekly",
            "interval": 2,
            "byDayOfWeek": [1, 3],
            "endDate": "2026-12-31"
        }"#;
        let rule: RecurrenceRule = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.interval, 2);
        assert_eq!(
            rule.by_day_of_week,
            Some([1u8, 3].into_iter().collect())
        );
        assert_eq!(rule.end_date, Some(d(2026, 12, 31)));
        assert!(rule.by_day_of_month.is_none());
        assert!(rule.count.is_none());
    }

    #[test]
    fn serde_requires_frequency() {
        let result = serde_json::from_str::<RecurrenceRule>("{}");
        assert!(result.is_err());
    }

    #[test]
    fn serde_defaults_everything_but_frequency() {
        let rule: RecurrenceRule =
            serde_json::from_str(r#"{"frequency": "monthly"}"#).expect("should deserialize");
        assert_eq!(rule.frequency, Frequency::Monthly);
        assert_eq!(rule.interval, 1);
        assert!(rule.by_day_of_week.is_none());
        assert!(rule.by_day_of_month.is_none());
        assert!(rule.by_month.is_none());
        assert!(rule.end_date.is_none());
        assert!(rule.count.is_none());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let rule = RecurrenceRule::simple(Frequency::Daily, 0);
        assert!(matches!(
            rule.validate(),
            Err(RecurrenceError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_weekday() {
        let rule = RecurrenceRule {
            by_day_of_week: Some([7u8].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Weekly, 1)
        };
        assert!(matches!(
            rule.validate(),
            Err(RecurrenceError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_month_day() {
        let rule = RecurrenceRule {
            by_day_of_month: Some([0u32].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Monthly, 1)
        };
        assert!(rule.validate().is_err());

        let rule = RecurrenceRule {
            by_day_of_month: Some([32u32].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Monthly, 1)
        };
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_count() {
        let rule = RecurrenceRule {
            count: Some(0),
            ..RecurrenceRule::simple(Frequency::Daily, 1)
        };
        assert!(rule.validate().is_err());
    }

    #[test]
    fn validate_accepts_inapplicable_constraints() {
        // byDayOfMonth with weekly is meaningless but well-formed; it is
        // ignored at evaluation time, not rejected.
        let rule = RecurrenceRule {
            by_day_of_month: Some([15u32].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Weekly, 1)
        };
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn label_none_is_sentinel() {
        assert_eq!(label(None), "no recurrence");
    }

    #[test]
    fn label_simple_rules() {
        assert_eq!(
            label(Some(&RecurrenceRule::simple(Frequency::Daily, 1))),
            "every day"
        );
        assert_eq!(
            label(Some(&RecurrenceRule::simple(Frequency::Monthly, 3))),
            "every 3 months"
        );
    }

    #[test]
    fn label_weekly_with_days() {
        let rule = RecurrenceRule {
            by_day_of_week: Some([1u8, 3].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Weekly, 2)
        };
        assert_eq!(label(Some(&rule)), "every 2 weeks on Mon, Wed");
    }

    #[test]
    fn label_with_months_and_end() {
        let rule = RecurrenceRule {
            by_month: Some([1u32, 6].into_iter().collect()),
            end_date: Some(d(2027, 1, 1)),
            ..RecurrenceRule::simple(Frequency::Monthly, 1)
        };
        assert_eq!(label(Some(&rule)), "every month in Jan, Jun until 2027-01-01");
    }
}

//! Generation planning: decide which tasks should be auto-created for a
//! child, when, and under which deduplication key.
//!
//! Planning is side-effect free. It reads the catalog, the child, and the
//! household's overrides, and returns candidates; nothing here touches the
//! database. Two invocations with identical inputs always produce identical
//! candidate lists and keys -- that determinism is what makes downstream
//! materialization idempotent.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::catalog::{Period, TaskTemplate, TemplateCatalog};
use crate::recurrence;

/// The child projection consumed by the planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    pub id: Uuid,
    pub household_id: Uuid,
    pub birthdate: NaiveDate,
    pub first_name: Option<String>,
}

/// Per-household override of one template's defaults. Effective values are
/// the custom override where present, else the template default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateOverride {
    pub template_id: Uuid,
    pub is_enabled: bool,
    pub custom_days_before: Option<u32>,
    pub custom_weight: Option<u8>,
}

/// Whether a candidate's generation window has already opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateTiming {
    /// `as_of` is inside (or past) the generation window; act on it now.
    Due,
    /// The window opens later; the candidate exists for look-ahead display.
    Future,
}

/// A planned-but-not-yet-persisted task generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationCandidate {
    pub template_id: Uuid,
    pub child_id: Uuid,
    pub household_id: Uuid,
    pub title: String,
    pub deadline: NaiveDate,
    /// Effective weight after household overrides.
    pub weight: u8,
    pub generation_key: String,
    pub timing: CandidateTiming,
}

/// Display status of a candidate in the confirm/skip UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStatus {
    Upcoming,
    DueSoon,
    Overdue,
}

/// Days within which a deadline counts as "due soon".
pub const DUE_SOON_DAYS: i64 = 7;

/// A candidate prepared for user confirmation, as consumed by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingTaskPreview {
    pub template_id: Uuid,
    pub title: String,
    pub child_id: Uuid,
    pub child_first_name: Option<String>,
    pub child_age_months: u32,
    pub deadline: NaiveDate,
    pub days_until: i64,
    pub status: PreviewStatus,
    pub can_skip: bool,
}

/// A child's age in whole months as of a date (floor of elapsed time).
///
/// A child born exactly twelve months before `as_of` is 12 months old.
pub fn age_in_months(birthdate: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= birthdate {
        return 0;
    }
    let mut months =
        (as_of.year() - birthdate.year()) * 12 + as_of.month() as i32 - birthdate.month() as i32;
    if as_of.day() < birthdate.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Deterministic deduplication key for one template-for-one-child-at-one-
/// deadline: lowercase hex SHA-256 over `template_id|child_id|deadline`.
///
/// Stable across processes and releases; the ledger's unique index on this
/// value is what guarantees at-most-once materialization.
pub fn generation_key(template_id: Uuid, child_id: Uuid, deadline: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(template_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(child_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(deadline.format("%Y-%m-%d").to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Plan all generation candidates for one child.
///
/// Selects active templates for `country` whose age range contains the
/// child's age and whose effective `is_enabled` is true, resolves each to a
/// concrete deadline, and attaches the deduplication key. A recurrence
/// failure on one template is logged and isolated; other templates still
/// produce candidates. Output is ordered by deadline, then template id.
pub fn plan_for_child(
    catalog: &TemplateCatalog,
    child: &Child,
    overrides: &[TemplateOverride],
    country: &str,
    as_of: NaiveDate,
) -> Vec<GenerationCandidate> {
    let age = age_in_months(child.birthdate, as_of);

    let mut candidates = Vec::new();
    for template in catalog.all() {
        if !template.is_active || template.country != country || !template.matches_age(age) {
            continue;
        }
        let override_ = overrides.iter().find(|o| o.template_id == template.id);
        if let Some(o) = override_ {
            if !o.is_enabled {
                continue;
            }
        }
        let days_before = override_
            .and_then(|o| o.custom_days_before)
            .unwrap_or(template.days_before_deadline);
        let weight = override_
            .and_then(|o| o.custom_weight)
            .unwrap_or(template.weight);

        let deadline = match resolve_deadline(template, days_before, as_of) {
            Ok(Some(deadline)) => deadline,
            Ok(None) => continue, // recurrence ended (endDate passed)
            Err(e) => {
                warn!(
                    template_id = %template.id,
                    title = %template.title,
                    error = %e,
                    "skipping template with unevaluable recurrence"
                );
                continue;
            }
        };

        let window_opens = deadline
            .checked_sub_days(Days::new(days_before as u64))
            .unwrap_or(deadline);
        let timing = if as_of >= window_opens {
            CandidateTiming::Due
        } else {
            CandidateTiming::Future
        };

        candidates.push(GenerationCandidate {
            template_id: template.id,
            child_id: child.id,
            household_id: child.household_id,
            title: template.title.clone(),
            deadline,
            weight,
            generation_key: generation_key(template.id, child.id, deadline),
            timing,
        });
    }

    candidates.sort_by(|a, b| {
        a.deadline
            .cmp(&b.deadline)
            .then_with(|| a.template_id.cmp(&b.template_id))
    });
    candidates
}

/// Resolve a template to its next concrete deadline.
///
/// Recurring templates use the recurrence evaluator from `as_of`.
/// Non-recurring templates anchor on their period: for seasonal periods the
/// relevant season start, for `year_round` the generation date plus the
/// lead time.
fn resolve_deadline(
    template: &TaskTemplate,
    days_before: u32,
    as_of: NaiveDate,
) -> Result<Option<NaiveDate>, recurrence::RecurrenceError> {
    if let Some(rule) = &template.recurrence {
        return recurrence::next_occurrence(Some(rule), as_of);
    }

    let deadline = match template.period {
        Period::YearRound => as_of
            .checked_add_days(Days::new(days_before as u64))
            .unwrap_or(as_of),
        period => seasonal_deadline(period, days_before, as_of),
    };
    Ok(Some(deadline))
}

/// Deadline for a season-anchored one-shot template.
///
/// Normally the next season start at or after `as_of`. A start that passed
/// within the last `days_before` days is kept as the active deadline, so a
/// late sweep backfills the current season instead of jumping a year ahead.
fn seasonal_deadline(period: Period, days_before: u32, as_of: NaiveDate) -> NaiveDate {
    let this_year = period.start_in_year(as_of.year());
    if as_of >= this_year && (as_of - this_year).num_days() <= days_before as i64 {
        this_year
    } else {
        period.next_start(as_of)
    }
}

/// Preview candidates for the confirm/skip UI.
pub fn preview_for_child(
    catalog: &TemplateCatalog,
    child: &Child,
    overrides: &[TemplateOverride],
    country: &str,
    as_of: NaiveDate,
) -> Vec<UpcomingTaskPreview> {
    let age = age_in_months(child.birthdate, as_of);
    plan_for_child(catalog, child, overrides, country, as_of)
        .into_iter()
        .map(|c| {
            let days_until = (c.deadline - as_of).num_days();
            let status = if days_until < 0 {
                PreviewStatus::Overdue
            } else if days_until <= DUE_SOON_DAYS {
                PreviewStatus::DueSoon
            } else {
                PreviewStatus::Upcoming
            };
            let can_skip = catalog
                .get(c.template_id)
                .is_none_or(|t| !t.is_critical());
            UpcomingTaskPreview {
                template_id: c.template_id,
                title: c.title,
                child_id: c.child_id,
                child_first_name: child.first_name.clone(),
                child_age_months: age,
                deadline: c.deadline,
                days_until,
                status,
                can_skip,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::template;
    use crate::catalog::{TaskTemplate, TemplateCategory};
    use crate::recurrence::{Frequency, RecurrenceRule};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn child_born(birthdate: NaiveDate) -> Child {
        Child {
            id: Uuid::new_v4(),
            household_id: Uuid::new_v4(),
            birthdate,
            first_name: Some("Alex".to_owned()),
        }
    }

    #[test]
    fn age_in_whole_months() {
        assert_eq!(age_in_months(d(2025, 1, 15), d(2026, 1, 15)), 12);
        assert_eq!(age_in_months(d(2025, 1, 15), d(2026, 1, 14)), 11);
        assert_eq!(age_in_months(d(2025, 1, 15), d(2026, 1, 16)), 12);
        assert_eq!(age_in_months(d(2025, 1, 31), d(2026, 2, 28)), 12);
        assert_eq!(age_in_months(d(2026, 6, 1), d(2026, 6, 1)), 0);
        // Birthdate in the future clamps to zero rather than underflowing.
        assert_eq!(age_in_months(d(2027, 1, 1), d(2026, 1, 1)), 0);
    }

    #[test]
    fn generation_key_is_deterministic_and_input_sensitive() {
        let t = Uuid::new_v4();
        let c = Uuid::new_v4();
        let day = d(2026, 3, 1);

        let key = generation_key(t, c, day);
        assert_eq!(key, generation_key(t, c, day));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|ch| ch.is_ascii_hexdigit()));

        assert_ne!(key, generation_key(t, c, d(2026, 3, 2)));
        assert_ne!(key, generation_key(t, Uuid::new_v4(), day));
        assert_ne!(key, generation_key(Uuid::new_v4(), c, day));
    }

    fn one_template_catalog(t: TaskTemplate) -> TemplateCatalog {
        TemplateCatalog::new(vec![t]).unwrap()
    }

    #[test]
    fn recurring_template_uses_next_occurrence() {
        let mut t = template("Tidy bedroom");
        t.recurrence = Some(RecurrenceRule {
            by_day_of_week: Some([6u8].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Weekly, 1)
        });
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1));

        // 2026-01-14 is a Wednesday; next Saturday is the 17th.
        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].deadline, d(2026, 1, 17));
        assert_eq!(candidates[0].timing, CandidateTiming::Due);
    }

    #[test]
    fn age_outside_every_range_yields_empty_list() {
        let mut t = template("MMR vaccination");
        t.age_min_months = 11;
        t.age_max_months = 14;
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1)); // ~7 years old

        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14));
        assert!(candidates.is_empty());
    }

    #[test]
    fn country_and_active_filters_apply() {
        let mut inactive = template("inactive");
        inactive.is_active = false;
        let mut foreign = template("foreign");
        foreign.country = "FR".to_owned();
        let catalog = TemplateCatalog::new(vec![inactive, foreign]).unwrap();
        let child = child_born(d(2018, 5, 1));

        assert!(plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14)).is_empty());
    }

    #[test]
    fn household_override_disables_template() {
        let t = template("Tidy bedroom");
        let template_id = t.id;
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1));
        let overrides = [TemplateOverride {
            template_id,
            is_enabled: false,
            custom_days_before: None,
            custom_weight: None,
        }];

        assert!(plan_for_child(&catalog, &child, &overrides, "DE", d(2026, 1, 14)).is_empty());
    }

    #[test]
    fn household_override_replaces_weight() {
        let t = template("Tidy bedroom");
        let template_id = t.id;
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1));
        let overrides = [TemplateOverride {
            template_id,
            is_enabled: true,
            custom_days_before: None,
            custom_weight: Some(9),
        }];

        let candidates = plan_for_child(&catalog, &child, &overrides, "DE", d(2026, 1, 14));
        assert_eq!(candidates[0].weight, 9);
    }

    #[test]
    fn year_round_one_shot_deadline_is_lead_time_from_as_of() {
        let mut t = template("Review child benefit");
        t.days_before_deadline = 21;
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1));

        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14));
        assert_eq!(candidates[0].deadline, d(2026, 2, 4));
        assert_eq!(candidates[0].timing, CandidateTiming::Due);
    }

    #[test]
    fn seasonal_deadline_targets_next_season_start() {
        let mut t = template("School enrollment");
        t.category = TemplateCategory::School;
        t.period = Period::Spring;
        t.days_before_deadline = 60;
        let catalog = one_template_catalog(t);
        let child = child_born(d(2020, 9, 1));

        // Mid-January: spring starts March 1st, window opens 60 days before.
        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14));
        assert_eq!(candidates[0].deadline, d(2026, 3, 1));
        assert_eq!(candidates[0].timing, CandidateTiming::Due);

        // In October the window for next spring has not opened yet.
        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 10, 1));
        assert_eq!(candidates[0].deadline, d(2027, 3, 1));
        assert_eq!(candidates[0].timing, CandidateTiming::Future);
    }

    #[test]
    fn recently_passed_season_start_is_backfilled_as_due() {
        let mut t = template("Sort winter clothing");
        t.period = Period::Winter;
        t.days_before_deadline = 14;
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1));

        // Ten days after December 1st: still the active deadline, overdue.
        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 12, 11));
        assert_eq!(candidates[0].deadline, d(2026, 12, 1));
        assert_eq!(candidates[0].timing, CandidateTiming::Due);

        // Twenty days after: the window is closed, plan for next year.
        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 12, 21));
        assert_eq!(candidates[0].deadline, d(2027, 12, 1));
    }

    #[test]
    fn ended_recurrence_produces_no_candidate() {
        let mut t = template("Old chore");
        t.recurrence = Some(RecurrenceRule {
            end_date: Some(d(2025, 12, 31)),
            ..RecurrenceRule::simple(Frequency::Weekly, 1)
        });
        let catalog = one_template_catalog(t);
        let child = child_born(d(2018, 5, 1));

        assert!(plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14)).is_empty());
    }

    #[test]
    fn unevaluable_recurrence_is_isolated() {
        // One template with an unsatisfiable byMonth filter, one healthy.
        let mut broken = template("Broken");
        broken.recurrence = Some(RecurrenceRule {
            by_month: Some([6u32].into_iter().collect()),
            ..RecurrenceRule::simple(Frequency::Monthly, 12)
        });
        let healthy = template("Healthy");
        let catalog = TemplateCatalog::new(vec![broken, healthy]).unwrap();
        let child = child_born(d(2018, 5, 1));

        let candidates = plan_for_child(&catalog, &child, &[], "DE", d(2026, 1, 15));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Healthy");
    }

    #[test]
    fn planning_is_deterministic() {
        let catalog = TemplateCatalog::builtin();
        let child = Child {
            id: Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap(),
            household_id: Uuid::parse_str("00000000-0000-4000-8000-000000000002").unwrap(),
            birthdate: d(2019, 4, 20),
            first_name: None,
        };

        let a = plan_for_child(&catalog, &child, &[], "DE", d(2026, 2, 1));
        let b = plan_for_child(&catalog, &child, &[], "DE", d(2026, 2, 1));
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.generation_key, y.generation_key);
            assert_eq!(x.deadline, y.deadline);
        }
        // Ordered by deadline, then template id.
        for pair in a.windows(2) {
            assert!(
                (pair[0].deadline, pair[0].template_id)
                    <= (pair[1].deadline, pair[1].template_id)
            );
        }
    }

    #[test]
    fn preview_statuses_follow_deadline_distance() {
        let mut soon = template("Due soon");
        soon.days_before_deadline = 3;
        let mut later = template("Later");
        later.days_before_deadline = 30;
        let mut critical = template("Critical");
        critical.weight = 9;
        critical.days_before_deadline = 3;
        let catalog = TemplateCatalog::new(vec![soon, later, critical]).unwrap();
        let child = child_born(d(2018, 5, 1));

        let previews = preview_for_child(&catalog, &child, &[], "DE", d(2026, 1, 14));
        assert_eq!(previews.len(), 3);

        let by_title = |title: &str| {
            previews
                .iter()
                .find(|p| p.title == title)
                .unwrap_or_else(|| panic!("missing preview {title}"))
        };
        assert_eq!(by_title("Due soon").status, PreviewStatus::DueSoon);
        assert_eq!(by_title("Later").status, PreviewStatus::Upcoming);
        assert!(by_title("Due soon").can_skip);
        assert!(!by_title("Critical").can_skip);
        assert_eq!(by_title("Later").child_age_months, 92);
    }
}

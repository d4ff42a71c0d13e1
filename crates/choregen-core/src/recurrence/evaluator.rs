//! Occurrence computation for recurrence rules.
//!
//! All functions are pure and restartable: each call recomputes from the
//! given reference date, no iterator state survives between calls.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use super::{Frequency, RecurrenceError, RecurrenceRule};

/// Upper bound on `byMonth` walk iterations. A rule whose month filter is
/// unreachable (e.g. monthly interval 12 anchored in a disallowed month)
/// would otherwise loop forever.
const MAX_WALK_STEPS: usize = 4096;

/// Bound on the weekly day-by-day walk: one full cycle of `interval` weeks
/// plus slack, in days.
const MAX_WEEKLY_STEPS: u32 = 16;

/// Compute the next occurrence of `rule` strictly after `reference`.
///
/// `None` rule yields `Ok(None)` ("no recurrence"). A candidate past the
/// rule's `endDate` also yields `Ok(None)`. Malformed rules fail with
/// [`RecurrenceError::Validation`] before any arithmetic runs.
pub fn next_occurrence(
    rule: Option<&RecurrenceRule>,
    reference: NaiveDate,
) -> Result<Option<NaiveDate>, RecurrenceError> {
    let Some(rule) = rule else {
        return Ok(None);
    };
    rule.validate()?;

    let mut cursor = reference;
    for _ in 0..MAX_WALK_STEPS {
        let candidate = advance(rule, cursor);
        if let Some(end) = rule.end_date {
            if candidate > end {
                return Ok(None);
            }
        }
        if month_allowed(rule, candidate) {
            return Ok(Some(candidate));
        }
        cursor = candidate;
    }

    Err(RecurrenceError::Validation(format!(
        "byMonth filter matched no occurrence within {MAX_WALK_STEPS} periods"
    )))
}

/// Compute up to `n` occurrences of `rule` strictly after `start`, ascending.
///
/// The rule's `count` caps the total independently of `n`; `endDate`
/// terminates the sequence early.
///
/// Each occurrence is computed from the previous one, so a monthly rule
/// that gets clamped by a short month keeps the clamped day from then on:
/// Jan 31 steps to Feb 28 and stays on the 28th (Mar 28, Apr 28), it does
/// not re-anchor on the 31st the way RFC 5545 `BYMONTHDAY` expansion would.
/// Rules that need a fixed day should say so via `byDayOfMonth`.
pub fn preview(
    rule: Option<&RecurrenceRule>,
    start: NaiveDate,
    n: usize,
) -> Result<Vec<NaiveDate>, RecurrenceError> {
    let Some(rule) = rule else {
        return Ok(Vec::new());
    };
    rule.validate()?;

    let limit = match rule.count {
        Some(count) => n.min(count as usize),
        None => n,
    };

    let mut out = Vec::with_capacity(limit);
    let mut cursor = start;
    while out.len() < limit {
        match next_occurrence(Some(rule), cursor)? {
            Some(date) => {
                out.push(date);
                cursor = date;
            }
            None => break,
        }
    }
    Ok(out)
}

/// One base-frequency step strictly after `cursor`, ignoring `byMonth`.
fn advance(rule: &RecurrenceRule, cursor: NaiveDate) -> NaiveDate {
    match rule.frequency {
        Frequency::Daily => plus_days(cursor, rule.interval as u64),
        Frequency::Weekly => match &rule.by_day_of_week {
            None => plus_days(cursor, 7 * rule.interval as u64),
            Some(days) => advance_weekly_by_day(cursor, rule.interval, days),
        },
        Frequency::Monthly => match &rule.by_day_of_month {
            None => add_months(cursor, rule.interval),
            Some(days) => advance_monthly_by_day(cursor, rule.interval, days),
        },
        Frequency::Yearly => add_months(cursor, 12 * rule.interval),
    }
}

/// Weekly advancement constrained to a weekday set (0 = Sunday .. 6 =
/// Saturday).
///
/// Walks one calendar day at a time; a day is an occurrence iff its weekday
/// is in the set. Crossing the Sunday/Monday boundary with `interval > 1`
/// skips ahead `7 * (interval - 1)` days, which reproduces "every Nth week,
/// on these weekdays".
fn advance_weekly_by_day(
    cursor: NaiveDate,
    interval: u32,
    days: &std::collections::BTreeSet<u8>,
) -> NaiveDate {
    let mut day = cursor;
    for _ in 0..MAX_WEEKLY_STEPS {
        day = plus_days(day, 1);
        if day.weekday() == Weekday::Mon && interval > 1 {
            day = plus_days(day, 7 * (interval as u64 - 1));
        }
        if days.contains(&weekday_num(day)) {
            return day;
        }
    }
    // Unreachable: a validated non-empty set matches within two weeks of
    // walking. Fall back to a plain weekly step.
    plus_days(cursor, 7 * interval as u64)
}

/// Monthly advancement constrained to an ordered day-of-month list.
///
/// Picks the next listed day within the cursor's month if one produces a
/// date strictly after the cursor, otherwise jumps `interval` months ahead
/// and uses the first listed day. Listed days that do not exist in the
/// target month (e.g. 31 in February) clamp to the month's last day, in line
/// with the plain monthly end-of-month behavior.
fn advance_monthly_by_day(
    cursor: NaiveDate,
    interval: u32,
    days: &std::collections::BTreeSet<u32>,
) -> NaiveDate {
    for &listed in days {
        let candidate = clamped_date(cursor.year(), cursor.month(), listed);
        if candidate > cursor {
            return candidate;
        }
    }

    let target = add_months(first_of_month(cursor), interval);
    let first = *days.iter().next().expect("validated set is non-empty");
    clamped_date(target.year(), target.month(), first)
}

/// Is the candidate's month allowed by the rule's `byMonth` filter?
fn month_allowed(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    match &rule.by_month {
        Some(months) => months.contains(&date.month()),
        None => true,
    }
}

/// Weekday as 0..=6 with 0 = Sunday.
fn weekday_num(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn plus_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Add calendar months, clamping the day to the last valid day of the target
/// month (Jan 31 + 1 month = Feb 28/29, never Mar 3).
fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let mut year = date.year();
    let mut month = date.month() as i32 + months as i32;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    let month = month as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// Day-of-month clamped to the target month's length.
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let day = day.min(days_in_month(year, month)).max(1);
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).expect("month 1..=12"))
}

/// Number of days in a month, probing from 31 downward.
fn days_in_month(year: i32, month: u32) -> u32 {
    for day in (28..=31).rev() {
        if NaiveDate::from_ymd_opt(year, month, day).is_some() {
            return day;
        }
    }
    28
}

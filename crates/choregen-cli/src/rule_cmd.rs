//! `choregen rule` command: evaluate a recurrence rule without touching the
//! database. Useful for checking what a catalog rule will do before
//! publishing it.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use choregen_core::recurrence::{self, Frequency, RecurrenceRule};

use crate::RuleArgs;

fn parse_set<T: std::str::FromStr + Ord>(raw: &str, what: &str) -> Result<BTreeSet<T>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<T>()
                .map_err(|_| anyhow::anyhow!("invalid {what} entry: {part:?}"))
        })
        .collect()
}

fn build_rule(args: &RuleArgs) -> Result<RecurrenceRule> {
    let frequency: Frequency = args
        .frequency
        .parse()
        .with_context(|| format!("invalid frequency: {}", args.frequency))?;

    let mut rule = RecurrenceRule::simple(frequency, args.interval);
    if let Some(raw) = &args.weekdays {
        rule.by_day_of_week = Some(parse_set(raw, "weekday (0=Sun..6=Sat)")?);
    }
    if let Some(raw) = &args.monthdays {
        rule.by_day_of_month = Some(parse_set(raw, "day of month")?);
    }
    if let Some(raw) = &args.months {
        rule.by_month = Some(parse_set(raw, "month")?);
    }
    rule.end_date = args.until;
    rule.count = args.count;

    Ok(rule)
}

/// Print the rule's label and its next occurrences from a start date.
pub fn run_rule(args: &RuleArgs, from: NaiveDate) -> Result<()> {
    let rule = build_rule(args)?;

    println!("Rule: {}", recurrence::label(Some(&rule)));

    let dates = recurrence::preview(Some(&rule), from, args.n)?;
    if dates.is_empty() {
        println!("No occurrences after {from}.");
        return Ok(());
    }

    println!("Next {} occurrence(s) after {from}:", dates.len());
    for date in &dates {
        println!("  {} ({})", date, date.format("%A"));
    }
    Ok(())
}

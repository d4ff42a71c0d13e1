//! `choregen catalog` commands: browse and inspect the template catalog.

use anyhow::{Context, Result};
use uuid::Uuid;

use choregen_core::catalog::{
    AgeBand, Period, TemplateCatalog, TemplateCategory, TemplateFilter,
};

use crate::CatalogListArgs;

/// Build a [`TemplateFilter`] from the parsed CLI arguments.
fn build_filter(args: &CatalogListArgs) -> Result<TemplateFilter> {
    let mut filter = TemplateFilter::default();

    for band in &args.age {
        let parsed: AgeBand = band
            .parse()
            .with_context(|| format!("invalid age band: {band} (expected e.g. 3-6)"))?;
        filter.age_bands.push(parsed);
    }
    for period in &args.period {
        let parsed: Period = period
            .parse()
            .with_context(|| format!("invalid period: {period}"))?;
        filter.periods.push(parsed);
    }
    for category in &args.category {
        let parsed: TemplateCategory = category
            .parse()
            .with_context(|| format!("invalid category: {category}"))?;
        filter.categories.push(parsed);
    }
    filter.recurring = args.recurring_filter();
    filter.search = args.search.clone();
    filter.min_weight = args.min_weight;
    filter.max_weight = args.max_weight;
    filter.critical = args.critical;
    filter.page = args.page;
    filter.limit = args.limit;

    Ok(filter)
}

/// List templates matching the filter, weight-descending.
pub fn run_list(catalog: &TemplateCatalog, args: &CatalogListArgs) -> Result<()> {
    let filter = build_filter(args)?;
    let page = catalog.filter(&filter);

    if page.is_empty() {
        println!("No templates match the filter.");
        return Ok(());
    }

    println!(
        "{:<38} {:<32} {:<10} {:>6} {:>9} {:<10}",
        "ID", "TITLE", "CATEGORY", "WEIGHT", "AGE (MO)", "PERIOD"
    );
    println!("{}", "-".repeat(110));
    for t in &page {
        let title_display = truncate_title(&t.title, 30);
        println!(
            "{:<38} {:<32} {:<10} {:>6} {:>4}-{:<4} {:<10}",
            t.id, title_display, t.category, t.weight, t.age_min_months, t.age_max_months, t.period
        );
    }

    Ok(())
}

/// Shorten a title to at most `max_chars` characters, appending `...` when
/// anything was cut. Counts characters, not bytes, so multi-byte titles
/// (umlauts, accents) never split mid-character.
fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_owned();
    }
    let kept: String = title.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Show one template in full.
pub fn run_show(catalog: &TemplateCatalog, template_id_str: &str) -> Result<()> {
    let id = Uuid::parse_str(template_id_str)
        .with_context(|| format!("invalid template ID: {template_id_str}"))?;
    let t = catalog
        .get(id)
        .with_context(|| format!("template {id} not found in catalog"))?;

    println!("Template: {} ({})", t.title, t.id);
    println!("Category: {}", t.category);
    if let Some(sub) = &t.subcategory {
        println!("Subcategory: {sub}");
    }
    if let Some(desc) = &t.description {
        println!("Description: {desc}");
    }
    println!("Country: {}", t.country);
    println!("Age range: {}-{} months", t.age_min_months, t.age_max_months);
    println!("Weight: {}{}", t.weight, if t.is_critical() { " (critical)" } else { "" });
    println!("Lead time: {} days before deadline", t.days_before_deadline);
    println!("Period: {}", t.period);
    println!(
        "Recurrence: {}",
        choregen_core::recurrence::label(t.recurrence.as_ref())
    );
    println!("Active: {}", t.is_active);

    Ok(())
}

/// Print catalog-wide statistics.
pub fn run_stats(catalog: &TemplateCatalog) -> Result<()> {
    let stats = catalog.statistics();

    println!("Templates: {} total, {} active", stats.total, stats.active);
    println!();
    println!("By category:");
    for (category, count) in &stats.per_category {
        println!("  {category:<12} {count}");
    }
    println!();
    println!("By period:");
    for (period, count) in &stats.per_period {
        println!("  {period:<12} {count}");
    }

    Ok(())
}

//! Filter criteria over the template catalog.
//!
//! All criteria are conjunctive: a template must satisfy every populated
//! field to be returned. Pagination runs after filtering.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CatalogError, Period, TaskTemplate, TemplateCategory};

/// Default page size when none is given.
pub const DEFAULT_LIMIT: usize = 20;
/// Hard ceiling on page size.
pub const MAX_LIMIT: usize = 100;

/// A named age band, in years, mapped to an inclusive month range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub min_years: u32,
    pub max_years: u32,
}

impl AgeBand {
    /// Inclusive month range covered by this band.
    pub fn month_range(&self) -> (u32, u32) {
        (self.min_years * 12, self.max_years * 12)
    }

    /// Does this band overlap the template's age range?
    pub fn overlaps(&self, template: &TaskTemplate) -> bool {
        let (band_min, band_max) = self.month_range();
        band_min <= template.age_max_months && template.age_min_months <= band_max
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_years, self.max_years)
    }
}

impl FromStr for AgeBand {
    type Err = CatalogError;

    /// Parse bands like "0-3", "3-6", "14-18".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CatalogError::InvalidAgeBand(s.to_owned());
        let (min, max) = s.split_once('-').ok_or_else(bad)?;
        let min_years: u32 = min.trim().parse().map_err(|_| bad())?;
        let max_years: u32 = max.trim().parse().map_err(|_| bad())?;
        if min_years > max_years {
            return Err(bad());
        }
        Ok(Self {
            min_years,
            max_years,
        })
    }
}

/// Filter criteria. Empty/None fields impose no restriction.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub age_bands: Vec<AgeBand>,
    pub periods: Vec<Period>,
    pub categories: Vec<TemplateCategory>,
    /// `Some(true)` = only recurring templates, `Some(false)` = only one-shot.
    pub recurring: Option<bool>,
    /// Case-insensitive substring over title and description.
    pub search: Option<String>,
    pub min_weight: Option<u8>,
    pub max_weight: Option<u8>,
    /// Only templates with weight >= [`super::CRITICAL_WEIGHT`].
    pub critical: bool,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl TemplateFilter {
    fn matches(&self, t: &TaskTemplate) -> bool {
        if !self.age_bands.is_empty() && !self.age_bands.iter().any(|b| b.overlaps(t)) {
            return false;
        }
        if !self.periods.is_empty() && !self.periods.contains(&t.period) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&t.category) {
            return false;
        }
        if let Some(recurring) = self.recurring {
            if t.recurrence.is_some() != recurring {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = t.title.to_lowercase().contains(&needle);
            let in_desc = t
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_desc {
                return false;
            }
        }
        if let Some(min) = self.min_weight {
            if t.weight < min {
                return false;
            }
        }
        if let Some(max) = self.max_weight {
            if t.weight > max {
                return false;
            }
        }
        if self.critical && !t.is_critical() {
            return false;
        }
        true
    }

    fn effective_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_LIMIT,
            n => n.min(MAX_LIMIT),
        }
    }

    fn effective_page(&self) -> usize {
        self.page.max(1)
    }
}

/// Apply `criteria` to `templates`: filter, order (weight descending, then
/// title), then paginate.
pub fn apply<'a>(templates: &'a [TaskTemplate], criteria: &TemplateFilter) -> Vec<&'a TaskTemplate> {
    let mut matched: Vec<&TaskTemplate> =
        templates.iter().filter(|t| criteria.matches(t)).collect();
    matched.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.title.cmp(&b.title)));

    let limit = criteria.effective_limit();
    let offset = (criteria.effective_page() - 1) * limit;
    matched.into_iter().skip(offset).take(limit).collect()
}

/// Aggregate catalog counts for display.
#[derive(Debug, Clone)]
pub struct CatalogStats {
    pub total: usize,
    pub active: usize,
    pub per_category: BTreeMap<TemplateCategory, usize>,
    pub per_period: BTreeMap<Period, usize>,
}

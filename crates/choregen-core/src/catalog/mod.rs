//! The template catalog: age/period-scoped rules describing tasks that
//! should be auto-created for matching children.
//!
//! The catalog is loaded once at process start (from TOML, or the embedded
//! starter catalog) and never mutated afterwards, so a `&TemplateCatalog`
//! can be shared across threads without synchronization.

mod filter;
mod toml_format;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::recurrence::RecurrenceRule;

pub use filter::{AgeBand, CatalogStats, TemplateFilter};

/// Weight at or above which a template counts as "critical" for filtering.
pub const CRITICAL_WEIGHT: u8 = 8;

/// Category of a catalog template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Household,
    Health,
    School,
    Admin,
    Seasonal,
    Activity,
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Household => "household",
            Self::Health => "health",
            Self::School => "school",
            Self::Admin => "admin",
            Self::Seasonal => "seasonal",
            Self::Activity => "activity",
        };
        f.write_str(s)
    }
}

impl FromStr for TemplateCategory {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "household" => Ok(Self::Household),
            "health" => Ok(Self::Health),
            "school" => Ok(Self::School),
            "admin" => Ok(Self::Admin),
            "seasonal" => Ok(Self::Seasonal),
            "activity" => Ok(Self::Activity),
            other => Err(CatalogError::InvalidCategory(other.to_owned())),
        }
    }
}

/// Named calendar period a template is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    YearRound,
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Period {
    /// Anchor date of the period within a given year (meteorological season
    /// starts). `YearRound` anchors on January 1st.
    pub fn start_in_year(self, year: i32) -> NaiveDate {
        let (month, day) = match self {
            Self::YearRound => (1, 1),
            Self::Spring => (3, 1),
            Self::Summer => (6, 1),
            Self::Autumn => (9, 1),
            Self::Winter => (12, 1),
        };
        NaiveDate::from_ymd_opt(year, month, day).expect("month/day constants are valid")
    }

    /// The next period start at or after `as_of`.
    pub fn next_start(self, as_of: NaiveDate) -> NaiveDate {
        use chrono::Datelike;
        let this_year = self.start_in_year(as_of.year());
        if this_year >= as_of {
            this_year
        } else {
            self.start_in_year(as_of.year() + 1)
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::YearRound => "year_round",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year_round" => Ok(Self::YearRound),
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "autumn" => Ok(Self::Autumn),
            "winter" => Ok(Self::Winter),
            other => Err(CatalogError::InvalidPeriod(other.to_owned())),
        }
    }
}

/// An immutable catalog entry describing one auto-generated task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub id: Uuid,
    /// ISO-2 country code the template applies to.
    pub country: String,
    /// Inclusive child age range, in months.
    pub age_min_months: u32,
    pub age_max_months: u32,
    pub category: TemplateCategory,
    pub subcategory: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// `None` means a one-shot task anchored on the template's period.
    pub recurrence: Option<RecurrenceRule>,
    /// Task "load", 1..=10.
    pub weight: u8,
    /// How many days before the deadline the task should be generated.
    pub days_before_deadline: u32,
    pub period: Period,
    pub is_active: bool,
}

impl TaskTemplate {
    /// Does the given age (in months) fall within this template's range?
    pub fn matches_age(&self, age_months: u32) -> bool {
        age_months >= self.age_min_months && age_months <= self.age_max_months
    }

    /// Critical templates are those with weight >= [`CRITICAL_WEIGHT`].
    pub fn is_critical(&self) -> bool {
        self.weight >= CRITICAL_WEIGHT
    }
}

/// Errors from loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path:?}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("duplicate template id: {0}")]
    DuplicateId(Uuid),

    #[error("template {id}: age_min_months {min} exceeds age_max_months {max}")]
    InvalidAgeRange { id: Uuid, min: u32, max: u32 },

    #[error("template {id}: weight {weight} out of range 1..=10")]
    InvalidWeight { id: Uuid, weight: u8 },

    #[error("template {id}: invalid recurrence: {source}")]
    InvalidRecurrence {
        id: Uuid,
        #[source]
        source: crate::recurrence::RecurrenceError,
    },

    #[error("invalid category: {0:?}")]
    InvalidCategory(String),

    #[error("invalid period: {0:?}")]
    InvalidPeriod(String),

    #[error("invalid age band: {0:?} (expected e.g. \"3-6\")")]
    InvalidAgeBand(String),
}

/// The embedded starter catalog, compiled into the binary.
static DEFAULT_CATALOG_TOML: &str = include_str!("default_catalog.toml");

/// An in-memory, read-only collection of task templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    templates: Vec<TaskTemplate>,
}

impl TemplateCatalog {
    /// Parse and validate a catalog from TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let raw: toml_format::CatalogToml = toml::from_str(content)?;
        let templates = raw.into_templates()?;
        Self::new(templates)
    }

    /// Load a catalog from a TOML file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// The built-in starter catalog.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed; the `embedded_catalog_is_valid`
    /// test guards this at build time.
    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_CATALOG_TOML).expect("embedded default_catalog.toml is invalid")
    }

    /// Build a catalog from already-constructed templates, validating each.
    pub fn new(templates: Vec<TaskTemplate>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for t in &templates {
            if !seen.insert(t.id) {
                return Err(CatalogError::DuplicateId(t.id));
            }
            if t.age_min_months > t.age_max_months {
                return Err(CatalogError::InvalidAgeRange {
                    id: t.id,
                    min: t.age_min_months,
                    max: t.age_max_months,
                });
            }
            if t.weight == 0 || t.weight > 10 {
                return Err(CatalogError::InvalidWeight {
                    id: t.id,
                    weight: t.weight,
                });
            }
            if let Some(rule) = &t.recurrence {
                rule.validate()
                    .map_err(|e| CatalogError::InvalidRecurrence { id: t.id, source: e })?;
            }
        }
        Ok(Self { templates })
    }

    /// Look up a template by id.
    pub fn get(&self, id: Uuid) -> Option<&TaskTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// All templates, unfiltered.
    pub fn all(&self) -> &[TaskTemplate] {
        &self.templates
    }

    /// Number of templates in the catalog.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Apply a filter, returning matching templates ordered by weight
    /// descending, then title. Pagination applies after filtering.
    pub fn filter(&self, criteria: &TemplateFilter) -> Vec<&TaskTemplate> {
        filter::apply(&self.templates, criteria)
    }

    /// Aggregate counts for display.
    pub fn statistics(&self) -> CatalogStats {
        let mut per_category: BTreeMap<TemplateCategory, usize> = BTreeMap::new();
        let mut per_period: BTreeMap<Period, usize> = BTreeMap::new();
        let mut active = 0;
        for t in &self.templates {
            *per_category.entry(t.category).or_default() += 1;
            *per_period.entry(t.period).or_default() += 1;
            if t.is_active {
                active += 1;
            }
        }
        CatalogStats {
            total: self.templates.len(),
            active,
            per_category,
            per_period,
        }
    }
}

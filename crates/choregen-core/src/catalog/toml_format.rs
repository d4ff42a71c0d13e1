//! Serde types mirroring the catalog TOML file format.
//!
//! Kept separate from the domain types so file-format defaults (generated
//! ids, `is_active = true`) don't leak into [`super::TaskTemplate`].

use serde::Deserialize;
use uuid::Uuid;

use super::{CatalogError, Period, TaskTemplate, TemplateCategory};
use crate::recurrence::RecurrenceRule;

/// Top-level catalog file.
#[derive(Debug, Deserialize)]
pub(super) struct CatalogToml {
    #[serde(default)]
    pub templates: Vec<TemplateToml>,
}

/// One `[[templates]]` entry.
#[derive(Debug, Deserialize)]
pub(super) struct TemplateToml {
    /// Omitted ids are generated at load time; catalogs that need stable
    /// generation keys across reloads must pin them.
    pub id: Option<Uuid>,
    pub country: String,
    pub age_min_months: u32,
    pub age_max_months: u32,
    pub category: TemplateCategory,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    pub weight: u8,
    #[serde(default)]
    pub days_before_deadline: u32,
    #[serde(default)]
    pub period: Period,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CatalogToml {
    pub fn into_templates(self) -> Result<Vec<TaskTemplate>, CatalogError> {
        Ok(self
            .templates
            .into_iter()
            .map(|t| TaskTemplate {
                id: t.id.unwrap_or_else(Uuid::new_v4),
                country: t.country,
                age_min_months: t.age_min_months,
                age_max_months: t.age_max_months,
                category: t.category,
                subcategory: t.subcategory,
                title: t.title,
                description: t.description,
                recurrence: t.recurrence,
                weight: t.weight,
                days_before_deadline: t.days_before_deadline,
                period: t.period,
                is_active: t.is_active,
            })
            .collect())
    }
}

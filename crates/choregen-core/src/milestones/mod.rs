//! Age-linked milestones: non-recurring administrative and health events
//! tied to a child's age in months (vaccinations, registrations,
//! transitions).
//!
//! The store is read-only after load and holds no per-child state. "Missed"
//! is a pure function of the child's age and a caller-supplied set of
//! completed milestone ids; completion bookkeeping lives in the persistence
//! layer, outside this module.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::TemplateCategory;

/// Kind of milestone. Closed set; each kind maps to exactly one template
/// category via [`MilestoneKind::category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Vaccination,
    Checkup,
    Registration,
    Transition,
    Administrative,
}

impl MilestoneKind {
    /// Explicit kind-to-category mapping (no string comparisons).
    pub fn category(self) -> TemplateCategory {
        match self {
            Self::Vaccination | Self::Checkup => TemplateCategory::Health,
            Self::Registration | Self::Transition => TemplateCategory::School,
            Self::Administrative => TemplateCategory::Admin,
        }
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vaccination => "vaccination",
            Self::Checkup => "checkup",
            Self::Registration => "registration",
            Self::Transition => "transition",
            Self::Administrative => "administrative",
        };
        f.write_str(s)
    }
}

impl FromStr for MilestoneKind {
    type Err = MilestoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vaccination" => Ok(Self::Vaccination),
            "checkup" => Ok(Self::Checkup),
            "registration" => Ok(Self::Registration),
            "transition" => Ok(Self::Transition),
            "administrative" => Ok(Self::Administrative),
            other => Err(MilestoneError::InvalidKind(other.to_owned())),
        }
    }
}

/// Text in one or more locales, keyed by BCP-47-ish tags ("en", "de").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(pub BTreeMap<String, String>);

impl LocalizedText {
    /// Resolve for a locale: exact match, then `"en"`, then any entry.
    pub fn get(&self, locale: &str) -> &str {
        self.0
            .get(locale)
            .or_else(|| self.0.get("en"))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An immutable age-linked milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeMilestone {
    pub id: Uuid,
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub kind: MilestoneKind,
    /// Child age at which the milestone is due, in months.
    pub age_months: u32,
    /// Display ordering within an age; higher first.
    pub priority: u8,
    pub mandatory: bool,
}

/// Errors from loading or validating the milestone store.
#[derive(Debug, Error)]
pub enum MilestoneError {
    #[error("failed to read milestones file {path:?}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("duplicate milestone id: {0}")]
    DuplicateId(Uuid),

    #[error("milestone {0} has no name in any locale")]
    EmptyName(Uuid),

    #[error("invalid milestone kind: {0:?}")]
    InvalidKind(String),
}

/// Container for deserializing a milestones TOML file.
#[derive(Debug, Deserialize)]
struct MilestoneFile {
    #[serde(default)]
    milestones: Vec<AgeMilestone>,
}

/// The embedded starter milestones, compiled into the binary.
static DEFAULT_MILESTONES_TOML: &str = include_str!("default_milestones.toml");

/// An in-memory, read-only collection of age-linked milestones.
#[derive(Debug, Clone)]
pub struct AgeRuleStore {
    milestones: Vec<AgeMilestone>,
}

impl AgeRuleStore {
    /// Parse and validate a milestone store from TOML content.
    pub fn from_toml_str(content: &str) -> Result<Self, MilestoneError> {
        let file: MilestoneFile = toml::from_str(content)?;
        Self::new(file.milestones)
    }

    /// Load from a TOML file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MilestoneError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| MilestoneError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    /// The built-in starter milestones.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed; guarded by the
    /// `embedded_milestones_are_valid` test.
    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_MILESTONES_TOML)
            .expect("embedded default_milestones.toml is invalid")
    }

    /// Build from constructed milestones, validating each.
    pub fn new(milestones: Vec<AgeMilestone>) -> Result<Self, MilestoneError> {
        let mut seen = HashSet::new();
        for m in &milestones {
            if !seen.insert(m.id) {
                return Err(MilestoneError::DuplicateId(m.id));
            }
            if m.name.is_empty() {
                return Err(MilestoneError::EmptyName(m.id));
            }
        }
        Ok(Self { milestones })
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    pub fn all(&self) -> &[AgeMilestone] {
        &self.milestones
    }

    /// Milestones due exactly at `age_months`, highest priority first.
    pub fn milestones_for_age(&self, age_months: u32) -> Vec<&AgeMilestone> {
        let mut out: Vec<&AgeMilestone> = self
            .milestones
            .iter()
            .filter(|m| m.age_months == age_months)
            .collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority));
        out
    }

    /// Milestones strictly in the future within `look_ahead_months`,
    /// excluding the current age, ordered by age then priority.
    pub fn upcoming(&self, age_months: u32, look_ahead_months: u32) -> Vec<&AgeMilestone> {
        let horizon = age_months.saturating_add(look_ahead_months);
        let mut out: Vec<&AgeMilestone> = self
            .milestones
            .iter()
            .filter(|m| m.age_months > age_months && m.age_months <= horizon)
            .collect();
        out.sort_by(|a, b| {
            a.age_months
                .cmp(&b.age_months)
                .then_with(|| b.priority.cmp(&a.priority))
        });
        out
    }

    /// Milestones whose age has passed and whose id is not in the
    /// caller-supplied completed set, oldest first.
    pub fn missed(&self, age_months: u32, completed: &HashSet<Uuid>) -> Vec<&AgeMilestone> {
        let mut out: Vec<&AgeMilestone> = self
            .milestones
            .iter()
            .filter(|m| m.age_months < age_months && !completed.contains(&m.id))
            .collect();
        out.sort_by(|a, b| {
            a.age_months
                .cmp(&b.age_months)
                .then_with(|| b.priority.cmp(&a.priority))
        });
        out
    }
}

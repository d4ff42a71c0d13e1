use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation ledger entry.
///
/// `pending` entries wait for user confirmation; `created`, `skipped`, and
/// `expired` are terminal. `created` rows are later mutated only through the
/// acknowledgement fields, by the consuming task subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Created,
    Skipped,
    Expired,
}

impl GenerationStatus {
    /// Whether no further status transitions are allowed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Created => "created",
            Self::Skipped => "skipped",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl FromStr for GenerationStatus {
    type Err = GenerationStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "created" => Ok(Self::Created),
            "skipped" => Ok(Self::Skipped),
            "expired" => Ok(Self::Expired),
            other => Err(GenerationStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`GenerationStatus`] string.
#[derive(Debug, Clone)]
pub struct GenerationStatusParseError(pub String);

impl fmt::Display for GenerationStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid generation status: {:?}", self.0)
    }
}

impl std::error::Error for GenerationStatusParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A generation ledger entry: one template-for-one-child-at-one-deadline.
///
/// `generation_key` is unique across the table; `task_id` stays NULL until
/// the entry is materialized into a [`HouseholdTask`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedTask {
    pub id: Uuid,
    pub template_id: Uuid,
    pub child_id: Uuid,
    pub household_id: Uuid,
    pub task_id: Option<Uuid>,
    pub deadline: NaiveDate,
    pub generation_key: String,
    pub status: GenerationStatus,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A materialized task row, as consumed by the task subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HouseholdTask {
    pub id: Uuid,
    pub household_id: Uuid,
    pub child_id: Uuid,
    pub title: String,
    pub deadline: NaiveDate,
    pub weight: i16,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-household override of a catalog template's defaults.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HouseholdTemplateSetting {
    pub household_id: Uuid,
    pub template_id: Uuid,
    pub is_enabled: bool,
    pub custom_days_before: Option<i32>,
    pub custom_weight: Option<i16>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal child projection consumed by the planner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildRow {
    pub id: Uuid,
    pub household_id: Uuid,
    pub first_name: String,
    pub birthdate: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

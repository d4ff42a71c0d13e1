//! Query functions for the `household_template_settings` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::HouseholdTemplateSetting;

/// Insert or update a household's override for one template.
///
/// Upsert on the (household_id, template_id) primary key so repeated calls
/// are idempotent.
pub async fn upsert_setting(
    pool: &PgPool,
    household_id: Uuid,
    template_id: Uuid,
    is_enabled: bool,
    custom_days_before: Option<i32>,
    custom_weight: Option<i16>,
) -> Result<HouseholdTemplateSetting> {
    let setting = sqlx::query_as::<_, HouseholdTemplateSetting>(
        "INSERT INTO household_template_settings \
             (household_id, template_id, is_enabled, custom_days_before, custom_weight) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (household_id, template_id) DO UPDATE \
         SET is_enabled = EXCLUDED.is_enabled, \
             custom_days_before = EXCLUDED.custom_days_before, \
             custom_weight = EXCLUDED.custom_weight, \
             updated_at = NOW() \
         RETURNING *",
    )
    .bind(household_id)
    .bind(template_id)
    .bind(is_enabled)
    .bind(custom_days_before)
    .bind(custom_weight)
    .fetch_one(pool)
    .await
    .context("failed to upsert household template setting")?;

    Ok(setting)
}

/// List all template overrides for a household.
pub async fn list_for_household(
    pool: &PgPool,
    household_id: Uuid,
) -> Result<Vec<HouseholdTemplateSetting>> {
    let settings = sqlx::query_as::<_, HouseholdTemplateSetting>(
        "SELECT * FROM household_template_settings WHERE household_id = $1",
    )
    .bind(household_id)
    .fetch_all(pool)
    .await
    .context("failed to list household template settings")?;

    Ok(settings)
}

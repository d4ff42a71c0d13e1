//! Configuration file management for choregen.
//!
//! Provides a TOML-based config file at `~/.config/choregen/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use choregen_core::catalog::TemplateCatalog;
use choregen_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    /// ISO 3166-1 alpha-2 country used to select templates.
    pub country: Option<String>,
    /// Path to a catalog TOML replacing the built-in template set.
    pub catalog_path: Option<PathBuf>,
    /// Path to a milestones TOML replacing the built-in schedule.
    pub milestones_path: Option<PathBuf>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the choregen config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/choregen` or
/// `~/.config/choregen`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support` on
/// macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("choregen");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("choregen")
}

/// Return the path to the choregen config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Country used when neither flag, env, nor config file names one.
pub const DEFAULT_COUNTRY: &str = "DE";

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ChoregenConfig {
    pub db_config: DbConfig,
    pub country: String,
    pub catalog_path: Option<PathBuf>,
    pub milestones_path: Option<PathBuf>,
}

impl ChoregenConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `CHOREGEN_DATABASE_URL` env > `config_file.database.url` > `DbConfig::DEFAULT_URL`
    /// - Country: `cli_country` > `CHOREGEN_COUNTRY` env > `config_file.generation.country` > `"DE"`
    pub fn resolve(cli_db_url: Option<&str>, cli_country: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("CHOREGEN_DATABASE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let country = if let Some(c) = cli_country {
            c.to_string()
        } else if let Ok(c) = std::env::var("CHOREGEN_COUNTRY") {
            c
        } else if let Some(c) = file_config
            .as_ref()
            .and_then(|cfg| cfg.generation.country.clone())
        {
            c
        } else {
            DEFAULT_COUNTRY.to_string()
        };

        let (catalog_path, milestones_path) = file_config
            .map(|cfg| (cfg.generation.catalog_path, cfg.generation.milestones_path))
            .unwrap_or((None, None));

        Ok(Self {
            db_config,
            country,
            catalog_path,
            milestones_path,
        })
    }

    /// Load the template catalog: the configured file if one is set, the
    /// built-in set otherwise.
    pub fn load_catalog(&self) -> Result<TemplateCatalog> {
        match &self.catalog_path {
            Some(path) => TemplateCatalog::load(path)
                .with_context(|| format!("failed to load catalog from {}", path.display())),
            None => Ok(TemplateCatalog::builtin()),
        }
    }

    /// Load the milestone schedule, configured file or built-in.
    pub fn load_milestones(&self) -> Result<choregen_core::milestones::AgeRuleStore> {
        match &self.milestones_path {
            Some(path) => choregen_core::milestones::AgeRuleStore::load(path)
                .with_context(|| format!("failed to load milestones from {}", path.display())),
            None => Ok(choregen_core::milestones::AgeRuleStore::builtin()),
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("choregen");
        let path = dir.join("config.toml");

        let original = ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
            generation: GenerationSection {
                country: Some("AT".to_string()),
                catalog_path: Some(PathBuf::from("/etc/choregen/catalog.toml")),
                milestones_path: None,
            },
        };

        std::fs::create_dir_all(&dir).unwrap();
        let contents = toml::to_string_pretty(&original).unwrap();
        std::fs::write(&path, &contents).unwrap();

        let loaded_contents = std::fs::read_to_string(&path).unwrap();
        let loaded: ConfigFile = toml::from_str(&loaded_contents).unwrap();

        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(loaded.generation.country, original.generation.country);
        assert_eq!(loaded.generation.catalog_path, original.generation.catalog_path);
    }

    #[test]
    fn generation_section_is_optional() {
        let cfg: ConfigFile =
            toml::from_str("[database]\nurl = \"postgresql://h:5432/d\"\n").unwrap();
        assert!(cfg.generation.country.is_none());
        assert!(cfg.generation.catalog_path.is_none());
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();

        unsafe { std::env::set_var("CHOREGEN_DATABASE_URL", "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var("CHOREGEN_COUNTRY", "FR") };

        let config =
            ChoregenConfig::resolve(Some("postgresql://cli:5432/clidb"), Some("AT")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
        assert_eq!(config.country, "AT");

        unsafe { std::env::remove_var("CHOREGEN_DATABASE_URL") };
        unsafe { std::env::remove_var("CHOREGEN_COUNTRY") };
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();

        unsafe { std::env::set_var("CHOREGEN_DATABASE_URL", "postgresql://env:5432/envdb") };

        let config = ChoregenConfig::resolve(None, None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");

        unsafe { std::env::remove_var("CHOREGEN_DATABASE_URL") };
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();

        unsafe { std::env::remove_var("CHOREGEN_DATABASE_URL") };
        unsafe { std::env::remove_var("CHOREGEN_COUNTRY") };
        // Point HOME and XDG_CONFIG_HOME to a temp dir so load_config()
        // cannot find a real config file.
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_home = std::env::var("HOME").ok();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("HOME", tmp.path()) };
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

        let result = ChoregenConfig::resolve(None, None);

        match orig_home {
            Some(h) => unsafe { std::env::set_var("HOME", h) },
            None => unsafe { std::env::remove_var("HOME") },
        }
        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        let config = result.unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.country, DEFAULT_COUNTRY);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("choregen/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}

mod catalog_cmds;
mod child_cmds;
mod config;
mod generate_cmd;
mod ledger_cmds;
mod milestone_cmds;
mod preview_cmd;
mod resolve;
mod rule_cmd;
mod settings_cmd;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

use choregen_db::pool;

use config::ChoregenConfig;

#[derive(Parser)]
#[command(name = "choregen", about = "Household task generation engine")]
struct Cli {
    /// Database URL (overrides CHOREGEN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Country whose template set to use (overrides CHOREGEN_COUNTRY)
    #[arg(long, global = true)]
    country: Option<String>,

    /// Evaluate as of this date instead of today (YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a choregen config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/choregen")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the choregen database (create + migrate)
    DbInit,
    /// Browse the template catalog
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Show age-linked milestones for a child
    Milestones {
        /// Child ID
        child_id: String,
        /// Look-ahead horizon in months
        #[arg(long, default_value_t = 6)]
        look_ahead: u32,
        /// Locale for milestone names (e.g. en, de)
        #[arg(long, default_value = "en")]
        locale: String,
    },
    /// Manage children
    Child {
        #[command(subcommand)]
        command: ChildCommands,
    },
    /// Manage per-household template overrides
    Setting {
        #[command(subcommand)]
        command: SettingCommands,
    },
    /// Preview what would be generated for a child (read-only)
    Preview {
        /// Child ID
        child_id: String,
    },
    /// Run a generation sweep: record due candidates as pending offers
    Generate {
        /// Restrict the sweep to one child
        #[arg(long)]
        child: Option<String>,
        /// Plan and print without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Confirm pending candidates for a child, creating the tasks
    Confirm {
        /// Child ID
        child_id: String,
        /// Confirm only this template's candidate (default: all due ones)
        template_id: Option<String>,
    },
    /// Decline one pending candidate so it is never generated
    Skip {
        /// Child ID
        child_id: String,
        /// Template ID of the candidate to skip
        template_id: String,
    },
    /// Inspect and maintain the generation ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Evaluate a recurrence rule (no database required)
    Rule(RuleArgs),
}

#[derive(Args)]
pub struct RuleArgs {
    /// Frequency: daily, weekly, monthly, yearly
    pub frequency: String,
    /// Repeat every N frequency units
    #[arg(long, default_value_t = 1)]
    pub interval: u32,
    /// Comma-separated weekdays, 0=Sun..6=Sat (weekly only)
    #[arg(long)]
    pub weekdays: Option<String>,
    /// Comma-separated days of month, 1-31 (monthly only)
    #[arg(long)]
    pub monthdays: Option<String>,
    /// Comma-separated months, 1-12, occurrences outside are filtered
    #[arg(long)]
    pub months: Option<String>,
    /// Last allowed occurrence date (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<NaiveDate>,
    /// Total occurrence cap
    #[arg(long)]
    pub count: Option<u32>,
    /// How many occurrences to print
    #[arg(short, default_value_t = 5)]
    pub n: usize,
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// List templates matching a filter
    List(CatalogListArgs),
    /// Show one template in full
    Show {
        /// Template ID
        template_id: String,
    },
    /// Show catalog-wide counts
    Stats,
}

#[derive(Args)]
pub struct CatalogListArgs {
    /// Age band in years, repeatable (e.g. --age 3-6 --age 6-10)
    #[arg(long)]
    pub age: Vec<String>,
    /// Period filter, repeatable (year_round, spring, summer, autumn, winter)
    #[arg(long)]
    pub period: Vec<String>,
    /// Category filter, repeatable (household, health, school, admin, seasonal, activity)
    #[arg(long)]
    pub category: Vec<String>,
    /// Only recurring templates
    #[arg(long, conflicts_with = "one_shot")]
    pub recurring: bool,
    /// Only one-shot templates
    #[arg(long)]
    pub one_shot: bool,
    /// Case-insensitive substring over title and description
    #[arg(long)]
    pub search: Option<String>,
    /// Minimum weight (1-10)
    #[arg(long)]
    pub min_weight: Option<u8>,
    /// Maximum weight (1-10)
    #[arg(long)]
    pub max_weight: Option<u8>,
    /// Only critical templates
    #[arg(long)]
    pub critical: bool,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Page size (capped at 100)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl CatalogListArgs {
    /// Map the two exclusive flags onto the filter's tri-state.
    pub fn recurring_filter(&self) -> Option<bool> {
        match (self.recurring, self.one_shot) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand)]
enum ChildCommands {
    /// Register a child (omit --household to start a new household)
    Add {
        /// Child's first name
        first_name: String,
        /// Birthdate (YYYY-MM-DD)
        birthdate: NaiveDate,
        /// Existing household to add the child to
        #[arg(long)]
        household: Option<String>,
    },
    /// List children (of one household, or all)
    List {
        /// Household ID (omit to list all children)
        household_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingCommands {
    /// Set a household's override for a template
    Set {
        /// Household ID
        household_id: String,
        /// Template ID
        template_id: String,
        /// Disable this template for the household
        #[arg(long)]
        disable: bool,
        /// Override the template's lead time in days
        #[arg(long)]
        days_before: Option<u32>,
        /// Override the template's weight (1-10)
        #[arg(long)]
        weight: Option<u8>,
    },
    /// List a household's overrides
    List {
        /// Household ID
        household_id: String,
    },
}

#[derive(Subcommand)]
enum LedgerCommands {
    /// Show ledger counts by status
    Status,
    /// List generation history for a child
    History {
        /// Child ID
        child_id: String,
    },
    /// Acknowledge a created entry
    Ack {
        /// Ledger entry ID
        ledger_id: String,
        /// Name of the acknowledging household member
        #[arg(long)]
        by: String,
    },
    /// Expire overdue unacknowledged pending entries
    Expire,
}

/// Execute the `choregen init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generation: config::GenerationSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `choregen db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `choregen db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &ChoregenConfig) -> Result<()> {
    println!("Initializing choregen database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;
    println!("choregen db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let as_of = cli.as_of.unwrap_or_else(|| Utc::now().date_naive());

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            cmd_db_init(&resolved).await?;
        }
        Commands::Catalog { command } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let catalog = resolved.load_catalog()?;
            match command {
                CatalogCommands::List(args) => catalog_cmds::run_list(&catalog, &args)?,
                CatalogCommands::Show { template_id } => {
                    catalog_cmds::run_show(&catalog, &template_id)?
                }
                CatalogCommands::Stats => catalog_cmds::run_stats(&catalog)?,
            }
        }
        Commands::Milestones {
            child_id,
            look_ahead,
            locale,
        } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let store = resolved.load_milestones()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                milestone_cmds::run_milestones(&db_pool, &store, &child_id, look_ahead, &locale, as_of)
                    .await;
            db_pool.close().await;
            result?;
        }
        Commands::Child { command } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = match command {
                ChildCommands::Add {
                    first_name,
                    birthdate,
                    household,
                } => child_cmds::run_add(&db_pool, household.as_deref(), &first_name, birthdate).await,
                ChildCommands::List { household_id } => {
                    child_cmds::run_list(&db_pool, household_id.as_deref(), as_of).await
                }
            };
            db_pool.close().await;
            result?;
        }
        Commands::Setting { command } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let catalog = resolved.load_catalog()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = match command {
                SettingCommands::Set {
                    household_id,
                    template_id,
                    disable,
                    days_before,
                    weight,
                } => {
                    settings_cmd::run_set(
                        &db_pool,
                        &catalog,
                        &household_id,
                        &template_id,
                        disable,
                        days_before,
                        weight,
                    )
                    .await
                }
                SettingCommands::List { household_id } => {
                    settings_cmd::run_list(&db_pool, &catalog, &household_id).await
                }
            };
            db_pool.close().await;
            result?;
        }
        Commands::Preview { child_id } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let catalog = resolved.load_catalog()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result =
                preview_cmd::run_preview(&db_pool, &catalog, &child_id, &resolved.country, as_of)
                    .await;
            db_pool.close().await;
            result?;
        }
        Commands::Generate { child, dry_run } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let catalog = resolved.load_catalog()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = generate_cmd::run_generate(
                &db_pool,
                &catalog,
                child.as_deref(),
                &resolved.country,
                as_of,
                dry_run,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Confirm {
            child_id,
            template_id,
        } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let catalog = resolved.load_catalog()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = generate_cmd::run_confirm(
                &db_pool,
                &catalog,
                &child_id,
                template_id.as_deref(),
                &resolved.country,
                as_of,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Skip {
            child_id,
            template_id,
        } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let catalog = resolved.load_catalog()?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = generate_cmd::run_skip(
                &db_pool,
                &catalog,
                &child_id,
                &template_id,
                &resolved.country,
                as_of,
            )
            .await;
            db_pool.close().await;
            result?;
        }
        Commands::Ledger { command } => {
            let resolved =
                ChoregenConfig::resolve(cli.database_url.as_deref(), cli.country.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = match command {
                LedgerCommands::Status => ledger_cmds::run_status(&db_pool).await,
                LedgerCommands::History { child_id } => {
                    ledger_cmds::run_history(&db_pool, &child_id).await
                }
                LedgerCommands::Ack { ledger_id, by } => {
                    ledger_cmds::run_ack(&db_pool, &ledger_id, &by).await
                }
                LedgerCommands::Expire => ledger_cmds::run_expire(&db_pool, as_of).await,
            };
            db_pool.close().await;
            result?;
        }
        Commands::Rule(args) => {
            rule_cmd::run_rule(&args, as_of)?;
        }
    }

    Ok(())
}

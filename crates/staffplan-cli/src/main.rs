mod alloc_cmds;
mod config;
mod plan_cmds;
mod project_cmd;
mod report_cmd;
mod resolve;
#[cfg(test)]
mod test_util;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use rust_decimal::Decimal;

use staffplan_db::config::DbConfig;
use staffplan_db::models::EscalationPeriod;
use staffplan_db::pool;

use config::StaffplanConfig;

#[derive(Parser)]
#[command(
    name = "staffplan",
    version,
    about = "Time-phased staffing cost projection"
)]
struct Cli {
    /// Database URL (overrides STAFFPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a staffplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and run migrations
    DbInit,
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Allocation management
    Alloc {
        #[command(subcommand)]
        command: AllocCommands,
    },
    /// Show the yearly breakdown and totals of a plan
    Report {
        /// Plan ID or plan file with an id
        plan: String,
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Cost a plan file without touching the database
    Project {
        /// Path to the plan TOML file
        file: String,
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Create a plan from a TOML file
    Create {
        /// Path to the plan TOML file
        file: String,
    },
    /// Show plan details (or list all plans)
    Show {
        /// Plan ID or plan file (omit to list all)
        plan_id: Option<String>,
    },
    /// Change a plan's name, duration or rates
    Update {
        /// Plan ID or plan file
        plan_id: String,
        #[arg(long)]
        name: Option<String>,
        /// Duration in months
        #[arg(long)]
        duration: Option<i32>,
        /// Overhead rate in percent of labor
        #[arg(long)]
        overhead: Option<Decimal>,
        /// Profit margin in percent of cost
        #[arg(long)]
        profit: Option<Decimal>,
    },
    /// Delete a plan and all of its allocations
    Delete {
        /// Plan ID or plan file
        plan_id: String,
    },
    /// Export a plan from the database as TOML
    Export {
        /// Plan ID or plan file
        plan_id: String,
        /// Output file path (defaults to stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

/// Escalation flags shared by `alloc add` and `alloc update`.
#[derive(Args, Debug, Default)]
pub struct EscalationArgs {
    /// Escalation period as start:end:rate (repeatable), e.g. 13:24:3.5
    #[arg(long, value_parser = alloc_cmds::parse_period)]
    period: Vec<EscalationPeriod>,
    /// Single annual escalation rate in percent
    #[arg(long)]
    escalation_rate: Option<Decimal>,
    /// First month the single rate applies to
    #[arg(long, requires = "escalation_rate")]
    escalation_start: Option<i32>,
}

#[derive(Subcommand)]
pub enum AllocCommands {
    /// Add an allocation to a plan
    Add {
        /// Plan ID or plan file
        plan: String,
        #[arg(long)]
        role: String,
        /// First month (1-based)
        #[arg(long)]
        start: i32,
        /// Last month (inclusive)
        #[arg(long)]
        end: i32,
        /// Hours per week
        #[arg(long)]
        hours: Decimal,
        /// Hourly rate
        #[arg(long)]
        rate: Decimal,
        #[command(flatten)]
        escalation: EscalationArgs,
    },
    /// Change fields of an allocation
    Update {
        /// Allocation ID
        id: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        start: Option<i32>,
        #[arg(long)]
        end: Option<i32>,
        #[arg(long)]
        hours: Option<Decimal>,
        #[arg(long)]
        rate: Option<Decimal>,
        #[command(flatten)]
        escalation: EscalationArgs,
        /// Remove all escalation
        #[arg(long)]
        no_escalation: bool,
    },
    /// Remove an allocation
    Remove {
        /// Allocation ID
        id: String,
    },
    /// List the allocations of a plan
    List {
        /// Plan ID or plan file
        plan: String,
    },
}

/// Execute the `staffplan init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
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
    };
    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `staffplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `staffplan db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = StaffplanConfig::resolve(cli_db_url)?;

    println!("Initializing staffplan database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("staffplan db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Plan { command } => {
            let resolved = StaffplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Alloc { command } => {
            let resolved = StaffplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = alloc_cmds::run_alloc_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Report { plan, json } => {
            let resolved = StaffplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = report_cmd::run_report(&db_pool, &plan, json).await;
            db_pool.close().await;
            result?;
        }
        Commands::Project { file, json } => {
            project_cmd::run_project(&file, json)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "staffplan",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

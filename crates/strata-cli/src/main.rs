mod commands;
mod logging;
mod output;
mod redaction;
mod workspace;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strata_deploy::DeployError;
use strata_package::{PackageError, SchemaMapping};
use strata_plan::PlanError;
use thiserror::Error;
use uuid::Uuid;

use workspace::{ProjectPaths, WorkspaceError, load_settings};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),
    #[error("logging error: {0}")]
    Logging(#[from] logging::LoggingError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("{0}")]
    Deploy(#[from] DeployError),
    #[error("package error: {0}")]
    Package(#[from] PackageError),
    #[error("registry error: {0}")]
    Registry(#[from] strata_core::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plan {plan} has {errors} error(s)")]
    InvalidPlan { plan: String, errors: usize },
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("unsupported database url: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Plan-driven Postgres change management")]
struct Cli {
    /// Project root holding strata.toml.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default strata.toml.
    Init,
    /// Report plan syntax and dependency problems.
    Validate(ValidateArgs),
    /// Print the deployment order.
    Order(OrderArgs),
    /// Compare the plan with deployed changes.
    Status(StatusArgs),
    /// List deployed changes to revert back to a target.
    Revert(RevertArgs),
    /// Rewrite a plan in canonical form.
    Fmt(FmtArgs),
    /// Stamp the plan and its scripts into an extension package.
    Package(PackageArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::Validate(_) => "validate",
            Command::Order(_) => "order",
            Command::Status(_) => "status",
            Command::Revert(_) => "revert",
            Command::Fmt(_) => "fmt",
            Command::Package(_) => "package",
        }
    }
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Plan file (defaults to the configured plan).
    plan: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct OrderArgs {
    plan: Option<PathBuf>,
    /// Stop at this change, tag or relative revision.
    #[arg(long, value_name = "REVISION")]
    to: Option<String>,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct RegistryArgs {
    /// JSON registry snapshot.
    #[arg(long, value_name = "FILE", conflicts_with = "database_url")]
    snapshot: Option<PathBuf>,
    /// Postgres connection string for the registry.
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,
    /// Schema holding the registry tables (overrides strata.toml).
    #[arg(long, value_name = "SCHEMA")]
    registry_schema: Option<String>,
}

#[derive(Args, Debug)]
struct StatusArgs {
    plan: Option<PathBuf>,
    #[command(flatten)]
    registry: RegistryArgs,
    #[arg(long, value_name = "REVISION")]
    to: Option<String>,
    /// Directory with deploy/ scripts used to detect modified changes.
    #[arg(long, value_name = "DIR")]
    scripts: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct RevertArgs {
    plan: Option<PathBuf>,
    #[command(flatten)]
    registry: RegistryArgs,
    /// Keep this revision and everything before it.
    #[arg(long, value_name = "REVISION")]
    to: String,
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct FmtArgs {
    plan: Option<PathBuf>,
    /// Rewrite the file in place instead of printing.
    #[arg(long, default_value_t = false)]
    write: bool,
}

#[derive(Args, Debug)]
struct PackageArgs {
    plan: Option<PathBuf>,
    /// Directory with deploy/, revert/ and verify/ scripts.
    #[arg(long, value_name = "DIR")]
    source: PathBuf,
    /// Output directory for the package.
    #[arg(long, value_name = "DIR")]
    out: PathBuf,
    /// Extension name stamped into scripts and the plan.
    #[arg(long)]
    name: String,
    /// Extension version (defaults to strata.toml).
    #[arg(long = "ext-version", value_name = "VERSION")]
    version: Option<String>,
    /// Schema rename as TEMPLATE_SCHEMA=LOGICAL_NAME; repeatable, applied in order.
    #[arg(long = "schema", value_name = "OLD=LOGICAL", value_parser = parse_schema_mapping)]
    schemas: Vec<SchemaMapping>,
}

fn parse_schema_mapping(value: &str) -> Result<SchemaMapping, String> {
    match value.split_once('=') {
        Some((schema_name, name)) if !schema_name.is_empty() && !name.is_empty() => {
            Ok(SchemaMapping {
                schema_name: schema_name.to_string(),
                name: name.to_string(),
            })
        }
        _ => Err(format!("expected OLD=LOGICAL, got '{value}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let paths = ProjectPaths::new(cli.root);
    let settings = load_settings(&paths)?;
    logging::init_logging(
        paths.log_path(&settings).as_deref(),
        settings.logging.format,
    )?;

    let invocation_id = Uuid::new_v4().to_string();
    let command_name = cli.command.name();
    tracing::info!(
        event = "command_started",
        invocation_id = %invocation_id,
        command = command_name
    );

    let ctx = commands::Context { paths, settings };
    let result = match cli.command {
        Command::Init => commands::run_init(&ctx),
        Command::Validate(args) => commands::run_validate(&ctx, args),
        Command::Order(args) => commands::run_order(&ctx, args),
        Command::Status(args) => commands::run_status(&ctx, args).await,
        Command::Revert(args) => commands::run_revert(&ctx, args).await,
        Command::Fmt(args) => commands::run_fmt(&ctx, args),
        Command::Package(args) => commands::run_package(&ctx, args),
    };

    match &result {
        Ok(()) => tracing::info!(
            event = "command_finished",
            invocation_id = %invocation_id,
            command = command_name,
            status = "success"
        ),
        Err(err) => tracing::error!(
            event = "command_finished",
            invocation_id = %invocation_id,
            command = command_name,
            status = "failed",
            error = %err
        ),
    }
    result
}

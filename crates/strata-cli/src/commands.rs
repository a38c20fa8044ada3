use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use strata_core::{script_hash, RegistryState};
use strata_deploy::{DependencyGraph, DeployError};
use strata_package::{package, serialize_plan, DirScriptSource, PackageOptions, ScriptKind};
use strata_plan::{parse_plan_file, IssueKind, ParsedPlan};
use strata_registry::{PostgresRegistry, RegistryReader, SnapshotRegistry};

use crate::output;
use crate::redaction::redact_database_url;
use crate::workspace::{
    ProjectPaths, StrataSettings, WorkspaceError, load_or_create_settings, write_bytes_atomic,
};
use crate::{
    CliError, FmtArgs, OrderArgs, PackageArgs, RegistryArgs, RevertArgs, StatusArgs, ValidateArgs,
};

pub struct Context {
    pub paths: ProjectPaths,
    pub settings: StrataSettings,
}

impl Context {
    fn plan_path(&self, explicit: Option<&Path>) -> PathBuf {
        self.paths.plan_path(explicit, &self.settings)
    }
}

pub fn run_init(ctx: &Context) -> Result<(), CliError> {
    let path = ctx.paths.settings_path();
    let existed = path.exists();
    load_or_create_settings(&ctx.paths)?;
    if existed {
        println!("{} already exists", path.display());
    } else {
        tracing::info!(event = "settings_created", path = %path.display());
        println!("wrote {}", path.display());
    }
    Ok(())
}

pub fn run_validate(ctx: &Context, args: ValidateArgs) -> Result<(), CliError> {
    let path = ctx.plan_path(args.plan.as_deref());
    let parsed = parse_plan_file(&path)?;
    let mut report = parsed.report;

    // Graph checks need a structurally sound plan.
    if report.is_ok() {
        match DependencyGraph::build(&parsed.plan) {
            Ok(graph) => {
                let summary = graph.summary();
                tracing::info!(
                    event = "plan_validated",
                    changes = summary.nodes,
                    edges = summary.edges,
                    externals = summary.externals
                );
            }
            Err(DeployError::Graph(errors)) => {
                for error in &errors {
                    report.push(error.to_issue());
                }
            }
            Err(other) => return Err(other.into()),
        }
    }

    output::print_report(&path, &report, args.json)?;
    if report.is_ok() {
        Ok(())
    } else {
        Err(CliError::InvalidPlan {
            plan: path.display().to_string(),
            errors: report.errors.len(),
        })
    }
}

pub fn run_order(ctx: &Context, args: OrderArgs) -> Result<(), CliError> {
    let path = ctx.plan_path(args.plan.as_deref());
    let graph = load_graph(&path)?;
    let plan = match args.to.as_deref() {
        Some(target) => graph.deployment_plan_to(target)?,
        None => graph.deployment_plan()?,
    };
    tracing::info!(event = "order_computed", changes = plan.changes.len());
    output::print_deployment(&plan, args.json)
}

pub async fn run_status(ctx: &Context, args: StatusArgs) -> Result<(), CliError> {
    let path = ctx.plan_path(args.plan.as_deref());
    let graph = load_graph(&path)?;
    let registry = fetch_registry(ctx, &args.registry, graph.project()).await?;

    let hashes = match &args.scripts {
        Some(dir) => deploy_script_hashes(&graph, dir)?,
        None => BTreeMap::new(),
    };

    let diff = graph
        .diff_with_scripts(&registry, args.to.as_deref(), &hashes)
        .map_err(|err| report_divergence(&path, err))?;
    tracing::info!(
        event = "status_computed",
        pending = diff.pending.len(),
        deployed = diff.deployed.len(),
        modified = diff.modified.len()
    );
    output::print_diff(graph.project(), &diff, args.json)
}

pub async fn run_revert(ctx: &Context, args: RevertArgs) -> Result<(), CliError> {
    let path = ctx.plan_path(args.plan.as_deref());
    let graph = load_graph(&path)?;
    let registry = fetch_registry(ctx, &args.registry, graph.project()).await?;

    let plan = graph
        .revert_plan(&registry, &args.to)
        .map_err(|err| report_divergence(&path, err))?;
    tracing::info!(event = "revert_computed", changes = plan.changes.len());
    output::print_revert(&plan, args.json)
}

pub fn run_fmt(ctx: &Context, args: FmtArgs) -> Result<(), CliError> {
    let path = ctx.plan_path(args.plan.as_deref());
    let parsed = parse_plan_file(&path)?;
    let serialized = serialize_plan(&parsed.plan);
    for warning in &serialized.warnings {
        eprintln!("{}: {warning}", path.display());
    }

    if args.write {
        write_bytes_atomic(&path, serialized.text.as_bytes())?;
        tracing::info!(event = "plan_formatted", path = %path.display());
    } else {
        print!("{}", serialized.text);
    }
    Ok(())
}

pub fn run_package(ctx: &Context, args: PackageArgs) -> Result<(), CliError> {
    let path = ctx.plan_path(args.plan.as_deref());
    let parsed = parse_plan_file(&path)?;
    reject_blocking_issues(&path, &parsed, &[IssueKind::DuplicateChangeName])?;

    let mut options = PackageOptions::new(&args.name);
    options.version = args
        .version
        .unwrap_or_else(|| ctx.settings.package.default_version.clone());
    options.schemas = args.schemas;
    if let Some(file_name) = ctx.settings.plan_file.file_name() {
        options.plan_file = file_name.to_string_lossy().into_owned();
    }

    let source = DirScriptSource::new(&args.source);
    let built = package(&parsed.plan, &source, &options)?;
    for warning in &built.warnings {
        eprintln!("{}: {warning}", path.display());
    }

    for file in &built.files {
        let target = args.out.join(&file.path);
        write_bytes_atomic(&target, file.content.as_bytes())?;
        tracing::debug!(event = "package_file_written", path = %target.display());
    }
    tracing::info!(
        event = "package_written",
        out = %args.out.display(),
        files = built.files.len()
    );
    println!(
        "wrote {} file(s) for extension {} to {}",
        built.files.len(),
        options.name,
        args.out.display()
    );
    if !built.externals.is_empty() {
        println!("requires: {}", built.externals.join(", "));
    }
    Ok(())
}

/// Parse a plan and build its graph, printing any issues that prevent it.
fn load_graph(path: &Path) -> Result<DependencyGraph, CliError> {
    let parsed = parse_plan_file(path)?;
    reject_blocking_issues(path, &parsed, &[])?;
    match DependencyGraph::build(&parsed.plan) {
        Ok(graph) => Ok(graph),
        Err(err) => {
            let issues: Vec<_> = err.graph_errors().iter().map(|e| e.to_issue()).collect();
            output::eprint_issues(path, &issues);
            Err(err.into())
        }
    }
}

fn reject_blocking_issues(
    path: &Path,
    parsed: &ParsedPlan,
    tolerated: &[IssueKind],
) -> Result<(), CliError> {
    let blocking: Vec<_> = parsed
        .report
        .errors
        .iter()
        .filter(|issue| !tolerated.contains(&issue.kind))
        .cloned()
        .collect();
    if blocking.is_empty() {
        return Ok(());
    }
    output::eprint_issues(path, &blocking);
    Err(CliError::InvalidPlan {
        plan: path.display().to_string(),
        errors: blocking.len(),
    })
}

fn report_divergence(path: &Path, err: DeployError) -> CliError {
    if let DeployError::Divergence(divergence) = &err {
        output::eprint_issues(path, &divergence.to_issues());
    }
    err.into()
}

async fn fetch_registry(
    ctx: &Context,
    args: &RegistryArgs,
    project: &str,
) -> Result<RegistryState, CliError> {
    let reader: Box<dyn RegistryReader + Send + Sync> = match (&args.snapshot, &args.database_url) {
        (Some(snapshot), _) => Box::new(SnapshotRegistry::new(snapshot)),
        (None, Some(url)) => Box::new(connect_postgres(ctx, args, url).await?),
        (None, None) => {
            let env_name = &ctx.settings.registry.database_url_env;
            match std::env::var(env_name) {
                Ok(url) => Box::new(connect_postgres(ctx, args, &url).await?),
                Err(_) => {
                    return Err(CliError::InvalidArgs(format!(
                        "no registry source: pass --snapshot or --database-url, or set {env_name}"
                    )));
                }
            }
        }
    };

    let state = reader.fetch(project).await?;
    tracing::info!(
        event = "registry_loaded",
        backend = reader.backend(),
        changes = state.changes.len()
    );
    Ok(state)
}

async fn connect_postgres(
    ctx: &Context,
    args: &RegistryArgs,
    url: &str,
) -> Result<PostgresRegistry, CliError> {
    if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
        return Err(CliError::UnsupportedEngine(redact_database_url(url)));
    }
    let schema = args
        .registry_schema
        .clone()
        .unwrap_or_else(|| ctx.settings.registry.schema.clone());
    tracing::info!(
        event = "registry_connecting",
        url = %redact_database_url(url),
        schema = %schema
    );
    Ok(PostgresRegistry::connect(url, schema).await?)
}

/// Hashes of deploy scripts present under `dir`, by change name.
fn deploy_script_hashes(
    graph: &DependencyGraph,
    dir: &Path,
) -> Result<BTreeMap<String, String>, CliError> {
    let mut hashes = BTreeMap::new();
    for node in graph.nodes() {
        let path = dir.join(ScriptKind::Deploy.contained_path(&node.name)?);
        match std::fs::read_to_string(&path) {
            Ok(body) => {
                hashes.insert(node.name.clone(), script_hash(&body));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(WorkspaceError::Io(err).into()),
        }
    }
    Ok(hashes)
}

// ABOUTME: Command-line entry point for the assessment console
// ABOUTME: Lists profiles and workflows, distributes questions, watches progress, runs actions

use anyhow::{bail, Context, Result};
use assessment_console::distribution::{allocate, total_questions, weight_warning};
use assessment_console::form::{submit, AssessmentForm};
use assessment_console::poller::{DetailPollPolicy, DetailPoller, ListPoller, Phase, ViewState};
use assessment_console::remote::models::{ExecutionStatus, WorkflowDetail, WorkflowQuery};
use assessment_console::remote::{self, RemoteClient, WorkflowApi};
use assessment_console::steps::{step_label, step_position};
use assessment_console::{available_actions, ConsoleConfig, WorkflowAction};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "assess")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Console for certification assessment workflows", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend API base URL (overrides the config file)
    #[arg(long, global = true, env = "ASSESS_API_URL")]
    api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List certification profiles
    Profiles,

    /// Split a question count across a profile's exam domains by weight
    Distribute {
        /// Certification profile id
        profile_id: String,

        /// Total number of questions
        count: u32,
    },

    /// List workflows
    Workflows {
        /// Only show workflows with this status
        #[arg(short, long)]
        status: Option<ExecutionStatus>,

        /// Maximum number of workflows to fetch
        #[arg(short, long)]
        limit: Option<u32>,

        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Show one workflow
    Show {
        /// Workflow id
        id: String,

        /// Follow progress until the workflow finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// Retry a failed workflow
    Retry {
        /// Workflow id
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Force a workflow waiting on collected responses to advance
    ManualProcess {
        /// Workflow id
        id: String,
    },

    /// Start execution of a freshly created workflow
    AutoProgress {
        /// Workflow id
        id: String,
    },

    /// Submit a new assessment workflow from a JSON form file
    Request {
        /// Path to the form values (JSON)
        form: PathBuf,
    },

    /// Export a workflow's gap analysis to Google Sheets
    Export {
        /// Workflow id
        id: String,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = ConsoleConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_api_base_url(cli.api_url)
        .validate()
        .context("Invalid configuration")?;

    let api = Arc::new(
        RemoteClient::new(config.api_base_url.clone(), config.request_timeout())
            .context("Failed to create backend client")?,
    );

    match cli.command {
        Commands::Profiles => list_profiles(api.as_ref()).await,
        Commands::Distribute { profile_id, count } => {
            distribute(api.as_ref(), &profile_id, count).await
        }
        Commands::Workflows {
            status,
            limit,
            watch,
        } => {
            let query = WorkflowQuery {
                status_filter: status,
                limit: limit.unwrap_or(config.list_limit),
            };
            if watch {
                watch_workflows(api, query, &config).await
            } else {
                let workflows = api
                    .fetch_workflows(&query)
                    .await
                    .context("Failed to fetch workflows")?;
                print_workflows(&workflows);
                Ok(())
            }
        }
        Commands::Show { id, watch } => {
            if watch {
                watch_workflow(api, &id, &config).await
            } else {
                let detail = load_detail(api, &id, &config).await?;
                print_detail(&detail);
                Ok(())
            }
        }
        Commands::Retry { id, yes } => {
            if !yes
                && !dialoguer::Confirm::new()
                    .with_prompt(format!("Retry workflow {}?", id))
                    .default(true)
                    .interact()
                    .context("Failed to read confirmation")?
            {
                println!("Cancelled");
                return Ok(());
            }
            run_action(api, &id, WorkflowAction::Retry, &config).await
        }
        Commands::ManualProcess { id } => {
            run_action(api, &id, WorkflowAction::ManualProcess, &config).await
        }
        Commands::AutoProgress { id } => {
            run_action(api, &id, WorkflowAction::AutoProgress, &config).await
        }
        Commands::Request { form } => submit_request(api.as_ref(), &form).await,
        Commands::Export { id } => export_to_sheets(api.as_ref(), &id).await,
    }
}

async fn list_profiles(api: &RemoteClient) -> Result<()> {
    let profiles = api
        .fetch_certification_profiles()
        .await
        .context("Failed to fetch certification profiles")?;

    if profiles.is_empty() {
        println!("No certification profiles found");
        return Ok(());
    }

    for profile in &profiles {
        println!(
            "{}  {} {} ({})",
            profile.id, profile.name, profile.version, profile.provider
        );
        for domain in &profile.exam_domains {
            println!("    {:>3}%  {}", domain.weight_percentage, domain.name);
        }
        if let Some(warning) = weight_warning(&profile.exam_domains) {
            println!("    warning: {}", warning);
        }
    }
    Ok(())
}

async fn distribute(api: &RemoteClient, profile_id: &str, count: u32) -> Result<()> {
    let profile = api
        .fetch_certification_profile(profile_id)
        .await
        .with_context(|| format!("Failed to fetch certification profile {}", profile_id))?;

    if let Some(warning) = weight_warning(&profile.exam_domains) {
        eprintln!("warning: {}", warning);
    }

    let entries = allocate(&profile.exam_domains, count);
    for entry in &entries {
        let name = if entry.domain.is_empty() {
            "(all domains)"
        } else {
            entry.domain.as_str()
        };
        println!("{:>5}  {}", entry.question_count, name);
    }
    println!("{:>5}  total", total_questions(&entries));
    Ok(())
}

async fn load_detail(
    api: Arc<RemoteClient>,
    id: &str,
    config: &ConsoleConfig,
) -> Result<WorkflowDetail> {
    let poller = DetailPoller::start_with(
        api,
        id,
        config.detail_poll_interval(),
        DetailPollPolicy::InProgressOnly,
    );
    let state = first_state(&poller).await?;
    into_detail(id, state)
}

async fn first_state(poller: &DetailPoller<RemoteClient>) -> Result<ViewState<WorkflowDetail>> {
    let mut rx = poller.subscribe();
    let state = rx
        .wait_for(|state| state.phase != Phase::Loading)
        .await
        .context("Workflow view closed before loading")?
        .clone();
    Ok(state)
}

fn into_detail(id: &str, state: ViewState<WorkflowDetail>) -> Result<WorkflowDetail> {
    match (state.phase, state.data) {
        (Phase::NotFound, _) => bail!("Workflow {} not found", id),
        (Phase::Failed(msg), _) => bail!("Failed to fetch workflow {}: {}", id, msg),
        (_, Some(detail)) => Ok(detail),
        (_, None) => bail!("Workflow {} not found", id),
    }
}

async fn run_action(
    api: Arc<RemoteClient>,
    id: &str,
    action: WorkflowAction,
    config: &ConsoleConfig,
) -> Result<()> {
    let poller = DetailPoller::start_with(
        api,
        id,
        config.detail_poll_interval(),
        DetailPollPolicy::InProgressOnly,
    );
    into_detail(id, first_state(&poller).await?)?;

    let actions = poller.actions();
    let outcome = match action {
        WorkflowAction::Retry => actions.retry().await,
        WorkflowAction::ManualProcess => actions.manual_process().await,
        WorkflowAction::AutoProgress => actions.auto_progress().await,
    };
    outcome.with_context(|| format!("Failed to {} workflow {}", action, id))?;

    println!("{} requested for workflow {}", action, id);
    // The action went through; a failed follow-up fetch only costs the refreshed view.
    match into_detail(id, poller.current()) {
        Ok(detail) => print_detail(&detail),
        Err(err) => warn!("Could not refresh workflow {} after {}: {:#}", id, action, err),
    }
    Ok(())
}

async fn watch_workflow(api: Arc<RemoteClient>, id: &str, config: &ConsoleConfig) -> Result<()> {
    let poller = DetailPoller::start_with(
        api,
        id,
        config.detail_poll_interval(),
        DetailPollPolicy::UntilTerminal,
    );
    let mut rx = poller.subscribe();

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .context("Invalid progress template")?,
    );

    loop {
        let state = rx.borrow_and_update().clone();
        match state.phase {
            Phase::Loading => {}
            Phase::NotFound => {
                bar.abandon_with_message("not found");
                bail!("Workflow {} not found", id);
            }
            Phase::Failed(ref msg) => {
                bar.set_message(format!("fetch failed: {} (retrying)", msg));
            }
            Phase::Ready => {}
        }

        if let Some(detail) = &state.data {
            bar.set_position(detail.progress_percent() as u64);
            if !matches!(state.phase, Phase::Failed(_)) {
                bar.set_message(format!(
                    "{} - {} {}",
                    detail.execution_status,
                    step_label(&detail.current_step),
                    step_position(&detail.current_step).unwrap_or_default()
                ));
            }
            if detail.execution_status.is_terminal() {
                bar.finish();
                print_detail(detail);
                return Ok(());
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                changed.context("Workflow view closed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                bar.abandon_with_message("interrupted");
                return Ok(());
            }
        }
    }
}

async fn watch_workflows(
    api: Arc<RemoteClient>,
    query: WorkflowQuery,
    config: &ConsoleConfig,
) -> Result<()> {
    let poller = ListPoller::start_with(api, query, config.list_poll_interval());
    let mut rx = poller.subscribe();

    loop {
        tokio::select! {
            changed = rx.changed() => {
                changed.context("Workflow list closed")?;
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        let state = rx.borrow_and_update().clone();
        if let Some(msg) = state.error() {
            eprintln!("Failed to refresh workflows: {} (will try again)", msg);
            continue;
        }
        if let Some(workflows) = &state.data {
            println!("--- {} workflow(s) ---", workflows.len());
            print_workflows(workflows);
        }
    }
}

async fn submit_request(api: &RemoteClient, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let form: AssessmentForm =
        serde_json::from_str(&content).context("Failed to parse assessment form")?;

    let workflow = submit(api, form)
        .await
        .context("Failed to submit assessment workflow")?;
    println!("Created workflow {}", workflow.id);
    print_detail(&workflow);
    Ok(())
}

async fn export_to_sheets(api: &RemoteClient, id: &str) -> Result<()> {
    let result = remote::export_gap_analysis(api, id)
        .await
        .with_context(|| format!("Failed to export gap analysis for workflow {}", id))?;

    if let Some(url) = &result.spreadsheet_url {
        println!("Spreadsheet: {}", url);
    }
    if result.mock_response == Some(true) {
        println!("Sheets integration is not configured; the backend returned a mock export.");
    }
    if let Some(message) = &result.message {
        println!("{}", message);
    }
    for step in result.instructions.iter().flatten() {
        println!("  - {}", step);
    }
    Ok(())
}

fn print_workflows(workflows: &[WorkflowDetail]) {
    if workflows.is_empty() {
        println!("No workflows found");
        return;
    }
    for wf in workflows {
        println!(
            "{}  {:<20} {:>3}%  {}",
            wf.id,
            wf.execution_status,
            wf.progress_percent(),
            step_label(&wf.current_step)
        );
    }
}

fn print_detail(detail: &WorkflowDetail) {
    println!("Workflow:      {}", detail.id);
    println!("Certification: {}", detail.certification_profile_id);
    println!("Status:        {}", detail.execution_status);
    println!(
        "Step:          {} {}",
        step_label(&detail.current_step),
        step_position(&detail.current_step).unwrap_or_default()
    );
    println!("Progress:      {}%", detail.progress_percent());
    if let Some(err) = &detail.error_message {
        println!("Error:         {}", err);
    }

    if !detail.step_execution_log.is_empty() {
        println!("Steps:");
        for entry in &detail.step_execution_log {
            let duration = entry
                .duration_seconds
                .map(|d| format!(" ({:.1}s)", d))
                .unwrap_or_default();
            println!(
                "  {:<24} {}{}",
                step_label(&entry.step),
                entry.status,
                duration
            );
            if let Some(err) = &entry.error_message {
                println!("    {}", err);
            }
        }
    }

    let actions = available_actions(detail);
    if !actions.is_empty() {
        let names: Vec<_> = actions.iter().map(|a| a.name()).collect();
        println!("Available:     {}", names.join(", "));
    }
}

//! CLI command definitions, routing, and tracing setup.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadenrich_core::{Enricher, ProgressReporter};
use leadenrich_shared::{
    AppConfig, EnrichmentResult, JobPosting, PipelineConfig, config_file_path, expand_home,
    init_config, load_config, load_config_from, resolve_secret,
};
use leadenrich_stats::StatsStore;

use crate::wiring;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadEnrich: find the decision maker and a phone number for a job posting.
#[derive(Parser)]
#[command(
    name = "leadenrich",
    version,
    about = "Enrich DACH job postings with a decision maker and a verified phone number.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.leadenrich/leadenrich.toml).
    #[arg(long, global = true, env = "LEADENRICH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Text,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich one job posting given as a JSON payload.
    Enrich {
        /// Path to the posting JSON (`-` reads stdin).
        payload: PathBuf,

        /// Only use free sources, never call paid phone vendors.
        #[arg(long)]
        skip_paid: bool,

        /// Write the result to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Result format.
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
    },

    /// Phone vendor statistics.
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },

    /// Show which sources and vendors the current config enables.
    Sources,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Stats subcommands.
#[derive(Subcommand)]
pub(crate) enum StatsAction {
    /// Print per-vendor hit rates.
    Show {
        /// Print the raw statistics document.
        #[arg(long)]
        json: bool,
    },
    /// Clear all counters.
    Reset,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so that `enrich` output on stdout stays machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadenrich=info",
        1 => "leadenrich=debug",
        _ => "leadenrich=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Enrich {
            payload,
            skip_paid,
            output,
            format,
        } => cmd_enrich(config_path, &payload, skip_paid, output.as_deref(), format).await,
        Command::Stats { action } => match action {
            StatsAction::Show { json } => cmd_stats_show(config_path, json),
            StatsAction::Reset => cmd_stats_reset(config_path),
        },
        Command::Sources => cmd_sources(config_path),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    config_path: Option<&Path>,
    payload: &Path,
    skip_paid: bool,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let config = config(config_path)?;
    let posting = read_posting(payload)?;

    let wiring = wiring::build(&config)?;
    let enricher = Enricher::new(wiring.collaborators, PipelineConfig::from(&config));

    info!(job_id = %posting.id, company = %posting.company, skip_paid, "enriching posting");

    let reporter = CliProgress::new();
    let result = enricher
        .enrich_with_progress(&posting, skip_paid, &reporter)
        .await?;

    if let Some(llm) = &wiring.llm {
        let usage = llm.usage();
        info!(
            requests = usage.requests,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "llm usage"
        );
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&result)?,
        OutputFormat::Text => render_text(&result),
    };

    match output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .wrap_err_with(|| format!("cannot write {}", path.display()))?;
            println!("Result written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

fn read_posting(payload: &Path) -> Result<JobPosting> {
    let content = if payload == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).wrap_err("cannot read payload from stdin")?
    } else {
        std::fs::read_to_string(payload)
            .wrap_err_with(|| format!("cannot read payload {}", payload.display()))?
    };
    serde_json::from_str(&content)
        .map_err(|e| eyre!("invalid job posting payload '{}': {e}", payload.display()))
}

/// Human-readable summary of one result.
fn render_text(result: &EnrichmentResult) -> String {
    let mut out = String::new();
    let company = &result.company;

    let _ = writeln!(out);
    let _ = writeln!(out, "  Job:       {} ({})", result.job_title, result.job_id);
    let _ = writeln!(out, "  Company:   {}", company.name);
    if let Some(domain) = &company.domain {
        let _ = writeln!(out, "  Domain:    {domain}");
    }
    if let Some(phone) = &company.phone {
        let _ = writeln!(out, "  Main line: {phone}");
    }

    match &result.decision_maker {
        Some(dm) => {
            let title = dm.title.as_deref().unwrap_or("-");
            let _ = writeln!(out, "  Contact:   {} ({title})", dm.name);
            if let Some(email) = &dm.email {
                let _ = writeln!(out, "  Email:     {email}");
            }
            if let Some(url) = &dm.linkedin_url {
                let _ = writeln!(out, "  LinkedIn:  {url}");
            }
            if let Some(note) = &dm.employment_note {
                let _ = writeln!(out, "  Note:      {note}");
            }
        }
        None => {
            let _ = writeln!(out, "  Contact:   -");
        }
    }

    match &result.phone {
        Some(phone) => {
            let _ = writeln!(
                out,
                "  Phone:     {} ({}, via {})",
                phone.number, phone.phone_type, phone.source
            );
        }
        None => {
            let _ = writeln!(out, "  Phone:     -");
        }
    }
    let _ = writeln!(out, "  Status:    {}", result.phone_status);
    let _ = writeln!(out, "  Success:   {}", if result.success { "yes" } else { "no" });

    if !result.emails.is_empty() {
        let _ = writeln!(out, "  Emails:    {}", result.emails.join(", "));
    }
    if let Some(intel) = &result.company_intel {
        let _ = writeln!(out, "  Brief:     {}", intel.summary);
    }
    let _ = writeln!(out, "  Path:      {}", result.enrichment_path.join(" → "));
    out
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &EnrichmentResult) {
        self.spinner.finish_and_clear();
    }
}

fn stats_store(config_path: Option<&Path>) -> Result<StatsStore> {
    let config = config(config_path)?;
    Ok(StatsStore::open(expand_home(&config.defaults.stats_file)?))
}

fn cmd_stats_show(config_path: Option<&Path>, json: bool) -> Result<()> {
    let store = stats_store(config_path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&store.snapshot()?)?);
    } else {
        println!("{}", store.summary()?);
    }
    Ok(())
}

fn cmd_stats_reset(config_path: Option<&Path>) -> Result<()> {
    let store = stats_store(config_path)?;
    store.reset()?;
    println!("Statistics reset: {}", store.path().display());
    Ok(())
}

fn cmd_sources(config_path: Option<&Path>) -> Result<()> {
    let config = config(config_path)?;
    let wiring = wiring::build(&config)?;

    println!();
    for (step, on) in wiring.collaborators.summary() {
        println!("  {:<18} {}", step, if on { "enabled" } else { "disabled" });
    }
    println!();

    let keys = [
        ("OpenRouter", &config.openrouter.api_key_env),
        ("Google search", &config.google.api_key_env),
        ("Google engine id", &config.google.cse_id_env),
        ("FullEnrich", &config.fullenrich.api_key_env),
        ("Kaspr", &config.kaspr.api_key_env),
    ];
    for (service, var) in keys {
        let state = if resolve_secret(var).is_some() { "set" } else { "missing" };
        println!("  {service:<18} {var} ({state})");
    }
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!("config already exists at {}", path.display()));
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

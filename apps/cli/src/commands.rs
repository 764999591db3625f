//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docmigrate_core::{MigrateReport, PandocConverter, ProgressReporter};
use docmigrate_shared::{AppConfig, CONFIG_FILE_NAME, MigrateConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Generated paths listed in the summary before it is truncated.
const SUMMARY_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docmigrate: migrate reStructuredText docs to MDX.
#[derive(Parser)]
#[command(
    name = "docmigrate",
    version,
    about = "Migrate a reStructuredText documentation tree to MDX pages and navigation manifests.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert the source tree and write pages and manifests.
    Run(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `run`; each overrides the matching config value.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Root of the reStructuredText sources.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Root the MDX tree is written under.
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Route prefix for generated links (e.g. /docs/legacy).
    #[arg(long)]
    pub route_prefix: Option<String>,

    /// Converter executable (defaults to pandoc).
    #[arg(long)]
    pub converter: Option<String>,

    /// Config file to load instead of the default lookup.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a config file with defaults.
    Init {
        /// Where to write it.
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },
    /// Show resolved configuration.
    Show {
        /// Config file to load instead of the default lookup.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docmigrate=info",
        1 => "docmigrate=debug",
        _ => "docmigrate=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
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
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(&args),
        Command::Config { action } => match action {
            ConfigAction::Init { path } => cmd_config_init(&path),
            ConfigAction::Show { config } => cmd_config_show(config.as_deref()),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge CLI flags over the loaded config.
fn resolve_config(mut app: AppConfig, args: &RunArgs) -> MigrateConfig {
    if let Some(source) = &args.source {
        app.paths.source_root = source.to_string_lossy().into_owned();
    }
    if let Some(dest) = &args.dest {
        app.paths.dest_root = dest.to_string_lossy().into_owned();
    }
    if let Some(converter) = &args.converter {
        app.converter.command = converter.clone();
    }

    let config = MigrateConfig::from(&app);
    match &args.route_prefix {
        Some(prefix) => config.with_route_prefix(prefix),
        None => config,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_run(args: &RunArgs) -> Result<()> {
    let app = load_app_config(args.config.as_deref())?;
    let config = resolve_config(app, args);

    info!(
        source = %config.source_root.display(),
        dest = %config.dest_root.display(),
        route_prefix = %config.route_prefix,
        "starting migration"
    );

    let converter = PandocConverter::from_config(&config);
    match converter.version() {
        Ok(version) => info!(converter = %version, "converter found"),
        Err(e) => warn!(error = %e, "converter probe failed; every document may fail"),
    }

    let reporter = CliProgress::new();
    let report = docmigrate_core::migrate(&config, &converter, &reporter)?;

    print_summary(&report);

    if !report.is_success() {
        return Err(eyre!("{} item(s) failed to migrate", report.failures.len()));
    }
    Ok(())
}

fn print_summary(report: &MigrateReport) {
    println!("Generated:");
    for path in report.generated.iter().take(SUMMARY_LIMIT) {
        println!("{}", path.display());
    }
    if report.generated.len() > SUMMARY_LIMIT {
        println!("... and {} more", report.generated.len() - SUMMARY_LIMIT);
    }

    println!();
    println!("Generated pages: {}", report.generated.len());
    println!("Updated meta files: {}", report.manifests.len());
    println!("Time: {:.1}s", report.elapsed.as_secs_f64());

    if !report.failures.is_empty() {
        println!();
        println!("Failed:");
        for failure in &report.failures {
            println!("- {}: {}", failure.source.display(), failure.message);
        }
    }
}

fn cmd_config_init(path: &Path) -> Result<()> {
    let path = init_config(path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = load_app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_converted(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {path}"));
    }

    fn done(&self, _report: &MigrateReport) {
        self.spinner.finish_and_clear();
    }
}

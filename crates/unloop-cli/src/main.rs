mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use render::ListTab;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use unloop_collector::{NeynarClient, Orchestrator, Progress, ProgressSink};
use unloop_core::{
    profile_url, resolve_subject, StaticIdentity, SubjectId, SubjectSource, UnloopConfig,
};

#[derive(Parser)]
#[command(name = "unloop")]
#[command(about = "Unloop - Farcaster follow graph analyzer", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (pretty, table, json)
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true, env = "UNLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Table,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ViewMode {
    Dashboard,
    Lists,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch following and followers for an account and classify them.
    ///
    /// Ctrl-C cancels the running analysis; press it again to exit at once.
    Analyze {
        /// Account to analyze; falls back to the configured default subject
        #[arg(long, env = "UNLOOP_FID")]
        fid: Option<SubjectId>,

        /// Dashboard summary or classified lists
        #[arg(long, value_enum, default_value = "dashboard")]
        view: ViewMode,

        /// List shown in the lists view
        #[arg(long, value_enum, default_value = "not-following-back")]
        list: ListTab,

        /// Override the page ceiling per collection
        #[arg(long)]
        max_pages: Option<usize>,

        /// Print the session debug console after the run
        #[arg(long)]
        logs: bool,
    },

    /// Print the external profile link for a handle
    Open {
        /// Account handle, with or without a leading @
        handle: String,
    },

    /// Show the effective configuration (secrets are never printed)
    Config,
}

/// Spinner fed by orchestrator progress events.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new(visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.magenta} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }
}

impl ProgressSink for SpinnerProgress {
    fn on_progress(&self, progress: &Progress) {
        self.bar.set_message(progress.to_string());
    }
}

/// Conventional exit status for SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    CancelRun,
    Exit,
}

/// The first Ctrl-C cancels an active run; every other one exits.
#[derive(Debug, Default)]
struct InterruptHandler {
    cancelled: bool,
}

impl InterruptHandler {
    fn on_interrupt(&mut self, orchestrator: &Orchestrator) -> InterruptAction {
        if !self.cancelled && orchestrator.cancel() {
            self.cancelled = true;
            InterruptAction::CancelRun
        } else {
            InterruptAction::Exit
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "unloop=debug,unloop_core=debug,unloop_collector=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config =
        UnloopConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Analyze {
            fid,
            view,
            list,
            max_pages,
            logs,
        } => handle_analyze(config, cli.output, fid, view, list, max_pages, logs).await,
        Commands::Open { handle } => {
            println!("{}", profile_url(&handle));
            Ok(())
        }
        Commands::Config => handle_config(&config, cli.output),
    }
}

async fn handle_analyze(
    mut config: UnloopConfig,
    output: OutputFormat,
    fid: Option<SubjectId>,
    view: ViewMode,
    list: ListTab,
    max_pages: Option<usize>,
    show_logs: bool,
) -> Result<()> {
    if let Some(max_pages) = max_pages {
        config.collector.max_pages = max_pages;
    }
    config.validate()?;

    let fallback = config.default_subject_id()?;
    let (subject, source) = resolve_subject(&StaticIdentity(fid), fallback);
    match source {
        SubjectSource::Authenticated => info!("Analyzing FID {}", subject),
        SubjectSource::Fallback => info!(
            "No identity supplied; using default FID {}",
            subject
        ),
    }

    let client = NeynarClient::new(&config.api)?;
    let progress = Arc::new(SpinnerProgress::new(output != OutputFormat::Json));
    let orchestrator = Arc::new(
        Orchestrator::from_config(Arc::new(client), &config).with_progress(progress.clone()),
    );

    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            let mut interrupts = InterruptHandler::default();
            while tokio::signal::ctrl_c().await.is_ok() {
                match interrupts.on_interrupt(&orchestrator) {
                    InterruptAction::CancelRun => {
                        debug!("Interrupt received; cancelling analysis")
                    }
                    InterruptAction::Exit => std::process::exit(INTERRUPTED_EXIT_CODE),
                }
            }
        });
    }

    let run = orchestrator.analyze(subject).await;
    progress.bar.finish_and_clear();
    let run = run?;

    if output == OutputFormat::Json {
        return render::json(&run, orchestrator.log().entries());
    }

    render::header(&run);
    let failed = render::failure(&run);
    if !failed {
        match view {
            ViewMode::Dashboard => render::dashboard(&run),
            ViewMode::Lists => render::list(&run, list, output == OutputFormat::Table),
        }
    }
    if show_logs || failed {
        render::logs(&orchestrator.log().newest_first());
    }

    if failed {
        anyhow::bail!("analysis failed for FID {}", subject);
    }
    Ok(())
}

fn handle_config(config: &UnloopConfig, output: OutputFormat) -> Result<()> {
    let key_state = if config.api.api_key.is_some() {
        "set"
    } else {
        "missing"
    };

    if output == OutputFormat::Json {
        let mut value = serde_json::to_value(config)?;
        value["api"]["api_key"] = serde_json::Value::String(key_state.to_string());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Unloop configuration".bold());
    println!("  api.base_url          {}", config.api.base_url);
    println!("  api.api_key           {}", key_state);
    println!("  api.viewer_fid        {}", config.api.viewer_fid);
    println!("  api.timeout_secs      {}", config.api.timeout_secs);
    println!("  collector.page_size   {}", config.collector.page_size);
    println!("  collector.max_pages   {}", config.collector.max_pages);
    println!("  collector.page_delay  {}ms", config.collector.page_delay_ms);
    println!("  default_subject       {}", config.default_subject);
    println!("  recent_followers      {}", config.recent_followers);
    if let Some(path) = UnloopConfig::default_config_path() {
        println!("  user config file      {}", path.display());
    }
    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patrol::history::HealthStatus;
use patrol::{
    ConfigLoader, History, MemoryStore, Orchestrator, PatrolConfig, ReportArchive, SimulatedProbe,
    SuiteReport, create_provider,
};

#[derive(Parser)]
#[command(name = "patrol")]
#[command(version, about = "Autonomous QA orchestration and quality scoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, help = "Load configuration from this file only")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Patrol in the current directory
    Init,

    /// Run one suite by id
    Run {
        #[arg(help = "Suite id to run")]
        suite: String,
        #[arg(long, help = "Trigger name recorded on the report")]
        trigger: Option<String>,
    },

    /// Run every suite whose schedule matches a trigger
    Trigger {
        #[arg(help = "Trigger name (e.g. deploy, daily, pre_release)")]
        name: String,
        #[arg(long, help = "JSON metadata recorded on each report")]
        metadata: Option<String>,
    },

    /// List registered suites
    List,

    /// Show rolling-window trend analytics
    Trend {
        #[arg(long, short, help = "Window size override")]
        window: Option<usize>,
    },

    /// Show the health dashboard
    Dashboard,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize project configuration
    Init,
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mPatrol encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let load_config = || -> anyhow::Result<PatrolConfig> {
        match &cli.config {
            Some(path) => Ok(ConfigLoader::load_from_file(path)?),
            None => Ok(ConfigLoader::load()?),
        }
    };

    match &cli.command {
        Commands::Init => {
            let dir = ConfigLoader::init_project()?;
            println!("Initialized patrol project in {}", dir.display());
        }
        Commands::Run { suite, trigger } => {
            let config = load_config()?;
            let engine = Engine::assemble(&config)?;
            let trigger = trigger
                .clone()
                .unwrap_or_else(|| config.run.default_trigger.clone());
            let rt = Runtime::new()?;
            let report = rt.block_on(engine.orchestrator.run(suite, &trigger))?;
            engine.persist(&report, &config)?;
            print_report(&report);
        }
        Commands::Trigger { name, metadata } => {
            let config = load_config()?;
            let engine = Engine::assemble(&config)?;
            let meta = match metadata {
                Some(raw) => serde_json::from_str(raw)?,
                None => serde_json::Value::Null,
            };
            let rt = Runtime::new()?;
            let reports = rt.block_on(engine.orchestrator.run_triggered(name, meta));
            if reports.is_empty() {
                println!("No enabled suite matches trigger '{}'", name);
            }
            for report in &reports {
                engine.persist(report, &config)?;
                print_report(report);
                println!();
            }
        }
        Commands::List => {
            let config = load_config()?;
            let engine = Engine::assemble(&config)?;
            for suite in engine.orchestrator.suites() {
                let state = if suite.enabled {
                    style("enabled").green()
                } else {
                    style("disabled").red()
                };
                println!(
                    "{:<14} {:<28} {:<10} {:>2} agent(s)  {}",
                    style(&suite.id).bold(),
                    suite.name,
                    suite.schedule.frequency,
                    suite.agents.len(),
                    state
                );
            }
        }
        Commands::Trend { window } => {
            let config = load_config()?;
            let engine = Engine::assemble(&config)?;
            let trend = match window {
                Some(w) => engine.history.trend_over(*w),
                None => engine.history.trend(),
            };
            println!("{}", style("Trend").bold().underlined());
            println!("  Reports analyzed:  {}", trend.reports_analyzed);
            println!("  Avg success rate:  {:.1}%", trend.avg_success_rate);
            println!("  Avg quality:       {:.1}", trend.avg_quality_score);
            println!("  Avg accessibility: {:.1}", trend.avg_accessibility_score);
            println!("  Avg performance:   {:.1}", trend.avg_performance_score);
            println!("  Avg security:      {:.1}", trend.avg_security_score);
            println!("  Critical findings: {}", trend.total_critical_errors);
            println!("  Direction:         {:?}", trend.direction);
        }
        Commands::Dashboard => {
            let config = load_config()?;
            let engine = Engine::assemble(&config)?;
            let snapshot = engine.history.dashboard();
            let status = match snapshot.status {
                HealthStatus::Green => style("GREEN").green().bold(),
                HealthStatus::Yellow => style("YELLOW").yellow().bold(),
                HealthStatus::Red => style("RED").red().bold(),
            };
            println!("{} {}", style("Health:").bold(), status);
            match snapshot.last_run {
                Some(at) => println!("  Last run:   {}", at.to_rfc3339()),
                None => println!("  Last run:   never"),
            }
            if let Some(scores) = snapshot.latest_scores {
                println!(
                    "  Scores:     quality {} | a11y {} | perf {} | security {}",
                    scores.quality, scores.accessibility, scores.performance, scores.security
                );
                println!("  Success:    {:.1}%", snapshot.latest_success_rate);
                println!("  Alerts:     {}", snapshot.open_alerts);
            }
            if !snapshot.findings_by_kind.is_empty() {
                let parts: Vec<String> = snapshot
                    .findings_by_kind
                    .iter()
                    .map(|(kind, n)| format!("{} {}", kind, n))
                    .collect();
                println!("  Findings:   {}", parts.join(" | "));
            }
            println!(
                "  Trend:      {:?} over {} report(s)",
                snapshot.trend.direction, snapshot.trend.reports_analyzed
            );
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => ConfigLoader::show_config(*json)?,
            ConfigAction::Path => ConfigLoader::show_path(),
            ConfigAction::Init => {
                ConfigLoader::init_project()?;
                println!("Configuration initialized");
            }
        },
    }

    Ok(())
}

/// Everything a command needs, assembled from configuration
struct Engine {
    orchestrator: Orchestrator,
    history: Arc<History>,
    archive: Option<ReportArchive>,
}

impl Engine {
    fn assemble(config: &PatrolConfig) -> anyhow::Result<Self> {
        let provider = create_provider(&config.llm)?;
        let probe = SimulatedProbe::with_seed(config.run.probe_seed)
            .with_pass_rate(config.run.probe_pass_rate);

        let (archive, history) = if config.archive.enabled {
            let path = ConfigLoader::project_dir().join(&config.archive.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let archive = ReportArchive::open(&path)?;
            let history = Arc::new(History::from_archive(&archive, config.trends.window)?);
            (Some(archive), history)
        } else {
            (None, Arc::new(History::new(config.trends.window)))
        };

        let orchestrator = Orchestrator::new(Arc::new(MemoryStore::new()), provider, Arc::new(probe))
            .with_history(history.clone())
            .with_alert_config(config.alerts.clone())
            .with_agent_timeout(Duration::from_secs(config.run.agent_timeout_secs))
            .with_builtin_suites();

        Ok(Self {
            orchestrator,
            history,
            archive,
        })
    }

    fn persist(&self, report: &SuiteReport, config: &PatrolConfig) -> anyhow::Result<()> {
        if let Some(archive) = &self.archive {
            archive.save(report)?;
            archive.prune_to(config.archive.retention)?;
        }
        Ok(())
    }
}

fn print_report(report: &SuiteReport) {
    println!(
        "{} {} ({} trigger, {:.1}s)",
        style("Suite:").bold(),
        report.suite_id,
        report.trigger,
        report.duration.as_secs_f64()
    );
    println!(
        "  Runs:     {}/{} passed ({:.1}%)",
        report.summary.passed_runs, report.summary.total_runs, report.summary.success_rate
    );
    println!(
        "  Findings: {} ({} critical, {} high, {} medium, {} low)",
        report.summary.total_findings,
        report.summary.critical_errors,
        report.summary.high_errors,
        report.summary.medium_errors,
        report.summary.low_errors
    );
    println!(
        "  Scores:   quality {} | a11y {} | perf {} | security {}",
        report.scores.quality,
        report.scores.accessibility,
        report.scores.performance,
        report.scores.security
    );

    for alert in &report.alerts {
        println!("  {} [{}] {}", style("ALERT").red().bold(), alert.code, alert.message);
    }

    if !report.recommendations.is_empty() {
        println!("  {}", style("Recommendations:").bold());
        for rec in &report.recommendations {
            println!("    [{}] {}", rec.priority, rec.title);
        }
    }
}

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use ln_core::cleanup::{cleanup_stored, cutoff};
use ln_core::config::Config;
use ln_core::scheduler::Scheduler;
use ln_core::Repository;
use ln_inference::{create_classifier, KeywordClassifier, SeoAnalyzer};
use ln_sources::{
    build_sources, handle_command, init_logging, load_definitions, BackgroundTasks, ContentSource,
    Fetcher, Ingestor, SourceArgs,
};
use ln_web::{catalog, create_app, AppState};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(60),
        'h' => Some(3_600),
        'd' => Some(86_400),
        _ => None,
    }
}

impl FromStr for HumanDuration {
    type Err = String;

    /// Accepts `90`, `45s`, `30m`, `1h15m`, `1d`. A trailing bare number counts as seconds.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err("Duration must include a number".to_string());
        }

        let too_long = || format!("Duration '{}' is too long", s.trim());
        let mut rest = compact.as_str();
        let mut total: u64 = 0;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("Expected a number before '{}'", rest));
            }
            let amount: u64 = rest[..digits].parse().map_err(|_| too_long())?;
            let mut tail = rest[digits..].chars();
            let multiplier = match tail.next() {
                None => 1,
                Some(unit) => {
                    unit_seconds(unit).ok_or_else(|| format!("Invalid duration unit: {}", unit))?
                }
            };
            total = amount
                .checked_mul(multiplier)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(too_long)?;
            rest = tail.as_str();
        }

        if total == 0 {
            return Err("Duration must be longer than zero".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

#[derive(Parser, Debug)]
#[command(name = "localnews", author, version, about = "Local news site: public API, admin console and importers")]
struct Cli {
    /// Storage backend: memory, file or sqlite
    #[arg(long, env = "LN_STORAGE", default_value = "file")]
    storage: String,
    /// Backend location; defaults to ./data for file and sqlite://localnews.db for sqlite
    #[arg(long, env = "LN_DATA_URL")]
    data_url: Option<String>,
    /// JSON file listing the external sources to import from
    #[arg(long, env = "LN_SOURCES")]
    sources: Option<PathBuf>,
    /// Classifier to tag articles with: keyword or fixed:<category>
    #[arg(long, env = "LN_CLASSIFIER")]
    classifier: Option<String>,
    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API with the scheduler and auto-import pollers
    Serve {
        #[arg(long, env = "LN_BIND", default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
        /// How often due scheduled stories are published (e.g. 30s, 1m)
        #[arg(long)]
        schedule_every: Option<HumanDuration>,
        /// How often the auto-import settings are checked
        #[arg(long)]
        import_tick: Option<HumanDuration>,
    },
    /// Inspect and fetch external sources
    Sources(SourceArgs),
    /// Run import cycles, once or periodically until interrupted
    Import {
        /// Repeat with this interval (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        every: Option<HumanDuration>,
    },
    /// Scheduled stories
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommands,
    },
    /// Print the category the classifier picks for some text
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// SEO report for a published article, by id or slug
    Seo { article: String },
    /// Remove stored stories and imported items older than N days
    Cleanup {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ScheduleCommands {
    /// List pending stories
    List,
    /// Publish everything that is due now
    Check,
}

fn load_sources(path: Option<&Path>) -> anyhow::Result<Vec<Arc<dyn ContentSource>>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let definitions =
        load_definitions(path).with_context(|| format!("reading sources from {}", path.display()))?;
    let sources = build_sources(&definitions)?;
    info!(
        "🦗 Sources loaded: {}",
        sources.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
    );
    Ok(sources)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Could not listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("🛑 Shutdown requested");
}

async fn serve(
    ingestor: Arc<Ingestor>,
    config: Config,
    bind: SocketAddr,
) -> anyhow::Result<()> {
    let mut tasks = BackgroundTasks::new();
    tasks.start_scheduler(Scheduler::new(ingestor.repo().clone()), config.schedule_check_interval);
    tasks.start_auto_import(ingestor.clone(), config.import_tick_interval);

    let app = create_app(AppState::new(ingestor, config)).await;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    info!("🌐 Listening on http://{}", listener.local_addr()?);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    tasks.stop().await;
    served.context("HTTP server failed")
}

async fn import_loop(ingestor: &Ingestor, every: Duration) {
    info!("Running in periodic mode every {}s", every.as_secs());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            result = ingestor.run_cycle(Utc::now()) => {
                if let Err(e) = result {
                    error!("Import cycle failed: {}", e);
                }
            }
        }
        info!("Waiting {}s before next import", every.as_secs());
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(every) => {}
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let mut config = Config::from_env();
    if let Some(classifier) = &cli.classifier {
        config.classifier = classifier.clone();
    }

    let store = ln_storage::create_storage(&cli.storage, cli.data_url.as_deref()).await?;
    let repo = Repository::new(store);
    let classifier = create_classifier(&config.classifier)?;
    info!("🧠 Classifier: {}", classifier.name());

    let fetcher = Fetcher::new(&config)?;
    let ingestor = Arc::new(
        Ingestor::new(repo.clone(), classifier.clone(), fetcher)
            .with_sources(load_sources(cli.sources.as_deref())?)
            .with_max_imported(config.max_imported),
    );

    match cli.command {
        Commands::Serve {
            bind,
            schedule_every,
            import_tick,
        } => {
            if let Some(every) = schedule_every {
                config.schedule_check_interval = every.0;
            }
            if let Some(tick) = import_tick {
                config.import_tick_interval = tick.0;
            }
            serve(ingestor, config, bind).await?;
        }
        Commands::Sources(args) => handle_command(args, &ingestor).await?,
        Commands::Import { every: None } => {
            let report = ingestor.run_cycle(Utc::now()).await?;
            println!("📥 fetched {}, stored {}", report.fetched, report.stored);
        }
        Commands::Import { every: Some(every) } => import_loop(&ingestor, every.0).await,
        Commands::Schedule { command } => {
            let scheduler = Scheduler::new(repo.clone());
            match command {
                ScheduleCommands::List => {
                    for record in scheduler.list().await? {
                        println!(
                            "{}  {}  {}",
                            record.publish_at.format("%Y-%m-%d %H:%M"),
                            record.article.id,
                            record.article.title
                        );
                    }
                }
                ScheduleCommands::Check => {
                    let published = scheduler.check_due(Utc::now()).await?;
                    println!("🗓️ Published {} stories", published.len());
                    for article in published {
                        println!("  {}", article.title);
                    }
                }
            }
        }
        Commands::Classify { text } => {
            let text = text.join(" ");
            println!("{}", classifier.classify(&text));
            if classifier.name() == "keyword" {
                for (category, score) in KeywordClassifier::default().scores(&text) {
                    if score > 0 {
                        println!("  {:<14} {}", category.as_str(), score);
                    }
                }
            }
        }
        Commands::Seo { article } => {
            let all = catalog::published(&repo).await?;
            let found = all
                .iter()
                .find(|a| a.id == article || a.slug == article)
                .with_context(|| format!("no published article '{}'", article))?;
            let report = SeoAnalyzer::default().analyze(found);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Cleanup { days } => {
            anyhow::ensure!(days > 0, "--days must be at least 1");
            let report = cleanup_stored(&repo, cutoff(Utc::now(), days)?).await?;
            println!(
                "🧹 Removed {} stories and {} imported items",
                report.admin_removed, report.imported_removed
            );
        }
    }

    Ok(())
}

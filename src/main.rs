mod error;
mod extract;
mod fetch;
mod monitor;
mod notify;
mod settings;
mod state;
mod vocab;
mod watch;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use extract::Strategy;
use fetch::HttpSource;
use monitor::RunPlan;
use notify::{ConsoleNotifier, Notifier, TelegramNotifier};
use settings::Settings;
use state::ObservedState;

#[derive(Parser)]
#[command(name = "sheet_watch", about = "Watch product availability on a shared spreadsheet")]
struct Cli {
    /// Config file (default: ./sheet_watch.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the sheet once, notify about changes, save state
    Check {
        /// Print the message instead of sending it
        #[arg(long)]
        dry_run: bool,
        /// Extraction strategy
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
        /// State file
        #[arg(long)]
        state: Option<PathBuf>,
        /// Sheet URL (overrides SHEET_VIEW_URL)
        #[arg(long)]
        url: Option<String>,
    },
    /// Run the extractor on a local file (HTML, CSV or OCR text)
    Extract {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },
    /// Show the persisted statuses
    Status {
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Check { dry_run, strategy, state, url } => {
            if let Some(s) = strategy {
                settings.strategy = s;
            }
            if let Some(p) = state {
                settings.state_path = p;
            }
            if url.is_some() {
                settings.url = url;
            }
            check(&settings, dry_run).await?;
            println!("Done in {:.1}s", t0.elapsed().as_secs_f64());
            Ok(())
        }
        Commands::Extract { file, strategy } => {
            if let Some(s) = strategy {
                settings.strategy = s;
            }
            extract_file(&settings, &file)
        }
        Commands::Status { state } => {
            if let Some(p) = state {
                settings.state_path = p;
            }
            show_status(&settings)
        }
    }
}

async fn check(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    println!(
        "Checking for status changes at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let plan = RunPlan {
        watch: settings.watch_list()?,
        vocab: settings.vocabulary()?,
        strategy: settings.strategy,
        options: settings.extract_options(),
        state_path: settings.state_path.clone(),
        hold_on_fetch_failure: settings.hold_on_fetch_failure,
    };
    let source = HttpSource::new(
        settings.require_url()?,
        settings.csv_url.as_deref(),
        &settings.user_agent,
        settings.timeout(),
        settings.snapshot_path.clone(),
        &settings.ocr_command,
    )?;

    let notifier: Box<dyn Notifier> = match (dry_run, settings.telegram()) {
        (false, Some((token, chat_id))) => {
            let client = reqwest::Client::builder()
                .timeout(settings.timeout())
                .build()
                .context("Failed to build HTTP client")?;
            Box::new(TelegramNotifier::new(client, token, chat_id))
        }
        (false, None) => {
            warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, printing changes instead");
            Box::new(ConsoleNotifier)
        }
        (true, _) => Box::new(ConsoleNotifier),
    };

    info!("Strategy: {}, state: {:?}", plan.strategy, plan.state_path);
    let report = monitor::run_once(&plan, &source, notifier.as_ref()).await;
    report.print();
    Ok(())
}

fn extract_file(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let watch = settings.watch_list()?;
    let vocab = settings.vocabulary()?;
    let detected = extract::extract(
        &content,
        &watch,
        settings.strategy,
        &settings.extract_options(),
        &vocab,
    );

    println!("Strategy: {}", settings.strategy);
    for item in watch.iter() {
        let status = detected.get(&item.key).cloned().flatten();
        println!(
            "  {:<6} {:<28} {} {}",
            item.key,
            truncate(&item.product, 28),
            vocab.symbol(status.as_deref()),
            status.as_deref().unwrap_or("not found"),
        );
    }
    Ok(())
}

fn show_status(settings: &Settings) -> anyhow::Result<()> {
    let watch = settings.watch_list()?;
    let vocab = settings.vocabulary()?;
    let state = ObservedState::try_load(&settings.state_path)?;
    let Some(state) = state else {
        println!("No state yet at {:?}. Run 'check' first.", settings.state_path);
        return Ok(());
    };

    println!("{:<6} | {:<28} | {}", "Cell", "Product", "Status");
    println!("{}", "-".repeat(52));
    for item in watch.iter() {
        let status = state.get(&item.key);
        let shown = match (state.contains(&item.key), status) {
            (_, Some(s)) => format!("{} {}", vocab.symbol(Some(s)), s),
            (true, None) => "-".to_string(),
            (false, None) => "(never checked)".to_string(),
        };
        println!("{:<6} | {:<28} | {}", item.key, truncate(&item.product, 28), shown);
    }

    let unwatched: Vec<_> = state.iter().filter(|(k, _)| watch.product(k).is_none()).collect();
    if !unwatched.is_empty() {
        println!("\n--- No longer watched ---");
        for (key, status) in unwatched {
            println!("  {}: {}", key, status.unwrap_or("-"));
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

//! Deck MIDI - drive MIDI outputs from control-surface buttons and dials
//!
//! Loads a deck profile, builds its controls and feeds them gestures typed
//! at the prompt, standing in for the host application.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deck_midi::actions::Gesture;
use deck_midi::cli::{self, Command};
use deck_midi::config::DeckProfile;
use deck_midi::deck::Deck;
use deck_midi::dispatcher::Dispatcher;
use deck_midi::paths::AppPaths;
use deck_midi::registry::PortRegistry;
use deck_midi::settings::SettingsFile;
use deck_midi::transport::{MidirTransport, Transport, VirtualTransport};

/// Deck MIDI - send MIDI from buttons and dials
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the deck profile (defaults to the app data directory)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Path to the persisted settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write daily log files to the logs directory
    #[arg(long)]
    log_file: bool,

    /// Emit JSON log lines
    #[arg(long)]
    log_json: bool,

    /// List available MIDI outputs
    #[arg(long)]
    list_ports: bool,

    /// Use an in-memory output with this name instead of real devices (repeatable)
    #[arg(long = "virtual", value_name = "NAME")]
    virtual_ports: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();

    let _log_guard = init_logging(&args, &paths)?;

    let transport: Arc<dyn Transport> = if args.virtual_ports.is_empty() {
        Arc::new(MidirTransport::default())
    } else {
        info!("Using virtual outputs: {}", args.virtual_ports.join(", "));
        Arc::new(VirtualTransport::new(args.virtual_ports.iter().cloned()))
    };
    let registry = Arc::new(PortRegistry::new(transport));

    if args.list_ports {
        cli::print_ports(&registry.list_destinations());
        return Ok(());
    }

    let profile_path = args.profile.clone().unwrap_or_else(|| paths.profile.clone());
    let settings_path = args.settings.clone().unwrap_or_else(|| paths.settings.clone());

    info!("Starting Deck MIDI...");
    info!("Profile: {}", profile_path.display());
    info!("Settings: {}", settings_path.display());

    let profile = DeckProfile::load(&profile_path).await?;
    let settings = SettingsFile::load(&settings_path);
    let mut deck = Deck::from_profile(&profile, Dispatcher::new(registry), settings)?;

    run_app(&mut deck, shutdown_signal()).await?;

    deck.shutdown();
    info!("Deck MIDI shutdown complete");
    Ok(())
}

async fn run_app(deck: &mut Deck, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
    let mut lines = cli::spawn_repl()?;
    cli::print_controls(deck, None);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else {
                    info!("Input closed, stopping");
                    break;
                };

                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => run_command(deck, command),
                    Err(e) => println!("{} (try 'help')", e),
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    Ok(())
}

fn run_command(deck: &mut Deck, command: Command) {
    match command {
        Command::Gesture { id, gesture } => apply(deck, &id, &[gesture]),
        Command::Tap(id) => apply(deck, &id, &[Gesture::Press, Gesture::Release]),
        Command::Show(id) => cli::print_controls(deck, id.as_deref()),
        Command::Ports => cli::print_ports(&deck.dispatcher().registry().list_destinations()),
        Command::Help => cli::print_help(),
        Command::Quit => {}
    }
}

fn apply(deck: &mut Deck, id: &str, gestures: &[Gesture]) {
    for gesture in gestures {
        match deck.gesture(id, *gesture) {
            Ok(outcome) if outcome.is_error() => {
                warn!("Control '{}' failed: {:?}", id, outcome.error);
            }
            Ok(_) => {}
            Err(e) => {
                println!("{}", e);
                return;
            }
        }
    }
    cli::print_controls(deck, Some(id));
}

fn init_logging(args: &Args, paths: &AppPaths) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));

    let (file_layer, guard) = if args.log_file {
        paths.ensure_logs_dir()?;
        let appender = tracing_appender::rolling::daily(&paths.logs_dir, "deck-midi.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let (text_layer, json_layer) = if args.log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            ),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

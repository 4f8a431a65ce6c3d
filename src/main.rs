use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use clap::Parser;
use log::{error, info, warn};

use queuesplice::cli::{print_report, run_session, select_device, Console};
use queuesplice::config::{AppConfig, DEFAULT_CONFIG_FILE};
use queuesplice::helpers::http_client::new_http_client;
use queuesplice::helpers::spotify::SpotifyClient;
use queuesplice::logging::initialize_logging_with_args;
use queuesplice::queue::{InMemoryQueue, QueueProvider, TrackSearch};

/// Insert songs into the playing Spotify queue at a time offset from now
#[derive(Parser, Debug)]
#[command(name = "queuesplice", author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Playback device to use, by id or name
    #[arg(long, value_name = "NAME|ID")]
    device: Option<String>,

    /// Rehearse against a queue loaded from a JSON file instead of Spotify
    #[arg(long, value_name = "FILE")]
    simulate: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = initialize_logging_with_args(&config.logging, args.verbose, args.debug) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    // First Ctrl+C stops the session, a second one exits at once
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if r.swap(false, Ordering::SeqCst) {
            eprintln!("\nInterrupted, press Ctrl+C again to quit");
        } else {
            std::process::exit(130);
        }
    }) {
        warn!("Error setting Ctrl+C handler: {}", e);
    }

    match &args.simulate {
        Some(path) => match InMemoryQueue::from_json_file(path) {
            Ok(queue) => {
                println!("Simulating with queue from {}", path.display());
                run(&queue, &args, &config, running)
            }
            Err(e) => {
                error!("Failed to load simulated queue: {}", e);
                eprintln!("Failed to load simulated queue: {}", e);
                ExitCode::FAILURE
            }
        },
        None => {
            let http = new_http_client(config.http.timeout_secs);
            let spotify = match SpotifyClient::new(config.spotify(), http) {
                Ok(client) => client,
                Err(e) => {
                    eprintln!("Spotify is not configured: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            match spotify.current_user() {
                Ok(user) => println!("Hello, {}!", user.display_name.as_deref().unwrap_or(&user.id)),
                Err(e) => {
                    error!("Failed to fetch Spotify profile: {}", e);
                    eprintln!("Could not connect to Spotify: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            run(&spotify, &args, &config, running)
        }
    }
}

fn run<P: QueueProvider + TrackSearch>(provider: &P, args: &Args, config: &AppConfig, running: Arc<AtomicBool>) -> ExitCode {
    let mut console = Console::stdio();

    let device = match select_device(provider, &mut console, args.device.as_deref()) {
        Ok(Some(device)) => device,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("Using device {} ({})", device.name, device.id);

    match run_session(provider, provider, &mut console, &device.id, config.retry.clone(), running) {
        Ok(Some(report)) => {
            if let Err(e) = print_report(&mut console, &report) {
                warn!("Failed to print report: {}", e);
            }
            if report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Session failed: {}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

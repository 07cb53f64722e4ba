//! Hotmic - a hot-microphone transcription loop.
//!
//! Captures one utterance at a time from the default microphone, transcribes
//! it offline using Whisper with Silero VAD for utterance detection, and
//! prints the result. With --play-sounds every notification is also spoken
//! through Kokoro TTS. Runs until interrupted with Ctrl+C.

mod app;
mod audio;
mod config;
mod notify;
mod stt;
mod tts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use config::AppConfig;
use notify::Notifier;
use stt::{Listener, Recognizer};

/// Resolve on Ctrl+C or SIGTERM, then raise the shutdown flag.
async fn wait_for_shutdown(shutdown: Arc<AtomicBool>) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown.store(true, Ordering::SeqCst);
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_args();

    // Initialize logging with time-only format.
    // Respect RUST_LOG env var, fallback to verbose flag, default to info.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .unwrap();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("Hotmic v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        error!("Run 'scripts/setup.sh' to download required models.");
        std::process::exit(1);
    }

    config.log_config();

    let shutdown = Arc::new(AtomicBool::new(false));

    // cpal streams and the sherpa models are not Send, so the whole
    // sequential session lives on one blocking thread.
    let worker_shutdown = shutdown.clone();
    let mut worker = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut listener = Listener::new(&config)?;
        let mut recognizer = Recognizer::new(&config)?;
        let mut notifier = Notifier::new(&config)?;
        app::run(&mut listener, &mut recognizer, &mut notifier, &worker_shutdown)
    });

    tokio::select! {
        result = &mut worker => {
            // The session only ends on its own by failing.
            result??;
            return Ok(());
        }
        _ = wait_for_shutdown(shutdown.clone()) => {}
    }

    // The flag is raised; the session notices at the next loop boundary,
    // emits its stopping notification, and returns.
    worker.await??;

    info!("Hotmic stopped");
    Ok(())
}

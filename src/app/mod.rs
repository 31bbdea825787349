use crate::api::ApiServer;
use crate::config::Config;
use crate::recorder::{RecordingEvent, RecordingManager};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone)]
pub struct ServiceOptions {
    pub config_path: Option<PathBuf>,
    pub port: Option<u16>,
}

pub async fn run_service(options: ServiceOptions) -> Result<()> {
    info!("Starting stream-recorder service");

    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = options.port {
        config.server.port = port;
    }

    let settings = config.recorder.settings()?;
    let shutdown_grace = config.recorder.shutdown_grace();
    check_capture_program(&settings.program);
    info!("Recordings will be written to {:?}", settings.recording_dir);

    let manager = Arc::new(RecordingManager::new(settings));
    spawn_event_logger(&manager);

    let api_server = ApiServer::new(Arc::clone(&manager), &config.server);
    api_server.start(shutdown_signal()).await?;

    // Returning drops the runtime, which kills any capture process still alive.
    let stopped = manager.stop_all(shutdown_grace).await;
    info!("Shutdown complete, stopped {} recording(s)", stopped);

    Ok(())
}

fn check_capture_program(program: &str) {
    match which::which(program) {
        Ok(path) => info!("Using capture program {:?}", path),
        Err(_) => warn!(
            "Capture program '{}' not found in PATH; recordings will fail to start",
            program
        ),
    }
}

/// Keeps a debug trail of lifecycle events. The manager logs the outcomes
/// that matter itself.
fn spawn_event_logger(manager: &RecordingManager) {
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RecordingEvent::Started(info)) => {
                    debug!("event: started {}/{} ({})", info.platform, info.channel, info.id)
                }
                Ok(RecordingEvent::Stopped(info)) => {
                    debug!("event: stopped {}/{} ({})", info.platform, info.channel, info.id)
                }
                Ok(RecordingEvent::Ended { info, outcome }) => debug!(
                    "event: ended {}/{} ({}): {}",
                    info.platform, info.channel, info.id, outcome
                ),
                Ok(RecordingEvent::Orphaned { info, error }) => debug!(
                    "event: orphaned {}/{} ({}): {}",
                    info.platform, info.channel, info.id, error
                ),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("event logger skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

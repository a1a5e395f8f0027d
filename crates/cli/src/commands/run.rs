//! `run` command implementation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use config_loader::{properties, ConfigLoader};
use contracts::ListenerBlueprint;
use dispatcher::DispatcherBuilder;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::replay::{EventSource, Replay};

/// Execute the `run` command
pub async fn run_replay(args: &RunArgs) -> Result<()> {
    let blueprint = effective_blueprint(args)?;

    info!(
        processor = %blueprint.processor.name,
        kind = ?blueprint.processor.kind,
        queue_capacity = blueprint.dispatch.queue_capacity,
        worker_threads = blueprint.dispatch.worker_threads,
        wait_timeout_s = blueprint.dispatch.wait_timeout_s,
        shutdown_grace_s = blueprint.dispatch.shutdown_grace_s,
        inline = args.inline,
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let dispatcher = Arc::new(
        DispatcherBuilder::new(blueprint.dispatch, blueprint.processor)
            .inline(args.inline)
            .build()
            .context("Failed to create dispatcher")?,
    );

    let source = EventSource::open(&args.events)?;
    let stop = Arc::new(AtomicBool::new(false));
    let replay = Replay::new(dispatcher, source, Arc::clone(&stop));

    info!(events = %args.events.display(), "Starting replay...");

    // The source is synchronous; keep it off the async workers.
    let mut handle = tokio::task::spawn_blocking(move || replay.run());
    let shutdown_signal = setup_shutdown_signal();
    tokio::pin!(shutdown_signal);

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = &mut shutdown_signal => {
            warn!("Received shutdown signal, delivering terminal event...");
            stop.store(true, Ordering::Release);
            handle.await
        }
    };

    let stats = joined
        .map_err(|e| CliError::replay(e.to_string()))?
        .context("Replay failed")?;
    stats.print_summary();

    info!("Lineage Dispatch finished");
    Ok(())
}

/// Load the configuration file (or defaults) and apply overrides
///
/// Host properties are applied before CLI flags, so flags win.
fn effective_blueprint(args: &RunArgs) -> Result<ListenerBlueprint> {
    let mut blueprint = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            info!("No configuration file given, using defaults");
            ListenerBlueprint::default()
        }
    };

    if let Some(path) = &args.properties {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read properties from {}", path.display()))?;
        let props = properties::parse_lines(&content)?;
        let applied = ConfigLoader::apply_properties(&mut blueprint, &props)
            .with_context(|| format!("Invalid host properties in {}", path.display()))?;
        info!(applied = applied, "Host properties applied");
    }

    let dispatch = &mut blueprint.dispatch;
    if let Some(capacity) = args.queue_capacity {
        info!(queue_capacity = capacity, "Overriding queue capacity from CLI");
        dispatch.queue_capacity = capacity;
    }
    if let Some(threads) = args.worker_threads {
        info!(worker_threads = threads, "Overriding worker threads from CLI");
        dispatch.worker_threads = threads;
    }
    if let Some(timeout) = args.wait_timeout {
        info!(wait_timeout_s = timeout, "Overriding wait timeout from CLI");
        dispatch.wait_timeout_s = timeout;
    }
    if let Some(grace) = args.shutdown_grace {
        info!(shutdown_grace_s = grace, "Overriding shutdown grace from CLI");
        dispatch.shutdown_grace_s = grace;
    }

    ConfigLoader::validate(&blueprint).context("Invalid configuration after overrides")?;
    Ok(blueprint)
}

fn load_config(path: &Path) -> Result<ListenerBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never resolves.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            events: PathBuf::from("-"),
            properties: None,
            inline: false,
            queue_capacity: None,
            worker_threads: None,
            wait_timeout: None,
            shutdown_grace: None,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let blueprint = effective_blueprint(&args()).unwrap();
        assert_eq!(blueprint, ListenerBlueprint::default());
    }

    #[test]
    fn test_flags_override_properties() {
        let mut props = NamedTempFile::new().unwrap();
        writeln!(props, "lineage.async.queueSize=50").unwrap();
        writeln!(props, "lineage.async.threadCount=3").unwrap();

        let mut args = args();
        args.properties = Some(props.path().to_path_buf());
        args.worker_threads = Some(5);

        let blueprint = effective_blueprint(&args).unwrap();
        assert_eq!(blueprint.dispatch.queue_capacity, 50);
        assert_eq!(blueprint.dispatch.worker_threads, 5);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut args = args();
        args.queue_capacity = Some(0);
        assert!(effective_blueprint(&args).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let mut args = args();
        args.config = Some(PathBuf::from("/nonexistent/listener.toml"));
        let err = effective_blueprint(&args).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}

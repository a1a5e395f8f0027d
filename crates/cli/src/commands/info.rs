//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{EventKind, ListenerBlueprint, TimeoutPolicy};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatch: DispatchInfo,
    processor: ProcessorInfo,
}

#[derive(Serialize)]
struct DispatchInfo {
    queue_capacity: usize,
    worker_threads: usize,
    wait_timeout_s: f64,
    shutdown_grace_s: f64,
    thread_name_prefix: String,
    timeout_accounting: HashMap<&'static str, TimeoutPolicy>,
}

#[derive(Serialize)]
struct ProcessorInfo {
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

const ACCOUNTED_KINDS: [EventKind; 3] = [EventKind::JobStart, EventKind::JobEnd, EventKind::Other];

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn build_config_info(blueprint: &ListenerBlueprint) -> ConfigInfo {
    let dispatch = &blueprint.dispatch;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        dispatch: DispatchInfo {
            queue_capacity: dispatch.queue_capacity,
            worker_threads: dispatch.worker_threads,
            wait_timeout_s: dispatch.wait_timeout_s,
            shutdown_grace_s: dispatch.shutdown_grace_s,
            thread_name_prefix: dispatch.thread_name_prefix.clone(),
            timeout_accounting: ACCOUNTED_KINDS
                .into_iter()
                .map(|kind| (kind.as_str(), dispatch.timeout_accounting.policy(kind)))
                .collect(),
        },
        processor: ProcessorInfo {
            name: blueprint.processor.name.clone(),
            kind: format!("{:?}", blueprint.processor.kind),
            params: blueprint.processor.params.clone(),
        },
    }
}

fn print_config_info(blueprint: &ListenerBlueprint) {
    let dispatch = &blueprint.dispatch;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Lineage Dispatch Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Dispatch");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Queue capacity: {}", dispatch.queue_capacity);
    println!(
        "   ├─ Worker threads: {} ({}-N)",
        dispatch.worker_threads, dispatch.thread_name_prefix
    );
    println!("   ├─ Wait timeout: {}s", dispatch.wait_timeout_s);
    println!("   ├─ Shutdown grace: {}s", dispatch.shutdown_grace_s);
    println!("   └─ Timeout accounting:");
    for (i, kind) in ACCOUNTED_KINDS.iter().enumerate() {
        let prefix = if i == ACCOUNTED_KINDS.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!(
            "        {} {}: {:?}",
            prefix,
            kind,
            dispatch.timeout_accounting.policy(*kind)
        );
    }

    let processor = &blueprint.processor;
    println!("\nProcessor");
    println!("   ├─ Name: {}", processor.name);
    if processor.params.is_empty() {
        println!("   └─ Kind: {:?}", processor.kind);
    } else {
        println!("   ├─ Kind: {:?}", processor.kind);
        let mut params: Vec<_> = processor.params.iter().collect();
        params.sort();
        println!("   └─ Params:");
        for (key, value) in params {
            println!("        - {} = {}", key, value);
        }
    }

    println!();
}

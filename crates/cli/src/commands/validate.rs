//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{EventKind, ListenerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    processor: String,
    processor_kind: String,
    queue_capacity: usize,
    worker_threads: usize,
    wait_timeout_s: f64,
    shutdown_grace_s: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let dispatch = &blueprint.dispatch;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    processor: blueprint.processor.name.clone(),
                    processor_kind: format!("{:?}", blueprint.processor.kind),
                    queue_capacity: dispatch.queue_capacity,
                    worker_threads: dispatch.worker_threads,
                    wait_timeout_s: dispatch.wait_timeout_s,
                    shutdown_grace_s: dispatch.shutdown_grace_s,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &ListenerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let dispatch = &blueprint.dispatch;

    if dispatch.wait_timeout_s == 0.0 {
        warnings.push(
            "dispatch.wait_timeout_s is 0 - every pooled event will report a timeout".to_string(),
        );
    }

    if dispatch.shutdown_grace_s == 0.0 {
        warnings.push(
            "dispatch.shutdown_grace_s is 0 - queued events are cancelled at shutdown".to_string(),
        );
    }

    if dispatch.queue_capacity < dispatch.worker_threads {
        warnings.push(format!(
            "dispatch.queue_capacity ({}) is smaller than worker_threads ({})",
            dispatch.queue_capacity, dispatch.worker_threads
        ));
    }

    let ignored: Vec<_> = [EventKind::JobStart, EventKind::JobEnd, EventKind::Other]
        .into_iter()
        .filter(|kind| !dispatch.timeout_accounting.counts(*kind))
        .map(EventKind::as_str)
        .collect();
    if !ignored.is_empty() {
        warnings.push(format!(
            "timeouts are not counted for: {}",
            ignored.join(", ")
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Processor: {} ({})",
                summary.processor, summary.processor_kind
            );
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Worker threads: {}", summary.worker_threads);
            println!("  Wait timeout: {}s", summary.wait_timeout_s);
            println!("  Shutdown grace: {}s", summary.shutdown_grace_s);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

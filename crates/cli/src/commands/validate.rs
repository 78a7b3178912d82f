//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ForwarderConfig, StoreKind};
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
    /// Resolved configuration, present with `--emit`
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    url: String,
    transport: String,
    store_kind: String,
    backoff_initial_ms: u64,
    backoff_ceiling_ms: u64,
    chunk_size: usize,
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
            resolved: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let resolved = match args.emit {
                Some(output) => {
                    match config_loader::ConfigLoader::serialize(&config, output.into()) {
                        Ok(text) => Some(text),
                        Err(e) => {
                            return ValidationResult {
                                valid: false,
                                config_path,
                                error: Some(e.to_string()),
                                warnings: None,
                                summary: None,
                                resolved: None,
                            };
                        }
                    }
                }
                None => None,
            };
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    url: config.store.url.to_string(),
                    transport: config.store.url.scheme().to_string(),
                    store_kind: format!("{:?}", config.store.kind),
                    backoff_initial_ms: config.dispatcher.backoff_initial_ms,
                    backoff_ceiling_ms: config.dispatcher.backoff_ceiling_ms,
                    chunk_size: config.dispatcher.chunk_size,
                }),
                resolved,
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
            resolved: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ForwarderConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.store.kind == StoreKind::Log {
        warnings.push("store.kind is 'log' - commands are logged, not stored".to_string());
    }

    if config.self_metrics.interval().is_none() {
        warnings.push("self_metrics.interval_secs is 0 - periodic reporting disabled".to_string());
    }

    if config.dispatcher.channel_capacity > 1 {
        warnings.push(format!(
            "dispatcher.channel_capacity is {} - batches may queue up ahead of the dispatch loop",
            config.dispatcher.channel_capacity
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Store: {} ({})", summary.url, summary.store_kind);
            println!("  Transport: {}", summary.transport);
            println!(
                "  Backoff: {}ms .. {}ms",
                summary.backoff_initial_ms, summary.backoff_ceiling_ms
            );
            println!("  Chunk size: {}", summary.chunk_size);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }

        if let Some(ref resolved) = result.resolved {
            println!("\n{}", resolved);
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigOutput;
    use std::path::PathBuf;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forwarder.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_valid_config_summary() {
        let (_dir, path) = write_config(
            r#"
[store]
url = "https://atsd.example.com:8443"
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: path,
            json: true,
            emit: None,
        });

        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.transport, "https");
        assert_eq!(summary.chunk_size, 100);
        // Default log store is flagged
        assert!(result.warnings.unwrap().iter().any(|w| w.contains("'log'")));
    }

    #[test]
    fn test_invalid_backoff_rejected() {
        let (_dir, path) = write_config(
            r#"
[store]
url = "https://atsd.example.com"

[dispatcher]
backoff_initial_ms = 5000
backoff_ceiling_ms = 100
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: path,
            json: false,
            emit: None,
        });

        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_emit_resolved_config_with_defaults() {
        let (_dir, path) = write_config(
            r#"
[store]
url = "https://atsd.example.com:8443"
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: path,
            json: true,
            emit: Some(ConfigOutput::Json),
        });

        assert!(result.valid);
        let resolved: serde_json::Value = serde_json::from_str(&result.resolved.unwrap()).unwrap();
        assert_eq!(resolved["dispatcher"]["backoff_initial_ms"], 100);
        assert_eq!(resolved["dispatcher"]["chunk_size"], 100);
    }

    #[test]
    fn test_emit_toml_reloads() {
        let (dir, path) = write_config(
            r#"
[store]
url = "https://atsd.example.com:8443"

[dispatcher]
chunk_size = 25
"#,
        );
        let result = validate_config(&ValidateArgs {
            config: path,
            json: false,
            emit: Some(ConfigOutput::Toml),
        });

        let reloaded_path = dir.path().join("resolved.toml");
        std::fs::write(&reloaded_path, result.resolved.unwrap()).unwrap();
        let reloaded = config_loader::ConfigLoader::load_from_path(&reloaded_path).unwrap();
        assert_eq!(reloaded.dispatcher.chunk_size, 25);
        assert_eq!(reloaded.store.url.host_str(), Some("atsd.example.com"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/forwarder.toml"),
            json: false,
            emit: None,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}

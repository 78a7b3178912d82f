//! Config validation
//!
//! Rules:
//! - field ranges declared on the config types (capacities, backoff bounds)
//! - backoff_initial_ms <= backoff_ceiling_ms
//! - store url is hierarchical (has a scheme and an authority or path)
//! - file store has a `path` parameter

use contracts::{ContractError, ForwarderConfig, StoreKind};
use validator::Validate;

/// Validate a ForwarderConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ForwarderConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_backoff(config)?;
    validate_store(config)?;
    Ok(())
}

/// Declarative range checks
fn validate_fields(config: &ForwarderConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

fn validate_backoff(config: &ForwarderConfig) -> Result<(), ContractError> {
    let dispatcher = &config.dispatcher;
    if dispatcher.backoff_initial_ms > dispatcher.backoff_ceiling_ms {
        return Err(ContractError::config_validation(
            "dispatcher.backoff_initial_ms / dispatcher.backoff_ceiling_ms",
            format!(
                "backoff_initial_ms ({}) must be <= backoff_ceiling_ms ({})",
                dispatcher.backoff_initial_ms, dispatcher.backoff_ceiling_ms
            ),
        ));
    }
    Ok(())
}

fn validate_store(config: &ForwarderConfig) -> Result<(), ContractError> {
    let store = &config.store;

    if store.url.cannot_be_a_base() {
        return Err(ContractError::config_validation(
            "store.url",
            format!("url '{}' has no transport scheme authority", store.url),
        ));
    }

    if store.kind == StoreKind::File
        && store.params.get("path").is_none_or(|p| p.trim().is_empty())
    {
        return Err(ContractError::config_validation(
            "store.params.path",
            "file store requires a 'path' parameter",
        ));
    }

    Ok(())
}

//! Synchronous best-effort submission
//!
//! Writes each command kind directly with at most one attempt (two for
//! entities: update, then create). Store failures are logged and swallowed;
//! nothing is retried and no counter moves. Meant for flush paths that must
//! not block indefinitely.

use contracts::{EntityTagCommand, MessageCommand, PropertyCommand, SeriesCommand, StoreClient};
use tracing::{debug, error, instrument};

use crate::error::DispatcherError;
use crate::transform;

/// Write all kinds once, in order: entities, properties, series, messages
///
/// # Errors
/// Only `DispatcherError::Contract` when the series batch contains a command
/// without timestamp. That batch is skipped; the other kinds are still
/// written before the error is returned.
#[instrument(
    name = "prior_send_data",
    skip_all,
    fields(
        series = series.len(),
        entity_tags = entity_tags.len(),
        properties = properties.len(),
        messages = messages.len()
    )
)]
pub async fn prior_send_data<C: StoreClient + Sync>(
    client: &C,
    series: Vec<SeriesCommand>,
    entity_tags: Vec<EntityTagCommand>,
    properties: Vec<PropertyCommand>,
    messages: Vec<MessageCommand>,
) -> Result<(), DispatcherError> {
    for entity in transform::entity_tag_commands_to_entities(entity_tags) {
        if let Err(e) = client.update_entity(&entity).await {
            debug!(entity = %entity.name, error = %e, "Entity update failed, creating");
            if let Err(e) = client.create_entity(&entity).await {
                error!(entity = %entity.name, error = %e, "Could not prior send entity update");
            }
        }
    }

    if !properties.is_empty() {
        let properties = transform::property_commands_to_properties(properties);
        if let Err(e) = client.insert_properties(&properties).await {
            error!(count = properties.len(), error = %e, "Could not prior send properties");
        }
    }

    let mut rejected = None;
    if !series.is_empty() {
        match transform::series_commands_to_series(series) {
            Ok(series) => {
                if let Err(e) = client.insert_series(&series).await {
                    error!(count = series.len(), error = %e, "Could not prior send series");
                }
            }
            Err(e) => {
                error!(error = %e, "Rejected series batch");
                rejected = Some(e);
            }
        }
    }

    if !messages.is_empty() {
        let messages = transform::message_commands_to_messages(messages);
        if let Err(e) = client.insert_messages(&messages).await {
            error!(count = messages.len(), error = %e, "Could not prior send messages");
        }
    }

    match rejected {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{MockStoreClient, StoreOp};
    use chrono::{TimeZone, Utc};

    fn store() -> MockStoreClient {
        MockStoreClient::new("https://atsd.local".parse().unwrap())
    }

    #[tokio::test]
    async fn test_update_failure_falls_back_to_create_once() {
        let store = store().fail_always(StoreOp::UpdateEntity);

        let result = prior_send_data(
            &store,
            vec![],
            vec![EntityTagCommand::new("host1").with_tag("a", "1")],
            vec![],
            vec![],
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(store.calls(StoreOp::UpdateEntity), 1);
        assert_eq!(store.calls(StoreOp::CreateEntity), 1);
        let created = store.created_entities();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "host1");
    }

    #[tokio::test]
    async fn test_failures_swallowed_without_retry() {
        let store = store()
            .fail_always(StoreOp::UpdateEntity)
            .fail_always(StoreOp::CreateEntity)
            .fail_always(StoreOp::InsertProperties)
            .fail_always(StoreOp::InsertSeries)
            .fail_always(StoreOp::InsertMessages);
        let ts = Utc.timestamp_millis_opt(1000).unwrap();

        let result = prior_send_data(
            &store,
            vec![SeriesCommand::new("e", Some(ts)).with_metric("m", 1.0)],
            vec![EntityTagCommand::new("e")],
            vec![PropertyCommand::new("t", "e")],
            vec![MessageCommand::new("e", "hi")],
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(store.calls(StoreOp::UpdateEntity), 1);
        assert_eq!(store.calls(StoreOp::CreateEntity), 1);
        assert_eq!(store.calls(StoreOp::InsertProperties), 1);
        assert_eq!(store.calls(StoreOp::InsertSeries), 1);
        assert_eq!(store.calls(StoreOp::InsertMessages), 1);
    }

    #[tokio::test]
    async fn test_empty_batches_skip_store() {
        let store = store();

        prior_send_data(&store, vec![], vec![], vec![], vec![])
            .await
            .unwrap();

        assert_eq!(store.calls(StoreOp::InsertProperties), 0);
        assert_eq!(store.calls(StoreOp::InsertSeries), 0);
        assert_eq!(store.calls(StoreOp::InsertMessages), 0);
    }

    #[tokio::test]
    async fn test_missing_timestamp_rejects_series_only() {
        let store = store();

        let result = prior_send_data(
            &store,
            vec![SeriesCommand::new("e", None).with_metric("m", 1.0)],
            vec![],
            vec![],
            vec![MessageCommand::new("e", "still delivered")],
        )
        .await;

        assert!(matches!(
            result,
            Err(DispatcherError::Contract(
                contracts::ContractError::MissingTimestamp { .. }
            ))
        ));
        assert_eq!(store.calls(StoreOp::InsertSeries), 0);
        assert_eq!(store.messages().len(), 1);
    }
}

//! Communicator - single dispatch loop in front of a StoreClient
//!
//! Producers hand batches to four channels (one per command kind). One
//! background task selects among them, transforms the batch and writes it
//! with indefinite retry, so at most one store write is in flight.
//!
//! A hand-off completes when the loop takes the batch, not when it is
//! buffered, so batches from one `queued_send_data` call are picked up in
//! submission order.

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    Chunk, DispatcherSettings, EntityTagCommand, MessageCommand, PropertyCommand,
    SelfMetricValue, SeriesCommand, StoreClient,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::backoff::ExpBackoff;
use crate::error::DispatcherError;
use crate::metrics::CommandCounters;
use crate::prior;
use crate::retry::retry_until_complete;
use crate::transform;

/// Communicator configuration
#[derive(Debug, Clone)]
pub struct CommunicatorConfig {
    /// First retry wait
    pub backoff_initial: Duration,
    /// Retry wait ceiling
    pub backoff_ceiling: Duration,
    /// Capacity of each input channel
    pub channel_capacity: usize,
}

impl Default for CommunicatorConfig {
    fn default() -> Self {
        Self {
            backoff_initial: Duration::from_millis(100),
            backoff_ceiling: Duration::from_secs(5 * 60),
            channel_capacity: 1,
        }
    }
}

impl From<&DispatcherSettings> for CommunicatorConfig {
    fn from(settings: &DispatcherSettings) -> Self {
        Self {
            backoff_initial: settings.backoff_initial(),
            backoff_ceiling: settings.backoff_ceiling(),
            channel_capacity: settings.channel_capacity,
        }
    }
}

/// Batch plus the acknowledgement sent when the loop takes it
type Handoff<T> = (T, oneshot::Sender<()>);

/// One unit of work for the dispatch loop
enum Input {
    EntityTags(Vec<EntityTagCommand>),
    Properties(Vec<PropertyCommand>),
    Messages(Vec<MessageCommand>),
    Series(Chunk),
}

/// Handle to a running dispatch loop
pub struct Communicator<C> {
    client: Arc<C>,
    entity_tag_tx: mpsc::Sender<Handoff<Vec<EntityTagCommand>>>,
    property_tx: mpsc::Sender<Handoff<Vec<PropertyCommand>>>,
    message_tx: mpsc::Sender<Handoff<Vec<MessageCommand>>>,
    series_tx: mpsc::Sender<Handoff<Chunk>>,
    counters: Arc<CommandCounters>,
    cancel: CancellationToken,
    worker_handle: JoinHandle<()>,
}

impl<C> Communicator<C>
where
    C: StoreClient + Send + Sync + 'static,
{
    /// Create a Communicator and spawn its dispatch loop
    pub fn spawn(client: Arc<C>, config: CommunicatorConfig) -> Self {
        Self::spawn_with_cancellation(client, config, CancellationToken::new())
    }

    /// Spawn with an externally owned cancellation token
    ///
    /// Cancelling the token stops the loop, including a retry in progress.
    pub fn spawn_with_cancellation(
        client: Arc<C>,
        config: CommunicatorConfig,
        cancel: CancellationToken,
    ) -> Self {
        let capacity = config.channel_capacity.max(1);
        let (entity_tag_tx, entity_tag_rx) = mpsc::channel(capacity);
        let (property_tx, property_rx) = mpsc::channel(capacity);
        let (message_tx, message_rx) = mpsc::channel(capacity);
        let (series_tx, series_rx) = mpsc::channel(capacity);
        let counters = Arc::new(CommandCounters::new());

        let worker = DispatchLoop {
            client: Arc::clone(&client),
            counters: Arc::clone(&counters),
            config,
            cancel: cancel.clone(),
            entity_tag_rx,
            property_rx,
            message_rx,
            series_rx,
        };
        let worker_handle = tokio::spawn(worker.run());

        Self {
            client,
            entity_tag_tx,
            property_tx,
            message_tx,
            series_tx,
            counters,
            cancel,
            worker_handle,
        }
    }

    /// Get the shared counters
    pub fn counters(&self) -> &Arc<CommandCounters> {
        &self.counters
    }

    /// Queue batches for the dispatch loop
    ///
    /// Hands over the property, entity-tag and message batches (even when
    /// empty), then every chunk one at a time. Each hand-off waits until the
    /// loop has taken the batch. Store failures never surface here.
    ///
    /// # Errors
    /// `DispatcherError::Closed` once the dispatch loop has stopped.
    #[instrument(
        name = "queued_send_data",
        skip_all,
        fields(
            chunks = chunks.len(),
            entity_tags = entity_tags.len(),
            properties = properties.len(),
            messages = messages.len()
        )
    )]
    pub async fn queued_send_data(
        &self,
        chunks: Vec<Chunk>,
        entity_tags: Vec<EntityTagCommand>,
        properties: Vec<PropertyCommand>,
        messages: Vec<MessageCommand>,
    ) -> Result<(), DispatcherError> {
        hand_off(&self.property_tx, properties, "property").await?;
        hand_off(&self.entity_tag_tx, entity_tags, "entity tag").await?;
        hand_off(&self.message_tx, messages, "message").await?;

        for chunk in chunks {
            hand_off(&self.series_tx, chunk, "series").await?;
        }
        Ok(())
    }

    /// Write directly with a single attempt per kind, bypassing the loop
    ///
    /// See [`prior::prior_send_data`].
    pub async fn prior_send_data(
        &self,
        series: Vec<SeriesCommand>,
        entity_tags: Vec<EntityTagCommand>,
        properties: Vec<PropertyCommand>,
        messages: Vec<MessageCommand>,
    ) -> Result<(), DispatcherError> {
        prior::prior_send_data(
            self.client.as_ref(),
            series,
            entity_tags,
            properties,
            messages,
        )
        .await
    }

    /// Eight counter values tagged with the store transport scheme
    pub fn self_metric_values(&self) -> Vec<SelfMetricValue> {
        self.counters
            .self_metric_values(self.client.url().scheme())
    }

    /// Stop the loop promptly, abandoning any retry in progress
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Close the inputs and wait for the loop to finish queued work
    #[instrument(name = "communicator_shutdown", skip(self))]
    pub async fn shutdown(self) {
        let Self {
            entity_tag_tx,
            property_tx,
            message_tx,
            series_tx,
            worker_handle,
            ..
        } = self;

        // Dropping the senders lets the loop drain and stop
        drop(entity_tag_tx);
        drop(property_tx);
        drop(message_tx);
        drop(series_tx);

        if let Err(e) = worker_handle.await {
            error!(error = ?e, "Dispatch loop task panicked");
        }
        debug!("Communicator shutdown complete");
    }
}

/// Send `batch` and wait until the dispatch loop has taken it
async fn hand_off<T>(
    tx: &mpsc::Sender<Handoff<T>>,
    batch: T,
    input: &'static str,
) -> Result<(), DispatcherError> {
    let (ack_tx, ack_rx) = oneshot::channel();
    tx.send((batch, ack_tx))
        .await
        .map_err(|_| DispatcherError::Closed { input })?;
    // Dropped unacknowledged when the loop stops first
    ack_rx.await.map_err(|_| DispatcherError::Closed { input })
}

/// The consuming side: owns the receivers and the only path to the store
struct DispatchLoop<C> {
    client: Arc<C>,
    counters: Arc<CommandCounters>,
    config: CommunicatorConfig,
    cancel: CancellationToken,
    entity_tag_rx: mpsc::Receiver<Handoff<Vec<EntityTagCommand>>>,
    property_rx: mpsc::Receiver<Handoff<Vec<PropertyCommand>>>,
    message_rx: mpsc::Receiver<Handoff<Vec<MessageCommand>>>,
    series_rx: mpsc::Receiver<Handoff<Chunk>>,
}

impl<C> DispatchLoop<C>
where
    C: StoreClient + Send + Sync + 'static,
{
    #[instrument(name = "dispatch_loop", skip(self), fields(url = %self.client.url()))]
    async fn run(mut self) {
        info!("Dispatch loop started");

        let cancel = self.cancel.clone();
        let mut batches: u64 = 0;

        loop {
            let mut backoff =
                ExpBackoff::new(self.config.backoff_initial, self.config.backoff_ceiling);

            let input = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Dispatch loop cancelled");
                    break;
                }
                input = self.next_input() => match input {
                    Some(input) => input,
                    None => break,
                },
            };

            if let Err(e) = self.process(input, &mut backoff).await {
                warn!(error = %e, "Dispatch interrupted");
                break;
            }
            backoff.reset();

            batches += 1;
            if batches % 100 == 0 {
                debug!(batches, "Dispatch loop progress");
            }
        }

        info!(batches, "Dispatch loop stopped");
    }

    /// Wait for the next batch; `None` once every input is closed
    async fn next_input(&mut self) -> Option<Input> {
        let (input, ack) = tokio::select! {
            Some((batch, ack)) = self.entity_tag_rx.recv() => (Input::EntityTags(batch), ack),
            Some((batch, ack)) = self.property_rx.recv() => (Input::Properties(batch), ack),
            Some((batch, ack)) = self.message_rx.recv() => (Input::Messages(batch), ack),
            Some((chunk, ack)) = self.series_rx.recv() => (Input::Series(chunk), ack),
            else => return None,
        };
        // The submitter may have given up waiting
        let _ = ack.send(());
        Some(input)
    }

    async fn process(&self, input: Input, backoff: &mut ExpBackoff) -> Result<(), DispatcherError> {
        match input {
            Input::EntityTags(batch) => self.send_entity_tags(batch, backoff).await,
            Input::Properties(batch) => self.send_properties(batch, backoff).await,
            Input::Messages(batch) => self.send_messages(batch, backoff).await,
            Input::Series(chunk) => self.send_series(chunk, backoff).await,
        }
    }

    /// Update each entity; on failure create it, retrying until done
    async fn send_entity_tags(
        &self,
        batch: Vec<EntityTagCommand>,
        backoff: &mut ExpBackoff,
    ) -> Result<(), DispatcherError> {
        let entities = transform::entity_tag_commands_to_entities(batch);
        for entity in &entities {
            if let Err(e) = self.client.update_entity(entity).await {
                debug!(entity = %entity.name, error = %e, "Entity update failed, creating");
                retry_until_complete(
                    || self.client.create_entity(entity),
                    "entity update",
                    backoff,
                    &self.cancel,
                )
                .await?;
            }
            self.counters.entity_tag.add_sent(1);
        }
        Ok(())
    }

    async fn send_properties(
        &self,
        batch: Vec<PropertyCommand>,
        backoff: &mut ExpBackoff,
    ) -> Result<(), DispatcherError> {
        if batch.is_empty() {
            return Ok(());
        }
        let properties = transform::property_commands_to_properties(batch);
        retry_until_complete(
            || self.client.insert_properties(&properties),
            "properties insert",
            backoff,
            &self.cancel,
        )
        .await?;
        self.counters.property.add_sent(properties.len() as u64);
        Ok(())
    }

    async fn send_messages(
        &self,
        batch: Vec<MessageCommand>,
        backoff: &mut ExpBackoff,
    ) -> Result<(), DispatcherError> {
        if batch.is_empty() {
            return Ok(());
        }
        let messages = transform::message_commands_to_messages(batch);
        retry_until_complete(
            || self.client.insert_messages(&messages),
            "messages insert",
            backoff,
            &self.cancel,
        )
        .await?;
        self.counters.message.add_sent(messages.len() as u64);
        Ok(())
    }

    /// A chunk failing validation is logged and discarded
    async fn send_series(
        &self,
        mut chunk: Chunk,
        backoff: &mut ExpBackoff,
    ) -> Result<(), DispatcherError> {
        let series = match transform::series_chunk_to_series(&mut chunk) {
            Ok(series) => series,
            Err(e) => {
                error!(error = %e, commands = chunk.len(), "Rejected series chunk");
                return Ok(());
            }
        };
        if series.is_empty() {
            return Ok(());
        }

        retry_until_complete(
            || self.client.insert_series(&series),
            "series insert",
            backoff,
            &self.cancel,
        )
        .await?;
        self.counters.series.add_sent(series.len() as u64);
        Ok(())
    }
}

//! Mock store client
//!
//! Records every call and injects failures, for unit and end-to-end tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use contracts::{ContractError, Entity, Message, Property, Series, StoreClient};
use tracing::instrument;
use url::Url;

/// Store operation, used to address failure injection and call counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UpdateEntity,
    CreateEntity,
    InsertProperties,
    InsertMessages,
    InsertSeries,
}

impl StoreOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UpdateEntity => "entity update",
            Self::CreateEntity => "entity create",
            Self::InsertProperties => "properties insert",
            Self::InsertMessages => "messages insert",
            Self::InsertSeries => "series insert",
        }
    }
}

/// Recorded successful writes
#[derive(Debug, Default)]
struct Written {
    updated: Vec<Entity>,
    created: Vec<Entity>,
    properties: Vec<Property>,
    messages: Vec<Message>,
    series: Vec<Series>,
    /// Batch sizes of successful series inserts
    series_batches: Vec<usize>,
}

/// Mock store client
pub struct MockStoreClient {
    url: Url,
    /// Remaining failures per operation (`u64::MAX` = always fail)
    failures: Mutex<HashMap<StoreOp, u64>>,
    /// Attempts per operation, successful or not
    calls: HashMap<StoreOp, AtomicU64>,
    written: Mutex<Written>,
}

impl MockStoreClient {
    /// Create a mock that accepts every write
    pub fn new(url: Url) -> Self {
        let calls = [
            StoreOp::UpdateEntity,
            StoreOp::CreateEntity,
            StoreOp::InsertProperties,
            StoreOp::InsertMessages,
            StoreOp::InsertSeries,
        ]
        .into_iter()
        .map(|op| (op, AtomicU64::new(0)))
        .collect();

        Self {
            url,
            failures: Mutex::new(HashMap::new()),
            calls,
            written: Mutex::new(Written::default()),
        }
    }

    /// Fail the next `count` attempts of `op`
    pub fn fail_next(self, op: StoreOp, count: u64) -> Self {
        self.set_failures(op, count);
        self
    }

    /// Fail every attempt of `op`
    pub fn fail_always(self, op: StoreOp) -> Self {
        self.fail_next(op, u64::MAX)
    }

    /// Replace the remaining failure budget of `op`
    pub fn set_failures(&self, op: StoreOp, count: u64) {
        self.failures.lock().unwrap().insert(op, count);
    }

    /// Number of attempts made for `op`
    pub fn calls(&self, op: StoreOp) -> u64 {
        self.calls[&op].load(Ordering::SeqCst)
    }

    pub fn updated_entities(&self) -> Vec<Entity> {
        self.written.lock().unwrap().updated.clone()
    }

    pub fn created_entities(&self) -> Vec<Entity> {
        self.written.lock().unwrap().created.clone()
    }

    pub fn properties(&self) -> Vec<Property> {
        self.written.lock().unwrap().properties.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.written.lock().unwrap().messages.clone()
    }

    pub fn series(&self) -> Vec<Series> {
        self.written.lock().unwrap().series.clone()
    }

    /// Sizes of successful series insert batches, in call order
    pub fn series_batches(&self) -> Vec<usize> {
        self.written.lock().unwrap().series_batches.clone()
    }

    fn attempt(&self, op: StoreOp) -> Result<(), ContractError> {
        self.calls[&op].fetch_add(1, Ordering::SeqCst);

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                if *remaining != u64::MAX {
                    *remaining -= 1;
                }
                Err(ContractError::store_write(op.as_str(), "mock failure"))
            }
            _ => Ok(()),
        }
    }
}

impl StoreClient for MockStoreClient {
    fn url(&self) -> &Url {
        &self.url
    }

    #[instrument(name = "mock_store_update_entity", skip(self, entity), fields(entity = %entity.name))]
    async fn update_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        self.attempt(StoreOp::UpdateEntity)?;
        self.written.lock().unwrap().updated.push(entity.clone());
        Ok(())
    }

    #[instrument(name = "mock_store_create_entity", skip(self, entity), fields(entity = %entity.name))]
    async fn create_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        self.attempt(StoreOp::CreateEntity)?;
        self.written.lock().unwrap().created.push(entity.clone());
        Ok(())
    }

    #[instrument(name = "mock_store_insert_properties", skip_all)]
    async fn insert_properties(&self, properties: &[Property]) -> Result<(), ContractError> {
        self.attempt(StoreOp::InsertProperties)?;
        self.written
            .lock()
            .unwrap()
            .properties
            .extend_from_slice(properties);
        Ok(())
    }

    #[instrument(name = "mock_store_insert_messages", skip_all)]
    async fn insert_messages(&self, messages: &[Message]) -> Result<(), ContractError> {
        self.attempt(StoreOp::InsertMessages)?;
        self.written
            .lock()
            .unwrap()
            .messages
            .extend_from_slice(messages);
        Ok(())
    }

    #[instrument(name = "mock_store_insert_series", skip_all)]
    async fn insert_series(&self, series: &[Series]) -> Result<(), ContractError> {
        self.attempt(StoreOp::InsertSeries)?;
        let mut written = self.written.lock().unwrap();
        written.series.extend_from_slice(series);
        written.series_batches.push(series.len());
        Ok(())
    }
}

//! LogStoreClient - logs write summaries via tracing

use contracts::{ContractError, Entity, Message, Property, Series, StoreClient};
use tracing::{info, instrument};
use url::Url;

/// Store client that logs every write and always succeeds
pub struct LogStoreClient {
    url: Url,
}

impl LogStoreClient {
    /// Create a new LogStoreClient reporting under the given URL
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

impl StoreClient for LogStoreClient {
    fn url(&self) -> &Url {
        &self.url
    }

    #[instrument(name = "log_store_update_entity", skip(self, entity), fields(entity = %entity.name))]
    async fn update_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        info!(entity = %entity.name, tags = entity.tags.len(), "Entity update");
        Ok(())
    }

    #[instrument(name = "log_store_create_entity", skip(self, entity), fields(entity = %entity.name))]
    async fn create_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        info!(entity = %entity.name, tags = entity.tags.len(), "Entity create");
        Ok(())
    }

    #[instrument(name = "log_store_insert_properties", skip_all, fields(count = properties.len()))]
    async fn insert_properties(&self, properties: &[Property]) -> Result<(), ContractError> {
        info!(count = properties.len(), "Properties insert");
        Ok(())
    }

    #[instrument(name = "log_store_insert_messages", skip_all, fields(count = messages.len()))]
    async fn insert_messages(&self, messages: &[Message]) -> Result<(), ContractError> {
        info!(count = messages.len(), "Messages insert");
        Ok(())
    }

    #[instrument(name = "log_store_insert_series", skip_all, fields(count = series.len()))]
    async fn insert_series(&self, series: &[Series]) -> Result<(), ContractError> {
        let samples: usize = series.iter().map(|s| s.data.len()).sum();
        info!(series = series.len(), samples, "Series insert");
        Ok(())
    }
}

//! Store client implementations
//!
//! Contains LogStoreClient, FileStoreClient and MockStoreClient, plus
//! `ConfiguredStore` selecting one of them from configuration.

mod file;
mod log;
mod mock;

pub use self::file::FileStoreClient;
pub use self::log::LogStoreClient;
pub use self::mock::{MockStoreClient, StoreOp};

use contracts::{ContractError, Entity, Message, Property, Series, StoreClient, StoreConfig, StoreKind};
use tracing::instrument;
use url::Url;

use crate::error::DispatcherError;

/// Store client chosen by `StoreConfig::kind`
pub enum ConfiguredStore {
    Log(LogStoreClient),
    File(FileStoreClient),
}

impl ConfiguredStore {
    /// Create the configured store client
    #[instrument(name = "configured_store_create", skip(config), fields(kind = ?config.kind, url = %config.url))]
    pub fn from_config(config: &StoreConfig) -> Result<Self, DispatcherError> {
        match config.kind {
            StoreKind::Log => Ok(Self::Log(LogStoreClient::new(config.url.clone()))),
            StoreKind::File => {
                let store = FileStoreClient::from_params(config.url.clone(), &config.params)
                    .map_err(|e| DispatcherError::store_creation("file", e.to_string()))?;
                Ok(Self::File(store))
            }
        }
    }
}

impl StoreClient for ConfiguredStore {
    fn url(&self) -> &Url {
        match self {
            Self::Log(store) => store.url(),
            Self::File(store) => store.url(),
        }
    }

    async fn update_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        match self {
            Self::Log(store) => store.update_entity(entity).await,
            Self::File(store) => store.update_entity(entity).await,
        }
    }

    async fn create_entity(&self, entity: &Entity) -> Result<(), ContractError> {
        match self {
            Self::Log(store) => store.create_entity(entity).await,
            Self::File(store) => store.create_entity(entity).await,
        }
    }

    async fn insert_properties(&self, properties: &[Property]) -> Result<(), ContractError> {
        match self {
            Self::Log(store) => store.insert_properties(properties).await,
            Self::File(store) => store.insert_properties(properties).await,
        }
    }

    async fn insert_messages(&self, messages: &[Message]) -> Result<(), ContractError> {
        match self {
            Self::Log(store) => store.insert_messages(messages).await,
            Self::File(store) => store.insert_messages(messages).await,
        }
    }

    async fn insert_series(&self, series: &[Series]) -> Result<(), ContractError> {
        match self {
            Self::Log(store) => store.insert_series(series).await,
            Self::File(store) => store.insert_series(series).await,
        }
    }
}

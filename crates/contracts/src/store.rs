//! StoreClient trait - Dispatcher output interface
//!
//! The remote time-series store's write API. Transport, pooling and
//! authentication live behind this trait.

use url::Url;

use crate::{ContractError, Entity, Message, Property, Series};

/// Store write operations
///
/// Every operation reports success or failure only; retry policy is the
/// caller's business.
#[trait_variant::make(StoreClient: Send)]
pub trait LocalStoreClient {
    /// Store endpoint (its scheme tags self metrics)
    fn url(&self) -> &Url;

    /// Update tags of an existing entity
    async fn update_entity(&self, entity: &Entity) -> Result<(), ContractError>;

    /// Create a new entity
    async fn create_entity(&self, entity: &Entity) -> Result<(), ContractError>;

    /// Insert properties
    async fn insert_properties(&self, properties: &[Property]) -> Result<(), ContractError>;

    /// Insert messages
    async fn insert_messages(&self, messages: &[Message]) -> Result<(), ContractError>;

    /// Insert series
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn insert_series(&self, series: &[Series]) -> Result<(), ContractError>;
}

//! # Contracts
//!
//! Frozen interface contracts shared by every forwarder crate: the command
//! types producers submit, the wire objects the store accepts, the
//! `StoreClient` collaborator trait and the configuration model.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Commands carry `chrono::DateTime<Utc>` timestamps
//! - Series samples are sent as epoch milliseconds

mod chunk;
mod command;
mod config;
mod error;
mod self_metric;
mod store;
mod wire;

pub use chunk::Chunk;
pub use command::*;
pub use config::*;
pub use error::*;
pub use self_metric::SelfMetricValue;
pub use store::{LocalStoreClient, StoreClient};
pub use wire::*;

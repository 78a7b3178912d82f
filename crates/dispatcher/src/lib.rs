//! # Dispatcher
//!
//! 数据转发模块。
//!
//! 负责：
//! - 接收四类命令批次（series / entity tag / property / message）
//! - 单一调度循环串行写入 `StoreClient`，失败时指数退避无限重试
//! - 同步 best-effort 发送（prior send）
//! - 发送计数与自监控指标

pub mod backoff;
pub mod communicator;
pub mod error;
pub mod metrics;
pub mod prior;
pub mod retry;
pub mod stores;
pub mod transform;

pub use backoff::ExpBackoff;
pub use communicator::{Communicator, CommunicatorConfig};
pub use contracts::{Chunk, StoreClient};
pub use error::DispatcherError;
pub use metrics::{CommandCounters, CountersSnapshot, KindCounters};
pub use prior::prior_send_data;
pub use retry::retry_until_complete;
pub use stores::{ConfiguredStore, FileStoreClient, LogStoreClient, MockStoreClient, StoreOp};
pub use tokio_util::sync::CancellationToken;

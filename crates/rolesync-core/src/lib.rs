pub mod authority;
pub mod config;
pub mod directory;
pub mod discord;
pub mod error;
pub mod locks;
pub mod reconcile;
pub mod resolver;
pub mod service;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod types;

pub use error::{Result, SyncError};
pub use service::SyncService;
pub use types::{OperationKind, ReconciliationOutcome, SubscriptionRecord};

pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::StoreError;
pub use manager::SessionStore;
pub use types::{Checkpoint, CheckpointKey, StoredMessage, TaskRecord, TaskStatus, Thread};

pub mod core;
pub mod edgar;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod utils;

// Re-exports
pub use core::IngestConfig;
pub use error::{IngestError, Result};
pub use fetch::{FetchManager, FetchStatus, FilingOutcome, IngestSummary};
pub use storage::{HoldingsStorage, SqliteConfig, SqliteStorage};
pub use utils::progress::ProgressTracker;

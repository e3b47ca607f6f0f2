//! Storage abstraction for leave requests.
//!
//! The `RequestStore` trait hides the backend: tests run against the
//! in-memory implementation, production runs against SQLite. Records are
//! keyed by request id and hold only the latest review outcome.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::request::{LeaveRequest, RequestId, RequestStatus, UserId};

/// Error from a storage backend.
#[derive(Debug)]
pub enum StoreError {
    /// The backend failed to carry out an operation.
    Storage {
        operation: &'static str,
        message: String,
    },
    /// A stored record could not be decoded.
    Corruption { what: String },
}

impl StoreError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        Self::Corruption { what: what.into() }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { operation, message } => {
                write!(f, "store operation '{}' failed: {}", operation, message)
            }
            Self::Corruption { what } => write!(f, "corrupt stored record: {}", what),
        }
    }
}

impl std::error::Error for StoreError {}

/// The latest review outcome, written against a request as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub status: RequestStatus,
    pub processed_by: UserId,
    pub processed_at: DateTime<Utc>,
}

/// Persistence for leave requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Creates the record for a freshly submitted request. The id was
    /// assigned by the notice transport and is never reused.
    async fn create(&self, request: &LeaveRequest) -> Result<(), StoreError>;

    /// Fetches a request, `None` when no record backs the id.
    async fn get(&self, id: &RequestId) -> Result<Option<LeaveRequest>, StoreError>;

    /// Records the latest transition. Overwrites the previous outcome; no
    /// history is kept.
    async fn update_review(&self, id: &RequestId, update: &ReviewUpdate) -> Result<(), StoreError>;
}

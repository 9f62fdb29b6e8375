//! Durable key→document persistence for capability documents.
//!
//! A [`Store`] is a facade over some storage substrate capable of storing
//! and retrieving opaque byte documents by string key, with no
//! transformation. A [`StoreProvider`] opens named stores once at service
//! construction.

use async_trait::async_trait;
use thiserror::Error;

mod memory;
pub use memory::{MemoryStore, MemoryStoreProvider};

/// The common error type used by this crate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key has no stored value.
    #[error("no value stored under key: {0}")]
    NotFound(String),

    /// The storage backend is unavailable or failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a missing-key miss rather than a backend fault.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Key→bytes persistence with independent, per-key atomic operations.
///
/// Implementations must tolerate concurrent `get`s and concurrent `put`s
/// for different keys; no cross-key transactional guarantee is provided.
#[async_trait]
pub trait Store: Send + Sync {
    /// Store `value` against `key`, overwriting any existing value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Retrieve the value stored against `key`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when the key is absent,
    /// [`StoreError::Backend`] when the backend fails.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Opens named [`Store`]s.
///
/// Called once per store name at service construction; the returned store
/// is shared across request workers for the process lifetime.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// The store type opened by this provider.
    type Store: Store;

    /// Open (creating if necessary) the store named `name`.
    async fn open(&self, name: &str) -> Result<Self::Store, StoreError>;
}

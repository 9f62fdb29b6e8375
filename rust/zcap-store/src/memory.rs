use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Store, StoreError, StoreProvider};

/// A trivial [`Store`] backed by a [`HashMap`] — all values are kept in
/// memory and never persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// A [`StoreProvider`] handing out [`MemoryStore`]s.
///
/// Opening the same name twice yields handles onto the same underlying
/// entries, matching the behavior of a persistent provider.
#[derive(Clone, Default)]
pub struct MemoryStoreProvider {
    stores: Arc<RwLock<HashMap<String, MemoryStore>>>,
}

#[async_trait]
impl StoreProvider for MemoryStoreProvider {
    type Store = MemoryStore;

    async fn open(&self, name: &str) -> Result<Self::Store, StoreError> {
        let mut stores = self.stores.write().await;
        Ok(stores.entry(name.to_string()).or_default().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn it_writes_and_reads_a_value() -> Result<()> {
        let store = MemoryStore::default();

        store.put("a", vec![1, 2, 3]).await?;
        assert_eq!(store.get("a").await?, vec![1, 2, 3]);

        Ok(())
    }

    #[tokio::test]
    async fn it_overwrites_existing_values() -> Result<()> {
        let store = MemoryStore::default();

        store.put("a", vec![1]).await?;
        store.put("a", vec![2]).await?;
        assert_eq!(store.get("a").await?, vec![2]);

        Ok(())
    }

    #[tokio::test]
    async fn it_reports_missing_keys() {
        let store = MemoryStore::default();
        let error = store.get("absent").await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn provider_reopens_the_same_store_by_name() -> Result<()> {
        let provider = MemoryStoreProvider::default();

        let first = provider.open("zcap_capability").await?;
        first.put("key", vec![9]).await?;

        let second = provider.open("zcap_capability").await?;
        assert_eq!(second.get("key").await?, vec![9]);

        let other = provider.open("other").await?;
        assert!(other.get("key").await.unwrap_err().is_not_found());

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_puts_on_different_keys_do_not_interfere() -> Result<()> {
        let store = MemoryStore::default();

        let writers = (0..16u8).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.put(&format!("key-{i}"), vec![i]).await })
        });

        for writer in writers {
            writer.await??;
        }

        for i in 0..16u8 {
            assert_eq!(store.get(&format!("key-{i}")).await?, vec![i]);
        }

        Ok(())
    }
}

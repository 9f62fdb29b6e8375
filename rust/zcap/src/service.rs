//! Capability issuance and resolution.
//!
//! The [`CapabilityService`] mints signed root and delegated capability
//! documents and persists them through a [`Store`]. Root capabilities are
//! stored under two keys — their own id and the protected resource's id —
//! so the authorizer can resolve a resource's root without chain
//! traversal.

use crate::{
    capability::{Action, Capability},
    context::ContextCache,
    error::{IssueError, ResolutionError},
};
use async_trait::async_trait;
use std::sync::Arc;
use zcap_did::{Did, KeyManager};
use zcap_store::{Store, StoreError, StoreProvider};

/// Name of the store holding capability documents.
pub const CAPABILITY_STORE_NAME: &str = "zcap_capability";

/// Resolves a capability id to the capability it names.
///
/// The store-backed adapter is the default; remote or caching resolvers
/// implement the same interface.
#[async_trait]
pub trait CapabilityResolver: Send + Sync {
    /// Resolve `id` to a parsed capability.
    async fn resolve(&self, id: &str) -> Result<Capability, ResolutionError>;
}

/// A [`CapabilityResolver`] reading from a capability [`Store`].
#[derive(Clone)]
pub struct StoreCapabilityResolver<S: Store> {
    store: S,
}

impl<S: Store> StoreCapabilityResolver<S> {
    /// Wrap `store` as a resolver.
    pub const fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> CapabilityResolver for StoreCapabilityResolver<S> {
    async fn resolve(&self, id: &str) -> Result<Capability, ResolutionError> {
        let bytes = self.store.get(id).await?;
        Ok(Capability::parse(&bytes)?)
    }
}

/// Mints, persists, and resolves capability documents for vault resources.
pub struct CapabilityService<S: Store> {
    key_manager: Arc<dyn KeyManager>,
    store: S,
    contexts: Arc<ContextCache>,
}

impl<S: Store + Clone> CapabilityService<S> {
    /// Open the capability store and assemble the service.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the provider cannot open the store.
    pub async fn new<P>(
        provider: &P,
        key_manager: Arc<dyn KeyManager>,
        contexts: Arc<ContextCache>,
    ) -> Result<Self, StoreError>
    where
        P: StoreProvider<Store = S>,
    {
        let store = provider.open(CAPABILITY_STORE_NAME).await?;
        Ok(Self {
            key_manager,
            store,
            contexts,
        })
    }

    /// The shared context cache this service canonicalizes against.
    #[must_use]
    pub fn contexts(&self) -> Arc<ContextCache> {
        Arc::clone(&self.contexts)
    }

    /// A resolver over this service's capability store.
    #[must_use]
    pub fn resolver(&self) -> StoreCapabilityResolver<S> {
        StoreCapabilityResolver::new(self.store.clone())
    }

    /// Mint and persist the root capability for `resource_id`.
    ///
    /// A fresh signing key is generated for the capability; the signer
    /// identity is derived from that key's fingerprint. The signed
    /// document is stored under its own id first and the resource id
    /// second, so a partial write leaves the resource unprovisioned
    /// rather than mapped to a half-written root.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError`] if key generation, signing, or persistence
    /// fails.
    pub async fn create_root(&self, resource_id: &str) -> Result<Capability, IssueError> {
        let signer = self
            .key_manager
            .generate_signing_key()
            .await
            .map_err(crate::error::SigningError::Key)?;

        let capability = Capability::builder()
            .invocation_target(resource_id)
            .allowed_actions([Action::Read, Action::Write])
            .sign(&signer, self.contexts.as_ref())?;

        let bytes = capability.to_bytes()?;
        self.store.put(capability.id(), bytes.clone()).await?;
        self.store.put(resource_id, bytes).await?;

        tracing::debug!(resource = resource_id, id = capability.id(), "minted root capability");
        Ok(capability)
    }

    /// Mint and persist a capability for `invoker`, delegated under
    /// `resource_id`'s root.
    ///
    /// Delegates under the resource's existing root when one is stored;
    /// a root is minted only when the resource has never been
    /// provisioned.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError`] if root resolution, key generation,
    /// signing, or persistence fails.
    pub async fn create_delegated(
        &self,
        resource_id: &str,
        invoker: &Did,
    ) -> Result<Capability, IssueError> {
        let root = match self.store.get(resource_id).await {
            Ok(bytes) => Capability::parse(&bytes).map_err(IssueError::Malformed)?,
            Err(error) if error.is_not_found() => self.create_root(resource_id).await?,
            Err(error) => return Err(error.into()),
        };

        let signer = self
            .key_manager
            .generate_signing_key()
            .await
            .map_err(crate::error::SigningError::Key)?;

        let capability = Capability::builder()
            .invocation_target(resource_id)
            .allowed_actions([Action::Read, Action::Write])
            .invoker(invoker.clone())
            .parent(root.id())
            .capability_chain([root.id().to_string()])
            .sign(&signer, self.contexts.as_ref())?;

        self.store
            .put(capability.id(), capability.to_bytes()?)
            .await?;

        tracing::debug!(
            resource = resource_id,
            id = capability.id(),
            invoker = %invoker,
            "minted delegated capability"
        );
        Ok(capability)
    }

    /// Fetch and parse the capability stored under `key` (a capability id
    /// or, for roots, a resource id).
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when the key is absent, the backend
    /// fails, or the stored document is malformed.
    pub async fn capability(&self, key: &str) -> Result<Capability, ResolutionError> {
        let bytes = self.store.get(key).await?;
        Ok(Capability::parse(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite;
    use anyhow::Result;
    use zcap_did::{DidKeyResolver, Ed25519Signer, LocalKeyManager, Principal};
    use zcap_store::{MemoryStore, MemoryStoreProvider};

    async fn service() -> Result<CapabilityService<MemoryStore>> {
        Ok(CapabilityService::new(
            &MemoryStoreProvider::default(),
            Arc::new(LocalKeyManager),
            Arc::new(ContextCache::new()?),
        )
        .await?)
    }

    #[tokio::test]
    async fn root_is_stored_under_both_keys() -> Result<()> {
        let service = service().await?;
        let root = service.create_root("vault-7").await?;

        assert_eq!(root.invocation_target().id, "vault-7");
        assert!(root.is_root());
        assert!(root.capability_chain().is_empty());

        let by_id = service.capability(root.id()).await?;
        let by_resource = service.capability("vault-7").await?;
        assert_eq!(by_id, root);
        assert_eq!(by_resource, root);

        Ok(())
    }

    #[tokio::test]
    async fn root_proof_verifies_with_resolved_key() -> Result<()> {
        let service = service().await?;
        let root = service.create_root("vault-7").await?;
        suite::verify_capability(&root, &DidKeyResolver, service.contexts().as_ref())?;
        Ok(())
    }

    #[tokio::test]
    async fn delegation_names_invoker_and_chains_to_root() -> Result<()> {
        let service = service().await?;
        let invoker = Ed25519Signer::import(&[21u8; 32]).did();

        let delegated = service.create_delegated("vault-7", &invoker).await?;
        let root = service.capability("vault-7").await?;

        assert_eq!(delegated.invoker(), Some(&invoker));
        assert_eq!(delegated.parent(), Some(root.id()));
        assert_eq!(delegated.capability_chain(), [root.id().to_string()]);
        suite::verify_capability(&delegated, &DidKeyResolver, service.contexts().as_ref())?;

        Ok(())
    }

    #[tokio::test]
    async fn delegations_reuse_the_provisioned_root() -> Result<()> {
        let service = service().await?;
        let root = service.create_root("vault-7").await?;

        let invoker_a = Ed25519Signer::import(&[22u8; 32]).did();
        let invoker_b = Ed25519Signer::import(&[23u8; 32]).did();
        let a = service.create_delegated("vault-7", &invoker_a).await?;
        let b = service.create_delegated("vault-7", &invoker_b).await?;

        // The resource's authoritative root is never overwritten.
        assert_eq!(a.parent(), Some(root.id()));
        assert_eq!(b.parent(), Some(root.id()));
        assert_eq!(service.capability("vault-7").await?, root);

        Ok(())
    }

    #[tokio::test]
    async fn each_capability_gets_its_own_signing_key() -> Result<()> {
        let service = service().await?;
        let invoker = Ed25519Signer::import(&[24u8; 32]).did();

        let root = service.create_root("vault-7").await?;
        let delegated = service.create_delegated("vault-7", &invoker).await?;

        assert_ne!(root.controller(), delegated.controller());
        Ok(())
    }

    #[tokio::test]
    async fn resolver_reports_unknown_ids() -> Result<()> {
        let service = service().await?;
        let resolver = service.resolver();
        let error = resolver.resolve("urn:zcap:missing").await.unwrap_err();
        assert!(matches!(
            error,
            ResolutionError::Store(StoreError::NotFound(_))
        ));
        Ok(())
    }
}

//! End-to-end authorizer tests: provision a vault, delegate to an
//! invoker, and drive signed requests through the middleware.

use anyhow::Result;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response, StatusCode};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use zcap::{
    Action, CAPABILITY_STORE_NAME, Capability, CapabilityService, ContextCache,
};
use zcap_did::{Ed25519Signer, LocalKeyManager, Principal};
use zcap_http::{Authorizer, BuildError, CapabilityMiddleware, sign_request};
use zcap_store::{MemoryStore, MemoryStoreProvider, Store, StoreProvider};

struct Fixture {
    provider: MemoryStoreProvider,
    service: Arc<CapabilityService<MemoryStore>>,
}

async fn fixture() -> Result<Fixture> {
    let provider = MemoryStoreProvider::default();
    let service = Arc::new(
        CapabilityService::new(
            &provider,
            Arc::new(LocalKeyManager),
            Arc::new(ContextCache::new()?),
        )
        .await?,
    );
    Ok(Fixture { provider, service })
}

/// Run `request` through `middleware` with a counting inner handler.
async fn dispatch<B: Send>(
    middleware: &CapabilityMiddleware,
    request: Request<B>,
) -> (Response<Full<Bytes>>, usize) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let response = middleware
        .handle(request, move |_request| async move {
            seen.fetch_add(1, Ordering::SeqCst);
            Response::new(Full::new(Bytes::from("ok")))
        })
        .await;
    (response, calls.load(Ordering::SeqCst))
}

#[tokio::test]
async fn authorized_read_reaches_the_handler_once() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let invoker = Ed25519Signer::import(&[61u8; 32]);
    let delegated = service.create_delegated("vault-7", &invoker.did()).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;
    sign_request(&mut request, &invoker, delegated.id(), Action::Read)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls, 1);

    let body = response.into_body().collect().await?.to_bytes();
    assert_eq!(body, Bytes::from("ok"));
    Ok(())
}

#[tokio::test]
async fn authorized_write_reaches_the_handler() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let invoker = Ed25519Signer::import(&[62u8; 32]);
    let delegated = service.create_delegated("vault-7", &invoker.did()).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/vault-7/documents")
        .body(())?;
    sign_request(&mut request, &invoker, delegated.id(), Action::Write)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls, 1);
    Ok(())
}

#[tokio::test]
async fn write_only_capability_cannot_read() -> Result<()> {
    let Fixture { provider, service } = fixture().await?;
    let invoker = Ed25519Signer::import(&[63u8; 32]);

    let root = service.create_root("vault-7").await?;
    let delegate_signer = Ed25519Signer::generate()?;
    let contexts = service.contexts();
    let write_only = Capability::builder()
        .invocation_target("vault-7")
        .allowed_actions([Action::Write])
        .invoker(invoker.did())
        .parent(root.id())
        .capability_chain([root.id().to_string()])
        .sign(&delegate_signer, contexts.as_ref())?;

    let store = provider.open(CAPABILITY_STORE_NAME).await?;
    store.put(write_only.id(), write_only.to_bytes()?).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;
    sign_request(&mut request, &invoker, write_only.id(), Action::Read)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn capability_for_another_vault_is_rejected() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let invoker = Ed25519Signer::import(&[64u8; 32]);

    service.create_root("vault-7").await?;
    let foreign = service.create_delegated("vault-8", &invoker.did()).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;
    sign_request(&mut request, &invoker, foreign.id(), Action::Read)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn stranger_cannot_invoke_a_delegation() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let invoker = Ed25519Signer::import(&[65u8; 32]);
    let stranger = Ed25519Signer::import(&[66u8; 32]);
    let delegated = service.create_delegated("vault-7", &invoker.did()).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;
    sign_request(&mut request, &stranger, delegated.id(), Action::Read)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn tampered_capability_proof_is_rejected() -> Result<()> {
    let Fixture { provider, service } = fixture().await?;
    let invoker = Ed25519Signer::import(&[67u8; 32]);
    let delegated = service.create_delegated("vault-7", &invoker.did()).await?;

    // Corrupt the stored delegation's proof value in place.
    let store = provider.open(CAPABILITY_STORE_NAME).await?;
    let mut document: serde_json::Value = serde_json::from_slice(&store.get(delegated.id()).await?)?;
    let proof_value = document["proof"]["proofValue"]
        .as_str()
        .map(|value| {
            let flipped = if value.starts_with('A') { "B" } else { "A" };
            format!("{flipped}{}", &value[1..])
        })
        .unwrap();
    document["proof"]["proofValue"] = serde_json::Value::String(proof_value);
    store
        .put(delegated.id(), serde_json::to_vec(&document)?)
        .await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;
    sign_request(&mut request, &invoker, delegated.id(), Action::Read)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn invocation_headers_do_not_transfer_between_requests() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let invoker = Ed25519Signer::import(&[68u8; 32]);
    let delegated = service.create_delegated("vault-7", &invoker.did()).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    // Sign one request, then replay its headers against another path.
    let mut signed = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-2")
        .body(())?;
    sign_request(&mut signed, &invoker, delegated.id(), Action::Read)?;

    let (mut parts, body) = signed.into_parts();
    parts.uri = "/vault-7/documents/doc-1".parse()?;
    let replayed = Request::from_parts(parts, body);

    let (response, calls) = dispatch(&middleware, replayed).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn action_must_match_the_request_method() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let invoker = Ed25519Signer::import(&[69u8; 32]);
    let delegated = service.create_delegated("vault-7", &invoker.did()).await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    // A write invocation over a GET is refused before signature checks.
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;
    sign_request(&mut request, &invoker, delegated.id(), Action::Write)?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn unsigned_requests_are_rejected() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    service.create_root("vault-7").await?;

    let middleware = Authorizer::new(service).build("vault-7").await?;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/vault-7/documents/doc-1")
        .body(())?;

    let (response, calls) = dispatch(&middleware, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls, 0);
    Ok(())
}

#[tokio::test]
async fn building_over_an_unprovisioned_resource_fails() -> Result<()> {
    let Fixture { service, .. } = fixture().await?;
    let result = Authorizer::new(service).build("vault-404").await;
    assert!(matches!(result, Err(BuildError::NotProvisioned(resource)) if resource == "vault-404"));
    Ok(())
}

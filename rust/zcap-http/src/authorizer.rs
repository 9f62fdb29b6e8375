//! The invocation authorizer: per-resource HTTP middleware.
//!
//! An [`Authorizer`] is bound to a provisioned resource with
//! [`Authorizer::build`], which resolves the resource's root capability up
//! front and fails loudly if the resource was never provisioned. The
//! resulting [`CapabilityMiddleware`] authorizes each request before
//! handing it to the inner handler; rejected requests never reach it.

use crate::{
    error::{AuthorizeError, BuildError},
    invocation::InvocationProof,
};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use std::{future::Future, sync::Arc};
use zcap::{
    Action, CapabilityResolver, CapabilityService, ContextCache, InvocationExpectation,
    ResolutionError, check_invocation, verify_chain,
};
use zcap_did::{DidKeyResolver, KeyResolver};
use zcap_store::Store;

/// The action a request method requires: `read` for safe methods,
/// `write` for everything else.
#[must_use]
pub fn required_action(method: &Method) -> Action {
    match *method {
        Method::GET | Method::HEAD => Action::Read,
        _ => Action::Write,
    }
}

/// Turns authorization failures into client responses.
///
/// Injected so deployments can shape the rejection surface (status code,
/// body, logging) without touching the middleware.
pub trait ErrorReporter: Send + Sync {
    /// Render `error` as the response the client sees.
    fn report(&self, error: &AuthorizeError) -> Response<Full<Bytes>>;
}

/// Default reporter: logs the failure and answers 400 with the error text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BadRequestReporter;

impl ErrorReporter for BadRequestReporter {
    fn report(&self, error: &AuthorizeError) -> Response<Full<Bytes>> {
        tracing::warn!(%error, "rejected capability invocation");
        let mut response = Response::new(Full::new(Bytes::from(error.to_string())));
        *response.status_mut() = StatusCode::BAD_REQUEST;
        response
    }
}

/// Builds per-resource capability middleware over a shared service.
pub struct Authorizer<S: Store> {
    service: Arc<CapabilityService<S>>,
    keys: Arc<dyn KeyResolver>,
}

impl<S: Store + Clone + 'static> Authorizer<S> {
    /// Wrap `service`, resolving invoking keys deterministically from
    /// their `did:key` fingerprints.
    pub fn new(service: Arc<CapabilityService<S>>) -> Self {
        Self {
            service,
            keys: Arc::new(DidKeyResolver),
        }
    }

    /// Replace the key resolver.
    #[must_use]
    pub fn with_key_resolver(mut self, keys: Arc<dyn KeyResolver>) -> Self {
        self.keys = keys;
        self
    }

    /// Bind middleware to `resource_id`.
    ///
    /// Resolves the resource's root capability now, so misconfiguration
    /// surfaces at startup instead of on the first request.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NotProvisioned`] when no root capability is
    /// stored for the resource.
    pub async fn build(&self, resource_id: &str) -> Result<CapabilityMiddleware, BuildError> {
        let root = self
            .service
            .capability(resource_id)
            .await
            .map_err(|error| match error {
                ResolutionError::Store(error) if error.is_not_found() => {
                    BuildError::NotProvisioned(resource_id.to_string())
                }
                ResolutionError::Store(error) => BuildError::Store(error),
                ResolutionError::Malformed(error) => BuildError::Malformed(error),
            })?;

        tracing::debug!(resource = resource_id, root = root.id(), "bound authorizer");
        Ok(CapabilityMiddleware {
            expectation: InvocationExpectation::new(resource_id, root.id()),
            capabilities: Arc::new(self.service.resolver()),
            keys: Arc::clone(&self.keys),
            contexts: self.service.contexts(),
            reporter: Arc::new(BadRequestReporter),
        })
    }
}

/// Middleware enforcing capability invocations for one resource.
pub struct CapabilityMiddleware {
    expectation: InvocationExpectation,
    capabilities: Arc<dyn CapabilityResolver>,
    keys: Arc<dyn KeyResolver>,
    contexts: Arc<ContextCache>,
    reporter: Arc<dyn ErrorReporter>,
}

impl CapabilityMiddleware {
    /// Replace the error reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The expectation every invocation must satisfy.
    #[must_use]
    pub fn expectation(&self) -> &InvocationExpectation {
        &self.expectation
    }

    /// Authorize `request` and, on success, hand it to `next` untouched.
    ///
    /// On failure the reporter's response is returned and `next` is never
    /// called.
    pub async fn handle<B, F, Fut>(&self, request: Request<B>, next: F) -> Response<Full<Bytes>>
    where
        B: Send,
        F: FnOnce(Request<B>) -> Fut,
        Fut: Future<Output = Response<Full<Bytes>>>,
    {
        match self.authorize(&request).await {
            Ok(()) => next(request).await,
            Err(error) => self.reporter.report(&error),
        }
    }

    /// Run the full authorization pipeline against `request`.
    ///
    /// Checks, in order: the invocation headers parse, the presented
    /// action matches what the method requires, the HTTP signature
    /// verifies, the invoked capability resolves, its chain verifies back
    /// to this resource's root, and the invoker and action are permitted
    /// by the presented capability.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError`] naming the first failed check.
    pub async fn authorize<B>(&self, request: &Request<B>) -> Result<(), AuthorizeError> {
        let required = required_action(request.method());
        let invocation = InvocationProof::from_request(request)?;
        if invocation.action != required {
            return Err(AuthorizeError::ActionMismatch {
                required,
                presented: invocation.action,
            });
        }

        invocation.verify(request, self.keys.as_ref())?;

        let capability = self
            .capabilities
            .resolve(&invocation.capability_id)
            .await
            .map_err(|source| AuthorizeError::Capability {
                id: invocation.capability_id.clone(),
                source,
            })?;

        verify_chain(
            &capability,
            &self.expectation,
            self.capabilities.as_ref(),
            self.keys.as_ref(),
            self.contexts.as_ref(),
        )
        .await?;

        check_invocation(&capability, &invocation.key_id, required)?;
        Ok(())
    }
}

//! Delegable, signed authorization capabilities for a document vault.
//!
//! A resource owner mints a **root capability** anchoring a resource,
//! then mints **delegated capabilities** naming an invoker and an allowed
//! action set. At request time an authorizer resolves the resource's root
//! from the store, verifies a presented invocation's signature chain back
//! to that root, and checks the action and target before letting the
//! request through.
//!
//! This crate holds the capability document model, the Ed25519
//! linked-data proof suite and its pinned context cache, the issuing
//! [`CapabilityService`], and chain verification. The HTTP middleware
//! that enforces capabilities per request lives in `zcap-http`.

mod capability;
mod context;
mod error;
mod service;
pub mod suite;
mod verify;

pub use capability::{
    Action, Capability, CapabilityBuilder, InvocationTarget, Proof, VAULT_RESOURCE_TYPE,
};
pub use context::{
    ChainedLoader, ContextCache, DocumentLoader, SECURITY_V1_CONTEXT, SECURITY_V2_CONTEXT,
    with_fallback,
};
pub use error::{
    CanonicalizeError, InitializationError, IssueError, MalformedCapabilityError, ResolutionError,
    SigningError, VerificationError,
};
pub use service::{
    CAPABILITY_STORE_NAME, CapabilityResolver, CapabilityService, StoreCapabilityResolver,
};
pub use verify::{InvocationExpectation, check_invocation, verify_chain};

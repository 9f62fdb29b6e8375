use crate::capability::Action;
use thiserror::Error;
use zcap_did::{Did, KeyError, ResolveError};
use zcap_store::StoreError;

/// Fatal error while constructing the context cache.
///
/// The service cannot produce or verify signatures without its pinned
/// vocabulary documents, so this aborts construction.
#[derive(Debug, Error)]
#[error("failed to parse embedded context {uri}: {source}")]
pub struct InitializationError {
    /// URI of the vocabulary document that failed to parse.
    pub uri: String,
    /// The underlying parse error.
    #[source]
    pub source: serde_json::Error,
}

/// Error while producing the canonical signing input for a document.
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    /// The document references a vocabulary the loader cannot supply.
    #[error("unknown context: {0}")]
    UnknownContext(String),

    /// Canonical serialization failed.
    #[error("failed to encode canonical document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Error while producing a capability proof.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The capability under construction names no invocation target.
    #[error("capability has no invocation target")]
    MissingInvocationTarget,

    /// Key generation or the signature operation failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The document could not be canonicalized for signing.
    #[error(transparent)]
    Canonicalize(#[from] CanonicalizeError),
}

/// A stored document failed to deserialize or violates the capability schema.
#[derive(Debug, Error)]
pub enum MalformedCapabilityError {
    /// Not valid JSON, or missing required members.
    #[error("failed to deserialize capability: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally valid JSON that violates a capability invariant.
    #[error("invalid capability: {0}")]
    Schema(String),
}

/// Error while resolving a capability id to a stored capability.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The store lookup failed or the id is unknown.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored document is not a valid capability.
    #[error(transparent)]
    Malformed(#[from] MalformedCapabilityError),
}

/// Error while minting a capability.
#[derive(Debug, Error)]
pub enum IssueError {
    /// Key generation or signing failed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Persisting the signed capability failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Serializing the signed capability failed.
    #[error("failed to serialize capability: {0}")]
    Encode(#[from] serde_json::Error),

    /// The stored root capability for the resource is unreadable.
    #[error(transparent)]
    Malformed(MalformedCapabilityError),
}

/// Error while verifying an invocation against a capability chain.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// The capability carries no proof.
    #[error("capability {0} has no proof")]
    MissingProof(String),

    /// The proof names a signature suite this verifier does not support.
    #[error("unsupported proof type: {0}")]
    UnsupportedProofType(String),

    /// The proof carries no signature value.
    #[error("proof has no proofValue")]
    MissingProofValue,

    /// The signature value is not valid base64 or not a valid signature.
    #[error("malformed proofValue: {0}")]
    MalformedProofValue(String),

    /// The document could not be canonicalized for verification.
    #[error(transparent)]
    Canonicalize(#[from] CanonicalizeError),

    /// The proof's verification method could not be resolved to a key.
    #[error(transparent)]
    Key(#[from] ResolveError),

    /// The cryptographic signature check failed.
    #[error("invalid signature: {0}")]
    Signature(#[from] signature::Error),

    /// A capability in the chain targets a different resource.
    #[error("invocation target mismatch: expected {expected}, found {found}")]
    TargetMismatch {
        /// The resource the middleware is bound to.
        expected: String,
        /// The resource the capability actually targets.
        found: String,
    },

    /// The chain terminates at a root other than the bound one.
    #[error("root capability mismatch: expected {expected}, found {found}")]
    RootMismatch {
        /// The root capability id the middleware is bound to.
        expected: String,
        /// The root the presented chain actually names.
        found: String,
    },

    /// Parent pointers and the capability chain disagree.
    #[error("broken capability chain: {0}")]
    BrokenChain(String),

    /// A chain member could not be resolved from the store.
    #[error("failed to resolve capability {id}: {source}")]
    Resolution {
        /// The unresolvable capability id.
        id: String,
        /// Why resolution failed.
        #[source]
        source: ResolutionError,
    },

    /// The invocation was signed by someone other than the capability's invoker.
    #[error("invoker mismatch: capability permits {expected}, invoked by {found}")]
    InvokerMismatch {
        /// The identity the capability permits.
        expected: Did,
        /// The identity that signed the invocation.
        found: Did,
    },

    /// The required action is not among the capability's allowed actions.
    #[error("action not allowed: {0}")]
    ActionNotAllowed(Action),
}

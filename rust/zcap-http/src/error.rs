use thiserror::Error;
use zcap::{Action, MalformedCapabilityError, ResolutionError, VerificationError};
use zcap_did::{DidParseError, KeyError, ResolveError};
use zcap_store::StoreError;

/// Fatal error while binding the middleware to a resource.
///
/// Surfaced synchronously so an unprotected resource is never exposed.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The resource has never been provisioned: no root capability stored.
    #[error("resource {0} has no root capability")]
    NotProvisioned(String),

    /// The capability store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored root capability is unreadable.
    #[error(transparent)]
    Malformed(#[from] MalformedCapabilityError),
}

/// Error while attaching invocation headers to an outgoing request.
#[derive(Debug, Error)]
pub enum SignRequestError {
    /// The signature operation failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// A constructed header value was not valid ASCII.
    #[error("invalid header value: {0}")]
    Header(#[from] hyper::header::InvalidHeaderValue),
}

/// A per-request authorization failure.
///
/// Funneled to the [`ErrorReporter`][crate::ErrorReporter], never
/// propagated past the middleware.
#[derive(Debug, Error)]
pub enum AuthorizeError {
    /// A required invocation header is absent.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// An invocation header could not be parsed.
    #[error("malformed {header} header: {reason}")]
    MalformedHeader {
        /// The offending header name.
        header: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// The invocation names an action other than the one the request
    /// method requires.
    #[error("invocation action {presented} does not match required action {required}")]
    ActionMismatch {
        /// The action derived from the request method.
        required: Action,
        /// The action the invocation header presents.
        presented: Action,
    },

    /// The invoking key identifier is not a DID.
    #[error(transparent)]
    Did(#[from] DidParseError),

    /// The invoking key could not be resolved.
    #[error(transparent)]
    Key(#[from] ResolveError),

    /// The HTTP signature over the invocation did not verify.
    #[error("invalid invocation signature: {0}")]
    InvalidSignature(#[from] signature::Error),

    /// The presented capability could not be resolved from the store.
    #[error("failed to resolve invoked capability {id}: {source}")]
    Capability {
        /// The capability id the invocation presented.
        id: String,
        /// Why resolution failed.
        #[source]
        source: ResolutionError,
    },

    /// Chain or invocation verification failed.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

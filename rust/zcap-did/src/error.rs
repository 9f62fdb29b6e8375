use thiserror::Error;

/// Error when parsing a DID string.
#[derive(Debug, Clone, Error)]
#[error("invalid DID: {0}")]
pub struct DidParseError(pub String);

/// Errors produced by key generation and signing.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The system RNG failed while generating a key seed.
    #[error("failed to gather key entropy: {0}")]
    Rng(getrandom::Error),

    /// The signing operation itself failed.
    #[error("signing failed: {0}")]
    Signing(#[from] signature::Error),
}

/// Errors produced while resolving a verification method to a public key.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The identifier is not a DID at all.
    #[error(transparent)]
    Did(#[from] DidParseError),

    /// Only the `did:key` method is supported by the default resolver.
    #[error("unsupported DID method: {0}")]
    UnsupportedMethod(String),

    /// The fingerprint is not multibase base58btc (`z` prefix).
    #[error("fingerprint is missing the base58btc multibase prefix")]
    MissingMultibasePrefix,

    /// The fingerprint did not decode to a multicodec Ed25519 public key.
    #[error("invalid did:key fingerprint")]
    InvalidFingerprint,

    /// The decoded bytes are not a valid Ed25519 public key.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidKey(signature::Error),
}

//! DID identities for the capability layer.
//!
//! This crate provides the identity primitives the capability service is
//! built on:
//!
//! - [`Did`], a validated DID string
//! - [`Ed25519Signer`] / [`Ed25519Verifier`], `did:key` keypairs whose
//!   identifier is computed from the public key fingerprint
//! - [`KeyManager`], the boundary to the key-generation service
//! - [`KeyResolver`] / [`DidKeyResolver`], mapping a verification-method
//!   identifier back to a public key without any network resolution

mod did;
mod error;
mod key;
mod resolver;

pub use did::Did;
pub use error::{DidParseError, KeyError, ResolveError};
pub use key::{Ed25519Signer, Ed25519Verifier, KeyManager, LocalKeyManager, Principal};
pub use resolver::{DidKeyResolver, KeyResolver};

//! Ed25519 `did:key` signing and verification.
//!
//! The verification-method identifier of a key is never assigned — it is
//! computed from the public key fingerprint (multicodec `0xed 0x01` prefix,
//! base58btc, `z` multibase marker), so a capability's signer identity is
//! cryptographically bound to its key material.

use crate::{did::Did, error::KeyError};
use async_trait::async_trait;
use base58::ToBase58;
use signature::{Signer, Verifier};
use std::fmt;

/// Multicodec prefix for an Ed25519 public key.
pub(crate) const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// An entity identified by a [`Did`].
///
/// Implemented by anything that has a DID — key types, signers, resolvers'
/// outputs. Does not imply any cryptographic capability.
pub trait Principal {
    /// Returns this entity's DID.
    fn did(&self) -> Did;
}

impl Principal for Did {
    fn did(&self) -> Did {
        self.clone()
    }
}

/// An Ed25519 `did:key` verifying key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ed25519Verifier(ed25519_dalek::VerifyingKey);

impl Ed25519Verifier {
    /// Get the raw public key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// The multibase fingerprint of this key (`z6Mk...`).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut raw = Vec::with_capacity(34);
        raw.extend_from_slice(&ED25519_MULTICODEC);
        raw.extend_from_slice(&self.to_bytes());
        format!("z{}", raw.as_slice().to_base58())
    }

    /// The verification-method URL for this key: `did:key:z6Mk...#z6Mk...`.
    ///
    /// # Panics
    ///
    /// Never panics in practice; the constructed string is always a valid DID.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn verification_method(&self) -> Did {
        let fingerprint = self.fingerprint();
        format!("did:key:{fingerprint}#{fingerprint}")
            .parse()
            .expect("fingerprint DID URL is well formed")
    }

    /// Verify `signature` over `msg` with this key.
    ///
    /// # Errors
    ///
    /// Returns `signature::Error` if verification fails.
    pub fn verify(
        &self,
        msg: &[u8],
        signature: &ed25519_dalek::Signature,
    ) -> Result<(), signature::Error> {
        self.0.verify(msg, signature)
    }
}

impl From<ed25519_dalek::VerifyingKey> for Ed25519Verifier {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Ed25519Verifier(key)
    }
}

impl fmt::Display for Ed25519Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:key:{}", self.fingerprint())
    }
}

impl Principal for Ed25519Verifier {
    #[allow(clippy::expect_used)]
    fn did(&self) -> Did {
        self.to_string().parse().expect("valid DID string")
    }
}

/// An Ed25519 `did:key` signer.
#[derive(Debug, Clone)]
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Generate a new Ed25519 keypair from system entropy.
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails.
    pub fn generate() -> Result<Self, KeyError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed).map_err(KeyError::Rng)?;
        Ok(Self {
            key: ed25519_dalek::SigningKey::from_bytes(&seed),
        })
    }

    /// Import a keypair from a 32-byte seed.
    #[must_use]
    pub fn import(seed: &[u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Sign a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing operation fails.
    pub fn sign(&self, msg: &[u8]) -> Result<ed25519_dalek::Signature, KeyError> {
        Ok(self.key.try_sign(msg)?)
    }

    /// Get the raw public key bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    /// Get the verifying half of this keypair.
    #[must_use]
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier(self.key.verifying_key())
    }

    /// The verification-method URL for this key.
    #[must_use]
    pub fn verification_method(&self) -> Did {
        self.verifier().verification_method()
    }
}

impl From<ed25519_dalek::SigningKey> for Ed25519Signer {
    fn from(key: ed25519_dalek::SigningKey) -> Self {
        Self { key }
    }
}

impl Principal for Ed25519Signer {
    fn did(&self) -> Did {
        self.verifier().did()
    }
}

/// Boundary to the key-generation service.
///
/// The capability factory mints one fresh signing key per capability, so
/// compromise of one delegation's key never affects another.
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Generate a fresh signing key.
    async fn generate_signing_key(&self) -> Result<Ed25519Signer, KeyError>;
}

/// A [`KeyManager`] that generates keys in-process from system entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalKeyManager;

#[async_trait]
impl KeyManager for LocalKeyManager {
    async fn generate_signing_key(&self) -> Result<Ed25519Signer, KeyError> {
        Ed25519Signer::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn fingerprint_identifies_ed25519_keys() -> TestResult {
        let signer = Ed25519Signer::import(&[7u8; 32]);
        let did = signer.did();
        assert_eq!(did.method(), "key");
        // multicodec 0xed01 + base58btc always yields a 6Mk prefix
        assert!(did.identifier().starts_with("z6Mk"));
        Ok(())
    }

    #[test]
    fn verification_method_carries_fragment() -> TestResult {
        let signer = Ed25519Signer::import(&[9u8; 32]);
        let url = signer.verification_method();
        assert_eq!(url.without_fragment(), signer.did());
        assert!(url.as_str().contains('#'));
        Ok(())
    }

    #[test]
    fn sign_verify_round_trip() -> TestResult {
        let signer = Ed25519Signer::import(&[1u8; 32]);
        let signature = signer.sign(b"payload")?;
        signer.verifier().verify(b"payload", &signature)?;
        assert!(signer.verifier().verify(b"other", &signature).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn local_key_manager_mints_distinct_keys() -> TestResult {
        let manager = LocalKeyManager;
        let a = manager.generate_signing_key().await?;
        let b = manager.generate_signing_key().await?;
        assert_ne!(a.did(), b.did());
        Ok(())
    }
}

//! Verification-method resolution.

use crate::{
    did::Did,
    error::ResolveError,
    key::{ED25519_MULTICODEC, Ed25519Verifier},
};
use base58::FromBase58;

/// Resolves a verification-method identifier to a public key.
///
/// The default configuration performs no network resolution: `did:key`
/// identifiers carry their key material in the fingerprint itself.
pub trait KeyResolver: Send + Sync {
    /// Resolve `verification_method` to a verifying key.
    ///
    /// Fragments are ignored: `did:key:z6Mk...#z6Mk...` resolves the same
    /// as its base DID.
    fn resolve(&self, verification_method: &Did) -> Result<Ed25519Verifier, ResolveError>;
}

/// Deterministic `did:key` resolver.
///
/// Decodes the multibase fingerprint back into the Ed25519 public key it
/// was derived from. No I/O, no caching, no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct DidKeyResolver;

impl KeyResolver for DidKeyResolver {
    fn resolve(&self, verification_method: &Did) -> Result<Ed25519Verifier, ResolveError> {
        let did = verification_method.without_fragment();
        if did.method() != "key" {
            return Err(ResolveError::UnsupportedMethod(did.method().to_string()));
        }

        let fingerprint = did
            .identifier()
            .strip_prefix('z')
            .ok_or(ResolveError::MissingMultibasePrefix)?;
        let raw = fingerprint
            .from_base58()
            .map_err(|_| ResolveError::InvalidFingerprint)?;
        let raw: [u8; 34] = raw
            .as_slice()
            .try_into()
            .map_err(|_| ResolveError::InvalidFingerprint)?;
        if raw[..2] != ED25519_MULTICODEC {
            return Err(ResolveError::InvalidFingerprint);
        }

        let key_bytes: [u8; 32] = raw[2..]
            .try_into()
            .map_err(|_| ResolveError::InvalidFingerprint)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
            .map_err(ResolveError::InvalidKey)?;
        Ok(Ed25519Verifier::from(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Ed25519Signer, Principal};
    use testresult::TestResult;

    #[test]
    fn resolves_fingerprint_back_to_key() -> TestResult {
        let signer = Ed25519Signer::import(&[42u8; 32]);
        let resolved = DidKeyResolver.resolve(&signer.did())?;
        assert_eq!(resolved, signer.verifier());
        Ok(())
    }

    #[test]
    fn resolves_verification_method_url() -> TestResult {
        let signer = Ed25519Signer::import(&[43u8; 32]);
        let resolved = DidKeyResolver.resolve(&signer.verification_method())?;

        let signature = signer.sign(b"invocation")?;
        resolved.verify(b"invocation", &signature)?;
        Ok(())
    }

    #[test]
    fn rejects_other_did_methods() -> TestResult {
        let did: Did = "did:web:example.com".parse()?;
        assert!(matches!(
            DidKeyResolver.resolve(&did),
            Err(ResolveError::UnsupportedMethod(_))
        ));
        Ok(())
    }

    #[test]
    fn rejects_corrupt_fingerprints() -> TestResult {
        let did: Did = "did:key:6MkNoMultibase".parse()?;
        assert!(matches!(
            DidKeyResolver.resolve(&did),
            Err(ResolveError::MissingMultibasePrefix)
        ));

        let did: Did = "did:key:zNotAFingerprint".parse()?;
        assert!(DidKeyResolver.resolve(&did).is_err());
        Ok(())
    }
}

//! The Ed25519 linked-data proof suite.
//!
//! Proofs are produced over a deterministic canonical form of the
//! capability document: JSON with lexicographically ordered object keys
//! and no insignificant whitespace, with the `proof` member removed,
//! concatenated with the canonical form of the proof options (the proof
//! without its `proofValue`). Every `@context` URI the document names
//! must be supplied by the [`DocumentLoader`] or canonicalization fails —
//! signatures are never computed against vocabularies the process does
//! not pin.

use crate::{
    capability::{Capability, Proof},
    context::DocumentLoader,
    error::{CanonicalizeError, SigningError, VerificationError},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use serde_json::Value;
use zcap_did::KeyResolver;

/// The signature suite identifier carried in `proof.type`.
pub const ED25519_SIGNATURE_2018: &str = "Ed25519Signature2018";

/// The proof purpose for both root and delegated capabilities.
pub const CAPABILITY_DELEGATION: &str = "capabilityDelegation";

/// Serialize a JSON value in canonical form.
///
/// `serde_json` object maps are ordered by key, so encoding a [`Value`]
/// yields sorted members; compact encoding removes whitespace.
fn canonical_bytes(value: &Value) -> Result<Vec<u8>, CanonicalizeError> {
    Ok(serde_json::to_vec(value)?)
}

/// The canonical document: the capability without its proof, with every
/// named context resolved through `loader`.
fn canonical_document(
    capability: &Capability,
    loader: &dyn DocumentLoader,
) -> Result<Vec<u8>, CanonicalizeError> {
    for uri in capability.contexts() {
        if loader.load(uri).is_none() {
            return Err(CanonicalizeError::UnknownContext(uri.clone()));
        }
    }

    let mut document = serde_json::to_value(capability)?;
    if let Some(members) = document.as_object_mut() {
        members.remove("proof");
    }
    canonical_bytes(&document)
}

/// The canonical proof options: the proof without its signature value.
fn canonical_proof_options(proof: &Proof) -> Result<Vec<u8>, CanonicalizeError> {
    let options = Proof {
        proof_value: None,
        ..proof.clone()
    };
    canonical_bytes(&serde_json::to_value(&options)?)
}

/// The byte string a capability proof signs.
pub fn signing_input(
    capability: &Capability,
    proof: &Proof,
    loader: &dyn DocumentLoader,
) -> Result<Vec<u8>, CanonicalizeError> {
    let mut input = canonical_document(capability, loader)?;
    input.extend(canonical_proof_options(proof)?);
    Ok(input)
}

/// Sign `capability` with `signer`, attaching the resulting proof.
///
/// # Errors
///
/// Returns [`SigningError`] when canonicalization or the signature
/// operation fails.
pub fn sign_capability(
    mut capability: Capability,
    signer: &zcap_did::Ed25519Signer,
    loader: &dyn DocumentLoader,
) -> Result<Capability, SigningError> {
    let mut proof = Proof {
        proof_type: ED25519_SIGNATURE_2018.to_string(),
        created: Utc::now(),
        verification_method: signer.verification_method(),
        proof_purpose: CAPABILITY_DELEGATION.to_string(),
        proof_value: None,
    };

    let input = signing_input(&capability, &proof, loader)?;
    let signature = signer.sign(&input)?;
    proof.proof_value = Some(BASE64.encode(signature.to_bytes()));

    capability.attach_proof(proof);
    Ok(capability)
}

/// Verify a single capability's proof.
///
/// Resolves the proof's verification method through `keys`, recomputes
/// the signing input, and checks the signature. Chain semantics are the
/// caller's concern; this checks one document.
///
/// # Errors
///
/// Returns [`VerificationError`] describing the first check that failed.
pub fn verify_capability(
    capability: &Capability,
    keys: &dyn KeyResolver,
    loader: &dyn DocumentLoader,
) -> Result<(), VerificationError> {
    let proof = capability
        .proof()
        .ok_or_else(|| VerificationError::MissingProof(capability.id().to_string()))?;

    if proof.proof_type != ED25519_SIGNATURE_2018 {
        return Err(VerificationError::UnsupportedProofType(
            proof.proof_type.clone(),
        ));
    }

    let encoded = proof
        .proof_value
        .as_deref()
        .ok_or(VerificationError::MissingProofValue)?;
    let signature_bytes = BASE64
        .decode(encoded)
        .map_err(|e| VerificationError::MalformedProofValue(e.to_string()))?;
    let signature = ed25519_dalek::Signature::from_slice(&signature_bytes)
        .map_err(|e| VerificationError::MalformedProofValue(e.to_string()))?;

    let verifier = keys.resolve(&proof.verification_method)?;
    let input = signing_input(capability, proof, loader)?;
    verifier.verify(&input, &signature)?;

    Ok(())
}

//! The capability document model.
//!
//! A capability is a signed JSON-LD document granting a set of actions on
//! one resource. Root capabilities anchor a resource; delegated
//! capabilities name a parent, an invoker, and a chain of ancestor ids
//! proving their lineage back to the root.

use crate::{
    context::{DocumentLoader, SECURITY_V1_CONTEXT, SECURITY_V2_CONTEXT},
    error::{MalformedCapabilityError, SigningError},
    suite,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;
use zcap_did::{Did, Ed25519Signer};

/// The resource-type tag carried by every invocation target.
pub const VAULT_RESOURCE_TYPE: &str = "urn:vault:resource";

/// An action a capability may permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Retrieval of the resource.
    Read,
    /// Any mutation of the resource.
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => f.write_str("read"),
            Action::Write => f.write_str("write"),
        }
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "write" => Ok(Action::Write),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// The resource a capability grants access to, plus its type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationTarget {
    /// The resource identifier.
    pub id: String,

    /// The resource-type tag ([`VAULT_RESOURCE_TYPE`]).
    #[serde(rename = "type")]
    pub target_type: String,
}

impl InvocationTarget {
    /// A vault-resource target for `resource_id`.
    #[must_use]
    pub fn vault(resource_id: &str) -> Self {
        Self {
            id: resource_id.to_string(),
            target_type: VAULT_RESOURCE_TYPE.to_string(),
        }
    }
}

/// A linked-data proof over the canonicalized capability document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// The signature suite ([`suite::ED25519_SIGNATURE_2018`]).
    #[serde(rename = "type")]
    pub proof_type: String,

    /// When the proof was produced.
    pub created: DateTime<Utc>,

    /// The did:key URL of the signing key.
    #[serde(rename = "verificationMethod")]
    pub verification_method: Did,

    /// Why the proof was produced ([`suite::CAPABILITY_DELEGATION`]).
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: String,

    /// Base64 signature bytes; absent only in the pre-signing options form.
    #[serde(rename = "proofValue", skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}

/// A signed, delegable grant of specific actions on a specific resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(rename = "@context")]
    context: Vec<String>,

    id: String,

    #[serde(rename = "invocationTarget")]
    invocation_target: InvocationTarget,

    #[serde(rename = "allowedAction")]
    allowed_actions: Vec<Action>,

    /// The signer's DID, derived from the signing key fingerprint.
    controller: Did,

    #[serde(skip_serializing_if = "Option::is_none")]
    invoker: Option<Did>,

    #[serde(rename = "parentCapability", skip_serializing_if = "Option::is_none")]
    parent: Option<String>,

    /// Ancestor ids, root first, excluding this capability itself.
    #[serde(rename = "capabilityChain", default, skip_serializing_if = "Vec::is_empty")]
    capability_chain: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    proof: Option<Proof>,
}

impl Capability {
    /// Creates a blank [`CapabilityBuilder`].
    #[must_use]
    pub fn builder() -> CapabilityBuilder {
        CapabilityBuilder::default()
    }

    /// Getter for the `id` field.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Getter for the `invocationTarget` field.
    #[must_use]
    pub const fn invocation_target(&self) -> &InvocationTarget {
        &self.invocation_target
    }

    /// Getter for the `allowedAction` field.
    #[must_use]
    pub fn allowed_actions(&self) -> &[Action] {
        &self.allowed_actions
    }

    /// Getter for the `controller` field.
    #[must_use]
    pub const fn controller(&self) -> &Did {
        &self.controller
    }

    /// Getter for the `invoker` field.
    #[must_use]
    pub const fn invoker(&self) -> Option<&Did> {
        self.invoker.as_ref()
    }

    /// Getter for the `parentCapability` field.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Getter for the `capabilityChain` field: ancestor ids, root first,
    /// excluding self.
    #[must_use]
    pub fn capability_chain(&self) -> &[String] {
        &self.capability_chain
    }

    /// Getter for the `proof` field.
    #[must_use]
    pub const fn proof(&self) -> Option<&Proof> {
        self.proof.as_ref()
    }

    /// Getter for the `@context` field.
    #[must_use]
    pub fn contexts(&self) -> &[String] {
        &self.context
    }

    /// Whether this capability anchors a chain (has no parent).
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The id of the chain's root: the first chain entry, or this
    /// capability's own id when it is itself a root.
    #[must_use]
    pub fn root_id(&self) -> &str {
        self.capability_chain.first().map_or(&self.id, |id| id)
    }

    /// Whether `action` is among this capability's allowed actions.
    #[must_use]
    pub fn allows(&self, action: Action) -> bool {
        self.allowed_actions.contains(&action)
    }

    /// Deserialize and structurally validate a stored capability document.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedCapabilityError`] on a JSON parse failure or a
    /// schema violation (empty id, missing proof, chain/parent mismatch).
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedCapabilityError> {
        let capability: Capability = serde_json::from_slice(bytes)?;
        capability.validate()?;
        Ok(capability)
    }

    /// Serialize this capability for storage or transfer.
    ///
    /// # Errors
    ///
    /// Returns the underlying serialization error, which cannot occur for a
    /// structurally valid capability.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub(crate) fn attach_proof(&mut self, proof: Proof) {
        self.proof = Some(proof);
    }

    #[cfg(test)]
    pub(crate) fn with_proof_value(mut self, value: String) -> Self {
        if let Some(proof) = &mut self.proof {
            proof.proof_value = Some(value);
        }
        self
    }

    fn validate(&self) -> Result<(), MalformedCapabilityError> {
        if self.id.is_empty() {
            return Err(MalformedCapabilityError::Schema("empty id".into()));
        }
        if self.context.is_empty() {
            return Err(MalformedCapabilityError::Schema("missing @context".into()));
        }
        if self.invocation_target.id.is_empty() {
            return Err(MalformedCapabilityError::Schema(
                "empty invocation target".into(),
            ));
        }
        if self.proof.is_none() {
            return Err(MalformedCapabilityError::Schema("missing proof".into()));
        }
        match (&self.parent, self.capability_chain.last()) {
            (None, Some(_)) => Err(MalformedCapabilityError::Schema(
                "root capability with non-empty chain".into(),
            )),
            (Some(_), None) => Err(MalformedCapabilityError::Schema(
                "delegated capability with empty chain".into(),
            )),
            (Some(parent), Some(last)) if parent != last => {
                Err(MalformedCapabilityError::Schema(format!(
                    "parent {parent} does not terminate the chain ({last})"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Generate a fresh URN-style capability id.
fn mint_id() -> String {
    format!("urn:zcap:{}", Ulid::new())
}

/// Assembles and signs a [`Capability`].
#[derive(Debug, Default)]
pub struct CapabilityBuilder {
    id: Option<String>,
    invocation_target: Option<InvocationTarget>,
    allowed_actions: Vec<Action>,
    invoker: Option<Did>,
    parent: Option<String>,
    capability_chain: Vec<String>,
}

impl CapabilityBuilder {
    /// Set an explicit id instead of a freshly minted one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Target the vault resource `resource_id`.
    #[must_use]
    pub fn invocation_target(mut self, resource_id: &str) -> Self {
        self.invocation_target = Some(InvocationTarget::vault(resource_id));
        self
    }

    /// Set the permitted actions.
    #[must_use]
    pub fn allowed_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.allowed_actions = actions.into_iter().collect();
        self
    }

    /// Name the identity permitted to invoke this capability.
    #[must_use]
    pub fn invoker(mut self, invoker: Did) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Name the parent this capability is delegated from.
    #[must_use]
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the ancestor chain, root first, excluding self.
    #[must_use]
    pub fn capability_chain(mut self, chain: impl IntoIterator<Item = String>) -> Self {
        self.capability_chain = chain.into_iter().collect();
        self
    }

    /// Build the document and sign it with `signer`.
    ///
    /// The controller and verification method are computed from the
    /// signer's public key fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError`] if no invocation target was set, the
    /// document cannot be canonicalized, or the signature fails.
    pub fn sign(
        self,
        signer: &Ed25519Signer,
        loader: &dyn DocumentLoader,
    ) -> Result<Capability, SigningError> {
        use zcap_did::Principal;

        let invocation_target = self
            .invocation_target
            .ok_or(SigningError::MissingInvocationTarget)?;

        let capability = Capability {
            context: vec![
                SECURITY_V1_CONTEXT.to_string(),
                SECURITY_V2_CONTEXT.to_string(),
            ],
            id: self.id.unwrap_or_else(mint_id),
            invocation_target,
            allowed_actions: self.allowed_actions,
            controller: signer.did(),
            invoker: self.invoker,
            parent: self.parent,
            capability_chain: self.capability_chain,
            proof: None,
        };

        suite::sign_capability(capability, signer, loader)
    }
}

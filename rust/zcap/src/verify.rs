//! Capability chain verification.
//!
//! Walks a presented capability's chain from the capability back to the
//! root it claims, verifying at every link that the proof is valid, the
//! parent pointers are unbroken, and the invocation target never changes.

use crate::{
    capability::{Action, Capability},
    context::DocumentLoader,
    error::VerificationError,
    service::CapabilityResolver,
    suite,
};
use zcap_did::{Did, KeyResolver};

/// What a bound middleware expects every invocation to prove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationExpectation {
    resource_id: String,
    root_id: String,
}

impl InvocationExpectation {
    /// Bind an expectation to a resource and its provisioned root.
    #[must_use]
    pub fn new(resource_id: impl Into<String>, root_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            root_id: root_id.into(),
        }
    }

    /// The protected resource's identifier.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// The id of the resource's root capability.
    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    fn check_target(&self, capability: &Capability) -> Result<(), VerificationError> {
        let found = &capability.invocation_target().id;
        if *found != self.resource_id {
            return Err(VerificationError::TargetMismatch {
                expected: self.resource_id.clone(),
                found: found.clone(),
            });
        }
        Ok(())
    }
}

/// Verify `presented` and every ancestor in its chain against
/// `expectation`.
///
/// Each link is checked for a valid proof, an invocation target equal to
/// the expected resource, and a parent pointer matching the chain; the
/// walk must terminate at a root capability whose id is the expected one.
///
/// # Errors
///
/// Returns [`VerificationError`] describing the first failed check.
pub async fn verify_chain(
    presented: &Capability,
    expectation: &InvocationExpectation,
    capabilities: &dyn CapabilityResolver,
    keys: &dyn KeyResolver,
    loader: &dyn DocumentLoader,
) -> Result<(), VerificationError> {
    expectation.check_target(presented)?;
    suite::verify_capability(presented, keys, loader)?;

    if presented.is_root() {
        if presented.id() != expectation.root_id() {
            return Err(VerificationError::RootMismatch {
                expected: expectation.root_id().to_string(),
                found: presented.id().to_string(),
            });
        }
        return Ok(());
    }

    let chain = presented.capability_chain();
    match chain.first() {
        None => {
            return Err(VerificationError::BrokenChain(
                "delegated capability with empty chain".into(),
            ));
        }
        Some(root_id) if root_id != expectation.root_id() => {
            return Err(VerificationError::RootMismatch {
                expected: expectation.root_id().to_string(),
                found: root_id.clone(),
            });
        }
        Some(_) => {}
    }

    // Walk from the immediate parent (last chain entry) back to the root.
    let mut current = presented.clone();
    for ancestor_id in chain.iter().rev() {
        if current.parent() != Some(ancestor_id.as_str()) {
            return Err(VerificationError::BrokenChain(format!(
                "capability {} does not name {} as its parent",
                current.id(),
                ancestor_id
            )));
        }

        let ancestor = capabilities.resolve(ancestor_id).await.map_err(|source| {
            VerificationError::Resolution {
                id: ancestor_id.clone(),
                source,
            }
        })?;

        expectation.check_target(&ancestor)?;
        suite::verify_capability(&ancestor, keys, loader)?;
        current = ancestor;
    }

    if !current.is_root() {
        return Err(VerificationError::BrokenChain(format!(
            "chain does not terminate at a root capability ({})",
            current.id()
        )));
    }

    Ok(())
}

/// Check the per-invocation conditions on the presented capability: the
/// invoking identity must be its designated invoker (falling back to the
/// controller for capabilities naming none) and the required action must
/// be among its allowed actions.
///
/// # Errors
///
/// Returns [`VerificationError::InvokerMismatch`] or
/// [`VerificationError::ActionNotAllowed`].
pub fn check_invocation(
    capability: &Capability,
    invoker: &Did,
    action: Action,
) -> Result<(), VerificationError> {
    let permitted = capability.invoker().unwrap_or(capability.controller());
    if invoker.without_fragment() != permitted.without_fragment() {
        return Err(VerificationError::InvokerMismatch {
            expected: permitted.clone(),
            found: invoker.clone(),
        });
    }

    if !capability.allows(action) {
        return Err(VerificationError::ActionNotAllowed(action));
    }

    Ok(())
}

//! HTTP enforcement of vault capabilities.
//!
//! A request invoking a capability carries a `capability-invocation`
//! header naming the capability and action, and a `signature` header
//! binding the invoker's key to the request. The
//! [`CapabilityMiddleware`] authorizes the pair against the resource's
//! stored capability chain before the request reaches the inner handler.

mod authorizer;
mod error;
mod invocation;

pub use authorizer::{
    Authorizer, BadRequestReporter, CapabilityMiddleware, ErrorReporter, required_action,
};
pub use error::{AuthorizeError, BuildError, SignRequestError};
pub use invocation::{
    CAPABILITY_INVOCATION_HEADER, InvocationProof, SIGNATURE_HEADER, sign_request, signing_string,
};

//! Invocation headers and the HTTP signature over them.
//!
//! An invoking client presents two headers:
//!
//! ```text
//! capability-invocation: zcap id="urn:zcap:...",action="read"
//! signature: keyId="did:key:z6Mk...",created="1724491022",signature="<base64>"
//! ```
//!
//! The signature covers the request target, the capability id, the action,
//! and the creation timestamp, binding the invocation to one request shape
//! so a captured header pair cannot be replayed against another path or
//! action.

use crate::error::{AuthorizeError, SignRequestError};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::Signature;
use hyper::{
    Method, Request,
    header::{HeaderName, HeaderValue},
};
use zcap::Action;
use zcap_did::{Did, Ed25519Signer, KeyResolver};

/// Header naming the invoked capability and action.
pub const CAPABILITY_INVOCATION_HEADER: &str = "capability-invocation";

/// Header carrying the invocation signature and its key.
pub const SIGNATURE_HEADER: &str = "signature";

/// Scheme prefix on the capability-invocation header value.
const ZCAP_SCHEME: &str = "zcap ";

/// A parsed capability invocation: both headers, signature decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationProof {
    /// Id of the invoked capability.
    pub capability_id: String,
    /// The action the invoker claims.
    pub action: Action,
    /// Verification method of the invoking key.
    pub key_id: Did,
    /// Unix-seconds timestamp the invocation was signed at.
    pub created: i64,
    /// Ed25519 signature over the signing string.
    pub signature: Vec<u8>,
}

impl InvocationProof {
    /// Parse the invocation headers off `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError::MissingHeader`] or
    /// [`AuthorizeError::MalformedHeader`] describing the first header
    /// that fails to parse.
    pub fn from_request<B>(request: &Request<B>) -> Result<Self, AuthorizeError> {
        let invocation = header_str(request, CAPABILITY_INVOCATION_HEADER)?;
        let invocation = invocation.strip_prefix(ZCAP_SCHEME).ok_or_else(|| {
            AuthorizeError::MalformedHeader {
                header: CAPABILITY_INVOCATION_HEADER,
                reason: "expected zcap scheme".into(),
            }
        })?;

        let capability_id = param(invocation, "id", CAPABILITY_INVOCATION_HEADER)?;
        let action: Action = param(invocation, "action", CAPABILITY_INVOCATION_HEADER)?
            .parse()
            .map_err(|reason| AuthorizeError::MalformedHeader {
                header: CAPABILITY_INVOCATION_HEADER,
                reason,
            })?;

        let signature_header = header_str(request, SIGNATURE_HEADER)?;
        let key_id: Did = param(signature_header, "keyId", SIGNATURE_HEADER)?.parse()?;
        let created: i64 = param(signature_header, "created", SIGNATURE_HEADER)?
            .parse()
            .map_err(|_| AuthorizeError::MalformedHeader {
                header: SIGNATURE_HEADER,
                reason: "created is not a unix timestamp".into(),
            })?;
        let signature = BASE64
            .decode(param(signature_header, "signature", SIGNATURE_HEADER)?)
            .map_err(|error| AuthorizeError::MalformedHeader {
                header: SIGNATURE_HEADER,
                reason: format!("signature is not base64: {error}"),
            })?;

        Ok(Self {
            capability_id,
            action,
            key_id,
            created,
            signature,
        })
    }

    /// Verify this invocation's signature against the request it arrived
    /// on, resolving the invoking key through `keys`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizeError::Key`] if the key does not resolve, or
    /// [`AuthorizeError::InvalidSignature`] if the signature does not
    /// cover this request.
    pub fn verify<B>(
        &self,
        request: &Request<B>,
        keys: &dyn KeyResolver,
    ) -> Result<(), AuthorizeError> {
        let verifier = keys.resolve(&self.key_id)?;
        let signature = Signature::from_slice(&self.signature)?;
        let input = signing_string(
            request.method(),
            request.uri().path(),
            &self.capability_id,
            self.action,
            self.created,
        );
        verifier.verify(input.as_bytes(), &signature)?;
        Ok(())
    }
}

/// The canonical byte string an invocation signature covers.
#[must_use]
pub fn signing_string(
    method: &Method,
    path: &str,
    capability_id: &str,
    action: Action,
    created: i64,
) -> String {
    format!(
        "(request-target): {} {}\ncapability: {}\naction: {}\ncreated: {}",
        method.as_str().to_lowercase(),
        path,
        capability_id,
        action,
        created
    )
}

/// Sign `request` as an invocation of `capability_id`, attaching both
/// invocation headers.
///
/// # Errors
///
/// Returns [`SignRequestError`] if signing fails or a header value cannot
/// be constructed.
pub fn sign_request<B>(
    request: &mut Request<B>,
    signer: &Ed25519Signer,
    capability_id: &str,
    action: Action,
) -> Result<(), SignRequestError> {
    let created = chrono::Utc::now().timestamp();
    let input = signing_string(
        request.method(),
        request.uri().path(),
        capability_id,
        action,
        created,
    );
    let signature = signer.sign(input.as_bytes())?;

    let invocation = format!("{ZCAP_SCHEME}id=\"{capability_id}\",action=\"{action}\"");
    let signature_value = format!(
        "keyId=\"{}\",created=\"{created}\",signature=\"{}\"",
        signer.verification_method(),
        BASE64.encode(signature.to_bytes())
    );

    let headers = request.headers_mut();
    headers.insert(
        HeaderName::from_static(CAPABILITY_INVOCATION_HEADER),
        HeaderValue::from_str(&invocation)?,
    );
    headers.insert(
        HeaderName::from_static(SIGNATURE_HEADER),
        HeaderValue::from_str(&signature_value)?,
    );
    Ok(())
}

fn header_str<'r, B>(
    request: &'r Request<B>,
    name: &'static str,
) -> Result<&'r str, AuthorizeError> {
    request
        .headers()
        .get(name)
        .ok_or(AuthorizeError::MissingHeader(name))?
        .to_str()
        .map_err(|_| AuthorizeError::MalformedHeader {
            header: name,
            reason: "value is not visible ASCII".into(),
        })
}

/// Pull `name="value"` out of a comma-separated parameter list.
fn param(value: &str, name: &str, header: &'static str) -> Result<String, AuthorizeError> {
    for part in value.split(',') {
        let Some((key, raw)) = part.trim().split_once('=') else {
            continue;
        };
        if key != name {
            continue;
        }
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|inner| inner.strip_suffix('"'))
            .ok_or_else(|| AuthorizeError::MalformedHeader {
                header,
                reason: format!("{name} parameter is not quoted"),
            })?;
        return Ok(unquoted.to_string());
    }
    Err(AuthorizeError::MalformedHeader {
        header,
        reason: format!("missing {name} parameter"),
    })
}

//! HMAC-SHA1 request signing for the hosting API.
//!
//! # Signing Scheme
//!
//! Every API request is reduced to a canonical string of four lines:
//!
//! ```text
//! {VERB}\n{sha1_hex(body) or ""}\n{date}\n{uri_path}
//! ```
//!
//! The signature is the base64-encoded HMAC-SHA1 of that string keyed with
//! the account's secret key. It travels in two headers:
//!
//! ```text
//! Date: Tue, 06 Oct 2026 14:02:11 GMT
//! X-Authentication: {access_key}:{base64_signature}
//! ```
//!
//! The `Date` header must carry the exact string used in the canonical form.
//! The URI is the path only; query parameters are not signed.
//!
//! # Example
//!
//! ```rust
//! use hive_sdk::api::signer::RequestSigner;
//!
//! let signer = RequestSigner::new("access-key", "secret-key");
//! let date = "Tue, 06 Oct 2026 14:02:11 GMT";
//! let header = signer.authentication_header("GET", b"", date, "/v1/cms/content-types/");
//!
//! assert!(header.starts_with("access-key:"));
//! assert!(signer.verify(&header, "GET", b"", date, "/v1/cms/content-types/").is_ok());
//! ```

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use thiserror::Error;

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA1 type alias
type HmacSha1 = Hmac<Sha1>;

/// Name of the header carrying `access_key:signature`.
pub const AUTH_HEADER: &str = "X-Authentication";

/// Name of the header carrying the signed timestamp.
pub const DATE_HEADER: &str = "Date";

/// RFC 1123 date format used in the `Date` header.
const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Signature verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Header is not of the form `access_key:signature`
    #[error("Malformed authentication header")]
    MalformedHeader,

    /// Header names a different access key
    #[error("Unknown access key")]
    UnknownAccessKey,

    /// Signature is not valid base64
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Signature does not match the request
    #[error("Invalid signature")]
    InvalidSignature,
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// Value for the `Date` header
    pub date: String,

    /// Value for the `X-Authentication` header
    pub authentication: String,
}

// =============================================================================
// Request Signer
// =============================================================================

/// Signs and verifies API requests with an access key / secret key pair.
#[derive(Clone)]
pub struct RequestSigner {
    access_key: String,
    secret_key: Vec<u8>,
}

impl RequestSigner {
    /// Create a signer for the given key pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Compute the base64 signature for a request.
    pub fn sign(&self, verb: &str, body: &[u8], date: &str, uri: &str) -> String {
        BASE64.encode(self.compute_mac(verb, body, date, uri))
    }

    /// Build the `X-Authentication` header value for a request.
    pub fn authentication_header(&self, verb: &str, body: &[u8], date: &str, uri: &str) -> String {
        format!("{}:{}", self.access_key, self.sign(verb, body, date, uri))
    }

    /// Sign a request at the current time.
    pub fn sign_now(&self, verb: &str, body: &[u8], uri: &str) -> SignedHeaders {
        self.sign_at(verb, body, uri, Utc::now())
    }

    /// Sign a request at a fixed time.
    pub fn sign_at(&self, verb: &str, body: &[u8], uri: &str, at: DateTime<Utc>) -> SignedHeaders {
        let date = date_header(at);
        let authentication = self.authentication_header(verb, body, &date, uri);
        SignedHeaders {
            date,
            authentication,
        }
    }

    /// Verify an `X-Authentication` header against a request.
    ///
    /// The signature comparison is constant-time.
    pub fn verify(
        &self,
        header: &str,
        verb: &str,
        body: &[u8],
        date: &str,
        uri: &str,
    ) -> Result<(), SignatureError> {
        let (access_key, signature) = header
            .rsplit_once(':')
            .ok_or(SignatureError::MalformedHeader)?;

        if access_key.is_empty() || signature.is_empty() {
            return Err(SignatureError::MalformedHeader);
        }
        if access_key != self.access_key {
            return Err(SignatureError::UnknownAccessKey);
        }

        let provided = BASE64
            .decode(signature)
            .map_err(|_| SignatureError::InvalidSignatureFormat)?;
        let expected = self.compute_mac(verb, body, date, uri);

        if provided.ct_eq(&expected).into() {
            Ok(())
        } else {
            Err(SignatureError::InvalidSignature)
        }
    }

    fn compute_mac(&self, verb: &str, body: &[u8], date: &str, uri: &str) -> Vec<u8> {
        let message = canonical_string(verb, body, date, uri);

        let mut mac =
            HmacSha1::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Canonical Form
// =============================================================================

/// Build the newline-joined canonical string for a request.
pub fn canonical_string(verb: &str, body: &[u8], date: &str, uri: &str) -> String {
    format!("{}\n{}\n{}\n{}", verb, content_digest(body), date, uri)
}

/// SHA-1 hex digest of a request body, or the empty string for no body.
pub fn content_digest(body: &[u8]) -> String {
    if body.is_empty() {
        String::new()
    } else {
        hex::encode(Sha1::digest(body))
    }
}

/// Format a timestamp for the `Date` header.
pub fn date_header(at: DateTime<Utc>) -> String {
    at.format(RFC1123_FORMAT).to_string()
}

// =============================================================================
// Tests
// =============================================================================

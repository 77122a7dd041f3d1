//! HMAC-SHA256 signing of relay-to-relay deliveries.
//!
//! A relay that delivers an envelope straight to its peer's webhook signs the
//! exact request body with the secret both relays share. The header is:
//!
//! ```text
//! X-LibRelay-Signature: {unix_timestamp}.{hex_hmac}
//! ```
//!
//! where `hex_hmac = HMAC-SHA256("{unix_timestamp}.{body}", secret)`. The
//! receiver recomputes the HMAC over the bytes it received and refuses
//! signatures older (or newer) than [`MAX_SIGNATURE_AGE`] seconds.

use chrono::Utc;
use ring::hmac;
use thiserror::Error;

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-librelay-signature";

/// Maximum clock distance, in seconds, between signer and verifier.
pub const MAX_SIGNATURE_AGE: i64 = 5 * 60;

/// Why a delivery's signature was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header is missing")]
    Missing,
    #[error("signature header is not '{{timestamp}}.{{hex}}'")]
    InvalidFormat,
    #[error("signature does not match the body")]
    Mismatch,
    #[error("signature timestamp is outside the accepted window")]
    Expired,
}

/// The secret shared by the two relays of a bridge.
#[derive(Clone)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Returns `None` for an empty secret.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret.into_bytes()))
        }
    }

    fn key(&self) -> hmac::Key {
        hmac::Key::new(hmac::HMAC_SHA256, &self.0)
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

fn signed_data(timestamp: i64, body: &[u8]) -> Vec<u8> {
    let mut data = format!("{timestamp}.").into_bytes();
    data.extend_from_slice(body);
    data
}

/// Header value signing `body` at `timestamp`.
pub fn sign_body_at(secret: &SharedSecret, timestamp: i64, body: &[u8]) -> String {
    let tag = hmac::sign(&secret.key(), &signed_data(timestamp, body));
    format!("{timestamp}.{}", hex::encode(tag.as_ref()))
}

/// Header value signing `body` now.
pub fn sign_body(secret: &SharedSecret, body: &[u8]) -> String {
    sign_body_at(secret, Utc::now().timestamp(), body)
}

/// Splits a header value into its timestamp and raw HMAC bytes.
pub fn parse_signature_header(value: &str) -> Result<(i64, Vec<u8>), SignatureError> {
    let (timestamp, tag) = value.split_once('.').ok_or(SignatureError::InvalidFormat)?;
    let timestamp = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidFormat)?;
    let tag = hex::decode(tag.trim()).map_err(|_| SignatureError::InvalidFormat)?;
    Ok((timestamp, tag))
}

/// Verifies `header` against `body` as of `now`.
pub fn verify_body_at(
    secret: &SharedSecret,
    header: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let (timestamp, tag) = parse_signature_header(header.ok_or(SignatureError::Missing)?)?;
    hmac::verify(&secret.key(), &signed_data(timestamp, body), &tag)
        .map_err(|_| SignatureError::Mismatch)?;
    if (now - timestamp).abs() > MAX_SIGNATURE_AGE {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Verifies `header` against `body` as of now.
pub fn verify_body(
    secret: &SharedSecret,
    header: Option<&str>,
    body: &[u8],
) -> Result<(), SignatureError> {
    verify_body_at(secret, header, body, Utc::now().timestamp())
}

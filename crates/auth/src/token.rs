//! Bearer token representation and segment decoding.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};

/// Standard alphabet, lenient about padding and trailing bits.
///
/// URL-safe input is translated to this alphabet before decoding.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Opaque bearer credential issued by the portal API.
///
/// Expected to look like `header.payload.signature`, but nothing about the
/// shape is enforced here: a malformed token is still a token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Split into `(header, payload, signature)`.
    ///
    /// Returns `None` unless there are exactly three `.`-separated segments.
    pub fn segments(&self) -> Option<(&str, &str, &str)> {
        split_segments(&self.0)
    }
}

// Tokens must never end up in logs.
impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AccessToken(<redacted, {} bytes>)", self.0.len())
    }
}

impl From<String> for AccessToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for AccessToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

pub(crate) fn split_segments(token: &str) -> Option<(&str, &str, &str)> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Some((header, payload, signature)),
        _ => None,
    }
}

/// Decode a base64url segment into raw bytes.
///
/// `-`/`_` are mapped back to `+`/`/` and the input is right-padded with `=`
/// to a multiple of four before decoding.
pub fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let rem = standard.len() % 4;
    if rem != 0 {
        standard.extend(std::iter::repeat_n('=', 4 - rem));
    }

    match SEGMENT_ENGINE.decode(standard.as_bytes()) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            tracing::debug!(error = %err, "token segment is not valid base64url");
            None
        }
    }
}

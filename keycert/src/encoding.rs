//! Lenient base64 decoding and request-target escaping.
//!
//! Certificates may use the standard or the URL-safe alphabet, with or
//! without padding. Decoding tries the standard alphabet first and falls back
//! to URL-safe. Non-zero trailing bits are rejected, so distinct encodings
//! never decode to the same bytes.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    DecodeError, Engine,
};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// Standard alphabet, padding optional.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// URL-safe alphabet, padding optional.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Characters left unescaped in a request target besides the unreserved set.
const URI_SAFE: [char; 4] = ['/', '?', '=', '&'];

/// Decodes standard or URL-safe base64, tolerating missing padding.
///
/// Returns the URL-safe error when both alphabets fail.
pub fn decode_base64_lenient(input: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD_LENIENT
        .decode(input)
        .or_else(|_| URL_SAFE_LENIENT.decode(input))
}

/// Percent-encodes a request URI for the response signing string.
///
/// Unreserved characters and `/ ? = &` pass through unchanged; everything
/// else is UTF-8 percent-encoded.
#[must_use]
pub fn encode_request_target(uri: &str) -> String {
    let mut out = String::with_capacity(uri.len());
    let mut start = 0;
    for (idx, sep) in uri.match_indices(|c: char| URI_SAFE.contains(&c)) {
        out.push_str(&urlencoding::encode(&uri[start..idx]));
        out.push_str(sep);
        start = idx + sep.len();
    }
    out.push_str(&urlencoding::encode(&uri[start..]));
    out
}

use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;

/// Parses an `Authorization: Basic <base64(user:pass)>` header value.
/// Returns `None` for any other scheme or for undecodable credentials.
pub fn parse_basic_auth_header(header_value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("Basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;

    Some((user.to_string(), pass.to_string()))
}

/// Compares a presented secret with the configured one in constant time
pub fn keys_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

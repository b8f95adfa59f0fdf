//! Format checks for user-supplied identifiers.

/// ISO 3166-1 alpha-2 shape: exactly two ASCII uppercase letters.
///
/// Only the shape is checked, not membership in the official list.
pub fn is_valid_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Shape of a DID: `did:<method>:<method-specific-id>`.
///
/// The method is ASCII alphanumeric; the identifier may also contain
/// `.`, `_` and `-`. A second `:` separator is rejected.
pub fn is_valid_did(did: &str) -> bool {
    let Some(rest) = did.strip_prefix("did:") else {
        return false;
    };
    let Some((method, id)) = rest.split_once(':') else {
        return false;
    };

    !method.is_empty()
        && method.bytes().all(|b| b.is_ascii_alphanumeric())
        && !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

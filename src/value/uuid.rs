//! UUID parsing in the forms accepted by RDL
//!
//! Only the hyphenated 36-character form is accepted, optionally prefixed
//! with `urn:uuid:` (in any letter case).

pub use ::uuid::Uuid;

const URN_PREFIX: &str = "urn:uuid:";

pub fn parse_uuid(s: &str) -> Option<Uuid> {
    let body = match s.len() {
        36 => s,
        45 => match s.get(..URN_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(URN_PREFIX) => &s[URN_PREFIX.len()..],
            _ => return None,
        },
        _ => return None,
    };
    let bytes = body.as_bytes();
    if [8, 13, 18, 23].iter().any(|&ix| bytes[ix] != b'-') {
        return None;
    }
    Uuid::parse_str(body).ok()
}

/// Wraps a 16-byte slice as a UUID.
pub fn uuid_from_slice(bytes: &[u8]) -> Option<Uuid> {
    Uuid::from_slice(bytes).ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_forms() {
        let u = parse_uuid("373ab4c4-fc05-11e4-a198-14109fe4729f").unwrap();
        assert_eq!(u.to_string(), "373ab4c4-fc05-11e4-a198-14109fe4729f");
        assert_eq!(parse_uuid("URN:UUID:373ab4c4-fc05-11e4-a198-14109fe4729f"), Some(u));
        assert_eq!(parse_uuid("373ab4c4fc0511e4a19814109fe4729f"), None);
        assert_eq!(parse_uuid("urn:xxxx:373ab4c4-fc05-11e4-a198-14109fe4729f"), None);
        assert_eq!(parse_uuid("373ab4c4-fc05-11e4-a198-14109fe4729g"), None);
    }

    #[test]
    fn slice_wrapping() {
        assert!(uuid_from_slice(&[0u8; 16]).is_some());
        assert!(uuid_from_slice(&[0u8; 15]).is_none());
    }
}

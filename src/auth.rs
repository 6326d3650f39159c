//! Update client authentication.

use base64::engine::general_purpose;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::hint::black_box;

/// Check a supplied username/password pair against the expected pair.
///
/// Both halves are always compared, and each comparison runs over fixed-size SHA-256 digests,
/// so the time taken depends neither on which field is wrong nor on where the first
/// mismatching character is. Returns `false` if either expected value is empty.
pub fn verify(
    supplied_user: &str,
    supplied_pass: &str,
    expected_user: &str,
    expected_pass: &str,
) -> bool {
    let configured = !expected_user.is_empty() & !expected_pass.is_empty();
    let user_matches = constant_time_eq(supplied_user, expected_user);
    let pass_matches = constant_time_eq(supplied_pass, expected_pass);
    configured & user_matches & pass_matches
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    black_box(diff) == 0
}

/// Decode the username and password of an `Authorization: Basic` header value.
pub fn basic_credentials(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_credentials() {
        assert!(verify("ddns", "hunter2", "ddns", "hunter2"));
    }

    #[test]
    fn any_mismatch_fails() {
        assert!(!verify("ddns", "wrong", "ddns", "hunter2"));
        assert!(!verify("wrong", "hunter2", "ddns", "hunter2"));
        assert!(!verify("wrong", "wrong", "ddns", "hunter2"));
        assert!(!verify("ddns", "hunter", "ddns", "hunter2"));
        assert!(!verify("ddns", "hunter22", "ddns", "hunter2"));
    }

    #[test]
    fn unset_expectations_fail_closed() {
        assert!(!verify("", "", "", ""));
        assert!(!verify("ddns", "", "ddns", ""));
        assert!(!verify("", "hunter2", "", "hunter2"));
    }

    #[test]
    fn basic_header() {
        // "ddns:hunter2"
        assert_eq!(
            basic_credentials("Basic ZGRuczpodW50ZXIy"),
            Some(("ddns".to_string(), "hunter2".to_string()))
        );
        // "ddns:pass:with:colons"
        assert_eq!(
            basic_credentials("basic ZGRuczpwYXNzOndpdGg6Y29sb25z"),
            Some(("ddns".to_string(), "pass:with:colons".to_string()))
        );
        assert_eq!(basic_credentials("Bearer ZGRuczpodW50ZXIy"), None);
        assert_eq!(basic_credentials("Basic !!!"), None);
        // "nocolon"
        assert_eq!(basic_credentials("Basic bm9jb2xvbg=="), None);
    }
}

//! Stable URL fingerprints for log correlation.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 64;

/// Returns the lowercase hexadecimal SHA-256 digest of `url`.
///
/// The digest is computed over the UTF-8 bytes of the URL and is always
/// [`FINGERPRINT_LEN`] characters long. The disk cache uses the same digest
/// as its file stem, so a fingerprint in a log line identifies the file.
pub fn fingerprint(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_known_value() {
        // SHA-256 of the empty string
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_fixed_length_lowercase_hex() {
        let fp = fingerprint("http://a.tile.openstreetmap.org/18/131072/87163.png");
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert!(fp
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_fingerprint_distinguishes_urls() {
        assert_ne!(
            fingerprint("http://a.tile.openstreetmap.org/1/0/0.png"),
            fingerprint("http://a.tile.openstreetmap.org/1/0/1.png")
        );
    }
}

//! Content fingerprints for raw input lines.
//!
//! The fingerprint is the idempotency key stored with every detection:
//! feeding the same line twice yields the same key, so a re-run over an
//! already committed file can be recognised and skipped.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of the line with surrounding whitespace removed.
pub fn line_fingerprint(line: &str) -> String {
    let hash = Sha256::digest(line.trim().as_bytes());
    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_produces_known_hash() {
        assert_eq!(
            line_fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn trailing_carriage_return_does_not_change_key() {
        assert_eq!(line_fingerprint("{\"a\":1}\r"), line_fingerprint("{\"a\":1}"));
    }

    #[test]
    fn different_lines_differ() {
        let a = line_fingerprint("{\"tid\":1}");
        let b = line_fingerprint("{\"tid\":2}");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}

use std::fmt;

use sha2::{Digest, Sha512, digest::Output};

/// The SHA-512 digest of the API token that clients must present.
///
/// Only the digest is kept in memory. Candidate tokens are hashed as well and
/// the digests compared in constant time, so neither the contents nor the
/// length of the token leak through response timings.
#[derive(Clone)]
pub struct TokenDigest(Output<Sha512>);

impl TokenDigest {
    /// Hash the expected `token`.
    pub fn new(token: &str) -> Self {
        Self(Sha512::digest(token.as_bytes()))
    }

    /// Whether `candidate` is the expected token.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = Sha512::digest(candidate.as_bytes());

        self.0
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |difference, (left, right)| difference | (left ^ right))
            == 0
    }
}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenDigest(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::TokenDigest;

    #[test]
    fn matches_same_token() {
        assert!(TokenDigest::new("s3cret").matches("s3cret"));
    }

    #[test]
    fn rejects_other_tokens() {
        let digest = TokenDigest::new("s3cret");

        assert!(!digest.matches("s3cre"));
        assert!(!digest.matches("s3cret "));
        assert!(!digest.matches(""));
    }

    #[test]
    fn debug_does_not_print_digest() {
        assert_eq!(format!("{:?}", TokenDigest::new("s3cret")), "TokenDigest(..)");
    }
}

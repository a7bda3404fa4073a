use std::{fmt, marker::PhantomData};
use sha1::{Digest, Sha1};

use crate::consts::{DIGEST_LENGTH, PREFIX_LENGTH};

// one generic newtype for every hex string we handle, tagged so that a suffix
// can never be handed to something expecting a prefix
pub enum _Digest {}
pub type PasswordDigest = Hex<_Digest>;

pub enum _Prefix {}
pub type HashPrefix = Hex<_Prefix>;

pub enum _Suffix {}
pub type HashSuffix = Hex<_Suffix>;

pub struct Hex<P: ?Sized>(String, PhantomData<P>);

impl<P> Hex<P> {
    fn new(s: String) -> Self {
        Hex(s, PhantomData)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P> Clone for Hex<P> {
    fn clone(&self) -> Self {
        Self::new(self.0.clone())
    }
}

impl<P> PartialEq for Hex<P> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<P> Eq for Hex<P> {}

impl<P> AsRef<str> for Hex<P> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// digests and suffixes must never reach the logs
impl<P> fmt::Debug for Hex<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hex(..)")
    }
}

// the prefix is the only part that is allowed out, so it is the only one we can print
impl fmt::Display for HashPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PasswordDigest {
    /// Uppercase hex SHA-1 of the UTF-8 bytes of `password`, as the range API expects.
    pub fn of(password: &str) -> Self {
        let hash = data_encoding::HEXUPPER.encode(Sha1::digest(password.as_bytes()).as_slice());
        debug_assert_eq!(hash.len(), DIGEST_LENGTH);
        Self::new(hash)
    }

    /// Split into the public prefix sent over the wire and the suffix we keep to ourselves.
    pub fn split(&self) -> (HashPrefix, HashSuffix) {
        let (prefix, suffix) = self.0.split_at(PREFIX_LENGTH);
        (Hex::new(prefix.to_owned()), Hex::new(suffix.to_owned()))
    }
}

impl HashPrefix {
    /// Accepts exactly `PREFIX_LENGTH` hex digits in any case and canonicalizes them to uppercase.
    pub fn parse(s: &str) -> eyre::Result<Self> {
        eyre::ensure!(s.len() == PREFIX_LENGTH, "a hash prefix must be {} characters long", PREFIX_LENGTH);
        eyre::ensure!(s.chars().all(|c| c.is_ascii_hexdigit()), "a hash prefix must only contain hex digits");
        Ok(Self::new(s.to_ascii_uppercase()))
    }

    /// Numeric value of the prefix, in `0..16^PREFIX_LENGTH`.
    pub fn value(&self) -> u32 {
        self.0.chars()
            .filter_map(|c| c.to_digit(16))
            .fold(0, |acc, d| acc * 16 + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SUFFIX_LENGTH;

    #[test]
    fn digest_is_uppercase_sha1() {
        assert_eq!(PasswordDigest::of("password").as_str(), "5BAA61E4C9B93F3F0682250B6CF8331B7EE68FD8");
        assert_eq!(PasswordDigest::of("").as_str(), "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709");
    }

    #[test]
    fn digest_hashes_utf8_bytes() {
        let digest = PasswordDigest::of("é");
        assert_eq!(digest.len(), DIGEST_LENGTH);
        assert_ne!(digest, PasswordDigest::of("e"));
    }

    #[test]
    fn split_reconstructs_digest() {
        for password in ["password", "hunter2", "correct horse battery staple", "пароль", "🔑🔑🔑"] {
            let digest = PasswordDigest::of(password);
            let (prefix, suffix) = digest.split();
            assert_eq!(prefix.len(), PREFIX_LENGTH);
            assert_eq!(suffix.len(), SUFFIX_LENGTH);
            assert_eq!(format!("{}{}", prefix.as_str(), suffix.as_str()), digest.as_str());
        }

        let (prefix, suffix) = PasswordDigest::of("password").split();
        assert_eq!(prefix.as_str(), "5BAA6");
        assert_eq!(suffix.as_str(), "1E4C9B93F3F0682250B6CF8331B7EE68FD8");
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(PasswordDigest::of("hunter2"), PasswordDigest::of("hunter2"));
        assert_ne!(PasswordDigest::of("hunter2"), PasswordDigest::of("Hunter2"));
    }

    #[test]
    fn debug_does_not_leak() {
        let digest = PasswordDigest::of("password");
        let (_, suffix) = digest.split();
        assert!(!format!("{:?}", digest).contains("5BAA6"));
        assert!(!format!("{:?}", suffix).contains("1E4C9"));
    }

    #[test]
    fn prefix_parse() {
        let prefix = HashPrefix::parse("5baa6").unwrap();
        assert_eq!(prefix.as_str(), "5BAA6");
        assert_eq!(prefix.to_string(), "5BAA6");
        assert_eq!(prefix.value(), 0x5BAA6);
        assert_eq!(HashPrefix::parse("00000").unwrap().value(), 0);
        assert_eq!(HashPrefix::parse("FFFFF").unwrap().value(), 0xFFFFF);

        assert!(HashPrefix::parse("5BAA").is_err());
        assert!(HashPrefix::parse("5BAA61").is_err());
        assert!(HashPrefix::parse("5BAAG").is_err());
        assert!(HashPrefix::parse("").is_err());
    }
}

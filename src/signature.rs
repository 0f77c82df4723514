//! Signatures and profiles.
//!
//! A [`Signature`] is an opaque, comparable string: base64 of an MD5 digest
//! of a [`Profile`], or empty for a spell with no effect. Kept as a newtype
//! (rather than a bare `String`) so call sites can't accidentally compare a
//! signature against a profile or a journal key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::{Digest, Md5};
use std::fmt;

/// base64(MD5(profile)), or empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Signature(String);

impl Signature {
    /// The signature of a spell whose profile was empty.
    pub fn empty() -> Self {
        Signature(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an already-computed signature string (e.g. read back from a
    /// journal line). Does not itself hash anything.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Signature(s.into())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash a profile string into its signature. An empty profile always yields
/// the empty signature, never `md5_base64("")`.
pub fn hash_profile(profile: &str) -> Signature {
    if profile.is_empty() {
        return Signature::empty();
    }
    let digest = Md5::digest(profile.as_bytes());
    Signature(BASE64.encode(digest))
}

/// The textual pre-image hashed to produce a spell's signature. Either a
/// fixed string fixed at construction time, or a thunk evaluated once per
/// `invoke`, so a profile can depend on data only known after construction
/// (e.g. a derived name).
pub enum Profile {
    Static(String),
    Computed(Box<dyn Fn() -> String>),
}

impl Profile {
    pub fn resolve(&self) -> String {
        match self {
            Profile::Static(s) => s.clone(),
            Profile::Computed(f) => f(),
        }
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Profile::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<String> for Profile {
    fn from(s: String) -> Self {
        Profile::Static(s)
    }
}

impl From<&str> for Profile {
    fn from(s: &str) -> Self {
        Profile::Static(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_yields_empty_signature() {
        assert!(hash_profile("").is_empty());
    }

    #[test]
    fn nonempty_profile_is_md5_base64() {
        // md5("abc") = 900150983cd24fb0d6963f7d28e17f72
        let expected_hex = "900150983cd24fb0d6963f7d28e17f72";
        let raw = (0..expected_hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&expected_hex[i..i + 2], 16).unwrap())
            .collect::<Vec<u8>>();
        let expected = BASE64.encode(&raw);
        assert_eq!(hash_profile("abc").as_str(), expected);
    }

    #[test]
    fn same_profile_same_signature() {
        assert_eq!(hash_profile("x y z"), hash_profile("x y z"));
    }

    #[test]
    fn different_profile_different_signature() {
        assert_ne!(hash_profile("x"), hash_profile("y"));
    }
}

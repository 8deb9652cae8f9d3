//! Shared secret held by the issuer and legitimate provers.

use std::fmt;

use zeroize::Zeroizing;

use super::errors::ConfigurationError;

/// Long-lived HMAC key.
///
/// Injected into constructors; never serialized, and `Debug` only reports the length.
/// Each clone owns its own copy of the bytes, zeroized when that clone is dropped.
#[derive(Clone)]
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Wrap raw key bytes. An empty key is a configuration error.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigurationError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ConfigurationError::MissingSharedSecret);
        }
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// Parse an optional configured value, treating `None` like an empty string.
    pub fn from_config(value: Option<&str>) -> Result<Self, ConfigurationError> {
        Self::new(value.unwrap_or_default().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed secret; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret(<redacted, {} bytes>)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(
            SharedSecret::new(Vec::new()).unwrap_err(),
            ConfigurationError::MissingSharedSecret
        );
        assert!(SharedSecret::from_config(None).is_err());
        assert!(SharedSecret::from_config(Some("")).is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = SharedSecret::new("hunter2-but-longer").unwrap();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("18 bytes"));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let secret = SharedSecret::from_config(Some("abc")).unwrap();
        assert_eq!(secret.as_bytes(), b"abc");
        assert_eq!(secret.len(), 3);
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_clones_own_separate_buffers() {
        let original = SharedSecret::new("abc").unwrap();
        let copy = original.clone();
        assert_ne!(original.as_bytes().as_ptr(), copy.as_bytes().as_ptr());

        drop(original);
        assert_eq!(copy.as_bytes(), b"abc");
    }
}

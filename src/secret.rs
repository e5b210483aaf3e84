// 🔒 Secrets
// API keys, credential blobs and access tokens that never print their value

use std::fmt;

use zeroize::Zeroize;

/// A secret that never shows its value in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    inner: String,
}

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self { inner: value.into() }
    }

    /// The raw value, for putting on the wire.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Length is safe to log.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_redacted() {
        let secret = Secret::new("AIzaSy-super-secret");

        assert_eq!(format!("{:?}", secret), "Secret([REDACTED])");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert!(!format!("{:?}", Some(secret.clone())).contains("super-secret"));
    }

    #[test]
    fn test_expose() {
        let secret = Secret::new("abc");
        assert_eq!(secret.expose(), "abc");
        assert_eq!(secret.len(), 3);
        assert!(!secret.is_empty());
    }
}

//! Sensitive passphrase buffer.
//!
//! `Passphrase` is owned by the caller, is wiped on drop, never prints its
//! contents and cannot be serialized.  The raw bytes are only reachable
//! inside the closure passed to `with_bytes`.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

pub struct Passphrase(SecretString);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Run `f` with the raw UTF-8 bytes of the passphrase.
    pub fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(self.0.expose_secret().as_bytes())
    }

    /// Length in characters, not UTF-8 bytes.
    pub fn char_len(&self) -> usize {
        self.0.expose_secret().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    /// Owned copy for handing to a blocking worker; wiped when dropped.
    pub(crate) fn to_zeroizing(&self) -> Zeroizing<Vec<u8>> {
        self.with_bytes(|b| Zeroizing::new(b.to_vec()))
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

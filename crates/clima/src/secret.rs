use std::sync::Arc;

use hashbrown::HashSet;

use log::debug;

use sha2::{Digest, Sha256};

type SecretDigest = [u8; 32];

fn digest(secret: &str) -> SecretDigest {
    Sha256::digest(secret.as_bytes()).into()
}

// Compares two digests touching every byte, whatever the position of the
// first difference.
fn constant_time_eq(a: &SecretDigest, b: &SecretDigest) -> bool {
    let difference = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    difference == 0
}

/// A secret presented by a device.
///
/// The value is opaque: no structure is interpreted. Its [`Debug`]
/// representation never reveals the value.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct DeviceSecret(String);

impl DeviceSecret {
    /// Creates a [`DeviceSecret`].
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for DeviceSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DeviceSecret(<redacted>)")
    }
}

impl From<&str> for DeviceSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for DeviceSecret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

/// A source of authorized device secrets.
///
/// How secrets are provisioned, rotated or stored is up to the implementor.
/// The pipeline only asks whether a presented secret is currently valid.
pub trait SecretStore {
    /// Returns `true` if `secret` belongs to an authorized device.
    fn is_authorized(&self, secret: &str) -> bool;
}

impl<T: SecretStore + ?Sized> SecretStore for &T {
    fn is_authorized(&self, secret: &str) -> bool {
        (**self).is_authorized(secret)
    }
}

impl<T: SecretStore + ?Sized> SecretStore for Arc<T> {
    fn is_authorized(&self, secret: &str) -> bool {
        (**self).is_authorized(secret)
    }
}

impl<T: SecretStore + ?Sized> SecretStore for Box<T> {
    fn is_authorized(&self, secret: &str) -> bool {
        (**self).is_authorized(secret)
    }
}

/// An in-memory set of authorized secrets.
///
/// Only the `SHA-256` digests of the secrets are kept. A lookup hashes the
/// presented secret and compares it against every stored digest, so the
/// amount of work depends neither on the presented value nor on which
/// entry matches.
///
/// Comparison is exact: case-sensitive and without any trimming.
#[derive(Clone, Default)]
pub struct Secrets {
    digests: HashSet<SecretDigest>,
}

impl Secrets {
    /// Creates an empty [`Secrets`] set, which authorizes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret.
    ///
    /// Empty secrets are ignored.
    #[must_use]
    pub fn insert(mut self, secret: impl AsRef<str>) -> Self {
        self.add(secret);
        self
    }

    /// Adds a secret in place.
    ///
    /// Empty secrets are ignored.
    pub fn add(&mut self, secret: impl AsRef<str>) {
        let secret = secret.as_ref();
        if secret.is_empty() {
            debug!("Ignoring an empty device secret");
            return;
        }
        self.digests.insert(digest(secret));
    }

    /// Number of distinct authorized secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Whether no secret is authorized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("len", &self.digests.len())
            .finish()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Secrets {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut secrets = Self::new();
        for secret in iter {
            secrets.add(secret);
        }
        secrets
    }
}

impl<S: AsRef<str>> Extend<S> for Secrets {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for secret in iter {
            self.add(secret);
        }
    }
}

impl SecretStore for Secrets {
    fn is_authorized(&self, secret: &str) -> bool {
        if secret.is_empty() {
            return false;
        }

        let presented = digest(secret);

        // No early exit: every stored digest is compared.
        self.digests
            .iter()
            .fold(false, |found, stored| found | constant_time_eq(stored, &presented))
    }
}

//! Credential lookup and timing-safe secret comparison.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use subtle::{Choice, ConstantTimeEq};

/// Read-only source of login secrets keyed by email.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, email: &str) -> Option<&SecretString>;
}

/// Accounts served when no other store is injected.
const SEED_CREDENTIALS: [(&str, &str); 4] = [
    ("user1@example.com", "password12345"),
    ("user2@example.com", "B7rx9OkWVdx13$QF6Imq"),
    ("user3@example.com", "hoxnNT4g&ER0&9Nz0pLO"),
    ("user4@example.com", "Log4Fun"),
];

/// Compared against when the email is unknown, so both rejection paths hash
/// and compare the same amount of data.
const DUMMY_SECRET: &str = "passgate:unknown-account:0000000000";

/// Fixed in-memory credential table; never mutated after construction.
#[derive(Debug)]
pub struct StaticCredentials {
    entries: HashMap<String, SecretString>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new<I, E, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (E, S)>,
        E: Into<String>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(email, secret)| {
                    let secret: String = secret.into();
                    (email.into(), SecretString::from(secret))
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new(SEED_CREDENTIALS)
    }
}

impl CredentialStore for StaticCredentials {
    fn lookup(&self, email: &str) -> Option<&SecretString> {
        self.entries.get(email)
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn digests_equal(supplied: &str, stored: &str) -> Choice {
    digest(supplied).as_slice().ct_eq(digest(stored).as_slice())
}

/// Constant-time equality of two secrets.
///
/// Both sides are reduced to fixed-size digests first, so neither the
/// position of the first differing byte nor a length mismatch short-circuits.
#[must_use]
pub fn secrets_match(supplied: &str, stored: &str) -> bool {
    digests_equal(supplied, stored).into()
}

/// Checks `password` against the secret stored for `email`.
///
/// An unknown email still runs a full comparison (against a dummy secret)
/// and the two outcomes are combined without branching.
#[must_use]
pub fn verify_credentials(store: &dyn CredentialStore, email: &str, password: &str) -> bool {
    let stored = store.lookup(email);
    let known = Choice::from(u8::from(stored.is_some()));
    let candidate = stored.map_or(DUMMY_SECRET, |secret| secret.expose_secret());

    (known & digests_equal(password, candidate)).into()
}

//! Credential hashing behind a trait seam.
//!
//! The production implementation is bcrypt at cost 12 (~100ms on commodity
//! hardware). bcrypt silently truncates secrets beyond 72 bytes, which would
//! be a silent-correctness risk, so both operations reject longer input with
//! `SecretTooLong` instead.

use crate::gardi::error::Error;

/// bcrypt's fixed input budget in bytes.
pub const MAX_SECRET_LENGTH: usize = 72;

/// One-way hashing and verification of authentication secrets.
///
/// A trait so the flows can be exercised with recording doubles in tests;
/// implementations must be cheap to clone since hashing runs on blocking
/// worker threads.
pub trait CredentialHasher {
    /// Produce a salted one-way hash of `secret`.
    ///
    /// # Errors
    /// `SecretTooLong` when the input exceeds [`MAX_SECRET_LENGTH`];
    /// `Storage` for internal hashing faults.
    fn hash(&self, secret: &[u8]) -> Result<String, Error>;

    /// Check `secret` against a stored hash.
    ///
    /// Returns `Ok(false)` for a plain mismatch, never an error.
    ///
    /// # Errors
    /// `SecretTooLong` when the input exceeds [`MAX_SECRET_LENGTH`];
    /// `CorruptHash` when the stored hash cannot be parsed.
    fn verify(&self, secret: &[u8], hash: &str) -> Result<bool, Error>;
}

/// # Errors
/// Returns `SecretTooLong` when the secret exceeds [`MAX_SECRET_LENGTH`].
pub fn ensure_secret_length(secret: &[u8]) -> Result<(), Error> {
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(Error::SecretTooLong);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl BcryptHasher {
    /// Mainly for tests, which use a low cost to stay fast.
    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, secret: &[u8]) -> Result<String, Error> {
        ensure_secret_length(secret)?;

        bcrypt::hash(secret, self.cost)
            .map_err(|err| Error::Storage(anyhow::Error::new(err).context("bcrypt hash failed")))
    }

    fn verify(&self, secret: &[u8], hash: &str) -> Result<bool, Error> {
        ensure_secret_length(secret)?;

        match bcrypt::verify(secret, hash) {
            Ok(matched) => Ok(matched),
            // bcrypt only fails here when the stored hash is malformed
            Err(_) => Err(Error::CorruptHash),
        }
    }
}

/// Test double that records invocations and "hashes" by tagging the secret.
/// Acts as the instrumentation hook proving whether hashing ever ran.
#[cfg(test)]
pub(crate) mod doubles {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    use super::{ensure_secret_length, CredentialHasher};
    use crate::gardi::error::Error;

    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingHasher {
        hash_calls: Arc<AtomicUsize>,
    }

    impl RecordingHasher {
        pub(crate) fn hash_calls(&self) -> usize {
            self.hash_calls.load(Ordering::SeqCst)
        }
    }

    impl CredentialHasher for RecordingHasher {
        fn hash(&self, secret: &[u8]) -> Result<String, Error> {
            ensure_secret_length(secret)?;
            self.hash_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("recorded${}", STANDARD.encode(secret)))
        }

        fn verify(&self, secret: &[u8], hash: &str) -> Result<bool, Error> {
            ensure_secret_length(secret)?;
            let encoded = hash.strip_prefix("recorded$").ok_or(Error::CorruptHash)?;
            let stored = STANDARD.decode(encoded).map_err(|_| Error::CorruptHash)?;
            Ok(stored == secret)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // DEFAULT_COST is calibrated for production latency; tests use the
    // cheapest cost bcrypt accepts.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_verify_round_trips() -> Result<(), Error> {
        let hasher = BcryptHasher::with_cost(TEST_COST);
        let hash = hasher.hash(b"correct horse")?;

        assert!(hash.starts_with("$2"));
        assert!(hasher.verify(b"correct horse", &hash)?);
        assert!(!hasher.verify(b"wrong horse", &hash)?);
        Ok(())
    }

    #[test]
    fn verify_is_idempotent() -> Result<(), Error> {
        let hasher = BcryptHasher::with_cost(TEST_COST);
        let hash = hasher.hash(b"swordfish")?;

        let first = hasher.verify(b"swordfish", &hash)?;
        let second = hasher.verify(b"swordfish", &hash)?;
        assert_eq!(first, second);
        assert!(first);
        Ok(())
    }

    #[test]
    fn hash_rejects_73_byte_secret() {
        let hasher = BcryptHasher::with_cost(TEST_COST);
        let secret = vec![b'a'; MAX_SECRET_LENGTH + 1];

        assert!(matches!(hasher.hash(&secret), Err(Error::SecretTooLong)));
    }

    #[test]
    fn verify_rejects_73_byte_secret() -> Result<(), Error> {
        let hasher = BcryptHasher::with_cost(TEST_COST);
        let hash = hasher.hash(b"short enough")?;
        let secret = vec![b'a'; MAX_SECRET_LENGTH + 1];

        assert!(matches!(
            hasher.verify(&secret, &hash),
            Err(Error::SecretTooLong)
        ));
        Ok(())
    }

    #[test]
    fn exactly_72_bytes_is_accepted() -> Result<(), Error> {
        let hasher = BcryptHasher::with_cost(TEST_COST);
        let secret = vec![b'a'; MAX_SECRET_LENGTH];
        let hash = hasher.hash(&secret)?;

        assert!(hasher.verify(&secret, &hash)?);
        Ok(())
    }

    #[test]
    fn malformed_stored_hash_is_corrupt_not_mismatch() {
        let hasher = BcryptHasher::with_cost(TEST_COST);

        assert!(matches!(
            hasher.verify(b"whatever", "not-a-bcrypt-hash"),
            Err(Error::CorruptHash)
        ));
    }
}

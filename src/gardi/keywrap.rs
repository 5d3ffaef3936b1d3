//! Structural bounds for client-supplied key-wrapping material.
//!
//! The server never derives a wrapping key and never unwraps the encryption
//! key; it only checks shape. The bounds below are the single source of
//! truth: the repository generates its schema constraints from the same
//! constants, so the two layers cannot drift apart.

use crate::gardi::error::Error;

/// PBKDF2 salt length required from clients.
pub const SALT_LENGTH: usize = 32;

/// AES-GCM IV length required from clients.
pub const IV_LENGTH: usize = 12;

/// Floor against weak client configurations.
pub const ITERATION_COUNT_MIN: u64 = 800_000;

/// Ceiling against pathological requests.
pub const ITERATION_COUNT_MAX: u64 = 900_000;

/// Exactly [`SALT_LENGTH`] opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LENGTH]);

impl Salt {
    /// # Errors
    /// Returns `InvalidSaltLength` unless the input is exactly 32 bytes.
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let salt: [u8; SALT_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidSaltLength {
            expected: SALT_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self(salt))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Exactly [`IV_LENGTH`] opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iv([u8; IV_LENGTH]);

impl Iv {
    /// # Errors
    /// Returns `InvalidIvLength` unless the input is exactly 12 bytes.
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let iv: [u8; IV_LENGTH] = bytes.try_into().map_err(|_| Error::InvalidIvLength {
            expected: IV_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self(iv))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Parameters the client used (and will reuse) to derive its wrapping key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappingKeyParams {
    salt: Salt,
    iteration_count: u64,
}

impl WrappingKeyParams {
    /// # Errors
    /// Returns `IterationCountOutOfRange` outside `[800_000, 900_000]`.
    pub fn new(salt: Salt, iteration_count: u64) -> Result<Self, Error> {
        if !(ITERATION_COUNT_MIN..=ITERATION_COUNT_MAX).contains(&iteration_count) {
            return Err(Error::IterationCountOutOfRange {
                count: iteration_count,
            });
        }
        Ok(Self {
            salt,
            iteration_count,
        })
    }

    #[must_use]
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    #[must_use]
    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }
}

/// The client's data-encryption key, encrypted under its wrapping key.
/// `data` is an opaque blob; the server never decrypts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedEncryptionKey {
    iv: Iv,
    data: Vec<u8>,
}

impl WrappedEncryptionKey {
    /// # Errors
    /// Returns `EmptyCiphertext` when `data` is empty.
    pub fn new(iv: Iv, data: Vec<u8>) -> Result<Self, Error> {
        if data.is_empty() {
            return Err(Error::EmptyCiphertext);
        }
        Ok(Self { iv, data })
    }

    #[must_use]
    pub fn iv(&self) -> &Iv {
        &self.iv
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Validate a candidate envelope.
///
/// Checks run in a fixed order (salt, iteration count, iv, ciphertext) so the
/// first reported error is deterministic. All checks are pure.
///
/// # Errors
/// Returns the first failing structural check.
pub fn validate(
    salt: &[u8],
    iteration_count: u64,
    iv: &[u8],
    data: &[u8],
) -> Result<(WrappingKeyParams, WrappedEncryptionKey), Error> {
    let salt = Salt::new(salt)?;
    let params = WrappingKeyParams::new(salt, iteration_count)?;
    let iv = Iv::new(iv)?;
    let wrapped = WrappedEncryptionKey::new(iv, data.to_vec())?;
    Ok((params, wrapped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_salt() -> Vec<u8> {
        vec![7u8; SALT_LENGTH]
    }

    fn valid_iv() -> Vec<u8> {
        vec![9u8; IV_LENGTH]
    }

    #[test]
    fn accepts_valid_material() {
        let (params, wrapped) = validate(&valid_salt(), 850_000, &valid_iv(), &[1, 2, 3])
            .expect("valid material should pass");
        assert_eq!(params.salt().as_bytes(), valid_salt().as_slice());
        assert_eq!(params.iteration_count(), 850_000);
        assert_eq!(wrapped.iv().as_bytes(), valid_iv().as_slice());
        assert_eq!(wrapped.data(), &[1, 2, 3]);
    }

    #[test]
    fn rejects_short_and_long_salt() {
        for len in [0usize, 31, 33] {
            let err = validate(&vec![0u8; len], 850_000, &valid_iv(), &[1]).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSaltLength { expected: 32, actual } if actual == len)
            );
        }
    }

    #[test]
    fn iteration_count_bounds_are_inclusive() {
        assert!(validate(&valid_salt(), ITERATION_COUNT_MIN, &valid_iv(), &[1]).is_ok());
        assert!(validate(&valid_salt(), ITERATION_COUNT_MAX, &valid_iv(), &[1]).is_ok());

        for count in [0, ITERATION_COUNT_MIN - 1, ITERATION_COUNT_MAX + 1] {
            let err = validate(&valid_salt(), count, &valid_iv(), &[1]).unwrap_err();
            assert!(matches!(err, Error::IterationCountOutOfRange { count: c } if c == count));
        }
    }

    #[test]
    fn rejects_wrong_iv_length() {
        let err = validate(&valid_salt(), 850_000, &[0u8; 16], &[1]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidIvLength {
                expected: 12,
                actual: 16
            }
        ));
    }

    #[test]
    fn rejects_empty_ciphertext() {
        let err = validate(&valid_salt(), 850_000, &valid_iv(), &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyCiphertext));
    }

    #[test]
    fn first_failing_check_wins() {
        // Everything is wrong; the salt check is reported because it runs first.
        let err = validate(&[0u8; 4], 1, &[0u8; 4], &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidSaltLength { .. }));

        // Salt fixed; the iteration count check is next.
        let err = validate(&valid_salt(), 1, &[0u8; 4], &[]).unwrap_err();
        assert!(matches!(err, Error::IterationCountOutOfRange { .. }));

        // Iteration count fixed; the iv check is next.
        let err = validate(&valid_salt(), 850_000, &[0u8; 4], &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidIvLength { .. }));
    }
}

//! The persisted user record and its constituent types.

use regex::Regex;
use uuid::Uuid;

use crate::gardi::error::Error;
use crate::gardi::keywrap::{WrappedEncryptionKey, WrappingKeyParams};

pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[a-z0-9_]{4,16}$").map_or(false, |re| re.is_match(username))
}

/// A validated username: 4-16 lowercase letters, digits, or underscores.
/// Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// # Errors
    /// Returns `MalformedRequest` when the username violates the pattern.
    pub fn new(username: &str) -> Result<Self, Error> {
        if !valid_username(username) {
            return Err(Error::MalformedRequest(
                "username must be 4-16 lowercase letters, digits, or underscores".to_string(),
            ));
        }
        Ok(Self(username.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A registered user. Created exactly once by the registration flow, read by
/// the login flow; there is no update or delete path.
#[derive(Debug, Clone)]
pub struct Identity {
    id: Uuid,
    username: Username,
    auth_secret_hash: String,
    wrapping_key_params: WrappingKeyParams,
    wrapped_encryption_key: WrappedEncryptionKey,
}

impl Identity {
    /// Build a fresh identity with a server-generated id.
    #[must_use]
    pub fn create(
        username: Username,
        auth_secret_hash: String,
        wrapping_key_params: WrappingKeyParams,
        wrapped_encryption_key: WrappedEncryptionKey,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            username,
            auth_secret_hash,
            wrapping_key_params,
            wrapped_encryption_key,
        }
    }

    /// Reassemble a persisted identity; used by repositories when mapping
    /// stored rows.
    #[must_use]
    pub fn from_parts(
        id: Uuid,
        username: Username,
        auth_secret_hash: String,
        wrapping_key_params: WrappingKeyParams,
        wrapped_encryption_key: WrappedEncryptionKey,
    ) -> Self {
        Self {
            id,
            username,
            auth_secret_hash,
            wrapping_key_params,
            wrapped_encryption_key,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn auth_secret_hash(&self) -> &str {
        &self.auth_secret_hash
    }

    #[must_use]
    pub fn wrapping_key_params(&self) -> &WrappingKeyParams {
        &self.wrapping_key_params
    }

    #[must_use]
    pub fn wrapped_encryption_key(&self) -> &WrappedEncryptionKey {
        &self.wrapped_encryption_key
    }
}

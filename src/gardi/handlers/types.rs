//! Request/response types for the register and login endpoints.
//!
//! Byte fields (password, salt, iv, data) are base64 strings on the wire;
//! responses carry the public projection of an identity and never the
//! authentication secret hash.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::gardi::handlers::encode_base64;
use crate::gardi::identity::Identity;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WrappingKeyParamsPayload {
    /// base64-encoded PBKDF2 salt (32 bytes)
    pub salt: String,
    pub iteration_count: u64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedDataPayload {
    /// base64-encoded AES-GCM IV (12 bytes)
    pub iv: String,
    /// base64-encoded ciphertext
    pub data: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    /// base64-encoded authentication secret
    pub password: String,
    pub wrapping_key_params: WrappingKeyParamsPayload,
    pub wrapped_encryption_key: EncryptedDataPayload,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    /// base64-encoded authentication secret
    pub password: String,
}

/// Public projection of an identity: everything the client needs to re-derive
/// its wrapping key, nothing that proves (or breaks) authentication.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub username: String,
    pub wrapping_key_params: WrappingKeyParamsPayload,
    pub wrapped_encryption_key: EncryptedDataPayload,
}

impl UserResponse {
    pub(crate) fn from_identity(identity: &Identity) -> Self {
        Self {
            username: identity.username().as_str().to_string(),
            wrapping_key_params: WrappingKeyParamsPayload {
                salt: encode_base64(identity.wrapping_key_params().salt().as_bytes()),
                iteration_count: identity.wrapping_key_params().iteration_count(),
            },
            wrapped_encryption_key: EncryptedDataPayload {
                iv: encode_base64(identity.wrapped_encryption_key().iv().as_bytes()),
                data: encode_base64(identity.wrapped_encryption_key().data()),
            },
        }
    }
}

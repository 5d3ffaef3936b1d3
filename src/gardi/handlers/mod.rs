pub mod health;
pub use self::health::health;

pub mod user_register;
pub use self::user_register::register;

pub mod user_login;
pub use self::user_login::login;

pub mod types;

// common functions for the handlers
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::error;
use utoipa::OpenApi;

use crate::gardi::error::Error;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, user_register::register, user_login::login),
    components(schemas(
        types::RegisterRequest,
        types::LoginRequest,
        types::UserResponse,
        types::WrappingKeyParamsPayload,
        types::EncryptedDataPayload,
    )),
    tags((name = "auth", description = "Registration and login"))
)]
pub struct ApiDoc;

/// Byte fields travel base64-encoded on the wire.
pub(crate) fn decode_base64_field(value: &str, field: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(value.trim())
        .map_err(|_| Error::MalformedRequest(format!("invalid base64 in {field}")))
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Map a flow error to a transport response, logging server faults.
pub(crate) fn error_response(err: &Error, operation: &str) -> Response {
    if err.is_server_fault() {
        error!("{operation} failed: {err}");
    }

    (err.status_code(), err.public_message()).into_response()
}

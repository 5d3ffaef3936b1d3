use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::SecretSlice;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::gardi::error::Error;
use crate::gardi::flows::{self, RegistrationInput};
use crate::gardi::handlers::types::{RegisterRequest, UserResponse};
use crate::gardi::handlers::{decode_base64_field, error_response};
use crate::gardi::hasher::CredentialHasher;
use crate::gardi::repository::IdentityRepository;
use crate::gardi::AppState;

#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = UserResponse, content_type = "application/json"),
        (status = 400, description = "Malformed request or invalid key-wrapping material", body = String),
        (status = 409, description = "Username already taken", body = String),
    ),
    tag = "auth"
)]
// axum handler for register
#[instrument(skip_all)]
pub async fn register<R, H>(
    state: Extension<Arc<AppState<R, H>>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse
where
    R: IdentityRepository + Send + Sync + 'static,
    H: CredentialHasher + Clone + Send + Sync + 'static,
{
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return error_response(
                &Error::MalformedRequest("missing or malformed payload".to_string()),
                "registration",
            )
        }
    };

    debug!("registration request for username {}", request.username);

    let input = match registration_input(request) {
        Ok(input) => input,
        Err(err) => return error_response(&err, "registration"),
    };

    // One deadline for the whole request: hashing and storage share it.
    let deadline = Instant::now() + state.request_timeout;

    match flows::register(&state.repository, &state.hasher, input, deadline).await {
        Ok(identity) => (
            StatusCode::CREATED,
            Json(UserResponse::from_identity(&identity)),
        )
            .into_response(),
        Err(err) => error_response(&err, "registration"),
    }
}

fn registration_input(request: RegisterRequest) -> Result<RegistrationInput, Error> {
    Ok(RegistrationInput {
        username: request.username,
        password: SecretSlice::from(decode_base64_field(&request.password, "password")?),
        salt: decode_base64_field(&request.wrapping_key_params.salt, "wrappingKeyParams.salt")?,
        iteration_count: request.wrapping_key_params.iteration_count,
        iv: decode_base64_field(&request.wrapped_encryption_key.iv, "wrappedEncryptionKey.iv")?,
        data: decode_base64_field(
            &request.wrapped_encryption_key.data,
            "wrappedEncryptionKey.data",
        )?,
    })
}

use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use secrecy::SecretSlice;
use tokio::time::Instant;
use tracing::instrument;

use crate::gardi::error::Error;
use crate::gardi::flows::{self, LoginInput};
use crate::gardi::handlers::types::{LoginRequest, UserResponse};
use crate::gardi::handlers::{decode_base64_field, error_response};
use crate::gardi::hasher::CredentialHasher;
use crate::gardi::repository::IdentityRepository;
use crate::gardi::AppState;

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse, content_type = "application/json"),
        (status = 400, description = "Malformed request", body = String),
        (status = 401, description = "Unknown username or wrong password", body = String),
    ),
    tag = "auth"
)]
// axum handler for login
#[instrument(skip_all)]
pub async fn login<R, H>(
    state: Extension<Arc<AppState<R, H>>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse
where
    R: IdentityRepository + Send + Sync + 'static,
    H: CredentialHasher + Clone + Send + Sync + 'static,
{
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return error_response(
                &Error::MalformedRequest("missing or malformed payload".to_string()),
                "login",
            )
        }
    };

    let password = match decode_base64_field(&request.password, "password") {
        Ok(bytes) => SecretSlice::from(bytes),
        Err(err) => return error_response(&err, "login"),
    };

    let input = LoginInput {
        username: request.username,
        password,
    };

    let deadline = Instant::now() + state.request_timeout;

    match flows::login(&state.repository, &state.hasher, input, deadline).await {
        Ok(identity) => (
            StatusCode::OK,
            Json(UserResponse::from_identity(&identity)),
        )
            .into_response(),
        Err(err) => error_response(&err, "login"),
    }
}

//! Service wiring: application state, router, and startup.

pub mod error;
pub mod flows;
pub mod handlers;
pub mod hasher;
pub mod identity;
pub mod keywrap;
pub mod repository;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::handlers::ApiDoc;
use self::hasher::{BcryptHasher, CredentialHasher};
use self::repository::{IdentityRepository, PgIdentityRepository};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Per-process collaborators handed to every request.
///
/// Constructed once at startup and injected through an `Extension`; the core
/// holds no other shared state, so correctness under concurrency rests on
/// the repository's atomic uniqueness guarantee.
#[derive(Debug)]
pub struct AppState<R, H> {
    pub repository: R,
    pub hasher: H,
    /// Single deadline budget per request, shared by hashing and storage.
    pub request_timeout: Duration,
}

/// Build the application router over any repository/hasher pair.
pub fn router<R, H>(state: Arc<AppState<R, H>>) -> Router
where
    R: IdentityRepository + Send + Sync + 'static,
    H: CredentialHasher + Clone + Send + Sync + 'static,
{
    let x_request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register::<R, H>))
        .route("/login", post(handlers::login::<R, H>))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    x_request_id.clone(),
                    |_: &Request<Body>| HeaderValue::from_str(&Ulid::new().to_string()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str);
                    info_span!("request", method = %request.method(), path)
                }))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, request_timeout: Duration) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let repository = PgIdentityRepository::new(pool);
    repository
        .create_schema()
        .await
        .context("Failed to create schema")?;

    let state = Arc::new(AppState {
        repository,
        hasher: BcryptHasher::default(),
        request_timeout,
    });

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on port {port}");

    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}

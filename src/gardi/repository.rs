//! Identity persistence.
//!
//! `IdentityRepository` is the storage seam the flows depend on; the
//! production implementation is Postgres via `sqlx`. Uniqueness under
//! concurrent registration is enforced by the database's unique constraint,
//! and every operation is bounded by the caller's deadline.

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::gardi::error::Error;
use crate::gardi::identity::{Identity, Username};
use crate::gardi::keywrap::{
    Iv, Salt, WrappedEncryptionKey, WrappingKeyParams, ITERATION_COUNT_MAX, ITERATION_COUNT_MIN,
    IV_LENGTH, SALT_LENGTH,
};

#[async_trait]
pub trait IdentityRepository {
    /// Persist a new identity, all-or-nothing.
    ///
    /// # Errors
    /// `DuplicateUsername` when the username already exists, `Timeout` when
    /// the deadline passes first, `Storage` for any other persistence fault.
    async fn insert(&self, identity: &Identity, deadline: Instant) -> Result<(), Error>;

    /// Fetch an identity by username; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    /// `Timeout` when the deadline passes first, `Storage` for any other
    /// persistence fault.
    async fn find_by_username(
        &self,
        username: &str,
        deadline: Instant,
    ) -> Result<Option<Identity>, Error>;
}

/// Schema mirroring the keywrap bounds as CHECK constraints.
///
/// Generated from the same constants the validator uses, so the storage
/// boundary independently enforces what the application layer already
/// checked.
fn schema_sql() -> String {
    format!(
        r"CREATE TABLE IF NOT EXISTS identities (
            id UUID PRIMARY KEY,
            username TEXT NOT NULL UNIQUE CHECK (username ~ '^[a-z0-9_]{{4,16}}$'),
            auth_secret_hash TEXT NOT NULL,
            kdf_salt BYTEA NOT NULL CHECK (octet_length(kdf_salt) = {SALT_LENGTH}),
            kdf_iteration_count BIGINT NOT NULL
                CHECK (kdf_iteration_count BETWEEN {ITERATION_COUNT_MIN} AND {ITERATION_COUNT_MAX}),
            wrap_iv BYTEA NOT NULL CHECK (octet_length(wrap_iv) = {IV_LENGTH}),
            wrap_data BYTEA NOT NULL CHECK (octet_length(wrap_data) > 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    )
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent schema setup.
    ///
    /// # Errors
    /// Returns `Storage` when the DDL fails.
    pub async fn create_schema(&self) -> Result<(), Error> {
        let query = schema_sql();
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE TABLE",
        );
        sqlx::query(&query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .map_err(|err| {
                Error::Storage(anyhow::Error::new(err).context("failed to create schema"))
            })?;

        Ok(())
    }
}

fn identity_from_row(row: &PgRow) -> Result<Identity, Error> {
    let structural = |err: Error| {
        Error::Storage(anyhow::anyhow!(
            "stored identity violates structural bounds: {err}"
        ))
    };

    let id: Uuid = row.get("id");
    let username: String = row.get("username");
    let username = Username::new(&username).map_err(structural)?;
    let auth_secret_hash: String = row.get("auth_secret_hash");

    let salt_bytes: Vec<u8> = row.get("kdf_salt");
    let salt = Salt::new(&salt_bytes).map_err(structural)?;
    let iteration_count: i64 = row.get("kdf_iteration_count");
    let iteration_count = u64::try_from(iteration_count)
        .map_err(|_| Error::Storage(anyhow::anyhow!("stored iteration count is negative")))?;
    let params = WrappingKeyParams::new(salt, iteration_count).map_err(structural)?;

    let iv_bytes: Vec<u8> = row.get("wrap_iv");
    let iv = Iv::new(&iv_bytes).map_err(structural)?;
    let data: Vec<u8> = row.get("wrap_data");
    let wrapped = WrappedEncryptionKey::new(iv, data).map_err(structural)?;

    Ok(Identity::from_parts(
        id,
        username,
        auth_secret_hash,
        params,
        wrapped,
    ))
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn insert(&self, identity: &Identity, deadline: Instant) -> Result<(), Error> {
        let query = r"
            INSERT INTO identities
                (id, username, auth_secret_hash, kdf_salt, kdf_iteration_count, wrap_iv, wrap_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        let iteration_count =
            i64::try_from(identity.wrapping_key_params().iteration_count()).map_err(|_| {
                Error::Storage(anyhow::anyhow!("iteration count exceeds storage range"))
            })?;

        let fut = sqlx::query(query)
            .bind(identity.id())
            .bind(identity.username().as_str())
            .bind(identity.auth_secret_hash())
            .bind(identity.wrapping_key_params().salt().as_bytes())
            .bind(iteration_count)
            .bind(identity.wrapped_encryption_key().iv().as_bytes())
            .bind(identity.wrapped_encryption_key().data())
            .execute(&self.pool)
            .instrument(span);

        match timeout_at(deadline, fut).await {
            Err(_) => Err(Error::Timeout),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) if is_unique_violation(&err) => Err(Error::DuplicateUsername),
            Ok(Err(err)) => Err(Error::Storage(
                anyhow::Error::new(err).context("failed to insert identity"),
            )),
        }
    }

    async fn find_by_username(
        &self,
        username: &str,
        deadline: Instant,
    ) -> Result<Option<Identity>, Error> {
        let query = r"
            SELECT id, username, auth_secret_hash, kdf_salt, kdf_iteration_count, wrap_iv, wrap_data
            FROM identities
            WHERE username = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );

        let fut = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span);

        let row = timeout_at(deadline, fut)
            .await
            .map_err(|_| Error::Timeout)?
            .context("failed to lookup identity")
            .map_err(Error::Storage)?;

        row.as_ref().map(identity_from_row).transpose()
    }
}

/// In-memory repository used as a test double for the flows and handlers.
/// The mutex plays the role of the database's atomic unique constraint, and
/// the call counter proves whether storage was ever touched.
#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::IdentityRepository;
    use crate::gardi::error::Error;
    use crate::gardi::identity::Identity;

    #[derive(Debug, Clone, Default)]
    pub(crate) struct MemoryRepository {
        identities: Arc<Mutex<HashMap<String, Identity>>>,
        calls: Arc<AtomicUsize>,
    }

    impl MemoryRepository {
        pub(crate) fn storage_calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityRepository for MemoryRepository {
        async fn insert(&self, identity: &Identity, _deadline: Instant) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut identities = self
                .identities
                .lock()
                .map_err(|_| Error::Storage(anyhow::anyhow!("poisoned lock")))?;

            let username = identity.username().as_str().to_string();
            if identities.contains_key(&username) {
                return Err(Error::DuplicateUsername);
            }
            identities.insert(username, identity.clone());
            Ok(())
        }

        async fn find_by_username(
            &self,
            username: &str,
            _deadline: Instant,
        ) -> Result<Option<Identity>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let identities = self
                .identities
                .lock()
                .map_err(|_| Error::Storage(anyhow::anyhow!("poisoned lock")))?;

            Ok(identities.get(username).cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mirrors_validator_bounds() {
        let sql = schema_sql();

        assert!(sql.contains("CREATE TABLE IF NOT EXISTS identities"));
        assert!(sql.contains("username TEXT NOT NULL UNIQUE CHECK (username ~ '^[a-z0-9_]{4,16}$')"));
        assert!(sql.contains("octet_length(kdf_salt) = 32"));
        assert!(sql.contains("kdf_iteration_count BETWEEN 800000 AND 900000"));
        assert!(sql.contains("octet_length(wrap_iv) = 12"));
        assert!(sql.contains("octet_length(wrap_data) > 0"));
    }
}

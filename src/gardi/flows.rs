//! Registration and login orchestration.
//!
//! Both flows receive their collaborators (repository, hasher) explicitly and
//! carry one deadline end-to-end, so hashing and storage share a single
//! caller-visible timeout budget. Validation failures resolve locally and
//! never touch storage; cheap checks always run before cryptographic work.

use secrecy::{ExposeSecret, SecretSlice};
use tokio::task;
use tokio::time::{timeout_at, Instant};

use crate::gardi::error::Error;
use crate::gardi::hasher::{self, CredentialHasher};
use crate::gardi::identity::{Identity, Username};
use crate::gardi::keywrap;
use crate::gardi::repository::IdentityRepository;

/// A registration request after wire decoding: raw bytes, not yet validated.
#[derive(Debug)]
pub struct RegistrationInput {
    pub username: String,
    pub password: SecretSlice<u8>,
    pub salt: Vec<u8>,
    pub iteration_count: u64,
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: SecretSlice<u8>,
}

/// Register a new identity: validate, hash, persist.
///
/// # Errors
/// Structural violations are returned before any hashing; `SecretTooLong`
/// before any storage call; `DuplicateUsername` when the storage layer
/// rejects the insert; `Timeout`/`Storage` for server-side faults.
pub async fn register<R, H>(
    repository: &R,
    hasher: &H,
    input: RegistrationInput,
    deadline: Instant,
) -> Result<Identity, Error>
where
    R: IdentityRepository + Sync,
    H: CredentialHasher + Clone + Send + 'static,
{
    let username = Username::new(&input.username)?;
    let (params, wrapped) =
        keywrap::validate(&input.salt, input.iteration_count, &input.iv, &input.data)?;

    let auth_secret_hash = hash_secret(hasher, input.password, deadline).await?;

    let identity = Identity::create(username, auth_secret_hash, params, wrapped);
    repository.insert(&identity, deadline).await?;

    Ok(identity)
}

/// Authenticate an existing identity.
///
/// Unknown usernames, wrong passwords, and lookup or verification timeouts
/// all come back as `Unauthorized`; a distinct timeout status on this path
/// would let a caller probe which usernames exist.
///
/// # Errors
/// `SecretTooLong` before any storage call; `Unauthorized` on any credential
/// mismatch or deadline overrun; `Storage`/`CorruptHash` for server-side
/// faults.
pub async fn login<R, H>(
    repository: &R,
    hasher: &H,
    input: LoginInput,
    deadline: Instant,
) -> Result<Identity, Error>
where
    R: IdentityRepository + Sync,
    H: CredentialHasher + Clone + Send + 'static,
{
    // Reject length-excessive passwords before wasting a lookup.
    hasher::ensure_secret_length(input.password.expose_secret())?;

    let identity = match repository.find_by_username(&input.username, deadline).await {
        Ok(Some(identity)) => identity,
        Ok(None) | Err(Error::Timeout) => return Err(Error::Unauthorized),
        Err(err) => return Err(err),
    };

    let stored_hash = identity.auth_secret_hash().to_string();
    match verify_secret(hasher, input.password, stored_hash, deadline).await {
        Ok(true) => Ok(identity),
        Ok(false) | Err(Error::Timeout) => Err(Error::Unauthorized),
        Err(err) => Err(err),
    }
}

// bcrypt is deliberately slow, so it runs off the async workers; the
// surrounding timeout keeps it inside the request's deadline budget.
async fn hash_secret<H>(
    hasher: &H,
    secret: SecretSlice<u8>,
    deadline: Instant,
) -> Result<String, Error>
where
    H: CredentialHasher + Clone + Send + 'static,
{
    let hasher = hasher.clone();
    let handle = task::spawn_blocking(move || hasher.hash(secret.expose_secret()));

    match timeout_at(deadline, handle).await {
        Err(_) => Err(Error::Timeout),
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(Error::Storage(
            anyhow::Error::new(err).context("hashing task failed"),
        )),
    }
}

async fn verify_secret<H>(
    hasher: &H,
    secret: SecretSlice<u8>,
    stored_hash: String,
    deadline: Instant,
) -> Result<bool, Error>
where
    H: CredentialHasher + Clone + Send + 'static,
{
    let hasher = hasher.clone();
    let handle = task::spawn_blocking(move || hasher.verify(secret.expose_secret(), &stored_hash));

    match timeout_at(deadline, handle).await {
        Err(_) => Err(Error::Timeout),
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(Error::Storage(
            anyhow::Error::new(err).context("verification task failed"),
        )),
    }
}

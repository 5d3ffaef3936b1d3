//! # Gardi (Credential & Key Escrow)
//!
//! `gardi` registers and authenticates users while never observing their
//! data-encryption key in usable form. Clients derive a wrapping key locally
//! from their password (PBKDF2) and upload only the wrapping parameters and
//! the wrapped key ciphertext; the authentication secret is stored as an
//! independent bcrypt hash.
//!
//! ## Escrow Model
//!
//! - **Authentication secret:** bcrypt-hashed (cost 12), never reversible,
//!   never derivable from the wrapping parameters.
//! - **Wrapping key parameters:** a 32-byte salt plus a PBKDF2 iteration
//!   count bounded to `[800_000, 900_000]`.
//! - **Wrapped encryption key:** a 12-byte IV plus opaque ciphertext; the
//!   server never decrypts it.
//!
//! Uniqueness of usernames under concurrent registration is delegated to the
//! database's atomic unique constraint; the service itself holds no shared
//! mutable state.

pub mod cli;
pub mod gardi;

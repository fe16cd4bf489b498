//! Credential storage for the Wellspring session client.
//!
//! This crate provides:
//! - The [`CredentialStorage`] capability (get/set/delete) that the session
//!   manager persists through, so the same logic works over any medium
//! - [`MemoryStorage`] for tests and ephemeral sessions
//! - [`FileStorage`], a JSON file with owner-only permissions
//! - [`CredentialsManager`], which models the access-token cookie and the
//!   durable username cache on top of any backend

mod credentials;
mod file;
mod keys;
mod memory;
mod traits;

pub use credentials::{CookieRecord, CredentialsManager, SameSite};
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::CredentialStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

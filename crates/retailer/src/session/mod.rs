//! Key-value stores backing the client's session state.
//!
//! Two scopes exist, mirroring a browser:
//! - **tab-scoped** ([`MemoryStore`]) - lives as long as the owning session
//!   and holds the cart snapshot
//! - **durable** ([`JsonFileStore`]) - survives restarts and holds the signed-in
//!   identity and bearer token
//!
//! Stores are passed into the components that need them rather than reached
//! through globals; any type implementing [`KeyValueStore`] can be injected.

mod file;
mod identity;
mod memory;

use std::sync::Arc;

use thiserror::Error;

pub use file::JsonFileStore;
pub use identity::{CurrentUser, IdentityStore};
pub use memory::MemoryStore;

/// Well-known keys.
pub mod keys {
    /// Tab-scoped key holding the serialized cart lines.
    pub const CART: &str = "retailer_cart";

    /// Durable key holding the signed-in user as JSON.
    pub const USER: &str = "user";

    /// Durable key holding the pre-issued bearer token.
    pub const TOKEN: &str = "token";
}

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be encoded or decoded.
    #[error("Store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A string key-value store.
///
/// Implementations use interior mutability so a single store can be shared
/// between the cart, the identity reader and logout handling.
pub trait KeyValueStore {
    /// Read a value. Missing keys return `None`.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend could not persist the value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend could not persist the removal.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

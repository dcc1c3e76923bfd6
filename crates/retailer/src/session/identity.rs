//! Signed-in identity, read from the durable store.
//!
//! Identity is issued elsewhere (the login flow); this module only reads the
//! stored user and token, records a pre-issued pair, and forgets them on
//! logout.

use agritrade_core::{UserId, UserRole};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{KeyValueStore, StoreError, keys};

/// The user the backend issued at login.
///
/// Only `id` is required by the checkout flow; the rest is display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user id; sent as `retailerId` when placing orders.
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email, when the backend supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Marketplace role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// Reader/writer for the identity entries of a durable store.
#[derive(Debug, Clone)]
pub struct IdentityStore<S> {
    durable: S,
}

impl<S: KeyValueStore> IdentityStore<S> {
    /// Wrap a durable store.
    pub const fn new(durable: S) -> Self {
        Self { durable }
    }

    /// The signed-in user, if any.
    ///
    /// Missing entries, the literal strings `"undefined"`/`"null"`, and
    /// unparsable JSON all read as signed out. A corrupt entry is removed.
    pub fn current_user(&self) -> Option<CurrentUser> {
        let raw = self.durable.get(keys::USER)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "undefined" || trimmed == "null" {
            return None;
        }

        match serde_json::from_str(trimmed) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable stored user");
                if let Err(e) = self.durable.remove(keys::USER) {
                    warn!(error = %e, "Failed to remove unreadable stored user");
                }
                None
            }
        }
    }

    /// The stored bearer token, if any.
    pub fn token(&self) -> Option<SecretString> {
        self.durable
            .get(keys::TOKEN)
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
    }

    /// Record a user and token issued by the login flow.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the durable store could not be written.
    pub fn remember(&self, user: &CurrentUser, token: Option<&str>) -> Result<(), StoreError> {
        self.durable
            .set(keys::USER, &serde_json::to_string(user)?)?;
        match token {
            Some(token) => self.durable.set(keys::TOKEN, token)?,
            None => self.durable.remove(keys::TOKEN)?,
        }
        debug!(user_id = %user.id, "Identity stored");
        Ok(())
    }

    /// Forget the identity and drop the tab-scoped cart snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either store could not be written.
    pub fn logout(&self, tab: &impl KeyValueStore) -> Result<(), StoreError> {
        self.durable.remove(keys::USER)?;
        self.durable.remove(keys::TOKEN)?;
        tab.remove(keys::CART)?;
        debug!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::session::MemoryStore;

    fn retailer() -> CurrentUser {
        CurrentUser {
            id: UserId::new(7),
            name: "Asha Traders".to_string(),
            email: None,
            role: Some(UserRole::Retailer),
        }
    }

    #[test]
    fn test_missing_user_is_signed_out() {
        let identity = IdentityStore::new(MemoryStore::new());
        assert_eq!(identity.current_user(), None);
    }

    #[test]
    fn test_placeholder_strings_are_signed_out() {
        for raw in ["undefined", "null", "  "] {
            let store = MemoryStore::new();
            store.set(keys::USER, raw).unwrap();
            assert_eq!(IdentityStore::new(&store).current_user(), None);
        }
    }

    #[test]
    fn test_corrupt_user_is_removed() {
        let store = MemoryStore::new();
        store.set(keys::USER, "{\"id\":").unwrap();

        assert_eq!(IdentityStore::new(&store).current_user(), None);
        assert_eq!(store.get(keys::USER), None);
    }

    #[test]
    fn test_backend_user_shape_is_accepted() {
        let store = MemoryStore::new();
        store
            .set(
                keys::USER,
                r#"{"id":12,"name":"Ravi","email":"ravi@example.com","role":"RETAILER","verified":true}"#,
            )
            .unwrap();

        let user = IdentityStore::new(&store).current_user().unwrap();
        assert_eq!(user.id, UserId::new(12));
        assert_eq!(user.role, Some(UserRole::Retailer));
    }

    #[test]
    fn test_remember_then_logout_clears_cart_too() {
        let durable = MemoryStore::new();
        let tab = MemoryStore::new();
        tab.set(keys::CART, "[]").unwrap();

        let identity = IdentityStore::new(&durable);
        identity.remember(&retailer(), Some("tok-123")).unwrap();
        assert_eq!(identity.current_user(), Some(retailer()));
        assert_eq!(identity.token().unwrap().expose_secret(), "tok-123");

        identity.logout(&tab).unwrap();
        assert_eq!(identity.current_user(), None);
        assert!(identity.token().is_none());
        assert_eq!(tab.get(keys::CART), None);
    }
}

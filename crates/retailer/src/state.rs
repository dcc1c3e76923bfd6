//! Wiring of configuration, stores and the API client for one retailer.

use std::sync::Arc;

use agritrade_core::DeliveryAgentId;
use tracing::debug;

use crate::api::MarketplaceClient;
use crate::cart::CartStore;
use crate::checkout::CheckoutOrchestrator;
use crate::config::RetailerConfig;
use crate::error::{Result, RetailerError};
use crate::session::{CurrentUser, IdentityStore, JsonFileStore};
use crate::telemetry;
use crate::tracking::{LocationTracker, TrackingHandle};

/// File holding the signed-in identity and token.
pub const DURABLE_FILE: &str = "durable.json";

/// File holding the cart between invocations.
pub const SESSION_FILE: &str = "session.json";

/// Everything a retailer session needs, shared via `Arc`.
///
/// Both stores live under `state_dir`: the durable one holds identity, the
/// session one stands in for a browser tab and holds the cart.
#[derive(Clone)]
pub struct RetailerState {
    inner: Arc<RetailerStateInner>,
}

struct RetailerStateInner {
    config: RetailerConfig,
    client: MarketplaceClient,
    durable: Arc<JsonFileStore>,
    session: Arc<JsonFileStore>,
}

impl std::fmt::Debug for RetailerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetailerState")
            .field("config", &self.inner.config)
            .field("client", &self.inner.client)
            .finish_non_exhaustive()
    }
}

impl RetailerState {
    /// Open the stores under `config.state_dir` and build the API client.
    ///
    /// A token in the configuration wins over one stored by login.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client could not be built.
    pub fn open(config: RetailerConfig) -> Result<Self> {
        let durable = Arc::new(JsonFileStore::open(config.state_dir.join(DURABLE_FILE)));
        let session = Arc::new(JsonFileStore::open(config.state_dir.join(SESSION_FILE)));

        let identity = IdentityStore::new(Arc::clone(&durable));
        let token = config.api.token.clone().or_else(|| identity.token());
        let client = MarketplaceClient::new(&config.api)?.with_token(token);

        if let Some(user) = identity.current_user() {
            telemetry::set_user(&user.id, user.email.as_deref());
        }

        debug!(state_dir = %config.state_dir.display(), "Retailer state opened");
        Ok(Self {
            inner: Arc::new(RetailerStateInner {
                config,
                client,
                durable,
                session,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RetailerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn client(&self) -> &MarketplaceClient {
        &self.inner.client
    }

    #[must_use]
    pub fn identity(&self) -> IdentityStore<Arc<JsonFileStore>> {
        IdentityStore::new(Arc::clone(&self.inner.durable))
    }

    /// The persisted cart, with the configured add policy.
    #[must_use]
    pub fn cart(&self) -> CartStore<Arc<JsonFileStore>> {
        CartStore::restore(Arc::clone(&self.inner.session))
            .with_policy(self.inner.config.checkout.add_policy)
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutOrchestrator<MarketplaceClient> {
        CheckoutOrchestrator::new(self.inner.client.clone(), self.inner.config.checkout)
    }

    /// The signed-in user, provided they may check out.
    ///
    /// # Errors
    ///
    /// - `RetailerError::NotSignedIn` without a stored user
    /// - `RetailerError::Forbidden` for a non-retailer role
    pub fn require_retailer(&self) -> Result<CurrentUser> {
        let user = self.identity().current_user().ok_or(RetailerError::NotSignedIn)?;
        match user.role {
            Some(role) if !role.can_checkout() => Err(RetailerError::Forbidden(role.to_string())),
            _ => Ok(user),
        }
    }

    /// Forget identity and cart.
    ///
    /// # Errors
    ///
    /// Returns an error if either store could not be written.
    pub fn logout(&self) -> Result<()> {
        self.identity().logout(&self.inner.session)?;
        telemetry::clear_user();
        Ok(())
    }

    /// Start polling a delivery agent's position.
    #[must_use]
    pub fn track(&self, agent: DeliveryAgentId) -> TrackingHandle {
        LocationTracker::spawn(
            self.inner.client.clone(),
            agent,
            self.inner.config.tracking_interval,
        )
    }
}

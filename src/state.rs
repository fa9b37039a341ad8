use std::sync::Arc;

use crate::auth::{AuthResolver, JwtTokens, RequestSigner, TokenResolver};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::database::DataStore;
use crate::lifecycle::JobTracker;

/// Everything a request needs, built once at startup and cloned into handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: DataStore,
    pub signer: Arc<RequestSigner>,
    pub auth: Arc<AuthResolver>,
    pub tokens: Arc<JwtTokens>,
    pub jobs: JobTracker,
}

impl AppState {
    /// Wires the default JWT token resolver
    pub fn new(config: AppConfig, store: DataStore, clock: Arc<dyn Clock>) -> Self {
        let tokens = Arc::new(JwtTokens::new(
            config.security.jwt_secret.clone(),
            config.security.jwt_expiry_hours,
        ));
        Self::with_token_resolver(config, store, clock, tokens.clone(), tokens)
    }

    /// Same as [`AppState::new`] with a different token introspection service
    pub fn with_token_resolver(
        config: AppConfig,
        store: DataStore,
        clock: Arc<dyn Clock>,
        tokens: Arc<JwtTokens>,
        resolver: Arc<dyn TokenResolver>,
    ) -> Self {
        let signer = Arc::new(RequestSigner::new(&config.security, clock));
        let auth = Arc::new(AuthResolver::new(resolver, store.clone()));

        Self {
            config: Arc::new(config),
            store,
            signer,
            auth,
            tokens,
            jobs: JobTracker::new(),
        }
    }
}

use std::sync::Arc;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    store::{AccountStore, PgWaitlistStore, WaitlistStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn WaitlistStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn WaitlistStore>,
        accounts: Arc<dyn AccountStore>,
        jwt: JwtService,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            accounts,
            jwt,
        }
    }

    /// State backed by one Postgres store serving both entries and accounts.
    pub fn postgres(config: AppConfig, store: PgWaitlistStore, jwt: JwtService) -> Self {
        let store = Arc::new(store);
        Self::new(config, store.clone(), store, jwt)
    }
}

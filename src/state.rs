use std::sync::Arc;

use sqlx::MySqlPool;

use crate::auth::Authenticator;
use crate::reports::OverheadRates;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: MySqlPool,
    pub auth: Arc<Authenticator>,
    pub overheads: OverheadRates,
}

impl AppState {
    pub fn new(db_pool: MySqlPool, auth: Authenticator, overheads: OverheadRates) -> Self {
        Self {
            db_pool,
            auth: Arc::new(auth),
            overheads,
        }
    }
}

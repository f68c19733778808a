use std::sync::Arc;

use deadpool_postgres::Pool;

use crate::auth::Authenticator;

/// Per-process handles shared by every request. Holds no request data.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(pool: Pool, auth: Arc<dyn Authenticator>) -> Self {
        Self { pool, auth }
    }
}

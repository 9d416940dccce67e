use std::sync::Arc;

use crate::db::{DbPool, OrmConn, create_orm_conn};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    // Shared handle; the connection type is not `Clone` under every sea-orm feature set.
    pub orm: Arc<OrmConn>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let orm = Arc::new(create_orm_conn(pool.clone()));
        Self { pool, orm }
    }
}

use std::time::Duration;

use anyhow::Context;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

use crate::config::AppConfig;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub const DEFAULT_MAX_POOL_SIZE: u32 = 2;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

pub fn init_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    init_pool_with_size(&config.database_url, config.database_max_pool_size)
}

pub fn init_pool_with_size(database_url: &str, max_size: u32) -> anyhow::Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool_size = max_size.max(1);
    Pool::builder()
        .max_size(pool_size)
        .connection_timeout(CONNECTION_TIMEOUT)
        .test_on_check_out(true)
        .build(manager)
        .with_context(|| format!("failed to open a database pool of size {pool_size}"))
}

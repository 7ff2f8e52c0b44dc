use std::sync::Arc;

use crate::{
    cart::{CartSessions, StorefrontPersistence},
    catalog::{CatalogSource, DbCatalog},
    config::AppConfig,
    db::{DbPool, OrmConn, create_pool, orm_from_pool},
    services::checkout_service::{DbOrderWriter, OrderWriter},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn CatalogSource>,
    pub orders: Arc<dyn OrderWriter>,
    pub carts: Arc<CartSessions>,
}

impl AppState {
    /// Wire the production collaborators. No connection is opened here.
    pub fn new(config: AppConfig) -> Result<Self, sqlx::Error> {
        let pool = create_pool(
            &config.database_url,
            config.db_max_connections,
            config.db_acquire_timeout,
        )?;
        let orm = orm_from_pool(&pool);

        let catalog: Arc<dyn CatalogSource> = Arc::new(DbCatalog::new(orm.clone()));
        let persistence = StorefrontPersistence::new(
            orm.clone(),
            catalog.clone(),
            config.cart_storage_dir.clone(),
        );
        let carts = CartSessions::new(Arc::new(persistence), config.sign_in_policy);

        Ok(Self {
            orders: Arc::new(DbOrderWriter::new(orm.clone())),
            pool,
            orm,
            config: Arc::new(config),
            catalog,
            carts: Arc::new(carts),
        })
    }
}

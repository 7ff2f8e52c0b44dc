use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use uuid::Uuid;

use super::{CartError, Identity};
use crate::{
    catalog::{CatalogSource, fallback},
    db::OrmConn,
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::{Entity as Products, Model as ProductModel},
    },
    models::{CartItem, CartProduct, Product},
    storage::{FileStorage, LocalStorage},
};

/// Local storage key holding the guest cart.
pub const CART_KEY: &str = "cart";

const LOCAL_ID_PREFIX: &str = "local-";

/// Where a cart's lines are persisted. The store calls the targeted
/// operation for each mutation and `save_snapshot` after it; each strategy
/// implements only the half it needs.
#[async_trait]
pub trait CartPersistence: Send + Sync {
    fn identity(&self) -> Identity;

    async fn load(&self) -> Result<Vec<CartItem>, CartError>;

    /// Create a new line carrying a fresh product snapshot.
    async fn create_line(&self, product_id: &str, quantity: i32) -> Result<CartItem, CartError>;

    async fn update_line(&self, id: &str, quantity: i32) -> Result<(), CartError>;

    async fn delete_line(&self, id: &str) -> Result<(), CartError>;

    async fn delete_all(&self) -> Result<(), CartError>;

    async fn save_snapshot(&self, items: &[CartItem]) -> Result<(), CartError>;
}

/// Builds the persistence strategy for a session once its identity is known.
pub trait PersistenceFactory: Send + Sync {
    fn guest(&self, session_id: Uuid) -> Box<dyn CartPersistence>;

    fn user(&self, user_id: Uuid) -> Box<dyn CartPersistence>;

    fn for_identity(&self, session_id: Uuid, identity: Identity) -> Box<dyn CartPersistence> {
        match identity {
            Identity::Guest => self.guest(session_id),
            Identity::User(user_id) => self.user(user_id),
        }
    }
}

/// Guest carts: the whole list is serialised under [`CART_KEY`].
pub struct LocalCartPersistence {
    storage: Arc<dyn LocalStorage>,
    catalog: Arc<dyn CatalogSource>,
    last_id: AtomicI64,
}

impl LocalCartPersistence {
    pub fn new(storage: Arc<dyn LocalStorage>, catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            storage,
            catalog,
            last_id: AtomicI64::new(0),
        }
    }

    /// `local-<unix millis>`, strictly increasing within this session.
    fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        format!("{LOCAL_ID_PREFIX}{}", now.max(previous + 1))
    }

    async fn lookup_product(&self, product_id: &str) -> Result<Product, CartError> {
        match self.catalog.product(product_id).await {
            Ok(Some(product)) => Ok(product),
            Ok(None) => Err(CartError::ProductNotFound(product_id.to_string())),
            Err(err) => {
                tracing::warn!(error = %err, product_id, "product lookup failed, trying fallback catalog");
                fallback::product_by_id(product_id).ok_or(CartError::Catalog(err))
            }
        }
    }
}

#[async_trait]
impl CartPersistence for LocalCartPersistence {
    fn identity(&self) -> Identity {
        Identity::Guest
    }

    async fn load(&self) -> Result<Vec<CartItem>, CartError> {
        let Some(raw) = self.storage.get_item(CART_KEY).await? else {
            return Ok(Vec::new());
        };
        let items: Vec<CartItem> = serde_json::from_str(&raw)?;

        let newest = items
            .iter()
            .filter_map(|item| item.id.strip_prefix(LOCAL_ID_PREFIX)?.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        self.last_id.fetch_max(newest, Ordering::SeqCst);

        Ok(items)
    }

    async fn create_line(&self, product_id: &str, quantity: i32) -> Result<CartItem, CartError> {
        let product = self.lookup_product(product_id).await?;
        Ok(CartItem {
            id: self.next_id(),
            product_id: product_id.to_string(),
            quantity,
            product: CartProduct::from(&product),
        })
    }

    async fn update_line(&self, _id: &str, _quantity: i32) -> Result<(), CartError> {
        Ok(())
    }

    async fn delete_line(&self, _id: &str) -> Result<(), CartError> {
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), CartError> {
        self.storage.remove_item(CART_KEY).await?;
        Ok(())
    }

    async fn save_snapshot(&self, items: &[CartItem]) -> Result<(), CartError> {
        let raw = serde_json::to_string(items)?;
        self.storage.set_item(CART_KEY, &raw).await?;
        Ok(())
    }
}

/// Authenticated carts: one `cart_items` row per line, keyed by user.
pub struct RemoteCartPersistence {
    orm: OrmConn,
    user_id: Uuid,
}

impl RemoteCartPersistence {
    pub fn new(orm: OrmConn, user_id: Uuid) -> Self {
        Self { orm, user_id }
    }

    fn parse_line_id(id: &str) -> Result<Uuid, CartError> {
        Uuid::parse_str(id).map_err(|_| CartError::LineNotFound(id.to_string()))
    }
}

fn line_from_entity(line: crate::entity::cart_items::Model, product: ProductModel) -> CartItem {
    let product = Product::from(product);
    CartItem {
        id: line.id.to_string(),
        product_id: line.product_id,
        quantity: line.quantity,
        product: CartProduct::from(&product),
    }
}

#[async_trait]
impl CartPersistence for RemoteCartPersistence {
    fn identity(&self) -> Identity {
        Identity::User(self.user_id)
    }

    async fn load(&self) -> Result<Vec<CartItem>, CartError> {
        let rows = CartItems::find()
            .filter(CartCol::UserId.eq(self.user_id))
            .order_by_asc(CartCol::CreatedAt)
            .find_also_related(Products)
            .all(&self.orm)
            .await?;

        let items = rows
            .into_iter()
            .filter_map(|(line, product)| match product {
                Some(product) => Some(line_from_entity(line, product)),
                None => {
                    tracing::warn!(line_id = %line.id, product_id = %line.product_id, "cart line without product skipped");
                    None
                }
            })
            .collect();
        Ok(items)
    }

    async fn create_line(&self, product_id: &str, quantity: i32) -> Result<CartItem, CartError> {
        let id = Uuid::new_v4();
        let inserted = CartActive {
            id: Set(id),
            user_id: Set(self.user_id),
            product_id: Set(product_id.to_string()),
            quantity: Set(quantity),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await;

        if let Err(err) = inserted {
            return Err(match err.sql_err() {
                Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                    CartError::ProductNotFound(product_id.to_string())
                }
                _ => CartError::Database(err),
            });
        }

        let row = CartItems::find_by_id(id)
            .find_also_related(Products)
            .one(&self.orm)
            .await?;
        match row {
            Some((line, Some(product))) => Ok(line_from_entity(line, product)),
            _ => Err(CartError::Database(DbErr::RecordNotFound(format!(
                "cart line {id} vanished after insert"
            )))),
        }
    }

    async fn update_line(&self, id: &str, quantity: i32) -> Result<(), CartError> {
        let id = Self::parse_line_id(id)?;
        CartItems::update_many()
            .col_expr(CartCol::Quantity, Expr::value(quantity))
            .filter(CartCol::Id.eq(id))
            .filter(CartCol::UserId.eq(self.user_id))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn delete_line(&self, id: &str) -> Result<(), CartError> {
        let id = Self::parse_line_id(id)?;
        CartItems::delete_many()
            .filter(CartCol::Id.eq(id))
            .filter(CartCol::UserId.eq(self.user_id))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), CartError> {
        CartItems::delete_many()
            .filter(CartCol::UserId.eq(self.user_id))
            .exec(&self.orm)
            .await?;
        Ok(())
    }

    async fn save_snapshot(&self, _items: &[CartItem]) -> Result<(), CartError> {
        Ok(())
    }
}

/// Production factory: guest carts in per-session files, user carts in
/// Postgres.
pub struct StorefrontPersistence {
    orm: OrmConn,
    catalog: Arc<dyn CatalogSource>,
    storage_root: PathBuf,
}

impl StorefrontPersistence {
    pub fn new(orm: OrmConn, catalog: Arc<dyn CatalogSource>, storage_root: PathBuf) -> Self {
        Self {
            orm,
            catalog,
            storage_root,
        }
    }
}

impl PersistenceFactory for StorefrontPersistence {
    fn guest(&self, session_id: Uuid) -> Box<dyn CartPersistence> {
        let storage = FileStorage::new(self.storage_root.join(session_id.to_string()));
        Box::new(LocalCartPersistence::new(
            Arc::new(storage),
            self.catalog.clone(),
        ))
    }

    fn user(&self, user_id: Uuid) -> Box<dyn CartPersistence> {
        Box::new(RemoteCartPersistence::new(self.orm.clone(), user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage::MemoryStorage, testing::FakeCatalog};

    fn local(catalog: FakeCatalog) -> (LocalCartPersistence, MemoryStorage) {
        let storage = MemoryStorage::default();
        let persistence =
            LocalCartPersistence::new(Arc::new(storage.clone()), Arc::new(catalog));
        (persistence, storage)
    }

    #[tokio::test]
    async fn local_ids_are_unique_and_prefixed() {
        let (persistence, _) = local(FakeCatalog::with_fallback_products());
        let a = persistence.create_line("1", 1).await.unwrap();
        let b = persistence.create_line("2", 1).await.unwrap();
        assert!(a.id.starts_with("local-"));
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn local_create_uses_fallback_when_catalog_is_offline() {
        let (persistence, _) = local(FakeCatalog::offline());
        let line = persistence.create_line("1", 2).await.unwrap();
        assert_eq!(line.product.name, "Wireless Headphones");
        assert_eq!(line.product.price, 12999);

        let err = persistence.create_line("42", 1).await.unwrap_err();
        assert!(matches!(err, CartError::Catalog(_)));
    }

    #[tokio::test]
    async fn local_create_rejects_unknown_product() {
        let (persistence, _) = local(FakeCatalog::with_fallback_products());
        let err = persistence.create_line("nope", 1).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn local_snapshot_survives_a_new_strategy_instance() {
        let storage = MemoryStorage::default();
        let catalog: Arc<dyn CatalogSource> = Arc::new(FakeCatalog::with_fallback_products());
        let first = LocalCartPersistence::new(Arc::new(storage.clone()), catalog.clone());
        let line = first.create_line("3", 1).await.unwrap();
        first.save_snapshot(std::slice::from_ref(&line)).await.unwrap();

        let second = LocalCartPersistence::new(Arc::new(storage.clone()), catalog);
        assert_eq!(second.load().await.unwrap(), vec![line.clone()]);
        // ids keep increasing past what was loaded
        let next = second.create_line("4", 1).await.unwrap();
        assert_ne!(next.id, line.id);
    }

    #[tokio::test]
    async fn local_delete_all_removes_the_key() {
        let (persistence, storage) = local(FakeCatalog::with_fallback_products());
        persistence.save_snapshot(&[]).await.unwrap();
        assert!(storage.get_item(CART_KEY).await.unwrap().is_some());
        persistence.delete_all().await.unwrap();
        assert!(storage.get_item(CART_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let (persistence, storage) = local(FakeCatalog::with_fallback_products());
        storage.set_item(CART_KEY, "{not json").await.unwrap();
        assert!(matches!(
            persistence.load().await.unwrap_err(),
            CartError::Snapshot(_)
        ));
    }
}

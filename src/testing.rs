//! In-memory stand-ins for the database-backed seams, used by unit tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::{
    cart::{CartError, CartPersistence, Identity, LocalCartPersistence, PersistenceFactory},
    catalog::{CatalogSource, FetchError, ProductFilter, fallback},
    models::{CartItem, CartProduct, Category, Product, Review},
    storage::MemoryStorage,
};

fn offline_error() -> FetchError {
    FetchError::Query(DbErr::Conn(sea_orm::RuntimeErr::Internal(
        "connection refused".to_string(),
    )))
}

/// Catalog backed by a fixed product list, or always failing when offline.
pub struct FakeCatalog {
    products: Vec<Product>,
    offline: bool,
}

impl FakeCatalog {
    pub fn with_fallback_products() -> Self {
        Self {
            products: fallback::products(),
            offline: false,
        }
    }

    pub fn offline() -> Self {
        Self {
            products: Vec::new(),
            offline: true,
        }
    }

    fn check(&self) -> Result<(), FetchError> {
        if self.offline {
            Err(offline_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn products(&self, _filter: &ProductFilter) -> Result<Vec<Product>, FetchError> {
        self.check()?;
        Ok(self.products.clone())
    }

    async fn product(&self, id: &str) -> Result<Option<Product>, FetchError> {
        self.check()?;
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn related_products(
        &self,
        id: &str,
        category: &str,
    ) -> Result<Vec<Product>, FetchError> {
        self.check()?;
        Ok(self
            .products
            .iter()
            .filter(|p| p.id != id && p.category == category)
            .cloned()
            .collect())
    }

    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        self.check()?;
        Ok(fallback::categories())
    }

    async fn reviews(&self, _product_id: &str) -> Result<Vec<Review>, FetchError> {
        self.check()?;
        Ok(Vec::new())
    }
}

/// A server-side cart kept in memory. Clones share rows and failure switches.
#[derive(Clone)]
pub struct FakeRemote {
    user_id: Uuid,
    rows: Arc<Mutex<Vec<CartItem>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl FakeRemote {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            rows: Arc::default(),
            fail_reads: Arc::default(),
            fail_writes: Arc::default(),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<CartItem> {
        self.rows.lock().unwrap().clone()
    }

    /// Insert a row directly, as if written by another session.
    pub fn seed(&self, product_id: &str, quantity: i32) {
        let line = Self::line(product_id, quantity).unwrap();
        self.rows.lock().unwrap().push(line);
    }

    fn line(product_id: &str, quantity: i32) -> Result<CartItem, CartError> {
        let product = fallback::product_by_id(product_id)
            .ok_or_else(|| CartError::ProductNotFound(product_id.to_string()))?;
        Ok(CartItem {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity,
            product: CartProduct::from(&product),
        })
    }

    fn check_write(&self) -> Result<(), CartError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CartError::Database(DbErr::Custom("write rejected".into())));
        }
        Ok(())
    }
}

#[async_trait]
impl CartPersistence for FakeRemote {
    fn identity(&self) -> Identity {
        Identity::User(self.user_id)
    }

    async fn load(&self) -> Result<Vec<CartItem>, CartError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CartError::Database(DbErr::Custom("read rejected".into())));
        }
        Ok(self.rows())
    }

    async fn create_line(&self, product_id: &str, quantity: i32) -> Result<CartItem, CartError> {
        self.check_write()?;
        let line = Self::line(product_id, quantity)?;
        self.rows.lock().unwrap().push(line.clone());
        Ok(line)
    }

    async fn update_line(&self, id: &str, quantity: i32) -> Result<(), CartError> {
        self.check_write()?;
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_line(&self, id: &str) -> Result<(), CartError> {
        self.check_write()?;
        self.rows.lock().unwrap().retain(|row| row.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), CartError> {
        self.check_write()?;
        self.rows.lock().unwrap().clear();
        Ok(())
    }

    async fn save_snapshot(&self, _items: &[CartItem]) -> Result<(), CartError> {
        Ok(())
    }
}

/// Guest storage per session and one [`FakeRemote`] per user.
#[derive(Default)]
pub struct FakeFactory {
    guests: Mutex<HashMap<Uuid, MemoryStorage>>,
    users: Mutex<HashMap<Uuid, FakeRemote>>,
}

impl FakeFactory {
    pub fn remote(&self, user_id: Uuid) -> FakeRemote {
        self.users
            .lock()
            .unwrap()
            .entry(user_id)
            .or_insert_with(|| FakeRemote::new(user_id))
            .clone()
    }
}

impl PersistenceFactory for FakeFactory {
    fn guest(&self, session_id: Uuid) -> Box<dyn CartPersistence> {
        let storage = self
            .guests
            .lock()
            .unwrap()
            .entry(session_id)
            .or_default()
            .clone();
        Box::new(LocalCartPersistence::new(
            Arc::new(storage),
            Arc::new(FakeCatalog::with_fallback_products()),
        ))
    }

    fn user(&self, user_id: Uuid) -> Box<dyn CartPersistence> {
        Box::new(self.remote(user_id))
    }
}

//! The shopping cart of one session.
//!
//! A [`CartStore`] owns the in-memory line list and delegates durability to a
//! [`CartPersistence`] strategy chosen by identity: guests persist to local
//! storage, signed-in users to the `cart_items` table.

pub mod persistence;
pub mod sessions;

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{catalog::FetchError, models::CartItem, storage::StorageError};

pub use persistence::{
    CartPersistence, LocalCartPersistence, PersistenceFactory, RemoteCartPersistence,
    StorefrontPersistence,
};
pub use sessions::CartSessions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Guest,
    User(Uuid),
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Guest => None,
            Identity::User(id) => Some(*id),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Identity::Guest => "guest",
            Identity::User(_) => "authenticated",
        }
    }
}

/// What happens to a guest cart when its session signs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignInPolicy {
    /// The server cart replaces the guest cart; guest storage is kept.
    #[default]
    Replace,
    /// Guest lines are added to the server cart, then guest storage is cleared.
    Merge,
}

#[derive(Debug, Error)]
#[error("unknown sign-in policy `{0}` (expected `replace` or `merge`)")]
pub struct ParsePolicyError(String);

impl FromStr for SignInPolicy {
    type Err = ParsePolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(SignInPolicy::Replace),
            "merge" => Ok(SignInPolicy::Merge),
            _ => Err(ParsePolicyError(raw.to_string())),
        }
    }
}

impl fmt::Display for SignInPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignInPolicy::Replace => f.write_str("replace"),
            SignInPolicy::Merge => f.write_str("merge"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CartError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("Quantity for product {0} is too large")]
    QuantityTooLarge(String),

    #[error("Product {0} not found")]
    ProductNotFound(String),

    #[error("Cart item {0} not found")]
    LineNotFound(String),

    #[error("cart database request failed: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("cart storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("stored cart is unreadable: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("product lookup failed: {0}")]
    Catalog(#[from] FetchError),
}

impl CartError {
    /// Errors caused by the request rather than by a backend.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CartError::InvalidQuantity(_)
                | CartError::QuantityTooLarge(_)
                | CartError::ProductNotFound(_)
                | CartError::LineNotFound(_)
        )
    }
}

pub struct CartStore {
    items: Vec<CartItem>,
    loading: bool,
    persistence: Box<dyn CartPersistence>,
}

impl CartStore {
    pub fn new(persistence: Box<dyn CartPersistence>) -> Self {
        Self {
            items: Vec::new(),
            loading: true,
            persistence,
        }
    }

    pub fn identity(&self) -> Identity {
        self.persistence.identity()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price * quantity` over all lines, in cents. Saturates.
    pub fn subtotal(&self) -> i64 {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(0, i64::saturating_add)
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Load the persisted cart. A failed load leaves the cart empty.
    pub async fn initialize(&mut self) {
        self.loading = true;
        match self.persistence.load().await {
            Ok(items) => self.items = items,
            Err(err) => {
                tracing::warn!(error = %err, mode = self.identity().mode(), "cart load failed, starting empty");
                self.items.clear();
            }
        }
        self.loading = false;
    }

    /// Add `quantity` units of a product. An existing line for the same
    /// product has its quantity increased instead.
    pub async fn add_to_cart(&mut self, product_id: &str, quantity: i32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let existing = self
            .items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| (item.id.clone(), item.quantity));
        if let Some((id, current)) = existing {
            let total = current
                .checked_add(quantity)
                .ok_or_else(|| CartError::QuantityTooLarge(product_id.to_string()))?;
            self.update_quantity(&id, total).await;
            return Ok(());
        }

        let line = self.persistence.create_line(product_id, quantity).await?;
        tracing::debug!(line_id = %line.id, product_id, quantity, "cart line created");
        self.items.push(line);
        self.save_snapshot().await;
        Ok(())
    }

    /// Set a line's quantity. Values below 1 are ignored. The in-memory
    /// list changes first; a failed write is logged and not rolled back.
    pub async fn update_quantity(&mut self, id: &str, quantity: i32) {
        if quantity < 1 {
            return;
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
        }

        if let Err(err) = self.persistence.update_line(id, quantity).await {
            tracing::warn!(error = %err, line_id = %id, quantity, "cart quantity write failed, keeping local state");
        }
        self.save_snapshot().await;
    }

    /// Remove a line. It leaves the in-memory list even when the delete
    /// fails; the error is still returned.
    pub async fn remove_from_cart(&mut self, id: &str) -> Result<(), CartError> {
        let result = self.persistence.delete_line(id).await;
        self.items.retain(|item| item.id != id);
        self.save_snapshot().await;
        result
    }

    /// Empty the cart. Memory is cleared even when the backend fails.
    pub async fn clear_cart(&mut self) -> Result<(), CartError> {
        let result = self.persistence.delete_all().await;
        self.items.clear();
        result
    }

    /// Swap persistence strategies after a sign-in or sign-out and reload.
    pub async fn switch_identity(
        &mut self,
        persistence: Box<dyn CartPersistence>,
        policy: SignInPolicy,
    ) {
        let previous = std::mem::replace(&mut self.persistence, persistence);
        let signing_in =
            previous.identity() == Identity::Guest && self.identity() != Identity::Guest;
        let guest_items = std::mem::take(&mut self.items);

        tracing::info!(
            from = previous.identity().mode(),
            to = self.identity().mode(),
            %policy,
            "cart identity changed"
        );
        self.initialize().await;

        if signing_in && policy == SignInPolicy::Merge && !guest_items.is_empty() {
            self.merge(previous.as_ref(), guest_items).await;
        }
    }

    async fn merge(&mut self, guest: &dyn CartPersistence, guest_items: Vec<CartItem>) {
        let mut merged_all = true;
        for line in guest_items {
            if let Err(err) = self.add_to_cart(&line.product_id, line.quantity).await {
                tracing::warn!(error = %err, product_id = %line.product_id, "guest cart line not merged");
                merged_all = false;
            }
        }

        if !merged_all {
            return;
        }
        if let Err(err) = guest.delete_all().await {
            tracing::warn!(error = %err, "guest cart storage not cleared after merge");
        }
    }

    async fn save_snapshot(&self) {
        if let Err(err) = self.persistence.save_snapshot(&self.items).await {
            tracing::warn!(error = %err, "cart snapshot not saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        catalog::CatalogSource,
        storage::{LocalStorage, MemoryStorage},
        testing::{FakeCatalog, FakeRemote},
    };

    fn guest_store(storage: &MemoryStorage) -> CartStore {
        let catalog: Arc<dyn CatalogSource> = Arc::new(FakeCatalog::with_fallback_products());
        CartStore::new(Box::new(LocalCartPersistence::new(
            Arc::new(storage.clone()),
            catalog,
        )))
    }

    async fn stored_guest_cart(storage: &MemoryStorage) -> Vec<CartItem> {
        let raw = storage
            .get_item(persistence::CART_KEY)
            .await
            .unwrap()
            .unwrap_or_else(|| "[]".to_string());
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn new_store_is_loading_until_initialized() {
        let mut store = guest_store(&MemoryStorage::default());
        assert!(store.is_loading());
        store.initialize().await;
        assert!(!store.is_loading());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn adding_the_same_product_sums_quantities() {
        let storage = MemoryStorage::default();
        let mut store = guest_store(&storage);
        store.initialize().await;

        store.add_to_cart("1", 1).await.unwrap();
        store.add_to_cart("1", 2).await.unwrap();

        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].quantity, 3);
        assert_eq!(store.subtotal(), 38997);
        assert_eq!(store.item_count(), 3);
        assert_eq!(stored_guest_cart(&storage).await, store.items());
    }

    #[tokio::test]
    async fn adding_past_the_quantity_limit_is_rejected() {
        let storage = MemoryStorage::default();
        let mut store = guest_store(&storage);
        store.initialize().await;

        store.add_to_cart("1", i32::MAX).await.unwrap();
        let err = store.add_to_cart("1", 1).await.unwrap_err();

        assert!(matches!(err, CartError::QuantityTooLarge(ref id) if id == "1"));
        assert!(err.is_client_error());
        assert_eq!(store.items()[0].quantity, i32::MAX);
        assert_eq!(stored_guest_cart(&storage).await, store.items());
    }

    #[tokio::test]
    async fn totals_do_not_overflow_on_huge_lines() {
        let mut store = guest_store(&MemoryStorage::default());
        store.initialize().await;
        store.add_to_cart("1", i32::MAX).await.unwrap();
        store.add_to_cart("2", i32::MAX).await.unwrap();

        assert_eq!(store.item_count(), 2 * i64::from(i32::MAX));
        assert_eq!(
            store.subtotal(),
            (12999 + 19999) * i64::from(i32::MAX)
        );
    }

    #[tokio::test]
    async fn add_rejects_non_positive_quantity() {
        let mut store = guest_store(&MemoryStorage::default());
        store.initialize().await;
        let err = store.add_to_cart("1", 0).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(0)));
        assert!(err.is_client_error());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_below_one_is_ignored() {
        let mut store = guest_store(&MemoryStorage::default());
        store.initialize().await;
        store.add_to_cart("2", 2).await.unwrap();
        let id = store.items()[0].id.clone();

        store.update_quantity(&id, 0).await;
        assert_eq!(store.items()[0].quantity, 2);

        store.update_quantity(&id, 5).await;
        assert_eq!(store.items()[0].quantity, 5);
    }

    #[tokio::test]
    async fn guest_cart_reloads_from_storage() {
        let storage = MemoryStorage::default();
        let mut store = guest_store(&storage);
        store.initialize().await;
        store.add_to_cart("3", 1).await.unwrap();
        store.add_to_cart("4", 2).await.unwrap();
        let id = store.items()[0].id.clone();
        store.remove_from_cart(&id).await.unwrap();

        let mut reloaded = guest_store(&storage);
        reloaded.initialize().await;
        assert_eq!(reloaded.items(), store.items());
        assert_eq!(reloaded.items()[0].product_id, "4");
    }

    #[tokio::test]
    async fn clearing_a_guest_cart_removes_the_stored_snapshot() {
        let storage = MemoryStorage::default();
        let mut store = guest_store(&storage);
        store.initialize().await;
        store.add_to_cart("1", 1).await.unwrap();

        store.clear_cart().await.unwrap();
        assert!(store.is_empty());
        assert!(
            storage
                .get_item(persistence::CART_KEY)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn corrupt_guest_snapshot_starts_empty() {
        let storage = MemoryStorage::default();
        storage
            .set_item(persistence::CART_KEY, "not json")
            .await
            .unwrap();
        let mut store = guest_store(&storage);
        store.initialize().await;
        assert!(store.is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn remote_update_failure_keeps_optimistic_quantity() {
        let remote = FakeRemote::new(Uuid::new_v4());
        let mut store = CartStore::new(Box::new(remote.clone()));
        store.initialize().await;
        store.add_to_cart("1", 1).await.unwrap();
        let id = store.items()[0].id.clone();

        remote.fail_writes(true);
        store.update_quantity(&id, 4).await;

        assert_eq!(store.items()[0].quantity, 4);
        assert_eq!(remote.rows()[0].quantity, 1);
    }

    #[tokio::test]
    async fn remote_remove_failure_still_drops_the_line() {
        let remote = FakeRemote::new(Uuid::new_v4());
        let mut store = CartStore::new(Box::new(remote.clone()));
        store.initialize().await;
        store.add_to_cart("1", 1).await.unwrap();
        let id = store.items()[0].id.clone();

        remote.fail_writes(true);
        assert!(store.remove_from_cart(&id).await.is_err());
        assert!(store.is_empty());
        assert_eq!(remote.rows().len(), 1);
    }

    #[tokio::test]
    async fn remote_clear_deletes_every_row() {
        let remote = FakeRemote::new(Uuid::new_v4());
        let mut store = CartStore::new(Box::new(remote.clone()));
        store.initialize().await;
        store.add_to_cart("1", 1).await.unwrap();
        store.add_to_cart("2", 1).await.unwrap();

        store.clear_cart().await.unwrap();
        assert!(store.is_empty());
        assert!(remote.rows().is_empty());
    }

    #[tokio::test]
    async fn remote_load_failure_starts_empty() {
        let remote = FakeRemote::new(Uuid::new_v4());
        remote.fail_reads(true);
        let mut store = CartStore::new(Box::new(remote));
        store.initialize().await;
        assert!(store.is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn sign_in_replace_shows_server_cart_and_keeps_guest_storage() {
        let storage = MemoryStorage::default();
        let mut store = guest_store(&storage);
        store.initialize().await;
        store.add_to_cart("1", 2).await.unwrap();

        let remote = FakeRemote::new(Uuid::new_v4());
        remote.seed("3", 1);
        store
            .switch_identity(Box::new(remote.clone()), SignInPolicy::Replace)
            .await;

        assert_eq!(store.identity(), remote.identity());
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].product_id, "3");
        assert_eq!(stored_guest_cart(&storage).await.len(), 1);
    }

    #[tokio::test]
    async fn sign_in_merge_adds_guest_lines_to_server_cart() {
        let storage = MemoryStorage::default();
        let mut store = guest_store(&storage);
        store.initialize().await;
        store.add_to_cart("1", 2).await.unwrap();
        store.add_to_cart("2", 1).await.unwrap();

        let remote = FakeRemote::new(Uuid::new_v4());
        remote.seed("1", 1);
        store
            .switch_identity(Box::new(remote.clone()), SignInPolicy::Merge)
            .await;

        let mut lines: Vec<(String, i32)> = store
            .items()
            .iter()
            .map(|item| (item.product_id.clone(), item.quantity))
            .collect();
        lines.sort();
        assert_eq!(lines, vec![("1".to_string(), 3), ("2".to_string(), 1)]);
        assert_eq!(remote.rows().len(), 2);
        assert!(
            storage
                .get_item(persistence::CART_KEY)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn sign_out_loads_the_guest_cart() {
        let storage = MemoryStorage::default();
        let mut guest = guest_store(&storage);
        guest.initialize().await;
        guest.add_to_cart("4", 1).await.unwrap();

        let remote = FakeRemote::new(Uuid::new_v4());
        remote.seed("2", 5);
        let mut store = CartStore::new(Box::new(remote));
        store.initialize().await;

        let catalog: Arc<dyn CatalogSource> = Arc::new(FakeCatalog::with_fallback_products());
        store
            .switch_identity(
                Box::new(LocalCartPersistence::new(Arc::new(storage), catalog)),
                SignInPolicy::Merge,
            )
            .await;

        assert_eq!(store.identity(), Identity::Guest);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].product_id, "4");
    }

    #[test]
    fn sign_in_policy_parses_case_insensitively() {
        assert_eq!("MERGE".parse::<SignInPolicy>().unwrap(), SignInPolicy::Merge);
        assert_eq!(" replace ".parse::<SignInPolicy>().unwrap(), SignInPolicy::Replace);
        assert!("both".parse::<SignInPolicy>().is_err());
    }
}

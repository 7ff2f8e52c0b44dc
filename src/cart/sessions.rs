use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{CartStore, Identity, PersistenceFactory, SignInPolicy};

struct SessionEntry {
    store: Arc<Mutex<CartStore>>,
    last_seen: Instant,
}

/// One [`CartStore`] per cart session. Requests on the same session are
/// serialised by the store's mutex.
pub struct CartSessions {
    factory: Arc<dyn PersistenceFactory>,
    policy: SignInPolicy,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl CartSessions {
    pub fn new(factory: Arc<dyn PersistenceFactory>, policy: SignInPolicy) -> Self {
        Self {
            factory,
            policy,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> SignInPolicy {
        self.policy
    }

    /// Lock the cart of `session_id`, loading it on first use and switching
    /// persistence when the caller's identity differs from the store's.
    pub async fn open(&self, session_id: Uuid, identity: Identity) -> OwnedMutexGuard<CartStore> {
        let store = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions.entry(session_id).or_insert_with(|| {
                tracing::debug!(%session_id, mode = identity.mode(), "cart session created");
                SessionEntry {
                    store: Arc::new(Mutex::new(CartStore::new(
                        self.factory.for_identity(session_id, identity),
                    ))),
                    last_seen: Instant::now(),
                }
            });
            entry.last_seen = Instant::now();
            entry.store.clone()
        };

        let mut cart = store.lock_owned().await;
        if cart.is_loading() {
            cart.initialize().await;
        }
        if cart.identity() != identity {
            cart.switch_identity(self.factory.for_identity(session_id, identity), self.policy)
                .await;
        }
        cart
    }

    /// Drop sessions not used for `max_idle`. Persisted carts are untouched.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < max_idle);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

//! Session cart with write-through persistence.
//!
//! The in-memory cart is authoritative for the current identity: every
//! mutation applies locally first, synchronously, and then schedules the
//! matching remote write without blocking. Remote failures keep the local
//! mutation (last write wins); they are logged and reported as
//! [`CartEvent::SyncFailed`] so the UI can warn, but never rolled back.
//!
//! Identity transitions replace the cart wholesale: anonymous sessions get an
//! empty cart and never touch the remote store, a signed-in identity gets its
//! remote rows verbatim. Items added while anonymous are discarded on
//! sign-in (replace, not merge).

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::aggregates::cart::{Cart, CartItem, QuantityUpdate};
use crate::domain::aggregates::Product;
use crate::domain::events::{CartEvent, DomainEvent, EventBus};
use crate::domain::value_objects::Money;
use crate::repo::{CartRepository, RepoResult};
use crate::session::{AuthSession, AuthUser};

struct Inner {
    cart: Cart,
    identity: Option<AuthUser>,
    /// Bumped on every identity transition; a load result carrying an older
    /// epoch is stale and must not be applied.
    epoch: u64,
    loading: bool,
}

/// The storefront's cart component. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<Mutex<Inner>>,
    repo: Arc<dyn CartRepository>,
    bus: EventBus,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl CartStore {
    pub fn new(repo: Arc<dyn CartRepository>, bus: EventBus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cart: Cart::empty(),
                identity: None,
                epoch: 0,
                loading: false,
            })),
            repo,
            bus,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending_lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Mutations (local-first, remote write scheduled fire-and-forget)
    // =========================================================================

    /// Add one unit: increments the quantity if the product is already in the
    /// cart, inserts it with quantity 1 otherwise. Callers must not pass an
    /// out-of-stock product.
    pub fn add_to_cart(&self, product: Product) {
        let product_id = product.id;
        let (user, quantity) = {
            let mut inner = self.lock();
            let quantity = inner.cart.add(product);
            (inner.identity.clone(), quantity)
        };
        if let Some(user) = user {
            let repo = Arc::clone(&self.repo);
            let user_id = user.id;
            self.schedule_write(user_id, Some(product_id), async move {
                repo.upsert_item(user_id, product_id, quantity).await
            });
        }
    }

    /// Remove the item. Removing something not in the cart is a no-op.
    pub fn remove_from_cart(&self, product_id: Uuid) {
        let user = {
            let mut inner = self.lock();
            inner.cart.remove(product_id);
            inner.identity.clone()
        };
        if let Some(user) = user {
            let repo = Arc::clone(&self.repo);
            let user_id = user.id;
            self.schedule_write(user_id, Some(product_id), async move {
                repo.remove_item(user_id, product_id).await
            });
        }
    }

    /// Replace the stored quantity; zero or below removes the item.
    pub fn update_quantity(&self, product_id: Uuid, quantity: i64) {
        let (user, outcome) = {
            let mut inner = self.lock();
            let outcome = inner.cart.set_quantity(product_id, quantity);
            (inner.identity.clone(), outcome)
        };
        let Some(user) = user else { return };
        let user_id = user.id;
        let repo = Arc::clone(&self.repo);
        match outcome {
            QuantityUpdate::Set(quantity) => {
                self.schedule_write(user_id, Some(product_id), async move {
                    repo.upsert_item(user_id, product_id, quantity).await
                });
            }
            QuantityUpdate::Removed => {
                self.schedule_write(user_id, Some(product_id), async move {
                    repo.remove_item(user_id, product_id).await
                });
            }
            QuantityUpdate::Absent => {}
        }
    }

    pub fn clear_cart(&self) {
        let user = {
            let mut inner = self.lock();
            inner.cart.clear();
            inner.identity.clone()
        };
        if let Some(user) = user {
            let repo = Arc::clone(&self.repo);
            let user_id = user.id;
            self.schedule_write(user_id, None, async move { repo.clear(user_id).await });
        }
    }

    // =========================================================================
    // Derived reads
    // =========================================================================

    pub fn items(&self) -> Vec<CartItem> {
        self.lock().cart.items().to_vec()
    }

    pub fn total_items(&self) -> u32 {
        self.lock().cart.total_items()
    }

    pub fn total_price(&self) -> Money {
        self.lock().cart.total_price()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().cart.is_empty()
    }

    /// False while the initial load for a freshly signed-in identity is still
    /// in flight; render a loading/empty cart until then.
    pub fn is_ready(&self) -> bool {
        !self.lock().loading
    }

    pub fn identity(&self) -> Option<AuthUser> {
        self.lock().identity.clone()
    }

    // =========================================================================
    // Identity transitions
    // =========================================================================

    /// React to an identity transition.
    ///
    /// Anonymous: the cart is discarded and left empty; the remote store is
    /// never read. Signed-in: local state is discarded and replaced with the
    /// identity's remote rows once the load completes. A notification that
    /// keeps the same user id (token refresh) changes nothing.
    pub async fn identity_changed(&self, identity: Option<AuthUser>) {
        let load = {
            let mut inner = self.lock();
            let new_id = identity.as_ref().map(|u| u.id);
            if new_id == inner.identity.as_ref().map(|u| u.id) {
                inner.identity = identity;
                return;
            }
            inner.epoch += 1;
            inner.cart = Cart::empty();
            inner.identity = identity.clone();
            match identity {
                None => {
                    inner.loading = false;
                    None
                }
                Some(user) => {
                    inner.loading = true;
                    Some((inner.epoch, user.id))
                }
            }
        };
        let Some((epoch, user_id)) = load else { return };

        let result = self.repo.load(user_id).await;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            // A newer transition superseded this load; drop the result.
            return;
        }
        inner.loading = false;
        match result {
            Ok(items) => inner.cart = Cart::from_items(items),
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "initial cart load failed; starting empty");
            }
        }
    }

    /// Subscribe to an auth session and drive [`Self::identity_changed`] for
    /// every transition. The returned handle lives as long as the session.
    pub fn attach(&self, session: &AuthSession) -> JoinHandle<()> {
        let mut rx = session.subscribe();
        let store = self.clone();
        tokio::spawn(async move {
            let current = rx.borrow_and_update().clone();
            store.identity_changed(current).await;
            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().clone();
                store.identity_changed(identity).await;
            }
        })
    }

    // =========================================================================
    // Remote write scheduling
    // =========================================================================

    fn schedule_write<F>(&self, user_id: Uuid, product_id: Option<Uuid>, write: F)
    where
        F: Future<Output = RepoResult<()>> + Send + 'static,
    {
        let bus = self.bus.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = write.await {
                tracing::warn!(
                    %user_id,
                    ?product_id,
                    error = %err,
                    "cart sync failed; local and remote carts may diverge"
                );
                bus.publish(DomainEvent::Cart(CartEvent::SyncFailed {
                    user_id,
                    product_id,
                }));
            }
        });
        self.pending_lock().push(handle);
    }

    /// Wait for every scheduled remote write to settle. Mutations remain
    /// fire-and-forget; this is a barrier for shutdown and tests.
    pub async fn flush(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut pending = self.pending_lock();
                pending.drain(..).collect()
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
    }
}

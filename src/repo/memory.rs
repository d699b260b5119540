//! In-memory adapters for the repository ports.
//!
//! Test doubles for the service layer: same contracts as the Postgres
//! adapters, plus failure and latency injection for exercising the
//! fire-and-forget sync paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::aggregates::{Address, CartItem, NewAddress, Product};

use super::{AddressRepository, CartRepository, ProductRepository, RepoError, RepoResult};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Mutex<Vec<Product>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, product: Product) {
        self.products.lock().await.push(product);
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn list_in_stock(&self) -> RepoResult<Vec<Product>> {
        Ok(self
            .products
            .lock()
            .await
            .iter()
            .filter(|p| p.in_stock)
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Product>> {
        Ok(self.products.lock().await.iter().find(|p| p.id == id).cloned())
    }
}

#[derive(Default)]
struct CartRows {
    /// Insertion-ordered (user, product, quantity) rows.
    rows: Vec<(Uuid, Uuid, u32)>,
    /// Product data joined into rows at load time.
    catalog: HashMap<Uuid, Product>,
}

#[derive(Default)]
pub struct InMemoryCartRepository {
    state: Mutex<CartRows>,
    fail_writes: AtomicBool,
    load_delay: Mutex<Option<Duration>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the product joinable at load time.
    pub async fn seed_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.catalog.insert(product.id, product);
    }

    /// Pre-populate a user's remote cart (product must be seeded too).
    pub async fn seed_row(&self, user_id: Uuid, product_id: Uuid, quantity: u32) {
        let mut state = self.state.lock().await;
        state.rows.push((user_id, product_id, quantity));
    }

    /// All writes fail with a storage error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every load, for exercising stale-load discard.
    pub async fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock().await = Some(delay);
    }

    /// Total persisted rows across all users.
    pub async fn total_rows(&self) -> usize {
        self.state.lock().await.rows.len()
    }

    pub async fn quantities(&self, user_id: Uuid) -> Vec<(Uuid, u32)> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .map(|(_, p, q)| (*p, *q))
            .collect()
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepoError::Unavailable("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn load(&self, user_id: Uuid) -> RepoResult<Vec<CartItem>> {
        let delay = *self.load_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().await;
        Ok(state
            .rows
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .filter_map(|(_, p, q)| {
                state.catalog.get(p).map(|product| CartItem {
                    product: product.clone(),
                    quantity: *q,
                })
            })
            .collect())
    }

    async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> RepoResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        match state
            .rows
            .iter_mut()
            .find(|(u, p, _)| *u == user_id && *p == product_id)
        {
            Some(row) => row.2 = quantity,
            None => state.rows.push((user_id, product_id, quantity)),
        }
        Ok(())
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        state.rows.retain(|(u, p, _)| !(*u == user_id && *p == product_id));
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> RepoResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        state.rows.retain(|(u, _, _)| *u != user_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAddressRepository {
    rows: Mutex<Vec<Address>>,
}

impl InMemoryAddressRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AddressRepository for InMemoryAddressRepository {
    async fn insert(&self, user_id: Uuid, address: NewAddress) -> RepoResult<Address> {
        // One lock covers demote + insert, mirroring the SQL transaction.
        let mut rows = self.rows.lock().await;
        if address.is_default {
            for row in rows.iter_mut().filter(|a| a.user_id == user_id) {
                row.is_default = false;
            }
        }
        let inserted = Address {
            id: Uuid::now_v7(),
            user_id,
            label: address.label,
            full_name: address.full_name,
            phone_number: address.phone_number,
            address_line1: address.address_line1,
            address_line2: address.address_line2,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            country: address.country,
            is_default: address.is_default,
            created_at: chrono::Utc::now(),
        };
        rows.push(inserted.clone());
        Ok(inserted)
    }

    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Address>> {
        // Newest first: reverse insertion order.
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut rows = self.rows.lock().await;
        let before = rows.len();
        rows.retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(rows.len() != before)
    }
}

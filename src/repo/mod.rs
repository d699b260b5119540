//! Repository ports.
//!
//! The storefront talks to one remote relational store through these traits;
//! adapters live in [`postgres`] (production) and [`memory`] (tests). All
//! write operations are scoped by the authenticated caller's user id.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Address, CartItem, NewAddress, Product};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = std::result::Result<T, RepoError>;

/// Read-only catalog access.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// All in-stock products, specifications attached.
    async fn list_in_stock(&self) -> RepoResult<Vec<Product>>;

    async fn get(&self, id: Uuid) -> RepoResult<Option<Product>>;
}

/// Persisted cart rows, composite-unique on (user, product).
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's cart rows joined with product data, oldest first.
    async fn load(&self, user_id: Uuid) -> RepoResult<Vec<CartItem>>;

    /// Insert or replace the stored quantity for (user, product).
    async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> RepoResult<()>;

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<()>;

    async fn clear(&self, user_id: Uuid) -> RepoResult<()>;
}

/// Saved delivery addresses.
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Persist a validated draft. When the draft asks for default, every
    /// other address of the user is demoted in the same transaction.
    async fn insert(&self, user_id: Uuid, address: NewAddress) -> RepoResult<Address>;

    /// The user's addresses, newest first.
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Address>>;

    /// Owner-scoped delete. Returns whether a row was removed.
    async fn delete(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;
}

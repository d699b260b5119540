//! Zentaro Storefront Core
//!
//! Themed e-commerce storefront backend: product catalog, per-user session
//! cart, address book and checkout.
//!
//! ## Features
//! - Read-only product catalog with per-product specifications
//! - Write-through session cart synced to a relational store
//! - Address book with a single-default-per-user invariant
//! - Checkout aggregation: coupons, serviceable-region gating, final total
//! - Identity-transition handling (sign-in, sign-out, user switch)

use thiserror::Error;

pub mod address_book;
pub mod cart_store;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod repo;
pub mod session;

// =============================================================================
// Error Types
// =============================================================================

/// Failures any public storefront operation can resolve to.
///
/// Every variant maps to one user-facing condition; callers never see an
/// unhandled rejection. Remote cart-sync failures are deliberately absent
/// here: the local mutation has already applied, so they surface as logged
/// warnings instead.
#[derive(Error, Debug)]
pub enum ZentaroError {
    #[error("product not found")]
    ProductNotFound,

    #[error("address not found or access denied")]
    AddressAccess,

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] validator::ValidationErrors),

    #[error("coupon code not recognized")]
    InvalidCoupon,

    #[error("cart is empty")]
    EmptyCart,

    #[error("no delivery address selected")]
    NoAddressSelected,

    #[error("delivery address is outside the serviceable region")]
    OutsideServiceableRegion,

    #[error(transparent)]
    Storage(#[from] repo::RepoError),
}

pub type Result<T> = std::result::Result<T, ZentaroError>;

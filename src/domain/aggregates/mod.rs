//! Aggregates module
pub mod address;
pub mod cart;
pub mod checkout;
pub mod product;

pub use address::{Address, NewAddress};
pub use cart::{Cart, CartItem, QuantityUpdate};
pub use checkout::{AppliedCoupon, CheckoutSession, PaymentMethod, SERVICEABLE_COUNTRY};
pub use product::{Category, Product};

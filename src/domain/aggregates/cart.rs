//! Cart aggregate.
//!
//! Holds the items for one user session. Invariants: at most one entry per
//! product id, and a stored quantity is always >= 1 (an update to zero or
//! below is a removal).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.product.price.multiply(self.quantity)
    }
}

/// Outcome of a quantity update, so callers know which remote write to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// Quantity replaced with the given value.
    Set(u32),
    /// Item removed (requested quantity was zero or below).
    Removed,
    /// Product id not present in the cart; nothing changed.
    Absent,
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn empty() -> Self {
        Self { items: vec![] }
    }

    /// Rebuild a cart from persisted rows. Rows arrive keyed by a unique
    /// (user, product) pair; a duplicate id folds into the existing entry.
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::empty();
        for item in items {
            match cart.items.iter_mut().find(|i| i.product.id == item.product.id) {
                Some(existing) => existing.quantity = item.quantity,
                None => cart.items.push(item),
            }
        }
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities, derived on every read.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of line totals, derived on every read.
    pub fn total_price(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(), |acc, i| acc.add(i.line_total()))
    }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<u32> {
        self.items
            .iter()
            .find(|i| i.product.id == product_id)
            .map(|i| i.quantity)
    }

    /// Add one unit of the product: increments if present, inserts with
    /// quantity 1 otherwise. Returns the resulting quantity.
    pub fn add(&mut self, product: Product) -> u32 {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product.id == product.id) {
            existing.quantity += 1;
            existing.quantity
        } else {
            self.items.push(CartItem { product, quantity: 1 });
            1
        }
    }

    /// Remove the item if present. Removing an absent id is a no-op.
    pub fn remove(&mut self, product_id: Uuid) {
        self.items.retain(|i| i.product.id != product_id);
    }

    /// Replace the stored quantity; zero or negative behaves as removal.
    pub fn set_quantity(&mut self, product_id: Uuid, quantity: i64) -> QuantityUpdate {
        if quantity <= 0 {
            self.remove(product_id);
            return QuantityUpdate::Removed;
        }
        match self.items.iter_mut().find(|i| i.product.id == product_id) {
            Some(item) => {
                item.quantity = quantity as u32;
                QuantityUpdate::Set(item.quantity)
            }
            None => QuantityUpdate::Absent,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::fixtures::product;

    #[test]
    fn test_add_merges_by_product_id() {
        let id = Uuid::new_v4();
        let mut cart = Cart::empty();
        assert_eq!(cart.add(product(id, "Kunai Set", 499)), 1);
        assert_eq!(cart.add(product(id, "Kunai Set", 499)), 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), Money::rupees(998));
    }

    #[test]
    fn test_totals_track_every_mutation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut cart = Cart::empty();
        cart.add(product(a, "Shuriken", 199));
        cart.add(product(b, "Headband", 299));
        cart.set_quantity(a, 3);
        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Money::rupees(199 * 3 + 299));
    }

    #[test]
    fn test_zero_and_negative_quantity_remove() {
        let id = Uuid::new_v4();

        let mut via_zero = Cart::empty();
        via_zero.add(product(id, "Gloves", 799));
        assert_eq!(via_zero.set_quantity(id, 0), QuantityUpdate::Removed);

        let mut via_negative = Cart::empty();
        via_negative.add(product(id, "Gloves", 799));
        assert_eq!(via_negative.set_quantity(id, -5), QuantityUpdate::Removed);

        let mut via_remove = Cart::empty();
        via_remove.add(product(id, "Gloves", 799));
        via_remove.remove(id);

        assert!(via_zero.is_empty());
        assert!(via_negative.is_empty());
        assert!(via_remove.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let id = Uuid::new_v4();
        let mut cart = Cart::empty();
        cart.add(product(id, "Cloak", 1299));
        cart.remove(id);
        cart.remove(id);
        assert!(cart.is_empty());
        assert_eq!(cart.total_items(), 0);
    }

    #[test]
    fn test_update_absent_id_is_a_no_op() {
        let mut cart = Cart::empty();
        cart.add(product(Uuid::new_v4(), "Belt", 399));
        let outcome = cart.set_quantity(Uuid::new_v4(), 4);
        assert_eq!(outcome, QuantityUpdate::Absent);
        assert_eq!(cart.total_items(), 1);
    }
}

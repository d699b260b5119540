//! Catalog records.
//!
//! Products are read-only from the storefront's perspective: the catalog is
//! maintained out of band, the storefront only lists and references it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::value_objects::Money;
use rust_decimal::Decimal;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    /// Category slug, denormalized from the category join.
    pub category: String,
    pub price: Money,
    /// Price before discount, when a discount is running.
    pub original_price: Option<Money>,
    /// Integer percent, 0 when no discount applies.
    pub discount: u8,
    pub rating: Decimal,
    pub reviews: i32,
    pub image_url: String,
    pub description: String,
    pub in_stock: bool,
    pub delivery_days: i16,
    /// Free-form spec sheet, e.g. "Material" -> "Carbon weave".
    pub specifications: HashMap<String, String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal in-stock product for cart and checkout tests.
    pub fn product(id: Uuid, name: &str, price: i64) -> Product {
        Product {
            id,
            name: name.to_string(),
            brand: "Zentaro".to_string(),
            category: "gear".to_string(),
            price: Money::rupees(price),
            original_price: None,
            discount: 0,
            rating: Decimal::new(45, 1),
            reviews: 12,
            image_url: "https://img.example/placeholder.png".to_string(),
            description: String::new(),
            in_stock: true,
            delivery_days: 3,
            specifications: HashMap::new(),
        }
    }
}

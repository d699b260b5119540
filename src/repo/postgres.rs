//! PostgreSQL adapters for the repository ports.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{Address, CartItem, NewAddress, Product};
use crate::domain::value_objects::Money;

use super::{AddressRepository, CartRepository, ProductRepository, RepoResult};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    brand: String,
    category: String,
    price: Decimal,
    original_price: Option<Decimal>,
    discount: i16,
    rating: Decimal,
    reviews: i32,
    image_url: String,
    description: String,
    in_stock: bool,
    delivery_days: i16,
}

#[derive(Debug, sqlx::FromRow)]
struct SpecRow {
    product_id: Uuid,
    spec_key: String,
    spec_value: String,
}

impl ProductRow {
    fn into_product(self, specifications: HashMap<String, String>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            brand: self.brand,
            category: self.category,
            price: Money::new(self.price),
            original_price: self.original_price.map(Money::new),
            discount: self.discount as u8,
            rating: self.rating,
            reviews: self.reviews,
            image_url: self.image_url,
            description: self.description,
            in_stock: self.in_stock,
            delivery_days: self.delivery_days,
            specifications,
        }
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.brand, c.slug AS category, p.price, \
     p.original_price, p.discount, p.rating, p.reviews, p.image_url, p.description, \
     p.in_stock, p.delivery_days";

#[derive(Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn specs_for(&self, ids: &[Uuid]) -> RepoResult<HashMap<Uuid, HashMap<String, String>>> {
        let rows = sqlx::query_as::<_, SpecRow>(
            "SELECT product_id, spec_key, spec_value FROM product_specs WHERE product_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<Uuid, HashMap<String, String>> = HashMap::new();
        for row in rows {
            by_product
                .entry(row.product_id)
                .or_default()
                .insert(row.spec_key, row.spec_value);
        }
        Ok(by_product)
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list_in_stock(&self) -> RepoResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON p.category_id = c.id \
             WHERE p.in_stock = TRUE ORDER BY p.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut specs = self.specs_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let product_specs = specs.remove(&r.id).unwrap_or_default();
                r.into_product(product_specs)
            })
            .collect())
    }

    async fn get(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON p.category_id = c.id \
             WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut specs = self.specs_for(&[row.id]).await?;
                let product_specs = specs.remove(&row.id).unwrap_or_default();
                Ok(Some(row.into_product(product_specs)))
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    quantity: i32,
    #[sqlx(flatten)]
    product: ProductRow,
}

#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn load(&self, user_id: Uuid) -> RepoResult<Vec<CartItem>> {
        let rows = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT ci.quantity, {PRODUCT_COLUMNS} FROM cart_items ci \
             JOIN products p ON ci.product_id = p.id \
             JOIN categories c ON p.category_id = c.id \
             WHERE ci.user_id = $1 ORDER BY ci.created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CartItem {
                product: r.product.into_product(HashMap::new()),
                quantity: r.quantity.max(1) as u32,
            })
            .collect())
    }

    async fn upsert_item(&self, user_id: Uuid, product_id: Uuid, quantity: u32) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO cart_items (id, user_id, product_id, quantity, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> RepoResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressRepository for PgAddressRepository {
    async fn insert(&self, user_id: Uuid, address: NewAddress) -> RepoResult<Address> {
        // Demote + insert must be one transaction: two concurrent "make
        // default" requests must not both end up default.
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let inserted = sqlx::query_as::<_, Address>(
            "INSERT INTO addresses \
             (id, user_id, label, full_name, phone_number, address_line1, address_line2, \
              city, state, postal_code, country, is_default, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW()) \
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(&address.label)
        .bind(&address.full_name)
        .bind(&address.phone_number)
        .bind(&address.address_line1)
        .bind(&address.address_line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Address>> {
        let rows = sqlx::query_as::<_, Address>(
            "SELECT * FROM addresses WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! Zentaro storefront service.
//!
//! HTTP surface over the storefront core: catalog reads, the per-user cart
//! rows, the address book and checkout. Caller identity arrives as a bearer
//! subject asserted by the external auth provider in front of this service;
//! every cart and address operation is scoped by it.

use anyhow::Result;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use zentaro::address_book::AddressBook;
use zentaro::cart_store::CartStore;
use zentaro::checkout::CheckoutAggregator;
use zentaro::config::Config;
use zentaro::domain::aggregates::cart::CartItem;
use zentaro::domain::aggregates::checkout::PaymentMethod;
use zentaro::domain::aggregates::{Address, NewAddress, Product};
use zentaro::domain::events::EventBus;
use zentaro::domain::value_objects::Money;
use zentaro::repo::postgres::{PgAddressRepository, PgCartRepository, PgProductRepository};
use zentaro::repo::{AddressRepository, CartRepository, ProductRepository};
use zentaro::session::AuthUser;
use zentaro::ZentaroError;

#[derive(Clone)]
pub struct AppState {
    products: Arc<dyn ProductRepository>,
    cart: Arc<dyn CartRepository>,
    addresses: Arc<dyn AddressRepository>,
    bus: EventBus,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let bus = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => EventBus::with_nats(client),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable; events stay in-process");
                EventBus::new()
            }
        },
        None => EventBus::new(),
    };

    let state = AppState {
        products: Arc::new(PgProductRepository::new(db.clone())),
        cart: Arc::new(PgCartRepository::new(db.clone())),
        addresses: Arc::new(PgAddressRepository::new(db)),
        bus,
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "zentaro"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/addresses", get(list_addresses).post(create_address))
        .route("/api/v1/addresses/:id", delete(delete_address))
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items/:product_id", put(put_cart_item).delete(delete_cart_item))
        .route("/api/v1/checkout", post(checkout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("🚀 Zentaro storefront listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

// =============================================================================
// Caller identity
// =============================================================================

/// Bearer subject extracted from `Authorization: Bearer <user-id>`. Token
/// issuance and verification belong to the auth provider fronting this
/// service; the subject reaching us is already authenticated.
struct Caller {
    user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = |msg: &str| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": msg })),
            )
        };
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing bearer token."))?;
        let subject = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Missing bearer token."))?;
        let user_id = Uuid::parse_str(subject.trim())
            .map_err(|_| unauthorized("Invalid bearer subject."))?;
        Ok(Caller { user_id })
    }
}

// =============================================================================
// Error mapping
// =============================================================================

struct ApiError(ZentaroError);

impl From<ZentaroError> for ApiError {
    fn from(err: ZentaroError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ZentaroError::ProductNotFound | ZentaroError::AddressAccess => StatusCode::NOT_FOUND,
            ZentaroError::InvalidAddress(_)
            | ZentaroError::InvalidCoupon
            | ZentaroError::EmptyCart
            | ZentaroError::NoAddressSelected
            | ZentaroError::OutsideServiceableRegion => StatusCode::BAD_REQUEST,
            ZentaroError::Storage(err) => {
                tracing::error!(error = %err, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

// =============================================================================
// Catalog
// =============================================================================

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = s.products.list_in_stock().await.map_err(ZentaroError::from)?;
    Ok(Json(products))
}

// =============================================================================
// Addresses
// =============================================================================

async fn list_addresses(
    State(s): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Address>>, ApiError> {
    let addresses = AddressBook::new(s.addresses.clone()).list(caller.user_id).await?;
    Ok(Json(addresses))
}

async fn create_address(
    State(s): State<AppState>,
    caller: Caller,
    Json(draft): Json<NewAddress>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let address = AddressBook::new(s.addresses.clone())
        .create(caller.user_id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

async fn delete_address(
    State(s): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    AddressBook::new(s.addresses.clone())
        .delete(id, caller.user_id)
        .await?;
    Ok(Json(serde_json::json!({ "message": "Address deleted." })))
}

// =============================================================================
// Cart rows (the remote side of the session cart)
// =============================================================================

async fn get_cart(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<CartItem>>, ApiError> {
    let items = s.cart.load(caller.user_id).await.map_err(ZentaroError::from)?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
struct SetQuantityRequest {
    quantity: i64,
}

async fn put_cart_item(
    State(s): State<AppState>,
    caller: Caller,
    Path(product_id): Path<Uuid>,
    Json(req): Json<SetQuantityRequest>,
) -> Result<StatusCode, ApiError> {
    s.products
        .get(product_id)
        .await
        .map_err(ZentaroError::from)?
        .ok_or(ZentaroError::ProductNotFound)?;

    // Quantity at or below zero is a removal by contract
    if req.quantity <= 0 {
        s.cart
            .remove_item(caller.user_id, product_id)
            .await
            .map_err(ZentaroError::from)?;
        return Ok(StatusCode::NO_CONTENT);
    }
    s.cart
        .upsert_item(caller.user_id, product_id, req.quantity as u32)
        .await
        .map_err(ZentaroError::from)?;
    Ok(StatusCode::OK)
}

async fn delete_cart_item(
    State(s): State<AppState>,
    caller: Caller,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    s.cart
        .remove_item(caller.user_id, product_id)
        .await
        .map_err(ZentaroError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_cart(State(s): State<AppState>, caller: Caller) -> Result<StatusCode, ApiError> {
    s.cart
        .clear(caller.user_id)
        .await
        .map_err(ZentaroError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Checkout
// =============================================================================

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    address_id: Option<Uuid>,
    #[serde(default)]
    payment_method: PaymentMethod,
    coupon: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    reference: String,
    subtotal: Money,
    discount: Money,
    total: Money,
    payment_method: PaymentMethod,
}

async fn checkout(
    State(s): State<AppState>,
    caller: Caller,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let cart = CartStore::new(s.cart.clone(), s.bus.clone());
    cart.identity_changed(Some(AuthUser::from_id(caller.user_id))).await;

    let mut aggregator = CheckoutAggregator::new(
        caller.user_id,
        cart.clone(),
        AddressBook::new(s.addresses.clone()),
        s.bus.clone(),
    );
    aggregator.load_addresses().await?;
    if let Some(address_id) = req.address_id {
        aggregator.select_address(address_id);
    }
    aggregator.set_payment_method(req.payment_method);
    if let Some(code) = req.coupon.as_deref() {
        aggregator.apply_coupon(code)?;
    }

    let subtotal = aggregator.subtotal();
    let discount = aggregator.discount();
    let confirmation = aggregator.place_order().await?;
    // Make sure the remote delete-all landed before we answer
    cart.flush().await;

    Ok(Json(CheckoutResponse {
        reference: confirmation.reference,
        subtotal,
        discount,
        total: confirmation.total,
        payment_method: confirmation.payment_method,
    }))
}

//! Checkout aggregation.
//!
//! Pulls the pieces of one checkout pass together: the session cart, the
//! user's address book and the coupon state. Placement stops at intent — a
//! confirmation is produced and the cart cleared, but no order record,
//! payment capture or inventory change happens here.

use uuid::Uuid;

use crate::address_book::AddressBook;
use crate::cart_store::CartStore;
use crate::domain::aggregates::checkout::{CheckoutSession, PaymentMethod, SERVICEABLE_COUNTRY};
use crate::domain::aggregates::Address;
use crate::domain::events::{CheckoutEvent, DomainEvent, EventBus};
use crate::domain::value_objects::Money;
use crate::{Result, ZentaroError};

#[derive(Clone, Debug)]
pub struct OrderConfirmation {
    pub reference: String,
    pub total: Money,
    pub payment_method: PaymentMethod,
}

/// One checkout screen's worth of state for a signed-in user. Dropped after
/// confirmation or navigation away; nothing here is persisted.
pub struct CheckoutAggregator {
    user_id: Uuid,
    cart: CartStore,
    addresses: AddressBook,
    bus: EventBus,
    session: CheckoutSession,
}

impl CheckoutAggregator {
    pub fn new(user_id: Uuid, cart: CartStore, addresses: AddressBook, bus: EventBus) -> Self {
        Self {
            user_id,
            cart,
            addresses,
            bus,
            session: CheckoutSession::new(),
        }
    }

    /// Load the user's addresses and preselect the default one (or the
    /// newest, when no default exists).
    pub async fn load_addresses(&mut self) -> Result<Vec<Address>> {
        let rows = self.addresses.list(self.user_id).await?;
        if let Some(primary) = rows.iter().find(|a| a.is_default).or_else(|| rows.first()) {
            self.session.select_address(primary.id);
        }
        Ok(rows)
    }

    pub fn select_address(&mut self, id: Uuid) {
        self.session.select_address(id);
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.session.set_payment_method(method);
    }

    pub fn subtotal(&self) -> Money {
        self.cart.total_price()
    }

    pub fn discount(&self) -> Money {
        self.session.discount()
    }

    pub fn apply_coupon(&mut self, code: &str) -> Result<Money> {
        let subtotal = self.subtotal();
        self.session.apply_coupon(code, subtotal)
    }

    pub fn final_total(&self) -> Money {
        self.session.final_total(self.subtotal())
    }

    /// Resolve the selected address and check it is deliverable. Reports
    /// "no address selected" and "outside serviceable region" as distinct
    /// conditions.
    pub async fn validate_for_placement(&self) -> Result<Address> {
        let id = self
            .session
            .selected_address()
            .ok_or(ZentaroError::NoAddressSelected)?;
        let address = self
            .addresses
            .list(self.user_id)
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(ZentaroError::AddressAccess)?;
        if !address.country.eq_ignore_ascii_case(SERVICEABLE_COUNTRY) {
            return Err(ZentaroError::OutsideServiceableRegion);
        }
        Ok(address)
    }

    /// Place the order: cart must be non-empty and the address deliverable.
    /// Emits the order-placed event and clears the cart. Any blocking
    /// condition leaves the cart untouched.
    pub async fn place_order(&mut self) -> Result<OrderConfirmation> {
        if self.cart.is_empty() {
            return Err(ZentaroError::EmptyCart);
        }
        let address = self.validate_for_placement().await?;

        let total = self.final_total();
        let payment_method = self.session.payment_method();
        let item_count = self.cart.total_items();
        let reference = format!("ORD-{:08}", rand::random::<u32>());

        self.bus.publish(DomainEvent::Checkout(CheckoutEvent::OrderPlaced {
            reference: reference.clone(),
            user_id: self.user_id,
            total: total.amount(),
            payment_method,
            item_count,
        }));
        self.cart.clear_cart();

        tracing::info!(
            %reference,
            user_id = %self.user_id,
            city = %address.city,
            %payment_method,
            "order placed"
        );

        Ok(OrderConfirmation {
            reference,
            total,
            payment_method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::fixtures::new_address;
    use crate::domain::aggregates::product::fixtures::product;
    use crate::repo::memory::{InMemoryAddressRepository, InMemoryCartRepository};
    use crate::session::fixtures::user;
    use crate::session::AuthUser;
    use std::sync::Arc;

    struct Fixture {
        user: AuthUser,
        cart: CartStore,
        cart_repo: Arc<InMemoryCartRepository>,
        addresses: Arc<InMemoryAddressRepository>,
        bus: EventBus,
    }

    impl Fixture {
        fn new() -> Self {
            let cart_repo = Arc::new(InMemoryCartRepository::new());
            let addresses = Arc::new(InMemoryAddressRepository::new());
            let bus = EventBus::new();
            Self {
                user: user("Naruto"),
                cart: CartStore::new(cart_repo.clone(), bus.clone()),
                cart_repo,
                addresses,
                bus,
            }
        }

        async fn signed_in_with_items(prices: &[i64]) -> Self {
            let fixture = Self::new();
            fixture.cart.identity_changed(Some(fixture.user.clone())).await;
            for (i, price) in prices.iter().enumerate() {
                fixture
                    .cart
                    .add_to_cart(product(Uuid::new_v4(), &format!("Gear {i}"), *price));
            }
            fixture.cart.flush().await;
            fixture
        }

        fn aggregator(&self) -> CheckoutAggregator {
            CheckoutAggregator::new(
                self.user.id,
                self.cart.clone(),
                AddressBook::new(self.addresses.clone()),
                self.bus.clone(),
            )
        }

        async fn add_address(&self, label: &str, is_default: bool, country: &str) -> Address {
            let mut draft = new_address(label, is_default);
            draft.country = country.to_string();
            AddressBook::new(self.addresses.clone())
                .create(self.user.id, draft)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_preselects_default_then_newest() {
        let fixture = Fixture::signed_in_with_items(&[500]).await;
        fixture.add_address("Home", false, SERVICEABLE_COUNTRY).await;
        let work = fixture.add_address("Work", true, SERVICEABLE_COUNTRY).await;

        let mut aggregator = fixture.aggregator();
        aggregator.load_addresses().await.unwrap();
        let address = aggregator.validate_for_placement().await.unwrap();
        assert_eq!(address.id, work.id);
    }

    #[tokio::test]
    async fn test_coupon_flows_into_final_total() {
        let fixture = Fixture::signed_in_with_items(&[600, 400]).await;
        let mut aggregator = fixture.aggregator();

        assert_eq!(aggregator.subtotal(), Money::rupees(1000));
        aggregator.apply_coupon("ZENTARO10").unwrap();
        assert_eq!(aggregator.final_total(), Money::rupees(900));

        assert!(aggregator.apply_coupon("BOGUS").is_err());
        assert_eq!(aggregator.final_total(), Money::rupees(1000));
    }

    #[tokio::test]
    async fn test_placement_blocked_without_address() {
        let fixture = Fixture::signed_in_with_items(&[500]).await;
        let mut events = fixture.bus.subscribe();
        let mut aggregator = fixture.aggregator();

        let err = aggregator.place_order().await.unwrap_err();
        assert!(matches!(err, ZentaroError::NoAddressSelected));
        assert_eq!(fixture.cart.total_items(), 1);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_placement_blocked_outside_serviceable_region() {
        let fixture = Fixture::signed_in_with_items(&[500]).await;
        fixture.add_address("Abroad", true, "Japan").await;
        let mut aggregator = fixture.aggregator();
        aggregator.load_addresses().await.unwrap();

        let err = aggregator.place_order().await.unwrap_err();
        assert!(matches!(err, ZentaroError::OutsideServiceableRegion));
        assert_eq!(fixture.cart.total_items(), 1);
    }

    #[tokio::test]
    async fn test_placement_blocked_on_empty_cart() {
        let fixture = Fixture::new();
        fixture.cart.identity_changed(Some(fixture.user.clone())).await;
        fixture.add_address("Home", true, SERVICEABLE_COUNTRY).await;
        let mut aggregator = fixture.aggregator();
        aggregator.load_addresses().await.unwrap();

        let err = aggregator.place_order().await.unwrap_err();
        assert!(matches!(err, ZentaroError::EmptyCart));
    }

    #[tokio::test]
    async fn test_successful_placement_clears_cart_and_emits() {
        let fixture = Fixture::signed_in_with_items(&[750, 250]).await;
        fixture.add_address("Home", true, SERVICEABLE_COUNTRY).await;
        let mut events = fixture.bus.subscribe();

        let mut aggregator = fixture.aggregator();
        aggregator.load_addresses().await.unwrap();
        aggregator.apply_coupon("ZENTARO10").unwrap();
        aggregator.set_payment_method(PaymentMethod::Upi);

        let confirmation = aggregator.place_order().await.unwrap();
        assert_eq!(confirmation.total, Money::rupees(900));
        assert_eq!(confirmation.payment_method, PaymentMethod::Upi);
        assert!(confirmation.reference.starts_with("ORD-"));

        // Local and remote carts both emptied
        fixture.cart.flush().await;
        assert!(fixture.cart.is_empty());
        assert!(fixture.cart_repo.quantities(fixture.user.id).await.is_empty());

        let event = events.recv().await.unwrap();
        match event {
            DomainEvent::Checkout(CheckoutEvent::OrderPlaced {
                reference,
                user_id,
                item_count,
                ..
            }) => {
                assert_eq!(reference, confirmation.reference);
                assert_eq!(user_id, fixture.user.id);
                assert_eq!(item_count, 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

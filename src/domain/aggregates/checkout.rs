//! Checkout session.
//!
//! Ephemeral state for one pass through the checkout screen: selected
//! address, payment channel, applied coupon. Never persisted; the session is
//! dropped after order confirmation or navigation away.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::value_objects::Money;
use crate::{Result, ZentaroError};

/// Orders ship within this country only.
pub const SERVICEABLE_COUNTRY: &str = "India";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "cod")]
    CashOnDelivery,
    Upi,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CashOnDelivery => write!(f, "Cash on Delivery"),
            Self::Upi => write!(f, "UPI"),
            Self::Card => write!(f, "Card"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Money,
}

#[derive(Clone, Debug, Default)]
pub struct CheckoutSession {
    selected_address: Option<Uuid>,
    payment_method: PaymentMethod,
    coupon: Option<AppliedCoupon>,
}

impl CheckoutSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_address(&mut self, id: Uuid) {
        self.selected_address = Some(id);
    }

    pub fn selected_address(&self) -> Option<Uuid> {
        self.selected_address
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    pub fn discount(&self) -> Money {
        self.coupon
            .as_ref()
            .map(|c| c.discount)
            .unwrap_or_else(Money::zero)
    }

    /// Apply a coupon code against the fixed table. Matching is
    /// case-insensitive; applying a new code always replaces the previous
    /// discount. An unrecognized code resets the discount and reports the
    /// invalid-coupon condition.
    pub fn apply_coupon(&mut self, code: &str, subtotal: Money) -> Result<Money> {
        let normalized = code.trim().to_uppercase();
        let discount = match normalized.as_str() {
            "ZENTARO10" => subtotal.percent(10),
            // Shipping is already free, so the coupon is a no-op success.
            "FREESHIP" => Money::zero(),
            _ => {
                self.coupon = None;
                return Err(ZentaroError::InvalidCoupon);
            }
        };
        self.coupon = Some(AppliedCoupon {
            code: normalized,
            discount,
        });
        Ok(discount)
    }

    /// Payable amount: `max(0, subtotal - min(discount, subtotal))`.
    pub fn final_total(&self, subtotal: Money) -> Money {
        subtotal.saturating_sub(self.discount().min(subtotal))
    }
}

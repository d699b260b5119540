//! Delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::checkout::SERVICEABLE_COUNTRY;

/// A saved delivery address. At most one address per user carries
/// `is_default = true`; promotion demotes the others in the same transaction.
///
/// Addresses are never edited in place: the flow is delete + recreate.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Address creation payload. Validation runs before any storage I/O, so a
/// malformed draft is never partially applied.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct NewAddress {
    #[validate(length(min = 1, message = "Label is required"))]
    pub label: String,
    #[validate(length(min = 2, max = 100, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 10, max = 15, message = "Minimum 10 digits required"))]
    pub phone_number: String,
    #[validate(length(min = 5, max = 200, message = "Detail required"))]
    pub address_line1: String,
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(min = 2, max = 100, message = "Required"))]
    pub city: String,
    #[validate(length(min = 2, message = "Required"))]
    pub state: String,
    #[validate(length(min = 5, max = 10, message = "Invalid code"))]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_country() -> String {
    SERVICEABLE_COUNTRY.to_string()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn new_address(label: &str, is_default: bool) -> NewAddress {
        NewAddress {
            label: label.to_string(),
            full_name: "Ibiki Morino".to_string(),
            phone_number: "9876543210".to_string(),
            address_line1: "14 Sarutobi Lane".to_string(),
            address_line2: None,
            city: "Mumbai".to_string(),
            state: "Maharashtra".to_string(),
            postal_code: "400001".to_string(),
            country: default_country(),
            is_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::new_address;
    use validator::Validate;

    #[test]
    fn test_valid_draft_passes() {
        assert!(new_address("Home", true).validate().is_ok());
    }

    #[test]
    fn test_field_rules() {
        let mut short_name = new_address("Home", false);
        short_name.full_name = "A".to_string();
        assert!(short_name.validate().is_err());

        let mut short_phone = new_address("Home", false);
        short_phone.phone_number = "12345".to_string();
        assert!(short_phone.validate().is_err());

        let mut short_line1 = new_address("Home", false);
        short_line1.address_line1 = "x".to_string();
        assert!(short_line1.validate().is_err());

        let mut no_label = new_address("", false);
        no_label.label.clear();
        assert!(no_label.validate().is_err());

        let mut bad_postal = new_address("Work", false);
        bad_postal.postal_code = "12".to_string();
        assert!(bad_postal.validate().is_err());

        let mut no_state = new_address("Work", false);
        no_state.state.clear();
        assert!(no_state.validate().is_err());

        let mut short_city = new_address("Work", false);
        short_city.city = "M".to_string();
        assert!(short_city.validate().is_err());
    }
}

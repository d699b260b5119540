//! Address book service.
//!
//! Thin policy layer over [`AddressRepository`]: input validation happens
//! here, before any storage I/O; the single-default invariant is enforced by
//! the repository inside one transaction.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Address, NewAddress};
use crate::repo::AddressRepository;
use crate::{Result, ZentaroError};

pub struct AddressBook {
    repo: Arc<dyn AddressRepository>,
}

impl AddressBook {
    pub fn new(repo: Arc<dyn AddressRepository>) -> Self {
        Self { repo }
    }

    /// Validate and persist a new address. A draft flagged default demotes
    /// the user's other addresses atomically; a first address created
    /// non-default stays non-default (no auto-promotion).
    pub async fn create(&self, user_id: Uuid, draft: NewAddress) -> Result<Address> {
        draft.validate()?;
        let address = self.repo.insert(user_id, draft).await?;
        tracing::info!(%user_id, address_id = %address.id, "address created");
        Ok(address)
    }

    /// The user's addresses, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Address>> {
        Ok(self.repo.list(user_id).await?)
    }

    /// Delete an address the caller owns. A missing row and a row owned by
    /// someone else are indistinguishable to the caller.
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        if self.repo.delete(id, user_id).await? {
            Ok(())
        } else {
            Err(ZentaroError::AddressAccess)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::fixtures::new_address;
    use crate::repo::memory::InMemoryAddressRepository;

    fn book() -> AddressBook {
        AddressBook::new(Arc::new(InMemoryAddressRepository::new()))
    }

    #[tokio::test]
    async fn test_new_default_demotes_all_others() {
        let book = book();
        let user = Uuid::new_v4();

        book.create(user, new_address("Home", true)).await.unwrap();
        book.create(user, new_address("Work", false)).await.unwrap();
        let z = book.create(user, new_address("Other", true)).await.unwrap();

        let addresses = book.list(user).await.unwrap();
        let defaults: Vec<_> = addresses.iter().filter(|a| a.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, z.id);
    }

    #[tokio::test]
    async fn test_demotion_is_scoped_to_the_owner() {
        let book = book();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        book.create(alice, new_address("Home", true)).await.unwrap();
        book.create(bob, new_address("Home", true)).await.unwrap();

        let alices = book.list(alice).await.unwrap();
        assert!(alices.iter().any(|a| a.is_default));
    }

    #[tokio::test]
    async fn test_first_address_is_not_auto_promoted() {
        let book = book();
        let user = Uuid::new_v4();
        let created = book.create(user, new_address("Home", false)).await.unwrap();
        assert!(!created.is_default);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let book = book();
        let user = Uuid::new_v4();
        book.create(user, new_address("Home", false)).await.unwrap();
        book.create(user, new_address("Work", false)).await.unwrap();
        book.create(user, new_address("Other", false)).await.unwrap();

        let labels: Vec<_> = book
            .list(user)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.label)
            .collect();
        assert_eq!(labels, vec!["Other", "Work", "Home"]);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_storage() {
        let book = book();
        let user = Uuid::new_v4();
        let mut draft = new_address("Home", true);
        draft.phone_number = "123".to_string();

        let err = book.create(user, draft).await.unwrap_err();
        assert!(matches!(err, ZentaroError::InvalidAddress(_)));
        assert!(book.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_is_denied() {
        let book = book();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let created = book.create(owner, new_address("Home", true)).await.unwrap();

        let err = book.delete(created.id, intruder).await.unwrap_err();
        assert!(matches!(err, ZentaroError::AddressAccess));
        // Row still there for the owner
        assert_eq!(book.list(owner).await.unwrap().len(), 1);

        book.delete(created.id, owner).await.unwrap();
        assert!(book.list(owner).await.unwrap().is_empty());
    }
}

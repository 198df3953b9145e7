//! Customer entity, the owning side of the customer/address relationship.
//!
//! # Invariants
//! - `id` is assigned on first save and never changes.
//! - `addresses` is `None` on every read that finds no addresses.
//! - The address collection is owned: saving the customer inserts new
//!   addresses, updates changed ones and deletes the ones no longer present.

use super::address::Address;
use super::lifecycle::{AuditStamps, Timestamp};
use super::validation::{require_text, ValidationError};
use super::{AddressId, CustomerId};
use crate::db::schema::{CUSTOMER_FIRST_NAME_MAX_CHARS, CUSTOMER_LAST_NAME_MAX_CHARS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    id: Option<CustomerId>,
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    stamps: AuditStamps,
    /// Owned addresses. `None` and an empty vector both mean "no addresses"
    /// when saving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,
}

impl Customer {
    /// Creates an unsaved customer without addresses.
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            stamps: AuditStamps::default(),
            addresses: None,
        }
    }

    /// Creates an unsaved customer with a caller-chosen id.
    ///
    /// Saving it inserts a row under that id, or updates the row when one
    /// already exists.
    pub fn with_id(
        id: CustomerId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if id.is_nil() {
            return Err(ValidationError::NilId { entity: "customer" });
        }
        let mut customer = Self::new(first_name, last_name);
        customer.id = Some(id);
        Ok(customer)
    }

    pub(crate) fn hydrate(
        id: CustomerId,
        first_name: String,
        last_name: String,
        stamps: AuditStamps,
    ) -> Self {
        Self {
            id: Some(id),
            first_name,
            last_name,
            stamps,
            addresses: None,
        }
    }

    pub fn id(&self) -> Option<CustomerId> {
        self.id
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.stamps.created_at()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.stamps.updated_at()
    }

    /// Owned addresses as a slice; empty when none are attached.
    pub fn addresses(&self) -> &[Address] {
        self.addresses.as_deref().unwrap_or_default()
    }

    /// Attaches an address; it is inserted on the next save.
    pub fn add_address(&mut self, address: Address) {
        self.addresses.get_or_insert_with(Vec::new).push(address);
    }

    /// Detaches the address with `id`; the next save deletes its row.
    pub fn remove_address(&mut self, id: AddressId) -> Option<Address> {
        let addresses = self.addresses.as_mut()?;
        let index = addresses.iter().position(|address| address.id() == Some(id))?;
        Some(addresses.remove(index))
    }

    /// Validates this customer and every attached address.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_some_and(|id| id.is_nil()) {
            return Err(ValidationError::NilId { entity: "customer" });
        }
        require_text(
            "customer",
            "first_name",
            &self.first_name,
            CUSTOMER_FIRST_NAME_MAX_CHARS,
        )?;
        require_text(
            "customer",
            "last_name",
            &self.last_name,
            CUSTOMER_LAST_NAME_MAX_CHARS,
        )?;
        self.addresses().iter().try_for_each(Address::validate)
    }

    pub(crate) fn is_dirty_against(&self, stored: &Customer) -> bool {
        self.first_name != stored.first_name || self.last_name != stored.last_name
    }

    pub(crate) fn assign_id(&mut self, id: CustomerId) {
        self.id = Some(id);
    }

    pub(crate) fn stamps(&self) -> &AuditStamps {
        &self.stamps
    }

    pub(crate) fn stamps_mut(&mut self) -> &mut AuditStamps {
        &mut self.stamps
    }

    pub(crate) fn restore_stamps(&mut self, stamps: AuditStamps) {
        self.stamps = stamps;
    }
}

/// Identity equality: equal ids are equal customers, unsaved ones never are.
impl PartialEq for Customer {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(left), Some(right)) if left == right)
    }
}

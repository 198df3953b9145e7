//! Address entity, owned by exactly one customer.

use super::lifecycle::{AuditStamps, Timestamp};
use super::validation::{require_text, ValidationError};
use super::{AddressId, CustomerId};
use crate::db::schema::{ADDRESS_NAME_MAX_CHARS, ADDRESS_ZIP_CODE_MAX_CHARS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Postal address attached to a [`Customer`](super::customer::Customer).
///
/// `id` and `customer_id` are assigned by the repository when the owning
/// customer is saved; neither changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    id: Option<AddressId>,
    pub name: String,
    pub zip_code: String,
    customer_id: Option<CustomerId>,
    #[serde(flatten)]
    stamps: AuditStamps,
}

impl Address {
    /// Creates an unsaved address.
    pub fn new(name: impl Into<String>, zip_code: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            zip_code: zip_code.into(),
            customer_id: None,
            stamps: AuditStamps::default(),
        }
    }

    /// Creates an unsaved address with a caller-chosen id.
    pub fn with_id(
        id: AddressId,
        name: impl Into<String>,
        zip_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if id.is_nil() {
            return Err(ValidationError::NilId { entity: "address" });
        }
        let mut address = Self::new(name, zip_code);
        address.id = Some(id);
        Ok(address)
    }

    pub(crate) fn hydrate(
        id: AddressId,
        name: String,
        zip_code: String,
        customer_id: CustomerId,
        stamps: AuditStamps,
    ) -> Self {
        Self {
            id: Some(id),
            name,
            zip_code,
            customer_id: Some(customer_id),
            stamps,
        }
    }

    pub fn id(&self) -> Option<AddressId> {
        self.id
    }

    /// Owning customer; `None` until the address has been saved.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn created_at(&self) -> Option<Timestamp> {
        self.stamps.created_at()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.stamps.updated_at()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_some_and(|id| id.is_nil()) {
            return Err(ValidationError::NilId { entity: "address" });
        }
        require_text("address", "name", &self.name, ADDRESS_NAME_MAX_CHARS)?;
        require_text(
            "address",
            "zip_code",
            &self.zip_code,
            ADDRESS_ZIP_CODE_MAX_CHARS,
        )?;
        Ok(())
    }

    /// Whether any updatable column differs from `stored`.
    pub(crate) fn is_dirty_against(&self, stored: &Address) -> bool {
        self.name != stored.name || self.zip_code != stored.zip_code
    }

    /// Assigns id and owner on first insert.
    pub(crate) fn attach(&mut self, owner: CustomerId) -> AddressId {
        let id = *self.id.get_or_insert_with(Uuid::new_v4);
        self.customer_id = Some(owner);
        id
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

/// Identity equality: equal ids are equal addresses, unsaved ones never are.
impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(left), Some(right)) if left == right)
    }
}

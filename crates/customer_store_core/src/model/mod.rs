//! Customer/address domain model.
//!
//! # Responsibility
//! - Define the two persisted entities and their audit stamps.
//! - Provide paging/sorting request and result types.
//!
//! # Invariants
//! - Entity identity is the storage-assigned id; equality compares ids only.
//! - An address is owned by exactly one customer once persisted.

pub mod address;
pub mod customer;
pub mod lifecycle;
pub mod page;
pub mod validation;

use uuid::Uuid;

/// Stable identifier of a persisted customer.
pub type CustomerId = Uuid;

/// Stable identifier of a persisted address.
pub type AddressId = Uuid;

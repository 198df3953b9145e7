//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Keep SQL and row mapping inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate entities before any SQL mutation.
//! - Lookups return `None` for missing rows; errors are reserved for
//!   invalid input and storage failures.

pub mod customer_repo;
pub mod error;
mod mapping;

//! Customer/address persistence over SQLite.
//!
//! Entities live in [`model`], storage bootstrap in [`db`], and the data
//! access contract in [`repo`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, DatabaseTarget, StoreConfig};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::address::Address;
pub use model::customer::Customer;
pub use model::lifecycle::Timestamp;
pub use model::page::{CustomerSortKey, Direction, Order, Page, PageRequest, PageRequestError, Sort};
pub use model::validation::ValidationError;
pub use model::{AddressId, CustomerId};
pub use repo::customer_repo::{
    parse_customer_id, CustomerRepository, SqliteCustomerRepository, TOP_BY_FIRST_NAME_LIMIT,
};
pub use repo::error::{RepoError, RepoResult};

/// Minimal health-check API for wiring checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

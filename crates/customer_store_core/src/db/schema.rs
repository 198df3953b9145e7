//! Static table/column declarations for the `customer` and `address` tables.
//!
//! # Responsibility
//! - Name every persisted column and its constraints in one place.
//! - Feed validation limits and repository readiness checks.
//!
//! # Invariants
//! - Declarations here must agree with `migrations/*.sql`; the
//!   `schema_declarations_match_migrated_tables` test guards this.

/// Maximum characters for `customer.first_name`.
pub const CUSTOMER_FIRST_NAME_MAX_CHARS: usize = 50;
/// Maximum characters for `customer.last_name`.
pub const CUSTOMER_LAST_NAME_MAX_CHARS: usize = 50;
/// Maximum characters for `address.name`.
pub const ADDRESS_NAME_MAX_CHARS: usize = 20;
/// Maximum characters for `address.zip_code`.
pub const ADDRESS_ZIP_CODE_MAX_CHARS: usize = 10;

/// Index backing first-name lookups.
pub const CUSTOMER_FIRST_NAME_INDEX: &str = "first_name_idx";
/// Index backing address hydration by owner.
pub const ADDRESS_CUSTOMER_ID_INDEX: &str = "address_customer_id_idx";

/// One persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub nullable: bool,
    pub max_chars: Option<usize>,
    /// `false` for columns written once at insert and guarded by triggers.
    pub updatable: bool,
}

impl Column {
    const fn required(name: &'static str, max_chars: Option<usize>) -> Self {
        Self {
            name,
            nullable: false,
            max_chars,
            updatable: true,
        }
    }

    const fn immutable(name: &'static str) -> Self {
        Self {
            name,
            nullable: false,
            max_chars: None,
            updatable: false,
        }
    }

    const fn optional(name: &'static str) -> Self {
        Self {
            name,
            nullable: true,
            max_chars: None,
            updatable: true,
        }
    }
}

/// One persisted table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    /// Looks up one column declaration by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Iterates declared column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }
}

pub const CUSTOMER_TABLE: Table = Table {
    name: "customer",
    columns: &[
        Column::immutable("id"),
        Column::required("first_name", Some(CUSTOMER_FIRST_NAME_MAX_CHARS)),
        Column::required("last_name", Some(CUSTOMER_LAST_NAME_MAX_CHARS)),
        Column::immutable("created_at"),
        Column::optional("updated_at"),
    ],
};

pub const ADDRESS_TABLE: Table = Table {
    name: "address",
    columns: &[
        Column::immutable("id"),
        Column::required("name", Some(ADDRESS_NAME_MAX_CHARS)),
        Column::required("zip_code", Some(ADDRESS_ZIP_CODE_MAX_CHARS)),
        Column::immutable("customer_id"),
        Column::immutable("created_at"),
        Column::optional("updated_at"),
    ],
};

/// Every table the repository layer requires, parents first.
pub const TABLES: &[Table] = &[CUSTOMER_TABLE, ADDRESS_TABLE];

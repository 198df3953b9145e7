//! Customer repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the only access path to `customer` rows and, through the owning
//!   customer, to `address` rows.
//! - Run lifecycle hooks and owned-collection synchronization on save.
//!
//! # Invariants
//! - Every call is one atomic unit of work: its own transaction in
//!   autocommit mode (`IMMEDIATE` for writes, `DEFERRED` for reads), a
//!   savepoint inside a transaction the caller already holds.
//! - Address rows are never joined into customer queries; they are loaded by
//!   a second query keyed on the selected customer ids.
//! - `created_at` is read back from storage on update, never taken from the
//!   caller.

use crate::db::migrations::{current_version, latest_version};
use crate::db::schema::{ADDRESS_TABLE, CUSTOMER_TABLE, TABLES};
use crate::model::address::Address;
use crate::model::customer::Customer;
use crate::model::page::{CustomerSortKey, Page, PageRequest};
use crate::model::validation::ValidationError;
use crate::model::{AddressId, CustomerId};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::mapping::{
    address_from_row, customer_from_row, id_to_db, select_from, stamp_to_db,
};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

/// Row cap of [`CustomerRepository::find_top10_by_first_name_order_by_last_name_asc`].
pub const TOP_BY_FIRST_NAME_LIMIT: u32 = 10;

const ADDRESS_LOAD_CHUNK: usize = 500;
const UNIT_OF_WORK_SAVEPOINT: &str = "customer_repository_uow";

/// Repository interface for customer persistence.
pub trait CustomerRepository {
    /// Inserts or updates `customer` and cascades to its addresses.
    ///
    /// Returns the written entity with ids and audit stamps populated.
    fn save(&self, customer: &Customer) -> RepoResult<Customer>;

    /// Like [`save`](Self::save), then re-reads the customer inside the same
    /// unit of work and returns the stored state.
    fn save_and_flush(&self, customer: &Customer) -> RepoResult<Customer>;

    /// Deletes every customer and every address.
    fn delete_all(&self) -> RepoResult<()>;

    /// Deletes one customer with its addresses; `false` when nothing matched.
    fn delete_by_id(&self, id: CustomerId) -> RepoResult<bool>;

    /// Deletes the stored row of `customer`; unsaved entities match nothing.
    fn delete(&self, customer: &Customer) -> RepoResult<bool> {
        match customer.id() {
            Some(id) => self.delete_by_id(id),
            None => Ok(false),
        }
    }

    fn find_by_id(&self, id: CustomerId) -> RepoResult<Option<Customer>>;

    fn exists_by_id(&self, id: CustomerId) -> RepoResult<bool>;

    fn count(&self) -> RepoResult<u64>;

    /// Up to ten customers with exactly `first_name`, by `last_name` ascending.
    ///
    /// Rows with equal `last_name` come back in storage order.
    fn find_top10_by_first_name_order_by_last_name_asc(
        &self,
        first_name: &str,
    ) -> RepoResult<Vec<Customer>>;

    /// One page of customers with exactly `first_name`.
    ///
    /// The request's sort is applied before slicing; totals cover every
    /// matching row.
    fn find_by_first_name(
        &self,
        first_name: &str,
        request: &PageRequest<CustomerSortKey>,
    ) -> RepoResult<Page<Customer>>;
}

/// Parses caller-supplied customer id text.
///
/// # Errors
/// - `RepoError::InvalidArgument` for malformed or nil ids.
pub fn parse_customer_id(value: &str) -> RepoResult<CustomerId> {
    let trimmed = value.trim();
    let id = Uuid::parse_str(trimmed).map_err(|err| {
        RepoError::InvalidArgument(format!("malformed customer id `{trimmed}`: {err}"))
    })?;
    if id.is_nil() {
        return Err(RepoError::InvalidArgument(
            "nil uuid is not a valid customer id".to_string(),
        ));
    }
    Ok(id)
}

/// SQLite-backed customer repository.
pub struct SqliteCustomerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCustomerRepository<'conn> {
    /// Constructs a repository over a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema does
    ///   not match the declared tables.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Runs `op` as one atomic unit of work.
    ///
    /// In autocommit mode `op` gets its own transaction with `behavior`;
    /// inside a caller transaction it runs under a savepoint instead.
    /// Either guard rolls back when `op` fails or unwinds.
    fn in_unit_of_work<T>(
        &self,
        behavior: TransactionBehavior,
        op: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        if self.conn.is_autocommit() {
            let tx = Transaction::new_unchecked(self.conn, behavior)?;
            let value = op(&tx)?;
            tx.commit()?;
            return Ok(value);
        }

        let savepoint = NestedUnitOfWork::begin(self.conn)?;
        let value = op(self.conn)?;
        savepoint.release()?;
        Ok(value)
    }

    fn read<T>(&self, op: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        self.in_unit_of_work(TransactionBehavior::Deferred, op)
    }

    fn write<T>(&self, op: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        self.in_unit_of_work(TransactionBehavior::Immediate, op)
    }
}

/// Savepoint inside a transaction the caller owns; rolled back on drop
/// unless released.
struct NestedUnitOfWork<'conn> {
    conn: &'conn Connection,
    released: bool,
}

impl<'conn> NestedUnitOfWork<'conn> {
    fn begin(conn: &'conn Connection) -> RepoResult<Self> {
        conn.execute_batch(&format!("SAVEPOINT {UNIT_OF_WORK_SAVEPOINT};"))?;
        Ok(Self {
            conn,
            released: false,
        })
    }

    fn release(mut self) -> RepoResult<()> {
        self.conn
            .execute_batch(&format!("RELEASE {UNIT_OF_WORK_SAVEPOINT};"))?;
        self.released = true;
        Ok(())
    }
}

impl Drop for NestedUnitOfWork<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.conn.execute_batch(&format!(
            "ROLLBACK TO {UNIT_OF_WORK_SAVEPOINT}; RELEASE {UNIT_OF_WORK_SAVEPOINT};"
        )) {
            warn!("event=unit_of_work_rollback module=repo status=error error={err}");
        }
    }
}

impl CustomerRepository for SqliteCustomerRepository<'_> {
    fn save(&self, customer: &Customer) -> RepoResult<Customer> {
        self.write(|conn| write_customer(conn, customer).map(|(_, written)| written))
    }

    fn save_and_flush(&self, customer: &Customer) -> RepoResult<Customer> {
        self.write(|conn| {
            let (id, _) = write_customer(conn, customer)?;
            let mut stored = select_customer(conn, id)?.ok_or_else(|| {
                RepoError::InvalidData(format!("customer {id} missing right after write"))
            })?;
            attach_addresses(conn, std::slice::from_mut(&mut stored))?;
            Ok(stored)
        })
    }

    fn delete_all(&self) -> RepoResult<()> {
        let (customers, addresses) = self.write(|conn| {
            let addresses = conn.execute("DELETE FROM address;", [])?;
            let customers = conn.execute("DELETE FROM customer;", [])?;
            Ok((customers, addresses))
        })?;
        info!(
            "event=customer_delete_all module=repo status=ok customers={customers} addresses={addresses}"
        );
        Ok(())
    }

    fn delete_by_id(&self, id: CustomerId) -> RepoResult<bool> {
        let deleted = self.write(|conn| {
            let addresses =
                conn.execute("DELETE FROM address WHERE customer_id = ?1;", [id_to_db(id)])?;
            let customers = conn.execute("DELETE FROM customer WHERE id = ?1;", [id_to_db(id)])?;
            Ok((customers, addresses))
        })?;
        debug!(
            "event=customer_delete module=repo status=ok customer_id={id} found={} addresses={}",
            deleted.0 > 0,
            deleted.1
        );
        Ok(deleted.0 > 0)
    }

    fn find_by_id(&self, id: CustomerId) -> RepoResult<Option<Customer>> {
        self.read(|conn| {
            let Some(mut customer) = select_customer(conn, id)? else {
                return Ok(None);
            };
            attach_addresses(conn, std::slice::from_mut(&mut customer))?;
            Ok(Some(customer))
        })
    }

    fn exists_by_id(&self, id: CustomerId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM customer WHERE id = ?1);",
            [id_to_db(id)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn count(&self) -> RepoResult<u64> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM customer;", [], |row| row.get(0))?;
        count_from_db(total)
    }

    fn find_top10_by_first_name_order_by_last_name_asc(
        &self,
        first_name: &str,
    ) -> RepoResult<Vec<Customer>> {
        let sql = format!(
            "{} WHERE first_name = ?1 ORDER BY last_name ASC LIMIT ?2;",
            select_from(&CUSTOMER_TABLE)
        );
        self.read(|conn| {
            let mut customers = query_customers(
                conn,
                &sql,
                vec![
                    Value::Text(first_name.to_string()),
                    Value::Integer(i64::from(TOP_BY_FIRST_NAME_LIMIT)),
                ],
            )?;
            attach_addresses(conn, &mut customers)?;
            Ok(customers)
        })
    }

    fn find_by_first_name(
        &self,
        first_name: &str,
        request: &PageRequest<CustomerSortKey>,
    ) -> RepoResult<Page<Customer>> {
        let offset = i64::try_from(request.offset()).map_err(|_| {
            RepoError::InvalidArgument(format!("page offset {} is too large", request.offset()))
        })?;
        let sql = format!(
            "{} WHERE first_name = ?1{} LIMIT ?2 OFFSET ?3;",
            select_from(&CUSTOMER_TABLE),
            request.sort().to_order_by_sql()
        );

        self.read(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM customer WHERE first_name = ?1;",
                [first_name],
                |row| row.get(0),
            )?;
            let total = count_from_db(total)?;

            let mut customers = query_customers(
                conn,
                &sql,
                vec![
                    Value::Text(first_name.to_string()),
                    Value::Integer(i64::from(request.size())),
                    Value::Integer(offset),
                ],
            )?;
            attach_addresses(conn, &mut customers)?;

            Ok(Page::new(customers, request, total))
        })
    }
}

#[derive(Debug, Default)]
struct AddressSync {
    inserted: usize,
    updated: usize,
    deleted: usize,
}

/// Validates, stamps and writes one customer plus its owned addresses.
fn write_customer(conn: &Connection, customer: &Customer) -> RepoResult<(CustomerId, Customer)> {
    customer.validate()?;

    let mut entity = customer.clone();
    let stored = match entity.id() {
        Some(id) => select_customer(conn, id)?,
        None => None,
    };

    let inserted = stored.is_none();
    let id = match stored {
        Some(stored) => update_customer_row(conn, &mut entity, &stored)?,
        None => insert_customer_row(conn, &mut entity)?,
    };
    let sync = sync_addresses(conn, id, &mut entity)?;

    debug!(
        "event=customer_save module=repo status=ok customer_id={id} inserted={inserted} addresses_inserted={} addresses_updated={} addresses_deleted={}",
        sync.inserted, sync.updated, sync.deleted
    );
    Ok((id, entity))
}

fn insert_customer_row(conn: &Connection, entity: &mut Customer) -> RepoResult<CustomerId> {
    let id = entity.id().unwrap_or_else(Uuid::new_v4);
    entity.assign_id(id);
    entity.stamps_mut().on_persist();

    conn.execute(
        "INSERT INTO customer (id, first_name, last_name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, NULL);",
        params![
            id_to_db(id),
            entity.first_name.as_str(),
            entity.last_name.as_str(),
            stamp_to_db(entity.created_at()),
        ],
    )?;
    Ok(id)
}

fn update_customer_row(
    conn: &Connection,
    entity: &mut Customer,
    stored: &Customer,
) -> RepoResult<CustomerId> {
    let id = stored
        .id()
        .ok_or_else(|| RepoError::InvalidData("stored customer without id".to_string()))?;
    entity.restore_stamps(*stored.stamps());
    if !entity.is_dirty_against(stored) {
        return Ok(id);
    }

    entity.stamps_mut().on_update();
    conn.execute(
        "UPDATE customer
         SET first_name = ?2, last_name = ?3, updated_at = ?4
         WHERE id = ?1;",
        params![
            id_to_db(id),
            entity.first_name.as_str(),
            entity.last_name.as_str(),
            stamp_to_db(entity.updated_at()),
        ],
    )?;
    Ok(id)
}

/// Makes the stored address rows of `owner` match `entity.addresses`.
///
/// New addresses are inserted, changed ones updated, and stored rows that
/// are no longer in the collection deleted.
fn sync_addresses(
    conn: &Connection,
    owner: CustomerId,
    entity: &mut Customer,
) -> RepoResult<AddressSync> {
    let mut stored: HashMap<AddressId, Address> = load_addresses(conn, &[owner])?
        .remove(&owner)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|address| address.id().map(|id| (id, address)))
        .collect();
    let mut sync = AddressSync::default();

    for address in entity.addresses.iter_mut().flatten() {
        if let Some(other) = address.customer_id().filter(|current| *current != owner) {
            return Err(ValidationError::ForeignAddress {
                address: address.id().unwrap_or_default(),
                owner: other,
                customer: owner,
            }
            .into());
        }

        match address.id().and_then(|id| stored.remove(&id)) {
            Some(previous) => {
                let id = address.attach(owner);
                address.restore_stamps(*previous.stamps());
                if address.is_dirty_against(&previous) {
                    address.stamps_mut().on_update();
                    conn.execute(
                        "UPDATE address
                         SET name = ?2, zip_code = ?3, updated_at = ?4
                         WHERE id = ?1 AND customer_id = ?5;",
                        params![
                            id_to_db(id),
                            address.name.as_str(),
                            address.zip_code.as_str(),
                            stamp_to_db(address.updated_at()),
                            id_to_db(owner),
                        ],
                    )?;
                    sync.updated += 1;
                }
            }
            None => {
                let id = address.attach(owner);
                address.stamps_mut().on_persist();
                conn.execute(
                    "INSERT INTO address (id, name, zip_code, customer_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, NULL);",
                    params![
                        id_to_db(id),
                        address.name.as_str(),
                        address.zip_code.as_str(),
                        id_to_db(owner),
                        stamp_to_db(address.created_at()),
                    ],
                )?;
                sync.inserted += 1;
            }
        }
    }

    for orphan in stored.keys() {
        conn.execute(
            "DELETE FROM address WHERE id = ?1 AND customer_id = ?2;",
            params![id_to_db(*orphan), id_to_db(owner)],
        )?;
        sync.deleted += 1;
    }

    Ok(sync)
}

fn select_customer(conn: &Connection, id: CustomerId) -> RepoResult<Option<Customer>> {
    let sql = format!("{} WHERE id = ?1;", select_from(&CUSTOMER_TABLE));
    let mut customers = query_customers(conn, &sql, vec![Value::Text(id_to_db(id))])?;
    Ok(customers.pop())
}

fn query_customers(conn: &Connection, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Customer>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut customers = Vec::new();
    while let Some(row) = rows.next()? {
        customers.push(customer_from_row(row)?);
    }
    Ok(customers)
}

/// Attaches stored addresses to each customer; customers without any keep
/// `addresses = None`.
fn attach_addresses(conn: &Connection, customers: &mut [Customer]) -> RepoResult<()> {
    let owners: Vec<CustomerId> = customers.iter().filter_map(Customer::id).collect();
    let mut by_owner = load_addresses(conn, &owners)?;
    for customer in customers.iter_mut() {
        customer.addresses = customer.id().and_then(|id| by_owner.remove(&id));
    }
    Ok(())
}

fn load_addresses(
    conn: &Connection,
    owners: &[CustomerId],
) -> RepoResult<HashMap<CustomerId, Vec<Address>>> {
    let mut by_owner: HashMap<CustomerId, Vec<Address>> = HashMap::new();

    for chunk in owners.chunks(ADDRESS_LOAD_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "{} WHERE customer_id IN ({placeholders}) ORDER BY created_at ASC, id ASC;",
            select_from(&ADDRESS_TABLE)
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter().map(|id| id_to_db(*id))))?;
        while let Some(row) = rows.next()? {
            let address = address_from_row(row)?;
            if let Some(owner) = address.customer_id() {
                by_owner.entry(owner).or_default().push(address);
            }
        }
    }

    Ok(by_owner)
}

fn count_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative row count `{value}`")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in TABLES {
        if !table_exists(conn, table.name)? {
            return Err(RepoError::MissingRequiredTable(table.name));
        }
        let present = table_columns(conn, table.name)?;
        if let Some(column) = table
            .column_names()
            .find(|column| !present.iter().any(|name| name == column))
        {
            return Err(RepoError::MissingRequiredColumn {
                table: table.name,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::{parse_customer_id, CustomerRepository, SqliteCustomerRepository};
    use crate::db::open_db_in_memory;
    use crate::model::customer::Customer;
    use crate::repo::error::RepoError;
    use rusqlite::TransactionBehavior;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn unwinding_unit_of_work_rolls_back_and_closes_transaction() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCustomerRepository::try_new(&conn).unwrap();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), RepoError> =
                repo.in_unit_of_work(TransactionBehavior::Immediate, |conn| {
                    conn.execute(
                        "INSERT INTO customer (id, first_name, last_name, created_at)
                         VALUES ('11111111-2222-4333-8444-555555555555', 'John', 'Wick', 0);",
                        [],
                    )?;
                    panic!("writer failed mid-way");
                });
        }));

        assert!(outcome.is_err());
        assert!(conn.is_autocommit());
        assert_eq!(repo.count().unwrap(), 0);
        repo.save(&Customer::new("John", "Wick")).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn unwinding_nested_unit_of_work_keeps_caller_transaction_usable() {
        let conn = open_db_in_memory().unwrap();
        let tx = conn.unchecked_transaction().unwrap();
        {
            let repo = SqliteCustomerRepository::try_new(&tx).unwrap();
            repo.save(&Customer::new("Bran", "Stark")).unwrap();

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let _: Result<(), RepoError> =
                    repo.in_unit_of_work(TransactionBehavior::Immediate, |conn| {
                        conn.execute("DELETE FROM customer;", [])?;
                        panic!("writer failed mid-way");
                    });
            }));

            assert!(outcome.is_err());
            assert!(!tx.is_autocommit());
            assert_eq!(repo.count().unwrap(), 1);
        }
        tx.commit().unwrap();
        assert_eq!(
            conn.query_row("SELECT COUNT(*) FROM customer;", [], |row| row.get::<_, i64>(0))
                .unwrap(),
            1
        );
    }

    #[test]
    fn parse_customer_id_accepts_hyphenated_uuid() {
        let id = parse_customer_id(" 11111111-2222-4333-8444-555555555555 ").unwrap();
        assert_eq!(id.to_string(), "11111111-2222-4333-8444-555555555555");
    }

    #[test]
    fn parse_customer_id_rejects_malformed_and_nil() {
        assert!(matches!(
            parse_customer_id("not-a-uuid"),
            Err(RepoError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_customer_id("00000000-0000-0000-0000-000000000000"),
            Err(RepoError::InvalidArgument(_))
        ));
    }
}

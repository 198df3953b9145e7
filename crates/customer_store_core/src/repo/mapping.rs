//! Row <-> entity mapping for the `customer` and `address` tables.
//!
//! Ids are stored as hyphenated UUID text, timestamps as epoch microseconds.

use crate::db::schema::{Table, ADDRESS_TABLE, CUSTOMER_TABLE};
use crate::model::address::Address;
use crate::model::customer::Customer;
use crate::model::lifecycle::{from_epoch_micros, to_epoch_micros, AuditStamps, Timestamp};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::Row;
use uuid::Uuid;

/// `SELECT <declared columns> FROM <table>`.
pub(crate) fn select_from(table: &Table) -> String {
    format!(
        "SELECT {} FROM {}",
        table.column_names().collect::<Vec<_>>().join(", "),
        table.name
    )
}

pub(crate) fn customer_from_row(row: &Row<'_>) -> RepoResult<Customer> {
    let table = CUSTOMER_TABLE.name;
    Ok(Customer::hydrate(
        uuid_column(row, table, "id")?,
        row.get("first_name")?,
        row.get("last_name")?,
        stamps_from_row(row, table)?,
    ))
}

pub(crate) fn address_from_row(row: &Row<'_>) -> RepoResult<Address> {
    let table = ADDRESS_TABLE.name;
    Ok(Address::hydrate(
        uuid_column(row, table, "id")?,
        row.get("name")?,
        row.get("zip_code")?,
        uuid_column(row, table, "customer_id")?,
        stamps_from_row(row, table)?,
    ))
}

pub(crate) fn id_to_db(id: Uuid) -> String {
    id.to_string()
}

pub(crate) fn stamp_to_db(value: Option<Timestamp>) -> Option<i64> {
    value.map(to_epoch_micros)
}

fn stamps_from_row(row: &Row<'_>, table: &'static str) -> RepoResult<AuditStamps> {
    let created_at = timestamp_column(row, table, "created_at")?.ok_or_else(|| {
        RepoError::InvalidData(format!("{table}.created_at is null"))
    })?;
    let updated_at = timestamp_column(row, table, "updated_at")?;
    Ok(AuditStamps::restored(created_at, updated_at))
}

fn timestamp_column(
    row: &Row<'_>,
    table: &'static str,
    column: &'static str,
) -> RepoResult<Option<Timestamp>> {
    match row.get::<_, Option<i64>>(column)? {
        None => Ok(None),
        Some(micros) => from_epoch_micros(micros).map(Some).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "timestamp `{micros}` out of range in {table}.{column}"
            ))
        }),
    }
}

fn uuid_column(row: &Row<'_>, table: &'static str, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{text}` in {table}.{column}"))
    })
}

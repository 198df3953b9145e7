//! CLI entry point for the customer store.
//!
//! # Usage
//! - no arguments: print linkage info and the stored customer count.
//! - `top <first_name>`: print up to ten customers by last name.
//! - `show <id>`: print one customer with its addresses.
//! - `page <first_name> <page> <size>`: print one page of customers by last
//!   name, followed by the page totals.
//!
//! Configuration comes from `CUSTOMER_STORE_*` environment variables.

use customer_store_core::db::{open_with_config, DbError};
use customer_store_core::{
    init_logging_from_config, parse_customer_id, ConfigError, Customer, CustomerRepository,
    CustomerSortKey, LoggingError, Order, PageRequest, RepoError, RepoResult, Sort,
    SqliteCustomerRepository, StoreConfig,
};
use log::error;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("usage: customer_store_cli [top <first_name> | show <id> | page <first_name> <page> <size>]")]
    Usage,
    #[error("customer {0} not found")]
    NotFound(String),
}

enum Command {
    Summary,
    Top(String),
    Show(String),
    Page {
        first_name: String,
        page: u32,
        size: u32,
    },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, CliError> {
        match args {
            [] => Ok(Self::Summary),
            [command, first_name] if command == "top" => Ok(Self::Top(first_name.clone())),
            [command, id] if command == "show" => Ok(Self::Show(id.clone())),
            [command, first_name, page, size] if command == "page" => Ok(Self::Page {
                first_name: first_name.clone(),
                page: page.parse().map_err(|_| CliError::Usage)?,
                size: size.parse().map_err(|_| CliError::Usage)?,
            }),
            _ => Err(CliError::Usage),
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), CliError> {
    let command = Command::parse(args)?;
    let config = StoreConfig::from_env()?;
    init_logging_from_config(&config)?;

    let conn = open_with_config(&config)?;
    let repo = SqliteCustomerRepository::try_new(&conn)?;

    match command {
        Command::Summary => {
            println!("customer_store_core ping={}", customer_store_core::ping());
            println!(
                "customer_store_core version={}",
                customer_store_core::core_version()
            );
            println!("customers count={}", repo.count()?);
        }
        Command::Top(first_name) => {
            for customer in repo.find_top10_by_first_name_order_by_last_name_asc(&first_name)? {
                print_customer(&customer);
            }
        }
        Command::Show(raw_id) => {
            let id = parse_customer_id(&raw_id)?;
            let customer = repo
                .find_by_id(id)?
                .ok_or_else(|| CliError::NotFound(id.to_string()))?;
            print_customer(&customer);
        }
        Command::Page {
            first_name,
            page,
            size,
        } => {
            let request = last_name_page(page, size)?;
            let page = repo.find_by_first_name(&first_name, &request)?;
            for customer in page.content() {
                print_customer(customer);
            }
            println!(
                "page={} size={} total_elements={} total_pages={}",
                page.number(),
                page.size(),
                page.total_elements(),
                page.total_pages()
            );
        }
    }
    Ok(())
}

fn last_name_page(page: u32, size: u32) -> RepoResult<PageRequest<CustomerSortKey>> {
    let sort = Sort::by([Order::asc(CustomerSortKey::LastName)]);
    Ok(PageRequest::of(page, size, sort)?)
}

fn print_customer(customer: &Customer) {
    let id = customer.id().map(|id| id.to_string()).unwrap_or_default();
    let created_at = customer
        .created_at()
        .map(|stamp| stamp.to_rfc3339())
        .unwrap_or_default();
    let updated_at = customer
        .updated_at()
        .map(|stamp| stamp.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{id} {} {} created_at={created_at} updated_at={updated_at}",
        customer.first_name, customer.last_name
    );
    for address in customer.addresses() {
        println!("  - {} {}", address.name, address.zip_code);
    }
}

#[cfg(test)]
mod tests {
    use super::{last_name_page, CliError, Command};
    use customer_store_core::{PageRequestError, RepoError};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parse_recognizes_commands() {
        assert!(matches!(Command::parse(&[]), Ok(Command::Summary)));
        assert!(matches!(
            Command::parse(&args(&["top", "John"])),
            Ok(Command::Top(name)) if name == "John"
        ));
        assert!(matches!(
            Command::parse(&args(&["show", "abc"])),
            Ok(Command::Show(id)) if id == "abc"
        ));
    }

    #[test]
    fn parse_reads_page_arguments() {
        assert!(matches!(
            Command::parse(&args(&["page", "John", "1", "20"])),
            Ok(Command::Page { first_name, page: 1, size: 20 }) if first_name == "John"
        ));
        assert!(matches!(
            Command::parse(&args(&["page", "John", "first", "20"])),
            Err(CliError::Usage)
        ));
    }

    #[test]
    fn zero_page_size_is_an_invalid_page_request() {
        assert!(matches!(
            last_name_page(0, 0),
            Err(RepoError::InvalidPageRequest(PageRequestError::ZeroSize))
        ));
        let request = last_name_page(2, 5).unwrap();
        assert_eq!(request.offset(), 10);
    }

    #[test]
    fn parse_rejects_unknown_shapes() {
        assert!(matches!(
            Command::parse(&args(&["top"])),
            Err(CliError::Usage)
        ));
        assert!(matches!(
            Command::parse(&args(&["drop", "all"])),
            Err(CliError::Usage)
        ));
    }
}

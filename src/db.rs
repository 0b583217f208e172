/*! Database initialization for the application. */

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, account, budget,
    category::{self, ReservedCategories},
    institution, rule, transaction,
};

/// Create every table the application needs and seed the reserved
/// category rows, inside one exclusive SQL transaction.
///
/// Safe to call on an already-initialized database.
///
/// # Errors
/// Returns an error if a table cannot be created or if there is an SQL
/// error.
pub fn initialize(connection: &Connection, reserved: &ReservedCategories) -> Result<(), Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    category::create_category_table(&sql_transaction)?;
    institution::create_institution_table(&sql_transaction)?;
    account::create_account_table(&sql_transaction)?;
    rule::create_rule_table(&sql_transaction)?;
    transaction::create_transaction_table(&sql_transaction)?;
    budget::create_budget_table(&sql_transaction)?;
    category::seed_reserved_categories(&sql_transaction, reserved)?;

    sql_transaction.commit()?;

    Ok(())
}

//! Bank account management.
//!
//! Accounts tie imported transactions back to the institution and
//! statement they came from. The importer creates them on first sight of
//! an unknown account id.

mod core;
mod endpoints;

pub use core::{
    Account, AccountInput, AccountType, create_account_table, delete_account,
    find_account_by_fit_id, get_account, get_accounts_by_owner, upsert_account,
};
pub use endpoints::{
    AccountState, delete_account_endpoint, get_account_endpoint, get_accounts_by_owner_endpoint,
    upsert_account_endpoint,
};

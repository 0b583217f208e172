//! Transaction management for the finance tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and its database functions
//! - Splitting one transaction into category-tagged parts
//! - Importing OFX statement files with fit-id deduplication
//! - Route handlers for the transaction endpoints

mod core;
mod endpoints;
mod import;
mod split;

pub use core::{
    Transaction, TransactionFilter, TransactionInput, TransactionKind, create_transaction_table,
    delete_transaction, fit_ids_for_account_in_range, get_oldest_transaction, get_transaction,
    get_transactions_by_owner, get_transactions_in_range, persist_transaction,
};
pub use endpoints::{
    TransactionListQuery, TransactionState, delete_transaction_endpoint,
    get_oldest_transaction_endpoint, get_transaction_endpoint,
    get_transactions_by_owner_endpoint, import_transactions_endpoint, split_transaction_endpoint,
    upsert_transaction_endpoint,
};
pub use import::{ImportResult, import_transactions};
pub use split::{SplitPart, split_transaction};

//! Defines the app level error type and its conversion to JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::database_id::{CategoryId, TransactionId};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request payload failed a schema or invariant check.
    ///
    /// Validation runs before any mutation, so a validation error means
    /// nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The parts of a transaction split do not sum to the original amount.
    ///
    /// The split is refused entirely; no writes occur.
    #[error("split parts sum to {got} but the transaction amount is {want}")]
    SplitImbalance {
        /// The original transaction's amount.
        want: f64,
        /// The sum of the requested parts.
        got: f64,
    },

    /// A transaction split failed partway through its sequence of writes.
    ///
    /// Each part of a split is persisted with its own statement and there
    /// is no atomicity across the set, so a mid-sequence failure leaves
    /// the original transaction and some of its parts coexisting. The
    /// caller must inspect the transaction and recover; the split is never
    /// silently retried.
    #[error(
        "split of transaction {transaction_id} failed after {applied} of {total} writes; \
        the transaction is partially split"
    )]
    PartialSplit {
        /// The transaction that was being split.
        transaction_id: TransactionId,
        /// How many writes landed before the failure.
        applied: usize,
        /// How many writes the split required in total.
        total: usize,
    },

    /// A category id used on a rule, transaction or budget did not refer
    /// to a valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// Tried to modify or delete one of the reserved categories.
    #[error("reserved categories cannot be modified or deleted")]
    ReservedCategory,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the
    /// parameters (e.g., ID) are correct and that the resource has been
    /// created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// No institution is registered for the bank id found in a statement
    /// file.
    #[error("no institution is registered for bank ID \"{0}\"")]
    UnknownInstitution(String),

    /// A statement file was not in the expected OFX format.
    #[error("unexpected OFX format: {0}")]
    InvalidOfx(String),

    /// The import directory could not be read, or a finished file could
    /// not be moved out of the inbox.
    #[error("import I/O error: {0}")]
    ImportIo(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    Sql(rusqlite::Error),

    /// Tried to update a transaction that does not exist.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a rule that does not exist.
    #[error("tried to update a rule that is not in the database")]
    UpdateMissingRule,

    /// Tried to delete a rule that does not exist.
    #[error("tried to delete a rule that is not in the database")]
    DeleteMissingRule,

    /// Tried to update a category that does not exist.
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist.
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a budget that does not exist.
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to update an account that does not exist.
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// Tried to delete an account that does not exist.
    #[error("tried to delete an account that is not in the database")]
    DeleteMissingAccount,

    /// Tried to update an institution that does not exist.
    #[error("tried to update an institution that is not in the database")]
    UpdateMissingInstitution,

    /// Tried to delete an institution that does not exist.
    #[error("tried to delete an institution that is not in the database")]
    DeleteMissingInstitution,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::Sql(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Error::Validation(_)
            | Error::SplitImbalance { .. }
            | Error::InvalidCategory(_)
            | Error::ReservedCategory
            | Error::UnknownInstitution(_)
            | Error::InvalidOfx(_) => StatusCode::BAD_REQUEST,
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction
            | Error::UpdateMissingRule
            | Error::DeleteMissingRule
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory
            | Error::UpdateMissingBudget
            | Error::UpdateMissingAccount
            | Error::DeleteMissingAccount
            | Error::UpdateMissingInstitution
            | Error::DeleteMissingInstitution => StatusCode::NOT_FOUND,
            Error::PartialSplit { .. }
            | Error::ImportIo(_)
            | Error::DatabaseLock
            | Error::Sql(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {self}");
        }

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn sql_no_rows_maps_to_not_found() {
        let error = Error::from(rusqlite::Error::QueryReturnedNoRows);

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = Error::Validation("period must be at least 1".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn partial_split_is_a_server_error() {
        let response = Error::PartialSplit {
            transaction_id: 1,
            applied: 1,
            total: 3,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_rows_are_not_found() {
        assert_eq!(
            Error::DeleteMissingRule.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}

//! Application router configuration.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState, Error, account, budget, category, endpoints, institution,
    logging::logging_middleware, rule, transaction, trend,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::CATEGORIES, post(category::upsert_category_endpoint))
        .route(
            endpoints::CATEGORY,
            get(category::get_category_endpoint).delete(category::delete_category_endpoint),
        )
        .route(
            endpoints::CATEGORIES_BY_OWNER,
            get(category::get_categories_by_owner_endpoint),
        )
        .route(
            endpoints::PRIMARY_CATEGORIES_BY_OWNER,
            get(category::get_primary_categories_endpoint),
        )
        .route(endpoints::RULES, post(rule::upsert_rule_endpoint))
        .route(
            endpoints::RULE,
            get(rule::get_rule_endpoint).delete(rule::delete_rule_endpoint),
        )
        .route(
            endpoints::RULES_BY_OWNER,
            get(rule::get_rules_by_owner_endpoint),
        )
        .route(endpoints::APPLY_RULES, post(rule::apply_rules_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            post(transaction::upsert_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(transaction::get_transaction_endpoint)
                .delete(transaction::delete_transaction_endpoint),
        )
        .route(
            endpoints::SPLIT_TRANSACTION,
            post(transaction::split_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS_BY_OWNER,
            get(transaction::get_transactions_by_owner_endpoint),
        )
        .route(
            endpoints::OLDEST_TRANSACTION_BY_OWNER,
            get(transaction::get_oldest_transaction_endpoint),
        )
        .route(
            endpoints::IMPORT_TRANSACTIONS,
            post(transaction::import_transactions_endpoint),
        )
        .route(endpoints::BUDGETS, post(budget::upsert_budget_endpoint))
        .route(
            endpoints::BUDGET,
            get(budget::get_budget_endpoint).delete(budget::deactivate_budget_endpoint),
        )
        .route(
            endpoints::BUDGET_REPORT_BY_OWNER,
            get(budget::get_budget_report_endpoint),
        )
        .route(endpoints::ACCOUNTS, post(account::upsert_account_endpoint))
        .route(
            endpoints::ACCOUNT,
            get(account::get_account_endpoint).delete(account::delete_account_endpoint),
        )
        .route(
            endpoints::ACCOUNTS_BY_OWNER,
            get(account::get_accounts_by_owner_endpoint),
        )
        .route(
            endpoints::INSTITUTIONS,
            get(institution::get_institutions_endpoint)
                .post(institution::upsert_institution_endpoint),
        )
        .route(
            endpoints::INSTITUTION,
            get(institution::get_institution_endpoint)
                .delete(institution::delete_institution_endpoint),
        )
        .route(
            endpoints::NET_INCOME_TREND,
            get(trend::get_net_income_endpoint),
        )
        .route(
            endpoints::CATEGORY_SPEND_TREND,
            get(trend::get_category_spending_endpoint),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// The fallback handler for paths that match no route.
async fn not_found() -> Error {
    Error::NotFound
}

//! The API endpoint URIs.

/// The route to create or update a category.
pub const CATEGORIES: &str = "/api/categories";
/// The route to access a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to list an owner's categories as flat rows.
pub const CATEGORIES_BY_OWNER: &str = "/api/categories/by-owner/{owner_id}";
/// The route to list an owner's categories grouped into primaries.
pub const PRIMARY_CATEGORIES_BY_OWNER: &str = "/api/categories/by-owner/{owner_id}/primary";

/// The route to create or update a rule.
pub const RULES: &str = "/api/rules";
/// The route to access a single rule.
pub const RULE: &str = "/api/rules/{rule_id}";
/// The route to list an owner's rules.
pub const RULES_BY_OWNER: &str = "/api/rules/by-owner/{owner_id}";
/// The route to apply an owner's rules to their transactions.
pub const APPLY_RULES: &str = "/api/rules/apply/{owner_id}";

/// The route to create or update a transaction.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to split a transaction into parts.
pub const SPLIT_TRANSACTION: &str = "/api/transactions/{transaction_id}/split";
/// The route to list an owner's transactions.
pub const TRANSACTIONS_BY_OWNER: &str = "/api/transactions/by-owner/{owner_id}";
/// The route to fetch an owner's earliest transaction.
pub const OLDEST_TRANSACTION_BY_OWNER: &str = "/api/transactions/by-owner/{owner_id}/oldest";
/// The route to import the statement files waiting in the inbox.
pub const IMPORT_TRANSACTIONS: &str = "/api/transactions/import/{owner_id}";

/// The route to create or update a budget.
pub const BUDGETS: &str = "/api/budgets";
/// The route to access a single budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route to build an owner's budget report for one month.
pub const BUDGET_REPORT_BY_OWNER: &str = "/api/budgets/by-owner/{owner_id}/{year}/{month}";

/// The route to create or update an account.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to access a single account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route to list an owner's accounts.
pub const ACCOUNTS_BY_OWNER: &str = "/api/accounts/by-owner/{owner_id}";

/// The route to create or update an institution, or list them all.
pub const INSTITUTIONS: &str = "/api/institutions";
/// The route to access a single institution.
pub const INSTITUTION: &str = "/api/institutions/{institution_id}";

/// The route for the month-by-month net income trend.
pub const NET_INCOME_TREND: &str = "/api/trends/net-income/{owner_id}";
/// The route for one category's month-by-month spending trend.
pub const CATEGORY_SPEND_TREND: &str = "/api/trends/category-spend/{owner_id}";

// These tests are here so that we know when we call `Uri::from_shared` it
// will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::CATEGORIES);
        assert_endpoint_is_valid_uri(endpoints::CATEGORY);
        assert_endpoint_is_valid_uri(endpoints::CATEGORIES_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::PRIMARY_CATEGORIES_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::RULES);
        assert_endpoint_is_valid_uri(endpoints::RULE);
        assert_endpoint_is_valid_uri(endpoints::RULES_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::APPLY_RULES);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::SPLIT_TRANSACTION);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTIONS_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::OLDEST_TRANSACTION_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::IMPORT_TRANSACTIONS);
        assert_endpoint_is_valid_uri(endpoints::BUDGETS);
        assert_endpoint_is_valid_uri(endpoints::BUDGET);
        assert_endpoint_is_valid_uri(endpoints::BUDGET_REPORT_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNT);
        assert_endpoint_is_valid_uri(endpoints::ACCOUNTS_BY_OWNER);
        assert_endpoint_is_valid_uri(endpoints::INSTITUTIONS);
        assert_endpoint_is_valid_uri(endpoints::INSTITUTION);
        assert_endpoint_is_valid_uri(endpoints::NET_INCOME_TREND);
        assert_endpoint_is_valid_uri(endpoints::CATEGORY_SPEND_TREND);
    }

}

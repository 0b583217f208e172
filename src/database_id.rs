//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// Database identifier for an owner namespace.
///
/// Every category, rule, budget, account and transaction is scoped to an
/// owner. There is no user model behind it; the id is opaque.
pub type OwnerId = i64;

/// Database identifier for a category.
pub type CategoryId = i64;

/// Database identifier for a rule.
pub type RuleId = i64;

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// Database identifier for a budget.
pub type BudgetId = i64;

/// Database identifier for an account.
pub type AccountId = i64;

/// Database identifier for a financial institution.
pub type InstitutionId = i64;

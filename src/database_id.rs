//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// Database identifier for a category.
pub type CategoryId = DatabaseId;
/// Database identifier for an expense.
pub type ExpenseId = DatabaseId;
/// Database identifier for a recurring expense template.
pub type RecurringExpenseId = DatabaseId;

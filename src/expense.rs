//! Defines the expense model and its database queries.
//!
//! Expenses are either entered manually or generated from a
//! [recurring expense](crate::RecurringTemplate). Generated expenses keep a
//! reference to the recurring expense they came from, and the database allows
//! at most one generated expense per recurring expense and date.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    database_id::{CategoryId, ExpenseId, RecurringExpenseId},
};

// ============================================================================
// MODELS
// ============================================================================

/// An event where money was spent.
///
/// To create a new `Expense`, use [Expense::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// When the expense happened.
    ///
    /// For generated expenses this is the first day of the month or year the
    /// expense is for.
    pub date: Date,
    /// The amount of money spent.
    pub amount: f64,
    /// The ID of the category the expense belongs to.
    pub category_id: CategoryId,
    /// A text description of what the expense was for.
    pub description: Option<String>,
    /// The recurring expense this expense was generated from, if any.
    pub recurring_id: Option<RecurringExpenseId>,
    /// Whether the expense was generated from a recurring expense.
    pub is_recurring_instance: bool,
}

impl Expense {
    /// Create a new expense.
    ///
    /// Shortcut for [ExpenseBuilder] for discoverability.
    pub fn build(amount: f64, date: Date, category_id: CategoryId) -> ExpenseBuilder {
        ExpenseBuilder {
            amount,
            date,
            category_id,
            description: None,
            recurring_id: None,
        }
    }
}

/// A builder for creating [Expense] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct ExpenseBuilder {
    /// The amount of money spent.
    pub amount: f64,

    /// The date of the expense.
    pub date: Date,

    /// The category of the expense, e.g. "Utilities", "Rent".
    pub category_id: CategoryId,

    /// A human-readable description of the expense.
    pub description: Option<String>,

    /// The recurring expense that generated this expense.
    ///
    /// - `Some(id)` - The expense was generated from a recurring expense.
    /// - `None` - The expense was entered manually.
    ///
    /// The database enforces uniqueness on the pair of this field and `date`.
    pub recurring_id: Option<RecurringExpenseId>,
}

impl ExpenseBuilder {
    /// Set the description for the expense.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Mark the expense as generated from the recurring expense `recurring_id`.
    pub fn generated_from(mut self, recurring_id: RecurringExpenseId) -> Self {
        self.recurring_id = Some(recurring_id);
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new expense in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - [Error::InvalidRecurringExpense] if the expense is marked as generated from
///   a recurring expense that does not exist,
/// - or [Error::DuplicateRecurringInstance] if an expense already exists for
///   the same recurring expense and date,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(builder: ExpenseBuilder, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "INSERT INTO expense (date, amount, category_id, description, recurring_id, is_recurring_instance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, date, amount, category_id, description, recurring_id, is_recurring_instance",
        )?
        .query_row(
            (
                builder.date,
                builder.amount,
                builder.category_id,
                &builder.description,
                builder.recurring_id,
                builder.recurring_id.is_some(),
            ),
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => map_foreign_key_error(&builder, connection),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateRecurringInstance,
            error => error.into(),
        })?;

    Ok(expense)
}

/// SQLite does not report which foreign key failed, so find the missing row.
fn map_foreign_key_error(builder: &ExpenseBuilder, connection: &Connection) -> Error {
    let Some(recurring_id) = builder.recurring_id else {
        return Error::InvalidCategory(builder.category_id);
    };

    match connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM recurring_expense WHERE id = ?1)",
        [recurring_id],
        |row| row.get::<_, bool>(0),
    ) {
        Ok(true) => Error::InvalidCategory(builder.category_id),
        Ok(false) => Error::InvalidRecurringExpense(recurring_id),
        Err(error) => error.into(),
    }
}

/// Check whether an expense generated from `recurring_id` exists on `date`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn recurring_instance_exists(
    recurring_id: RecurringExpenseId,
    date: Date,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM expense WHERE recurring_id = ?1 AND date = ?2)",
            (recurring_id, date),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Retrieve the expenses generated from `recurring_id`, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_recurring_instances(
    recurring_id: RecurringExpenseId,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, date, amount, category_id, description, recurring_id, is_recurring_instance
             FROM expense WHERE recurring_id = :recurring_id ORDER BY date ASC",
        )?
        .query_map(&[(":recurring_id", &recurring_id)], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of expenses in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_expenses(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM expense;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                amount REAL NOT NULL,
                category_id INTEGER NOT NULL,
                description TEXT,
                recurring_id INTEGER,
                is_recurring_instance INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE,
                FOREIGN KEY(recurring_id) REFERENCES recurring_expense(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_date ON expense(date);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_category ON expense(category_id);",
        (),
    )?;

    // At most one generated expense per recurring expense and date. NULL
    // recurring IDs (manual expenses) never conflict.
    connection.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_expense_recurring_date ON expense(recurring_id, date);",
        (),
    )?;

    Ok(())
}

/// Map a database row to an Expense.
pub fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let date = row.get(1)?;
    let amount = row.get(2)?;
    let category_id = row.get(3)?;
    let description = row.get(4)?;
    let recurring_id = row.get(5)?;
    let is_recurring_instance = row.get(6)?;

    Ok(Expense {
        id,
        date,
        amount,
        category_id,
        description,
        recurring_id,
        is_recurring_instance,
    })
}

// ============================================================================
// TESTS
// ============================================================================

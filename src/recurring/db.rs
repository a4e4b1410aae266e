//! Database operations for recurring expenses.

use rusqlite::{Connection, Row, types::Type};
use time::Date;

use crate::{
    Error,
    database_id::RecurringExpenseId,
    recurring::models::{RecurringTemplate, RecurringTemplateBuilder},
};

const SELECT_COLUMNS: &str = "SELECT id, category_id, amount, description, cadence, start_date, \
     end_date, last_generated_date, active FROM recurring_expense";

/// Create a recurring expense in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] or [Error::InvalidDateRange] if `builder` fails validation,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_recurring_expense(
    builder: RecurringTemplateBuilder,
    connection: &Connection,
) -> Result<RecurringTemplate, Error> {
    builder.validate()?;

    connection
        .prepare(
            "INSERT INTO recurring_expense (category_id, amount, description, cadence, start_date, end_date, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, category_id, amount, description, cadence, start_date, end_date, last_generated_date, active",
        )?
        .query_row(
            (
                builder.category_id,
                builder.amount,
                &builder.description,
                builder.cadence.as_str(),
                builder.start_date,
                builder.end_date,
                builder.active,
            ),
            map_recurring_expense_row,
        )
        .map_err(|error| map_foreign_key_error(error, &builder))
}

/// Retrieve a recurring expense by its `id`, whether or not it is active.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid recurring expense,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_recurring_expense(
    id: RecurringExpenseId,
    connection: &Connection,
) -> Result<RecurringTemplate, Error> {
    connection
        .prepare(&format!("{SELECT_COLUMNS} WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_recurring_expense_row)
        .map_err(|error| error.into())
}

/// Retrieve all active recurring expenses, grouped by category.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_active_recurring_expenses(
    connection: &Connection,
) -> Result<Vec<RecurringTemplate>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE active = 1 ORDER BY category_id ASC, id ASC"
        ))?
        .query_map([], map_recurring_expense_row)?
        .map(|maybe_template| maybe_template.map_err(|error| error.into()))
        .collect()
}

/// Update a recurring expense.
///
/// Expenses that were already generated keep the values they were created
/// with, and the generation watermark is not changed.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] or [Error::InvalidDateRange] if `builder` fails validation,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - [Error::UpdateMissingRecurringExpense] if `id` does not refer to a recurring expense,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_recurring_expense(
    id: RecurringExpenseId,
    builder: RecurringTemplateBuilder,
    connection: &Connection,
) -> Result<(), Error> {
    builder.validate()?;

    let rows_affected = connection
        .execute(
            "UPDATE recurring_expense
             SET category_id = ?1, amount = ?2, description = ?3, cadence = ?4,
                 start_date = ?5, end_date = ?6, active = ?7
             WHERE id = ?8",
            (
                builder.category_id,
                builder.amount,
                &builder.description,
                builder.cadence.as_str(),
                builder.start_date,
                builder.end_date,
                builder.active,
                id,
            ),
        )
        .map_err(|error| map_foreign_key_error(error, &builder))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingRecurringExpense);
    }

    Ok(())
}

/// Soft delete a recurring expense so that it no longer generates expenses.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingRecurringExpense] if `id` does not refer to a recurring expense,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn deactivate_recurring_expense(
    id: RecurringExpenseId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE recurring_expense SET active = 0 WHERE id = ?1",
        [id],
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingRecurringExpense);
    }

    Ok(())
}

/// Move the generation watermark of a recurring expense forward to `date`.
///
/// The watermark never moves backwards: if it is already at or after `date`
/// the row is left unchanged.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn set_last_generated_date(
    id: RecurringExpenseId,
    date: Date,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "UPDATE recurring_expense SET last_generated_date = ?1
         WHERE id = ?2 AND (last_generated_date IS NULL OR last_generated_date < ?1)",
        (date, id),
    )?;

    Ok(())
}

/// Create the recurring expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_recurring_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            description TEXT,
            cadence TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT,
            last_generated_date TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_recurring_expense_category ON recurring_expense(category_id);",
    )?;

    Ok(())
}

fn map_foreign_key_error(error: rusqlite::Error, builder: &RecurringTemplateBuilder) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidCategory(builder.category_id),
        error => error.into(),
    }
}

fn map_recurring_expense_row(row: &Row) -> Result<RecurringTemplate, rusqlite::Error> {
    let raw_cadence: String = row.get(4)?;
    let cadence = raw_cadence
        .parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error)))?;

    Ok(RecurringTemplate {
        id: row.get(0)?,
        category_id: row.get(1)?,
        amount: row.get(2)?,
        description: row.get(3)?,
        cadence,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        last_generated_date: row.get(7)?,
        active: row.get(8)?,
    })
}

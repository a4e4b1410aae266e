//! The store traits the generator reads and writes through, and their SQLite
//! implementations.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    database_id::RecurringExpenseId,
    expense::{Expense, ExpenseBuilder, create_expense, recurring_instance_exists},
    recurring::{
        db::{get_active_recurring_expenses, get_recurring_expense, set_last_generated_date},
        models::RecurringTemplate,
    },
};

/// Handles the retrieval of recurring expenses and their generation watermark.
pub trait TemplateStore {
    /// Retrieve a recurring expense, `None` if it does not exist.
    fn get(&self, id: RecurringExpenseId) -> Result<Option<RecurringTemplate>, Error>;

    /// Retrieve all active recurring expenses.
    fn get_active(&self) -> Result<Vec<RecurringTemplate>, Error>;

    /// Move the generation watermark of a recurring expense forward to `date`.
    ///
    /// Implementers must ignore writes that would move the watermark backwards.
    fn set_watermark(&self, id: RecurringExpenseId, date: Date) -> Result<(), Error>;
}

/// Handles the lookup and creation of generated expenses.
pub trait InstanceStore {
    /// Whether an expense generated from `recurring_id` exists on `date`.
    fn exists(&self, recurring_id: RecurringExpenseId, date: Date) -> Result<bool, Error>;

    /// Create an expense.
    ///
    /// Implementers must reject a second generated expense for the same
    /// recurring expense and date with [Error::DuplicateRecurringInstance].
    fn insert(&self, builder: ExpenseBuilder) -> Result<Expense, Error>;
}

/// Stores recurring expenses in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteTemplateStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTemplateStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl TemplateStore for SQLiteTemplateStore {
    fn get(&self, id: RecurringExpenseId) -> Result<Option<RecurringTemplate>, Error> {
        let connection = lock(&self.connection)?;

        match get_recurring_expense(id, &connection) {
            Ok(template) => Ok(Some(template)),
            Err(Error::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn get_active(&self) -> Result<Vec<RecurringTemplate>, Error> {
        let connection = lock(&self.connection)?;
        get_active_recurring_expenses(&connection)
    }

    fn set_watermark(&self, id: RecurringExpenseId, date: Date) -> Result<(), Error> {
        let connection = lock(&self.connection)?;
        set_last_generated_date(id, date, &connection)
    }
}

/// Stores generated expenses in a SQLite database.
///
/// The expense table has a unique index on the recurring expense ID and date,
/// so concurrent inserts of the same generated expense cannot both succeed.
#[derive(Debug, Clone)]
pub struct SQLiteInstanceStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteInstanceStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl InstanceStore for SQLiteInstanceStore {
    fn exists(&self, recurring_id: RecurringExpenseId, date: Date) -> Result<bool, Error> {
        let connection = lock(&self.connection)?;
        recurring_instance_exists(recurring_id, date, &connection)
    }

    fn insert(&self, builder: ExpenseBuilder) -> Result<Expense, Error> {
        let connection = lock(&self.connection)?;
        create_expense(builder, &connection)
    }
}

fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, Error> {
    connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

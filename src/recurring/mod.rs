//! Recurring expenses and their materialization into dated expenses.

mod anchor;
mod db;
mod endpoint;
mod generator;
mod models;
mod store;
#[cfg(test)]
mod test_utils;

pub use db::{
    create_recurring_expense, create_recurring_expense_table, deactivate_recurring_expense,
    get_active_recurring_expenses, get_recurring_expense, update_recurring_expense,
};
pub use endpoint::{generate_all_recurring_endpoint, generate_recurring_endpoint};
pub use generator::{BatchReport, Generator, SQLiteGenerator};
pub use models::{Cadence, RecurringTemplate, RecurringTemplateBuilder};
pub use store::{InstanceStore, SQLiteInstanceStore, SQLiteTemplateStore, TemplateStore};

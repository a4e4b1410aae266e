//! fin_manager is a personal finance tracker backed by SQLite.
//!
//! This library materializes recurring expenses: it turns recurring-expense
//! templates (amount, category, cadence, validity window) into concrete dated
//! expenses as calendar time advances, and exposes that process over a small
//! JSON API and a batch command line tool.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod category;
mod database_id;
mod db;
mod endpoints;
mod expense;
mod recurring;
mod routing;
mod timezone;

pub use app_state::AppState;
pub use category::{Category, CategoryName, create_category, get_category};
pub use database_id::{CategoryId, DatabaseId, ExpenseId, RecurringExpenseId};
pub use db::initialize as initialize_db;
pub use expense::{Expense, ExpenseBuilder, count_expenses, create_expense, get_recurring_instances};
pub use recurring::{
    BatchReport, Cadence, Generator, InstanceStore, RecurringTemplate, RecurringTemplateBuilder,
    SQLiteGenerator, SQLiteInstanceStore, SQLiteTemplateStore, TemplateStore,
    create_recurring_expense, deactivate_recurring_expense, get_active_recurring_expenses,
    get_recurring_expense, update_recurring_expense,
};
pub use routing::build_router;
pub use timezone::{DEFAULT_TIMEZONE, get_local_offset, today_in};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The category ID used to create an expense or recurring expense did not
    /// match a valid category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// An expense was marked as generated from a recurring expense that does
    /// not exist.
    #[error("the recurring expense ID {0} does not refer to a valid recurring expense")]
    InvalidRecurringExpense(RecurringExpenseId),

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The specified category name already exists in the database.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryName(String),

    /// A zero, negative or non-finite amount was used for a recurring expense.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// The end date of a recurring expense is before its start date.
    #[error("the end date {end} is before the start date {start}")]
    InvalidDateRange {
        /// The first date the recurring expense applies to.
        start: time::Date,
        /// The last date the recurring expense applies to.
        end: time::Date,
    },

    /// An expense already exists for the recurring expense on that date.
    ///
    /// The database enforces at most one generated expense per recurring
    /// expense and date, so two overlapping generation runs cannot both
    /// create the same expense.
    #[error("an expense for this recurring expense and date already exists")]
    DuplicateRecurringInstance,

    /// Tried to update a recurring expense that does not exist
    #[error("tried to update a recurring expense that is not in the database")]
    UpdateMissingRecurringExpense,

    /// Tried to delete a recurring expense that does not exist
    #[error("tried to delete a recurring expense that is not in the database")]
    DeleteMissingRecurringExpense,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            Error::InvalidCategory(_)
            | Error::InvalidRecurringExpense(_)
            | Error::EmptyCategoryName
            | Error::DuplicateCategoryName(_)
            | Error::InvalidAmount(_)
            | Error::InvalidDateRange { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::UpdateMissingRecurringExpense | Error::DeleteMissingRecurringExpense => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

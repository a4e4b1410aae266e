//! Turns recurring expenses into dated expenses.
//!
//! Each recurring expense keeps a watermark: the date up to which its
//! expenses have been generated. A call to [Generator::generate] creates one
//! expense for every month (or year) that started between the watermark and
//! the given date and does not have an expense yet, then moves the watermark
//! forward. Calling it again with the same date creates nothing, so a failed
//! run can simply be repeated.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    database_id::RecurringExpenseId,
    expense::Expense,
    recurring::{
        anchor::{anchor_dates, generation_window},
        models::RecurringTemplate,
        store::{InstanceStore, SQLiteInstanceStore, SQLiteTemplateStore, TemplateStore},
    },
    timezone::today_in,
};

/// The outcome of generating expenses for every active recurring expense.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// The number of expenses created across all recurring expenses.
    pub created: u32,
    /// The number of active recurring expenses that were processed,
    /// including those that failed.
    pub templates_processed: u32,
    /// The recurring expenses whose generation failed. Their expenses are
    /// not included in `created`.
    pub failed: Vec<RecurringExpenseId>,
}

/// Generates expenses from recurring expenses.
#[derive(Debug, Clone)]
pub struct Generator<T, I> {
    template_store: T,
    instance_store: I,
}

/// A [Generator] that reads and writes a SQLite database.
pub type SQLiteGenerator = Generator<SQLiteTemplateStore, SQLiteInstanceStore>;

impl SQLiteGenerator {
    /// Create a generator backed by the SQLite `connection`.
    pub fn from_connection(connection: Arc<Mutex<Connection>>) -> Self {
        Generator::new(
            SQLiteTemplateStore::new(connection.clone()),
            SQLiteInstanceStore::new(connection),
        )
    }
}

impl<T, I> Generator<T, I>
where
    T: TemplateStore,
    I: InstanceStore,
{
    /// Create a generator that reads recurring expenses from `template_store`
    /// and writes expenses to `instance_store`.
    pub fn new(template_store: T, instance_store: I) -> Self {
        Self {
            template_store,
            instance_store,
        }
    }

    /// Generate the missing expenses for the recurring expense `recurring_id`
    /// up to and including `as_of`, returning how many were created.
    ///
    /// Expenses are dated on the first day of their month (or January 1 for
    /// yearly expenses) and only periods that start on or after the recurring
    /// expense's start date are generated. A recurring expense starting on
    /// 2024-01-15 therefore gets its first expense on 2024-02-01.
    ///
    /// Missing or inactive recurring expenses generate nothing. The watermark
    /// is only moved when at least one expense was created.
    ///
    /// # Errors
    /// Returns the store's error if a lookup, insert or watermark update
    /// fails. Expenses created before the failure are kept, and calling this
    /// function again will create only those still missing.
    pub fn generate(&self, recurring_id: RecurringExpenseId, as_of: Date) -> Result<u32, Error> {
        let template = match self.template_store.get(recurring_id)? {
            Some(template) if template.active => template,
            Some(_) => {
                tracing::debug!("Skipping inactive recurring expense {recurring_id}");
                return Ok(0);
            }
            None => {
                tracing::debug!("Recurring expense {recurring_id} does not exist");
                return Ok(0);
            }
        };

        let Some(window) = generation_window(&template, as_of) else {
            return Ok(0);
        };

        let mut count = 0;

        for anchor in anchor_dates(template.cadence, window) {
            // The watermark can predate the start date after the start date was moved forward.
            if !is_within_validity(&template, anchor) {
                continue;
            }

            if self.create_instance(&template, anchor)? {
                count += 1;
            }
        }

        if count > 0 {
            self.template_store.set_watermark(template.id, window.end)?;
            tracing::info!(
                "Generated {count} expenses for recurring expense {} up to {}",
                template.id,
                window.end
            );
        }

        Ok(count)
    }

    /// Generate the missing expenses for every active recurring expense up to
    /// and including `as_of`.
    ///
    /// A failure for one recurring expense is logged and recorded in the
    /// report, and does not stop the others from being processed.
    ///
    /// # Errors
    /// Returns an error only if the active recurring expenses cannot be read.
    pub fn generate_all(&self, as_of: Date) -> Result<BatchReport, Error> {
        let templates = self.template_store.get_active()?;
        let mut report = BatchReport::default();

        for template in templates {
            report.templates_processed += 1;

            match self.generate(template.id, as_of) {
                Ok(count) => report.created += count,
                Err(error) => {
                    tracing::error!(
                        "Could not generate expenses for recurring expense {}: {error}",
                        template.id
                    );
                    report.failed.push(template.id);
                }
            }
        }

        tracing::info!(
            "Generated {} expenses from {} recurring expenses up to {as_of}",
            report.created,
            report.templates_processed
        );

        Ok(report)
    }

    /// Generate the missing expenses for every active recurring expense up to
    /// and including today in `local_timezone`, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns an [Error::InvalidTimezoneError] if `local_timezone` is not a
    /// known timezone, or any error from [Generator::generate_all].
    pub fn generate_for_today(&self, local_timezone: &str) -> Result<BatchReport, Error> {
        self.generate_all(today_in(local_timezone)?)
    }

    /// Create the expense for `template` on `anchor` unless it already exists.
    ///
    /// Returns whether an expense was created.
    fn create_instance(&self, template: &RecurringTemplate, anchor: Date) -> Result<bool, Error> {
        if self.instance_store.exists(template.id, anchor)? {
            tracing::debug!(
                "Expense for recurring expense {} on {anchor} already exists",
                template.id
            );
            return Ok(false);
        }

        let builder = Expense::build(template.amount, anchor, template.category_id)
            .description(template.description.clone())
            .generated_from(template.id);

        match self.instance_store.insert(builder) {
            Ok(expense) => {
                tracing::debug!(
                    "Created expense {} for recurring expense {} on {anchor}",
                    expense.id,
                    template.id
                );
                Ok(true)
            }
            // Another generation run created it between the check and the insert.
            Err(Error::DuplicateRecurringInstance) => {
                tracing::debug!(
                    "Expense for recurring expense {} on {anchor} was created concurrently",
                    template.id
                );
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }
}

fn is_within_validity(template: &RecurringTemplate, date: Date) -> bool {
    date >= template.start_date && template.end_date.is_none_or(|end_date| date <= end_date)
}

//! In-memory stores for testing the generator without a database.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
};

use time::Date;

use crate::{
    Error,
    database_id::RecurringExpenseId,
    expense::{Expense, ExpenseBuilder},
    recurring::{
        models::{Cadence, RecurringTemplate},
        store::{InstanceStore, TemplateStore},
    },
};

/// An active template with placeholder amount, category and ID.
///
/// The ID is assigned by [InMemoryTemplateStore::add].
pub fn template(cadence: Cadence, start_date: Date, end_date: Option<Date>) -> RecurringTemplate {
    RecurringTemplate {
        id: 0,
        category_id: 1,
        amount: 25.0,
        description: None,
        cadence,
        start_date,
        end_date,
        last_generated_date: None,
        active: true,
    }
}

/// Clones share the same templates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    templates: Arc<Mutex<BTreeMap<RecurringExpenseId, RecurringTemplate>>>,
}

impl InMemoryTemplateStore {
    /// Add `template` with the next free ID and return that ID.
    pub fn add(&self, mut template: RecurringTemplate) -> RecurringExpenseId {
        let mut templates = self.templates.lock().unwrap();
        let id = templates.len() as RecurringExpenseId + 1;
        template.id = id;
        templates.insert(id, template);
        id
    }

    pub fn watermark(&self, id: RecurringExpenseId) -> Option<Date> {
        self.templates
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|template| template.last_generated_date)
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn get(&self, id: RecurringExpenseId) -> Result<Option<RecurringTemplate>, Error> {
        Ok(self.templates.lock().unwrap().get(&id).cloned())
    }

    fn get_active(&self) -> Result<Vec<RecurringTemplate>, Error> {
        Ok(self
            .templates
            .lock()
            .unwrap()
            .values()
            .filter(|template| template.active)
            .cloned()
            .collect())
    }

    fn set_watermark(&self, id: RecurringExpenseId, date: Date) -> Result<(), Error> {
        if let Some(template) = self.templates.lock().unwrap().get_mut(&id) {
            if template.last_generated_date.is_none_or(|watermark| watermark < date) {
                template.last_generated_date = Some(date);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct Instances {
    expenses: Vec<Expense>,
    hidden: HashSet<(RecurringExpenseId, Date)>,
    failing: HashSet<RecurringExpenseId>,
}

/// Enforces one generated expense per recurring expense and date, like the
/// SQLite store. Clones share the same expenses.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInstanceStore {
    inner: Arc<Mutex<Instances>>,
}

impl InMemoryInstanceStore {
    /// Add an already generated expense for `recurring_id` on `date`.
    pub fn add_existing(&self, recurring_id: RecurringExpenseId, date: Date) {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.expenses.len() as i64 + 1;
        inner.expenses.push(Expense {
            id,
            date,
            amount: 25.0,
            category_id: 1,
            description: None,
            recurring_id: Some(recurring_id),
            is_recurring_instance: true,
        });
    }

    /// Add an expense that [InstanceStore::exists] does not report, so that
    /// the next insert for it hits the uniqueness check instead.
    pub fn hide_from_exists(&self, recurring_id: RecurringExpenseId, date: Date) {
        self.add_existing(recurring_id, date);
        self.inner
            .lock()
            .unwrap()
            .hidden
            .insert((recurring_id, date));
    }

    /// Make every insert for `recurring_id` fail.
    pub fn fail_inserts_for(&self, recurring_id: RecurringExpenseId) {
        self.inner.lock().unwrap().failing.insert(recurring_id);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failing.clear();
    }

    pub fn expenses(&self) -> Vec<Expense> {
        self.inner.lock().unwrap().expenses.clone()
    }

    /// The dates of the expenses generated from `recurring_id`, oldest first.
    pub fn dates_for(&self, recurring_id: RecurringExpenseId) -> Vec<Date> {
        let mut dates: Vec<Date> = self
            .inner
            .lock()
            .unwrap()
            .expenses
            .iter()
            .filter(|expense| expense.recurring_id == Some(recurring_id))
            .map(|expense| expense.date)
            .collect();
        dates.sort();
        dates
    }
}

impl InstanceStore for InMemoryInstanceStore {
    fn exists(&self, recurring_id: RecurringExpenseId, date: Date) -> Result<bool, Error> {
        let inner = self.inner.lock().unwrap();

        if inner.hidden.contains(&(recurring_id, date)) {
            return Ok(false);
        }

        Ok(inner
            .expenses
            .iter()
            .any(|expense| expense.recurring_id == Some(recurring_id) && expense.date == date))
    }

    fn insert(&self, builder: ExpenseBuilder) -> Result<Expense, Error> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(recurring_id) = builder.recurring_id {
            if inner.failing.contains(&recurring_id) {
                return Err(Error::DatabaseLockError);
            }

            let duplicate = inner.expenses.iter().any(|expense| {
                expense.recurring_id == Some(recurring_id) && expense.date == builder.date
            });

            if duplicate {
                return Err(Error::DuplicateRecurringInstance);
            }
        }

        let expense = Expense {
            id: inner.expenses.len() as i64 + 1,
            date: builder.date,
            amount: builder.amount,
            category_id: builder.category_id,
            description: builder.description,
            recurring_id: builder.recurring_id,
            is_recurring_instance: builder.recurring_id.is_some(),
        };
        inner.expenses.push(expense.clone());

        Ok(expense)
    }
}

//! Core recurring expense domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    database_id::{CategoryId, RecurringExpenseId},
};

/// The text could not be parsed as a [Cadence].
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("\"{0}\" is not a valid cadence")]
pub struct CadenceError(pub String);

/// How often a recurring expense happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cadence {
    /// Once per calendar month, dated the first of the month.
    Monthly,
    /// Once per calendar year, dated the first of January.
    Yearly,
}

impl Cadence {
    /// The text stored in the database for this cadence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl FromStr for Cadence {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(CadenceError(other.to_owned())),
        }
    }
}

impl Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A template for an expense that repeats on a regular basis (e.g., rent, phone bill).
///
/// To create a new `RecurringTemplate`, use [RecurringTemplate::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringTemplate {
    /// The ID of the recurring expense.
    pub id: RecurringExpenseId,
    /// The category that generated expenses are filed under.
    pub category_id: CategoryId,
    /// The amount each generated expense is for.
    pub amount: f64,
    /// The description copied onto each generated expense.
    pub description: Option<String>,
    /// How often an expense is generated.
    pub cadence: Cadence,
    /// The first date the template may generate expenses for.
    pub start_date: Date,
    /// The last date (inclusive) the template may generate expenses for.
    /// `None` means the template repeats indefinitely.
    pub end_date: Option<Date>,
    /// The date up to which expenses have been generated, `None` if nothing
    /// has been generated yet.
    ///
    /// Only moves forward.
    pub last_generated_date: Option<Date>,
    /// Inactive templates are soft deleted and never generate expenses.
    pub active: bool,
}

impl RecurringTemplate {
    /// Create a new recurring expense.
    ///
    /// Shortcut for [RecurringTemplateBuilder] for discoverability.
    pub fn build(
        category_id: CategoryId,
        amount: f64,
        cadence: Cadence,
        start_date: Date,
    ) -> RecurringTemplateBuilder {
        RecurringTemplateBuilder {
            category_id,
            amount,
            description: None,
            cadence,
            start_date,
            end_date: None,
            active: true,
        }
    }
}

/// A builder for creating and updating [RecurringTemplate] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct RecurringTemplateBuilder {
    /// The category that generated expenses are filed under.
    pub category_id: CategoryId,
    /// The amount each generated expense is for. Must be greater than zero.
    pub amount: f64,
    /// The description copied onto each generated expense.
    pub description: Option<String>,
    /// How often an expense is generated.
    pub cadence: Cadence,
    /// The first date the template may generate expenses for.
    pub start_date: Date,
    /// The last date (inclusive) the template may generate expenses for.
    /// Must not be before `start_date`.
    pub end_date: Option<Date>,
    /// Whether the template generates expenses.
    pub active: bool,
}

impl RecurringTemplateBuilder {
    /// Set the description for the recurring expense.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the last date the recurring expense applies to.
    pub fn end_date(mut self, end_date: Option<Date>) -> Self {
        self.end_date = end_date;
        self
    }

    /// Set whether the recurring expense is active.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check the amount and date range.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidAmount] if the amount is not a finite number greater than zero,
    /// - or [Error::InvalidDateRange] if the end date is before the start date.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        match self.end_date {
            Some(end) if end < self.start_date => Err(Error::InvalidDateRange {
                start: self.start_date,
                end,
            }),
            _ => Ok(()),
        }
    }
}

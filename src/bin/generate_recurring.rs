use std::{
    process::ExitCode,
    sync::{Arc, Mutex},
};

use clap::Parser;
use rusqlite::Connection;
use time::{Date, format_description::well_known::Iso8601};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fin_manager::{DEFAULT_TIMEZONE, SQLiteGenerator, count_expenses, initialize_db, today_in};

/// Generate the missing expenses for every active recurring expense.
///
/// Intended to be run periodically, e.g. daily from cron. Running it more
/// than once for the same date is safe.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// Generate expenses up to and including this date (YYYY-MM-DD).
    /// Defaults to today in the local timezone.
    #[arg(long, value_parser = parse_date)]
    as_of: Option<Date>,

    /// The canonical name of the local timezone, e.g. "Pacific/Auckland".
    #[arg(long, env = "LOCAL_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    timezone: String,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every recurring expense was processed successfully.
fn run(args: &Args) -> Result<bool, fin_manager::Error> {
    let as_of = match args.as_of {
        Some(date) => date,
        None => today_in(&args.timezone)?,
    };

    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;
    let connection = Arc::new(Mutex::new(connection));

    let report = SQLiteGenerator::from_connection(connection.clone()).generate_all(as_of)?;

    let total = {
        let connection = connection
            .lock()
            .map_err(|_| fin_manager::Error::DatabaseLockError)?;
        count_expenses(&connection)?
    };

    println!(
        "Generated {} expenses from {} recurring expenses up to {as_of} ({total} expenses in total).",
        report.created, report.templates_processed
    );

    if !report.failed.is_empty() {
        eprintln!(
            "Could not generate expenses for recurring expenses {:?}, see the log for details.",
            report.failed
        );
    }

    Ok(report.failed.is_empty())
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, &Iso8601::DATE).map_err(|error| format!("invalid date \"{text}\": {error}"))
}

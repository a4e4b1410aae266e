//! Route handlers for triggering recurring expense generation.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    database_id::RecurringExpenseId,
    recurring::generator::SQLiteGenerator,
    timezone::today_in,
};

/// The state needed to generate expenses.
#[derive(Debug, Clone)]
pub struct GenerateEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The canonical timezone name used to work out today's date.
    pub local_timezone: String,
}

impl FromRef<AppState> for GenerateEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string accepted by the generation endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    /// Generate expenses up to and including this date. Defaults to today in
    /// the server's local timezone.
    pub as_of: Option<Date>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub recurring_id: RecurringExpenseId,
    pub as_of: Date,
    pub count: u32,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerateAllResponse {
    pub as_of: Date,
    pub count: u32,
    pub templates_processed: u32,
    pub failed: Vec<RecurringExpenseId>,
}

/// A route handler for generating the missing expenses of one recurring expense.
pub async fn generate_recurring_endpoint(
    State(state): State<GenerateEndpointState>,
    Path(recurring_id): Path<RecurringExpenseId>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GenerateResponse>, Error> {
    let as_of = resolve_as_of(query.as_of, &state.local_timezone)?;
    let generator = SQLiteGenerator::from_connection(state.db_connection);

    let count = generator.generate(recurring_id, as_of)?;

    Ok(Json(GenerateResponse {
        recurring_id,
        as_of,
        count,
    }))
}

/// A route handler for generating the missing expenses of every active recurring expense.
pub async fn generate_all_recurring_endpoint(
    State(state): State<GenerateEndpointState>,
    Query(query): Query<GenerateQuery>,
) -> Result<Json<GenerateAllResponse>, Error> {
    let as_of = resolve_as_of(query.as_of, &state.local_timezone)?;
    let generator = SQLiteGenerator::from_connection(state.db_connection);

    let report = generator.generate_all(as_of)?;

    Ok(Json(GenerateAllResponse {
        as_of,
        count: report.created,
        templates_processed: report.templates_processed,
        failed: report.failed,
    }))
}

fn resolve_as_of(as_of: Option<Date>, local_timezone: &str) -> Result<Date, Error> {
    match as_of {
        Some(date) => Ok(date),
        None => today_in(local_timezone),
    }
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::{Date, macros::date};

    use crate::{
        AppState, RecurringExpenseId, build_router,
        category::{CategoryName, create_category},
        endpoints::{self, format_endpoint},
        recurring::{
            db::{create_recurring_expense, deactivate_recurring_expense},
            models::{Cadence, RecurringTemplate},
        },
    };

    use super::{GenerateAllResponse, GenerateResponse};

    fn get_test_state() -> AppState {
        let connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, "Etc/UTC").expect("Could not create app state.");
        create_category(
            CategoryName::new_unchecked("Bills"),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create category");
        state
    }

    fn insert_template(
        state: &AppState,
        cadence: Cadence,
        start_date: Date,
        end_date: Option<Date>,
    ) -> RecurringExpenseId {
        let connection = state.db_connection.lock().unwrap();
        let category_id = 1;

        create_recurring_expense(
            RecurringTemplate::build(category_id, 30.0, cadence, start_date).end_date(end_date),
            &connection,
        )
        .expect("Could not create recurring expense")
        .id
    }

    #[tokio::test]
    async fn generate_for_one_template() {
        let state = get_test_state();
        let id = insert_template(&state, Cadence::Monthly, date!(2024 - 01 - 15), None);
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::GENERATE_RECURRING, id))
            .add_query_param("as_of", "2024-04-30")
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<GenerateResponse>(),
            GenerateResponse {
                recurring_id: id,
                as_of: date!(2024 - 04 - 30),
                count: 3,
            }
        );
    }

    #[tokio::test]
    async fn generate_again_returns_zero() {
        let state = get_test_state();
        let id = insert_template(&state, Cadence::Monthly, date!(2024 - 01 - 15), None);
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");
        let path = format_endpoint(endpoints::GENERATE_RECURRING, id);

        server
            .post(&path)
            .add_query_param("as_of", "2024-04-30")
            .await
            .assert_status_ok();
        let response = server
            .post(&path)
            .add_query_param("as_of", "2024-04-30")
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<GenerateResponse>().count, 0);
    }

    #[tokio::test]
    async fn generate_for_missing_template_returns_zero() {
        let server = TestServer::try_new(build_router(get_test_state()))
            .expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::GENERATE_RECURRING, 99))
            .add_query_param("as_of", "2024-04-30")
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<GenerateResponse>().count, 0);
    }

    #[tokio::test]
    async fn generate_defaults_to_today() {
        let state = get_test_state();
        let id = insert_template(&state, Cadence::Yearly, date!(2000 - 01 - 01), None);
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::GENERATE_RECURRING, id))
            .await;

        response.assert_status_ok();
        let body = response.json::<GenerateResponse>();
        assert_eq!(body.count as i32, body.as_of.year() - 2000 + 1);
    }

    #[tokio::test]
    async fn generate_all_aggregates_active_templates() {
        let state = get_test_state();
        insert_template(&state, Cadence::Monthly, date!(2024 - 01 - 01), None);
        insert_template(
            &state,
            Cadence::Yearly,
            date!(2023 - 01 - 01),
            Some(date!(2024 - 12 - 31)),
        );
        let inactive = insert_template(&state, Cadence::Monthly, date!(2024 - 01 - 01), None);
        deactivate_recurring_expense(inactive, &state.db_connection.lock().unwrap()).unwrap();
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(endpoints::GENERATE_ALL_RECURRING)
            .add_query_param("as_of", "2024-02-15")
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<GenerateAllResponse>(),
            GenerateAllResponse {
                as_of: date!(2024 - 02 - 15),
                count: 4,
                templates_processed: 2,
                failed: vec![],
            }
        );
    }

    #[tokio::test]
    async fn generate_all_with_invalid_timezone_fails() {
        let connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, "Not/AZone").expect("Could not create app state.");
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server.post(endpoints::GENERATE_ALL_RECURRING).await;

        response.assert_status_internal_server_error();
    }

    #[tokio::test]
    async fn generate_with_invalid_timezone_returns_json_error() {
        let connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection, "Not/AZone").expect("Could not create app state.");
        let server = TestServer::try_new(build_router(state)).expect("Could not create test server.");

        let response = server
            .post(&format_endpoint(endpoints::GENERATE_RECURRING, 1))
            .await;

        response.assert_status_internal_server_error();
        let body = response.json::<serde_json::Value>();
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|message| message.contains("Not/AZone"))
        );
    }

    #[tokio::test]
    async fn generate_rejects_malformed_date() {
        let server = TestServer::try_new(build_router(get_test_state()))
            .expect("Could not create test server.");

        let response = server
            .post(endpoints::GENERATE_ALL_RECURRING)
            .add_query_param("as_of", "30/04/2024")
            .await;

        response.assert_status_bad_request();
    }
}

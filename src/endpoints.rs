//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/recurring/{recurring_id}/generate',
//! use [format_endpoint].

/// The route for generating the missing expenses of one recurring expense.
pub const GENERATE_RECURRING: &str = "/api/recurring/{recurring_id}/generate";
/// The route for generating the missing expenses of all active recurring expenses.
pub const GENERATE_ALL_RECURRING: &str = "/api/recurring/generate";

/// Replace the first parameter in `endpoint_path` with `id`.
///
/// Parameters are written in braces, e.g. `{recurring_id}`. If
/// `endpoint_path` has no parameter it is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

//! Defines the route handler for the internal server error page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::html::error_view;

/// The route handler for the 500 internal server error page.
pub async fn get_internal_server_error_page() -> Response {
    get_internal_server_error_response()
}

pub fn get_internal_server_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_view(
            "Internal Server Error",
            "500",
            "Sorry, something went wrong.",
            "Try again later or check the server logs",
        ),
    )
        .into_response()
}

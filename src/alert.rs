//! Alert fragments for displaying success and error messages to users.
//!
//! Alerts are rendered as htmx out-of-band swaps into the `#alert-container`
//! element that [crate::html::base] places on every page.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq)]
enum AlertType {
    Success,
    Error,
}

/// An alert message with a status code, rendered as an htmx fragment.
#[derive(Debug, Clone)]
pub struct Alert {
    alert_type: AlertType,
    status: StatusCode,
    message: String,
    details: String,
}

impl Alert {
    /// Create a new success alert.
    pub fn success(message: &str, details: &str) -> Self {
        Self {
            alert_type: AlertType::Success,
            status: StatusCode::OK,
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// Create a new error alert with the given response status.
    pub fn error(status: StatusCode, message: &str, details: &str) -> Self {
        Self {
            alert_type: AlertType::Error,
            status,
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// The alert as an out-of-band htmx fragment, for composing into a
    /// larger response body.
    pub(crate) fn into_markup(self) -> Markup {
        let (container_style, heading_style) = match self.alert_type {
            AlertType::Success => (
                "rounded border border-green-300 bg-green-50 p-4 shadow-lg \
                dark:border-green-800 dark:bg-gray-800",
                "text-sm font-semibold text-green-800 dark:text-green-400",
            ),
            AlertType::Error => (
                "rounded border border-red-300 bg-red-50 p-4 shadow-lg \
                dark:border-red-800 dark:bg-gray-800",
                "text-sm font-semibold text-red-800 dark:text-red-400",
            ),
        };

        html!(
            div id="alert-container" hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(container_style)
                {
                    p class=(heading_style) { (self.message) }

                    @if !self.details.is_empty() {
                        p class="mt-1 text-sm text-gray-700 dark:text-gray-300" { (self.details) }
                    }
                }
            }
        )
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        let status = self.status;

        (status, self.into_markup()).into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use scraper::Selector;

    use crate::test_utils::parse_html_fragment;

    use super::Alert;

    #[tokio::test]
    async fn success_alert_renders_message_and_details() {
        let response = Alert::success("Saved", "Your changes were saved.").into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text: String = html.root_element().text().collect();
        assert!(text.contains("Saved"));
        assert!(text.contains("Your changes were saved."));
    }

    #[tokio::test]
    async fn error_alert_targets_alert_container() {
        let response =
            Alert::error(StatusCode::NOT_FOUND, "Not found", "No such thing.").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let html = parse_html_fragment(response).await;
        let selector = Selector::parse("div[hx-swap-oob]").unwrap();
        let container = html
            .select(&selector)
            .next()
            .expect("alert should render an out-of-band swap target");
        assert_eq!(container.attr("id"), Some("alert-container"));
    }
}

//! Outbound email delivery via an HTTP email API.

use serde::Serialize;

use crate::Error;

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    /// The recipient address.
    pub to: String,
    /// The subject line.
    pub subject: String,
    /// The rendered HTML body.
    pub html: String,
}

/// A client that can deliver an [Email].
///
/// The application never retries deliveries itself; callers log failures and
/// move on.
pub trait Mailer {
    /// Deliver `email`.
    ///
    /// # Errors
    /// Returns [Error::EmailDelivery] if the message was not accepted.
    fn send(&self, email: &Email) -> impl Future<Output = Result<(), Error>> + Send;
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// A [Mailer] that posts messages to a Resend-style HTTP email API.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    sender: String,
}

const DEFAULT_EMAIL_ENDPOINT: &str = "https://api.resend.com/emails";

impl HttpMailer {
    /// Create a mailer that sends from `sender` using `api_key`.
    pub fn new(api_key: String, sender: String) -> Self {
        Self::with_endpoint(api_key, sender, DEFAULT_EMAIL_ENDPOINT.to_owned())
    }

    /// Create a mailer that posts to a custom API endpoint.
    pub fn with_endpoint(api_key: String, sender: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            sender,
        }
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.sender,
                to: &email.to,
                subject: &email.subject,
                html: &email.html,
            })
            .send()
            .await
            .map_err(|error| Error::EmailDelivery(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(Error::EmailDelivery(format!(
                "email API returned {status}: {body}"
            )));
        }

        tracing::info!("Sent email \"{}\" to {}", email.subject, email.to);

        Ok(())
    }
}

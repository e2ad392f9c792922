//! Receipt scanning: sends a photographed receipt to a generative-AI service
//! and turns its JSON reply into pre-filled transaction form fields.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Multipart, State},
    response::{IntoResponse, Response},
};
use base64::Engine;
use rusqlite::Connection;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    account::list_accounts,
    timezone::local_date,
    transaction::{
        TransactionFormAction, TransactionFormValues, TransactionKind, categories,
        transaction_form,
    },
    user::UserId,
};

/// The transaction fields extracted from a receipt image.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptDetails {
    /// The receipt total.
    pub amount: f64,
    /// The purchase date.
    pub date: Date,
    /// A brief summary of the items purchased.
    pub description: String,
    /// The suggested expense category id.
    pub category: String,
    /// The merchant or store name.
    pub merchant_name: String,
}

const DEFAULT_SCAN_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

/// A client for the generative-AI receipt extraction service.
#[derive(Debug, Clone)]
pub struct ReceiptScanner {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

fn scan_prompt() -> String {
    format!(
        "Analyze this receipt image and extract the following information in JSON format:
      - Total amount (just the number)
      - Date (in ISO format)
      - Description or items purchased (brief summary)
      - Merchant/store name
      - Suggested category (one of: {})

      Only respond with valid JSON in this exact format:
      {{
        \"amount\": number,
        \"date\": \"ISO date string\",
        \"description\": \"string\",
        \"merchantName\": \"string\",
        \"category\": \"string\"
      }}

      If it is not a receipt, return an empty object",
        categories::expense_category_ids()
    )
}

impl ReceiptScanner {
    /// Create a scanner that talks to the default generative model endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, DEFAULT_SCAN_ENDPOINT.to_owned())
    }

    /// Create a scanner that posts to a custom endpoint.
    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    /// Send a receipt image to the extraction service and parse the reply.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::ReceiptScan] if the service cannot be reached or rejects the
    ///   request,
    /// - [Error::InvalidReceiptResponse] if the reply is not the expected
    ///   JSON.
    pub async fn scan(&self, image: &[u8], mime_type: &str) -> Result<ReceiptDetails, Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);

        let request_body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "inline_data": { "mime_type": mime_type, "data": encoded } },
                    { "text": scan_prompt() },
                ],
            }],
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|error| Error::ReceiptScan(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            return Err(Error::ReceiptScan(format!(
                "extraction service returned {status}: {body}"
            )));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|error| Error::InvalidReceiptResponse(error.to_string()))?;

        let text = reply["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                Error::InvalidReceiptResponse("no text in the model response".to_owned())
            })?;

        parse_receipt_reply(text)
    }
}

/// Strip Markdown code fences that the model often wraps its JSON in.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_owned()
}

const ISO_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

fn parse_iso_date(text: &str) -> Option<Date> {
    // Accept both plain dates and date-times by taking the date prefix.
    let date_part = text.get(..10)?;

    Date::parse(date_part, ISO_DATE_FORMAT).ok()
}

fn string_field(object: &serde_json::Map<String, serde_json::Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Parse the model's reply into [ReceiptDetails].
///
/// # Errors
/// Returns [Error::InvalidReceiptResponse] if the reply is not valid JSON,
/// is an empty object (the model's way of saying "not a receipt"), or is
/// missing the amount or date.
pub fn parse_receipt_reply(text: &str) -> Result<ReceiptDetails, Error> {
    let cleaned = strip_code_fences(text);

    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|error| Error::InvalidReceiptResponse(error.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidReceiptResponse("reply is not a JSON object".to_owned()))?;

    if object.is_empty() {
        return Err(Error::InvalidReceiptResponse(
            "the image does not appear to be a receipt".to_owned(),
        ));
    }

    let amount = match object.get("amount") {
        Some(serde_json::Value::Number(number)) => number.as_f64(),
        Some(serde_json::Value::String(text)) => text.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| Error::InvalidReceiptResponse("missing or invalid amount".to_owned()))?;

    let date = object
        .get("date")
        .and_then(serde_json::Value::as_str)
        .and_then(parse_iso_date)
        .ok_or_else(|| Error::InvalidReceiptResponse("missing or invalid date".to_owned()))?;

    Ok(ReceiptDetails {
        amount,
        date,
        description: string_field(object, "description"),
        category: string_field(object, "category"),
        merchant_name: string_field(object, "merchantName"),
    })
}

/// Turn extracted receipt details into transaction form values.
fn prefill_form_values(details: &ReceiptDetails) -> TransactionFormValues {
    let description = if details.description.is_empty() {
        details.merchant_name.clone()
    } else {
        details.description.clone()
    };

    TransactionFormValues {
        kind: TransactionKind::Expense,
        amount: format!("{:.2}", details.amount),
        date: details.date,
        category: details.category.clone(),
        description,
        is_recurring: false,
        recurring_interval: None,
    }
}

/// The state needed to scan a receipt.
#[derive(Clone)]
pub struct ScanReceiptState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub receipt_scanner: ReceiptScanner,
    pub local_timezone: String,
}

impl FromRef<AppState> for ScanReceiptState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            receipt_scanner: state.receipt_scanner.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler that extracts transaction fields from an uploaded receipt
/// image and responds with the transaction form pre-filled with them.
pub async fn scan_receipt_endpoint(
    State(state): State<ScanReceiptState>,
    Extension(user_id): Extension<UserId>,
    mut multipart: Multipart,
) -> Response {
    let mut image = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("receipt") => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("image/jpeg")
                    .to_owned();
                match field.bytes().await {
                    Ok(bytes) => image = Some((bytes, mime_type)),
                    Err(error) => {
                        tracing::error!("could not read receipt upload: {error}");
                        return Error::ReceiptScan(error.to_string()).into_alert_response();
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(error) => {
                tracing::error!("could not parse receipt upload: {error}");
                return Error::ReceiptScan(error.to_string()).into_alert_response();
            }
        }
    }

    let Some((image, mime_type)) = image else {
        return Error::ReceiptScan("no receipt image was uploaded".to_owned())
            .into_alert_response();
    };

    let details = match state.receipt_scanner.scan(&image, &mime_type).await {
        Ok(details) => details,
        Err(error) => {
            tracing::error!("receipt scan failed: {error}");
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let accounts: Vec<_> = match list_accounts(user_id, &connection) {
        Ok(accounts) => accounts.into_iter().map(|entry| entry.account).collect(),
        Err(error) => return error.into_alert_response(),
    };
    let selected_account = accounts
        .iter()
        .find(|account| account.is_default)
        .map(|account| account.id);

    let mut values = prefill_form_values(&details);
    if values.date > local_date(&state.local_timezone) {
        // Receipts are never from the future; distrust the extracted date.
        values.date = local_date(&state.local_timezone);
    }

    let form = transaction_form(
        TransactionFormAction::Create,
        &values,
        &accounts,
        selected_account,
    );
    let alert = crate::alert::Alert::success(
        "Receipt scanned",
        "Check the extracted details before saving.",
    );

    maud::html!( (form) (alert.into_markup()) ).into_response()
}

//! Transactions: the model, the balance-adjusting operations, and the pages
//! and endpoints for creating, editing, and deleting them.

pub mod categories;
mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod form;

pub use self::core::{
    NewTransaction, RecurringInterval, Transaction, TransactionId, TransactionKind,
    TransactionStatus, TransactionUpdate, create_transaction, create_transaction_table,
    delete_transactions, get_transaction, map_row_to_transaction, next_occurrence,
    query_transactions_for_account, update_transaction,
};
pub use create_endpoint::create_transaction_endpoint;
pub use create_page::get_create_transaction_page;
pub use delete_endpoint::delete_transactions_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use edit_page::get_edit_transaction_page;
pub use form::{
    TransactionFormAction, TransactionFormValues, parse_amount, parse_interval, transaction_form,
};

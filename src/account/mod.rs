//! Accounts: the model, balance bookkeeping, and the pages and endpoints for
//! creating accounts, viewing one account, and choosing the default.

mod core;
mod create_endpoint;
mod create_page;
mod default_endpoint;
mod detail_page;

pub use self::core::{
    Account, AccountId, AccountKind, AccountWithCount, create_account, create_account_table,
    find_default_account, get_account, list_accounts, map_row_to_account, set_default_account,
};
pub(crate) use self::core::set_account_balance;
pub use create_endpoint::create_account_endpoint;
pub use create_page::get_create_account_page;
pub use default_endpoint::set_default_account_endpoint;
pub use detail_page::get_account_detail_page;

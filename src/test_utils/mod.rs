#![allow(missing_docs)]

pub(crate) mod fixtures;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use fixtures::{get_test_connection, insert_test_account, insert_test_user};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment};
pub(crate) use http::{assert_content_type, assert_hx_redirect};

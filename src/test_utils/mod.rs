#![allow(missing_docs)]

pub(crate) mod html;
pub(crate) mod server;

pub(crate) use html::{assert_valid_html, parse_html_fragment, select_text};
pub(crate) use server::serve;

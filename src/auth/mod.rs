//! Session login helpers
//!
//! The crawl engine only ever sees an opaque cookie string. This module
//! obtains one by logging in through a Django-style form with CSRF
//! protection.

mod login;

pub use login::{build_login_client, form_login, LoginForm};

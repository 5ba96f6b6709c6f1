// ABOUTME: Core library for tal-login
// ABOUTME: Authenticates against the TAL passport and course APIs and confirms the result in a dialog

use std::sync::Once;

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod dialog;
pub mod error;
pub mod flow;
pub mod models;

// This ensures env_logger is only initialized once
static INIT: Once = Once::new();

/// Initialize the library
///
/// Sets up logging with env_logger. This is safe to call multiple times
/// as it will only initialize the logger on the first call.
pub fn init() {
    INIT.call_once(|| {
        // Another logger may already be installed
        let _ = env_logger::try_init();
        log::debug!("Logger initialized");
    });
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

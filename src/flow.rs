// ABOUTME: LoginFlow ties authentication to the confirmation dialog
// ABOUTME: One call authenticates, shows the result and returns the caller-visible outcome

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::dialog::{ConfirmationDialog, DialogBackend, DEFAULT_TITLE};
use crate::error::AppError;
use crate::models::{Credentials, LoginOutcome, LoginResult, ZoneCode};

/// Authenticate, confirm, return.
///
/// Generic over the dialog backend so the same flow drives a terminal, a
/// headless run or a scripted test.
pub struct LoginFlow<B: DialogBackend> {
    authenticator: Authenticator,
    backend: B,
    title: String,
    spinner: bool,
}

impl<B: DialogBackend> LoginFlow<B> {
    pub fn new(authenticator: Authenticator, backend: B) -> Self {
        LoginFlow {
            authenticator,
            backend,
            title: DEFAULT_TITLE.to_string(),
            spinner: false,
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    /// Show a spinner on stderr while requests are in flight
    pub fn with_spinner(mut self, enabled: bool) -> Self {
        self.spinner = enabled;
        self
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Password login: `{success, data?}` once the user closes the dialog
    pub fn login(&mut self, username: &str, password: &str) -> LoginOutcome {
        let credentials = Credentials::new(username, password);
        let result = self.with_progress("Logging in...", |auth| auth.authenticate(&credentials));
        self.confirm(result)
    }

    /// SMS login with a code the user already received
    pub fn login_with_sms(&mut self, phone: &str, sms_code: &str, zone: ZoneCode) -> LoginOutcome {
        let result = self.with_progress("Verifying SMS code...", |auth| {
            auth.authenticate_sms(phone, sms_code, zone)
        });
        self.confirm(result)
    }

    /// Request an SMS login code
    pub fn send_sms_code(&self, phone: &str, zone: ZoneCode) -> Result<(), AppError> {
        self.with_progress("Sending SMS code...", |auth| auth.send_sms_code(phone, zone))
            .map_err(|e| AppError::Generic(format!("Failed to send SMS code: {}", e)))
    }

    /// Show an existing result and resolve the dialog
    pub fn confirm(&mut self, result: LoginResult) -> LoginOutcome {
        info!(
            "Login attempt finished: success={} route={:?}",
            result.is_success(),
            result.route()
        );
        ConfirmationDialog::new(result)
            .with_title(self.title.clone())
            .show(&mut self.backend)
    }

    fn with_progress<T>(&self, message: &str, step: impl FnOnce(&Authenticator) -> T) -> T {
        if !self.spinner {
            return step(&self.authenticator);
        }

        let spinner = create_spinner(message);
        let value = step(&self.authenticator);
        spinner.finish_and_clear();
        value
    }
}

/// Creates a spinner with consistent styling
fn create_spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

// ABOUTME: Authenticator that runs the login chain and classifies its outcome
// ABOUTME: Passport login with code exchange, falling back to the course API password login

use log::{debug, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::{AppError, LoginError};
use crate::models::{AuthorizationCode, Credentials, LoginResult, LoginRoute, ZoneCode};

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Login successful";
pub const MISSING_CREDENTIALS_MESSAGE: &str = "Username and password are required";

/// Runs one login attempt per call and always answers with a [`LoginResult`]
#[derive(Debug)]
pub struct Authenticator {
    client: Client,
}

impl Authenticator {
    pub fn new(client: Client) -> Self {
        Authenticator { client }
    }

    pub fn from_config(config: Config) -> Result<Self, AppError> {
        Ok(Self::new(Client::new(config)?))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Password login.
    ///
    /// Tries the passport first and exchanges its code for session data. If
    /// the passport step fails for any reason the course API password login is
    /// tried once. Never fails: errors end up in the result's message.
    pub fn authenticate(&self, credentials: &Credentials) -> LoginResult {
        if credentials.username().trim().is_empty() || credentials.password().is_empty() {
            return LoginResult::failure(MISSING_CREDENTIALS_MESSAGE);
        }

        info!("Authenticating {}", credentials.username());

        let primary_error = match self.client.password_login(credentials) {
            Ok(grant) => return self.exchange(LoginRoute::Primary, grant),
            Err(err) => {
                warn!("Passport login failed: {}", err);
                err
            }
        };

        debug!("Trying course API password login");
        match self.client.student_password_login(credentials) {
            Ok(payload) => {
                info!("Logged in through the course API");
                LoginResult::success(LoginRoute::Fallback, DEFAULT_SUCCESS_MESSAGE, payload)
            }
            Err(fallback_error) => {
                warn!("Course API login failed: {}", fallback_error);
                LoginResult::failure(failure_message(&primary_error, &fallback_error))
            }
        }
    }

    /// Request an SMS login code for `phone`
    pub fn send_sms_code(&self, phone: &str, zone: ZoneCode) -> Result<(), LoginError> {
        self.client.send_sms_code(phone.trim(), zone.code())
    }

    /// SMS login followed by the code exchange. There is no fallback for this route.
    pub fn authenticate_sms(&self, phone: &str, sms_code: &str, zone: ZoneCode) -> LoginResult {
        let phone = phone.trim();
        let sms_code = sms_code.trim();
        if phone.is_empty() || sms_code.is_empty() {
            return LoginResult::failure("Phone number and SMS code are required");
        }

        info!("Authenticating +{} {} by SMS", zone.code(), phone);
        match self.client.sms_login(phone, sms_code, zone.code()) {
            Ok(grant) => self.exchange(LoginRoute::Sms, grant),
            Err(err) => {
                warn!("SMS login failed: {}", err);
                LoginResult::failure(err.to_string())
            }
        }
    }

    fn exchange(&self, route: LoginRoute, grant: AuthorizationCode) -> LoginResult {
        match self.client.exchange_code(&grant.code) {
            Ok(payload) => {
                info!("Authorization code exchanged for session data");
                let message = if grant.message.trim().is_empty() {
                    DEFAULT_SUCCESS_MESSAGE.to_string()
                } else {
                    grant.message
                };
                LoginResult::success(route, message, payload)
            }
            Err(err) => {
                warn!("Code exchange failed: {}", err);
                LoginResult::failure(format!("Failed to exchange authorization code: {}", err))
            }
        }
    }
}

/// Pick the most useful text once both password logins have failed.
///
/// The fallback's own message wins, then the passport's rejection, then a
/// description of the fallback failure.
fn failure_message(primary: &LoginError, fallback: &LoginError) -> String {
    fallback
        .rejection_message()
        .or_else(|| primary.rejection_message())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

// ABOUTME: Data model for login attempts and their wire formats
// ABOUTME: Credentials, LoginResult, SessionPayload, LoginOutcome and the JSON bodies the APIs exchange

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Username (phone number or student number) and password for one attempt
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which path produced a [`LoginResult`]. Exactly one per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginRoute {
    /// Passport password login followed by the code exchange
    Primary,
    /// Course API student password login
    Fallback,
    /// Passport SMS login followed by the code exchange
    Sms,
    /// Every path failed
    Failed,
}

/// The classified outcome of one login attempt.
///
/// Built only through [`LoginResult::success`] and [`LoginResult::failure`],
/// so a payload is present exactly when the attempt succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginResult {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    route: LoginRoute,
}

impl LoginResult {
    pub fn success<S: Into<String>>(route: LoginRoute, message: S, payload: Value) -> Self {
        LoginResult {
            success: true,
            message: message.into(),
            payload: Some(payload),
            route,
        }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        LoginResult {
            success: false,
            message: message.into(),
            payload: None,
            route: LoginRoute::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn route(&self) -> LoginRoute {
        self.route
    }

    /// Token and user id, when the payload carries them
    pub fn session(&self) -> Option<SessionPayload> {
        self.payload.as_ref().and_then(SessionPayload::from_value)
    }

    pub(crate) fn into_payload(self) -> Option<Value> {
        self.payload
    }
}

/// Session data extracted from a successful exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPayload {
    pub auth_token: String,
    pub user_id: String,
}

impl SessionPayload {
    /// Read `hb_token` and `pu_uid` out of an opaque payload.
    ///
    /// `pu_uid` comes back as a number from some endpoints and a string from others.
    pub fn from_value(value: &Value) -> Option<Self> {
        let auth_token = value.get("hb_token")?.as_str()?.to_string();
        let user_id = match value.get("pu_uid")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(SessionPayload {
            auth_token,
            user_id,
        })
    }

    /// Token with everything but the edges hidden, for display
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.auth_token.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

/// What the caller finally receives once the dialog closes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginOutcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl LoginOutcome {
    pub fn proceed(data: Option<Value>) -> Self {
        LoginOutcome {
            success: true,
            data,
        }
    }

    pub fn retry() -> Self {
        LoginOutcome {
            success: false,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    pub fn session(&self) -> Option<SessionPayload> {
        self.data.as_ref().and_then(SessionPayload::from_value)
    }
}

/// Passport API envelope shared by the password, SMS and SMS-send endpoints
#[derive(Debug, Deserialize)]
pub struct PassportResponse {
    pub errcode: i64,
    /// Absent or `null` on some successful responses
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub data: Option<PassportData>,
}

impl PassportResponse {
    /// The `errmsg` text, or `""` when the server sent none
    pub fn message(&self) -> &str {
        self.errmsg.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct PassportData {
    #[serde(default)]
    pub code: Option<String>,
}

/// Dialing zone for SMS login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneCode {
    #[default]
    Mainland,
    Taiwan,
    Macau,
    HongKong,
}

impl ZoneCode {
    pub const ALL: [ZoneCode; 4] = [
        ZoneCode::Mainland,
        ZoneCode::Taiwan,
        ZoneCode::Macau,
        ZoneCode::HongKong,
    ];

    /// Numeric calling code sent as `phone_code`
    pub fn code(self) -> &'static str {
        match self {
            ZoneCode::Mainland => "86",
            ZoneCode::Taiwan => "886",
            ZoneCode::Macau => "853",
            ZoneCode::HongKong => "852",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ZoneCode::Mainland => "中国 +86",
            ZoneCode::Taiwan => "中国台湾 +886",
            ZoneCode::Macau => "中国澳门 +853",
            ZoneCode::HongKong => "中国香港 +852",
        }
    }
}

impl FromStr for ZoneCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().trim_start_matches('+');
        ZoneCode::ALL
            .into_iter()
            .find(|zone| zone.code() == code)
            .ok_or_else(|| format!("unsupported zone code '{}' (expected 86, 886, 853 or 852)", s))
    }
}

/// Short-lived code granted by a successful passport login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    /// The passport's `errmsg`, shown to the user on success
    pub message: String,
}

/// Body of the course API code exchange
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExchangeRequest<'a> {
    pub code: &'a str,
    pub device_id: &'a str,
    pub terminal: &'a str,
    pub product: &'a str,
    pub client_id: &'a str,
}

/// Body of the course API student password login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentLoginRequest<'a> {
    pub account: &'a str,
    pub password: &'a str,
    pub device_id: &'a str,
    pub client_id: &'a str,
}

/// Error body returned by the course API
#[derive(Debug, Deserialize)]
pub struct CourseErrorResponse {
    #[serde(default)]
    pub errmsg: Option<String>,
}

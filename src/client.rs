// ABOUTME: HTTP client for the TAL passport and course APIs
// ABOUTME: One blocking call per remote endpoint, each returning a classified LoginError on failure

use log::{debug, info, warn};
use reqwest::blocking::{Client as ReqwestClient, ClientBuilder, Response};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{AppError, LoginError};
use crate::models::{
    AuthorizationCode, CodeExchangeRequest, CourseErrorResponse, Credentials, PassportResponse,
    StudentLoginRequest,
};

const VER_NUM: &str = "1.13.03";
const REFERER: &str = "https://speiyou.cn/";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const SOURCE_TYPE: &str = "2";
const DOMAIN: &str = "xueersi.com";
const TERMINAL: &str = "pc";
const PRODUCT: &str = "ss";
const SMS_VERIFY_TYPE: &str = "1";

const PASSWORD_LOGIN_PATH: &str = "/v1/web/login/pwd";
const SMS_SEND_PATH: &str = "/v1/web/login/sms/send";
const SMS_LOGIN_PATH: &str = "/v1/web/login/sms";
const CODE_EXCHANGE_PATH: &str = "/passport/v1/login/student/code";
const STUDENT_LOGIN_PATH: &str = "/passport/v1/login/student/password";

/// API client for the TAL login endpoints
#[derive(Debug)]
pub struct Client {
    /// The underlying reqwest client for making HTTP requests
    http_client: ReqwestClient,

    /// Application configuration
    config: Config,
}

impl Client {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self, AppError> {
        let http_client = ClientBuilder::new()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Generic(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Client initialized for {} (passport {}, course {})",
            config.platform, config.passport_base, config.course_base
        );

        Ok(Client {
            http_client,
            config,
        })
    }

    /// Create a client whose passport and course APIs both live at `base_url`
    pub fn new_with_base_url<S: Into<String>>(base_url: S) -> Result<Self, AppError> {
        Self::new(Config::with_base_url(base_url))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Passport password login. Returns the authorization code on `errcode == 0`.
    pub fn password_login(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthorizationCode, LoginError> {
        let url = self.passport_url(PASSWORD_LOGIN_PATH);
        debug!("Passport password login for {} at {}", credentials.username(), url);

        let response = self
            .passport_request(&url)
            .form(&[
                ("symbol", credentials.username()),
                ("password", credentials.password()),
                ("source_type", SOURCE_TYPE),
                ("domain", DOMAIN),
            ])
            .send()?;

        authorization_code(read_passport(response)?)
    }

    /// Ask the passport service to text a login code to `phone`
    pub fn send_sms_code(&self, phone: &str, zone_code: &str) -> Result<(), LoginError> {
        let url = self.passport_url(SMS_SEND_PATH);
        debug!("Requesting SMS code for +{} {}", zone_code, phone);

        let response = self
            .passport_request(&url)
            .form(&[
                ("verify_type", SMS_VERIFY_TYPE),
                ("phone", phone),
                ("phone_code", zone_code),
            ])
            .send()?;

        let body = read_passport(response)?;
        if body.errcode != 0 {
            return Err(passport_rejection(&body));
        }
        info!("SMS code sent to +{} {}", zone_code, phone);
        Ok(())
    }

    /// Passport SMS login. Returns the authorization code on `errcode == 0`.
    pub fn sms_login(
        &self,
        phone: &str,
        sms_code: &str,
        zone_code: &str,
    ) -> Result<AuthorizationCode, LoginError> {
        let url = self.passport_url(SMS_LOGIN_PATH);
        debug!("Passport SMS login for +{} {}", zone_code, phone);

        let response = self
            .passport_request(&url)
            .form(&[
                ("phone", phone),
                ("sms_code", sms_code),
                ("phone_code", zone_code),
                ("source_type", SOURCE_TYPE),
                ("domain", DOMAIN),
            ])
            .send()?;

        authorization_code(read_passport(response)?)
    }

    /// Trade an authorization code for session data.
    ///
    /// The body is returned as-is; callers treat it as an opaque payload.
    pub fn exchange_code(&self, code: &str) -> Result<Value, LoginError> {
        let url = self.course_url(CODE_EXCHANGE_PATH);
        debug!("Exchanging authorization code at {}", url);

        let body = CodeExchangeRequest {
            code,
            device_id: &self.config.device_id,
            terminal: TERMINAL,
            product: PRODUCT,
            client_id: &self.config.client_id,
        };

        let response = self
            .http_client
            .post(&url)
            .header("Referer", REFERER)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        debug!("Code exchange responded with status {}", status);

        if !status.is_success() {
            return Err(LoginError::rejected_with_status(
                status.as_u16(),
                course_error_message(&text),
            ));
        }

        let payload: Value = serde_json::from_str(&text)?;
        if !payload.is_object() {
            return Err(LoginError::MalformedResponse(
                "code exchange did not return a JSON object".to_string(),
            ));
        }
        Ok(payload)
    }

    /// Course API student password login, used when the passport rejects.
    ///
    /// On HTTP 200 returns `{hb_token, pu_uid}` taken from the response.
    pub fn student_password_login(&self, credentials: &Credentials) -> Result<Value, LoginError> {
        let url = self.course_url(STUDENT_LOGIN_PATH);
        debug!("Student password login for {} at {}", credentials.username(), url);

        let body = StudentLoginRequest {
            account: credentials.username(),
            password: credentials.password(),
            device_id: &self.config.device_id,
            client_id: &self.config.client_id,
        };

        let response = self.http_client.post(&url).json(&body).send()?;
        let status = response.status();
        let text = response.text()?;
        debug!("Student password login responded with status {}", status);

        if status != StatusCode::OK {
            return Err(LoginError::rejected_with_status(
                status.as_u16(),
                course_error_message(&text),
            ));
        }

        let parsed: Value = serde_json::from_str(&text)?;
        let token = parsed
            .get("hb_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty());
        let uid = parsed
            .get("pu_uid")
            .filter(|uid| uid.is_string() || uid.is_number());

        match (token, uid) {
            (Some(token), Some(uid)) => Ok(json!({ "hb_token": token, "pu_uid": uid })),
            _ => Err(LoginError::MalformedResponse(
                "response is missing hb_token or pu_uid".to_string(),
            )),
        }
    }

    fn passport_request(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        self.http_client
            .post(url)
            .header("ver-num", VER_NUM)
            .header("content-type", FORM_CONTENT_TYPE)
            .header("device-id", self.config.device_id.as_str())
            .header("client-id", self.config.client_id.as_str())
            .header("referer", REFERER)
    }

    fn passport_url(&self, path: &str) -> String {
        format!("{}{}", self.config.passport_base, path)
    }

    fn course_url(&self, path: &str) -> String {
        format!("{}{}", self.config.course_base, path)
    }
}

fn read_passport(response: Response) -> Result<PassportResponse, LoginError> {
    let status = response.status();
    let text = response.text()?;
    debug!("Passport responded with status {}", status);

    serde_json::from_str(&text).map_err(|e| {
        warn!("Unreadable passport response (status {}): {}", status, e);
        LoginError::MalformedResponse(format!("status {}: {}", status, e))
    })
}

fn authorization_code(body: PassportResponse) -> Result<AuthorizationCode, LoginError> {
    if body.errcode != 0 {
        return Err(passport_rejection(&body));
    }

    let code = body
        .data
        .and_then(|data| data.code)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            LoginError::MalformedResponse("login succeeded without an authorization code".into())
        })?;

    Ok(AuthorizationCode {
        code,
        message: body.errmsg.unwrap_or_default(),
    })
}

fn passport_rejection(body: &PassportResponse) -> LoginError {
    let message = body.message().trim();
    if message.is_empty() {
        LoginError::rejected(format!("Login rejected (errcode {})", body.errcode))
    } else {
        LoginError::rejected(message.to_string())
    }
}

fn course_error_message(text: &str) -> Option<String> {
    serde_json::from_str::<CourseErrorResponse>(text)
        .ok()
        .and_then(|body| body.errmsg)
        .filter(|message| !message.trim().is_empty())
}

// ABOUTME: Tests for the password and SMS login chains against a mock server
// ABOUTME: Covers the primary path, the fallback, double failure and network failures

use mockito::Matcher;
use serde_json::json;
use tal_login::{
    auth::{Authenticator, MISSING_CREDENTIALS_MESSAGE},
    client::Client,
    config::Config,
    models::{Credentials, LoginRoute, ZoneCode},
};

// Nothing listens on port 1, so connections are refused straight away
const UNREACHABLE: &str = "http://127.0.0.1:1";

// Helper function to create an authenticator aimed at a mockito server
fn create_mock_authenticator(server: &mockito::Server) -> Authenticator {
    tal_login::init();
    let client = Client::new_with_base_url(server.url()).expect("Failed to create mock client");
    Authenticator::new(client)
}

fn credentials() -> Credentials {
    Credentials::new("u1", "p1")
}

#[test]
fn test_primary_login_exchanges_code() {
    let mut server = mockito::Server::new();

    // 1. Passport accepts the password and grants a code
    let primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .match_header("ver-num", "1.13.03")
        .match_header("device-id", "TAL")
        .match_header("client-id", "523601")
        .match_header("referer", "https://speiyou.cn/")
        .match_header(
            "content-type",
            Matcher::Regex("application/x-www-form-urlencoded.*".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".to_string(), "u1".to_string()),
            Matcher::UrlEncoded("password".to_string(), "p1".to_string()),
            Matcher::UrlEncoded("source_type".to_string(), "2".to_string()),
            Matcher::UrlEncoded("domain".to_string(), "xueersi.com".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"errcode": 0, "errmsg": "登录成功", "data": {"code": "abc"}}"#)
        .create();

    // 2. Course API trades the code for session data
    let exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .match_header("referer", "https://speiyou.cn/")
        .match_body(Matcher::Json(json!({
            "code": "abc",
            "deviceId": "TAL",
            "terminal": "pc",
            "product": "ss",
            "clientId": "523601"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hb_token": "T", "pu_uid": 42, "nickname": "小明"}"#)
        .create();

    // 3. The fallback must not be touched
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .expect(0)
        .create();

    let auth = create_mock_authenticator(&server);
    let result = auth.authenticate(&credentials());

    assert!(result.is_success(), "Login failed: {}", result.message());
    assert_eq!(result.route(), LoginRoute::Primary);
    assert_eq!(result.message(), "登录成功");
    assert_eq!(
        result.payload(),
        Some(&json!({"hb_token": "T", "pu_uid": 42, "nickname": "小明"}))
    );

    let session = result.session().expect("session payload");
    assert_eq!(session.auth_token, "T");
    assert_eq!(session.user_id, "42");

    primary_mock.assert();
    exchange_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_primary_success_without_errmsg_uses_default_message() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 0, "data": {"code": "abc"}}"#)
        .create();
    let _exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .with_status(200)
        .with_body(r#"{"hb_token": "T", "pu_uid": "7"}"#)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(result.is_success());
    assert!(!result.message().is_empty());
}

#[test]
fn test_primary_success_with_null_errmsg_exchanges_code() {
    let mut server = mockito::Server::new();

    let primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 0, "errmsg": null, "data": {"code": "abc"}}"#)
        .create();
    let exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .match_body(Matcher::PartialJson(json!({"code": "abc"})))
        .with_status(200)
        .with_body(r#"{"hb_token": "T", "pu_uid": 5}"#)
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(401)
        .with_body(r#"{"errmsg": "bad"}"#)
        .expect(0)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(result.is_success(), "Login failed: {}", result.message());
    assert_eq!(result.route(), LoginRoute::Primary);
    assert!(!result.message().is_empty());
    assert_eq!(result.payload(), Some(&json!({"hb_token": "T", "pu_uid": 5})));

    primary_mock.assert();
    exchange_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_null_errmsg_rejection_reports_errcode() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 11002, "errmsg": null}"#)
        .create();
    let _fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(401)
        .with_body("{}")
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    assert_eq!(result.route(), LoginRoute::Failed);
    assert_eq!(result.message(), "Login rejected (errcode 11002)");
}

#[test]
fn test_fallback_after_primary_rejection() {
    let mut server = mockito::Server::new();

    // 1. Passport rejects the password
    let primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"errcode": 11001, "errmsg": "账号不存在", "data": {}}"#)
        .create();

    // 2. No exchange happens on this path
    let exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .expect(0)
        .create();

    // 3. Course API accepts the student number
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .match_body(Matcher::Json(json!({
            "account": "u1",
            "password": "p1",
            "deviceId": "TAL",
            "clientId": "523601"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"hb_token": "F", "pu_uid": 9001, "extra": true}"#)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(result.is_success(), "Fallback failed: {}", result.message());
    assert_eq!(result.route(), LoginRoute::Fallback);
    // Only the token and user id are captured
    assert_eq!(result.payload(), Some(&json!({"hb_token": "F", "pu_uid": 9001})));

    primary_mock.assert();
    exchange_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_both_rejected_reports_fallback_message() {
    let mut server = mockito::Server::new();

    let primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 11002, "errmsg": "passport says no"}"#)
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(400)
        .with_body(r#"{"errmsg": "学员编号或密码错误"}"#)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    assert_eq!(result.route(), LoginRoute::Failed);
    assert_eq!(result.message(), "学员编号或密码错误");
    assert!(result.payload().is_none());

    primary_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_fallback_without_message_reports_primary_rejection() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 11002, "errmsg": "密码错误"}"#)
        .create();
    let _fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(500)
        .with_body("Internal Server Error")
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    assert_eq!(result.message(), "密码错误");
}

#[test]
fn test_fallback_malformed_success_is_failure() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 1, "errmsg": ""}"#)
        .create();
    let _fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    assert!(!result.message().is_empty());
}

#[test]
fn test_fallback_missing_token_is_failure() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 1, "errmsg": "nope"}"#)
        .create();
    let _fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(200)
        .with_body(r#"{"pu_uid": 3}"#)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    // The passport's rejection is the most useful text left
    assert_eq!(result.message(), "nope");
}

#[test]
fn test_malformed_primary_still_tries_fallback() {
    let mut server = mockito::Server::new();

    let primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(502)
        .with_body("Bad Gateway")
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(200)
        .with_body(r#"{"hb_token": "F", "pu_uid": "88"}"#)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(result.is_success());
    assert_eq!(result.route(), LoginRoute::Fallback);
    primary_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_primary_success_without_code_tries_fallback() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 0, "errmsg": "", "data": {}}"#)
        .create();
    let exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .expect(0)
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(401)
        .with_body(r#"{"errmsg": "unauthorized"}"#)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    assert_eq!(result.message(), "unauthorized");
    exchange_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_failed_exchange_does_not_fall_back() {
    let mut server = mockito::Server::new();

    let _primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .with_status(200)
        .with_body(r#"{"errcode": 0, "errmsg": "ok", "data": {"code": "abc"}}"#)
        .create();
    let exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .with_status(403)
        .with_body(r#"{"errmsg": "code expired"}"#)
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .expect(0)
        .create();

    let result = create_mock_authenticator(&server).authenticate(&credentials());

    assert!(!result.is_success());
    assert!(result.message().contains("code expired"));
    exchange_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_unreachable_servers_fail_gracefully() {
    tal_login::init();
    let auth = Authenticator::new(
        Client::new_with_base_url(UNREACHABLE).expect("Failed to create client"),
    );

    let result = auth.authenticate(&credentials());

    assert!(!result.is_success());
    assert!(
        result.message().starts_with("Network error"),
        "unexpected message: {}",
        result.message()
    );
}

#[test]
fn test_primary_network_failure_still_tries_fallback() {
    let mut server = mockito::Server::new();

    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .with_status(200)
        .with_body(r#"{"hb_token": "F", "pu_uid": 5}"#)
        .create();

    // Passport unreachable, course API on the mock server
    let config = Config {
        passport_base: UNREACHABLE.to_string(),
        ..Config::with_base_url(server.url())
    };
    let auth = Authenticator::from_config(config).expect("Failed to create authenticator");

    let result = auth.authenticate(&credentials());

    assert!(result.is_success(), "Fallback failed: {}", result.message());
    assert_eq!(result.route(), LoginRoute::Fallback);
    fallback_mock.assert();
}

#[test]
fn test_empty_credentials_make_no_requests() {
    let mut server = mockito::Server::new();

    let primary_mock = server
        .mock("POST", "/v1/web/login/pwd")
        .expect(0)
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .expect(0)
        .create();

    let auth = create_mock_authenticator(&server);
    let result = auth.authenticate(&Credentials::new("  ", "p1"));

    assert!(!result.is_success());
    assert_eq!(result.message(), MISSING_CREDENTIALS_MESSAGE);
    primary_mock.assert();
    fallback_mock.assert();
}

#[test]
fn test_send_sms_code() {
    let mut server = mockito::Server::new();

    let send_mock = server
        .mock("POST", "/v1/web/login/sms/send")
        .match_header("client-id", "523601")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("verify_type".to_string(), "1".to_string()),
            Matcher::UrlEncoded("phone".to_string(), "13800000000".to_string()),
            Matcher::UrlEncoded("phone_code".to_string(), "852".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"errcode": 0, "errmsg": "发送成功"}"#)
        .create();

    let auth = create_mock_authenticator(&server);
    let sent = auth.send_sms_code(" 13800000000 ", ZoneCode::HongKong);

    assert!(sent.is_ok(), "Send failed: {:?}", sent.err());
    send_mock.assert();
}

#[test]
fn test_send_sms_code_rejected() {
    let mut server = mockito::Server::new();

    let _send_mock = server
        .mock("POST", "/v1/web/login/sms/send")
        .with_status(200)
        .with_body(r#"{"errcode": 20001, "errmsg": "发送过于频繁"}"#)
        .create();

    let auth = create_mock_authenticator(&server);
    let error = auth
        .send_sms_code("13800000000", ZoneCode::Mainland)
        .expect_err("rate limited send should fail");

    assert_eq!(error.to_string(), "发送过于频繁");
}

#[test]
fn test_sms_login_exchanges_code() {
    let mut server = mockito::Server::new();

    let sms_mock = server
        .mock("POST", "/v1/web/login/sms")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("phone".to_string(), "13800000000".to_string()),
            Matcher::UrlEncoded("sms_code".to_string(), "123456".to_string()),
            Matcher::UrlEncoded("phone_code".to_string(), "86".to_string()),
            Matcher::UrlEncoded("source_type".to_string(), "2".to_string()),
            Matcher::UrlEncoded("domain".to_string(), "xueersi.com".to_string()),
        ]))
        .with_status(200)
        .with_body(r#"{"errcode": 0, "errmsg": "ok", "data": {"code": "sms-code"}}"#)
        .create();
    let exchange_mock = server
        .mock("POST", "/passport/v1/login/student/code")
        .match_body(Matcher::PartialJson(json!({"code": "sms-code"})))
        .with_status(200)
        .with_body(r#"{"hb_token": "S", "pu_uid": 1}"#)
        .create();

    let auth = create_mock_authenticator(&server);
    let result = auth.authenticate_sms("13800000000", "123456", ZoneCode::Mainland);

    assert!(result.is_success(), "SMS login failed: {}", result.message());
    assert_eq!(result.route(), LoginRoute::Sms);
    sms_mock.assert();
    exchange_mock.assert();
}

#[test]
fn test_sms_login_rejected_has_no_fallback() {
    let mut server = mockito::Server::new();

    let _sms_mock = server
        .mock("POST", "/v1/web/login/sms")
        .with_status(200)
        .with_body(r#"{"errcode": 30001, "errmsg": "验证码错误"}"#)
        .create();
    let fallback_mock = server
        .mock("POST", "/passport/v1/login/student/password")
        .expect(0)
        .create();

    let auth = create_mock_authenticator(&server);
    let result = auth.authenticate_sms("13800000000", "000000", ZoneCode::Mainland);

    assert!(!result.is_success());
    assert_eq!(result.message(), "验证码错误");
    fallback_mock.assert();
}

//! Admin API: login, session issuance, and authorization.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use super::support::Service;
use crate::harness::{ensure, ensure_eq, Failed, TestContext};

/// Sessions are issued for this many minutes.
const SESSION_DURATION_MINS: i64 = 60;

const SESSION_COOKIE: &str = "GOMMENT_SID";

fn login(service: &Service) -> reqwest::blocking::Response {
    service.post_json("/admin/login", json!({ "password": "test" }))
}

fn session_cookie(response: &reqwest::blocking::Response) -> Option<String> {
    response
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

pub fn login_wrong(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);

    let response = service.post("/admin/login");
    ensure_eq(response.status().as_u16(), 400)?;
    let data = response
        .json::<serde_json::Value>()
        .expect("login body is not json");
    ensure_eq(&data["status"], &json!("error"))?;
    Ok(())
}

pub fn login_right(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);

    let response = login(&service);
    ensure_eq(response.status().as_u16(), 200)?;

    let cookie = session_cookie(&response);
    let data = response
        .json::<serde_json::Value>()
        .expect("login body is not json");
    ensure_eq(&data["status"], &json!("success"))?;

    let cookie = cookie.ok_or_else(|| Failed::new("no session cookie issued"))?;
    ensure(cookie.len() > 10, "session cookie suspiciously short")?;

    let valid_until = data["valid_until"]
        .as_str()
        .ok_or_else(|| Failed::new("valid_until missing from login response"))?;
    let valid_until: DateTime<Utc> = valid_until
        .parse()
        .unwrap_or_else(|e| panic!("valid_until is not a timestamp: {e}"));
    let remaining = valid_until - Utc::now();
    ensure(
        remaining > Duration::minutes(SESSION_DURATION_MINS - 1),
        format!("session expires too early: {remaining}"),
    )?;
    ensure(
        remaining < Duration::minutes(SESSION_DURATION_MINS + 1),
        format!("session expires too late: {remaining}"),
    )?;
    Ok(())
}

pub fn threads_unauthorized(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);

    let response = service.get("/admin/threads");
    ensure_eq(response.status().as_u16(), 401)?;
    Ok(())
}

pub fn threads_empty(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);

    let cookie = session_cookie(&login(&service))
        .ok_or_else(|| Failed::new("no session cookie issued"))?;
    let response = service.get_with_cookie("/admin/threads", SESSION_COOKIE, &cookie);
    ensure_eq(response.status().as_u16(), 200)?;
    let threads = response
        .json::<serde_json::Value>()
        .expect("threads body is not json");
    ensure_eq(&threads, &json!([]))?;
    Ok(())
}

//! Basic API checks: the status endpoint and an empty comment listing.

use serde_json::json;

use super::support::Service;
use crate::harness::{ensure_eq, Failed, TestContext};

pub fn status_ok(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);

    let response = service.get("/status");
    ensure_eq(response.status().as_u16(), 200)?;
    let data = response
        .json::<serde_json::Value>()
        .expect("status body is not json");
    ensure_eq(&data["status"], &json!("ok"))?;
    Ok(())
}

pub fn comments_empty(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);

    let response = service.get("/comments?thread=0");
    ensure_eq(response.status().as_u16(), 200)?;
    let comments = response
        .json::<serde_json::Value>()
        .expect("comments body is not json");
    ensure_eq(&comments, &json!({ "total": 0, "comments": [] }))?;
    Ok(())
}

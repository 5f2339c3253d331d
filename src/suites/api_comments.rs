//! Comment retrieval: threaded pagination, child detection, sanitization.

use serde_json::{json, Value};

use super::support::Service;
use crate::harness::{ensure, ensure_eq, Failed, TestContext};

/// Seeds a three-level comment tree into thread 0.
///
/// Five root comments (ids 1-5), two replies under comment 1 and one under
/// comment 2 (ids 6-8), one reply under comment 6 (id 9) and one under
/// comment 9 (id 10).
fn seed_tree(service: &Service) {
    for i in 1..=5 {
        service.post_comment(
            &format!("User {i}"),
            &format!("user{i}@mail.com"),
            &format!("Comment {i}"),
            0,
            0,
        );
    }
    service.post_comment("User 6", "user6@mail.com", "Comment 1 1", 0, 1);
    service.post_comment("User 7", "user7@mail.com", "Comment 1 2", 0, 1);
    service.post_comment("User 8", "user8@mail.com", "Comment 2 1", 0, 2);
    service.post_comment("User 9", "user9@mail.com", "Comment 1 1 1", 0, 6);
    service.post_comment("User 10", "user10@mail.com", "Comment 1 1 1 1", 0, 9);
}

fn text_of(node: &Value) -> &Value {
    &node["comment"]["text"]
}

pub fn threaded_retrieval(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);
    seed_tree(&service);
    ctx.log("seeded 10 comments across four levels in thread 0");

    // The total counts roots regardless of the page size.
    let body = service.get_json("/comments?thread=0&depth=0&max=1");
    ensure_eq(&body["total"], &json!(5))?;

    // All roots, no children materialized at depth 0.
    let body = service.get_json("/comments?thread=0&depth=0");
    let comments = body["comments"].as_array().expect("comments is not a list");
    ensure_eq(comments.len(), 5)?;
    ensure_eq(&comments[0]["children"], &Value::Null)?;

    // Offset skips whole roots.
    let body = service.get_json("/comments?thread=0&depth=0&offset=2");
    let comments = body["comments"].as_array().expect("comments is not a list");
    ensure_eq(comments.len(), 3)?;
    ensure_eq(text_of(&comments[0]), &json!("Comment 3"))?;
    ensure_eq(text_of(&comments[1]), &json!("Comment 4"))?;
    ensure_eq(text_of(&comments[2]), &json!("Comment 5"))?;

    // Max caps the page.
    let body = service.get_json("/comments?thread=0&depth=0&max=2");
    let comments = body["comments"].as_array().expect("comments is not a list");
    ensure_eq(comments.len(), 2)?;
    ensure_eq(text_of(&comments[0]), &json!("Comment 1"))?;
    ensure_eq(text_of(&comments[1]), &json!("Comment 2"))?;

    // Depth 1 materializes one level of children.
    let body = service.get_json("/comments?thread=0&depth=1&max=2");
    let comments = body["comments"].as_array().expect("comments is not a list");
    ensure_eq(text_of(&comments[0]), &json!("Comment 1"))?;
    ensure_eq(text_of(&comments[0]["children"][0]), &json!("Comment 1 1"))?;
    ensure_eq(text_of(&comments[0]["children"][1]), &json!("Comment 1 2"))?;
    ensure_eq(&comments[0]["children"][0]["children"], &Value::Null)?;

    // Depth 2 reaches the grandchildren.
    let body = service.get_json("/comments?thread=0&depth=2&max=2");
    let comments = body["comments"].as_array().expect("comments is not a list");
    let first_child = &comments[0]["children"][0];
    ensure_eq(text_of(first_child), &json!("Comment 1 1"))?;
    let grandchildren = first_child["children"]
        .as_array()
        .expect("children is not a list");
    ensure_eq(grandchildren.len(), 1)?;
    ensure_eq(text_of(&grandchildren[0]), &json!("Comment 1 1 1"))?;

    // Max and offset compose.
    let body = service.get_json("/comments?thread=0&depth=0&max=1&offset=2");
    let comments = body["comments"].as_array().expect("comments is not a list");
    ensure_eq(comments.len(), 1)?;
    ensure_eq(text_of(&comments[0]), &json!("Comment 3"))?;
    Ok(())
}

pub fn has_children(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);
    service.post_comment("User 1", "user1@mail.com", "Comment 1", 0, 0);
    service.post_comment("User 2", "user1@mail.com", "Comment 2", 0, 0);
    service.post_comment("User 3", "user1@mail.com", "Comment 2 1", 0, 2);

    // Comment 1 never has children, at any depth.
    for depth in [2, 0] {
        let body = service.get_json(&format!("/comments?thread=0&depth={depth}"));
        let comments = body["comments"].as_array().expect("comments is not a list");
        ensure_eq(&comments[0]["has_children"], &json!(false))?;
        ensure_eq(&comments[1]["has_children"], &json!(true))?;
    }
    Ok(())
}

pub fn sanitize(ctx: &mut TestContext) -> Result<(), Failed> {
    let service = Service::launch(ctx);
    service.post_comment(
        "<i>XSS</i>",
        "user1@mail.com",
        "<script>alert('XSS');</script>",
        0,
        0,
    );

    let body = service.get_json("/comments?thread=0&depth=0&max=2");
    let comments = body["comments"].as_array().expect("comments is not a list");
    ensure(!comments.is_empty(), "sanitized comment was not stored")?;
    ensure_eq(
        text_of(&comments[0]),
        &json!("&lt;script&gt;alert(&#39;XSS&#39;);&lt;/script&gt;"),
    )?;
    ensure_eq(
        &comments[0]["comment"]["author"],
        &json!("&lt;i&gt;XSS&lt;/i&gt;"),
    )?;
    Ok(())
}

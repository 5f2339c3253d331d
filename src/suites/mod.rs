//! Registered system-test suites for the gomment server.
//!
//! Each module is a namespace, each inner group a suite, each leaf a test
//! method; together they form the registry the dispatcher resolves
//! specifiers against (`api_basic.ApiBasicTest.status_ok`, `admin`, ...).

pub mod admin;
pub mod api_basic;
pub mod api_comments;
pub mod support;

use crate::discovery::{case, group, Registry};

/// Builds the full registration tree, once per invocation.
pub fn registry() -> Registry {
    Registry::new(vec![
        group(
            "api_basic",
            vec![group(
                "ApiBasicTest",
                vec![
                    case("status_ok", api_basic::status_ok),
                    case("comments_empty", api_basic::comments_empty),
                ],
            )],
        ),
        group(
            "api_comments",
            vec![group(
                "ApiCommentsTest",
                vec![
                    case("threaded_retrieval", api_comments::threaded_retrieval),
                    case("has_children", api_comments::has_children),
                    case("sanitize", api_comments::sanitize),
                ],
            )],
        ),
        group(
            "admin",
            vec![group(
                "AdminTest",
                vec![
                    case("login_wrong", admin::login_wrong),
                    case("login_right", admin::login_right),
                    case("threads_unauthorized", admin::threads_unauthorized),
                    case("threads_empty", admin::threads_empty),
                ],
            )],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_flattens_every_suite() {
        let all = registry().resolve(&[]).unwrap();
        assert_eq!(all.len(), 9);

        let ids: HashSet<_> = all.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), all.len());
        assert!(ids.contains("api_basic.ApiBasicTest.status_ok"));
        assert!(ids.contains("admin.AdminTest.threads_empty"));
    }

    #[test]
    fn test_suite_specifier_expands_fully() {
        let admin = registry()
            .resolve(&["admin.AdminTest".to_string()])
            .unwrap();
        assert_eq!(admin.len(), 4);
    }
}

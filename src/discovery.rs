//! Test discovery against the static registry.
//!
//! Tests are registered once, at startup, as a tree of named groups with
//! leaf cases carrying plain function handles — there is no runtime name
//! resolution. A leaf's qualified identifier (`namespace.suite.method`) is
//! derived from its position in the tree at flatten time, so an identifier
//! always matches the path that reaches it.
//!
//! Discovery resolves zero or more specifiers into a flat, ordered list of
//! leaf tests:
//!
//! - no specifiers: the whole tree is flattened depth-first in
//!   first-encountered order, each identifier exactly once even when a
//!   subtree is registered under more than one parent;
//! - with specifiers: each one names a leaf (full identifier) or a group
//!   (any qualified prefix), and a group expands to **all** of its leaves.
//!   Matches are concatenated in specifier order; a test named by two
//!   specifiers runs twice.

use std::collections::HashSet;

use crate::harness::TestFn;

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors raised while resolving test specifiers.
///
/// Discovery failures abort the run before any test starts; there is
/// nothing to isolate against yet.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A specifier matched no registered leaf or group.
    #[error("specifier `{0}` does not match any registered test or group")]
    UnmatchedSpecifier(String),
}

/// One resolvable leaf test: its qualified identifier plus the handle that
/// runs it.
#[derive(Clone)]
pub struct RegisteredTest {
    pub id: String,
    pub run: TestFn,
}

impl std::fmt::Debug for RegisteredTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTest")
            .field("id", &self.id)
            .finish()
    }
}

/// A node in the registration tree.
pub enum TestNode {
    /// A leaf test case; `name` is the final identifier segment.
    Case { name: &'static str, run: TestFn },
    /// A named grouping of nodes, nested arbitrarily deep.
    Group {
        name: &'static str,
        children: Vec<TestNode>,
    },
}

/// Builds a leaf node.
pub fn case(name: &'static str, run: TestFn) -> TestNode {
    TestNode::Case { name, run }
}

/// Builds a group node.
pub fn group(name: &'static str, children: Vec<TestNode>) -> TestNode {
    TestNode::Group { name, children }
}

/// The full registration tree.
pub struct Registry {
    root: Vec<TestNode>,
}

impl Registry {
    pub fn new(root: Vec<TestNode>) -> Self {
        Self { root }
    }

    /// Resolves specifiers into an ordered list of leaf tests.
    ///
    /// See the module docs for the empty/non-empty semantics. Fails with
    /// [`DiscoveryError::UnmatchedSpecifier`] when any specifier resolves
    /// to zero leaves.
    pub fn resolve(&self, specifiers: &[String]) -> DiscoveryResult<Vec<RegisteredTest>> {
        if specifiers.is_empty() {
            return Ok(self.flatten_all());
        }

        let mut resolved = Vec::new();
        for specifier in specifiers {
            let mut matches = Vec::new();
            for node in &self.root {
                collect_matching(node, "", specifier, &mut matches);
            }
            if matches.is_empty() {
                return Err(DiscoveryError::UnmatchedSpecifier(specifier.clone()));
            }
            resolved.extend(matches);
        }
        Ok(resolved)
    }

    /// Flattens the entire tree, deduplicating by identifier while keeping
    /// first-encountered order.
    fn flatten_all(&self) -> Vec<RegisteredTest> {
        let mut all = Vec::new();
        for node in &self.root {
            collect_leaves(node, "", &mut all);
        }
        let mut seen = HashSet::new();
        all.retain(|test| seen.insert(test.id.clone()));
        all
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn collect_leaves(node: &TestNode, prefix: &str, out: &mut Vec<RegisteredTest>) {
    match node {
        TestNode::Case { name, run } => out.push(RegisteredTest {
            id: qualify(prefix, name),
            run: *run,
        }),
        TestNode::Group { name, children } => {
            let qualified = qualify(prefix, name);
            for child in children {
                collect_leaves(child, &qualified, out);
            }
        }
    }
}

fn collect_matching(node: &TestNode, prefix: &str, specifier: &str, out: &mut Vec<RegisteredTest>) {
    match node {
        TestNode::Case { name, run } => {
            if qualify(prefix, name) == specifier {
                out.push(RegisteredTest {
                    id: qualify(prefix, name),
                    run: *run,
                });
            }
        }
        TestNode::Group { name, children } => {
            let qualified = qualify(prefix, name);
            if qualified == specifier {
                for child in children {
                    collect_leaves(child, &qualified, out);
                }
            } else {
                for child in children {
                    collect_matching(child, &qualified, specifier, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Failed, TestContext};

    fn noop(_: &mut TestContext) -> Result<(), Failed> {
        Ok(())
    }

    fn suite() -> TestNode {
        group(
            "api_basic",
            vec![group(
                "ApiBasicTest",
                vec![case("t1", noop), case("t2", noop), case("t3", noop)],
            )],
        )
    }

    fn specs(specs: &[&str]) -> Vec<String> {
        specs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_registry_discovers_nothing() {
        let registry = Registry::new(vec![]);
        assert!(registry.resolve(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_flatten_preserves_first_encountered_order() {
        let registry = Registry::new(vec![suite()]);
        let ids: Vec<_> = registry
            .resolve(&[])
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "api_basic.ApiBasicTest.t1",
                "api_basic.ApiBasicTest.t2",
                "api_basic.ApiBasicTest.t3",
            ]
        );
    }

    #[test]
    fn test_flatten_arbitrary_depth() {
        let deep = group(
            "a",
            vec![group(
                "b",
                vec![group("c", vec![group("d", vec![case("leaf", noop)])])],
            )],
        );
        let registry = Registry::new(vec![deep]);
        let resolved = registry.resolve(&[]).unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "a.b.c.d.leaf");
    }

    #[test]
    fn test_flatten_deduplicates_repeated_registration() {
        // The same suite reachable under two ancestor groupings must come
        // out exactly once.
        let registry = Registry::new(vec![suite(), suite()]);
        let resolved = registry.resolve(&[]).unwrap();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn test_group_specifier_expands_to_all_leaves() {
        let registry = Registry::new(vec![suite()]);
        let resolved = registry
            .resolve(&specs(&["api_basic.ApiBasicTest"]))
            .unwrap();
        // All three, not a prefix of length one.
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].id, "api_basic.ApiBasicTest.t3");
    }

    #[test]
    fn test_module_specifier_expands_to_all_leaves() {
        let registry = Registry::new(vec![suite()]);
        let resolved = registry.resolve(&specs(&["api_basic"])).unwrap();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn test_leaf_specifier_resolves_single_test() {
        let registry = Registry::new(vec![suite()]);
        let resolved = registry
            .resolve(&specs(&["api_basic.ApiBasicTest.t2"]))
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "api_basic.ApiBasicTest.t2");
    }

    #[test]
    fn test_duplicates_across_specifiers_preserved() {
        let registry = Registry::new(vec![suite()]);
        let resolved = registry
            .resolve(&specs(&[
                "api_basic.ApiBasicTest.t1",
                "api_basic.ApiBasicTest.t1",
            ]))
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].id, resolved[1].id);
    }

    #[test]
    fn test_specifier_order_is_result_order() {
        let registry = Registry::new(vec![suite()]);
        let resolved = registry
            .resolve(&specs(&[
                "api_basic.ApiBasicTest.t3",
                "api_basic.ApiBasicTest.t1",
            ]))
            .unwrap();
        let ids: Vec<_> = resolved.into_iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec!["api_basic.ApiBasicTest.t3", "api_basic.ApiBasicTest.t1"]
        );
    }

    #[test]
    fn test_unmatched_specifier_fails() {
        let registry = Registry::new(vec![suite()]);
        let err = registry.resolve(&specs(&["nope"])).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}

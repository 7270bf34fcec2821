//! Integration tests for changeset queries.

mod common;

use std::path::Path;

use common::{build_fixture, fixture_dir, id, ids, TestWorkspace};
use monodeps_core::{query_changeset, query_downstream};
use pretty_assertions::assert_eq;

/// `//a` depends on `//b`; `//c` is unrelated.
fn abc_workspace() -> TestWorkspace {
    TestWorkspace::new()
        .package("a")
        .file("a/requirements.txt", "../b\n")
        .package("b")
        .file("b/requirements.txt", "")
        .package("c")
        .file("c/Cargo.toml", "[package]\nname = \"c\"\n")
}

#[test]
fn test_end_to_end_abc() {
    let ws = abc_workspace();
    let graph = ws.build();

    let result = query_changeset(&graph, ["b/requirements.txt"]);
    assert_eq!(result.affected, ids(&["//a:python", "//b:python"]));

    let result = query_changeset(&graph, ["c/main.rs"]);
    assert_eq!(result.affected, ids(&["//c:rust"]));
}

#[test]
fn test_reflexivity() {
    let graph = build_fixture("polyglot");

    for target in graph.targets() {
        let path = format!("{}/some_file.txt", target.id.package.as_str());
        let result = query_changeset(&graph, [path.as_str()]);
        assert!(
            result.affected.contains(&target.id),
            "{} missing from changeset of {}",
            target.id,
            path
        );
    }
}

#[test]
fn test_closure_completeness() {
    let graph = TestWorkspace::new()
        .package("a")
        .file("a/requirements.txt", "../b\n")
        .package("b")
        .file("b/requirements.txt", "../c\n")
        .package("c")
        .file("c/requirements.txt", "")
        .build();

    let result = query_changeset(&graph, ["c/module.py"]);
    assert_eq!(
        result.affected,
        ids(&["//a:python", "//b:python", "//c:python"])
    );
    assert_eq!(result.seeds, ids(&["//c:python"]));
    assert_eq!(result.dependents, ids(&["//a:python", "//b:python"]));
}

#[test]
fn test_path_outside_packages_is_excluded() {
    let ws = abc_workspace();
    let graph = ws.build();

    let result = query_changeset(&graph, ["README.md", "b/x.py"]);
    assert_eq!(result.unowned, vec!["README.md".to_string()]);
    assert_eq!(result.affected, ids(&["//a:python", "//b:python"]));
}

#[test]
fn test_absolute_paths() {
    let ws = abc_workspace();
    let graph = ws.build();

    let inside = ws.root().join("c").join("src").join("main.rs");
    let result = query_changeset(&graph, [inside.as_path()]);
    assert_eq!(result.affected, ids(&["//c:rust"]));

    let result = query_changeset(&graph, [Path::new("/somewhere/else/c/main.rs")]);
    assert!(result.affected.is_empty());
    assert_eq!(result.unowned.len(), 1);
}

#[test]
fn test_multiplicity_change_affects_both_targets() {
    let graph = build_fixture("polyglot");

    let result = query_changeset(&graph, ["libs/core/src/lib.rs"]);
    assert_eq!(
        result.affected,
        ids(&["//libs/core:rust", "//libs/core:python", "//apps/server:rust"])
    );
}

#[test]
fn test_fixture_python_change_does_not_cross_kinds() {
    let graph = build_fixture("polyglot");

    let result = query_changeset(&graph, ["packages/python/qsync_stream/pyproject.toml"]);
    assert_eq!(
        result.affected,
        ids(&[
            "//packages/python/qsync_stream:python",
            "//libs/core:python",
            "//packages/python/image_manager:python",
        ])
    );
}

#[test]
fn test_declared_dependency_propagates() {
    let graph = build_fixture("polyglot");

    let result = query_changeset(&graph, ["tools/scripts/release.sh"]);
    assert_eq!(
        result.affected,
        ids(&["//tools/scripts:generic", "//apps/server:rust"])
    );
    assert_eq!(
        result.affected_packages().into_iter().collect::<Vec<_>>(),
        vec!["//apps/server".to_string(), "//tools/scripts".to_string()]
    );
}

#[test]
fn test_fixture_unowned_docs() {
    let graph = build_fixture("polyglot");
    let docs = fixture_dir("polyglot").join("docs").join("README.md");

    let result = query_changeset(&graph, [docs.as_path()]);
    assert!(result.affected.is_empty());
    assert_eq!(result.unowned.len(), 1);
}

#[test]
fn test_query_downstream_single_target() {
    let graph = build_fixture("polyglot");

    assert_eq!(
        query_downstream(&graph, &id("//libs/core:rust")).unwrap(),
        ids(&["//apps/server:rust"])
    );
    assert!(query_downstream(&graph, &id("//libs/core:generic")).is_err());
}

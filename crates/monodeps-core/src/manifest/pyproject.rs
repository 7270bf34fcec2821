//! `pyproject.toml` parsing.
//!
//! Reads PEP 621 metadata (`[project]`) plus the path sources of the two
//! common tools that support them, uv and poetry.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::requirements::parse_requirement_line;
use super::{line_of_offset, DependencySpec, ParseError, ParsedManifest};

/// File name recognized by the Python inferrer alongside requirements files.
pub const PYPROJECT_MANIFEST: &str = "pyproject.toml";

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    project: Option<Project>,
    #[serde(default)]
    tool: Tool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Project {
    name: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Tool {
    uv: Option<Uv>,
    poetry: Option<Poetry>,
}

#[derive(Debug, Default, Deserialize)]
struct Uv {
    #[serde(default)]
    sources: BTreeMap<String, UvSource>,
}

#[derive(Debug, Deserialize)]
struct UvSource {
    path: Option<String>,
    #[serde(default)]
    workspace: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Poetry {
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, toml::Value>,
    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: BTreeMap<String, toml::Value>,
    #[serde(default)]
    group: BTreeMap<String, PoetryGroup>,
}

#[derive(Debug, Default, Deserialize)]
struct PoetryGroup {
    #[serde(default)]
    dependencies: BTreeMap<String, toml::Value>,
}

/// Parse a `pyproject.toml`, returning the project name and dependency specs.
pub fn parse_pyproject(contents: &str) -> Result<ParsedManifest, ParseError> {
    let pyproject: PyProject =
        toml::from_str(contents).map_err(|e| ParseError::from_toml(contents, &e))?;

    let mut parsed = ParsedManifest::default();

    if let Some(project) = &pyproject.project {
        parsed.name = project.name.clone();

        let requirements = project
            .dependencies
            .iter()
            .chain(project.optional_dependencies.values().flatten());
        for requirement in requirements {
            let line_no = line_of_requirement(contents, requirement);
            if let Some(spec) = parse_requirement_line(requirement, line_no)? {
                parsed.push(spec);
            }
        }
    }

    if let Some(uv) = &pyproject.tool.uv {
        for (name, source) in &uv.sources {
            if let Some(path) = &source.path {
                parsed.push(DependencySpec::path(path.clone()));
            } else if source.workspace {
                parsed.push(DependencySpec::name(super::normalize_python_name(name)));
            }
        }
    }

    if let Some(poetry) = &pyproject.tool.poetry {
        if parsed.name.is_none() {
            parsed.name = poetry.name.clone();
        }

        let tables = std::iter::once(&poetry.dependencies)
            .chain(std::iter::once(&poetry.dev_dependencies))
            .chain(poetry.group.values().map(|g| &g.dependencies));
        for (_, value) in tables.flatten() {
            if let Some(path) = value.get("path").and_then(|p| p.as_str()) {
                parsed.push(DependencySpec::path(path));
            }
        }
    }

    Ok(parsed)
}

/// Best-effort line of a requirement string inside the TOML source.
fn line_of_requirement(contents: &str, requirement: &str) -> usize {
    contents
        .find(requirement)
        .map(|offset| line_of_offset(contents, offset))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_pep621_project() {
        let contents = r#"
[project]
name = "image-manager"
dependencies = [
    "requests>=2.31",
    "qsync_stream @ file://../qsync_stream",
]

[project.optional-dependencies]
test = ["pytest"]
"#;
        let parsed = parse_pyproject(contents).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("image-manager"));
        assert_eq!(
            parsed.specs,
            vec![
                DependencySpec::name("requests"),
                DependencySpec::path("../qsync_stream"),
                DependencySpec::name("pytest"),
            ]
        );
    }

    #[test]
    fn test_parse_uv_sources() {
        let contents = r#"
[project]
name = "app"
dependencies = ["shared-lib", "Core_Utils"]

[tool.uv.sources]
shared-lib = { path = "../shared-lib", editable = true }
Core_Utils = { workspace = true }
httpx = { git = "https://github.com/encode/httpx" }
"#;
        let parsed = parse_pyproject(contents).unwrap();
        assert!(parsed.specs.contains(&DependencySpec::path("../shared-lib")));
        assert!(parsed.specs.contains(&DependencySpec::name("core-utils")));
        assert!(parsed.specs.contains(&DependencySpec::name("shared-lib")));
        assert!(!parsed.specs.iter().any(|s| s.raw.contains("httpx")));
    }

    #[test]
    fn test_parse_poetry_path_dependencies() {
        let contents = r#"
[tool.poetry]
name = "legacy"

[tool.poetry.dependencies]
python = "^3.11"
models = { path = "../models", develop = true }

[tool.poetry.group.dev.dependencies]
fixtures = { path = "../fixtures" }
"#;
        let parsed = parse_pyproject(contents).unwrap();
        assert_eq!(parsed.name.as_deref(), Some("legacy"));
        assert_eq!(
            parsed.specs,
            vec![
                DependencySpec::path("../models"),
                DependencySpec::path("../fixtures"),
            ]
        );
    }

    #[test]
    fn test_empty_pyproject() {
        let parsed = parse_pyproject("").unwrap();
        assert_eq!(parsed, ParsedManifest::default());
    }

    #[test]
    fn test_bad_requirement_string_reports_line() {
        let contents = "[project]\nname = \"x\"\ndependencies = [\n  \"ok\",\n  \"bad @\",\n]\n";
        let err = parse_pyproject(contents).unwrap_err();
        assert_eq!(err.line, 5);
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse_pyproject("[project]\nname = \"a\"\nname = \"b\"\n").unwrap_err();
        assert_eq!(err.line, 3);
    }
}

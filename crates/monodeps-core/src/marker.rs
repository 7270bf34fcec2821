//! Package boundary markers
//!
//! A directory is a package when it contains the marker file (`package.toml`
//! by default). The marker may be empty; when it has content it can declare
//! explicit dependencies and pin the Python manifest:
//!
//! ```toml
//! deps = ["//libs/proto", "//libs/core:rust"]
//!
//! [python]
//! manifest = "pyproject.toml"
//! ```

use serde::Deserialize;

use crate::manifest::{line_of_offset, ParseError};
use crate::target::TargetLabel;

/// Default marker file name.
pub const DEFAULT_MARKER: &str = "package.toml";

/// Parsed contents of a package marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageMarker {
    /// Explicit dependencies, validated against inferred targets
    #[serde(default)]
    pub deps: Vec<TargetLabel>,
    #[serde(default)]
    pub python: PythonMarker,
}

/// `[python]` section of a marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonMarker {
    /// Manifest file the Python inferrer must use
    pub manifest: Option<String>,
}

impl PackageMarker {
    /// Parse marker contents. Invalid TOML, unknown keys, malformed labels
    /// and a pinned manifest that is not a plain file name are errors.
    pub fn parse(contents: &str) -> Result<Self, ParseError> {
        let marker: Self =
            toml::from_str(contents).map_err(|e| ParseError::from_toml(contents, &e))?;

        if let Some(pin) = marker.python_manifest() {
            if !is_plain_file_name(pin) {
                let line = contents
                    .find("manifest")
                    .map_or(1, |offset| line_of_offset(contents, offset));
                return Err(ParseError::new(
                    line,
                    format!(
                        "python manifest '{}' must be a file name inside the package",
                        pin
                    ),
                ));
            }
        }

        Ok(marker)
    }

    /// Pinned Python manifest, if any.
    pub fn python_manifest(&self) -> Option<&str> {
        self.python.manifest.as_deref()
    }
}

/// A single path component that stays in its directory.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', ':'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{BuildKind, PackagePath, TargetId};

    #[test]
    fn test_empty_marker() {
        let marker = PackageMarker::parse("").unwrap();
        assert_eq!(marker, PackageMarker::default());
        assert!(marker.python_manifest().is_none());
    }

    #[test]
    fn test_marker_with_deps_and_pin() {
        let marker = PackageMarker::parse(
            r#"
deps = ["//libs/proto", "//libs/core:rust"]

[python]
manifest = "pyproject.toml"
"#,
        )
        .unwrap();

        assert_eq!(
            marker.deps,
            vec![
                TargetLabel::Package(PackagePath::new("libs/proto").unwrap()),
                TargetLabel::Target(TargetId::new(
                    PackagePath::new("libs/core").unwrap(),
                    BuildKind::Rust
                )),
            ]
        );
        assert_eq!(marker.python_manifest(), Some("pyproject.toml"));
    }

    #[test]
    fn test_invalid_label_is_error() {
        let err = PackageMarker::parse("deps = [\"libs/proto\"]\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_pin_must_stay_in_package() {
        for pin in [
            "../other/requirements.txt",
            "/etc/requirements.txt",
            "sub/pyproject.toml",
            "..",
            "",
            "C:\\\\reqs.txt",
        ] {
            let contents = format!("deps = []\n\n[python]\nmanifest = {:?}\n", pin);
            let err = PackageMarker::parse(&contents).unwrap_err();
            assert_eq!(err.line, 4, "pin {:?}", pin);
        }

        let marker =
            PackageMarker::parse("[python]\nmanifest = \"requirements-dev.txt\"\n").unwrap();
        assert_eq!(marker.python_manifest(), Some("requirements-dev.txt"));
    }

    #[test]
    fn test_unknown_key_is_error() {
        assert!(PackageMarker::parse("name = \"x\"\n").is_err());
        assert!(PackageMarker::parse("[python]\nversion = \"3.11\"\n").is_err());
    }
}

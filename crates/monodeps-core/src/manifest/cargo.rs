//! `Cargo.toml` parsing.
//!
//! Only local dependencies matter: `path = "..."` entries become path specs and
//! `workspace = true` entries become name specs resolved against declared crate
//! names. Registry and git dependencies are external and dropped here.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{DependencySpec, ParseError, ParsedManifest};

/// File name recognized by the Cargo inferrer.
pub const CARGO_MANIFEST: &str = "Cargo.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CargoToml {
    package: Option<CargoPackage>,
    #[serde(flatten)]
    tables: DependencyTables,
    #[serde(default)]
    target: BTreeMap<String, DependencyTables>,
}

#[derive(Debug, Deserialize)]
struct CargoPackage {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DependencyTables {
    #[serde(default)]
    dependencies: BTreeMap<String, CargoDependency>,
    #[serde(default, alias = "dev_dependencies")]
    dev_dependencies: BTreeMap<String, CargoDependency>,
    #[serde(default, alias = "build_dependencies")]
    build_dependencies: BTreeMap<String, CargoDependency>,
}

impl DependencyTables {
    fn iter(&self) -> impl Iterator<Item = (&String, &CargoDependency)> {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .chain(self.build_dependencies.iter())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CargoDependency {
    /// `serde = "1.0"`
    Simple(#[allow(dead_code)] String),
    /// `core = { path = "../core" }`, `core = { workspace = true }`
    Detailed(DetailedDependency),
}

#[derive(Debug, Deserialize)]
struct DetailedDependency {
    path: Option<String>,
    #[serde(default)]
    workspace: bool,
    /// Renamed dependency: the key is a local alias for this crate name
    package: Option<String>,
}

impl CargoDependency {
    fn to_spec(&self, key: &str) -> Option<DependencySpec> {
        match self {
            CargoDependency::Simple(_) => None,
            CargoDependency::Detailed(detail) => {
                if let Some(path) = &detail.path {
                    Some(DependencySpec::path(path.clone()))
                } else if detail.workspace {
                    let name = detail.package.as_deref().unwrap_or(key);
                    Some(DependencySpec::name(name))
                } else {
                    None
                }
            }
        }
    }
}

/// Parse a `Cargo.toml`, returning its crate name and local dependency specs.
///
/// Covers `[dependencies]`, `[dev-dependencies]`, `[build-dependencies]` and
/// the same tables under `[target.'cfg(..)']`.
pub fn parse_cargo_toml(contents: &str) -> Result<ParsedManifest, ParseError> {
    let cargo: CargoToml =
        toml::from_str(contents).map_err(|e| ParseError::from_toml(contents, &e))?;

    let mut parsed = ParsedManifest {
        name: cargo.package.and_then(|p| p.name),
        specs: Vec::new(),
    };

    let platform_tables = cargo.target.values().flat_map(|t| t.iter());
    for (key, dep) in cargo.tables.iter().chain(platform_tables) {
        if let Some(spec) = dep.to_spec(key) {
            parsed.push(spec);
        }
    }

    Ok(parsed)
}

//! Target Resolver
//!
//! Bidirectional mapping between filesystem paths and target identifiers,
//! plus resolution of raw dependency specs into target ids.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::manifest::{normalize_python_name, DependencySpec, SpecForm};
use crate::target::{BuildKind, PackagePath, Target, TargetId, TargetLabel};

/// Errors produced while resolving paths, specs or labels.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown target: {0}")]
    UnknownTarget(TargetId),

    #[error("'{0}' does not match any inferred target")]
    UnknownLabel(String),

    #[error("absolute dependency path '{0}' is not allowed")]
    AbsolutePath(String),

    #[error("dependency path '{0}' escapes the workspace")]
    EscapesWorkspace(String),
}

/// Path and name indexes over the inferred targets of one workspace.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    root: PathBuf,
    /// Package -> its targets, sorted by kind
    packages: BTreeMap<PackagePath, Vec<TargetId>>,
    /// (kind, declared name) -> targets, names normalized per kind
    names: HashMap<(BuildKind, String), Vec<TargetId>>,
}

impl TargetResolver {
    pub fn new<'a>(root: &Path, targets: impl IntoIterator<Item = &'a Target>) -> Self {
        let mut packages: BTreeMap<PackagePath, Vec<TargetId>> = BTreeMap::new();
        let mut names: HashMap<(BuildKind, String), Vec<TargetId>> = HashMap::new();

        for target in targets {
            packages
                .entry(target.id.package.clone())
                .or_default()
                .push(target.id.clone());

            if let Some(name) = &target.name {
                names
                    .entry((target.kind(), normalize_name(target.kind(), name)))
                    .or_default()
                    .push(target.id.clone());
            }
        }

        for ids in packages.values_mut() {
            ids.sort();
        }
        for ids in names.values_mut() {
            ids.sort();
        }

        Self {
            root: root.to_path_buf(),
            packages,
            names,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every package with its targets, in path order.
    pub fn packages(&self) -> impl Iterator<Item = (&PackagePath, &[TargetId])> {
        self.packages.iter().map(|(p, ids)| (p, ids.as_slice()))
    }

    /// Targets of exactly this package (no ancestor lookup).
    pub fn targets_of(&self, package: &PackagePath) -> &[TargetId] {
        self.packages.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Targets owning `path`: those of the nearest enclosing package.
    ///
    /// Relative paths are taken relative to the workspace root; absolute paths
    /// must lie below it. Unowned paths yield an empty slice.
    pub fn path_to_targets(&self, path: &Path) -> &[TargetId] {
        let Some(package) = self.relative_package_path(path) else {
            return &[];
        };

        let mut candidate = Some(package);
        while let Some(current) = candidate {
            if let Some(ids) = self.packages.get(&current) {
                return ids;
            }
            candidate = current.parent();
        }
        &[]
    }

    fn relative_package_path(&self, path: &Path) -> Option<PackagePath> {
        if !path.is_absolute() {
            return PackagePath::from_relative(path);
        }
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return PackagePath::from_relative(rel);
        }
        // The root is canonical; the input may go through a symlink
        let canonical = path.canonicalize().ok()?;
        PackagePath::from_relative(canonical.strip_prefix(&self.root).ok()?)
    }

    /// Absolute directory of an inferred target.
    pub fn target_to_path(&self, id: &TargetId) -> Result<PathBuf, ResolveError> {
        if !self.targets_of(&id.package).contains(id) {
            return Err(ResolveError::UnknownTarget(id.clone()));
        }
        Ok(id.package.to_host_path(&self.root))
    }

    /// Resolve a manifest spec declared by `from`.
    ///
    /// `Ok(vec![])` means the dependency names nothing in the workspace (an external
    /// dependency). Absolute or escaping paths are errors the caller reports
    /// as warnings.
    pub fn resolve_spec(
        &self,
        from: &TargetId,
        spec: &DependencySpec,
    ) -> Result<Vec<TargetId>, ResolveError> {
        match spec.form {
            SpecForm::Path => self.resolve_path_spec(from, &spec.raw),
            SpecForm::Name => {
                let key = (from.kind, normalize_name(from.kind, &spec.raw));
                Ok(self.names.get(&key).cloned().unwrap_or_default())
            }
        }
    }

    fn resolve_path_spec(&self, from: &TargetId, raw: &str) -> Result<Vec<TargetId>, ResolveError> {
        if raw.starts_with('/') || Path::new(raw).is_absolute() {
            return Err(ResolveError::AbsolutePath(raw.to_string()));
        }
        let package = from
            .package
            .join_relative(raw)
            .ok_or_else(|| ResolveError::EscapesWorkspace(raw.to_string()))?;

        let Some(ids) = self.packages.get(&package) else {
            debug!("{}: path '{}' is not a package", from, raw);
            return Ok(Vec::new());
        };

        match ids.iter().find(|id| id.kind == from.kind) {
            Some(same_kind) => Ok(vec![same_kind.clone()]),
            None => Ok(ids.clone()),
        }
    }

    /// Resolve a label from a package marker; it must name inferred targets.
    pub fn resolve_declared(&self, label: &TargetLabel) -> Result<Vec<TargetId>, ResolveError> {
        let unknown = || ResolveError::UnknownLabel(label.to_string());
        match label {
            TargetLabel::Package(package) => {
                let ids = self.packages.get(package).ok_or_else(unknown)?;
                Ok(ids.clone())
            }
            TargetLabel::Target(id) => {
                if self.targets_of(&id.package).contains(id) {
                    Ok(vec![id.clone()])
                } else {
                    Err(unknown())
                }
            }
        }
    }

    /// Parse user input as a target id, accepting a bare package label when
    /// the package has exactly one target.
    pub fn parse_target(&self, input: &str) -> Result<TargetId, ResolveError> {
        let label: TargetLabel = input
            .parse()
            .map_err(|_| ResolveError::UnknownLabel(input.to_string()))?;
        let ids = self.resolve_declared(&label)?;
        match ids.as_slice() {
            [single] => Ok(single.clone()),
            _ => Err(ResolveError::UnknownLabel(format!(
                "{} (package has {} targets, add :kind)",
                input,
                ids.len()
            ))),
        }
    }
}

fn normalize_name(kind: BuildKind, name: &str) -> String {
    match kind {
        BuildKind::Python => normalize_python_name(name),
        _ => name.to_string(),
    }
}

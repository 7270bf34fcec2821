//! Workspace Scanner
//!
//! Finds package boundaries under a workspace root and reads the files each
//! inferrer needs into a [`PackageListing`].
//!
//! Walking honours `.gitignore` (optional), `.monodepsignore` and glob
//! excludes. Hidden entries are skipped, except a marker file whose own name
//! is hidden. Unreadable paths are logged and skipped. Reading is parallel
//! across packages; each package only touches its own listing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::infer::Inferrer;
use crate::manifest::ParseError;
use crate::marker::{PackageMarker, DEFAULT_MARKER};
use crate::target::PackagePath;

/// Ignore file honoured in addition to `.gitignore`.
pub const IGNORE_FILE: &str = ".monodepsignore";

/// Errors while walking or reading the workspace.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("workspace root does not exist: {0}")]
    RootNotFound(PathBuf),

    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("path is not valid UTF-8 or escapes the workspace: {0}")]
    InvalidPath(PathBuf),
}

impl ScanError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

// ============================================================================
// Scan Configuration
// ============================================================================

/// Configuration for the workspace scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Package boundary marker file name
    pub marker: String,
    /// Glob patterns (relative to the root) excluded from the walk
    pub exclude: Vec<String>,
    /// Honour `.gitignore` files
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            exclude: vec![
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/__pycache__/**".to_string(),
                "**/.venv/**".to_string(),
                "**/venv/**".to_string(),
            ],
            respect_gitignore: true,
        }
    }
}

// ============================================================================
// Package Listing
// ============================================================================

/// Everything inference needs to know about one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageListing {
    pub path: PackagePath,
    /// Parsed marker (default when the marker is empty or malformed)
    pub marker: PackageMarker,
    /// Set when the marker could not be parsed
    pub marker_error: Option<ParseError>,
    /// Contents of the manifest files that exist, keyed by file name
    pub files: BTreeMap<String, String>,
}

impl PackageListing {
    pub fn new(path: PackagePath) -> Self {
        Self {
            path,
            marker: PackageMarker::default(),
            marker_error: None,
            files: BTreeMap::new(),
        }
    }

    pub fn with_marker(mut self, marker: PackageMarker) -> Self {
        self.marker = marker;
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(name.into(), contents.into());
        self
    }

    /// Contents of a manifest file, if it exists.
    pub fn file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }
}

// ============================================================================
// Workspace Scanner
// ============================================================================

/// Walks a workspace and produces package listings.
pub struct WorkspaceScanner {
    root: PathBuf,
    config: ScanConfig,
    excludes: GlobSet,
}

impl WorkspaceScanner {
    /// Create a scanner for `root`. The root must exist.
    pub fn new(root: &Path, config: ScanConfig) -> Result<Self> {
        let root = root
            .canonicalize()
            .map_err(|_| ScanError::RootNotFound(root.to_path_buf()))?;
        let excludes = build_exclude_glob_set(&config.exclude)?;
        Ok(Self {
            root,
            config,
            excludes,
        })
    }

    /// Canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find every directory holding the marker file, sorted by path.
    pub fn discover_packages(&self) -> Result<Vec<PackagePath>> {
        info!("Discovering packages under {:?}", self.root);

        let root = self.root.clone();
        let excludes = self.excludes.clone();
        let marker = self.config.marker.clone();
        let walker = WalkBuilder::new(&self.root)
            .follow_links(false)
            .hidden(false)
            .git_ignore(self.config.respect_gitignore)
            .git_global(false)
            .git_exclude(self.config.respect_gitignore)
            .require_git(false)
            .parents(false)
            .add_custom_ignore_filename(IGNORE_FILE)
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if name.starts_with('.') && (is_dir || name != marker.as_str()) {
                    return false;
                }
                match entry.path().strip_prefix(&root) {
                    Ok(rel) => !excludes.is_match(rel),
                    Err(_) => true,
                }
            })
            .build();

        let mut packages = BTreeSet::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    continue;
                }
            };
            let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
            if !is_file || entry.file_name().to_str() != Some(self.config.marker.as_str()) {
                continue;
            }

            let dir = entry.path().parent().unwrap_or(&self.root);
            let rel = dir
                .strip_prefix(&self.root)
                .map_err(|_| ScanError::InvalidPath(dir.to_path_buf()))?;
            let package = PackagePath::from_relative(rel)
                .ok_or_else(|| ScanError::InvalidPath(dir.to_path_buf()))?;

            debug!("Found package {}", package);
            packages.insert(package);
        }

        info!("Discovered {} packages", packages.len());
        Ok(packages.into_iter().collect())
    }

    /// Read the marker and every manifest the inferrers ask for.
    pub fn read_listing(
        &self,
        package: &PackagePath,
        inferrers: &[Box<dyn Inferrer>],
    ) -> Result<PackageListing> {
        let dir = package.to_host_path(&self.root);
        let mut listing = PackageListing::new(package.clone());

        let marker_path = dir.join(&self.config.marker);
        let marker_contents =
            fs::read_to_string(&marker_path).map_err(|e| ScanError::io(&marker_path, e))?;
        match PackageMarker::parse(&marker_contents) {
            Ok(marker) => listing.marker = marker,
            Err(e) => {
                debug!("Malformed marker in {}: {}", package, e);
                listing.marker_error = Some(e);
            }
        }

        let names: BTreeSet<String> = inferrers
            .iter()
            .flat_map(|inferrer| inferrer.manifest_names(&listing.marker))
            .collect();

        for name in names {
            let path = dir.join(&name);
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    listing.files.insert(name, contents);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) if path.is_dir() => {
                    debug!("Skipping directory named like a manifest: {:?} ({})", path, e);
                }
                Err(e) => return Err(ScanError::io(&path, e)),
            }
        }

        Ok(listing)
    }

    /// Discover all packages and read their listings in parallel.
    ///
    /// Listings come back in package path order. The first read error (in
    /// that order) is returned.
    pub fn scan(&self, inferrers: &[Box<dyn Inferrer>]) -> Result<Vec<PackageListing>> {
        let packages = self.discover_packages()?;
        packages
            .par_iter()
            .map(|package| self.read_listing(package, inferrers))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}

/// Build a glob set from exclude patterns.
///
/// `dir/**` patterns also match `dir` itself so whole subtrees are pruned.
fn build_exclude_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ScanError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);

        if let Some(dir) = pattern.strip_suffix("/**") {
            if let Ok(glob) = Glob::new(dir) {
                builder.add(glob);
            }
        }
    }
    builder.build().map_err(|source| ScanError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::default_inferrers;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn package_strings(packages: &[PackagePath]) -> Vec<String> {
        packages.iter().map(|p| p.label()).collect()
    }

    #[test]
    fn test_discover_packages_sorted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b/package.toml", "");
        write(temp.path(), "a/package.toml", "");
        write(temp.path(), "a/nested/package.toml", "");
        write(temp.path(), "no_marker/Cargo.toml", "");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        let packages = scanner.discover_packages().unwrap();

        assert_eq!(package_strings(&packages), vec!["//a", "//a/nested", "//b"]);
    }

    #[test]
    fn test_root_package() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "package.toml", "");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        let packages = scanner.discover_packages().unwrap();

        assert_eq!(packages, vec![PackagePath::root()]);
    }

    #[test]
    fn test_excludes_and_ignore_files() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "keep/package.toml", "");
        write(temp.path(), "node_modules/dep/package.toml", "");
        write(temp.path(), "vendored/lib/package.toml", "");
        write(temp.path(), "generated/package.toml", "");
        write(temp.path(), ".monodepsignore", "generated/\n");

        let mut config = ScanConfig::default();
        config.exclude.push("vendored/**".to_string());

        let scanner = WorkspaceScanner::new(temp.path(), config).unwrap();
        let packages = scanner.discover_packages().unwrap();

        assert_eq!(package_strings(&packages), vec!["//keep"]);
    }

    #[test]
    fn test_gitignore_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "out/package.toml", "");
        write(temp.path(), ".gitignore", "out/\n");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        assert!(scanner.discover_packages().unwrap().is_empty());

        let config = ScanConfig {
            respect_gitignore: false,
            ..ScanConfig::default()
        };
        let scanner = WorkspaceScanner::new(temp.path(), config).unwrap();
        assert_eq!(scanner.discover_packages().unwrap().len(), 1);
    }

    #[test]
    fn test_custom_marker_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/BUILD.toml", "");
        write(temp.path(), "b/package.toml", "");

        let config = ScanConfig {
            marker: "BUILD.toml".to_string(),
            ..ScanConfig::default()
        };
        let scanner = WorkspaceScanner::new(temp.path(), config).unwrap();
        assert_eq!(
            package_strings(&scanner.discover_packages().unwrap()),
            vec!["//a"]
        );
    }

    #[test]
    fn test_hidden_marker_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/.pkg", "");
        write(temp.path(), ".cache/b/.pkg", "");

        let config = ScanConfig {
            marker: ".pkg".to_string(),
            ..ScanConfig::default()
        };
        let scanner = WorkspaceScanner::new(temp.path(), config).unwrap();
        assert_eq!(
            package_strings(&scanner.discover_packages().unwrap()),
            vec!["//a"]
        );
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/package.toml", "");
        write(temp.path(), ".tox/py311/package.toml", "");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        assert_eq!(
            package_strings(&scanner.discover_packages().unwrap()),
            vec!["//a"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        write(temp.path(), "a/package.toml", "");
        write(temp.path(), "locked/inner/package.toml", "");
        let locked = temp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        let result = scanner.discover_packages();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users can still read the locked directory.
        let packages = package_strings(&result.unwrap());
        assert_eq!(packages[0], "//a");
        assert!(packages.len() <= 2);
    }

    #[test]
    fn test_read_listing_reads_requested_manifests() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/package.toml", "deps = [\"//other\"]\n");
        write(temp.path(), "lib/Cargo.toml", "[package]\nname = \"lib\"\n");
        write(temp.path(), "lib/requirements.txt", "requests\n");
        write(temp.path(), "lib/README.md", "not read");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        let listings = scanner.scan(&default_inferrers()).unwrap();

        assert_eq!(listings.len(), 1);
        let listing = &listings[0];
        assert_eq!(listing.marker.deps.len(), 1);
        assert!(listing.marker_error.is_none());
        assert_eq!(
            listing.files.keys().cloned().collect::<Vec<_>>(),
            vec!["Cargo.toml".to_string(), "requirements.txt".to_string()]
        );
    }

    #[test]
    fn test_directory_named_like_manifest_is_skipped() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/package.toml", "");
        write(temp.path(), "lib/requirements.txt/README", "not a manifest");
        write(temp.path(), "lib/Cargo.toml", "[package]\nname = \"lib\"\n");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        let listings = scanner.scan(&default_inferrers()).unwrap();

        assert_eq!(
            listings[0].files.keys().cloned().collect::<Vec<_>>(),
            vec!["Cargo.toml".to_string()]
        );
    }

    #[test]
    fn test_malformed_marker_is_recorded() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/package.toml", "deps = [\n");

        let scanner = WorkspaceScanner::new(temp.path(), ScanConfig::default()).unwrap();
        let listings = scanner.scan(&default_inferrers()).unwrap();

        assert!(listings[0].marker_error.is_some());
    }

    #[test]
    fn test_missing_root() {
        let result = WorkspaceScanner::new(Path::new("/definitely/not/here"), ScanConfig::default());
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let config = ScanConfig {
            exclude: vec!["a/[".to_string()],
            ..ScanConfig::default()
        };
        assert!(matches!(
            WorkspaceScanner::new(temp.path(), config),
            Err(ScanError::InvalidPattern { .. })
        ));
    }
}

//! `requirements.txt` parsing.
//!
//! Line based, following pip's file format closely enough to find local
//! references:
//!
//! - `# comments` and blank lines are skipped, `\` continuations joined
//! - option lines (`-r`, `-c`, `--index-url`, ...) are ignored
//! - `-e <path>` / `--editable <path>` and lines starting with `./` or `../`
//!   are path specs
//! - `name @ file://<path>` is a path spec
//! - any other requirement is a name spec, PEP 503 normalized

use once_cell::sync::Lazy;
use regex::Regex;

use super::{normalize_python_name, DependencySpec, ParseError, ParsedManifest};

/// Default requirements file name.
pub const DEFAULT_REQUIREMENTS: &str = "requirements.txt";

const FILE_SCHEME: &str = "file://";

/// Distribution name, optional extras, then whatever follows.
static REQUIREMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[[^\]]*\])?\s*(.*)$").unwrap()
});

/// `(^|whitespace)#...` starts a comment; `#` inside a URL fragment does not.
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)#.*$").unwrap());

/// Parse a requirements file into dependency specs.
pub fn parse_requirements(contents: &str) -> Result<ParsedManifest, ParseError> {
    let mut parsed = ParsedManifest::default();

    for (line_no, line) in logical_lines(contents)? {
        let line = COMMENT.replace(&line, "");
        if let Some(spec) = parse_requirement_line(line.trim(), line_no)? {
            parsed.push(spec);
        }
    }

    Ok(parsed)
}

/// Join `\` continuations, yielding `(first physical line number, text)`.
fn logical_lines(contents: &str) -> Result<Vec<(usize, String)>, ParseError> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    let mut last_line = 0;

    for (idx, raw) in contents.lines().enumerate() {
        let line_no = idx + 1;
        last_line = line_no;

        let (text, continues) = match raw.trim_end().strip_suffix('\\') {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };

        let (start, mut joined) = pending.take().unwrap_or((line_no, String::new()));
        joined.push_str(text);

        if continues {
            pending = Some((start, joined));
        } else {
            lines.push((start, joined));
        }
    }

    if let Some((start, _)) = pending {
        return Err(ParseError::new(
            last_line.max(start),
            "line continuation at end of file",
        ));
    }

    Ok(lines)
}

/// Parse a single requirement (already stripped of comments).
///
/// Returns `Ok(None)` for lines that carry no dependency: blanks, options,
/// bare URLs. Also used for PEP 508 strings in `pyproject.toml`.
pub fn parse_requirement_line(
    line: &str,
    line_no: usize,
) -> Result<Option<DependencySpec>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(target) = editable_target(line) {
        if target.is_empty() {
            return Err(ParseError::new(line_no, "editable requirement without a path"));
        }
        return Ok(local_reference(target).map(DependencySpec::path));
    }

    if line.starts_with('-') {
        // -r, -c, --index-url and friends
        return Ok(None);
    }

    if line.starts_with("./") || line.starts_with("../") {
        return Ok(Some(DependencySpec::path(strip_extras(strip_fragment(line)))));
    }

    if line.starts_with(FILE_SCHEME) {
        return Ok(local_reference(line).map(DependencySpec::path));
    }

    if let Some((name, reference)) = direct_reference(line) {
        let reference = reference.split_whitespace().next().unwrap_or("");
        if reference.is_empty() {
            return Err(ParseError::new(
                line_no,
                format!("direct reference for '{}' is empty", name),
            ));
        }
        let name = requirement_name(name, line_no)?;
        if reference.starts_with(FILE_SCHEME) {
            return Ok(local_reference(reference).map(DependencySpec::path));
        }
        return Ok(Some(DependencySpec::name(name)));
    }

    if line.contains("://") {
        // bare URL or VCS reference without a name
        return Ok(None);
    }

    requirement_name(line, line_no).map(|name| Some(DependencySpec::name(name)))
}

/// Extract and normalize the distribution name at the start of a requirement.
fn requirement_name(requirement: &str, line_no: usize) -> Result<String, ParseError> {
    let invalid = || ParseError::new(line_no, format!("invalid requirement '{}'", requirement));

    let caps = REQUIREMENT_NAME.captures(requirement).ok_or_else(invalid)?;
    let rest = caps.get(2).map_or("", |m| m.as_str()).trim_start();
    let rest_ok = rest.is_empty()
        || rest.starts_with(['<', '>', '=', '!', '~', ';', '(', ',']);
    if !rest_ok {
        return Err(invalid());
    }

    Ok(normalize_python_name(&caps[1]))
}

/// Split `name @ reference`; an `@` inside a URL does not count.
fn direct_reference(line: &str) -> Option<(&str, &str)> {
    let at = line.find('@')?;
    match line.find("://") {
        Some(scheme) if scheme < at => None,
        _ => Some((line[..at].trim(), &line[at + 1..])),
    }
}

/// Target of `-e`/`--editable`, if the line is one.
fn editable_target(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("--editable")
        .or_else(|| line.strip_prefix("-e"))?;
    // `-eggs` is not an editable flag
    if !rest.is_empty() && !rest.starts_with([' ', '\t', '=']) {
        return None;
    }
    Some(rest.trim_start_matches(['=', ' ', '\t']).trim())
}

/// Local filesystem path of a reference, `None` for remote URLs.
fn local_reference(reference: &str) -> Option<String> {
    let reference = strip_extras(strip_fragment(reference));
    if let Some(path) = reference.strip_prefix(FILE_SCHEME) {
        let path = match path.strip_prefix("localhost/") {
            Some(local) => format!("/{}", local),
            None => path.to_string(),
        };
        return Some(path);
    }
    if reference.contains("://") {
        return None;
    }
    Some(reference.to_string())
}

fn strip_fragment(reference: &str) -> &str {
    reference.split('#').next().unwrap_or(reference).trim()
}

/// Drop a trailing `[extra,...]` selector from a path requirement.
fn strip_extras(reference: &str) -> &str {
    reference
        .strip_suffix(']')
        .and_then(|rest| rest.rfind('[').map(|open| rest[..open].trim_end()))
        .filter(|path| !path.is_empty())
        .unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn specs(contents: &str) -> Vec<DependencySpec> {
        parse_requirements(contents).unwrap().specs
    }

    #[test]
    fn test_local_references() {
        let req_str = r#"
            ./../serde
            ./../toml
            requests==1.2.3
            hello @ file://../anyhow
            he  @ file:///yours/truly
            ./../../../invalid_path
            ../../../invalid_path
        "#;

        assert_eq!(
            specs(req_str),
            vec![
                DependencySpec::path("./../serde"),
                DependencySpec::path("./../toml"),
                DependencySpec::name("requests"),
                DependencySpec::path("../anyhow"),
                DependencySpec::path("/yours/truly"),
                DependencySpec::path("./../../../invalid_path"),
                DependencySpec::path("../../../invalid_path"),
            ]
        );
    }

    #[test]
    fn test_names_are_normalized() {
        let req_str = "Django_Rest.Framework[extras]>=3.0 ; python_version > '3.8'\nnumpy\n";
        assert_eq!(
            specs(req_str),
            vec![
                DependencySpec::name("django-rest-framework"),
                DependencySpec::name("numpy"),
            ]
        );
    }

    #[test]
    fn test_comments_options_and_editables() {
        let req_str = r#"
# pinned for CI
-r base.txt
-c constraints.txt
--index-url https://pypi.example.com/simple
-e ../shared/utils
--editable=../shared/models
-e git+https://github.com/org/repo.git#egg=repo
https://example.com/pkg.whl
attrs  # inline comment
"#;
        assert_eq!(
            specs(req_str),
            vec![
                DependencySpec::path("../shared/utils"),
                DependencySpec::path("../shared/models"),
                DependencySpec::name("attrs"),
            ]
        );
    }

    #[test]
    fn test_path_extras_are_stripped() {
        let req_str = r#"
-e ../lib[dev]
--editable=../shared/models[test,docs]
./tools[cli]
pkg @ file:///opt/pkg[extra]
"#;
        assert_eq!(
            specs(req_str),
            vec![
                DependencySpec::path("../lib"),
                DependencySpec::path("../shared/models"),
                DependencySpec::path("./tools"),
                DependencySpec::path("/opt/pkg"),
            ]
        );
    }

    #[test]
    fn test_continuations() {
        let req_str = "requests \\\n    >=2.0\n../lib\n";
        assert_eq!(
            specs(req_str),
            vec![DependencySpec::name("requests"), DependencySpec::path("../lib")]
        );
    }

    #[test]
    fn test_dangling_continuation_is_error() {
        let err = parse_requirements("numpy\nrequests \\").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_empty_direct_reference_is_error() {
        let err = parse_requirements("numpy\n\nfoo @ \n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unparsable_name_is_error() {
        let err = parse_requirements("numpy\n%%%garbage\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse_requirements("requests 2.0\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_empty_file() {
        assert!(specs("").is_empty());
        assert!(specs("# only a comment\n\n").is_empty());
    }
}

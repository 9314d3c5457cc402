//! Discovery boundary
//!
//! The engine never touches the filesystem directly to find files: it asks a [`Discovery`]
//! implementation to turn a pattern into paths. [`FsDiscovery`] is the default, walking the
//! filesystem with `walkdir` and matching glob-like patterns.
//!
//! ## Pattern syntax
//!
//! - `*` matches any run of characters except `/`
//! - `**/` matches zero or more whole directories; a trailing `**` matches anything
//! - `?` matches one character except `/`
//! - `{a,b}` matches either alternative
//! - `[c]` matches the single character `c` literally, so `[*]` is a plain star
//!
//! Everything else is literal. [`GlobPattern::escape`] turns any string into a pattern matching
//! exactly that string.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors that occur while discovering files
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error("failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("discovery task failed: {0}")]
    Task(String),
}

/// Resolve a path pattern into an ordered list of files.
///
/// Implementations must be deterministic: the same pattern over an unchanged filesystem yields the
/// same list in the same order.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError>;
}

/// Filesystem discovery (default).
///
/// The walk runs on a blocking task so the engine's thread stays free while the disk is scanned.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDiscovery;

#[async_trait]
impl Discovery for FsDiscovery {
    async fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        let glob = GlobPattern::new(pattern)?;
        tokio::task::spawn_blocking(move || glob.walk())
            .await
            .map_err(|e| DiscoveryError::Task(e.to_string()))?
    }
}

/// A compiled glob-like pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    base: PathBuf,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, DiscoveryError> {
        let invalid = |message: &str| DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
        };

        let normalized = normalize(pattern);
        if normalized.is_empty() {
            return Err(invalid("pattern is empty"));
        }

        let source = translate(&normalized).ok_or_else(|| invalid("unbalanced braces or brackets"))?;
        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            base: literal_base(&normalized),
            regex,
        })
    }

    /// Pattern matching `literal` and nothing else.
    pub fn escape(literal: &str) -> String {
        let mut out = String::with_capacity(literal.len());
        for c in literal.chars() {
            if META.contains(&c) {
                out.push('[');
                out.push(c);
                out.push(']');
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Directory the walk starts from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn is_match(&self, path: &Path) -> bool {
        self.regex.is_match(&path.to_string_lossy().replace('\\', "/"))
    }

    /// Walk [`GlobPattern::base`] and collect matching files, sorted.
    ///
    /// A base that does not exist yields no files.
    pub fn walk(&self) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !self.base.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.base).sort_by_file_name() {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                root: self.base.clone(),
                source,
            })?;
            if entry.file_type().is_file() && self.is_match(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Forward slashes, no `.` segments, no empty segments (except a leading one for absolute paths).
fn normalize(pattern: &str) -> String {
    let unified = pattern.trim().replace('\\', "/");
    let absolute = unified.starts_with('/');
    let segments: Vec<&str> = unified.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let joined = segments.join("/");
    if absolute { format!("/{joined}") } else { joined }
}

const META: &[char] = &['*', '?', '{', '}', ',', '[', ']'];

/// Unescaped text of a segment, or `None` if it contains a wildcard or alternation.
fn literal_segment(segment: &str) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        match c {
            '[' => {
                let escaped = chars.next()?;
                if chars.next()? != ']' {
                    return None;
                }
                out.push(escaped);
            }
            '*' | '?' | '{' | '}' | ']' => return None,
            other => out.push(other),
        }
    }
    Some(out)
}

/// Longest leading run of literal directory segments, unescaped. The final segment is always
/// matched, never walked into.
fn literal_base(pattern: &str) -> PathBuf {
    let absolute = pattern.starts_with('/');
    let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let literal: Vec<String> = segments
        .iter()
        .take(segments.len().saturating_sub(1))
        .map_while(|s| literal_segment(s))
        .collect();

    match (absolute, literal.is_empty()) {
        (true, _) => PathBuf::from(format!("/{}", literal.join("/"))),
        (false, true) => PathBuf::from("."),
        (false, false) => PathBuf::from(literal.join("/")),
    }
}

/// Glob to anchored regex. `None` when braces or brackets are unbalanced.
fn translate(pattern: &str) -> Option<String> {
    let mut out = String::from("^");
    let mut depth = 0usize;
    let mut chars = pattern.chars().peekable();

    // A relative pattern is matched against walked paths, which start with the base as given.
    if !pattern.starts_with('/') && literal_base(pattern) == Path::new(".") {
        out.push_str(r"(?:\./)?");
    }

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:[^/]+/)*");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '{' => {
                depth += 1;
                out.push_str("(?:");
            }
            '}' if depth > 0 => {
                depth -= 1;
                out.push(')');
            }
            '}' => return None,
            ',' if depth > 0 => out.push('|'),
            '[' => {
                let escaped = chars.next()?;
                if chars.next()? != ']' {
                    return None;
                }
                out.push_str(&regex::escape(escaped.encode_utf8(&mut [0u8; 4])));
            }
            ']' => return None,
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    if depth != 0 {
        return None;
    }
    out.push('$');
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, path: &str) -> bool {
        GlobPattern::new(pattern).unwrap().is_match(Path::new(path))
    }

    #[test]
    fn test_star_stays_within_segment() {
        assert!(matches("/w/specs/*.json", "/w/specs/login.json"));
        assert!(!matches("/w/specs/*.json", "/w/specs/nested/login.json"));
        assert!(!matches("/w/specs/*.json", "/w/specs/login.yaml"));
    }

    #[test]
    fn test_double_star_spans_directories() {
        assert!(matches("/w/specs/**/*.json", "/w/specs/login.json"));
        assert!(matches("/w/specs/**/*.json", "/w/specs/a/b/c.json"));
        assert!(matches("/w/specs/**", "/w/specs/a/b/c.txt"));
        assert!(!matches("/w/specs/**/*.json", "/w/other/c.json"));
    }

    #[test]
    fn test_question_mark_and_braces() {
        assert!(matches("/w/spec?.json", "/w/spec1.json"));
        assert!(!matches("/w/spec?.json", "/w/spec12.json"));
        assert!(matches("/w/*.{json,yaml}", "/w/a.yaml"));
        assert!(!matches("/w/*.{json,yaml}", "/w/a.toml"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        assert!(matches("/w/a+b (1).json", "/w/a+b (1).json"));
        assert!(!matches("/w/a.json", "/w/axjson"));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(matches!(GlobPattern::new("/w/{a,b"), Err(DiscoveryError::Pattern { .. })));
        assert!(matches!(GlobPattern::new("/w/a}"), Err(DiscoveryError::Pattern { .. })));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(GlobPattern::new("  ").is_err());
        assert!(GlobPattern::new("./").is_err());
    }

    #[test]
    fn test_literal_base() {
        assert_eq!(GlobPattern::new("/w/specs/**/*.json").unwrap().base(), Path::new("/w/specs"));
        assert_eq!(GlobPattern::new("/w/./specs/a.json").unwrap().base(), Path::new("/w/specs"));
        assert_eq!(GlobPattern::new("specs/*.json").unwrap().base(), Path::new("specs"));
        assert_eq!(GlobPattern::new("*.json").unwrap().base(), Path::new("."));
        assert_eq!(GlobPattern::new("/*.json").unwrap().base(), Path::new("/"));
    }

    #[test]
    fn test_brackets_escape_one_character() {
        assert!(matches("/w/[*].json", "/w/*.json"));
        assert!(!matches("/w/[*].json", "/w/a.json"));
        assert!(matches("/w/a[{]b[}].json", "/w/a{b}.json"));
        assert!(GlobPattern::new("/w/[ab].json").is_err());
        assert!(GlobPattern::new("/w/a].json").is_err());
    }

    #[test]
    fn test_escaped_root_is_literal() {
        let root = GlobPattern::escape("/w/proj{v1},[x]*?");
        assert_eq!(root, "/w/proj[{]v1[}][,][[]x[]][*][?]");

        let glob = GlobPattern::new(&format!("{root}/specs/*.json")).unwrap();
        assert_eq!(glob.base(), Path::new("/w/proj{v1},[x]*?/specs"));
        assert!(glob.is_match(Path::new("/w/proj{v1},[x]*?/specs/a.json")));
        assert!(!glob.is_match(Path::new("/w/projv1/specs/a.json")));
    }

    #[test]
    fn test_missing_base_yields_nothing() {
        let glob = GlobPattern::new("/definitely/not/here/**/*.json").unwrap();
        assert!(glob.walk().unwrap().is_empty());
    }
}

//! Failure-detail sanitiser. Every detail leaving the engine passes through
//! here so a failure never echoes the caller's secrets or host paths.

use std::sync::LazyLock;

use regex::Regex;

/// Replacement for secret values.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Replacement for host file-system paths.
pub const PATH_MARKER: &str = "[PATH]";

/// Secrets shorter than this are left alone; masking every `"ab"` in a
/// message would destroy it without protecting anything.
pub const MIN_SECRET_LEN: usize = 4;

/// Redacts per-invocation secrets and host paths, then bounds the length.
#[derive(Debug, Clone)]
pub struct Redactor {
    exact_secrets: Vec<String>,
    max_len: usize,
}

impl Redactor {
    /// Create a redactor for the given secret values.
    pub fn new<I, S>(secrets: I, max_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exact_secrets: Vec<String> = secrets
            .into_iter()
            .map(Into::into)
            .filter(|s| s.chars().count() >= MIN_SECRET_LEN)
            .collect();
        // Longest first so a secret containing another is masked whole.
        exact_secrets.sort_by(|a, b| b.len().cmp(&a.len()));
        exact_secrets.dedup();
        Self {
            exact_secrets,
            max_len,
        }
    }

    /// Sanitise `text`.
    pub fn redact(&self, text: &str) -> String {
        let mut sanitized = text.to_owned();
        for secret in &self.exact_secrets {
            sanitized = sanitized.replace(secret.as_str(), REDACTION_MARKER);
        }
        for pattern in PATH_PATTERNS.iter() {
            sanitized = pattern.replace_all(&sanitized, PATH_MARKER).into_owned();
        }
        truncate(sanitized, self.max_len)
    }
}

fn truncate(text: String, max_len: usize) -> String {
    if max_len == 0 || text.chars().count() <= max_len {
        return text;
    }
    let mut out: String = text.chars().take(max_len.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Compiled once per process; every redactor shares them.
static PATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(path_patterns);

fn path_patterns() -> Vec<Regex> {
    let patterns = [
        // Unix absolute or home-relative paths with at least two segments.
        r"(?:~|\B)(?:/[A-Za-z0-9._@+\-]+){2,}/?",
        // Windows drive paths.
        r#"\b[A-Za-z]:\\[^\s'"]+"#,
    ];

    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}

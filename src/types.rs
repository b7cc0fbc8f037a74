//! Request and outcome types shared by the engine, the store and the invoker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The source text could not be parsed.
    LoadError,
    /// The entry point is missing, malformed, or returned a non-string.
    ContractError,
    /// A fault was raised while the injected code executed.
    RuntimeError,
    /// The invocation exceeded its wall-clock budget.
    Timeout,
    /// No algorithm is stored under the requested name.
    NotFound,
    /// The request itself is malformed (e.g. non-mapping payload).
    InvalidInput,
}

impl FailureKind {
    /// Stable identifier used in CLI and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoadError => "LoadError",
            Self::ContractError => "ContractError",
            Self::RuntimeError => "RuntimeError",
            Self::Timeout => "Timeout",
            Self::NotFound => "NotFound",
            Self::InvalidInput => "InvalidInput",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure returned instead of a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct Failure {
    /// What went wrong.
    pub kind: FailureKind,
    /// Sanitised, human-readable explanation.
    pub detail: String,
}

impl Failure {
    /// Build a failure of the given kind.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Shorthand for [`FailureKind::LoadError`].
    pub fn load(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::LoadError, detail)
    }

    /// Shorthand for [`FailureKind::ContractError`].
    pub fn contract(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ContractError, detail)
    }

    /// Shorthand for [`FailureKind::RuntimeError`].
    pub fn runtime(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::RuntimeError, detail)
    }

    /// Shorthand for [`FailureKind::NotFound`].
    pub fn not_found(name: &str) -> Self {
        Self::new(FailureKind::NotFound, format!("no algorithm named '{name}'"))
    }

    /// Shorthand for [`FailureKind::InvalidInput`].
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, detail)
    }
}

/// Outcome of an invocation: a digest string or a classified failure.
pub type InvocationResult = Result<String, Failure>;

/// Inputs handed to an algorithm's `generate` entry point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// JSON object with insertion order preserved.
    pub payload: serde_json::Map<String, serde_json::Value>,
    /// Secret passcode. May be empty.
    pub passcode: String,
    /// Optional API key; empty when absent.
    #[serde(default)]
    pub api_key: String,
    /// Optional caller-supplied ordering over payload keys.
    #[serde(default)]
    pub key_order: Option<Vec<String>>,
}

impl InvocationRequest {
    /// Build a request with an empty API key and no key order.
    pub fn new(
        payload: serde_json::Map<String, serde_json::Value>,
        passcode: impl Into<String>,
    ) -> Self {
        Self {
            payload,
            passcode: passcode.into(),
            api_key: String::new(),
            key_order: None,
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the key order.
    #[must_use]
    pub fn with_key_order(mut self, key_order: Vec<String>) -> Self {
        self.key_order = Some(key_order);
        self
    }

    /// Secret values that must never appear in failure details.
    pub fn secrets(&self) -> Vec<String> {
        vec![self.passcode.clone(), self.api_key.clone()]
    }
}

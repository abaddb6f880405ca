//! Failure taxonomy for controller steps
//!
//! Every step either merges a validated artifact into the session or fails
//! with one of these errors. A failure halts the session at the step that
//! produced it; nothing else in the record changes.

use crate::llm::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    /// A collaborator returned something that does not fit the artifact schema
    #[error("{artifact} failed validation: {}", violations.join("; "))]
    Validation {
        artifact: String,
        violations: Vec<String>,
    },

    /// The collaborator could not be reached, failed, or timed out
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// The record is not in a shape the step can work with
    #[error("state invariant violated: {message}")]
    StateInvariant { message: String },

    /// The step was aborted by the client
    #[error("step cancelled")]
    Cancelled,
}

impl StepError {
    pub fn validation(artifact: impl Into<String>, violations: Vec<String>) -> Self {
        Self::Validation {
            artifact: artifact.into(),
            violations,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::StateInvariant {
            message: message.into(),
        }
    }

    pub fn timeout(what: &str, limit: Duration) -> Self {
        Self::transport(format!("{what} timed out after {}s", limit.as_secs()))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<LlmError> for StepError {
    fn from(e: LlmError) -> Self {
        Self::transport(e.message)
    }
}

/// Accumulates schema violations for one artifact.
#[derive(Debug)]
pub struct Violations {
    artifact: &'static str,
    found: Vec<String>,
}

impl Violations {
    pub fn new(artifact: &'static str) -> Self {
        Self {
            artifact,
            found: Vec::new(),
        }
    }

    pub fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.found.push(message());
        }
    }

    pub fn non_empty(&mut self, field: &str, value: &str) {
        self.check(!value.trim().is_empty(), || format!("{field} must not be empty"));
    }

    pub fn count_in(&mut self, field: &str, len: usize, min: usize, max: usize) {
        self.check((min..=max).contains(&len), || {
            format!("{field} must have {min}-{max} items, got {len}")
        });
    }

    pub fn range_in<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        self.check(value >= min && value <= max, || {
            format!("{field} must be between {min} and {max}, got {value}")
        });
    }

    /// Prefix nested violations (e.g. `lessons[2].title`).
    pub fn nested(&mut self, prefix: &str, inner: Violations) {
        self.found
            .extend(inner.found.into_iter().map(|v| format!("{prefix}.{v}")));
    }

    pub fn finish(self) -> Result<(), StepError> {
        if self.found.is_empty() {
            Ok(())
        } else {
            Err(StepError::validation(self.artifact, self.found))
        }
    }
}

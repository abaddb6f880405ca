//! Teaching configuration
//!
//! Loaded once from the environment at startup and handed to every session.

use crate::llm::find_model;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PASSING_THRESHOLD: u32 = 70;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MODEL: &str = "claude-4.5-haiku";
const DEFAULT_STEP_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How DECIDE reaches its verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Both scores must reach the passing threshold.
    #[default]
    Threshold,
    /// The evaluator's progress assessment decides.
    Advisor,
}

impl FromStr for DecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" => Ok(Self::Threshold),
            "advisor" => Ok(Self::Advisor),
            other => Err(format!("expected threshold or advisor, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchDepth {
    Basic,
    #[default]
    Advanced,
}

impl SearchDepth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for SearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("expected basic or advanced, got {other}")),
        }
    }
}

/// Web search used by the planner and the lecturer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Search is disabled without a key.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub max_results: u32,
    pub depth: SearchDepth,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            max_results: 5,
            depth: SearchDepth::Advanced,
        }
    }
}

impl SearchConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeachingConfig {
    /// Score (0-100) both the quiz and the assignment must reach to advance.
    pub passing_threshold: u32,
    /// Total tries per lesson before the learner is moved on. `None` never forces.
    pub max_attempts: Option<u32>,
    pub decision_policy: DecisionPolicy,
    /// Model id from the registry used for every collaborator call.
    pub model_id: String,
    pub search: SearchConfig,
    /// Upper bound on a single collaborator call.
    #[serde(with = "duration_secs")]
    pub step_timeout: Duration,
    /// Upper bound on waiting for the learner. `None` waits indefinitely.
    #[serde(with = "opt_duration_secs")]
    pub learner_timeout: Option<Duration>,
}

impl Default for TeachingConfig {
    fn default() -> Self {
        Self {
            passing_threshold: DEFAULT_PASSING_THRESHOLD,
            max_attempts: Some(DEFAULT_MAX_ATTEMPTS),
            decision_policy: DecisionPolicy::Threshold,
            model_id: DEFAULT_MODEL.to_string(),
            search: SearchConfig::default(),
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            learner_timeout: None,
        }
    }
}

impl TeachingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parsed::<u32>(&lookup, "PROFESSOR_PASSING_THRESHOLD")? {
            config.passing_threshold = v;
        }
        if let Some(v) = parsed::<u32>(&lookup, "PROFESSOR_MAX_ATTEMPTS")? {
            config.max_attempts = (v > 0).then_some(v);
        }
        if let Some(v) = parsed::<DecisionPolicy>(&lookup, "PROFESSOR_DECISION_POLICY")? {
            config.decision_policy = v;
        }
        if let Some(v) = lookup("PROFESSOR_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model_id = v.trim().to_string();
        }
        if let Some(v) = parsed::<u64>(&lookup, "PROFESSOR_STEP_TIMEOUT_SECS")? {
            config.step_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parsed::<u64>(&lookup, "PROFESSOR_LEARNER_TIMEOUT_SECS")? {
            config.learner_timeout = (v > 0).then(|| Duration::from_secs(v));
        }

        config.search.api_key = lookup("TAVILY_API_KEY").filter(|k| !k.is_empty());
        if let Some(v) = parsed::<u32>(&lookup, "TAVILY_MAX_RESULTS")? {
            config.search.max_results = v;
        }
        if let Some(v) = parsed::<SearchDepth>(&lookup, "TAVILY_SEARCH_DEPTH")? {
            config.search.depth = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.passing_threshold > 100 {
            return Err(invalid(
                "PROFESSOR_PASSING_THRESHOLD",
                self.passing_threshold,
                "must be at most 100",
            ));
        }
        if find_model(&self.model_id).is_none() {
            return Err(invalid("PROFESSOR_MODEL", &self.model_id, "unknown model"));
        }
        if self.step_timeout.is_zero() {
            return Err(invalid("PROFESSOR_STEP_TIMEOUT_SECS", 0, "must be positive"));
        }
        if !(1..=20).contains(&self.search.max_results) {
            return Err(invalid(
                "TAVILY_MAX_RESULTS",
                self.search.max_results,
                "must be between 1 and 20",
            ));
        }
        Ok(())
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn invalid(var: &'static str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)] // serde `with` signature
    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|o| o.map(Duration::from_secs))
    }
}

//! src/core/types.rs
//!
//! Core type definitions for secret code detection
//!
//! This module defines the fundamental types used throughout the crate:
//! - `KeyEvent`: A raw keystroke as delivered by an input surface
//! - `CodeKind`: The four matcher variants (plain, span, each, combined)
//! - `TimingPolicy`: Resolved timing windows for a matcher
//! - `CodeConfig`: The construction contract for a matcher
//!
//! Everything a matcher compares is normalised through `KeyEvent::normalized`,
//! which folds to lowercase so that matching is case-insensitive.

use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};

/// Completion callback invoked exactly once per completed match
pub type CodeCallback = Arc<dyn Fn() + Send + Sync>;

/// A raw keystroke
///
/// Carries either a printable key (`key`) or a platform key code
/// (`key_code`), or both. The printable key wins when present and non-empty.
///
/// # Example
/// ```
/// use cheat_codes::core::KeyEvent;
///
/// assert_eq!(KeyEvent::from_char('Q').normalized(), "q");
/// assert_eq!(KeyEvent::from_key_code(65).normalized(), "a");
/// assert_eq!(KeyEvent::default().normalized(), "");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct KeyEvent {
    /// Printable key text (e.g., "a", "Enter")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Platform key code, decoded as a Unicode scalar when `key` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_code: Option<u32>,
}

impl KeyEvent {
    /// Event for a single typed character
    pub fn from_char(c: char) -> Self {
        Self {
            key: Some(c.to_string()),
            key_code: None,
        }
    }

    /// Event for a named or printable key
    pub fn from_key(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            key_code: None,
        }
    }

    /// Event carrying only a key code
    pub fn from_key_code(key_code: u32) -> Self {
        Self {
            key: None,
            key_code: Some(key_code),
        }
    }

    /// Normalised text of this keystroke
    ///
    /// Uses the key text if present, otherwise decodes the key code. A zero
    /// or undecodable key code yields an empty string, which never matches.
    pub fn normalized(&self) -> String {
        match self.key.as_deref() {
            Some(key) if !key.is_empty() => key.to_lowercase(),
            _ => self
                .key_code
                .filter(|code| *code != 0)
                .and_then(char::from_u32)
                .map(|c| c.to_lowercase().collect())
                .unwrap_or_default(),
        }
    }
}

/// Matcher variant
///
/// Mirrors the keyword used in the codes file:
/// - `Code`: no timing
/// - `CodeSpan`: one timer spanning the whole attempt
/// - `CodeEach`: timer renewed after every accepted character
/// - `CodeCombined`: per-character timer plus an overall timer
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum CodeKind {
    /// Plain matcher
    Code,
    /// Whole-sequence timeout
    CodeSpan,
    /// Per-character timeout
    CodeEach,
    /// Per-character and overall timeout
    CodeCombined,
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeKind::Code => write!(f, "code"),
            CodeKind::CodeSpan => write!(f, "code_span"),
            CodeKind::CodeEach => write!(f, "code_each"),
            CodeKind::CodeCombined => write!(f, "code_combined"),
        }
    }
}

/// Resolved timing windows of a matcher
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimingPolicy {
    /// Resets only on mismatch or completion
    Plain,
    /// One timer armed on the first advance, never renewed
    WholeSequence { timeout: Duration },
    /// Timer renewed after every advance
    PerCharacter { timeout: Duration },
    /// Per-character timer plus an overall timer armed at subscription
    Combined {
        per_character: Duration,
        overall: Duration,
    },
}

impl TimingPolicy {
    /// Resolves the policy from the two optional windows
    pub fn from_timeouts(per_character: Option<Duration>, overall: Option<Duration>) -> Self {
        match (per_character, overall) {
            (None, None) => TimingPolicy::Plain,
            (None, Some(timeout)) => TimingPolicy::WholeSequence { timeout },
            (Some(timeout), None) => TimingPolicy::PerCharacter { timeout },
            (Some(per_character), Some(overall)) => TimingPolicy::Combined {
                per_character,
                overall,
            },
        }
    }

    /// Window between consecutive accepted characters, if any
    pub fn per_character(&self) -> Option<Duration> {
        match self {
            TimingPolicy::PerCharacter { timeout } => Some(*timeout),
            TimingPolicy::Combined { per_character, .. } => Some(*per_character),
            _ => None,
        }
    }

    pub fn kind(&self) -> CodeKind {
        match self {
            TimingPolicy::Plain => CodeKind::Code,
            TimingPolicy::WholeSequence { .. } => CodeKind::CodeSpan,
            TimingPolicy::PerCharacter { .. } => CodeKind::CodeEach,
            TimingPolicy::Combined { .. } => CodeKind::CodeCombined,
        }
    }
}

/// Construction contract for a matcher
///
/// Timeouts are in milliseconds. Which of the two are set selects the
/// variant: neither is plain, `overall_timeout` alone spans the whole
/// sequence, `timeout_per_character` alone is per-character, both together
/// are combined.
///
/// # Example
/// ```
/// use cheat_codes::core::{CodeConfig, CodeKind};
///
/// let config = CodeConfig::new("Open").with_timeout_per_character(500);
/// assert_eq!(config.kind(), CodeKind::CodeEach);
/// assert_eq!(config.normalized_code(), "open");
/// assert_eq!(config.to_string(), "code_each = Open, 500");
/// ```
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CodeConfig {
    /// Target sequence as written by the user
    pub code: String,

    /// Maximum gap between consecutive correct characters (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_per_character: Option<u64>,

    /// Maximum duration of the whole sequence (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_timeout: Option<u64>,
}

impl CodeConfig {
    /// Plain configuration for `code`
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            timeout_per_character: None,
            overall_timeout: None,
        }
    }

    pub fn with_timeout_per_character(mut self, millis: u64) -> Self {
        self.timeout_per_character = Some(millis);
        self
    }

    pub fn with_overall_timeout(mut self, millis: u64) -> Self {
        self.overall_timeout = Some(millis);
        self
    }

    /// Target sequence folded to lowercase
    pub fn normalized_code(&self) -> String {
        self.code.to_lowercase()
    }

    pub fn policy(&self) -> TimingPolicy {
        TimingPolicy::from_timeouts(
            self.timeout_per_character.map(Duration::from_millis),
            self.overall_timeout.map(Duration::from_millis),
        )
    }

    pub fn kind(&self) -> CodeKind {
        self.policy().kind()
    }
}

impl fmt::Display for CodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.kind(), self.code)?;

        if let Some(per_character) = self.timeout_per_character {
            write!(f, ", {}", per_character)?;
        }
        if let Some(overall) = self.overall_timeout {
            write!(f, ", {}", overall)?;
        }

        Ok(())
    }
}

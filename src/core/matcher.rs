// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! src/core/matcher.rs
//!
//! Incremental sequence matcher
//!
//! `SequenceMatcher` consumes one normalised keystroke at a time and keeps
//! the longest prefix of its target sequence matched by the most recent run
//! of correct input. On completion it invokes its callback exactly once and
//! returns to `Idle`.
//!
//! # Timers
//! Timers are plain deadlines owned by the matcher. Cancelling a timer is
//! clearing its field and replacing one is overwriting it, so at most one
//! timer of each kind is ever outstanding and a stale timer cannot reset a
//! later attempt. The caller supplies the current instant and drives expiry
//! through `poll_timers`, using `next_deadline` to know when to wake up.

use std::time::Instant;
use tracing::{debug, trace};

use crate::core::types::{CodeCallback, CodeConfig, KeyEvent, TimingPolicy};
use crate::core::validator::{validate_config, ValidationError};

/// Matcher state
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatcherState {
    /// No progress
    Idle,
    /// Progress is a non-empty proper prefix of the target
    Matching,
}

/// Result of feeding one keystroke
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MatchOutcome {
    /// The matcher is not observing; input was dropped
    Ignored,
    /// Progress grew to `matched`
    Advanced { matched: String },
    /// The full target was typed and the callback ran
    Completed,
    /// The keystroke broke the prefix and progress was cleared
    Disqualified,
}

/// Kind of timer that expired
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerKind {
    PerCharacter,
    WholeSequence,
    Overall,
}

/// Secret code state machine
///
/// With both timeouts set, the overall window restarts from every reset,
/// including its own expiry, so an idle matcher keeps opening fresh windows.
///
/// # Example
/// ```
/// use cheat_codes::core::{CodeConfig, MatchOutcome, SequenceMatcher};
/// use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};
/// use std::time::Instant;
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = hits.clone();
/// let mut matcher = SequenceMatcher::new(
///     &CodeConfig::new("open"),
///     Arc::new(move || { counter.fetch_add(1, Ordering::SeqCst); }),
/// )?;
///
/// let now = Instant::now();
/// matcher.start(now);
/// for c in "opxopen".chars() {
///     matcher.on_character(&c.to_string(), now);
/// }
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// # Ok::<(), cheat_codes::core::ValidationError>(())
/// ```
pub struct SequenceMatcher {
    /// Lowercase target sequence
    target: String,

    /// Longest matched prefix of `target`
    progress: String,

    policy: TimingPolicy,
    callback: CodeCallback,

    /// Deadline renewed on every advance
    per_character: Option<Instant>,

    /// Whole-sequence deadline, or the combined variant's overall deadline
    sequence: Option<Instant>,

    observing: bool,
}

impl SequenceMatcher {
    /// Builds a matcher from a validated configuration
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an empty or oversized code or an
    /// out-of-range timeout.
    pub fn new(config: &CodeConfig, callback: CodeCallback) -> Result<Self, ValidationError> {
        validate_config(config)?;

        Ok(Self {
            target: config.normalized_code(),
            progress: String::new(),
            policy: config.policy(),
            callback,
            per_character: None,
            sequence: None,
            observing: false,
        })
    }

    /// Begins observing with empty progress
    ///
    /// For the combined variant this arms the overall timer.
    pub fn start(&mut self, now: Instant) {
        self.observing = true;
        self.reset(now);
        debug!(code = %self.target, policy = ?self.policy, "matcher started");
    }

    /// Stops observing and cancels every timer
    ///
    /// Later keystrokes and timer polls are ignored until `start` is called
    /// again.
    pub fn stop(&mut self) {
        self.observing = false;
        self.progress.clear();
        self.per_character = None;
        self.sequence = None;
        debug!(code = %self.target, "matcher stopped");
    }

    /// Feeds a raw keystroke arriving at `now`
    ///
    /// Timers due at or before `now` expire first.
    pub fn on_key(&mut self, event: &KeyEvent, now: Instant) -> MatchOutcome {
        self.on_character(&event.normalized(), now)
    }

    /// Applies the match rule to one normalised keystroke arriving at `now`
    ///
    /// Timers due at or before `now` expire first. A keystroke that breaks
    /// the prefix is discarded entirely, even when it equals the first
    /// character of the target.
    pub fn on_character(&mut self, typed: &str, now: Instant) -> MatchOutcome {
        if !self.observing {
            return MatchOutcome::Ignored;
        }

        self.poll_timers(now);

        let mut candidate = String::with_capacity(self.progress.len() + typed.len());
        candidate.push_str(&self.progress);
        candidate.push_str(typed);

        if typed.is_empty() || !self.target.starts_with(&candidate) {
            debug!(code = %self.target, typed, progress = %self.progress, "disqualified");
            self.reset(now);
            return MatchOutcome::Disqualified;
        }

        if candidate.len() == self.target.len() {
            debug!(code = %self.target, "code completed");
            (self.callback)();
            self.reset(now);
            return MatchOutcome::Completed;
        }

        if let Some(timeout) = self.policy.per_character() {
            self.per_character = Some(now + timeout);
        }
        if let TimingPolicy::WholeSequence { timeout } = self.policy {
            if self.sequence.is_none() {
                self.sequence = Some(now + timeout);
            }
        }

        trace!(code = %self.target, matched = %candidate, "advanced");
        self.progress = candidate;
        MatchOutcome::Advanced {
            matched: self.progress.clone(),
        }
    }

    /// Expires timers due at or before `now`
    ///
    /// Returns the kind of the earliest timer that expired, if any.
    pub fn poll_timers(&mut self, now: Instant) -> Option<TimerKind> {
        if !self.observing {
            return None;
        }

        let per_character = self.per_character.filter(|deadline| *deadline <= now);
        let sequence = self.sequence.filter(|deadline| *deadline <= now);

        let expired = match (per_character, sequence) {
            (None, None) => return None,
            (Some(a), Some(b)) if b < a => self.sequence_timer_kind(),
            (Some(_), _) => TimerKind::PerCharacter,
            (None, Some(_)) => self.sequence_timer_kind(),
        };

        debug!(code = %self.target, timer = ?expired, progress = %self.progress, "timer expired");
        self.reset(now);
        Some(expired)
    }

    /// Earliest outstanding deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.per_character, self.sequence) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Lowercase target sequence
    pub fn code(&self) -> &str {
        &self.target
    }

    pub fn progress(&self) -> &str {
        &self.progress
    }

    pub fn policy(&self) -> TimingPolicy {
        self.policy
    }

    pub fn state(&self) -> MatcherState {
        if self.progress.is_empty() {
            MatcherState::Idle
        } else {
            MatcherState::Matching
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Returns to `Idle`
    ///
    /// Clears progress and cancels the attempt's timers. The combined
    /// variant's overall window restarts from `now`, as a fresh subscription
    /// would.
    fn reset(&mut self, now: Instant) {
        self.progress.clear();
        self.per_character = None;
        self.sequence = match self.policy {
            TimingPolicy::Combined { overall, .. } => Some(now + overall),
            _ => None,
        };
    }

    fn sequence_timer_kind(&self) -> TimerKind {
        match self.policy {
            TimingPolicy::Combined { .. } => TimerKind::Overall,
            _ => TimerKind::WholeSequence,
        }
    }
}

impl std::fmt::Debug for SequenceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceMatcher")
            .field("target", &self.target)
            .field("progress", &self.progress)
            .field("policy", &self.policy)
            .field("per_character", &self.per_character)
            .field("sequence", &self.sequence)
            .field("observing", &self.observing)
            .finish_non_exhaustive()
    }
}

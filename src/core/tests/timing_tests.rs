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

//! Timing window tests
//!
//! Drives the matcher with explicit instants:
//! - Per-character window renewed on every advance
//! - Whole-sequence window armed once per attempt
//! - Combined windows, whichever expires first
//! - No stale deadline survives a reset

use crate::core::{
    matcher::{MatchOutcome, SequenceMatcher, TimerKind},
    types::CodeConfig,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn counting_matcher(config: CodeConfig, t0: Instant) -> (SequenceMatcher, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let mut matcher = SequenceMatcher::new(
        &config,
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();
    matcher.start(t0);
    (matcher, hits)
}

/// Helper: feeds `(offset_ms, char)` pairs, polling timers at each instant
fn type_at(matcher: &mut SequenceMatcher, t0: Instant, keys: &[(u64, char)]) {
    for (offset, c) in keys {
        let now = t0 + ms(*offset);
        matcher.poll_timers(now);
        matcher.on_character(&c.to_string(), now);
    }
}

// ============================================================================
// Per-character timeout
// ============================================================================

#[test]
fn test_cat_gap_beyond_window_resets_before_next_key() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("cat").with_timeout_per_character(500), t0);

    matcher.on_character("c", t0);
    assert_eq!(matcher.next_deadline(), Some(t0 + ms(500)));

    assert_eq!(matcher.poll_timers(t0 + ms(600)), Some(TimerKind::PerCharacter));
    assert_eq!(matcher.progress(), "", "Progress resets before 'a' arrives");
    assert_eq!(matcher.on_character("a", t0 + ms(600)), MatchOutcome::Disqualified);

    type_at(&mut matcher, t0, &[(700, 'c'), (1000, 'a'), (1400, 't')]);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "Typing within the window completes");
}

#[test]
fn test_per_character_gap_below_window_preserves_progress() {
    let t0 = Instant::now();
    let (mut matcher, _hits) =
        counting_matcher(CodeConfig::new("cat").with_timeout_per_character(500), t0);

    matcher.on_character("c", t0);
    assert_eq!(matcher.poll_timers(t0 + ms(499)), None);
    assert_eq!(matcher.progress(), "c");
}

#[test]
fn test_per_character_gap_equal_to_window_resets() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("cat").with_timeout_per_character(500), t0);

    type_at(&mut matcher, t0, &[(0, 'c'), (500, 'a'), (600, 't')]);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_per_character_window_renews_on_advance() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("abcd").with_timeout_per_character(300), t0);

    // Total 750 ms, every gap 250 ms
    type_at(&mut matcher, t0, &[(0, 'a'), (250, 'b'), (500, 'c'), (750, 'd')]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_on_key_expires_due_timer_first() {
    let t0 = Instant::now();
    let (mut matcher, _hits) =
        counting_matcher(CodeConfig::new("cat").with_timeout_per_character(500), t0);

    matcher.on_character("c", t0);
    // No explicit poll: the late keystroke still sees an expired window
    let outcome = matcher.on_key(&crate::core::KeyEvent::from_char('a'), t0 + ms(800));
    assert_eq!(outcome, MatchOutcome::Disqualified);
}

#[test]
fn test_late_character_without_poll_is_rejected() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("cat").with_timeout_per_character(500), t0);

    matcher.on_character("c", t0);
    assert_eq!(matcher.on_character("a", t0 + ms(600)), MatchOutcome::Disqualified);
    assert_eq!(matcher.on_character("t", t0 + ms(700)), MatchOutcome::Disqualified);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_late_character_after_span_without_poll_is_rejected() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("abc").with_overall_timeout(1000), t0);

    matcher.on_character("a", t0);
    matcher.on_character("b", t0 + ms(400));
    assert_eq!(matcher.on_character("c", t0 + ms(1000)), MatchOutcome::Disqualified);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Whole-sequence timeout
// ============================================================================

#[test]
fn test_whole_sequence_clears_old_progress_despite_small_gaps() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("abcde").with_overall_timeout(1000), t0);

    type_at(
        &mut matcher,
        t0,
        &[(0, 'a'), (300, 'b'), (600, 'c'), (900, 'd'), (1200, 'e')],
    );
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_whole_sequence_armed_on_first_advance_not_renewed() {
    let t0 = Instant::now();
    let (mut matcher, _hits) =
        counting_matcher(CodeConfig::new("abc").with_overall_timeout(1000), t0);
    assert_eq!(matcher.next_deadline(), None, "Span timer waits for the first advance");

    matcher.on_character("a", t0 + ms(100));
    matcher.on_character("b", t0 + ms(800));
    assert_eq!(matcher.next_deadline(), Some(t0 + ms(1100)));

    assert_eq!(matcher.poll_timers(t0 + ms(1100)), Some(TimerKind::WholeSequence));
    assert_eq!(matcher.progress(), "");
    assert_eq!(matcher.next_deadline(), None);
}

#[test]
fn test_whole_sequence_completes_within_window() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("abc").with_overall_timeout(1000), t0);

    type_at(&mut matcher, t0, &[(0, 'a'), (500, 'b'), (999, 'c')]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Combined timeout
// ============================================================================

#[test]
fn test_combined_overall_window_armed_at_start() {
    let t0 = Instant::now();
    let (matcher, _hits) = counting_matcher(
        CodeConfig::new("open")
            .with_timeout_per_character(500)
            .with_overall_timeout(2000),
        t0,
    );

    assert_eq!(matcher.next_deadline(), Some(t0 + ms(2000)));
}

#[test]
fn test_combined_overall_expires_first() {
    let t0 = Instant::now();
    let (mut matcher, hits) = counting_matcher(
        CodeConfig::new("open")
            .with_timeout_per_character(500)
            .with_overall_timeout(1000),
        t0,
    );

    // Gaps of 400 ms keep the per-character window alive, but "n" lands
    // after the overall window measured from start
    type_at(&mut matcher, t0, &[(0, 'o'), (400, 'p'), (800, 'e')]);
    assert_eq!(matcher.poll_timers(t0 + ms(1000)), Some(TimerKind::Overall));
    assert_eq!(matcher.on_character("n", t0 + ms(1100)), MatchOutcome::Disqualified);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_combined_per_character_expires_first() {
    let t0 = Instant::now();
    let (mut matcher, hits) = counting_matcher(
        CodeConfig::new("open")
            .with_timeout_per_character(200)
            .with_overall_timeout(5000),
        t0,
    );

    matcher.on_character("o", t0);
    assert_eq!(matcher.poll_timers(t0 + ms(250)), Some(TimerKind::PerCharacter));
    type_at(&mut matcher, t0, &[(300, 'p'), (400, 'e'), (500, 'n')]);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_combined_overall_not_renewed_by_progress() {
    let t0 = Instant::now();
    let (mut matcher, _hits) = counting_matcher(
        CodeConfig::new("open")
            .with_timeout_per_character(500)
            .with_overall_timeout(3000),
        t0,
    );

    matcher.on_character("o", t0 + ms(2800));
    // Per-character deadline would be 3300; the overall one is still 3000
    assert_eq!(matcher.next_deadline(), Some(t0 + ms(3000)));
}

#[test]
fn test_combined_window_restarts_after_completion() {
    let t0 = Instant::now();
    let (mut matcher, hits) = counting_matcher(
        CodeConfig::new("ok")
            .with_timeout_per_character(500)
            .with_overall_timeout(1000),
        t0,
    );

    type_at(&mut matcher, t0, &[(900, 'o'), (950, 'k')]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(matcher.next_deadline(), Some(t0 + ms(1950)));

    type_at(&mut matcher, t0, &[(1500, 'o'), (1600, 'k')]);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_combined_idle_window_reopens_after_expiry() {
    let t0 = Instant::now();
    let (mut matcher, _hits) = counting_matcher(
        CodeConfig::new("ok")
            .with_timeout_per_character(500)
            .with_overall_timeout(1000),
        t0,
    );

    assert_eq!(matcher.poll_timers(t0 + ms(1000)), Some(TimerKind::Overall));
    assert_eq!(matcher.next_deadline(), Some(t0 + ms(2000)));
    assert_eq!(matcher.poll_timers(t0 + ms(2000)), Some(TimerKind::Overall));
    assert_eq!(matcher.next_deadline(), Some(t0 + ms(3000)));
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_stale_per_character_timer_does_not_reset_later_attempt() {
    let t0 = Instant::now();
    let (mut matcher, hits) =
        counting_matcher(CodeConfig::new("abc").with_timeout_per_character(500), t0);

    // Attempt 1 armed a deadline at 500, then was disqualified at 100
    type_at(&mut matcher, t0, &[(0, 'a'), (100, 'x')]);
    assert_eq!(matcher.next_deadline(), None, "Disqualification cancels the timer");

    // Attempt 2 spans the old deadline
    type_at(&mut matcher, t0, &[(450, 'a'), (550, 'b'), (650, 'c')]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_completion_cancels_timers() {
    let t0 = Instant::now();
    let (mut matcher, _hits) =
        counting_matcher(CodeConfig::new("ab").with_overall_timeout(1000), t0);

    type_at(&mut matcher, t0, &[(0, 'a'), (10, 'b')]);
    assert_eq!(matcher.next_deadline(), None);
    assert_eq!(matcher.poll_timers(t0 + ms(5000)), None);
}

#[test]
fn test_stop_cancels_every_timer() {
    let t0 = Instant::now();
    let (mut matcher, _hits) = counting_matcher(
        CodeConfig::new("abc")
            .with_timeout_per_character(100)
            .with_overall_timeout(1000),
        t0,
    );

    matcher.on_character("a", t0);
    matcher.stop();
    assert_eq!(matcher.next_deadline(), None);
    assert_eq!(matcher.poll_timers(t0 + ms(5000)), None);
}

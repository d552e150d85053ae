//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Matcher tests (match rule, disqualification, re-arming)
//! - Timing tests (per-character, whole-sequence, combined windows)
//! - Property tests over arbitrary input streams
//! - Parser, validator and type tests

#[cfg(test)]
mod timing_tests;

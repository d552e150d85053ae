//! Input module tests
//!
//! - Bus tests (fan-out, detach, pruning, stdin pump)
//! - Subscription tests on a paused clock (timing windows end to end,
//!   teardown, reconfiguration)

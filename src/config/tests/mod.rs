//! Config module tests
//!
//! - Codes file loading, validation and duplicate detection
//! - Atomic sample file initialisation
//! - File watcher change detection

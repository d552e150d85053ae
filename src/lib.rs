// Copyright 2025 bakri (tidynest@proton.me)
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

//! Cheat Codes
//!
//! Detects secret key sequences ("cheat codes") typed into a stream of
//! keystrokes, with optional timing windows.
//!
//! # Features
//!
//! - **Incremental matching:** One keystroke at a time, case-insensitive
//! - **Timing windows:** Per-character, whole-sequence, or both
//! - **Shared input:** Any number of codes observe one keystroke stream
//! - **Codes file:** Declarative code definitions with variables
//! - **Live reload:** Edits to the codes file are picked up while listening
//!
//! # Architecture
//!
//! - **`core`:** Matcher state machine, types, validation, codes file parser
//! - **`input`:** Keystroke bus and per-code subscriptions (Tokio tasks)
//! - **`detector`:** Many codes behind one bus and one match handler
//! - **`config`:** Codes file location, loading, init and watching
//!
//! # Examples
//!
//! ## Matching without a runtime
//!
//! ```
//! use cheat_codes::core::{CodeConfig, SequenceMatcher};
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! let mut matcher = SequenceMatcher::new(
//!     &CodeConfig::new("iddqd"),
//!     Arc::new(|| println!("god mode")),
//! )?;
//! matcher.start(Instant::now());
//! for c in "iddqd".chars() {
//!     matcher.on_character(&c.to_string(), Instant::now());
//! }
//! # Ok::<(), cheat_codes::core::ValidationError>(())
//! ```
//!
//! ## Watching a codes file
//!
//! ```no_run
//! use cheat_codes::config::CodeBook;
//! use cheat_codes::detector::CodeDetector;
//! use cheat_codes::core::{CodeConfig, KeyEvent};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let book = CodeBook::new("~/.config/cheat-codes/codes.conf".into())?;
//! let mut detector = CodeDetector::new(Arc::new(|code: &CodeConfig| {
//!     println!("{} matched", code.code)
//! }));
//! detector.load(book.load()?.into_iter().map(|entry| entry.config))?;
//!
//! detector.dispatch(KeyEvent::from_char('i'));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod detector;
pub mod input;

// Re-export commonly used types for convenience
pub use core::{CodeConfig, CodeKind, KeyEvent, SequenceMatcher, TimingPolicy};
pub use detector::CodeDetector;
pub use input::{InputBus, Subscription};

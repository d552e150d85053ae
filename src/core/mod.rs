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

//! src/core/mod.rs
//!
//! Core matching logic
//!
//! This module contains the data structures and algorithms for secret code
//! detection:
//! - Type definitions for keystrokes and code configurations
//! - The incremental sequence matcher and its timing policies
//! - Construction-time validation
//! - Codes file parsing
//!
//! Nothing here touches a runtime, a file, or an input device: time is
//! passed in explicitly, so every behaviour is unit-testable.

pub mod matcher;
pub mod parser;
pub mod types;
pub mod validator;

pub use matcher::{MatchOutcome, MatcherState, SequenceMatcher, TimerKind};
pub use types::*;
pub use validator::{validate_config, ValidationError};

#[cfg(test)]
mod tests;

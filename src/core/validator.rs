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

//! Construction-time validation of code configurations
//!
//! Misconfigured matchers fail here, when they are created, instead of
//! silently never firing at the first keystroke. Checks:
//! - The target sequence is non-empty, bounded, and printable
//! - Timeouts are positive and bounded so deadlines never overflow

use thiserror::Error;
use crate::core::types::CodeConfig;

/// Longest accepted target sequence, in characters
pub const MAX_CODE_LENGTH: usize = 256;

/// Longest accepted timeout (24 hours), in milliseconds
pub const MAX_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Target sequence has no characters
    #[error("Code must not be empty")]
    EmptyCode,

    /// Target sequence exceeds the length limit
    #[error("Code too long: {0} characters (max 256)")]
    CodeTooLong(usize),

    /// Target sequence contains a control character
    #[error("Invalid character {0:?} in code")]
    InvalidCharacter(char),

    /// Timeout of zero milliseconds
    #[error("{0} must be a positive number of milliseconds")]
    ZeroTimeout(&'static str),

    /// Timeout beyond the supported range
    #[error("{name} too long: {millis} ms (max 86400000)")]
    TimeoutTooLong { name: &'static str, millis: u64 },
}

/// Validates the target sequence
pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() {
        return Err(ValidationError::EmptyCode);
    }

    let length = code.chars().count();
    if length > MAX_CODE_LENGTH {
        return Err(ValidationError::CodeTooLong(length));
    }

    if let Some(c) = code.chars().find(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacter(c));
    }

    Ok(())
}

/// Validates one timeout window
///
/// `name` is the configuration field, used in the error message.
pub fn validate_timeout(name: &'static str, millis: u64) -> Result<(), ValidationError> {
    if millis == 0 {
        return Err(ValidationError::ZeroTimeout(name));
    }

    if millis > MAX_TIMEOUT_MS {
        return Err(ValidationError::TimeoutTooLong { name, millis });
    }

    Ok(())
}

/// Validates a complete configuration before a matcher is built
pub fn validate_config(config: &CodeConfig) -> Result<(), ValidationError> {
    validate_code(&config.code)?;

    if let Some(millis) = config.timeout_per_character {
        validate_timeout("timeout_per_character", millis)?;
    }

    if let Some(millis) = config.overall_timeout {
        validate_timeout("overall_timeout", millis)?;
    }

    Ok(())
}

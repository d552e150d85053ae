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

//! src/core/parser.rs
//!
//! Codes file parser
//!
//! This module parses codes files into `CodeConfig`s. It handles:
//! - All four code kinds (code, code_span, code_each, code_combined)
//! - Variable substitution ($window)
//! - Comments and whitespace
//! - Line numbers for error reporting
//!
//! # Format
//! ```text
//! $window = 500
//! code          = iddqd
//! code_span     = xyzzy, 3000
//! code_each     = cat, $window
//! code_combined = open, $window, 5000
//! ```
//!
//! # Architecture
//! The parser uses nom combinators and performs two passes:
//! 1. First pass: Collect variable definitions
//! 2. Second pass: Parse code lines with variable substitution
//!
//! Parsing only structures data; range checks happen in validator.rs.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{char, digit1, space0},
    combinator::{eof, map, map_res},
    multi::many0,
    sequence::preceded,
    IResult, Parser,
};
use std::collections::HashMap;
use thiserror::Error;

use crate::core::types::{CodeConfig, CodeKind};

/// Parse errors with line number context
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Parse error on line {line}: {message}")]
    InvalidSyntax { line: usize, message: String },

    #[error("Undefined variable '${variable}' on line {line}")]
    UndefinedVariable { variable: String, line: usize },
}

/// A parsed code definition and the line it came from
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CodeEntry {
    /// 1-based line number
    pub line: usize,
    pub config: CodeConfig,
}

/// Parse a complete codes file
///
/// # Arguments
/// * `content` - The full file content
///
/// # Returns
/// Every code definition in file order, or the first `ParseError`
///
/// # Example
/// ```
/// use cheat_codes::core::parser::parse_codes_file;
///
/// let entries = parse_codes_file("$w = 400\ncode_each = cat, $w\n")?;
/// assert_eq!(entries[0].config.timeout_per_character, Some(400));
/// # Ok::<(), cheat_codes::core::parser::ParseError>(())
/// ```
pub fn parse_codes_file(content: &str) -> Result<Vec<CodeEntry>, ParseError> {
    let variables = collect_variables(content);
    let mut entries = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;

        let line_trimmed = line.trim();
        if line_trimmed.is_empty()
            || line_trimmed.starts_with('#')
            || line_trimmed.starts_with('$')
        {
            continue;
        }

        if !line_trimmed.starts_with("code") {
            return Err(ParseError::InvalidSyntax {
                line: line_num,
                message: format!("expected a code definition, found '{}'", line_trimmed),
            });
        }

        let substituted = substitute_variables(line_trimmed, &variables);
        if let Some(variable) = find_variable(&substituted) {
            return Err(ParseError::UndefinedVariable {
                variable,
                line: line_num,
            });
        }

        let (kind, code, timeouts) = match parse_code_line(&substituted) {
            Ok((_, parsed)) => parsed,
            Err(e) => {
                return Err(ParseError::InvalidSyntax {
                    line: line_num,
                    message: format!("{:?}", e),
                });
            }
        };

        let config = build_config(kind, code, &timeouts).map_err(|message| {
            ParseError::InvalidSyntax {
                line: line_num,
                message,
            }
        })?;

        entries.push(CodeEntry {
            line: line_num,
            config,
        });
    }

    Ok(entries)
}

/// Collect variable definitions
///
/// Format: `$name = value`. Later definitions override earlier ones.
pub fn collect_variables(contents: &str) -> HashMap<String, String> {
    let mut variables = HashMap::new();

    for line in contents.lines() {
        let line_trimmed = line.trim();

        if let Some(definition) = line_trimmed.strip_prefix('$') {
            if let Some((name, value)) = definition.split_once('=') {
                variables.insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    variables
}

/// Substitute variables in a line
///
/// Longer names are replaced first so `$win` never clobbers `$window`.
pub fn substitute_variables(line: &str, variables: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = variables.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut result = line.to_string();
    for name in names {
        let pattern = format!("${}", name);
        result = result.replace(&pattern, &variables[name]);
    }

    result
}

/// Parse a single code line
///
/// Format: KIND = SEQUENCE[, MILLIS[, MILLIS]]
///
/// Returns the kind, the raw sequence and the timeouts in order; arity is
/// checked separately.
pub fn parse_code_line(input: &str) -> IResult<&str, (CodeKind, &str, Vec<u64>)> {
    let (input, kind) = parse_code_kind(input)?;
    let (input, _) = (space0, char('='), space0).parse(input)?;
    let (input, code) = parse_sequence(input)?;
    let (input, timeouts) = many0(preceded((space0, char(','), space0), parse_millis)).parse(input)?;
    let (input, _) = (space0, eof).parse(input)?;

    Ok((input, (kind, code, timeouts)))
}

/// Parse the code kind keyword
///
/// Longer keywords are tried first so `code_each` is never read as `code`.
pub fn parse_code_kind(input: &str) -> IResult<&str, CodeKind> {
    map(
        alt((
            tag("code_combined"),
            tag("code_each"),
            tag("code_span"),
            tag("code"),
        )),
        |s: &str| match s {
            "code_combined" => CodeKind::CodeCombined,
            "code_each" => CodeKind::CodeEach,
            "code_span" => CodeKind::CodeSpan,
            _ => CodeKind::Code,
        },
    )
    .parse(input)
}

/// Parse the target sequence: everything up to the next comma, trimmed
pub fn parse_sequence(input: &str) -> IResult<&str, &str> {
    map(take_till1(|c: char| c == ','), str::trim_end).parse(input)
}

/// Parse a timeout in milliseconds
pub fn parse_millis(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>()).parse(input)
}

fn build_config(kind: CodeKind, code: &str, timeouts: &[u64]) -> Result<CodeConfig, String> {
    let config = CodeConfig::new(code);

    match (kind, timeouts) {
        (CodeKind::Code, []) => Ok(config),
        (CodeKind::CodeSpan, [overall]) => Ok(config.with_overall_timeout(*overall)),
        (CodeKind::CodeEach, [per_character]) => {
            Ok(config.with_timeout_per_character(*per_character))
        }
        (CodeKind::CodeCombined, [per_character, overall]) => Ok(config
            .with_timeout_per_character(*per_character)
            .with_overall_timeout(*overall)),
        (kind, timeouts) => Err(format!(
            "{} takes {} timeout(s), found {}",
            kind,
            expected_timeouts(kind),
            timeouts.len()
        )),
    }
}

fn expected_timeouts(kind: CodeKind) -> usize {
    match kind {
        CodeKind::Code => 0,
        CodeKind::CodeSpan | CodeKind::CodeEach => 1,
        CodeKind::CodeCombined => 2,
    }
}

/// First `$name` left in a line after substitution
fn find_variable(line: &str) -> Option<String> {
    let (_, rest) = line.split_once('$')?;
    let name: IResult<&str, &str> =
        take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(rest);

    Some(name.map(|(_, name)| name.to_string()).unwrap_or_default())
}

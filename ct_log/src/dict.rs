// Copyright 2025 The CTLog Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

//! Builds the tokenized-logging dictionary.
//!
//! For each module the builder scans the source file for invocations of the
//! `CTLOG_*` macros and records the invocation's last line number together
//! with its format string.  The firmware stamps `__LINE__` into each record,
//! so `(module index, line number)` is the key the translator later looks
//! up.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ct_macro::{find_invocations, MacroError, MacroInvocation};
use ct_module::Module;
use ct_token::{TokenKind, TokenizeError, Tokenizer};

/// The logging macros whose invocations carry a format string.
pub const MACRO_NAMES: [&str; 8] = [
    "CTLOG_ERROR",
    "CTLOG_VAR_ERROR",
    "CTLOG_INFO",
    "CTLOG_VAR_INFO",
    "CTLOG_DEBUG",
    "CTLOG_VAR_DEBUG",
    "CTLOG_WARN",
    "CTLOG_VAR_WARN",
];

/// One logging call site: the line the invocation ends on and its format
/// string (quotes stripped, escapes left as source-literal bytes).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Last source line of the invocation; what the firmware's `__LINE__`
    /// expands to.
    pub number: u32,

    /// The format string without its surrounding quotes.
    pub format_string: String,
}

/// A module together with its logging lines.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DictionaryModule {
    /// Position of this module in the name-sorted catalog.
    pub index: u32,

    /// The module name.
    pub name: String,

    /// Absolute path to the source file, with forward slashes.
    pub path: String,

    /// Logging lines in source order.
    pub lines: Vec<Line>,
}

/// The persisted dictionary artifact.
#[derive(Debug, Deserialize, Serialize)]
pub struct Dictionary {
    /// When the dictionary was generated.
    pub date: DateTime<Utc>,

    /// Modules in catalog order.
    pub modules: Vec<DictionaryModule>,
}

/// Error produced while building a dictionary.
#[derive(Debug)]
pub enum DictError {
    /// Tokenizing a source file failed.
    Tokenize(TokenizeError),

    /// Extracting a logging invocation failed.
    Macro(MacroError),

    /// A logging invocation's first argument was missing its quotes.
    UnquotedFormatString {
        /// Last line of the offending invocation.
        line: u32,
    },

    /// A module source file could not be opened or read.
    Io {
        /// The module path.
        path: String,
        /// The underlying error.
        source: io::Error,
    },
}

impl fmt::Display for DictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenize(err) => err.fmt(f),
            Self::Macro(err) => err.fmt(f),
            Self::UnquotedFormatString { line } => {
                write!(f, "format string on line {line} is missing surrounding quotes")
            }
            Self::Io { path, source } => write!(f, "{path}: {source}"),
        }
    }
}

impl std::error::Error for DictError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tokenize(err) => Some(err),
            Self::Macro(err) => Some(err),
            Self::UnquotedFormatString { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// Finds all tokenized logging lines in a C source, using the default
/// [`MACRO_NAMES`] set.
pub fn find_lines<R: Read>(source: R) -> Result<Vec<Line>, DictError> {
    find_lines_named(source, &MACRO_NAMES)
}

/// Finds all logging lines for a caller-supplied macro name set.
pub fn find_lines_named<R: Read>(source: R, names: &[&str]) -> Result<Vec<Line>, DictError> {
    let mut lines = Vec::new();

    let mut tokenizer = Tokenizer::new(source);
    while let Some(token) = tokenizer.next_token().map_err(DictError::Tokenize)? {
        if token.kind != TokenKind::Text {
            continue;
        }
        for invocation in find_invocations(&token, names).map_err(DictError::Macro)? {
            lines.push(Line {
                number: invocation.line_end,
                format_string: format_string_of(&invocation)?,
            });
        }
    }

    Ok(lines)
}

/// Validates and strips the quotes of an invocation's format string.
fn format_string_of(invocation: &MacroInvocation) -> Result<String, DictError> {
    invocation
        .args
        .first()
        .and_then(|raw| raw.strip_prefix('"'))
        .and_then(|raw| raw.strip_suffix('"'))
        .map(str::to_string)
        .ok_or(DictError::UnquotedFormatString {
            line: invocation.line_end,
        })
}

/// Builds the dictionary for a walked module catalog, preserving each
/// module's index, name, and path.
pub fn build_dictionary(modules: &[Module]) -> Result<Dictionary, DictError> {
    let mut dictionary_modules = Vec::with_capacity(modules.len());

    for module in modules {
        let file = File::open(&module.path).map_err(|source| DictError::Io {
            path: module.path.clone(),
            source,
        })?;
        dictionary_modules.push(DictionaryModule {
            index: module.index,
            name: module.name.clone(),
            path: module.path.clone(),
            lines: find_lines(file)?,
        });
    }

    Ok(Dictionary {
        date: Utc::now(),
        modules: dictionary_modules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
#include <stdbool.h>
#include <stdio.h>
#include "ctlog.h"

CMODULE_DEFINE( main );

int
main( void )
{
    ctlog_setEnabled( true );
    CTLOG_INFO( "Test" );
    CTLOG_VAR_INFO( "%d", 1, CTLOG_TYPE_UINT( 123 ) );              // CTLOG_TYPE_UINT
    CTLOG_VAR_INFO( "%d", 1, CTLOG_TYPE_INT( -123 ) );              // CTLOG_TYPE_INT
    CTLOG_VAR_INFO( "%s", 1, CTLOG_TYPE_STRING( "Hello World" ) );  // CTLOG_TYPE_STRING
    CTLOG_VAR_INFO( "%t", 1, CTLOG_TYPE_BOOL( true ) );             // CTLOG_TYPE_BOOL
    CTLOG_VAR_INFO( "%c", 1, CTLOG_TYPE_CHAR( 'J' ) );              // CTLOG_TYPE_CHAR
    return 0;
}
"#;

    #[test]
    fn finds_logging_lines_with_their_format_strings() {
        let lines = find_lines(SOURCE.as_bytes()).unwrap();
        assert_eq!(
            lines,
            vec![
                Line { number: 12, format_string: "Test".to_string() },
                Line { number: 13, format_string: "%d".to_string() },
                Line { number: 14, format_string: "%d".to_string() },
                Line { number: 15, format_string: "%s".to_string() },
                Line { number: 16, format_string: "%t".to_string() },
                Line { number: 17, format_string: "%c".to_string() },
            ],
        );
    }

    #[test]
    fn multi_line_invocations_record_their_last_line() {
        let source = "CTLOG_VAR_INFO(\n    \"%d %d\",\n    2,\n    CTLOG_TYPE_UINT( a ),\n    CTLOG_TYPE_UINT( b )\n);\n";
        let lines = find_lines(source.as_bytes()).unwrap();
        assert_eq!(
            lines,
            vec![Line { number: 6, format_string: "%d %d".to_string() }],
        );
    }

    #[test]
    fn commented_out_invocations_are_ignored() {
        let source = "// CTLOG_INFO( \"old\" );\n/* CTLOG_INFO( \"older\" ); */\nCTLOG_INFO( \"current\" );\n";
        let lines = find_lines(source.as_bytes()).unwrap();
        assert_eq!(
            lines,
            vec![Line { number: 3, format_string: "current".to_string() }],
        );
    }

    #[test]
    fn escapes_in_format_strings_stay_source_literal() {
        let lines = find_lines(r#"CTLOG_INFO( "tab\tand \"quote\"" );"#.as_bytes()).unwrap();
        assert_eq!(lines[0].format_string, r#"tab\tand \"quote\""#);
    }

    #[test]
    fn unquoted_format_string_is_an_error() {
        assert!(matches!(
            find_lines(b"CTLOG_INFO( fmt );".as_slice()),
            Err(DictError::UnquotedFormatString { line: 1 }),
        ));
        assert!(matches!(
            find_lines(b"CTLOG_INFO();".as_slice()),
            Err(DictError::UnquotedFormatString { line: 1 }),
        ));
    }

    #[test]
    fn custom_name_sets_are_honored() {
        let lines =
            find_lines_named(b"MY_LOG( \"only\" );\nCTLOG_INFO( \"skipped\" );\n".as_slice(), &["MY_LOG"])
                .unwrap();
        assert_eq!(
            lines,
            vec![Line { number: 1, format_string: "only".to_string() }],
        );
    }

    #[test]
    fn dictionary_json_uses_the_wire_field_names() {
        let dictionary = Dictionary {
            date: Utc::now(),
            modules: vec![DictionaryModule {
                index: 0,
                name: "main".to_string(),
                path: "/src/main.c".to_string(),
                lines: vec![Line { number: 12, format_string: "Test".to_string() }],
            }],
        };
        let json = serde_json::to_string(&dictionary).unwrap();
        assert!(json.contains("\"formatString\":\"Test\""));
        assert!(json.contains("\"number\":12"));

        let back: Dictionary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.modules, dictionary.modules);
    }
}

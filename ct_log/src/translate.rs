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

//! Renders decoded records through the dictionary.

use std::fmt;

use ct_format::{FormatString, Value};

use crate::dict::DictionaryModule;
use crate::record::{parse_record, Arg, Record, RecordError};

/// Error produced while translating a record.
#[derive(Debug)]
pub enum TranslateError {
    /// The record's module index is outside the dictionary.
    UnknownModule {
        /// The index the record carried.
        module_index: u32,
    },

    /// The module has no entry for the record's line number.
    UnknownLine {
        /// The record's module index.
        module_index: u32,
        /// The line number the record carried.
        line_number: u32,
    },

    /// The dictionary entry's format string failed to parse.
    BadFormatString {
        /// The record's module index.
        module_index: u32,
        /// The record's line number.
        line_number: u32,
        /// The parser's message.
        message: String,
    },

    /// A line looked like a framed record but failed to decode.
    Record(RecordError),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModule { module_index } => {
                write!(f, "could not find module {module_index}")
            }
            Self::UnknownLine {
                module_index,
                line_number,
            } => write!(f, "could not find line {line_number} in module {module_index}"),
            Self::BadFormatString {
                module_index,
                line_number,
                message,
            } => write!(
                f,
                "bad format string for line {line_number} in module {module_index}: {message}"
            ),
            Self::Record(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for TranslateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Record(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordError> for TranslateError {
    fn from(err: RecordError) -> Self {
        Self::Record(err)
    }
}

/// Maps decoded records to human-readable text via an immutable dictionary.
///
/// A translator owns its module table and is read-only after construction,
/// so one dictionary can back any number of translator instances.
pub struct Translator {
    modules: Vec<DictionaryModule>,
}

impl Translator {
    /// Creates a translator over a dictionary's modules.
    pub fn new(modules: Vec<DictionaryModule>) -> Self {
        Self { modules }
    }

    /// Renders one decoded record.
    pub fn translate(&self, record: &Record) -> Result<String, TranslateError> {
        let module = self
            .modules
            .get(record.module_index as usize)
            .ok_or(TranslateError::UnknownModule {
                module_index: record.module_index,
            })?;

        let line = module
            .lines
            .iter()
            .find(|line| line.number == record.line_number)
            .ok_or(TranslateError::UnknownLine {
                module_index: record.module_index,
                line_number: record.line_number,
            })?;

        let format_string = FormatString::parse(&line.format_string).map_err(|err| {
            TranslateError::BadFormatString {
                module_index: record.module_index,
                line_number: record.line_number,
                message: err.to_string(),
            }
        })?;

        let values: Vec<Value<'_>> = record.args.iter().map(value_of).collect();
        Ok(format_string.render(&values))
    }

    /// Translates one scanned line from either transport.
    ///
    /// The line is first tried as a JSON record, then as a framed ASCII
    /// record; a line matching neither comes back verbatim.
    pub fn translate_line(&self, line: &[u8]) -> Result<String, TranslateError> {
        if let Ok(record) = serde_json::from_slice::<Record>(line) {
            return self.translate(&record);
        }
        match parse_record(line)? {
            Some(record) => self.translate(&record),
            None => Ok(String::from_utf8_lossy(line).into_owned()),
        }
    }
}

/// Maps a decoded argument to the formatter's value shape.
fn value_of(arg: &Arg) -> Value<'_> {
    match arg {
        Arg::Bool(v) => Value::Bool(*v),
        Arg::Char(v) => Value::Char(*v),
        Arg::Int(v) => Value::Int(i64::from(*v)),
        Arg::String(v) => Value::Str(v),
        Arg::Uint(v) => Value::Uint(u64::from(*v)),
    }
}

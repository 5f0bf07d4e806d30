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

//! Decodes one tokenized-log record into its typed form.
//!
//! Records arrive on two transports: the framed ASCII form
//! (`$TL00,<seq>,<lvl>,<module>,<line>,<nargs>,...`) parsed by
//! [`parse_record`], and a JSON object form handled through serde.  Both
//! decode to the same [`Record`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scan::{has_record, UnsupportedVersion, MAX_SUPPORTED_VERSION};

/// A log record's severity level, one character on the wire.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Level {
    /// `D`
    #[serde(rename = "D")]
    Debug,

    /// `E`
    #[serde(rename = "E")]
    Error,

    /// `I`
    #[serde(rename = "I")]
    Info,

    /// `W`
    #[serde(rename = "W")]
    Warn,
}

impl Level {
    /// The level's wire character.
    pub fn as_char(self) -> char {
        match self {
            Self::Debug => 'D',
            Self::Error => 'E',
            Self::Info => 'I',
            Self::Warn => 'W',
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = u8;

    fn try_from(b: u8) -> Result<Self, u8> {
        match b {
            b'D' => Ok(Self::Debug),
            b'E' => Ok(Self::Error),
            b'I' => Ok(Self::Info),
            b'W' => Ok(Self::Warn),
            other => Err(other),
        }
    }
}

/// The wire type code of an argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArgType {
    /// `0`
    Bool,
    /// `1`
    Char,
    /// `2`
    Int,
    /// `3`
    String,
    /// `4`
    Uint,
}

impl ArgType {
    /// The type's wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Char => 1,
            Self::Int => 2,
            Self::String => 3,
            Self::Uint => 4,
        }
    }

    /// Maps a wire code back to a type.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Bool),
            1 => Some(Self::Char),
            2 => Some(Self::Int),
            3 => Some(Self::String),
            4 => Some(Self::Uint),
            _ => None,
        }
    }
}

/// One typed argument of a record.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A boolean.
    Bool(bool),
    /// A single byte, `%c` on the firmware side.
    Char(u8),
    /// A signed 32-bit integer.
    Int(i32),
    /// A string.
    String(String),
    /// An unsigned 32-bit integer.
    Uint(u32),
}

impl Arg {
    /// The argument's wire type.
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::Bool(_) => ArgType::Bool,
            Self::Char(_) => ArgType::Char,
            Self::Int(_) => ArgType::Int,
            Self::String(_) => ArgType::String,
            Self::Uint(_) => ArgType::Uint,
        }
    }
}

impl Serialize for Arg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("Arg", 2)?;
        s.serialize_field("t", &self.arg_type().code())?;
        match self {
            Self::Bool(v) => s.serialize_field("v", v)?,
            // Chars travel as one-character strings on the JSON transport.
            Self::Char(v) => s.serialize_field("v", &char::from(*v).to_string())?,
            Self::Int(v) => s.serialize_field("v", v)?,
            Self::String(v) => s.serialize_field("v", v)?,
            Self::Uint(v) => s.serialize_field("v", v)?,
        }
        s.end()
    }
}

impl<'de> Deserialize<'de> for Arg {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct RawArg {
            t: u8,
            v: serde_json::Value,
        }

        let raw = RawArg::deserialize(deserializer)?;
        match ArgType::from_code(raw.t) {
            Some(ArgType::Bool) => raw
                .v
                .as_bool()
                .map(Arg::Bool)
                .ok_or_else(|| D::Error::custom("boolean argument value must be a JSON bool")),
            Some(ArgType::Char) => match raw.v.as_str() {
                Some(s) if !s.is_empty() => Ok(Arg::Char(s.as_bytes()[0])),
                Some(_) => Err(D::Error::custom("empty character found")),
                None => Err(D::Error::custom("character argument value must be a string")),
            },
            Some(ArgType::Int) => raw
                .v
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Arg::Int)
                .ok_or_else(|| D::Error::custom("integer argument value out of range")),
            Some(ArgType::String) => match raw.v {
                serde_json::Value::String(s) => Ok(Arg::String(s)),
                _ => Err(D::Error::custom("string argument value must be a string")),
            },
            Some(ArgType::Uint) => raw
                .v
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Arg::Uint)
                .ok_or_else(|| D::Error::custom("unsigned argument value out of range")),
            None => Err(D::Error::custom(format!("unsupported type {}", raw.t))),
        }
    }
}

/// One decoded tokenized-log record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Record {
    /// Sequence number; useful for spotting dropped lines.
    #[serde(rename = "seq")]
    pub sequence: u16,

    /// Severity level.
    #[serde(rename = "lvl")]
    pub level: Level,

    /// Index of the emitting module in the dictionary.
    #[serde(rename = "mi")]
    pub module_index: u32,

    /// Source line within the module.
    #[serde(rename = "ml")]
    pub line_number: u32,

    /// Arguments for the module line's format string.
    #[serde(default)]
    pub args: Vec<Arg>,
}

impl Record {
    /// Serializes to the framed ASCII wire form (version 0), without the
    /// trailing newline.  [`parse_record`] is its left inverse.
    pub fn encode_framed(&self) -> Vec<u8> {
        let mut out = format!(
            "$TL{:02X},{},{},{},{},{},",
            MAX_SUPPORTED_VERSION,
            self.sequence,
            self.level.as_char(),
            self.module_index,
            self.line_number,
            self.args.len()
        );

        for arg in &self.args {
            out.push_str(&format!("{},", arg.arg_type().code()));
            match arg {
                Arg::Bool(v) => out.push(if *v { '1' } else { '0' }),
                Arg::Char(v) => out.push_str(&v.to_string()),
                Arg::Int(v) => out.push_str(&v.to_string()),
                Arg::Uint(v) => out.push_str(&v.to_string()),
                Arg::String(v) => {
                    out.push_str("^\0");
                    out.push_str(v);
                    out.push_str("$\0");
                }
            }
            out.push(',');
        }

        out.into_bytes()
    }
}

/// A field of the framed record grammar, used to pinpoint parse failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordField {
    /// The sequence number.
    Sequence,
    /// The level character.
    Level,
    /// The module index.
    ModuleIndex,
    /// The source line number.
    LineNumber,
    /// The argument count.
    ArgCount,
    /// The type code of argument `n`.
    ArgType(usize),
    /// The value of argument `n`.
    ArgValue(usize),
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence number"),
            Self::Level => write!(f, "logging level"),
            Self::ModuleIndex => write!(f, "module index"),
            Self::LineNumber => write!(f, "line number"),
            Self::ArgCount => write!(f, "argument count"),
            Self::ArgType(i) => write!(f, "argument {i} type"),
            Self::ArgValue(i) => write!(f, "argument {i} value"),
        }
    }
}

/// Error produced while decoding a framed record.
#[derive(Debug, PartialEq, Eq)]
pub enum RecordError {
    /// The record header carried a version above the supported maximum.
    UnsupportedVersion(UnsupportedVersion),

    /// A field (or its terminating comma) was missing.
    MissingField {
        /// Which field.
        field: RecordField,
    },

    /// A numeric field did not parse at its required width.
    BadNumber {
        /// Which field.
        field: RecordField,
        /// The offending text.
        text: String,
    },

    /// The level character was not one of `D`, `E`, `I`, `W`.
    UnknownLevel {
        /// The byte found.
        level: u8,
    },

    /// An argument carried a type code outside `0..=4`.
    UnknownArgType {
        /// Argument position.
        index: usize,
        /// The code found.
        code: u8,
    },

    /// A string argument did not begin with `^\0`.
    MissingStringStart {
        /// Argument position.
        index: usize,
    },

    /// A string argument was never terminated by `$\0`.
    MissingStringEnd {
        /// Argument position.
        index: usize,
    },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(err) => err.fmt(f),
            Self::MissingField { field } => write!(f, "expected {field} comma but found none"),
            Self::BadNumber { field, text } => {
                write!(f, "error parsing {field}: invalid number \"{text}\"")
            }
            Self::UnknownLevel { level } => {
                write!(f, "unsupported logging level '{}'", char::from(*level))
            }
            Self::UnknownArgType { index, code } => {
                write!(f, "unknown argument {index} type 0x{code:02X}")
            }
            Self::MissingStringStart { index } => {
                write!(f, "missing start of argument {index} string")
            }
            Self::MissingStringEnd { index } => {
                write!(f, "missing end of argument {index} string")
            }
        }
    }
}

impl std::error::Error for RecordError {}

impl From<UnsupportedVersion> for RecordError {
    fn from(err: UnsupportedVersion) -> Self {
        Self::UnsupportedVersion(err)
    }
}

/// Decodes one framed record.
///
/// Returns `Ok(None)` when `data` is not a record at all (no `$TL` header);
/// callers pass such lines through unchanged.
pub fn parse_record(data: &[u8]) -> Result<Option<Record>, RecordError> {
    if !has_record(data)? {
        return Ok(None);
    }
    if data.len() < 8 {
        return Err(RecordError::MissingField {
            field: RecordField::Sequence,
        });
    }
    let data = &data[6..];

    let (text, data) = take_field(data, RecordField::Sequence)?;
    let sequence: u16 = parse_number(text, RecordField::Sequence)?;

    let &level_byte = data.first().ok_or(RecordError::MissingField {
        field: RecordField::Level,
    })?;
    let level =
        Level::try_from(level_byte).map_err(|level| RecordError::UnknownLevel { level })?;
    if data.get(1) != Some(&b',') {
        return Err(RecordError::MissingField {
            field: RecordField::Level,
        });
    }
    let data = &data[2..];

    let (text, data) = take_field(data, RecordField::ModuleIndex)?;
    let module_index: u32 = parse_number(text, RecordField::ModuleIndex)?;

    let (text, data) = take_field(data, RecordField::LineNumber)?;
    let line_number: u32 = parse_number(text, RecordField::LineNumber)?;

    let (text, mut data) = take_field(data, RecordField::ArgCount)?;
    let n_args: u8 = parse_number(text, RecordField::ArgCount)?;

    let mut args = Vec::with_capacity(n_args as usize);
    for index in 0..n_args as usize {
        let (text, rest) = take_field(data, RecordField::ArgType(index))?;
        let code: u8 = parse_number(text, RecordField::ArgType(index))?;
        let arg_type =
            ArgType::from_code(code).ok_or(RecordError::UnknownArgType { index, code })?;
        data = rest;

        if arg_type == ArgType::String {
            if !data.starts_with(b"^\0") {
                return Err(RecordError::MissingStringStart { index });
            }
            let end = data
                .windows(2)
                .position(|w| w == b"$\0")
                .ok_or(RecordError::MissingStringEnd { index })?;
            if data.get(end + 2) != Some(&b',') {
                return Err(RecordError::MissingField {
                    field: RecordField::ArgValue(index),
                });
            }
            args.push(Arg::String(
                String::from_utf8_lossy(&data[2..end]).into_owned(),
            ));
            data = &data[end + 3..];
        } else {
            let (text, rest) = take_field(data, RecordField::ArgValue(index))?;
            data = rest;
            let field = RecordField::ArgValue(index);
            args.push(match arg_type {
                ArgType::Bool => Arg::Bool(parse_bool(text).ok_or_else(|| {
                    RecordError::BadNumber {
                        field,
                        text: String::from_utf8_lossy(text).into_owned(),
                    }
                })?),
                ArgType::Char => Arg::Char(parse_number(text, field)?),
                ArgType::Int => Arg::Int(parse_number(text, field)?),
                ArgType::Uint => Arg::Uint(parse_number(text, field)?),
                ArgType::String => unreachable!("handled above"),
            });
        }
    }

    Ok(Some(Record {
        sequence,
        level,
        module_index,
        line_number,
        args,
    }))
}

/// Splits off the bytes up to the next comma.
fn take_field(data: &[u8], field: RecordField) -> Result<(&[u8], &[u8]), RecordError> {
    let ci = data
        .iter()
        .position(|&b| b == b',')
        .ok_or(RecordError::MissingField { field })?;
    Ok((&data[..ci], &data[ci + 1..]))
}

fn parse_number<T: FromStr>(text: &[u8], field: RecordField) -> Result<T, RecordError> {
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RecordError::BadNumber {
            field,
            text: String::from_utf8_lossy(text).into_owned(),
        })
}

/// The decimal-bool forms: the firmware emits `1`/`0` on the framed
/// transport, other producers spell the words out.
fn parse_bool(text: &[u8]) -> Option<bool> {
    match text {
        b"1" | b"t" | b"T" | b"TRUE" | b"true" | b"True" => Some(true),
        b"0" | b"f" | b"F" | b"FALSE" | b"false" | b"False" => Some(false),
        _ => None,
    }
}

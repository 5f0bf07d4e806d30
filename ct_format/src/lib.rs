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

//! `ct_format` is a parser and renderer for the printf-style format strings
//! carried in tokenized-logging dictionaries.
//!
//! Only the conversions the firmware emits are supported: `%d %i %o %u %x
//! %X %c %s` and `%t` (boolean), with the usual flags, field width, and
//! precision.  Integer length modifiers (`h`, `hh`, `l`, `ll`) are accepted
//! and ignored, since every argument reaching the renderer has already been
//! decoded at full width.
//!
//! A format string parses into a sequence of [`Segment`]s.  Each
//! [`Conversion`] keeps the source text it was parsed from, so a conversion
//! that cannot be rendered (for example when a record carries fewer
//! arguments than the dictionary entry expects) can be reproduced in the
//! output exactly as it appeared in the C source.
//!
//! # Example
//!
//! ```
//! use ct_format::{FormatString, Value};
//!
//! let format_string = FormatString::parse("count=%d name=%s").unwrap();
//! let rendered = format_string.render(&[Value::Int(7), Value::Str("probe")]);
//! assert_eq!(rendered, "count=7 name=probe");
//! ```

#![deny(missing_docs)]

use std::fmt;

mod parse;
mod render;

pub use render::Value;

/// What a conversion renders as: the final letter of the `%` clause.
///
/// `%d` and `%i` are one variant; they differ only for `scanf`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Specifier {
    /// `%d` / `%i`
    SignedDec,

    /// `%u`
    UnsignedDec,

    /// `%o`
    Octal,

    /// `%x`
    HexLower,

    /// `%X`
    HexUpper,

    /// `%c`
    Character,

    /// `%s`
    Str,

    /// `%t`, the firmware's boolean conversion.
    Boolean,
}

/// Width, padding, and precision of one conversion.
///
/// The default layout (no flags, no width, no precision) renders a value in
/// its natural form.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Layout {
    /// `-`: pad on the right instead of the left.
    pub left_align: bool,

    /// `0`: fill the field with zeros instead of spaces (integers only).
    pub zero_pad: bool,

    /// `+`: write a sign even for non-negative signed values.
    pub plus_sign: bool,

    /// ` `: write a space where the `+` sign would go.
    pub space_sign: bool,

    /// `#`: alternate form (`0x`/`0X`/`0` base prefixes).
    pub alt_form: bool,

    /// Minimum field width.
    pub width: Option<u32>,

    /// `.N`: maximum bytes for strings, minimum digits for integers.
    pub precision: Option<u32>,
}

/// One `%` clause of a format string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conversion {
    /// The clause exactly as written in the source, e.g. `%-08llx`.
    pub source: String,

    /// What to render.
    pub specifier: Specifier,

    /// How to lay it out.
    pub layout: Layout,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A piece of a parsed format string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    /// Literal text, with `%%` escapes already collapsed to `%`.
    Text(String),

    /// A conversion clause.
    Conversion(Conversion),
}

/// A format string parsed into its segments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatString {
    /// Literal text and conversions, in source order.
    pub segments: Vec<Segment>,
}

impl FormatString {
    /// Parses a printf-style format string.
    pub fn parse(s: &str) -> Result<Self, FormatParseError> {
        parse::format_string(s)
    }
}

/// Error produced when a format string fails to parse.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormatParseError {
    /// Byte offset of the `%` that opens the unparseable conversion.
    pub offset: usize,
}

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid conversion at byte {}", self.offset)
    }
}

impl std::error::Error for FormatParseError {}

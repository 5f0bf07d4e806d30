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

//! Applies parsed format strings to decoded argument values.

use crate::{Conversion, FormatString, Layout, Segment, Specifier};

/// A value to substitute for one conversion when rendering.
///
/// Callers map their own argument representation to this shape at the
/// boundary; the renderer never sees the caller's types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value<'a> {
    /// A boolean, rendered as `true`/`false` by `%t`.
    Bool(bool),

    /// A single byte, rendered as a character by `%c`.
    Char(u8),

    /// A signed integer.
    Int(i64),

    /// An unsigned integer.
    Uint(u64),

    /// A string.
    Str(&'a str),
}

impl FormatString {
    /// Renders the format string, substituting `args` positionally.
    ///
    /// The renderer does not validate: a value whose type does not match
    /// its conversion is rendered in its natural form, surplus arguments
    /// are ignored, and once the arguments run out each remaining
    /// conversion is emitted as its original `%…` source text.
    pub fn render(&self, args: &[Value<'_>]) -> String {
        let mut out = String::new();
        let mut args = args.iter();

        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Conversion(clause) => match args.next() {
                    Some(arg) => out.push_str(&clause.render(arg)),
                    None => out.push_str(&clause.source),
                },
            }
        }

        out
    }
}

impl Conversion {
    /// Renders one value through this conversion.
    pub fn render(&self, value: &Value<'_>) -> String {
        let layout = &self.layout;
        match self.specifier {
            Specifier::SignedDec => layout.integer(decimal(value), true),
            Specifier::UnsignedDec => layout.integer(decimal(value), false),

            Specifier::Octal => match bits32(value) {
                Some(n) => layout.integer(layout.based("0", format!("{n:o}")), false),
                None => layout.plain(natural(value)),
            },
            Specifier::HexLower => match bits32(value) {
                Some(n) => layout.integer(layout.based("0x", format!("{n:x}")), false),
                None => layout.plain(natural(value)),
            },
            Specifier::HexUpper => match bits32(value) {
                Some(n) => layout.integer(layout.based("0X", format!("{n:X}")), false),
                None => layout.plain(natural(value)),
            },

            Specifier::Character => layout.plain(match value {
                Value::Char(c) => char::from(*c).to_string(),
                Value::Int(i) => char::from(*i as u8).to_string(),
                Value::Uint(u) => char::from(*u as u8).to_string(),
                other => natural(other),
            }),

            Specifier::Str => match value {
                Value::Str(s) => layout.plain(layout.clipped(s)),
                other => layout.plain(natural(other)),
            },

            Specifier::Boolean => layout.plain(match value {
                Value::Bool(b) => b.to_string(),
                Value::Char(c) => (*c != 0).to_string(),
                Value::Int(i) => (*i != 0).to_string(),
                Value::Uint(u) => (*u != 0).to_string(),
                Value::Str(s) => (*s).to_string(),
            }),
        }
    }
}

impl Layout {
    /// Lays out an integer body: sign flags and minimum digits first, then
    /// the field width.  Sign flags only apply to signed conversions.
    fn integer(&self, body: String, signed: bool) -> String {
        let (sign, digits) = match body.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None if signed && self.plus_sign => ("+", body.as_str()),
            None if signed && self.space_sign => (" ", body.as_str()),
            None => ("", body.as_str()),
        };

        let digits = match self.precision {
            Some(p) if (p as usize) > digits.len() => {
                format!("{}{digits}", "0".repeat(p as usize - digits.len()))
            }
            _ => digits.to_string(),
        };

        self.field(format!("{sign}{digits}"), true)
    }

    /// Lays out a non-numeric body; only the field width applies.
    fn plain(&self, body: String) -> String {
        self.field(body, false)
    }

    /// Pads to the field width.  Zero filling is reserved for integers and
    /// goes after the sign.
    fn field(&self, body: String, numeric: bool) -> String {
        let Some(width) = self.width else {
            return body;
        };
        let width = width as usize;
        let used = body.chars().count();
        if used >= width {
            return body;
        }
        let fill = width - used;

        if self.left_align {
            format!("{body}{}", " ".repeat(fill))
        } else if self.zero_pad && numeric {
            match body.strip_prefix('-') {
                Some(rest) => format!("-{}{rest}", "0".repeat(fill)),
                None => format!("{}{body}", "0".repeat(fill)),
            }
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }

    /// Applies the `#` base prefix to a non-zero digit string.
    fn based(&self, prefix: &str, digits: String) -> String {
        if self.alt_form && digits != "0" {
            format!("{prefix}{digits}")
        } else {
            digits
        }
    }

    /// Applies string precision: a maximum byte count, kept on a char
    /// boundary.
    fn clipped(&self, s: &str) -> String {
        match self.precision {
            Some(p) => {
                let mut n = (p as usize).min(s.len());
                while !s.is_char_boundary(n) {
                    n -= 1;
                }
                s[..n].to_string()
            }
            None => s.to_string(),
        }
    }
}

/// Natural decimal form of any value.
fn decimal(value: &Value<'_>) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Uint(u) => u.to_string(),
        Value::Str(s) => (*s).to_string(),
    }
}

/// 32-bit two's-complement view for the base conversions; strings have no
/// numeric form.
fn bits32(value: &Value<'_>) -> Option<u64> {
    match value {
        Value::Bool(b) => Some(*b as u64),
        Value::Char(c) => Some(*c as u64),
        // Negative values wrap to the 32-bit form, the width every firmware
        // integer argument has.
        Value::Int(i) => Some(*i as u32 as u64),
        Value::Uint(u) => Some(*u),
        Value::Str(_) => None,
    }
}

/// Natural form of a value whose conversion does not apply to it.
fn natural(value: &Value<'_>) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Char(c) => char::from(*c).to_string(),
        Value::Int(i) => i.to_string(),
        Value::Uint(u) => u.to_string(),
        Value::Str(s) => (*s).to_string(),
    }
}

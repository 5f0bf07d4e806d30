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

//! Format string parsing.
//!
//! The segment loop is hand-driven: literal runs and `%%` escapes need no
//! grammar, so nom is only brought in for the one place it earns its keep,
//! the conversion clause itself (`% flags width .precision modifier
//! letter`).

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, one_of, u32 as dec_u32};
use nom::combinator::{consumed, opt, value};
use nom::sequence::{preceded, tuple};
use nom::IResult;

use crate::{Conversion, FormatParseError, FormatString, Layout, Segment, Specifier};

pub(crate) fn format_string(input: &str) -> Result<FormatString, FormatParseError> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("%%") {
            push_text(&mut segments, "%");
            rest = after;
        } else if rest.starts_with('%') {
            let (after, clause) = conversion(rest).map_err(|_| FormatParseError {
                offset: input.len() - rest.len(),
            })?;
            segments.push(Segment::Conversion(clause));
            rest = after;
        } else {
            let run = rest.find('%').unwrap_or(rest.len());
            push_text(&mut segments, &rest[..run]);
            rest = &rest[run..];
        }
    }

    Ok(FormatString { segments })
}

/// Appends literal text, extending a trailing text segment so `%%` escapes
/// do not fragment the literal around them.
fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Text(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn conversion(input: &str) -> IResult<&str, Conversion> {
    let (rest, (source, (_, layout, _, specifier))) = consumed(tuple((
        char('%'),
        layout,
        opt(modifier),
        specifier,
    )))(input)?;

    Ok((
        rest,
        Conversion {
            source: source.to_string(),
            specifier,
            layout,
        },
    ))
}

fn layout(input: &str) -> IResult<&str, Layout> {
    let (input, flags) = take_while(|c| "-+ #0".contains(c))(input)?;
    let (input, width) = opt(dec_u32)(input)?;
    let (input, precision) = opt(preceded(char('.'), dec_u32))(input)?;

    Ok((
        input,
        Layout {
            left_align: flags.contains('-'),
            zero_pad: flags.contains('0'),
            plus_sign: flags.contains('+'),
            space_sign: flags.contains(' '),
            alt_form: flags.contains('#'),
            width,
            precision,
        },
    ))
}

/// Integer length modifiers, two-letter forms first.
fn modifier(input: &str) -> IResult<&str, &str> {
    alt((tag("hh"), tag("ll"), tag("h"), tag("l")))(input)
}

fn specifier(input: &str) -> IResult<&str, Specifier> {
    alt((
        value(Specifier::SignedDec, one_of("di")),
        value(Specifier::UnsignedDec, char('u')),
        value(Specifier::Octal, char('o')),
        value(Specifier::HexLower, char('x')),
        value(Specifier::HexUpper, char('X')),
        value(Specifier::Character, char('c')),
        value(Specifier::Str, char('s')),
        value(Specifier::Boolean, char('t')),
    ))(input)
}

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

//! `ct_macro` - Locates invocations of function-like macros within a text
//! token and extracts their argument lists.
//!
//! Matching is purely lexical: a target name found as a whole identifier is
//! an invocation unless it is the name being defined by a `#define` on the
//! same logical text.  Argument extraction respects nested parentheses,
//! string literals with embedded commas and parentheses, and backslash
//! escapes, and tolerates invocations spanning multiple lines.

use std::fmt;

use ct_buffer::{ByteBuffer, MaxBufferReached};
use ct_token::Token;

/// An invocation of a function-like macro found in C source text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MacroInvocation {
    /// The macro's name; always one of the caller-supplied target names.
    pub name: String,

    /// Each argument's source text, trimmed of surrounding whitespace but
    /// otherwise verbatim (quotes, escapes, and nested parentheses kept).
    pub args: Vec<String>,

    /// Line the invocation starts on (the line of the name).
    pub line_start: u32,

    /// Line of the terminating `;`.
    pub line_end: u32,
}

/// Error produced while extracting an invocation.
#[derive(Debug, Eq, PartialEq)]
pub enum MacroError {
    /// A target name was found but no `(` followed it anywhere in the token.
    MissingOpenParen {
        /// The macro name that was matched.
        name: String,
        /// Line of the match.
        line: u32,
    },

    /// The per-argument buffer cap was exceeded.
    MaxBufferReached,
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOpenParen { name, line } => {
                write!(f, "macro {name} on line {line} is missing opening parentheses")
            }
            Self::MaxBufferReached => write!(f, "maximum argument buffer reached"),
        }
    }
}

impl std::error::Error for MacroError {}

impl From<MaxBufferReached> for MacroError {
    fn from(_: MaxBufferReached) -> Self {
        Self::MaxBufferReached
    }
}

/// Finds all invocations of the named macros within `token`, in source
/// order.
///
/// `#define`s of the same names are skipped.  An invocation still open when
/// the token's text runs out is dropped.
pub fn find_invocations(
    token: &Token,
    names: &[&str],
) -> Result<Vec<MacroInvocation>, MacroError> {
    find_invocations_bounded(token, names, 0)
}

/// Like [`find_invocations`], with each argument's buffer bounded to
/// `max_buf` bytes (zero means unbounded).
pub fn find_invocations_bounded(
    token: &Token,
    names: &[&str],
    max_buf: usize,
) -> Result<Vec<MacroInvocation>, MacroError> {
    let data = token.data.as_slice();
    let mut found = Vec::new();
    let mut cursor = 0usize;
    let mut line_curr = token.line_start;

    while let Some((ni, name)) = find_name(data, cursor, names) {
        line_curr += count_newlines(&data[cursor..ni]);
        let after_name = ni + name.len();

        if is_macro_def(data, ni) {
            cursor = after_name;
            continue;
        }

        let line_start = line_curr;

        // The next `(` anywhere ahead opens the argument list.
        let Some(op) = data[after_name..].iter().position(|&b| b == b'(') else {
            return Err(MacroError::MissingOpenParen {
                name: name.to_string(),
                line: line_start,
            });
        };
        let mut line = line_curr + count_newlines(&data[after_name..after_name + op]);

        let mut args = Vec::new();
        let mut buf = ByteBuffer::with_max(max_buf);
        let mut in_string = false;
        let mut paren_depth = 0usize;
        let mut end = None;

        let mut i = after_name + op + 1;
        while i < data.len() {
            let b = data[i];
            match b {
                b' ' | b',' => {
                    if in_string || paren_depth > 0 {
                        buf.push(b)?;
                    } else {
                        push_arg(&mut args, &mut buf);
                    }
                }

                b'"' => {
                    // An escaped quote stays inside the literal.
                    if in_string && buf.last() == Some(b'\\') {
                        buf.push(b)?;
                    } else {
                        in_string = !in_string;
                        buf.push(b)?;
                    }
                }

                b'(' => {
                    buf.push(b)?;
                    if !in_string {
                        paren_depth += 1;
                    }
                }

                b')' => {
                    if in_string {
                        buf.push(b)?;
                    } else if paren_depth > 0 {
                        buf.push(b)?;
                        paren_depth -= 1;
                    } else {
                        push_arg(&mut args, &mut buf);
                    }
                }

                b';' => {
                    if in_string {
                        buf.push(b)?;
                    } else {
                        end = Some(i);
                    }
                }

                b'\r' => {}

                b'\n' => line += 1,

                _ => buf.push(b)?,
            }

            i += 1;
            if end.is_some() {
                break;
            }
        }

        match end {
            Some(e) => {
                found.push(MacroInvocation {
                    name: name.to_string(),
                    args,
                    line_start,
                    line_end: line,
                });
                cursor = e + 1;
                line_curr = line;
            }
            // The token ended with the invocation still open; drop it.
            None => break,
        }
    }

    Ok(found)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Finds the earliest whole-identifier occurrence of any target name at or
/// after `from`.
fn find_name<'a>(data: &[u8], from: usize, names: &[&'a str]) -> Option<(usize, &'a str)> {
    for i in from..data.len() {
        if i > 0 && is_ident_byte(data[i - 1]) {
            continue;
        }
        for &name in names {
            let nb = name.as_bytes();
            if data[i..].starts_with(nb) {
                let end = i + nb.len();
                if end >= data.len() || !is_ident_byte(data[end]) {
                    return Some((i, name));
                }
            }
        }
    }
    None
}

/// Reports whether the name at `ni` is being defined rather than invoked:
/// scanning left over spaces must find the word `define`, and further left
/// over spaces a `#`.
fn is_macro_def(data: &[u8], ni: usize) -> bool {
    let mut i = ni;
    while i > 0 && data[i - 1] == b' ' {
        i -= 1;
    }
    if i < 6 || &data[i - 6..i] != b"define" {
        return false;
    }

    let mut j = i - 6;
    while j > 0 {
        match data[j - 1] {
            b' ' => j -= 1,
            b'#' => return true,
            _ => return false,
        }
    }
    false
}

/// Trims and pushes the buffered argument if it is non-empty.
fn push_arg(args: &mut Vec<String>, buf: &mut ByteBuffer) {
    let trimmed = trim_ascii(buf.as_slice());
    if !trimmed.is_empty() {
        args.push(String::from_utf8_lossy(trimmed).into_owned());
    }
    buf.clear();
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

fn count_newlines(bytes: &[u8]) -> u32 {
    bytes.iter().filter(|&&b| b == b'\n').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_token::TokenKind;

    fn text_token(s: &str) -> Token {
        Token {
            kind: TokenKind::Text,
            data: s.as_bytes().to_vec(),
            line_start: 1,
            column_start: 1,
        }
    }

    fn invocation(name: &str, args: &[&str], line_start: u32, line_end: u32) -> MacroInvocation {
        MacroInvocation {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            line_start,
            line_end,
        }
    }

    #[test]
    fn definition_scan_distinguishes_defines_from_invocations() {
        let cases: &[(&str, bool)] = &[
            ("TEST_FUNC( a, b, c )  (a, b, c)", false),
            ("#define TEST_FUNC( a, b, c )  (a, b, c)", true),
            ("  #  define   TEST_FUNC( a, b, c )  (a, b, c)", true),
            ("undefine TEST_FUNC( a )", false),
        ];
        for (input, expected) in cases {
            let ni = input.find("TEST_FUNC").unwrap();
            assert_eq!(
                is_macro_def(input.as_bytes(), ni),
                *expected,
                "input: {input}"
            );
        }
    }

    #[test]
    fn quoted_argument_keeps_embedded_comma() {
        let invocations =
            find_invocations(&text_token(r#"TEST_FUNC( "a, b", c );"#), &["TEST_FUNC"]).unwrap();
        assert_eq!(
            invocations,
            vec![invocation("TEST_FUNC", &[r#""a, b""#, "c"], 1, 1)],
        );
    }

    #[test]
    fn define_of_the_same_name_is_skipped() {
        let invocations = find_invocations(
            &text_token("#define TEST_FUNC( x ) (x)\nTEST_FUNC(1);"),
            &["TEST_FUNC"],
        )
        .unwrap();
        assert_eq!(invocations, vec![invocation("TEST_FUNC", &["1"], 2, 2)]);
    }

    #[test]
    fn define_alone_yields_no_invocations() {
        let invocations = find_invocations(
            &text_token("#define TEST_FUNC( a, b, c )  (a, b, c)"),
            &["TEST_FUNC"],
        )
        .unwrap();
        assert_eq!(invocations, vec![]);
    }

    #[test]
    fn empty_argument_list_yields_no_args() {
        let invocations =
            find_invocations(&text_token("TEST_FUNC ( );"), &["TEST_FUNC"]).unwrap();
        assert_eq!(invocations, vec![invocation("TEST_FUNC", &[], 1, 1)]);
    }

    #[test]
    fn nested_call_is_kept_as_one_argument() {
        let invocations =
            find_invocations(&text_token("TEST_FUNC( INNER_TEST_FUNC() );"), &["TEST_FUNC"])
                .unwrap();
        assert_eq!(
            invocations,
            vec![invocation("TEST_FUNC", &["INNER_TEST_FUNC()"], 1, 1)],
        );
    }

    #[test]
    fn escaped_backslashes_survive_in_string_arguments() {
        let invocations = find_invocations(
            &text_token(r#"TEST_FUNC ( "Format string: %d %s %d", a, "b \\ string", c );"#),
            &["TEST_FUNC"],
        )
        .unwrap();
        assert_eq!(
            invocations,
            vec![invocation(
                "TEST_FUNC",
                &[
                    r#""Format string: %d %s %d""#,
                    "a",
                    r#""b \\ string""#,
                    "c",
                ],
                1,
                1,
            )],
        );
    }

    #[test]
    fn multi_line_invocation_reports_start_and_end_lines() {
        let source = "TEST_FUNC(\n    \"Format string: %d %s %d\",\n    a,\n    \"b \\\\ string\",\n    c\n);";
        let invocations = find_invocations(&text_token(source), &["TEST_FUNC"]).unwrap();
        assert_eq!(
            invocations,
            vec![invocation(
                "TEST_FUNC",
                &[
                    r#""Format string: %d %s %d""#,
                    "a",
                    r#""b \\ string""#,
                    "c",
                ],
                1,
                6,
            )],
        );
    }

    #[test]
    fn consecutive_invocations_track_lines() {
        let source = "TEST_FUNC_A( \"one: %d\", a );\n  TEST_FUNC_B( \"two: %s\", b , c);";
        let invocations =
            find_invocations(&text_token(source), &["TEST_FUNC_A", "TEST_FUNC_B"]).unwrap();
        assert_eq!(
            invocations,
            vec![
                invocation("TEST_FUNC_A", &[r#""one: %d""#, "a"], 1, 1),
                invocation("TEST_FUNC_B", &[r#""two: %s""#, "b", "c"], 2, 2),
            ],
        );
    }

    #[test]
    fn names_match_whole_identifiers_only() {
        let invocations = find_invocations(
            &text_token("XTEST_FUNC(1); TEST_FUNCY(2);"),
            &["TEST_FUNC"],
        )
        .unwrap();
        assert_eq!(invocations, vec![]);
    }

    #[test]
    fn missing_open_paren_is_an_error() {
        assert_eq!(
            find_invocations(&text_token("x = TEST_FUNC;"), &["TEST_FUNC"]),
            Err(MacroError::MissingOpenParen {
                name: "TEST_FUNC".to_string(),
                line: 1,
            }),
        );
    }

    #[test]
    fn unterminated_invocation_is_dropped_silently() {
        let invocations =
            find_invocations(&text_token("TEST_FUNC( \"open"), &["TEST_FUNC"]).unwrap();
        assert_eq!(invocations, vec![]);
    }

    #[test]
    fn semicolon_inside_string_does_not_end_the_invocation() {
        let invocations =
            find_invocations(&text_token(r#"TEST_FUNC( "a;b", c );"#), &["TEST_FUNC"]).unwrap();
        assert_eq!(
            invocations,
            vec![invocation("TEST_FUNC", &[r#""a;b""#, "c"], 1, 1)],
        );
    }

    #[test]
    fn args_rejoined_with_commas_parse_back_to_the_same_args() {
        let source = r#"TEST_FUNC( "a, (b", foo(1, 2), c );"#;
        let first = find_invocations(&text_token(source), &["TEST_FUNC"]).unwrap();
        let rejoined = format!("TEST_FUNC({});", first[0].args.join(", "));
        let second = find_invocations(&text_token(&rejoined), &["TEST_FUNC"]).unwrap();
        assert_eq!(first[0].args, second[0].args);
    }

    #[test]
    fn bounded_arguments_fail_when_too_long() {
        assert_eq!(
            find_invocations_bounded(
                &text_token("TEST_FUNC( averylongargument );"),
                &["TEST_FUNC"],
                4,
            ),
            Err(MacroError::MaxBufferReached),
        );
    }
}

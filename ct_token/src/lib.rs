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

//! `ct_token` - A naive C tokenizer.
//!
//! The tokenizer splits a byte stream of C source into alternating *comment*
//! and *text* tokens, which is the only lexical understanding the host-side
//! tooling needs: comments are skipped, text is searched for macro
//! invocations.  It is deliberately not a conforming C lexer; it only knows
//! enough about string literals and escapes to keep comment delimiters inside
//! literals inert.
//!
//! The tokenizer is pull-based: each call to [`Tokenizer::next_token`]
//! advances the internal state machine over the stream and returns at most
//! one token.
//!
//! # Example
//!
//! ```
//! use ct_token::{TokenKind, Tokenizer};
//!
//! let source = "int x = 1; // hello\nint y;";
//! let tokens: Vec<_> = Tokenizer::new(source.as_bytes())
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[1].kind, TokenKind::Comment);
//! assert_eq!(tokens[1].data, b"// hello");
//! ```

#![deny(missing_docs)]

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};

use ct_buffer::{ByteBuffer, MaxBufferReached};

/// The kind of a [`Token`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    /// A `//` or `/* ... */` comment, delimiters included.
    Comment,

    /// Everything that is not a comment.
    Text,
}

/// A run of source bytes, either comment or text.
///
/// Concatenating the `data` of every token produced for a stream reproduces
/// the input byte-for-byte, except that `\r` bytes are dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    /// Whether this token is a comment or plain text.
    pub kind: TokenKind,

    /// The token's bytes, exactly as they appeared in the source (multi-line
    /// comments keep their interior newlines).
    pub data: Vec<u8>,

    /// 1-based line on which the token starts.
    pub line_start: u32,

    /// 1-based column of the token's first byte.  Columns count bytes and
    /// reset after each newline.
    pub column_start: u32,
}

/// Error produced while tokenizing.
#[derive(Debug)]
pub enum TokenizeError {
    /// The underlying reader failed.
    Io(io::Error),

    /// A `/* ... */` comment was still open at end of input.
    UnterminatedComment {
        /// Line on which the comment started.
        line: u32,
    },

    /// The per-token buffer cap was exceeded.
    MaxBufferReached,
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "read error: {err}"),
            Self::UnterminatedComment { line } => {
                write!(f, "unterminated multi-line comment starting on line {line}")
            }
            Self::MaxBufferReached => write!(f, "maximum token buffer reached"),
        }
    }
}

impl std::error::Error for TokenizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TokenizeError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MaxBufferReached> for TokenizeError {
    fn from(_: MaxBufferReached) -> Self {
        Self::MaxBufferReached
    }
}

/// Splits a byte stream of C source into comment and text tokens.
pub struct Tokenizer<R: Read> {
    source: BufReader<R>,
    buf: ByteBuffer,
    line_curr: u32,
    column_curr: u32,
    done: bool,
}

impl<R: Read> Tokenizer<R> {
    /// Creates a tokenizer over `source`.  Line and column counting start at
    /// one.
    pub fn new(source: R) -> Self {
        Self {
            source: BufReader::new(source),
            buf: ByteBuffer::new(),
            line_curr: 1,
            column_curr: 1,
            done: false,
        }
    }

    /// Bounds the per-token buffer.  Zero (the default) means unbounded.
    pub fn set_max_buf(&mut self, max: usize) {
        self.buf.set_max(max);
    }

    /// Returns the next token, `Ok(None)` at end of input.
    ///
    /// Text is flushed whenever a comment begins and at end of input; a text
    /// token is also flushed at any `/` that does not turn out to begin a
    /// comment, so consecutive text tokens are possible.
    pub fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        if self.done {
            return Ok(None);
        }

        let mut in_string = false;
        let mut in_sl_comment = false;
        let mut ml_depth = 0usize;
        let mut line_start: u32 = 0;
        let mut column_start: u32 = 0;
        self.buf.clear();

        loop {
            let Some(b) = self.peek()? else {
                self.done = true;
                if self.buf.is_empty() {
                    return Ok(None);
                }
                if ml_depth > 0 {
                    return Err(TokenizeError::UnterminatedComment { line: line_start });
                }
                // An open single-line comment has no terminating newline, so
                // whatever was buffered goes out as text.
                return Ok(Some(self.emit(TokenKind::Text, line_start, column_start)));
            };

            if line_start == 0 {
                line_start = self.line_curr;
                column_start = if self.column_curr == 0 {
                    1
                } else {
                    self.column_curr
                };
            }

            match b {
                b'/' => {
                    if ml_depth > 0 {
                        if self.buf.last() == Some(b'*') {
                            ml_depth -= 1;
                            if ml_depth == 0 {
                                self.consume(b)?;
                                return Ok(Some(self.emit(
                                    TokenKind::Comment,
                                    line_start,
                                    column_start,
                                )));
                            }
                        }
                    } else if !in_sl_comment && !in_string {
                        if self.buf.last() == Some(b'/') {
                            // Second slash of `//`: the comment starts at the
                            // column of the first one.
                            in_sl_comment = true;
                            line_start = self.line_curr;
                            column_start = self.column_curr - 1;
                        } else if !self.buf.is_empty() {
                            // Flush accumulated text before a possible
                            // comment; the slash stays in the stream.
                            return Ok(Some(self.emit(
                                TokenKind::Text,
                                line_start,
                                column_start,
                            )));
                        }
                    }
                }

                b'*' => {
                    if !in_string && !in_sl_comment && self.buf.last() == Some(b'/') {
                        ml_depth += 1;
                        if ml_depth == 1 {
                            line_start = self.line_curr;
                            column_start = self.column_curr - 1;
                        }
                    }
                }

                b'\r' => {
                    // Discard and wait for the \n.  The column still counts
                    // the byte.
                    self.source.consume(1);
                    self.column_curr += 1;
                    continue;
                }

                b'\n' => {
                    if in_sl_comment {
                        // The newline is not part of the comment; it begins
                        // the next token.
                        return Ok(Some(self.emit(
                            TokenKind::Comment,
                            line_start,
                            column_start,
                        )));
                    }
                    self.line_curr += 1;
                    self.column_curr = 0;
                }

                b'"' => {
                    if !in_sl_comment && ml_depth == 0 && self.buf.last() != Some(b'\\') {
                        in_string = !in_string;
                    }
                }

                _ => {}
            }

            self.consume(b)?;
        }
    }

    fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.source.fill_buf()?.first().copied())
    }

    /// Consumes the peeked byte and appends it to the token buffer.
    fn consume(&mut self, b: u8) -> Result<(), TokenizeError> {
        self.source.consume(1);
        self.column_curr += 1;
        self.buf.push(b)?;
        Ok(())
    }

    fn emit(&mut self, kind: TokenKind, line_start: u32, column_start: u32) -> Token {
        Token {
            kind,
            data: self.buf.take(),
            line_start,
            column_start,
        }
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

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

//! Splits a byte stream on tokenized-log record boundaries.
//!
//! Plain `\n` splitting is not enough: a record's string arguments travel
//! between `^\0` and `$\0` markers and may contain `\r` or `\n` bytes.  The
//! splitter only treats a newline as a boundary when it falls outside such a
//! string region.

use std::fmt;
use std::io::{self, Read};

/// Magic bytes every framed record starts with.
pub const MAGIC: &[u8] = b"$TL";

/// Wire format version 0.
pub const VERSION_0: u8 = 0x00;

/// The highest wire format version this decoder understands.
pub const MAX_SUPPORTED_VERSION: u8 = VERSION_0;

/// Error for a record whose version field is above
/// [`MAX_SUPPORTED_VERSION`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnsupportedVersion {
    /// The version the record carried.
    pub version: u8,
}

impl fmt::Display for UnsupportedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "version 0x{:02X} exceeds max supported version 0x{:02X}",
            self.version, MAX_SUPPORTED_VERSION
        )
    }
}

impl std::error::Error for UnsupportedVersion {}

/// Returns true if `data` begins with a supported record header
/// (`$TL<HH>,`).
///
/// Bytes that merely resemble a header (bad hex digits, missing comma) are
/// not records; a well-formed header with a version above the supported
/// maximum is an [`UnsupportedVersion`] error.
pub fn has_record(data: &[u8]) -> Result<bool, UnsupportedVersion> {
    if data.len() < 6 || &data[0..3] != MAGIC || data[5] != b',' {
        return Ok(false);
    }
    let Ok(hex) = std::str::from_utf8(&data[3..5]) else {
        return Ok(false);
    };
    let Ok(version) = u8::from_str_radix(hex, 16) else {
        return Ok(false);
    };
    if version > MAX_SUPPORTED_VERSION {
        return Err(UnsupportedVersion { version });
    }
    Ok(true)
}

/// Result of one [`split_record`] pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Split {
    /// How many buffered bytes the caller should discard.
    pub advance: usize,

    /// The completed token, or `None` if more data is needed.
    pub token: Option<Vec<u8>>,
}

/// Scans a buffer for the next record boundary.
///
/// Outside record strings a `\n` terminates the current token (a preceding
/// `\r` is stripped); a `$` at offset 0 attempts to promote the buffer to a
/// record via [`has_record`]; a `$` later in a non-record token flushes the
/// leading bytes so the potential record starts the next pass at offset 0.
/// Within a record, `^\0` enters and `$\0` leaves the string state in which
/// newlines are ordinary bytes.  At end of input any remaining bytes are
/// emitted as a final token.
pub fn split_record(data: &[u8], at_eof: bool) -> Result<Split, UnsupportedVersion> {
    let mut in_record = false;
    let mut in_record_str = false;

    for i in 0..data.len() {
        match data[i] {
            b'\n' if !in_record_str => {
                let end = if i >= 1 && data[i - 1] == b'\r' {
                    i - 1
                } else {
                    i
                };
                return Ok(Split {
                    advance: i + 1,
                    token: Some(data[..end].to_vec()),
                });
            }

            b'$' if !in_record && !in_record_str => {
                if i > 0 {
                    // Flush the leading bytes; the record candidate is
                    // examined at offset 0 on the next pass.
                    return Ok(Split {
                        advance: i,
                        token: Some(data[..i].to_vec()),
                    });
                }
                in_record = has_record(data)?;
            }

            0x00 => {
                if in_record && i >= 1 {
                    match data[i - 1] {
                        b'^' => in_record_str = true,
                        b'$' => in_record_str = false,
                        _ => {}
                    }
                }
            }

            _ => {}
        }
    }

    if at_eof && !data.is_empty() {
        return Ok(Split {
            advance: data.len(),
            token: Some(data.to_vec()),
        });
    }

    Ok(Split {
        advance: 0,
        token: None,
    })
}

/// Error produced while scanning a stream for records.
#[derive(Debug)]
pub enum ScanError {
    /// A record header carried an unsupported version.
    UnsupportedVersion(UnsupportedVersion),

    /// The underlying reader failed.
    Io(io::Error),

    /// The internal buffer cap was exceeded before a boundary was found.
    MaxBufferReached,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(err) => err.fmt(f),
            Self::Io(err) => write!(f, "read error: {err}"),
            Self::MaxBufferReached => write!(f, "maximum scan buffer reached"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnsupportedVersion(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::MaxBufferReached => None,
        }
    }
}

impl From<UnsupportedVersion> for ScanError {
    fn from(err: UnsupportedVersion) -> Self {
        Self::UnsupportedVersion(err)
    }
}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Pull-based record scanner over a byte stream.
///
/// Yields one token per call: either a complete framed record (without its
/// trailing newline) or a run of ordinary output between records.
pub struct RecordScanner<R: Read> {
    source: R,
    buf: Vec<u8>,
    max_buf: usize,
    eof: bool,
    done: bool,
}

impl<R: Read> RecordScanner<R> {
    /// Creates a scanner over `source`.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::new(),
            max_buf: 0,
            eof: false,
            done: false,
        }
    }

    /// Bounds the internal buffer.  Zero (the default) means unbounded.
    pub fn set_max_buf(&mut self, max: usize) {
        self.max_buf = max;
    }

    /// Returns the next token, `Ok(None)` once the stream is exhausted.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>, ScanError> {
        if self.done {
            return Ok(None);
        }

        loop {
            let split = split_record(&self.buf, self.eof)?;
            if let Some(token) = split.token {
                self.buf.drain(..split.advance);
                return Ok(Some(token));
            }
            if self.eof {
                self.done = true;
                return Ok(None);
            }

            let mut chunk = [0u8; 4096];
            let n = match self.source.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(ScanError::Io(err)),
            };
            if n == 0 {
                self.eof = true;
            } else {
                if self.max_buf > 0 && self.buf.len() + n > self.max_buf {
                    return Err(ScanError::MaxBufferReached);
                }
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }
}

impl<R: Read> Iterator for RecordScanner<R> {
    type Item = Result<Vec<u8>, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

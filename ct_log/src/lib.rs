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

//! `ct_log` - The host side of the tokenized logging pipeline.
//!
//! Firmware built with the `CTLOG_*` macros emits compact framed records that
//! carry a module index and source line number instead of a format string.
//! This crate implements everything the host needs to make those records
//! readable again:
//!
//! * [`dict`] extracts `(line, format string)` pairs from C sources and
//!   assembles the persisted dictionary;
//! * [`scan`] splits a raw byte stream on record boundaries, tolerating
//!   newlines embedded in record string arguments;
//! * [`record`] decodes one framed or JSON record into a typed [`Record`];
//! * [`translate`] renders a decoded record through the dictionary.

pub mod dict;
pub mod record;
pub mod scan;
pub mod translate;

pub use dict::{build_dictionary, find_lines, Dictionary, DictionaryModule, Line};
pub use record::{parse_record, Arg, ArgType, Level, Record, RecordError};
pub use scan::{has_record, split_record, RecordScanner, ScanError};
pub use translate::{TranslateError, Translator};

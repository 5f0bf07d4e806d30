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

//! Shared plumbing for the `ctdict` and `cttranslate` binaries: output
//! selection, JSON encoding, and the generated C header.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, State};
use serde::Serialize;

use ct_module::ModuleList;

/// Opens the tool's output: the given file, or stdout when absent.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("failed to create output file {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    })
}

/// Writes a JSON artifact, pretty-printed unless `compact`, with a trailing
/// newline.
pub fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T, compact: bool) -> Result<()> {
    if compact {
        serde_json::to_writer(&mut writer, value)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a previously persisted module list.
pub fn read_module_list(path: &Path) -> Result<ModuleList> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse module list {}", path.display()))
}

const HEADER_TEMPLATE: &str = "\
/**
 * Auto-generated module index definitions for a given project.
 */

// Generated on: {{ date }}
// Using search paths:
{%- for path in searchPaths %}
//   - {{ path }}
{%- endfor %}

#ifndef CMODULE_INDICES_H
#define CMODULE_INDICES_H

{%- for module in modules %}
#define CMODULE_INDEX_{{ module.name|pad(32) }}  ({{ module.index }})
{%- endfor %}

#endif /* CMODULE_INDICES_H */
";

// Custom filters
fn pad(_state: &State, value: String, width: usize) -> String {
    format!("{value:<width$}")
}

/// Renders the C header of `CMODULE_INDEX_<name>` defines for a module
/// list.
pub fn render_header(list: &ModuleList) -> Result<String> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_filter("pad", pad);
    env.add_template("header", HEADER_TEMPLATE)?;
    let header = env.get_template("header")?.render(list)?;
    Ok(header)
}

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

//! `cttranslate` - Translates tokenized logging output read from stdin using
//! a previously persisted dictionary.  Lines that are not records pass
//! through unchanged, so the tool can sit directly on a device's console
//! stream.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ct_log::{Dictionary, RecordScanner, Translator};

#[derive(Debug, Parser)]
#[command(
    name = "cttranslate",
    about = "Translates tokenized logging output using the provided dictionary"
)]
struct Cli {
    /// Dictionary JSON written by `ctdict dict`.
    dictionary: PathBuf,

    /// Output file; stdout if absent.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = File::open(&cli.dictionary)
        .with_context(|| format!("failed to open dictionary {}", cli.dictionary.display()))?;
    let dictionary: Dictionary = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse dictionary {}", cli.dictionary.display()))?;
    let translator = Translator::new(dictionary.modules);

    let mut out = ct_tools::open_output(cli.output.as_deref())?;

    let stdin = io::stdin();
    let mut scanner = RecordScanner::new(stdin.lock());
    while let Some(line) = scanner.next_record().context("failed to scan stdin")? {
        let text = translator
            .translate_line(&line)
            .context("failed to translate tokenized logging output")?;
        writeln!(out, "{text}")?;
    }
    out.flush()?;

    Ok(())
}

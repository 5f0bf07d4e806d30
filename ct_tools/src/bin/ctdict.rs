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

//! `ctdict` - Build-side tool of a tokenized logging project: walks C source
//! trees and produces the module list, the dictionary, and the generated
//! module-index header.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use ct_log::build_dictionary;
use ct_module::{path_abs_to_slash, walk_dirs, Module, ModuleList};

#[derive(Debug, Parser)]
#[command(name = "ctdict", about = "Builds tokenized-logging artifacts from C source trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Walk C source directories and write the module-list JSON.
    Modules(ModulesArgs),
    /// Build the dictionary JSON from source directories or a module list.
    Dict(DictArgs),
    /// Generate the C header of module index defines from a module list.
    Header(HeaderArgs),
}

#[derive(Args, Debug)]
struct ModulesArgs {
    /// Directories to search for C modules.
    #[arg(required = true)]
    dirs: Vec<PathBuf>,

    /// Output file; stdout if absent.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write compact JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct DictArgs {
    /// Directories to search for C modules.
    dirs: Vec<PathBuf>,

    /// Use a previously written module-list JSON instead of walking
    /// directories.
    #[arg(long, value_name = "FILE", conflicts_with = "dirs")]
    modules: Option<PathBuf>,

    /// Output file; stdout if absent.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write compact JSON instead of pretty-printed.
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct HeaderArgs {
    /// Module-list JSON written by `ctdict modules`.
    modules_json: PathBuf,

    /// Output file; stdout if absent.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Modules(args) => run_modules(args),
        Command::Dict(args) => run_dict(args),
        Command::Header(args) => run_header(args),
    }
}

fn run_modules(args: ModulesArgs) -> Result<()> {
    let list = module_list(&args.dirs)?;
    let out = ct_tools::open_output(args.output.as_deref())?;
    ct_tools::write_json(out, &list, args.compact)
}

fn run_dict(args: DictArgs) -> Result<()> {
    let modules: Vec<Module> = match &args.modules {
        Some(path) => ct_tools::read_module_list(path)?.modules,
        None if !args.dirs.is_empty() => walk(&args.dirs)?,
        None => bail!("provide --modules FILE or at least one source directory"),
    };

    let dictionary = build_dictionary(&modules).context("failed to build dictionary")?;
    let out = ct_tools::open_output(args.output.as_deref())?;
    ct_tools::write_json(out, &dictionary, args.compact)
}

fn run_header(args: HeaderArgs) -> Result<()> {
    let list = ct_tools::read_module_list(&args.modules_json)?;
    let header = ct_tools::render_header(&list)?;
    let mut out = ct_tools::open_output(args.output.as_deref())?;
    out.write_all(header.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn walk(dirs: &[PathBuf]) -> Result<Vec<Module>> {
    walk_dirs(dirs).context("failed to walk source directories")
}

fn module_list(dirs: &[PathBuf]) -> Result<ModuleList> {
    let modules = walk(dirs)?;
    let search_paths = dirs
        .iter()
        .map(|dir| path_abs_to_slash(dir))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to resolve search path")?;

    Ok(ModuleList {
        date: Utc::now(),
        search_paths,
        modules,
    })
}

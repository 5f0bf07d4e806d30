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

//! `ct_module` - Walks C source trees and produces an indexed module catalog.
//!
//! A *module* is a `.c` file containing exactly one `CMODULE_DEFINE(name)`
//! invocation.  The walker visits one or more root directories, identifies
//! each module, and returns the union sorted by module name with indices
//! assigned by position, so the catalog is deterministic regardless of
//! filesystem traversal order.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ct_macro::{find_invocations, MacroError, MacroInvocation};
use ct_token::{TokenKind, TokenizeError, Tokenizer};

/// The macro that declares a C source file's module name.
pub const MODULE_DEFINE_MACRO: &str = "CMODULE_DEFINE";

/// A C source file identified by a `CMODULE_DEFINE` invocation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Module {
    /// Position of this module in the name-sorted catalog.
    pub index: u32,

    /// The module name (first argument of `CMODULE_DEFINE`).
    pub name: String,

    /// Absolute path to the source file, with forward slashes.
    pub path: String,
}

/// The persisted module-list artifact.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleList {
    /// When the list was generated.
    pub date: DateTime<Utc>,

    /// The directories that were searched, absolute with forward slashes.
    pub search_paths: Vec<String>,

    /// The sorted, indexed modules.
    pub modules: Vec<Module>,
}

/// Error produced while walking for modules.
#[derive(Debug)]
pub enum WalkError {
    /// A filesystem operation failed.
    Io {
        /// Path the operation was applied to.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Tokenizing a source file failed.
    Tokenize {
        /// The file being tokenized.
        path: String,
        /// The underlying error.
        source: TokenizeError,
    },

    /// Extracting a `CMODULE_DEFINE` invocation failed.
    Macro {
        /// The file being scanned.
        path: String,
        /// The underlying error.
        source: MacroError,
    },

    /// A file contained more than one `CMODULE_DEFINE`.
    MultipleModuleDefinitions {
        /// The offending file.
        path: String,
    },

    /// A `CMODULE_DEFINE` did not have exactly one argument.
    ModuleDefinitionArity {
        /// The offending file.
        path: String,
        /// Number of arguments found.
        count: usize,
    },
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Tokenize { path, source } => write!(f, "{path}: {source}"),
            Self::Macro { path, source } => write!(f, "{path}: {source}"),
            Self::MultipleModuleDefinitions { path } => {
                write!(f, "more than one module definition found in {path}")
            }
            Self::ModuleDefinitionArity { path, count } => write!(
                f,
                "expected a single argument in the module definition in {path} but got {count}"
            ),
        }
    }
}

impl std::error::Error for WalkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Tokenize { source, .. } => Some(source),
            Self::Macro { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Walks multiple root directories and returns all modules found, sorted by
/// name with `index` assigned by position.
///
/// Duplicate module names are accepted; callers should avoid them since only
/// one of the duplicates can ever be addressed by a record's module index.
pub fn walk_dirs<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<Module>, WalkError> {
    let mut modules = Vec::new();
    for root in roots {
        visit_dir(root.as_ref(), &mut modules)?;
    }

    modules.sort_by(|a, b| a.name.cmp(&b.name));
    for (i, module) in modules.iter_mut().enumerate() {
        module.index = i as u32;
    }
    Ok(modules)
}

/// Walks a single root directory; see [`walk_dirs`].
pub fn walk_dir<P: AsRef<Path>>(root: P) -> Result<Vec<Module>, WalkError> {
    walk_dirs(&[root])
}

fn visit_dir(dir: &Path, modules: &mut Vec<Module>) -> Result<(), WalkError> {
    let entries = std::fs::read_dir(dir).map_err(|source| WalkError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| WalkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            visit_dir(&path, modules)?;
            continue;
        }
        if path.extension().map_or(true, |ext| ext != "c") {
            continue;
        }

        let path = path_abs_to_slash(&path).map_err(|source| WalkError::Io {
            path: path.clone(),
            source,
        })?;
        if let Some(name) = scan_file(&path)? {
            modules.push(Module {
                index: 0,
                name,
                path,
            });
        }
    }
    Ok(())
}

/// Scans one source file for its module definition.  Returns `None` if the
/// file defines no module.
fn scan_file(path: &str) -> Result<Option<String>, WalkError> {
    let file = File::open(path).map_err(|source| WalkError::Io {
        path: PathBuf::from(path),
        source,
    })?;

    let mut defines: Vec<MacroInvocation> = Vec::new();
    let mut tokenizer = Tokenizer::new(file);
    while let Some(token) = tokenizer.next_token().map_err(|source| WalkError::Tokenize {
        path: path.to_string(),
        source,
    })? {
        if token.kind != TokenKind::Text {
            continue;
        }
        let found =
            find_invocations(&token, &[MODULE_DEFINE_MACRO]).map_err(|source| WalkError::Macro {
                path: path.to_string(),
                source,
            })?;
        defines.extend(found);
    }

    match defines.as_slice() {
        [] => Ok(None),
        [define] => {
            if define.args.len() != 1 {
                return Err(WalkError::ModuleDefinitionArity {
                    path: path.to_string(),
                    count: define.args.len(),
                });
            }
            Ok(Some(define.args[0].clone()))
        }
        _ => Err(WalkError::MultipleModuleDefinitions {
            path: path.to_string(),
        }),
    }
}

/// Returns `path` made absolute, with all separators converted to `/`.
pub fn path_abs_to_slash(path: &Path) -> io::Result<String> {
    let abs = std::path::absolute(path)?;
    Ok(abs.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Creates a scratch tree under the system temp dir; removed on drop.
    struct Scratch {
        root: PathBuf,
    }

    impl Scratch {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir().join(format!(
                "ct_module_{tag}_{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&root);
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn write(&self, rel: &str, contents: &str) {
            let path = self.root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn modules_are_sorted_by_name_and_indexed() {
        let scratch = Scratch::new("sorted");
        scratch.write("b/m2.c", "CMODULE_DEFINE( beta );\n");
        scratch.write("a/m1.c", "CMODULE_DEFINE( alpha );\n");

        let modules = walk_dir(&scratch.root).unwrap();
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].index, 0);
        assert_eq!(modules[0].name, "alpha");
        assert!(modules[0].path.ends_with("a/m1.c"));
        assert_eq!(modules[1].index, 1);
        assert_eq!(modules[1].name, "beta");
        assert!(modules[1].path.ends_with("b/m2.c"));
    }

    #[test]
    fn files_without_a_module_definition_are_skipped() {
        let scratch = Scratch::new("skip");
        scratch.write("lib.c", "int lib(void) { return 0; }\n");
        scratch.write("mod.c", "CMODULE_DEFINE( only );\n");
        scratch.write("header.h", "CMODULE_DEFINE( not_c );\n");

        let modules = walk_dir(&scratch.root).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "only");
    }

    #[test]
    fn commented_out_definitions_do_not_count() {
        let scratch = Scratch::new("comments");
        scratch.write(
            "mod.c",
            "// CMODULE_DEFINE( old_name );\nCMODULE_DEFINE( current );\n",
        );

        let modules = walk_dir(&scratch.root).unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "current");
    }

    #[test]
    fn two_definitions_in_one_file_are_an_error() {
        let scratch = Scratch::new("dup");
        scratch.write("mod.c", "CMODULE_DEFINE( one );\n\nCMODULE_DEFINE( two );\n");

        assert!(matches!(
            walk_dir(&scratch.root),
            Err(WalkError::MultipleModuleDefinitions { .. })
        ));
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let scratch = Scratch::new("arity");
        scratch.write("mod.c", "CMODULE_DEFINE( a, b );\n");

        assert!(matches!(
            walk_dir(&scratch.root),
            Err(WalkError::ModuleDefinitionArity { count: 2, .. })
        ));
    }

    #[test]
    fn module_list_json_round_trips() {
        let list = ModuleList {
            date: Utc::now(),
            search_paths: vec!["/src".to_string()],
            modules: vec![Module {
                index: 0,
                name: "main".to_string(),
                path: "/src/main.c".to_string(),
            }],
        };

        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("\"searchPaths\""));
        let back: ModuleList = serde_json::from_str(&json).unwrap();
        assert_eq!(back.modules, list.modules);
        assert_eq!(back.search_paths, list.search_paths);
    }
}

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

//! End-to-end check of the build and translate flows: walk a source tree,
//! build the dictionary, and run a captured console stream through the
//! translator.

use std::fs;
use std::path::PathBuf;

use ct_log::{build_dictionary, Dictionary, RecordScanner, Translator};
use ct_module::walk_dirs;

struct Scratch {
    root: PathBuf,
}

impl Scratch {
    fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("ct_tools_{tag}_{}", std::process::id()));
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

const BLINK_C: &str = r#"#include "ctlog.h"

CMODULE_DEFINE( blink );

void
blink_toggle( bool on )
{
    CTLOG_VAR_DEBUG( "led=%t", 1, CTLOG_TYPE_BOOL( on ) );
}
"#;

const MAIN_C: &str = r#"#include "ctlog.h"

CMODULE_DEFINE( main );

int
main( void )
{
    CTLOG_INFO( "booted" );
    CTLOG_VAR_INFO( "temp=%d name=%s", 2, CTLOG_TYPE_INT( t ), CTLOG_TYPE_STRING( n ) );
    return 0;
}
"#;

fn build(scratch: &Scratch) -> Dictionary {
    scratch.write("src/main.c", MAIN_C);
    scratch.write("src/drivers/blink.c", BLINK_C);
    scratch.write("src/drivers/blink.h", "void blink_toggle(bool);\n");

    let modules = walk_dirs(&[scratch.root.join("src")]).unwrap();
    build_dictionary(&modules).unwrap()
}

#[test]
fn dictionary_covers_every_logging_line() {
    let scratch = Scratch::new("dict");
    let dictionary = build(&scratch);

    // Modules are sorted by name: blink before main.
    assert_eq!(dictionary.modules.len(), 2);
    assert_eq!(dictionary.modules[0].name, "blink");
    assert_eq!(dictionary.modules[0].index, 0);
    assert_eq!(dictionary.modules[1].name, "main");
    assert_eq!(dictionary.modules[1].index, 1);

    assert_eq!(dictionary.modules[0].lines.len(), 1);
    assert_eq!(dictionary.modules[0].lines[0].format_string, "led=%t");
    assert_eq!(dictionary.modules[1].lines.len(), 2);
    assert_eq!(dictionary.modules[1].lines[0].format_string, "booted");
    assert_eq!(
        dictionary.modules[1].lines[1].format_string,
        "temp=%d name=%s"
    );
}

#[test]
fn console_stream_translates_end_to_end() {
    let scratch = Scratch::new("translate");
    let dictionary = build(&scratch);

    let boot_line = dictionary.modules[1].lines[0].number;
    let temp_line = dictionary.modules[1].lines[1].number;
    let led_line = dictionary.modules[0].lines[0].number;

    let stream = format!(
        "bootloader v1.2\n\
         $TL00,0,I,1,{boot_line},0,\n\
         $TL00,1,I,1,{temp_line},2,2,-7,3,^\0sensor A$\0,\n\
         $TL00,2,D,0,{led_line},1,0,1,\n\
         {{\"seq\":3,\"lvl\":\"D\",\"mi\":0,\"ml\":{led_line},\"args\":[{{\"t\":0,\"v\":false}}]}}\n"
    );

    let translator = Translator::new(dictionary.modules);
    let mut rendered = Vec::new();
    let mut scanner = RecordScanner::new(stream.as_bytes());
    while let Some(line) = scanner.next_record().unwrap() {
        rendered.push(translator.translate_line(&line).unwrap());
    }

    assert_eq!(
        rendered,
        vec![
            "bootloader v1.2".to_string(),
            "booted".to_string(),
            "temp=-7 name=sensor A".to_string(),
            "led=true".to_string(),
            "led=false".to_string(),
        ],
    );
}

#[test]
fn dictionary_json_survives_persistence() {
    let scratch = Scratch::new("persist");
    let dictionary = build(&scratch);

    let mut encoded = Vec::new();
    ct_tools::write_json(&mut encoded, &dictionary, false).unwrap();
    let reloaded: Dictionary = serde_json::from_slice(&encoded).unwrap();
    assert_eq!(reloaded.modules, dictionary.modules);

    // The translator works the same from the reloaded artifact.
    let line = dictionary.modules[1].lines[0].number;
    let translator = Translator::new(reloaded.modules);
    let framed = format!("$TL00,0,I,1,{line},0,");
    assert_eq!(translator.translate_line(framed.as_bytes()).unwrap(), "booted");
}

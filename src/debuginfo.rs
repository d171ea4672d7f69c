//! Pulls LLVM debug metadata out of the line stream.
//!
//! Metadata definitions are blanked (not removed) so every later stage
//! still reports the original line numbers. `, !dbg !N` annotations are
//! stripped from instructions and remembered per IR line.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;

static RE_HAS_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\d+ = metadata .*").unwrap());
static RE_DBG_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ +.*, !dbg !(\d+)( +; \[#uses=\d+\])?$").unwrap());
static RE_DBG_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r", !dbg !\d+").unwrap());
static RE_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!(\d+) = metadata !\{i32 (\d+), i32 \d+, metadata !(\d+), .*\}").unwrap()
});
static RE_LEXICAL_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^!(\d+) = metadata !\{i32 \d+, metadata !\d+, i32 \d+, i32 \d+, metadata !(\d+), i32 \d+\} ; \[ DW_TAG_lexical_block \]$",
    )
    .unwrap()
});
static RE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^!(\d+) = metadata !\{i32 \d+, metadata !\d+, metadata !"([^"]+)", metadata !"([^"]+)", metadata !\d+\} ; \[ DW_TAG_file_type \]$"#,
    )
    .unwrap()
});
static RE_NAMED_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!llvm\.dbg\.\w+ = .*$").unwrap());
static RE_ANY_METADATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^!\d+ = metadata !\{.*$").unwrap());
static RE_DBG_DECLARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ +call void @llvm\.dbg\.declare\(metadata .*$").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub name: String,
    pub directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub line_to_metadata: IndexMap<usize, String>,
    pub source_lines: IndexMap<String, usize>,
    pub parents: IndexMap<String, String>,
    pub files: IndexMap<String, SourceFile>,
}

impl DebugInfo {
    pub fn is_empty(&self) -> bool {
        self.line_to_metadata.is_empty() && self.source_lines.is_empty() && self.files.is_empty()
    }

    /// Maps an IR line back to the C/C++ source line it was compiled from.
    pub fn source_location(&self, ir_line: usize) -> Option<SourceLocation> {
        let id = self.line_to_metadata.get(&ir_line)?;
        let line = *self.source_lines.get(id)?;
        let mut file = None;
        let mut current = id.as_str();
        for _ in 0..=self.parents.len() {
            if let Some(f) = self.files.get(current) {
                file = Some(format!("{}/{}", f.directory, f.name));
                break;
            }
            match self.parents.get(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Some(SourceLocation { file, line })
    }
}

pub struct Stage1Result {
    pub lines: Vec<String>,
    pub debug: DebugInfo,
}

pub fn stage1(lines: &[String], base_line: usize) -> Stage1Result {
    let mut info = DebugInfo::default();
    if !lines.iter().any(|l| RE_HAS_METADATA.is_match(l)) {
        return Stage1Result {
            lines: lines.to_vec(),
            debug: info,
        };
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let line_num = i + 1 + base_line;

        // declares carry a `!dbg` suffix of their own in newer output
        if RE_DBG_DECLARE.is_match(line) {
            out.push(String::new());
            continue;
        }

        if let Some(caps) = RE_DBG_ANNOTATION.captures(line) {
            info.line_to_metadata.insert(line_num, caps[1].to_string());
            out.push(RE_DBG_SUFFIX.replace(line, "").to_string());
            continue;
        }

        if let Some(caps) = RE_LOCATION.captures(line) {
            if let Ok(source_line) = caps[2].parse::<usize>() {
                info.source_lines.insert(caps[1].to_string(), source_line);
            }
            info.parents.insert(caps[1].to_string(), caps[3].to_string());
        } else if let Some(caps) = RE_LEXICAL_BLOCK.captures(line) {
            info.parents.insert(caps[1].to_string(), caps[2].to_string());
        } else if let Some(caps) = RE_FILE.captures(line) {
            info.files.insert(
                caps[1].to_string(),
                SourceFile {
                    name: caps[2].to_string(),
                    directory: caps[3].to_string(),
                },
            );
        }

        if RE_ANY_METADATA.is_match(line) || RE_NAMED_METADATA.is_match(line) {
            out.push(String::new());
        } else {
            out.push(line.clone());
        }
    }

    debug!(
        annotated = info.line_to_metadata.len(),
        files = info.files.len(),
        "extracted debug metadata"
    );
    Stage1Result {
        lines: out,
        debug: info,
    }
}

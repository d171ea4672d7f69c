//! Raw lines to logical lines.
//!
//! Joins continuation lines onto the statement they belong to and, in lazy
//! mode, captures whole function bodies as stubs instead of forwarding them.

use crate::error::{FrontendError, Result};
use crate::ir::FunctionStub;
use crate::parse::{parse_header, ParseContext};
use crate::token::tokenize_line;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static RE_INVOKE_TARGETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ +to\b").unwrap());
static RE_SWITCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ +switch ").unwrap());
static RE_SWITCH_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ +\]").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    pub text: String,
    pub line_num: usize,
}

#[derive(Debug, Default)]
pub struct Assembled {
    pub lines: Vec<LogicalLine>,
    pub stubs: Vec<FunctionStub>,
}

struct OpenFunction {
    line_num: usize,
    lines: Vec<String>,
}

fn opens_jump_table(text: &str) -> bool {
    text.matches('[').count() > text.matches(']').count()
}

fn append(lines: &mut [LogicalLine], text: &str) -> bool {
    match lines.last_mut() {
        Some(last) => {
            last.text.push(' ');
            last.text.push_str(text.trim());
            true
        }
        None => false,
    }
}

pub fn assemble(raw: &[String], base_line: usize, lazy: bool, ctx: &mut ParseContext) -> Result<Assembled> {
    let mut out = Assembled::default();
    let mut function: Option<OpenFunction> = None;
    let mut in_jump_table = false;

    for (i, text) in raw.iter().enumerate() {
        let line_num = i + 1 + base_line;

        if lazy {
            if function.is_none() && text.starts_with("define ") {
                function = Some(OpenFunction {
                    line_num,
                    lines: Vec::new(),
                });
            }
            if let Some(open) = function.as_mut() {
                open.lines.push(text.clone());
                if text.starts_with('}') {
                    if let Some(open) = function.take() {
                        out.stubs.push(make_stub(open, ctx)?);
                    }
                }
                continue;
            }
        }

        if text.trim().is_empty() {
            continue;
        }

        if in_jump_table {
            append(&mut out.lines, text);
            if RE_SWITCH_END.is_match(text) {
                in_jump_table = false;
            }
            continue;
        }

        if RE_INVOKE_TARGETS.is_match(text) && append(&mut out.lines, text) {
            continue;
        }

        if RE_SWITCH.is_match(text) && opens_jump_table(text) {
            in_jump_table = true;
        }
        out.lines.push(LogicalLine {
            text: text.clone(),
            line_num,
        });
    }

    if let Some(open) = function {
        return Err(FrontendError::invariant(
            open.line_num,
            "function body is never closed",
        ));
    }
    if in_jump_table {
        let line = out.lines.last().map_or(base_line, |l| l.line_num);
        return Err(FrontendError::invariant(line, "switch table is never closed"));
    }
    Ok(out)
}

fn make_stub(open: OpenFunction, ctx: &mut ParseContext) -> Result<FunctionStub> {
    let header = tokenize_line(&open.lines[0], open.line_num)?;
    let (ident, header) = parse_header(&header, ctx)?;
    debug!(function = %ident, line = open.line_num, lines = open.lines.len(), "deferred function body");
    Ok(FunctionStub {
        ident,
        params: header.params,
        has_var_args: header.has_var_args,
        line_num: open.line_num,
        lines: open.lines,
    })
}

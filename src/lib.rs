pub mod config;
pub mod debuginfo;
pub mod error;
pub mod ir;
pub mod lines;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod token;
pub mod triage;
pub mod types;

use config::{Config, Dialect};
use debuginfo::DebugInfo;
use error::Result;
use ir::{FunctionStub, Node};
use parse::ParseContext;
use serde::Serialize;
use tracing::{debug, debug_span, info};
use types::PendingTypes;

/// Everything the front end hands to the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub dialect: Dialect,
    pub nodes: Vec<Node>,
    pub stubs: Vec<FunctionStub>,
    pub types: PendingTypes,
    #[serde(skip_serializing_if = "DebugInfo::is_empty")]
    pub debug: DebugInfo,
}

pub fn intertype(text: &str, config: &Config) -> Result<Output> {
    // Stage 0
    let lines = normalize::stage0(text, config.fake_x86_fp80);

    let mut ctx = ParseContext::new();
    intertype_lines(&lines, config, &mut ctx)
}

/// Runs stages 1 onward over already split lines, collecting types into
/// `ctx`.
pub fn intertype_lines(lines: &[String], config: &Config, ctx: &mut ParseContext) -> Result<Output> {
    let _span = debug_span!("intertype", lines = lines.len()).entered();
    let dialect = config.resolve_dialect(lines);

    // Stage 1
    let debuginfo::Stage1Result {
        lines: clean_lines,
        debug,
    } = debuginfo::stage1(lines, 0);

    // Stages 2-7
    let lazy = !config.parse_function_bodies;
    let processed = pipeline::run(clean_lines, 0, lazy, ctx)?;

    info!(
        nodes = processed.nodes.len(),
        stubs = processed.stubs.len(),
        types = ctx.types.len(),
        ?dialect,
        "front end finished"
    );
    Ok(Output {
        dialect,
        nodes: processed.nodes,
        stubs: processed.stubs,
        types: ctx.types.clone(),
        debug,
    })
}

/// Fully parses one function body captured in lazy mode. Line numbers in
/// the returned nodes are source line numbers.
pub fn parse_function(stub: &FunctionStub, ctx: &mut ParseContext) -> Result<Vec<Node>> {
    let _span = debug_span!("parse_function", function = %stub.ident).entered();
    let base_line = stub.line_num.saturating_sub(1);
    let processed = pipeline::run(stub.lines.clone(), base_line, false, ctx)?;
    debug!(nodes = processed.nodes.len(), "function body parsed");
    Ok(processed.nodes)
}

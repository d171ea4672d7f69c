//! Construct parsers, one per triage category.
//!
//! Every parser takes the classified line and the shared [`ParseContext`]
//! and returns one node. Types seen along the way go into the context's
//! pending-type registry.

mod call;
mod control;
mod function;
mod global;
mod math;
mod memory;
pub mod segment;

pub use function::parse_header;
pub use math::MATHOPS;

use crate::error::{FrontendError, Result};
use crate::ir::Node;
use crate::token::{Token, TokenizedLine};
use crate::triage::Category;
use crate::types::PendingTypes;

#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    pub types: PendingTypes,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn need(&mut self, ty: &str) {
        self.types.insert(ty);
    }
}

/// Parses a classified line. `Discard` yields nothing. `Assign` lines are
/// split by the pipeline before they get here.
pub fn parse_construct(
    category: Category,
    line: &TokenizedLine,
    ctx: &mut ParseContext,
) -> Result<Option<Node>> {
    let node = match category {
        Category::Discard => return Ok(None),
        Category::Assign => {
            return Err(FrontendError::invariant(
                line.line_num,
                "assignment reached a construct parser",
            ))
        }
        Category::Store => memory::parse_store(line, ctx)?,
        Category::Load => memory::parse_load(line, ctx)?,
        Category::Alloca => memory::parse_alloca(line, ctx)?,
        Category::GetElementPtr => memory::parse_getelementptr(line, ctx)?,
        Category::ExtractValue => memory::parse_extractvalue(line, ctx)?,
        Category::Bitcast => math::parse_bitcast(line, ctx)?,
        Category::Mathops => math::parse_mathop(line, ctx)?,
        Category::Phi => math::parse_phi(line, ctx)?,
        Category::Branch => control::parse_branch(line, ctx)?,
        Category::Return => control::parse_return(line, ctx)?,
        Category::Switch => control::parse_switch(line, ctx)?,
        Category::IndirectBr => control::parse_indirectbr(line, ctx)?,
        Category::Unreachable => control::parse_unreachable(line),
        Category::Label => function::parse_label(line)?,
        Category::External => function::parse_external(line, ctx)?,
        Category::FuncHeader => function::parse_function_header(line, ctx)?,
        Category::FuncEnd => function::parse_function_end(line),
        Category::Global => global::parse_global(line, ctx)?,
        Category::Call => call::parse_call(line, ctx)?,
        Category::Invoke => call::parse_invoke(line, ctx)?,
    };
    Ok(Some(node))
}

/// Positional token lookup that reports a missing token instead of panicking.
fn token_at<'a>(tokens: &'a [Token], index: usize, line: &TokenizedLine) -> Result<&'a Token> {
    tokens.get(index).ok_or_else(|| {
        FrontendError::invariant_at(
            line.line_num,
            &format!("expected a token at position {}", index),
            tokens,
        )
    })
}

/// Removes `word` wherever it sits among the first `within` tokens.
fn strip_qualifier(tokens: &mut Vec<Token>, word: &str, within: usize) {
    if let Some(index) = tokens
        .iter()
        .take(within)
        .position(|t| t.group.is_none() && t.is(word))
    {
        tokens.remove(index);
    }
}

//! Line classification.
//!
//! An ordered, first-match table over the line's indentation and a few
//! token features. Order matters: several categories overlap (a `call`
//! matches at any indentation) and later stages rely on this priority.

use crate::error::{FrontendError, Result};
use crate::parse::MATHOPS;
use crate::token::{Indent, Token, TokenizedLine};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Store,
    Assign,
    Branch,
    Return,
    Switch,
    Unreachable,
    IndirectBr,
    Load,
    Mathops,
    Bitcast,
    GetElementPtr,
    Alloca,
    ExtractValue,
    Phi,
    Label,
    External,
    Global,
    FuncHeader,
    FuncEnd,
    Call,
    Discard,
    Invoke,
}

/// Token features the rules look at.
struct Shape<'a> {
    tokens: &'a [Token],
}

impl Shape<'_> {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn text(&self, index: usize) -> &str {
        self.tokens.get(index).map_or("", |t| t.text.as_str())
    }

    fn first_or_second(&self, word: &str) -> bool {
        self.text(0) == word || self.text(1) == word
    }

    /// An `=` before any trailing comment.
    fn has_equals(&self) -> bool {
        self.tokens
            .iter()
            .take_while(|t| !(t.group.is_none() && t.is(";")))
            .any(|t| t.group.is_none() && t.is("="))
    }
}

const TABLE: &[(Option<Indent>, Category)] = &[
    (Some(Indent::Statement), Category::Store),
    (Some(Indent::Statement), Category::Assign),
    (Some(Indent::Statement), Category::Branch),
    (Some(Indent::Statement), Category::Return),
    (Some(Indent::Statement), Category::Switch),
    (Some(Indent::Statement), Category::Unreachable),
    (Some(Indent::Statement), Category::IndirectBr),
    (Some(Indent::Continuation), Category::Load),
    (Some(Indent::Continuation), Category::Mathops),
    (Some(Indent::Continuation), Category::Bitcast),
    (Some(Indent::Continuation), Category::GetElementPtr),
    (Some(Indent::Continuation), Category::Alloca),
    (Some(Indent::Continuation), Category::ExtractValue),
    (Some(Indent::Continuation), Category::Phi),
    (Some(Indent::TopLevel), Category::Label),
    (Some(Indent::TopLevel), Category::External),
    (Some(Indent::TopLevel), Category::Global),
    (Some(Indent::TopLevel), Category::FuncHeader),
    (Some(Indent::TopLevel), Category::FuncEnd),
    (None, Category::Call),
    (None, Category::Discard),
    (None, Category::Invoke),
];

impl Category {
    fn matches(self, s: &Shape) -> bool {
        match self {
            Category::Store => s.len() >= 5 && s.first_or_second("store"),
            Category::Assign => s.len() >= 3 && s.has_equals(),
            Category::Branch => s.len() >= 3 && s.text(0) == "br",
            Category::Return => s.len() >= 2 && s.text(0) == "ret",
            Category::Switch => s.len() >= 2 && s.text(0) == "switch",
            Category::Unreachable => s.text(0) == "unreachable",
            Category::IndirectBr => s.len() >= 3 && s.text(0) == "indirectbr",
            Category::Load => s.len() >= 3 && s.first_or_second("load"),
            Category::Mathops => s.len() >= 3 && MATHOPS.contains(&s.text(0)),
            Category::Bitcast => s.len() >= 3 && s.text(0) == "bitcast",
            Category::GetElementPtr => s.len() >= 3 && s.text(0) == "getelementptr",
            Category::Alloca => s.len() >= 2 && s.text(0) == "alloca",
            Category::ExtractValue => s.len() >= 3 && s.text(0) == "extractvalue",
            Category::Phi => s.len() >= 3 && s.text(0) == "phi",
            Category::Label => {
                let first = s.tokens.first();
                first.is_some_and(|t| t.group.is_none() && t.text.ends_with(':'))
                    || (s.len() >= 3 && s.text(1) == "<label>")
            }
            Category::External => s.len() >= 4 && s.text(0) == "declare",
            Category::Global => s.len() >= 3 && s.text(1) == "=",
            Category::FuncHeader => {
                s.len() >= 4 && s.text(0) == "define" && s.text(s.len() - 1) == "{"
            }
            Category::FuncEnd => s.text(0) == "}",
            Category::Call => s.len() >= 3 && s.first_or_second("call"),
            Category::Discard => s.text(0) == ";" || s.text(0) == "target",
            Category::Invoke => s.len() >= 3 && s.text(0) == "invoke",
        }
    }
}

pub fn triage(line: &TokenizedLine) -> Result<Category> {
    let shape = Shape {
        tokens: &line.tokens,
    };
    TABLE
        .iter()
        .filter(|(indent, _)| indent.map_or(true, |i| i == line.indent))
        .map(|&(_, category)| category)
        .find(|category| category.matches(&shape))
        .ok_or_else(|| FrontendError::UnsupportedConstruct {
            line: line.line_num,
            text: line.text.clone(),
        })
}

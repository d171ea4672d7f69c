//! Work-list driver.
//!
//! Each item is tagged with the stage it waits for. Successors go to the
//! front of the queue, so a line is resolved completely (assignment
//! included) before the next one starts and nodes come out in source order.

use crate::error::{FrontendError, Result};
use crate::ir::{Assignment, FunctionStub, Node};
use crate::lines::{self, LogicalLine};
use crate::parse::{self, ParseContext};
use crate::token::{render, tokenize_line, Indent, TokenizedLine};
use crate::triage::{triage, Category};
use std::collections::VecDeque;
use tracing::{debug, trace};

enum WorkItem {
    Raw(Vec<String>),
    Logical(LogicalLine),
    Tokenized(TokenizedLine),
    Classified(TokenizedLine, Category),
}

#[derive(Debug, Default)]
pub struct Processed {
    pub nodes: Vec<Node>,
    pub stubs: Vec<FunctionStub>,
}

pub fn run(lines: Vec<String>, base_line: usize, lazy: bool, ctx: &mut ParseContext) -> Result<Processed> {
    let mut out = Processed::default();
    let mut queue = VecDeque::from([WorkItem::Raw(lines)]);

    while let Some(item) = queue.pop_front() {
        match item {
            WorkItem::Raw(raw) => {
                let assembled = lines::assemble(&raw, base_line, lazy, ctx)?;
                out.stubs.extend(assembled.stubs);
                for line in assembled.lines.into_iter().rev() {
                    queue.push_front(WorkItem::Logical(line));
                }
            }
            WorkItem::Logical(line) => {
                let tokenized = tokenize_line(&line.text, line.line_num)?;
                trace!(line = line.line_num, tokens = tokenized.tokens.len(), "tokenized");
                queue.push_front(WorkItem::Tokenized(tokenized));
            }
            WorkItem::Tokenized(line) => {
                let category = triage(&line)?;
                debug!(line = line.line_num, ?category, "triaged");
                queue.push_front(WorkItem::Classified(line, category));
            }
            WorkItem::Classified(line, category) => {
                if let Some(node) = resolve(&line, category, ctx)? {
                    out.nodes.push(node);
                }
            }
        }
    }
    Ok(out)
}

fn resolve(line: &TokenizedLine, category: Category, ctx: &mut ParseContext) -> Result<Option<Node>> {
    if category != Category::Assign {
        return parse::parse_construct(category, line, ctx);
    }
    let (assignment, expression) = split_assignment(line)?;
    let child_category = triage(&expression)?;
    debug!(line = line.line_num, category = ?child_category, "assignment");
    match parse::parse_construct(child_category, &expression, ctx)? {
        Some(child) => Ok(Some(reintegrate(assignment, child))),
        None => Err(FrontendError::invariant_at(
            line.line_num,
            "assignment without a value",
            &line.tokens,
        )),
    }
}

/// Splits `target = expression` into its two halves. The expression is
/// re-indented as a continuation so it triages as a right-hand side.
pub fn split_assignment(line: &TokenizedLine) -> Result<(Assignment, TokenizedLine)> {
    let eq = line
        .tokens
        .iter()
        .position(|t| t.group.is_none() && t.is("="))
        .filter(|&eq| eq > 0)
        .ok_or_else(|| FrontendError::invariant_at(line.line_num, "malformed assignment", &line.tokens))?;
    let assignment = Assignment {
        ident: line.tokens[eq - 1].text.clone(),
        line_num: line.line_num,
    };
    let tokens = line.tokens[eq + 1..].to_vec();
    let expression = TokenizedLine {
        text: render(&tokens),
        line_num: line.line_num,
        indent: Indent::Continuation,
        tokens,
    };
    Ok((assignment, expression))
}

/// The child's construct under the parent's name and line.
pub fn reintegrate(parent: Assignment, child: Node) -> Node {
    Node {
        line_num: parent.line_num,
        ident: Some(parent.ident),
        assigned: true,
        kind: child.kind,
    }
}

use super::segment::{parse_segment, split_token_list};
use super::{token_at, ParseContext};
use crate::error::{FrontendError, Result};
use crate::ir::{Branch, Node, NodeKind, SwitchCase};
use crate::token::{split_commas, Encloser, Token, TokenizedLine};
use crate::types;

/// `br label %dest` or `br i1 cond, label %true, label %false`
pub fn parse_branch(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let branch = if token_at(tokens, 1, line)?.is("label") {
        Branch::Unconditional {
            label: token_at(tokens, 2, line)?.text.clone(),
        }
    } else {
        let Some(comma) = tokens.iter().position(|t| t.is_separator()) else {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "conditional branch without labels",
                tokens,
            ));
        };
        Branch::Conditional {
            condition: parse_segment(&tokens[1..comma], line.line_num, ctx)?,
            label_true: token_at(tokens, comma + 2, line)?.text.clone(),
            label_false: token_at(tokens, comma + 5, line)?.text.clone(),
        }
    };
    Ok(Node::new(line.line_num, None, NodeKind::Branch(branch)))
}

/// `ret void` or `ret T value`
pub fn parse_return(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let ty = token_at(tokens, 1, line)?.text.clone();
    let value = if types::is_void_type(&ty) {
        None
    } else {
        match split_token_list(&tokens[1..]).first() {
            Some(segment) if segment.len() > 1 => Some(parse_segment(segment, line.line_num, ctx)?),
            _ => None,
        }
    };
    ctx.need(&ty);
    Ok(Node::new(line.line_num, None, NodeKind::Return { ty, value }))
}

/// `switch T value, label %default [ T v, label %dest ... ]`
pub fn parse_switch(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let ty = token_at(tokens, 1, line)?.text.clone();
    let value = token_at(tokens, 2, line)?.text.clone();
    let default_label = token_at(tokens, 5, line)?.text.clone();
    let table: &[Token] = match tokens.get(6) {
        Some(t) if t.encloser() == Some(Encloser::Bracket) => t.inner().unwrap_or_default(),
        _ => &[],
    };
    // each case is `T value , label %dest`
    let mut switch_labels = Vec::new();
    for case in table.chunks(5) {
        if case.len() < 5 || !case[2].is_separator() {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "malformed switch case",
                case,
            ));
        }
        switch_labels.push(SwitchCase {
            value: case[1].text.clone(),
            label: case[4].text.clone(),
        });
    }
    ctx.need(&ty);

    Ok(Node::new(
        line.line_num,
        Some(value.clone()),
        NodeKind::Switch {
            ty,
            value,
            default_label,
            switch_labels,
        },
    ))
}

/// `indirectbr T* address, [ label %a, label %b ]`
pub fn parse_indirectbr(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let ty = token_at(tokens, 1, line)?.text.clone();
    let pointer = match split_token_list(&tokens[1..]).first() {
        Some(segment) => parse_segment(segment, line.line_num, ctx)?,
        None => {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "indirectbr without an address",
                tokens,
            ))
        }
    };
    let destinations = tokens
        .iter()
        .find(|t| t.encloser() == Some(Encloser::Bracket))
        .and_then(|t| t.inner())
        .map(|inner| {
            split_commas(inner)
                .into_iter()
                .filter_map(|dest| dest.last().map(|t| t.text.clone()))
                .collect()
        })
        .unwrap_or_default();
    ctx.need(&ty);

    let ident = pointer.ident().map(str::to_string);
    Ok(Node::new(
        line.line_num,
        ident,
        NodeKind::IndirectBr {
            ty,
            pointer,
            destinations,
        },
    ))
}

pub fn parse_unreachable(line: &TokenizedLine) -> Node {
    Node::new(line.line_num, None, NodeKind::Unreachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Value;
    use crate::parse::testing::statement;

    #[test]
    fn test_unconditional_branch() {
        let mut ctx = ParseContext::new();
        let node = parse_branch(&statement("br label %loop"), &mut ctx).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Branch(Branch::Unconditional {
                label: "%loop".to_string()
            })
        );
    }

    #[test]
    fn test_conditional_branch() {
        let mut ctx = ParseContext::new();
        let node = parse_branch(&statement("br i1 %cmp, label %then, label %else"), &mut ctx).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Branch(Branch::Conditional {
                condition: Value::scalar("i1", "%cmp"),
                label_true: "%then".to_string(),
                label_false: "%else".to_string(),
            })
        );
    }

    #[test]
    fn test_return() {
        let mut ctx = ParseContext::new();
        let node = parse_return(&statement("ret void"), &mut ctx).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Return {
                ty: "void".to_string(),
                value: None
            }
        );
        let node = parse_return(&statement("ret i32 %r"), &mut ctx).unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Return {
                ty: "i32".to_string(),
                value: Some(Value::scalar("i32", "%r"))
            }
        );
    }

    #[test]
    fn test_switch_cases_in_order() {
        let mut ctx = ParseContext::new();
        let line = statement("switch i32 %x, label %default [ i32 0, label %a  i32 1, label %b ]");
        let node = parse_switch(&line, &mut ctx).unwrap();
        let NodeKind::Switch {
            default_label,
            switch_labels,
            ..
        } = node.kind
        else {
            panic!("expected switch");
        };
        assert_eq!(default_label, "%default");
        let pairs: Vec<(&str, &str)> = switch_labels
            .iter()
            .map(|c| (c.value.as_str(), c.label.as_str()))
            .collect();
        assert_eq!(pairs, vec![("0", "%a"), ("1", "%b")]);
    }

    #[test]
    fn test_empty_switch_table() {
        let mut ctx = ParseContext::new();
        let node = parse_switch(&statement("switch i8 %c, label %d [ ]"), &mut ctx).unwrap();
        let NodeKind::Switch { switch_labels, .. } = node.kind else {
            panic!("expected switch");
        };
        assert!(switch_labels.is_empty());
    }

    #[test]
    fn test_indirectbr() {
        let mut ctx = ParseContext::new();
        let line = statement("indirectbr i8* %addr, [label %bb1, label %bb2]");
        let node = parse_indirectbr(&line, &mut ctx).unwrap();
        assert_eq!(node.ident.as_deref(), Some("%addr"));
        let NodeKind::IndirectBr { destinations, .. } = node.kind else {
            panic!("expected indirectbr");
        };
        assert_eq!(destinations, vec!["%bb1", "%bb2"]);
    }
}

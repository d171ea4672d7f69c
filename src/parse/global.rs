use super::segment::{
    clean_out_tokens, is_parsable, parse_function_call, scan_const, split_token_list,
    GLOBAL_MODIFIERS, LINKAGES, VISIBILITIES,
};
use super::{token_at, ParseContext};
use crate::error::{FrontendError, Result};
use crate::ir::{Constant, Node, NodeKind};
use crate::token::{render, split_commas, Encloser, Token, TokenizedLine};
use crate::types;

const GLOBAL_CTORS: &str = "@llvm.global_ctors";

/// Top-level `name = ...`: an alias, a named type or a global variable.
pub fn parse_global(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let ident = token_at(&line.tokens, 0, line)?.text.clone();
    let kind = token_at(&line.tokens, 2, line)?;
    let node = if kind.is("alias") {
        parse_alias(line, ctx)?
    } else if kind.is("type") {
        parse_type(line, ctx)?
    } else {
        parse_variable(&ident, line, ctx)?
    };
    Ok(Node::new(line.line_num, Some(ident), node))
}

fn parse_alias(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<NodeKind> {
    let mut tokens = line.tokens.clone();
    clean_out_tokens(LINKAGES, &mut tokens, 3);
    clean_out_tokens(VISIBILITIES, &mut tokens, 3);
    let ty = token_at(&tokens, 3, line)?.text.clone();
    let aliasee = token_at(&tokens, 4, line)?.text.clone();
    ctx.need(&ty);
    Ok(NodeKind::Alias { ty, aliasee })
}

fn parse_type(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<NodeKind> {
    ctx.need(&line.tokens[0].text);
    let body = token_at(&line.tokens, 3, line)?;
    let fields_of = |tokens: &[Token]| -> Vec<String> {
        split_commas(tokens).into_iter().map(render).collect()
    };
    let (fields, packed) = match body.encloser() {
        _ if types::is_number_type(&body.text) => (vec![body.text.clone()], false),
        None if body.is("opaque") => (Vec::new(), false),
        Some(Encloser::Angle) => {
            let inner = body.inner().unwrap_or_default();
            match inner.first() {
                Some(brace) if brace.encloser() == Some(Encloser::Brace) => {
                    (fields_of(brace.inner().unwrap_or_default()), true)
                }
                _ => (vec![body.text.clone()], false),
            }
        }
        Some(Encloser::Brace) => (fields_of(body.inner().unwrap_or_default()), false),
        _ => (vec![body.text.clone()], false),
    };
    Ok(NodeKind::Type { fields, packed })
}

fn parse_variable(ident: &str, line: &TokenizedLine, ctx: &mut ParseContext) -> Result<NodeKind> {
    let mut tokens = line.tokens.clone();
    clean_out_tokens(GLOBAL_MODIFIERS, &mut tokens, 3);
    clean_out_tokens(GLOBAL_MODIFIERS, &mut tokens, 2);
    let external = tokens.get(2).is_some_and(|t| t.group.is_none() && t.is("external"));
    if external {
        tokens.remove(2);
        clean_out_tokens(GLOBAL_MODIFIERS, &mut tokens, 2);
    }
    let ty = token_at(&tokens, 2, line)?.text.clone();
    ctx.need(&ty);

    if ident == GLOBAL_CTORS {
        let ctors = match tokens.get(3).and_then(Token::inner) {
            Some(inner) => global_ctors(inner),
            None => Vec::new(),
        };
        return Ok(NodeKind::GlobalVariable {
            ty,
            external,
            value: None,
            ctors: Some(ctors),
        });
    }

    let initializer = tokens
        .get(3)
        .filter(|t| !t.is_separator() && !(t.group.is_none() && t.is(";")));
    let value = match initializer {
        None if external => None,
        None => {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "global without an initializer",
                &tokens,
            ))
        }
        Some(first) => {
            if first.group.is_none() && first.is("c") {
                tokens.remove(3);
            }
            let value = token_at(&tokens, 3, line)?;
            if is_parsable(value) {
                let segment = split_token_list(&tokens[2..])
                    .into_iter()
                    .next()
                    .unwrap_or_default();
                Some(Constant::Expr(parse_function_call(segment, line.line_num, ctx)?))
            } else {
                Some(scan_const(value, &ty, line.line_num, ctx)?)
            }
        }
    };
    Ok(NodeKind::GlobalVariable {
        ty,
        external,
        value,
        ctors: None,
    })
}

/// Each constructor entry is `{ i32 priority, void ()* @fn }`; the function
/// is the entry's last token.
fn global_ctors(entries: &[Token]) -> Vec<String> {
    split_token_list(entries)
        .into_iter()
        .filter_map(|entry| entry.get(1))
        .filter_map(|value| value.inner())
        .filter_map(|inner| inner.last())
        .map(|t| t.text.clone())
        .collect()
}

use super::segment::{comment_start, parse_function_call, parse_segment, split_token_list};
use super::{strip_qualifier, token_at, ParseContext};
use crate::error::{FrontendError, Result};
use crate::ir::{Node, NodeKind};
use crate::token::{Encloser, Group, Token, TokenizedLine};
use crate::types;

/// `store [volatile] T value, T* pointer[, align N]`
pub fn parse_store(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let mut tokens = line.tokens.clone();
    strip_qualifier(&mut tokens, "volatile", 2);
    let value_type = token_at(&tokens, 1, line)?.text.clone();
    let segments = split_token_list(&tokens[1..]);
    let (Some(value), Some(pointer)) = (segments.first(), segments.get(1)) else {
        return Err(FrontendError::invariant_at(
            line.line_num,
            "store needs a value and a pointer",
            &tokens,
        ));
    };
    let pointer_type = token_at(pointer, 0, line)?.text.clone();
    let value = parse_segment(value, line.line_num, ctx)?;
    let pointer = parse_segment(pointer, line.line_num, ctx)?;
    ctx.need(&value_type);
    ctx.need(&pointer_type);

    let ident = pointer.ident().map(str::to_string);
    Ok(Node::new(
        line.line_num,
        ident,
        NodeKind::Store {
            value_type,
            value,
            pointer_type,
            pointer,
        },
    ))
}

/// `load [volatile] T* pointer[, align N]`
pub fn parse_load(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let mut tokens = line.tokens.clone();
    strip_qualifier(&mut tokens, "volatile", 2);
    let pointer_type = token_at(&tokens, 1, line)?.text.clone();
    let value_type = types::remove_pointing(&pointer_type);
    let segments = split_token_list(&tokens[1..]);
    let pointer = match segments.first() {
        Some(segment) => parse_segment(segment, line.line_num, ctx)?,
        None => {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "load without a pointer",
                &tokens,
            ))
        }
    };
    ctx.need(&value_type);
    ctx.need(&pointer_type);

    let ident = pointer.ident().map(str::to_string);
    Ok(Node::new(
        line.line_num,
        ident,
        NodeKind::Load {
            value_type,
            pointer_type,
            pointer,
        },
    ))
}

/// `alloca T[, iN count][, align N]`
pub fn parse_alloca(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let allocated_type = token_at(tokens, 1, line)?.text.clone();
    let allocated_num = match (tokens.get(3), tokens.get(4)) {
        (Some(ty), Some(count)) if types::is_number_type(&ty.text) => count.text.clone(),
        _ => "1".to_string(),
    };
    ctx.need(&allocated_type);

    Ok(Node::new(
        line.line_num,
        None,
        NodeKind::Alloca {
            ty: types::add_pointing(&allocated_type),
            allocated_type,
            allocated_num,
        },
    ))
}

/// `getelementptr [inbounds] T* base, indexes...`
///
/// The operand list has the shape of a constant `getelementptr (...)`, so
/// it is handed to the same parser wrapped as one.
pub fn parse_getelementptr(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let end = comment_start(tokens);
    let Some(first) = tokens[..end].iter().position(|t| types::is_type(&t.text)) else {
        return Err(FrontendError::invariant_at(
            line.line_num,
            "getelementptr without a typed base",
            tokens,
        ));
    };
    let operands = Token {
        text: String::new(),
        group: Some(Group {
            encloser: Encloser::Paren,
            tokens: tokens[first..end].to_vec(),
        }),
    };
    let segment = [
        tokens[first].clone(),
        Token::atom("getelementptr"),
        operands,
    ];
    let expr = parse_function_call(&segment, line.line_num, ctx)?;

    Ok(Node::new(
        line.line_num,
        expr.ident,
        NodeKind::GetElementPtr {
            // refined by the analyzer
            ty: "*".to_string(),
            params: expr.params,
        },
    ))
}

/// `extractvalue T aggregate, index...`
pub fn parse_extractvalue(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let ty = token_at(tokens, 1, line)?.text.clone();
    let aggregate = token_at(tokens, 2, line)?.text.clone();
    let end = comment_start(tokens);
    let indexes = tokens
        .get(4..end)
        .unwrap_or_default()
        .iter()
        .filter(|t| !t.is_separator())
        .map(|t| t.text.clone())
        .collect();
    ctx.need(&ty);

    Ok(Node::new(
        line.line_num,
        None,
        NodeKind::ExtractValue {
            ty,
            aggregate,
            indexes,
        },
    ))
}

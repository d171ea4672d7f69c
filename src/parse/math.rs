use super::segment::{parse_segment, split_token_list};
use super::{token_at, ParseContext};
use crate::error::{FrontendError, Result};
use crate::ir::{Node, NodeKind, PhiParam, Value};
use crate::token::{split_commas, Encloser, Token, TokenizedLine};

/// Arithmetic, comparison, bitwise and conversion opcodes handled by
/// [`parse_mathop`].
pub const MATHOPS: &[&str] = &[
    "add", "sub", "sdiv", "udiv", "mul", "icmp", "zext", "urem", "srem", "fadd", "fsub", "fmul",
    "fdiv", "fcmp", "uitofp", "sitofp", "fpext", "fptrunc", "fptoui", "fptosi", "trunc", "sext",
    "select", "shl", "shr", "ashl", "ashr", "lshr", "lshl", "xor", "or", "and", "ptrtoint",
    "inttoptr",
];

const OVERFLOW_FLAGS: &[&str] = &["nsw", "nuw", "exact"];

pub fn parse_mathop(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let mut tokens = line.tokens.clone();
    let op = token_at(&tokens, 0, line)?.text.clone();
    while tokens
        .get(1)
        .is_some_and(|t| t.group.is_none() && OVERFLOW_FLAGS.contains(&t.text.as_str()))
    {
        tokens.remove(1);
    }
    let mut variant = None;
    if op == "icmp" || op == "fcmp" {
        token_at(&tokens, 1, line)?;
        variant = Some(tokens.remove(1).text);
    }

    let mut params = Vec::new();
    for segment in split_token_list(&tokens[1..]) {
        if segment.is_empty() {
            continue;
        }
        params.push(parse_segment(segment, line.line_num, ctx)?);
    }
    let type_of = |index: usize| -> Result<String> {
        params
            .get(index)
            .and_then(Value::ty)
            .map(str::to_string)
            .ok_or_else(|| {
                FrontendError::invariant_at(
                    line.line_num,
                    &format!("{} is missing operand {}", op, index + 1),
                    &tokens,
                )
            })
    };
    let ty = match op.as_str() {
        "select" => {
            let ty = type_of(1)?;
            if type_of(2)? != ty {
                return Err(FrontendError::invariant_at(
                    line.line_num,
                    "select operands differ in type",
                    &tokens,
                ));
            }
            ty
        }
        "inttoptr" | "ptrtoint" => type_of(1)?,
        _ => type_of(0)?,
    };
    for param in &mut params {
        param.set_ty(&ty);
    }
    ctx.need(&ty);

    Ok(Node::new(
        line.line_num,
        None,
        NodeKind::Mathop {
            op,
            variant,
            ty,
            params,
        },
    ))
}

/// `bitcast T value to U`
pub fn parse_bitcast(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let from_type = token_at(tokens, 1, line)?.text.clone();
    let value = token_at(tokens, 2, line)?.text.clone();
    let ty = token_at(tokens, 4, line)?.text.clone();
    ctx.need(&from_type);
    ctx.need(&ty);

    Ok(Node::new(
        line.line_num,
        Some(value.clone()),
        NodeKind::Bitcast {
            ty,
            from_type,
            value,
        },
    ))
}

/// `phi T [ value, %label ], ...`
pub fn parse_phi(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let ty_token = token_at(tokens, 1, line)?.clone();
    let mut params = Vec::new();
    for incoming in tokens[2..]
        .iter()
        .take_while(|t| !(t.group.is_none() && t.is(";")))
        .filter(|t| t.encloser() == Some(Encloser::Bracket))
    {
        let inner = incoming.inner().unwrap_or_default();
        let parts = split_commas(inner);
        let (Some(value), Some(label)) = (parts.first(), parts.get(1).and_then(|p| p.first()))
        else {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "phi entry needs a value and a label",
                inner,
            ));
        };
        let mut typed: Vec<Token> = vec![ty_token.clone()];
        typed.extend_from_slice(value);
        params.push(PhiParam {
            label: label.text.clone(),
            value: parse_segment(&typed, line.line_num, ctx)?,
        });
    }
    ctx.need(&ty_token.text);

    Ok(Node::new(
        line.line_num,
        None,
        NodeKind::Phi {
            ty: ty_token.text,
            params,
        },
    ))
}

//! Operand and constant sub-parsers shared by the construct parsers.
//!
//! A "segment" is the run of tokens between two commas (or a `to`), e.g.
//! `i32* %x` or `i8* getelementptr inbounds ([3 x i8]* @s, i32 0, i32 0)`.

use super::ParseContext;
use crate::error::{FrontendError, Result};
use crate::ir::{ConstExpr, Constant, Value};
use crate::token::{render, split_commas, Encloser, Token};
use crate::types::{self, UNKNOWN_TYPE};

/// Constant expressions that may appear where an operand is expected.
pub const PARSABLE_LLVM_FUNCTIONS: &[&str] = &[
    "getelementptr",
    "bitcast",
    "inttoptr",
    "ptrtoint",
    "mul",
    "icmp",
    "zext",
    "sub",
    "add",
    "div",
];

pub const LINKAGES: &[&str] = &[
    "private",
    "linker_private",
    "internal",
    "available_externally",
    "linkonce",
    "weak",
    "common",
    "appending",
    "extern_weak",
    "linkonce_odr",
    "weak_odr",
    "externally_visible",
    "dllimport",
    "dllexport",
    "external",
];

pub const VISIBILITIES: &[&str] = &["default", "hidden", "protected"];

pub const CALLING_CONVENTIONS: &[&str] = &[
    "ccc",
    "fastcc",
    "coldcc",
    "cc10",
    "x86_stdcallcc",
    "x86_fastcallcc",
    "x86_thiscallcc",
    "arm_apcscc",
    "arm_aapcscc",
    "arm_aapcs_vfpcc",
];

pub const PARAM_ATTRS: &[&str] = &[
    "zeroext", "signext", "inreg", "byval", "sret", "noalias", "nocapture", "nest",
];

pub const FUNCTION_ATTRS: &[&str] = &[
    "alignstack",
    "alwaysinline",
    "inlinehint",
    "naked",
    "noimplicitfloat",
    "noinline",
    "noredzone",
    "noreturn",
    "nounwind",
    "optsize",
    "readnone",
    "readonly",
    "ssp",
    "sspreq",
];

/// Everything that may sit between `=` and a global's type. `external` is
/// missing on purpose: the global parser records it.
pub const GLOBAL_MODIFIERS: &[&str] = &[
    "private",
    "linker_private",
    "internal",
    "available_externally",
    "linkonce",
    "weak",
    "common",
    "appending",
    "extern_weak",
    "linkonce_odr",
    "weak_odr",
    "dllimport",
    "dllexport",
    "default",
    "hidden",
    "protected",
    "thread_local",
    "unnamed_addr",
    "global",
    "constant",
];

pub fn is_parsable(token: &Token) -> bool {
    token.group.is_none() && PARSABLE_LLVM_FUNCTIONS.contains(&token.text.as_str())
}

/// Removes every token from `set` found at `index`.
pub fn clean_out_tokens(set: &[&str], tokens: &mut Vec<Token>, index: usize) {
    while tokens
        .get(index)
        .is_some_and(|t| t.group.is_none() && set.contains(&t.text.as_str()))
    {
        tokens.remove(index);
    }
}

pub fn find_token(tokens: &[Token], text: &str) -> Option<usize> {
    tokens.iter().position(|t| t.group.is_none() && t.is(text))
}

/// Index of the trailing `;` comment, or the end of the line.
pub fn comment_start(tokens: &[Token]) -> usize {
    find_token(tokens, ";").unwrap_or(tokens.len())
}

/// Splits on `,` and `to`; a `;` ends the list.
pub fn split_token_list(tokens: &[Token]) -> Vec<&[Token]> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_separator() || (token.group.is_none() && token.is("to")) {
            out.push(&tokens[start..i]);
            start = i + 1;
        } else if token.group.is_none() && token.is(";") {
            out.push(&tokens[start..i]);
            return out;
        }
    }
    if start < tokens.len() {
        out.push(&tokens[start..]);
    }
    out
}

/// Drops parameter attributes following the type; reports `byval`.
fn clean_segment(segment: &[Token]) -> (Vec<Token>, bool) {
    let mut segment = segment.to_vec();
    let mut by_val = false;
    while segment.len() > 1 {
        let token = &segment[1];
        if token.group.is_some() {
            break;
        }
        if token.is("byval") {
            by_val = true;
            segment.remove(1);
        } else if PARAM_ATTRS.contains(&token.text.as_str()) {
            segment.remove(1);
        } else if token.is("align") && segment.len() > 3 {
            segment.drain(1..3);
        } else {
            break;
        }
    }
    (segment, by_val)
}

/// Normalizes numeric literals: hex doubles, `null`, booleans and
/// exponent notation. Anything else is returned unchanged.
pub fn parse_numerical(text: &str) -> String {
    match text {
        "null" | "false" => return "0".to_string(),
        "true" => return "1".to_string(),
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x") {
        if hex.len() == 16 {
            if let Ok(bits) = u64::from_str_radix(hex, 16) {
                return format!("{}", f64::from_bits(bits));
            }
        }
        return text.to_string();
    }
    if text.contains(['.', 'e', 'E']) {
        if let Ok(value) = text.parse::<f64>() {
            if value.is_finite() {
                return format!("{}", value);
            }
        }
    }
    text.to_string()
}

/// Parses one operand segment.
pub fn parse_segment(segment: &[Token], line: usize, ctx: &mut ParseContext) -> Result<Value> {
    let Some(first) = segment.first() else {
        return Err(FrontendError::invariant(line, "empty operand"));
    };
    if segment.len() == 1 {
        if types::is_type(&first.text) {
            ctx.need(&first.text);
            return Ok(Value::scalar(first.text.clone(), first.text.clone()));
        }
        return Ok(Value::scalar(UNKNOWN_TYPE, parse_numerical(&first.text)));
    }
    if segment[1].encloser() == Some(Encloser::Brace) {
        ctx.need(&first.text);
        let mut values = Vec::new();
        for part in split_token_list(segment[1].inner().unwrap_or_default()) {
            values.push(parse_segment(part, line, ctx)?);
        }
        return Ok(Value::StructValue {
            ty: first.text.clone(),
            values,
        });
    }
    if is_parsable(first) {
        let mut typed = vec![Token::atom(UNKNOWN_TYPE)];
        typed.extend_from_slice(segment);
        return Ok(Value::Expr(parse_function_call(&typed, line, ctx)?));
    }
    if is_parsable(&segment[1]) {
        return Ok(Value::Expr(parse_function_call(segment, line, ctx)?));
    }
    ctx.need(&first.text);
    Ok(Value::scalar(first.text.clone(), parse_numerical(&segment[1].text)))
}

/// Parses a constant expression written like a call: `type op [variant] (args)`.
pub fn parse_function_call(
    segment: &[Token],
    line: usize,
    ctx: &mut ParseContext,
) -> Result<ConstExpr> {
    let (mut segment, _) = clean_segment(segment);
    if segment.len() < 3 || !is_parsable(&segment[1]) {
        return Err(FrontendError::invariant_at(
            line,
            "not a constant expression",
            &segment,
        ));
    }
    let mut variant = None;
    if segment[2].group.is_none() {
        variant = Some(segment.remove(2).text);
    }
    while segment.get(2).is_some_and(|t| t.group.is_none()) {
        segment.remove(2);
    }
    let Some(args) = segment.get(2).and_then(Token::inner) else {
        return Err(FrontendError::invariant_at(
            line,
            "constant expression without operands",
            &segment,
        ));
    };

    let op = segment[1].text.clone();
    let mut ty = segment[0].text.clone();
    if ty == UNKNOWN_TYPE {
        match op.as_str() {
            "getelementptr" => ty = "*".to_string(),
            "bitcast" | "inttoptr" | "ptrtoint" => {
                if let Some(last) = args.last() {
                    ty = last.text.clone();
                }
            }
            _ => {}
        }
    }
    let params = parse_param_tokens(args, line, ctx)?;
    ctx.need(&ty);
    let ident = params.first().and_then(Value::ident).map(str::to_string);
    Ok(ConstExpr {
        op,
        variant,
        ty,
        params,
        ident,
    })
}

/// `blockaddress(@function, %label)`
pub fn parse_block_address(segment: &[Token], line: usize) -> Result<(String, String)> {
    let inner = segment
        .iter()
        .find_map(|t| match t.encloser() {
            Some(Encloser::Paren) => t.inner(),
            _ => None,
        })
        .ok_or_else(|| FrontendError::invariant_at(line, "blockaddress without operands", segment))?;
    match (inner.first(), inner.get(2)) {
        (Some(func), Some(label)) => Ok((func.text.clone(), label.text.clone())),
        _ => Err(FrontendError::invariant_at(line, "blockaddress needs a function and a label", segment)),
    }
}

/// Parses a parenthesized parameter or argument list.
pub fn parse_param_tokens(
    tokens: &[Token],
    line: usize,
    ctx: &mut ParseContext,
) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    let mut anonymous = 0;
    for segment in split_commas(tokens) {
        if segment.is_empty() {
            continue;
        }
        let (mut segment, by_val) = clean_segment(segment);
        let mut value = if segment.len() == 1 {
            let text = &segment[0].text;
            if text == "..." {
                Value::Varargs
            } else {
                // clang leaves some parameters unnamed; they are numbered
                ctx.need(text);
                let ident = format!("%{}", anonymous);
                anonymous += 1;
                Value::scalar(text.clone(), ident)
            }
        } else if is_parsable(&segment[1]) {
            Value::Expr(parse_function_call(&segment, line, ctx)?)
        } else if segment[1].is("blockaddress") {
            let (func, label) = parse_block_address(&segment, line)?;
            Value::BlockAddress { func, label }
        } else {
            if segment.len() > 2 && segment[2].is("to") {
                segment.truncate(2);
            }
            let (ident, ty) = segment.split_last().map(|(last, rest)| (last, render(rest))).ok_or_else(
                || FrontendError::invariant(line, "empty parameter"),
            )?;
            ctx.need(types::remove_all_pointing(&ty));
            Value::scalar(ty, parse_numerical(&ident.text))
        };
        if by_val {
            value.mark_by_val();
        }
        out.push(value);
    }
    Ok(out)
}

/// Initializer of a global of type `ty`.
pub fn scan_const(value: &Token, ty: &str, line: usize, ctx: &mut ParseContext) -> Result<Constant> {
    if types::is_number_type(ty) || types::pointing_levels(ty) >= 1 {
        return Ok(Constant::Value {
            ty: ty.to_string(),
            value: parse_numerical(&value.text),
        });
    }
    if value.is("zeroinitializer") || value.is("undef") {
        return Ok(Constant::EmptyStruct { ty: ty.to_string() });
    }
    if value.group.is_none() && value.text.starts_with('"') {
        return Ok(Constant::String {
            ty: ty.to_string(),
            text: strip_quotes(&value.text),
        });
    }
    match (value.encloser(), value.inner()) {
        (Some(Encloser::Brace), Some(inner)) => Ok(Constant::Struct {
            ty: ty.to_string(),
            contents: handle_segments(inner, line, ctx)?,
        }),
        (Some(Encloser::Angle), Some(inner)) => match inner.first() {
            Some(packed) if packed.encloser() == Some(Encloser::Brace) => Ok(Constant::Struct {
                ty: ty.to_string(),
                contents: handle_segments(packed.inner().unwrap_or_default(), line, ctx)?,
            }),
            _ => Ok(Constant::List {
                ty: ty.to_string(),
                contents: handle_segments(inner, line, ctx)?,
            }),
        },
        (Some(Encloser::Bracket), Some(inner)) => Ok(Constant::List {
            ty: ty.to_string(),
            contents: handle_segments(inner, line, ctx)?,
        }),
        _ => Err(FrontendError::malformed(line, std::slice::from_ref(value))),
    }
}

fn handle_segments(tokens: &[Token], line: usize, ctx: &mut ParseContext) -> Result<Vec<Constant>> {
    let mut out = Vec::new();
    for segment in split_token_list(tokens) {
        if segment.is_empty() {
            continue;
        }
        out.push(handle_segment(segment, line, ctx)?);
    }
    Ok(out)
}

fn handle_segment(segment: &[Token], line: usize, ctx: &mut ParseContext) -> Result<Constant> {
    if segment.len() < 2 {
        return Err(FrontendError::malformed(line, segment));
    }
    let ty = segment[0].text.clone();
    let head = &segment[1];
    if head.is("null") {
        return Ok(Constant::Value {
            ty,
            value: "0".to_string(),
        });
    }
    if head.is("zeroinitializer") || head.is("undef") {
        return Ok(Constant::EmptyStruct { ty });
    }
    if is_parsable(head) {
        return Ok(Constant::Expr(parse_function_call(segment, line, ctx)?));
    }
    match (head.encloser(), head.inner()) {
        (Some(Encloser::Brace), Some(inner)) => {
            return Ok(Constant::Struct {
                ty,
                contents: handle_segments(inner, line, ctx)?,
            })
        }
        (Some(Encloser::Angle), Some(inner)) => {
            let contents = match inner.first() {
                Some(packed) if packed.encloser() == Some(Encloser::Brace) => {
                    handle_segments(packed.inner().unwrap_or_default(), line, ctx)?
                }
                _ => handle_segments(inner, line, ctx)?,
            };
            return Ok(Constant::Struct { ty, contents });
        }
        (Some(Encloser::Bracket), Some(inner)) => {
            return Ok(Constant::List {
                ty,
                contents: handle_segments(inner, line, ctx)?,
            })
        }
        _ => {}
    }
    if segment.len() == 2 {
        return Ok(Constant::Value {
            ty,
            value: parse_numerical(&head.text),
        });
    }
    if head.is("c") {
        return Ok(Constant::String {
            ty,
            text: strip_quotes(&segment[2].text),
        });
    }
    if head.is("blockaddress") {
        let (func, label) = parse_block_address(segment, line)?;
        return Ok(Constant::BlockAddress { func, label });
    }
    Err(FrontendError::malformed(line, segment))
}

fn strip_quotes(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn toks(text: &str) -> Vec<Token> {
        tokenize(text, 1).unwrap()
    }

    #[test]
    fn test_split_token_list() {
        let tokens = toks("i32 %a, i32 %b ; trailing, comment");
        let parts = split_token_list(&tokens);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1][1].text, "%b");

        let tokens = toks("i32 %x to i8*");
        let parts = split_token_list(&tokens);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1][0].text, "i8*");
    }

    #[test]
    fn test_parse_numerical() {
        assert_eq!(parse_numerical("0x3FF0000000000000"), "1");
        assert_eq!(parse_numerical("5.000000e+01"), "50");
        assert_eq!(parse_numerical("null"), "0");
        assert_eq!(parse_numerical("true"), "1");
        assert_eq!(parse_numerical("%x"), "%x");
        assert_eq!(parse_numerical("18446744073709551615"), "18446744073709551615");
    }

    #[test]
    fn test_param_tokens() {
        let mut ctx = ParseContext::new();
        let tokens = toks("i32 %a, [4 x i8]* %b, ...");
        let params = parse_param_tokens(&tokens, 1, &mut ctx).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], Value::scalar("i32", "%a"));
        assert_eq!(params[1], Value::scalar("[4 x i8]*", "%b"));
        assert_eq!(params[2], Value::Varargs);
        assert!(ctx.types.contains("[4 x i8]"));
    }

    #[test]
    fn test_param_attrs_and_anonymous() {
        let mut ctx = ParseContext::new();
        let tokens = toks("i8* nocapture, %struct.S* byval %s, i32");
        let params = parse_param_tokens(&tokens, 1, &mut ctx).unwrap();
        assert_eq!(params[0], Value::scalar("i8*", "%0"));
        assert_eq!(
            params[1],
            Value::Value {
                ty: "%struct.S*".to_string(),
                ident: "%s".to_string(),
                by_val: true
            }
        );
        assert_eq!(params[2], Value::scalar("i32", "%1"));
    }

    #[test]
    fn test_getelementptr_expression() {
        let mut ctx = ParseContext::new();
        let tokens = toks("i8* getelementptr inbounds ([3 x i8]* @s, i32 0, i32 0)");
        let expr = parse_function_call(&tokens, 1, &mut ctx).unwrap();
        assert_eq!(expr.op, "getelementptr");
        assert_eq!(expr.variant.as_deref(), Some("inbounds"));
        assert_eq!(expr.ty, "i8*");
        assert_eq!(expr.params.len(), 3);
        assert_eq!(expr.ident.as_deref(), Some("@s"));
    }

    #[test]
    fn test_untyped_bitcast_takes_target_type() {
        let mut ctx = ParseContext::new();
        let tokens = toks("bitcast (i32* @x to i8*)");
        let value = parse_segment(&tokens, 1, &mut ctx).unwrap();
        match value {
            Value::Expr(expr) => {
                assert_eq!(expr.ty, "i8*");
                assert_eq!(expr.params, vec![Value::scalar("i32*", "@x")]);
            }
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn test_struct_constant() {
        let mut ctx = ParseContext::new();
        let tokens = toks("{ i32 1, [2 x i8] c\"a\\00\", i8* null, { i8, i8 } zeroinitializer }");
        let constant = scan_const(&tokens[0], "%struct.S", 1, &mut ctx).unwrap();
        let Constant::Struct { contents, .. } = constant else {
            panic!("expected struct");
        };
        assert_eq!(contents.len(), 4);
        assert_eq!(
            contents[0],
            Constant::Value {
                ty: "i32".to_string(),
                value: "1".to_string()
            }
        );
        assert!(matches!(&contents[1], Constant::String { text, .. } if text == "a\\00"));
        assert!(matches!(&contents[2], Constant::Value { value, .. } if value == "0"));
        assert!(matches!(&contents[3], Constant::EmptyStruct { ty } if ty == "{ i8, i8 }"));
    }

    #[test]
    fn test_blockaddress_constant() {
        let mut ctx = ParseContext::new();
        let tokens = toks("[i8* blockaddress(@main, %bb1), i8* blockaddress(@main, %bb2)]");
        let constant = scan_const(&tokens[0], "[2 x i8*]", 1, &mut ctx).unwrap();
        let Constant::List { contents, .. } = constant else {
            panic!("expected list");
        };
        assert_eq!(
            contents[1],
            Constant::BlockAddress {
                func: "@main".to_string(),
                label: "%bb2".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_segment() {
        let mut ctx = ParseContext::new();
        let tokens = toks("[i32 1 2 3]");
        let err = scan_const(&tokens[0], "[1 x i32]", 6, &mut ctx).unwrap_err();
        assert!(matches!(err, FrontendError::MalformedAggregate { line: 6, .. }));
    }
}

use super::segment::{
    parse_param_tokens, CALLING_CONVENTIONS, FUNCTION_ATTRS, LINKAGES, PARAM_ATTRS, VISIBILITIES,
};
use super::{token_at, ParseContext};
use crate::error::{FrontendError, Result};
use crate::ir::{FunctionHeader, Node, NodeKind, Value};
use crate::token::{Encloser, Token, TokenizedLine};

/// Keywords that may decorate a `define` or `declare` line without
/// affecting its signature.
fn is_decoration(token: &Token) -> bool {
    if token.group.is_some() {
        return false;
    }
    let text = token.text.as_str();
    LINKAGES.contains(&text)
        || VISIBILITIES.contains(&text)
        || CALLING_CONVENTIONS.contains(&text)
        || PARAM_ATTRS.contains(&text)
        || FUNCTION_ATTRS.contains(&text)
        || text == "unnamed_addr"
}

struct Signature {
    return_type: String,
    ident: String,
    params: Vec<Value>,
    has_var_args: bool,
}

/// Reads `ret @name(params)` once decorations are gone.
fn signature(tokens: &[Token], line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Signature> {
    let return_type = token_at(tokens, 0, line)?.text.clone();
    let ident = token_at(tokens, 1, line)?.text.clone();
    let params = match tokens.get(2) {
        Some(t) if t.encloser() == Some(Encloser::Paren) => {
            parse_param_tokens(t.inner().unwrap_or_default(), line.line_num, ctx)?
        }
        _ => {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "function without a parameter list",
                tokens,
            ))
        }
    };
    let (params, has_var_args) = match params.split_last() {
        Some((Value::Varargs, rest)) => (rest.to_vec(), true),
        _ => (params, false),
    };
    ctx.need(&return_type);
    Ok(Signature {
        return_type,
        ident,
        params,
        has_var_args,
    })
}

/// Parses a `define ... {` line into the function's identifier and header.
pub fn parse_header(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<(String, FunctionHeader)> {
    let tokens: Vec<Token> = line
        .tokens
        .iter()
        .filter(|t| !is_decoration(t) && !(t.group.is_none() && (t.is("define") || t.is("{"))))
        .cloned()
        .collect();
    let sig = signature(&tokens, line, ctx)?;
    let param_idents = sig
        .params
        .iter()
        .filter_map(Value::ident)
        .map(str::to_string)
        .collect();
    Ok((
        sig.ident,
        FunctionHeader {
            return_type: sig.return_type,
            params: sig.params,
            param_idents,
            has_var_args: sig.has_var_args,
        },
    ))
}

pub fn parse_function_header(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let (ident, header) = parse_header(line, ctx)?;
    Ok(Node::new(line.line_num, Some(ident), NodeKind::Function(header)))
}

pub fn parse_function_end(line: &TokenizedLine) -> Node {
    Node::new(line.line_num, None, NodeKind::FunctionEnd)
}

/// `declare [decorations] T @name(params) [attributes]`
pub fn parse_external(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens: Vec<Token> = line
        .tokens
        .iter()
        .skip(1)
        .filter(|t| !is_decoration(t))
        .cloned()
        .collect();
    let sig = signature(&tokens, line, ctx)?;
    Ok(Node::new(
        line.line_num,
        Some(sig.ident),
        NodeKind::FunctionStub {
            return_type: sig.return_type,
            params: sig.params,
            has_var_args: sig.has_var_args,
        },
    ))
}

/// `name:` or the `; <label>:N` marker of an unnamed block.
pub fn parse_label(line: &TokenizedLine) -> Result<Node> {
    let first = token_at(&line.tokens, 0, line)?;
    let name = match first.text.strip_suffix(':') {
        Some(name) if first.group.is_none() => name.to_string(),
        _ => {
            let marker = token_at(&line.tokens, 2, line)?;
            marker.text.trim_start_matches(':').to_string()
        }
    };
    Ok(Node::new(
        line.line_num,
        Some(format!("%{}", name)),
        NodeKind::Label,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::top;

    #[test]
    fn test_function_header_strips_decorations() {
        let mut ctx = ParseContext::new();
        let line = top("define internal fastcc zeroext i8 @pick(i32 %a, i8* nocapture %b) nounwind ssp {");
        let node = parse_function_header(&line, &mut ctx).unwrap();
        assert_eq!(node.ident.as_deref(), Some("@pick"));
        let NodeKind::Function(header) = node.kind else {
            panic!("expected function");
        };
        assert_eq!(header.return_type, "i8");
        assert_eq!(header.param_idents, vec!["%a", "%b"]);
        assert!(!header.has_var_args);
        assert!(ctx.types.contains("i8"));
    }

    #[test]
    fn test_varargs_header() {
        let mut ctx = ParseContext::new();
        let line = top("define i32 @sum(i32 %n, ...) {");
        let (ident, header) = parse_header(&line, &mut ctx).unwrap();
        assert_eq!(ident, "@sum");
        assert!(header.has_var_args);
        assert_eq!(header.params, vec![Value::scalar("i32", "%n")]);
    }

    #[test]
    fn test_struct_return_type() {
        let mut ctx = ParseContext::new();
        let line = top("define { i32, i32 } @pair() {");
        let (_, header) = parse_header(&line, &mut ctx).unwrap();
        assert_eq!(header.return_type, "{ i32, i32 }");
        assert!(header.params.is_empty());
    }

    #[test]
    fn test_external() {
        let mut ctx = ParseContext::new();
        let line = top("declare extern_weak i32 @printf(i8* nocapture, ...) nounwind");
        let node = parse_external(&line, &mut ctx).unwrap();
        assert_eq!(node.ident.as_deref(), Some("@printf"));
        assert_eq!(
            node.kind,
            NodeKind::FunctionStub {
                return_type: "i32".to_string(),
                params: vec![Value::scalar("i8*", "%0")],
                has_var_args: true,
            }
        );
    }

    #[test]
    fn test_labels() {
        let node = parse_label(&top("entry:")).unwrap();
        assert_eq!(node.ident.as_deref(), Some("%entry"));
        let node = parse_label(&top("bb1:                ; preds = %entry")).unwrap();
        assert_eq!(node.ident.as_deref(), Some("%bb1"));
        let node = parse_label(&top("; <label>:7                 ; preds = %3")).unwrap();
        assert_eq!(node.ident.as_deref(), Some("%7"));
        assert_eq!(node.intertype(), "label");
    }
}

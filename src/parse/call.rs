use super::segment::{
    clean_out_tokens, find_token, is_parsable, parse_function_call, parse_param_tokens,
    CALLING_CONVENTIONS, FUNCTION_ATTRS, PARAM_ATTRS,
};
use super::{token_at, ParseContext};
use crate::error::{FrontendError, Result};
use crate::ir::{CallSite, Node, NodeKind, Value};
use crate::token::{Encloser, Indent, Token, TokenizedLine};
use crate::types::{self, UNKNOWN_TYPE};

fn is_sigil(token: &Token) -> bool {
    token.group.is_none() && (token.text.starts_with('@') || token.text.starts_with('%'))
}

/// `[tail] call [attrs] [cc] T [fnty] callee(args) [attrs]`
pub fn parse_call(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let call = call_site(line.tokens.clone(), line, ctx)?;
    Ok(Node::new(line.line_num, Some(call.callee.clone()), NodeKind::Call(call)))
}

/// `invoke ... callee(args) [attrs] to label %normal unwind label %unwind`
pub fn parse_invoke(line: &TokenizedLine, ctx: &mut ParseContext) -> Result<Node> {
    let tokens = &line.tokens;
    let (Some(to), Some(unwind)) = (find_token(tokens, "to"), find_token(tokens, "unwind")) else {
        return Err(FrontendError::invariant_at(
            line.line_num,
            "invoke without normal and unwind destinations",
            tokens,
        ));
    };
    let to_label = token_at(tokens, to + 2, line)?.text.clone();
    let unwind_label = token_at(tokens, unwind + 2, line)?.text.clone();

    let head: Vec<Token> = tokens[..to.min(unwind)]
        .iter()
        .filter(|t| !(t.group.is_none() && FUNCTION_ATTRS.contains(&t.text.as_str())))
        .cloned()
        .collect();
    let call = call_site(head, line, ctx)?;
    Ok(Node::new(
        line.line_num,
        Some(call.callee.clone()),
        NodeKind::Invoke {
            call,
            to_label,
            unwind_label,
        },
    ))
}

fn call_site(mut tokens: Vec<Token>, line: &TokenizedLine, ctx: &mut ParseContext) -> Result<CallSite> {
    if tokens.first().is_some_and(|t| t.is("tail")) {
        tokens.remove(0);
    }
    if !tokens
        .first()
        .is_some_and(|t| t.is("call") || t.is("invoke"))
    {
        return Err(FrontendError::invariant_at(
            line.line_num,
            "expected call or invoke",
            &tokens,
        ));
    }
    clean_out_tokens(PARAM_ATTRS, &mut tokens, 1);
    clean_out_tokens(CALLING_CONVENTIONS, &mut tokens, 1);
    clean_out_tokens(PARAM_ATTRS, &mut tokens, 1);
    let ty = token_at(&tokens, 1, line)?.text.clone();

    let mut function_type = String::new();
    loop {
        let target = token_at(&tokens, 2, line)?;
        if is_sigil(target) || is_parsable(target) {
            break;
        }
        if target.is("asm") || target.is("sideeffect") {
            return Err(FrontendError::UnsupportedFeature {
                line: line.line_num,
                feature: "inline assembly".to_string(),
            });
        }
        if target.group.is_some() || !types::is_type(&target.text) {
            return Err(FrontendError::UnsupportedFeature {
                line: line.line_num,
                feature: format!("call target `{}`", target.text),
            });
        }
        if !function_type.is_empty() {
            function_type.push(' ');
        }
        function_type.push_str(&target.text);
        tokens.remove(2);
    }

    let (callee, params) = eat_callee(&mut tokens, line, ctx)?;
    ctx.need(&ty);
    Ok(CallSite {
        callee,
        ty,
        function_type,
        params,
        standalone: line.indent != Indent::Continuation,
    })
}

/// Consumes the call target and its argument list from `tokens[2..]`.
fn eat_callee(
    tokens: &mut Vec<Token>,
    line: &TokenizedLine,
    ctx: &mut ParseContext,
) -> Result<(String, Vec<Value>)> {
    let target = tokens.remove(2);
    let callee = if is_parsable(&target) {
        // a constant expression such as `bitcast (...)`
        let Some(close) = tokens
            .iter()
            .skip(2)
            .position(|t| t.encloser() == Some(Encloser::Paren))
            .map(|i| i + 2)
        else {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "call through an expression without operands",
                tokens,
            ));
        };
        let mut segment = vec![Token::atom(UNKNOWN_TYPE), target];
        segment.extend(tokens.drain(2..=close));
        parse_function_call(&segment, line.line_num, ctx)?
            .ident
            .unwrap_or_default()
    } else if let Some(bare) = target.text.strip_suffix("()") {
        // `%fp ()` was merged into one type-like token by the tokenizer
        return Ok((bare.trim_end().to_string(), Vec::new()));
    } else {
        target.text
    };

    let params = match tokens.get(2) {
        Some(args) if args.encloser() == Some(Encloser::Paren) => {
            parse_param_tokens(args.inner().unwrap_or_default(), line.line_num, ctx)?
        }
        _ => {
            return Err(FrontendError::invariant_at(
                line.line_num,
                "call without an argument list",
                tokens,
            ))
        }
    };
    Ok((callee, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::{rhs, statement};

    fn call_of(node: Node) -> CallSite {
        match node.kind {
            NodeKind::Call(call) => call,
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_call_params() {
        let mut ctx = ParseContext::new();
        let node = parse_call(&statement("call i32 @f(i32 %a, [4 x i8]* %b)"), &mut ctx).unwrap();
        assert_eq!(node.ident.as_deref(), Some("@f"));
        let call = call_of(node);
        assert_eq!(call.ty, "i32");
        assert!(call.standalone);
        assert_eq!(
            call.params,
            vec![Value::scalar("i32", "%a"), Value::scalar("[4 x i8]*", "%b")]
        );
    }

    #[test]
    fn test_tail_call_with_attributes() {
        let mut ctx = ParseContext::new();
        let line = rhs("tail call fastcc noalias i8* @malloc(i64 16) nounwind");
        let call = call_of(parse_call(&line, &mut ctx).unwrap());
        assert_eq!(call.callee, "@malloc");
        assert_eq!(call.ty, "i8*");
        assert!(!call.standalone);
    }

    #[test]
    fn test_varargs_call_type() {
        let mut ctx = ParseContext::new();
        let line = statement("call i32 (i8*, ...)* @printf(i8* %fmt, i32 %n)");
        let call = call_of(parse_call(&line, &mut ctx).unwrap());
        assert_eq!(call.ty, "i32 (i8*, ...)*");
        assert_eq!(call.callee, "@printf");
        assert_eq!(call.params.len(), 2);
    }

    #[test]
    fn test_call_through_pointer_without_args() {
        let mut ctx = ParseContext::new();
        let call = call_of(parse_call(&statement("call void %fp()"), &mut ctx).unwrap());
        assert_eq!(call.callee, "%fp");
        assert!(call.params.is_empty());
    }

    #[test]
    fn test_call_through_bitcast() {
        let mut ctx = ParseContext::new();
        let line = statement("call void bitcast (void (...)* @g to void ()*)()");
        let call = call_of(parse_call(&line, &mut ctx).unwrap());
        assert_eq!(call.callee, "@g");
        assert!(call.params.is_empty());
    }

    #[test]
    fn test_inline_asm_rejected() {
        let mut ctx = ParseContext::new();
        let line = statement("call void asm sideeffect \"nop\", \"\"() nounwind");
        let err = parse_call(&line, &mut ctx).unwrap_err();
        assert!(matches!(err, FrontendError::UnsupportedFeature { line: 1, .. }));
    }

    #[test]
    fn test_invoke() {
        let mut ctx = ParseContext::new();
        let line = statement("invoke void @_Z3foov() noreturn to label %cont unwind label %lpad");
        let node = parse_invoke(&line, &mut ctx).unwrap();
        assert_eq!(node.ident.as_deref(), Some("@_Z3foov"));
        let NodeKind::Invoke {
            call,
            to_label,
            unwind_label,
        } = node.kind
        else {
            panic!("expected invoke");
        };
        assert_eq!(call.ty, "void");
        assert_eq!(to_label, "%cont");
        assert_eq!(unwind_label, "%lpad");
    }

    #[test]
    fn test_invoke_missing_unwind() {
        let mut ctx = ParseContext::new();
        let err = parse_invoke(&statement("invoke void @f() to label %cont"), &mut ctx).unwrap_err();
        assert!(matches!(err, FrontendError::InternalInvariantViolation { .. }));
    }
}

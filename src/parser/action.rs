//! The action-code transformer (spec.md §4.3).
//!
//! Parses one rule's action body as Rust statements with `syn` (the
//! "target language's own parser" spec.md §4.3 calls for) and rewrites it
//! with a `syn::visit_mut::VisitMut` pass, grounded on
//! `examples/original_source/parser.go`'s `codeToActionVisitor` (which does
//! the analogous walk over `go/ast` nodes with `goast.Walk`) and on
//! `lex_derive`'s `syn`/`quote` pairing in the pack for using `syn` as an
//! ordinary runtime library rather than inside a proc-macro.

use quote::quote;
use syn::visit_mut::VisitMut;
use syn::{Expr, ExprReturn, Stmt};

use crate::error::{LexForgeError, Result};

/// Rewrites bare `ECHO`/`REJECT` statements, `BEGIN(x)`/`yymore()`/
/// `yyless(n)`/`unput(c)`/`input()` calls, and bare `return expr` statements
/// in place.
struct ActionRewriter;

impl VisitMut for ActionRewriter {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        if let Stmt::Expr(expr, _semi) = stmt {
            rewrite_bare_reserved_ident(expr);
        }
        syn::visit_mut::visit_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        rewrite_runtime_primitive_call(expr);
        syn::visit_mut::visit_expr_mut(self, expr);
    }

    fn visit_expr_return_mut(&mut self, node: &mut ExprReturn) {
        if let Some(inner) = node.expr.take() {
            node.expr = Some(if is_already_yy_action(&inner) {
                inner
            } else {
                Box::new(syn::parse_quote!(YyAction::UserReturn(#inner)))
            });
        }
        syn::visit_mut::visit_expr_return_mut(self, node);
    }
}

/// Only a lone `ECHO` or `REJECT` identifier used as a whole expression
/// statement is rewritten — not every lone identifier (spec.md §9's chosen
/// resolution of the two historical variants).
fn rewrite_bare_reserved_ident(expr: &mut Expr) {
    let Expr::Path(path) = expr else { return };
    let Some(ident) = path.path.get_ident() else {
        return;
    };
    let method = match ident.to_string().as_str() {
        "ECHO" => "yy_echo",
        "REJECT" => "yy_reject",
        _ => return,
    };
    let method_ident = syn::Ident::new(method, ident.span());
    *expr = syn::parse_quote!(scanner.#method_ident());
}

/// Lifts bare calls to the runtime's free-function-looking primitives —
/// `BEGIN(sc)`, `yymore()`, `yyless(n)`, `unput(c)`, `input()` — to their
/// `Scanner` method equivalents. These are the only callable primitives
/// spec.md §4.5 names; everything else is left untouched.
fn rewrite_runtime_primitive_call(expr: &mut Expr) {
    let Expr::Call(call) = expr else { return };
    let Expr::Path(func_path) = call.func.as_ref() else {
        return;
    };
    let Some(ident) = func_path.path.get_ident() else {
        return;
    };
    let method = match ident.to_string().as_str() {
        "BEGIN" => "yy_begin",
        "yymore" => "yy_more",
        "yyless" => "yy_less",
        "unput" => "unput",
        "input" => "input",
        _ => return,
    };
    let method_ident = syn::Ident::new(method, ident.span());
    let args = &call.args;
    *expr = syn::parse_quote!(scanner.#method_ident(#args));
}

/// True if `expr` already names the `YyAction` tagged union, so a bare
/// `return` statement is left untouched rather than double-wrapped.
fn is_already_yy_action(expr: &Expr) -> bool {
    let path = match expr {
        Expr::Call(c) => match c.func.as_ref() {
            Expr::Path(p) => Some(&p.path),
            _ => None,
        },
        Expr::Path(p) => Some(&p.path),
        Expr::Struct(s) => Some(&s.path),
        _ => None,
    };
    path.and_then(|p| p.segments.first())
        .map(|seg| seg.ident == "YyAction")
        .unwrap_or(false)
}

/// Transform one rule's raw action source into the boxed-closure expression
/// text the emitter splices into the rules table.
pub fn transform_action(file: &str, line: usize, action_src: &str) -> Result<String> {
    let wrapped = format!("{{ {action_src} }}");
    let mut block: syn::Block = syn::parse_str(&wrapped).map_err(|e| {
        LexForgeError::ActionParse(file.to_string(), line, e.to_string())
    })?;

    let mut rewriter = ActionRewriter;
    for stmt in &mut block.stmts {
        rewriter.visit_stmt_mut(stmt);
    }

    let stmts = &block.stmts;
    let tokens = quote! {
        Box::new(|scanner: &mut Scanner| -> YyAction {
            let yytext = scanner.yytext.clone();
            #(#stmts)*
            YyAction::FallThrough
        })
    };
    Ok(tokens.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_becomes_scanner_method_call() {
        let out = transform_action("t.l", 1, "ECHO;").unwrap();
        assert!(out.contains("scanner . yy_echo ()"));
    }

    #[test]
    fn reject_becomes_scanner_method_call() {
        let out = transform_action("t.l", 1, "REJECT;").unwrap();
        assert!(out.contains("scanner . yy_reject ()"));
    }

    #[test]
    fn begin_call_is_renamed() {
        let out = transform_action("t.l", 1, "BEGIN(STR);").unwrap();
        assert!(out.contains("scanner . yy_begin (STR)"));
    }

    #[test]
    fn yymore_call_is_lifted_to_scanner_method() {
        let out = transform_action("t.l", 1, "yymore();").unwrap();
        assert!(out.contains("scanner . yy_more ()"));
    }

    #[test]
    fn yyless_call_is_lifted_with_its_argument() {
        let out = transform_action("t.l", 1, "yyless(2);").unwrap();
        assert!(out.contains("scanner . yy_less (2)"));
    }

    #[test]
    fn unput_call_is_lifted_to_scanner_method() {
        let out = transform_action("t.l", 1, "unput('x');").unwrap();
        assert!(out.contains("scanner . unput ('x')"));
    }

    #[test]
    fn input_call_is_lifted_to_scanner_method() {
        let out = transform_action("t.l", 1, "let c = input();").unwrap();
        assert!(out.contains("scanner . input ()"));
    }

    #[test]
    fn bare_return_is_wrapped_in_user_return() {
        let out = transform_action("t.l", 1, "return 1;").unwrap();
        assert!(out.contains("YyAction :: UserReturn (1)"));
    }

    #[test]
    fn already_tagged_return_is_not_double_wrapped() {
        let out = transform_action("t.l", 1, "return YyAction::UserReturn(1);").unwrap();
        let occurrences = out.matches("UserReturn").count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn unrelated_identifiers_are_left_alone() {
        let out = transform_action("t.l", 1, "let x = ECHOED; x;").unwrap();
        assert!(!out.contains("yy_echo"));
    }

    #[test]
    fn falls_through_by_default() {
        let out = transform_action("t.l", 1, "let _ = 1;").unwrap();
        assert!(out.contains("YyAction :: FallThrough"));
    }

    #[test]
    fn unparsable_action_is_a_parse_error() {
        let err = transform_action("t.l", 1, "let x = ;").unwrap_err();
        assert!(matches!(err, LexForgeError::ActionParse(_, _, _)));
    }
}

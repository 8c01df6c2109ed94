//! End-to-end parse scenarios, one per input/output shape the front end is
//! expected to produce.

use fx_front::ast::{CaseLabel, ExprKind, LiteralValue, StmtKind};
use fx_front::{parse, DiagCode, ParseLimits};

fn parse_ok(source: &str) -> fx_front::arena::Ast {
    let (ast, diags, ok) = parse(source, "scenario.fx", ParseLimits::default());
    assert!(ok, "expected a clean parse, got diagnostics: {diags:?}");
    ast
}

#[test]
fn constructor_call_with_a_mix_of_variables_and_a_literal() {
    let ast = parse_ok("float4 f(float x){return float4(x,x,x,1);}");

    assert_eq!(ast.functions.len(), 1);
    let func = &ast.functions[0];
    assert!(func.return_type.is_vector());
    assert_eq!(func.return_type.rows, 4);
    assert_eq!(func.params.len(), 1);
    assert_eq!(ast.var(func.params[0]).name, "x");

    assert_eq!(func.body.len(), 1);
    let StmtKind::Return { value: Some(value), .. } = &ast.stmt(func.body[0]).kind else {
        panic!("expected a single return statement");
    };
    let ExprKind::Constructor { args } = &ast.expr(*value).kind else {
        panic!("expected the return value to be a constructor call");
    };
    assert_eq!(args.len(), 4);
}

#[test]
fn static_const_initializer_folds_to_a_literal() {
    let ast = parse_ok("static const int N = 2 + 3 * 4;");

    assert_eq!(ast.uniforms.len(), 1);
    let var = ast.var(ast.uniforms[0]);
    assert_eq!(var.name, "N");
    let initializer = var.initializer.expect("N has an initializer");
    match &ast.expr(initializer).kind {
        ExprKind::Literal(LiteralValue::Int(v)) => assert_eq!(v.as_slice(), [14]),
        other => panic!("expected a folded int literal, got {other:?}"),
    }
}

#[test]
fn assigning_a_float_literal_to_an_int_warns_but_does_not_error() {
    let (ast, diags, ok) = parse("void g(){ int a; a = 1.5; }", "scenario.fx", ParseLimits::default());
    assert!(ok, "a warning alone must not fail the parse: {diags:?}");
    assert!(!diags.iter().any(|d| d.code.severity() == fx_front::Severity::Error));
    assert!(diags.iter().any(|d| d.code == DiagCode::ImplicitTruncationWarning));
    assert_eq!(ast.functions.len(), 1);
}

#[test]
fn technique_referencing_undeclared_shaders_reports_both_and_fails() {
    let source = "technique T { pass P { VertexShader = vs; PixelShader = ps; } }";
    let (ast, diags, ok) = parse(source, "scenario.fx", ParseLimits::default());
    assert!(!ok);
    let undeclared: Vec<_> = diags.iter().filter(|d| d.code == DiagCode::UndeclaredIdentifier).collect();
    assert_eq!(undeclared.len(), 2, "expected one X3004 each for 'vs' and 'ps': {diags:?}");
    assert_eq!(ast.techniques.len(), 1);
}

#[test]
fn user_overload_shadows_the_builtin_mul_and_folds_at_the_call_site() {
    let source = "float mul(float a, float b){return a*b;} float h(){return mul(1.0, 2.0);}";
    let ast = parse_ok(source);

    assert_eq!(ast.functions.len(), 2);
    let h = &ast.functions[1];
    assert_eq!(h.name, "h");
    let StmtKind::Return { value: Some(value), .. } = &ast.stmt(h.body[0]).kind else {
        panic!("expected h() to have a single return statement");
    };
    match &ast.expr(*value).kind {
        ExprKind::Literal(LiteralValue::Float(v)) => assert_eq!(v.as_slice(), [2.0]),
        other => panic!("expected the call to fold to a literal 2.0, got {other:?}"),
    }
}

#[test]
fn struct_equality_requires_the_same_struct_definition() {
    let mismatched = "struct S{int x;}; struct U{int x;}; S a; U b; bool c = (a == b);";
    let (_, diags, ok) = parse(mismatched, "scenario.fx", ParseLimits::default());
    assert!(!ok, "comparing unrelated struct types must fail");
    assert!(diags.iter().any(|d| d.code == DiagCode::TypeMismatch));

    let matching = "struct S{int x;}; S a; S b; bool c = (a == b);";
    let ast = parse_ok(matching);
    assert_eq!(ast.structs.len(), 1);
}

#[test]
fn empty_switch_warns_and_degrades_to_a_no_op() {
    let source = "void g(int x){ switch(x) { } }";
    let (ast, diags, ok) = parse(source, "scenario.fx", ParseLimits::default());
    assert!(ok, "an empty switch is a warning, not an error: {diags:?}");
    assert!(diags.iter().any(|d| d.code == DiagCode::EmptySwitchWarning));
    let func = &ast.functions[0];
    let StmtKind::Switch { cases, .. } = &ast.stmt(func.body[0]).kind else {
        panic!("expected a switch statement");
    };
    assert!(cases.is_empty());
}

#[test]
fn switch_case_labels_must_be_literal_expressions() {
    let source = "void g(int x, int y){ switch(x) { case y: break; } }";
    let (_, diags, ok) = parse(source, "scenario.fx", ParseLimits::default());
    assert!(!ok);
    assert!(diags.iter().any(|d| d.code == DiagCode::TypeMismatch));
}

#[test]
fn switch_accepts_literal_case_labels_and_a_default() {
    let source = "void g(int x){ switch(x) { case 1: break; default: break; } }";
    let ast = parse_ok(source);
    let func = &ast.functions[0];
    let StmtKind::Switch { cases, .. } = &ast.stmt(func.body[0]).kind else {
        panic!("expected a switch statement");
    };
    assert_eq!(cases.len(), 2);
    assert!(matches!(cases[0].labels[0], CaseLabel::Literal(_)));
    assert!(matches!(cases[1].labels[0], CaseLabel::Default));
}

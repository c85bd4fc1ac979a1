#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningMode;

    fn parse_ok(source: &str) -> SourceFile {
        let options = CompileOptions::default();
        let mut map = SourceMap::new();
        let (file, _) = parse_source("test.vela", source, &options, &mut map)
            .unwrap_or_else(|err| panic!("parse failed: {err}"));
        file
    }

    fn parse_warnings(source: &str) -> Vec<Diagnostic> {
        let options = CompileOptions::default();
        let mut map = SourceMap::new();
        let (_, warnings) = parse_source("test.vela", source, &options, &mut map)
            .unwrap_or_else(|err| panic!("parse failed: {err}"));
        warnings
    }

    fn parse_err(source: &str) -> CompileError {
        let options = CompileOptions::default();
        let mut map = SourceMap::new();
        parse_source("test.vela", source, &options, &mut map)
            .map(|_| ())
            .expect_err("expected a parse error")
    }

    /// Parse `expr` in statement position (via `_ = expr`) and return it.
    fn expr_of(expr: &str) -> Expr {
        let file = parse_ok(&format!("void f() {{\n    _ = {expr}\n}}\n"));
        let Decl::Function(func) = &file.decls[0] else {
            panic!("expected a function");
        };
        let body = func.body.as_ref().expect("function has a body");
        let Stmt::Expr(expr) = &body[0] else {
            panic!("expected an expression statement");
        };
        expr.clone()
    }

    fn function_named<'f>(file: &'f SourceFile, name: &str) -> &'f FunctionDecl {
        file.decls
            .iter()
            .find_map(|d| match d {
                Decl::Function(f) if f.name == name => Some(f),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no function named {name}"))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let Expr::Binary(add) = expr_of("1 + 2 * 3") else {
            panic!("expected a binary expression");
        };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(*add.lhs, Expr::IntLiteral { value: 1, .. }));
        let Expr::Binary(mul) = *add.rhs else {
            panic!("expected the right operand to be a multiplication");
        };
        assert_eq!(mul.op, BinaryOp::Mul);
        assert!(matches!(*mul.lhs, Expr::IntLiteral { value: 2, .. }));
        assert!(matches!(*mul.rhs, Expr::IntLiteral { value: 3, .. }));
    }

    #[test]
    fn ternary_parses_as_if_expression() {
        let Expr::If(if_expr) = expr_of("2 < 3 ? 4 : 5") else {
            panic!("expected an if-expression");
        };
        let Expr::Binary(cond) = *if_expr.condition else {
            panic!("expected a comparison condition");
        };
        assert_eq!(cond.op, BinaryOp::Less);
        assert!(matches!(*if_expr.then_expr, Expr::IntLiteral { value: 4, .. }));
        assert!(matches!(*if_expr.else_expr, Expr::IntLiteral { value: 5, .. }));
    }

    #[test]
    fn generic_call_without_spaces() {
        let Expr::Call(call) = expr_of("foo<int>(3)") else {
            panic!("expected a call");
        };
        assert_eq!(call.generic_args.len(), 1);
        assert!(call.generic_args[0].is_basic_named("int"));
    }

    #[test]
    fn spaced_less_than_is_a_comparison() {
        let Expr::Binary(cmp) = expr_of("a < b") else {
            panic!("expected a comparison");
        };
        assert_eq!(cmp.op, BinaryOp::Less);
    }

    #[test]
    fn lambda_vs_tuple_vs_paren() {
        assert!(matches!(expr_of("(int x) -> x"), Expr::Lambda(_)));
        assert!(matches!(expr_of("(a: 1, b: 2)"), Expr::TupleLiteral { .. }));
        assert!(matches!(expr_of("(1 + 2)"), Expr::Binary(_)));
    }

    #[test]
    fn unnamed_tuple_elements_adopt_variable_names() {
        let Expr::TupleLiteral { elements, .. } = expr_of("(a, b)") else {
            panic!("expected a tuple literal");
        };
        assert_eq!(elements[0].name.as_deref(), Some("a"));
        assert_eq!(elements[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn chained_assignment_is_right_associative() {
        let file = parse_ok("void f() {\n    a = b = c\n}\n");
        let Decl::Function(func) = &file.decls[0] else { panic!() };
        let Stmt::Expr(Expr::Binary(outer)) = &func.body.as_ref().unwrap()[0] else {
            panic!("expected an assignment statement");
        };
        assert_eq!(outer.op, BinaryOp::Assign);
        assert!(matches!(&*outer.lhs, Expr::Var(v) if v.name == "a"));
        let Expr::Binary(inner) = &*outer.rhs else {
            panic!("expected a nested assignment");
        };
        assert_eq!(inner.op, BinaryOp::Assign);
    }

    #[test]
    fn postfix_chain() {
        let Expr::Unwrap(unwrap) = expr_of("xs[0].field!") else {
            panic!("expected an unwrap");
        };
        let Expr::Member(member) = *unwrap.operand else {
            panic!("expected a member access");
        };
        assert_eq!(member.member, "field");
        assert!(matches!(*member.operand, Expr::Subscript(_)));
    }

    #[test]
    fn bare_expression_statement_must_have_an_effect() {
        let err = parse_err("void f() {\n    1 + 2\n}\n");
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    // ========================================================================
    // Types
    // ========================================================================

    #[test]
    fn array_size_forms() {
        let file = parse_ok("void f(int[3] a, int[] b, int[?] c) {}\n");
        let func = function_named(&file, "f");
        let sizes: Vec<_> = func
            .params
            .iter()
            .map(|p| match &p.ty.as_ref().unwrap().kind {
                TypeKind::Array { size, .. } => *size,
                other => panic!("expected array type, got {other:?}"),
            })
            .collect();
        assert_eq!(
            sizes,
            vec![ArraySize::Known(3), ArraySize::Runtime, ArraySize::Unknown]
        );
    }

    #[test]
    fn bad_array_size_is_a_parse_error() {
        let err = parse_err("void f(int[xs] a) {}\n");
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn pointer_optional_and_function_types() {
        let file = parse_ok("void f(int* p, int? o, int(int, bool) g) {}\n");
        let func = function_named(&file, "f");
        assert!(matches!(func.params[0].ty.as_ref().unwrap().kind, TypeKind::Pointer(_)));
        assert!(matches!(func.params[1].ty.as_ref().unwrap().kind, TypeKind::Optional(_)));
        assert!(matches!(
            func.params[2].ty.as_ref().unwrap().kind,
            TypeKind::Function { .. }
        ));
    }

    #[test]
    fn nested_generic_arguments_split_right_shift() {
        let file = parse_ok("void f(Box<Box<int>> b) {}\n");
        let func = function_named(&file, "f");
        let TypeKind::Basic { name, generic_args } = &func.params[0].ty.as_ref().unwrap().kind else {
            panic!("expected a basic type");
        };
        assert_eq!(name, "Box");
        let TypeKind::Basic { name: inner, .. } = &generic_args[0].kind else {
            panic!("expected a nested basic type");
        };
        assert_eq!(inner, "Box");
    }

    #[test]
    fn reference_types_are_rejected_with_a_hint() {
        let err = parse_err("void f(int& r) {}\n");
        assert!(err.message.contains("use pointers"));
    }

    // ========================================================================
    // Statement terminators
    // ========================================================================

    #[test]
    fn mixed_terminators_warn_once_per_mismatch() {
        // Newline establishes the style; the ';' statement warns; the final
        // newline statement matches the established style again.
        let warnings = parse_warnings("void f() {\n    var x = 1\n    var y = 2;\n    var z = 3\n}\n");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("inconsistent statement terminator"));
    }

    #[test]
    fn every_mismatching_statement_rewarns() {
        let warnings =
            parse_warnings("void f() {\n    var x = 1\n    var y = 2;\n    var z = 3\n    var w = 4;\n}\n");
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn consistent_semicolons_do_not_warn() {
        let warnings = parse_warnings("void f() { var x = 1; var y = 2; }\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn warnings_escalate_under_policy() {
        let options = CompileOptions {
            warning_mode: WarningMode::TreatAsErrors,
            ..Default::default()
        };
        let mut map = SourceMap::new();
        let err = parse_source(
            "test.vela",
            "void f() {\n    var x = 1\n    var y = 2;\n}\n",
            &options,
            &mut map,
        )
        .expect_err("escalated warning should fail the parse");
        assert_eq!(err.kind, ErrorKind::Structural);
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    #[test]
    fn struct_without_init_gets_memberwise_initializer() {
        let file = parse_ok("struct Point {\n    int x\n    int y\n}\n");
        let Decl::Type(decl) = &file.decls[0] else {
            panic!("expected a type declaration");
        };
        let init = decl.inits().next().expect("synthesized initializer");
        assert_eq!(init.params.len(), 2);
        assert_eq!(init.params[0].name, "x");
        assert_eq!(init.params[1].name, "y");
        assert_eq!(init.body.len(), 2);

        // Each statement assigns the parameter to the same-named field.
        for (stmt, field) in init.body.iter().zip(["x", "y"]) {
            let Stmt::Expr(Expr::Binary(assign)) = stmt else {
                panic!("expected an assignment");
            };
            assert_eq!(assign.op, BinaryOp::Assign);
            let Expr::Member(member) = &*assign.lhs else {
                panic!("expected this.{field}");
            };
            assert_eq!(member.member, field);
            assert!(matches!(&*member.operand, Expr::Var(v) if v.name == "this"));
            assert!(matches!(&*assign.rhs, Expr::Var(v) if v.name == field));
        }
    }

    #[test]
    fn explicit_init_suppresses_the_synthesized_one() {
        let file = parse_ok("struct Point {\n    int x\n    init(int value) { this.x = value }\n}\n");
        let Decl::Type(decl) = &file.decls[0] else { panic!() };
        assert_eq!(decl.inits().count(), 1);
        assert_eq!(decl.inits().next().unwrap().params[0].name, "value");
    }

    #[test]
    fn interface_methods_may_omit_bodies() {
        let file = parse_ok("interface Comparable {\n    bool less(This other)\n    bool greater(This other) { return false }\n}\n");
        let Decl::Type(decl) = &file.decls[0] else { panic!() };
        assert!(decl.is_interface());
        let methods: Vec<_> = decl.methods().collect();
        assert!(methods[0].body.is_none());
        assert!(methods[1].body.is_some());
    }

    #[test]
    fn type_templates_are_distinguished_by_lookahead() {
        let file = parse_ok("struct Box<T> {\n    T value\n}\nstruct Plain {\n    int x\n}\n");
        assert!(matches!(file.decls[0], Decl::TypeTemplate(_)));
        assert!(matches!(file.decls[1], Decl::Type(_)));
    }

    #[test]
    fn function_templates_and_constraints() {
        let file = parse_ok("T identity<T>(T value) {\n    return value\n}\n");
        let Decl::FunctionTemplate(template) = &file.decls[0] else {
            panic!("expected a function template");
        };
        assert_eq!(template.generic_params.len(), 1);
        assert_eq!(template.generic_params[0].name, "T");

        let file = parse_ok("void sort<T: Comparable>(T[] values) {}\n");
        let Decl::FunctionTemplate(template) = &file.decls[0] else { panic!() };
        assert_eq!(template.generic_params[0].constraints.len(), 1);
    }

    #[test]
    fn operator_functions() {
        let file = parse_ok("bool operator==(int a, int b) {\n    return true\n}\n");
        assert!(matches!(&file.decls[0], Decl::Function(f) if f.name == "=="));

        // Subscript is the one operator allowed as a member.
        let file = parse_ok("struct Buffer {\n    int len\n    int operator[](int index) { return 0 }\n}\n");
        let Decl::Type(decl) = &file.decls[0] else { panic!() };
        assert!(decl.methods().any(|m| m.name == "[]"));

        let err = parse_err("struct Buffer {\n    int len\n    int operator+(int other) { return 0 }\n}\n");
        assert!(err.message.contains("non-member"));
    }

    #[test]
    fn extern_function_with_variadic_marker() {
        let file = parse_ok("extern int printf(const char* format, ...)\n");
        let func = function_named(&file, "printf");
        assert!(func.is_extern);
        assert!(func.is_variadic);
        assert!(func.body.is_none());
    }

    #[test]
    fn global_variable_forms() {
        let file = parse_ok("var a = 1\nconst b = 2\nint c = 3\nconst int d = 4\n");
        let names: Vec<_> = file
            .decls
            .iter()
            .map(|d| match d {
                Decl::Var(v) => (v.name.as_str(), v.declared_type.is_some(), v.mutability),
                other => panic!("expected a variable, got {other:?}"),
            })
            .collect();
        assert_eq!(
            names,
            vec![
                ("a", false, Mutability::Mutable),
                ("b", false, Mutability::Const),
                ("c", true, Mutability::Mutable),
                ("d", true, Mutability::Const),
            ]
        );
    }

    #[test]
    fn enum_cases_get_ordinal_values() {
        let file = parse_ok("enum Color {\n    red,\n    green,\n    blue\n}\n");
        let Decl::Enum(decl) = &file.decls[0] else { panic!() };
        let values: Vec<_> = decl.cases.iter().map(|c| (c.name.as_str(), c.value)).collect();
        assert_eq!(values, vec![("red", 0), ("green", 1), ("blue", 2)]);
    }

    #[test]
    fn import_targets() {
        let file = parse_ok("import math\nimport \"stdio.h\"\n");
        let targets: Vec<_> = file
            .decls
            .iter()
            .map(|d| match d {
                Decl::Import(i) => i.target.clone(),
                other => panic!("expected an import, got {other:?}"),
            })
            .collect();
        assert_eq!(targets, vec!["math", "stdio.h"]);
    }

    #[test]
    fn switch_statement_shape() {
        let file = parse_ok(
            "void f(int x) {\n    switch (x) {\n        case 1 as payload:\n            return\n        default:\n            return\n    }\n}\n",
        );
        let func = function_named(&file, "f");
        let Stmt::Switch(switch) = &func.body.as_ref().unwrap()[0] else {
            panic!("expected a switch");
        };
        assert_eq!(switch.cases.len(), 2);
        assert!(matches!(switch.cases[0].pattern, CasePattern::Expr(_)));
        assert_eq!(switch.cases[0].binding.as_ref().unwrap().name, "payload");
        assert_eq!(switch.cases[1].pattern, CasePattern::Default);
    }

    #[test]
    fn duplicate_defaults_parse_and_are_left_to_the_checker() {
        let file = parse_ok(
            "void f(int x) {\n    switch (x) {\n        default:\n            return\n        default:\n            return\n    }\n}\n",
        );
        let func = function_named(&file, "f");
        let Stmt::Switch(switch) = &func.body.as_ref().unwrap()[0] else { panic!() };
        let defaults = switch
            .cases
            .iter()
            .filter(|c| c.pattern == CasePattern::Default)
            .count();
        assert_eq!(defaults, 2);
    }

    // ========================================================================
    // Conditional compilation
    // ========================================================================

    #[test]
    fn ifdef_selects_the_defined_branch() {
        let source = "#if debug\nint level = 1\n#else\nint level = 2\n#endif\n";

        let options = CompileOptions {
            defines: vec!["debug".to_string()],
            ..Default::default()
        };
        let mut map = SourceMap::new();
        let (file, _) = parse_source("test.vela", source, &options, &mut map).unwrap();
        assert_eq!(file.decls.len(), 1);
        let Decl::Var(var) = &file.decls[0] else { panic!() };
        assert!(matches!(var.initializer, Some(Expr::IntLiteral { value: 1, .. })));

        let options = CompileOptions::default();
        let mut map = SourceMap::new();
        let (file, _) = parse_source("test.vela", source, &options, &mut map).unwrap();
        let Decl::Var(var) = &file.decls[0] else { panic!() };
        assert!(matches!(var.initializer, Some(Expr::IntLiteral { value: 2, .. })));
    }

    #[test]
    fn ifdef_negation() {
        let source = "#if !release\nint level = 1\n#endif\n";
        let file = parse_ok(source);
        assert_eq!(file.decls.len(), 1);
    }

    #[test]
    fn inactive_branches_are_still_syntax_checked() {
        let err = parse_err("#if release\nint x = $\n#endif\n");
        assert_eq!(err.kind, ErrorKind::Lex);
    }

    // ========================================================================
    // Determinism
    // ========================================================================

    #[test]
    fn reparsing_identical_source_yields_identical_trees() {
        let source = "struct Point {\n    int x\n    int y\n}\n\nint length(Point p) {\n    return p.x * p.x + p.y * p.y\n}\n";
        let options = CompileOptions::default();

        let mut map_a = SourceMap::new();
        let (first, _) = parse_source("test.vela", source, &options, &mut map_a).unwrap();
        let mut map_b = SourceMap::new();
        let (second, _) = parse_source("test.vela", source, &options, &mut map_b).unwrap();

        assert_eq!(first, second);
    }
}

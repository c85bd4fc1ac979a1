//! Integration tests for the Vela compiler front end: full lex → parse →
//! type-check runs, including multi-file modules and warning policy.

use vela::ast::Module;
use vela::diagnostics::{CompileError, Diagnostic, ErrorKind, WarningMode};
use vela::location::SourceMap;
use vela::options::CompileOptions;
use vela::parser;
use vela::Typechecker;

/// Run the full pipeline over one or more in-memory files.
fn compile(sources: &[&str], options: &CompileOptions) -> Result<Vec<Diagnostic>, CompileError> {
    let mut map = SourceMap::new();
    let mut module = Module::new();
    let mut warnings = Vec::new();

    for (index, source) in sources.iter().enumerate() {
        let name = format!("input{index}.vela");
        let (file, mut file_warnings) = parser::parse_source(&name, source, options, &mut map)?;
        warnings.append(&mut file_warnings);
        module.add_source_file(file);
    }

    let mut checker = Typechecker::new(options);
    checker.check_module(&module)?;
    warnings.extend(checker.take_warnings());
    Ok(warnings)
}

#[test]
fn a_realistic_program_compiles() {
    let source = concat!(
        "interface Shape {\n",
        "    float area()\n",
        "    bool is_flat() {\n",
        "        return this.area() == 0.0\n",
        "    }\n",
        "}\n",
        "\n",
        "struct Rect: Shape {\n",
        "    float width\n",
        "    float height\n",
        "    float area() {\n",
        "        return this.width * this.height\n",
        "    }\n",
        "}\n",
        "\n",
        "struct Stack<T> {\n",
        "    T top\n",
        "    int depth\n",
        "}\n",
        "\n",
        "enum Verdict {\n",
        "    accepted,\n",
        "    rejected\n",
        "}\n",
        "\n",
        "Verdict judge(float limit, Rect r) {\n",
        "    if (r.area() < limit) {\n",
        "        return Verdict.accepted\n",
        "    }\n",
        "    return Verdict.rejected\n",
        "}\n",
        "\n",
        "int count_flat(Rect[] shapes) {\n",
        "    var count = 0\n",
        "    for (var shape in shapes) {\n",
        "        if (shape.is_flat()) {\n",
        "            count++\n",
        "        }\n",
        "    }\n",
        "    return count\n",
        "}\n",
        "\n",
        "void main() {\n",
        "    var r = Rect(3.0, 4.0)\n",
        "    var s = Stack<int>(1, 1)\n",
        "    switch (judge(100.0, r)) {\n",
        "        case Verdict.accepted:\n",
        "            return\n",
        "        default:\n",
        "            return\n",
        "    }\n",
        "}\n",
    );

    let warnings = compile(&[source], &CompileOptions::default()).unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn declarations_are_visible_across_files() {
    let definitions = concat!(
        "struct Vec2 {\n",
        "    float x\n",
        "    float y\n",
        "}\n",
        "Vec2 operator+(Vec2 a, Vec2 b) {\n",
        "    return Vec2(a.x + b.x, a.y + b.y)\n",
        "}\n",
    );
    let uses = concat!(
        "Vec2 midpoint_sum(Vec2 a, Vec2 b) {\n",
        "    return a + b\n",
        "}\n",
    );

    compile(&[definitions, uses], &CompileOptions::default()).unwrap();
}

#[test]
fn syntax_errors_abort_the_whole_run() {
    let good = "int one() {\n    return 1\n}\n";
    let bad = "int two( {\n    return 2\n}\n";
    let err = compile(&[good, bad], &CompileOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
}

#[test]
fn type_errors_carry_their_location() {
    let source = "void f() {\n    int x = \"nope\"\n}\n";
    let err = compile(&[source], &CompileOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conversion);
    let location = err.location.expect("conversion errors point into the source");
    assert_eq!(location.line, 2);
}

#[test]
fn warning_policy_escalates_end_to_end() {
    // Mixed statement terminators: a warning by default, fatal under
    // escalation, silent under suppression.
    let source = "void f() {\n    var x = 1\n    var y = 2;\n}\n";

    let warnings = compile(&[source], &CompileOptions::default()).unwrap();
    assert_eq!(warnings.len(), 1);

    let suppressed = compile(
        &[source],
        &CompileOptions {
            warning_mode: WarningMode::Suppress,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(suppressed.is_empty());

    let err = compile(
        &[source],
        &CompileOptions {
            warning_mode: WarningMode::TreatAsErrors,
            ..Default::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Structural);
}

#[test]
fn has_include_consults_the_search_paths() {
    let dir = std::env::temp_dir().join("vela_pipeline_has_include");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("feature.h"), "// header\n").unwrap();

    let source = concat!(
        "#if hasInclude(\"feature.h\")\n",
        "int flag = 1\n",
        "#else\n",
        "int flag = 0\n",
        "#endif\n",
    );

    let options = CompileOptions {
        import_search_paths: vec![dir.clone()],
        ..Default::default()
    };

    let mut map = SourceMap::new();
    let (file, _) = parser::parse_source("cond.vela", source, &options, &mut map).unwrap();
    assert_eq!(file.decls.len(), 1);
    let vela::ast::Decl::Var(var) = &file.decls[0] else {
        panic!("expected a variable declaration");
    };
    assert!(
        matches!(var.initializer, Some(vela::ast::Expr::IntLiteral { value: 1, .. })),
        "the hasInclude branch should be taken"
    );

    std::fs::remove_file(dir.join("feature.h")).ok();
}

#[test]
fn imports_fall_back_to_the_header_importer() {
    use vela::sema::imports::HeaderSearchImporter;

    let dir = std::env::temp_dir().join("vela_pipeline_header_import");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("clib.h"), "// header\n").unwrap();

    let options = CompileOptions {
        import_search_paths: vec![dir.clone()],
        ..Default::default()
    };
    let mut map = SourceMap::new();
    let (file, _) = parser::parse_source("imports.vela", "import \"clib.h\"\n", &options, &mut map).unwrap();
    let mut module = Module::new();
    module.add_source_file(file);

    let mut importer = HeaderSearchImporter;
    let mut checker = Typechecker::new(&options).with_header_importer(&mut importer);
    checker.check_module(&module).unwrap();

    std::fs::remove_file(dir.join("clib.h")).ok();
}

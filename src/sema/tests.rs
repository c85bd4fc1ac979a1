//! Type checker tests: full lex → parse → check runs over small programs.

use std::rc::Rc;

use vela_syntax::ast::{Module, Type};
use vela_syntax::diagnostics::{CompileError, Diagnostic, ErrorKind};
use vela_syntax::location::SourceMap;
use vela_syntax::options::CompileOptions;
use vela_syntax::parser;

use super::symbols::Symbol;
use super::Typechecker;

fn check(source: &str) -> Result<(), CompileError> {
    check_with_warnings(source).0
}

fn check_with_warnings(source: &str) -> (Result<(), CompileError>, Vec<Diagnostic>) {
    let options = CompileOptions::default();
    let mut map = SourceMap::new();
    let (file, _) = parser::parse_source("test.vela", source, &options, &mut map)
        .unwrap_or_else(|err| panic!("parse failed: {err}"));
    let mut module = Module::new();
    module.add_source_file(file);

    let mut checker = Typechecker::new(&options);
    let result = checker.check_module(&module);
    let warnings = checker.take_warnings();
    (result, warnings)
}

fn check_err(source: &str) -> CompileError {
    check(source).expect_err("expected a type error")
}

// ============================================================================
// Basics
// ============================================================================

#[test]
fn a_small_valid_program_checks() {
    check(concat!(
        "struct Point {\n",
        "    int x\n",
        "    int y\n",
        "}\n",
        "int dot(Point a, Point b) {\n",
        "    return a.x * b.x + a.y * b.y\n",
        "}\n",
        "void main() {\n",
        "    var p = Point(1, 2)\n",
        "    var q = Point(3, 4)\n",
        "    int d = dot(p, q)\n",
        "    if (d > 0) {\n",
        "        return\n",
        "    }\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn unknown_types_are_rejected() {
    let err = check_err("void f(Mystery m) {}\n");
    assert_eq!(err.kind, ErrorKind::NameResolution);
    assert!(err.message.contains("unknown type 'Mystery'"));
}

#[test]
fn unknown_identifiers_are_rejected() {
    let err = check_err("int f() {\n    return missing\n}\n");
    assert_eq!(err.kind, ErrorKind::NameResolution);
    assert!(err.message.contains("unknown identifier 'missing'"));
}

#[test]
fn local_redefinition_is_rejected() {
    let err = check_err("void f(int x) {\n    var x = 1\n}\n");
    assert!(err.message.contains("redefinition of 'x'"));

    let err = check_err("void f(int a, int a) {}\n");
    assert!(err.message.contains("redefinition of 'a'"));
}

#[test]
fn top_level_redefinition_is_rejected() {
    let err = check_err("struct Pair {\n    int a\n}\nstruct Pair {\n    int b\n}\n");
    assert!(err.message.contains("redefinition of 'Pair'"));
}

// ============================================================================
// Variable declarations and conversions
// ============================================================================

#[test]
fn null_into_non_optional_suggests_a_question_mark() {
    let err = check_err("void f() {\n    int x = null\n}\n");
    assert_eq!(err.kind, ErrorKind::Conversion);
    assert!(err.message.contains("add '?' to the type"));

    check("void f() {\n    int? x = null\n}\n").unwrap();
}

#[test]
fn values_wrap_into_optionals() {
    check("void f() {\n    int? x = 3\n}\n").unwrap();
}

#[test]
fn inference_failure_requires_an_annotation() {
    let err = check_err("void f() {\n    var x = null\n}\n");
    assert!(err.message.contains("couldn't infer type of 'x'"));
}

#[test]
fn globals_cannot_be_uninitialized() {
    let err = check_err("int g = undefined\n");
    assert!(err.message.contains("cannot be uninitialized"));

    // Locals may be.
    check("void f() {\n    int x = undefined\n}\n").unwrap();
}

#[test]
fn struct_values_move_on_assignment() {
    let options = CompileOptions::default();
    let mut map = SourceMap::new();
    let (file, _) = parser::parse_source(
        "test.vela",
        "struct Point {\n    int x\n    int y\n}\nvoid f() {\n    var p = Point(1, 2)\n    var q = p\n}\n",
        &options,
        &mut map,
    )
    .unwrap();
    let mut module = Module::new();
    module.add_source_file(file);

    let mut checker = Typechecker::new(&options);
    checker.check_module(&module).unwrap();
    // Both initializers produced non-copyable Point values.
    assert_eq!(checker.moved_values.len(), 2);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn missing_return_on_one_path_is_fatal() {
    let err = check_err("int f(int x) {\n    if (x > 0) {\n        return 1\n    }\n}\n");
    assert_eq!(err.kind, ErrorKind::ControlFlow);
    assert!(err.message.contains("missing a return statement"));
}

#[test]
fn returning_on_both_branches_fixes_it() {
    check("int f(int x) {\n    if (x > 0) {\n        return 1\n    } else {\n        return 2\n    }\n}\n")
        .unwrap();
}

#[test]
fn switch_with_all_returning_cases_and_default_is_complete() {
    check(concat!(
        "int f(int x) {\n",
        "    switch (x) {\n",
        "        case 0:\n",
        "            return 10\n",
        "        default:\n",
        "            return 20\n",
        "    }\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn duplicate_switch_defaults_are_a_single_error() {
    let err = check_err(concat!(
        "void f(int x) {\n",
        "    switch (x) {\n",
        "        default:\n",
        "            break\n",
        "        default:\n",
        "            break\n",
        "    }\n",
        "}\n",
    ));
    assert!(err.message.contains("one 'default' case"));
}

#[test]
fn switch_case_bindings_take_the_associated_value_type() {
    check(concat!(
        "enum Shape {\n",
        "    circle((float radius)),\n",
        "    square\n",
        "}\n",
        "float f(Shape s) {\n",
        "    switch (s) {\n",
        "        case Shape.circle as payload:\n",
        "            return payload.radius\n",
        "        default:\n",
        "            return 0.0\n",
        "    }\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn duplicate_enum_cases_are_fatal() {
    let err = check_err("enum Color {\n    red,\n    green,\n    red\n}\n");
    assert!(err.message.contains("duplicate enum case 'red'"));
}

// ============================================================================
// Generics
// ============================================================================

#[test]
fn type_templates_instantiate_lazily() {
    check(concat!(
        "struct Box<T> {\n",
        "    T value\n",
        "}\n",
        "int unwrap_box(Box<int> b) {\n",
        "    return b.value\n",
        "}\n",
        "void f() {\n",
        "    var b = Box<int>(42)\n",
        "    int x = unwrap_box(b)\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn generic_argument_arity_is_checked() {
    let err = check_err("struct Box<T> {\n    T value\n}\nvoid f(Box<int, bool> b) {}\n");
    assert_eq!(err.kind, ErrorKind::Arity);
    assert!(err.message.contains("expected 1 generic argument"));
}

#[test]
fn generic_instantiations_are_memoized_by_identity() {
    let options = CompileOptions::default();
    let mut map = SourceMap::new();
    let (file, _) = parser::parse_source(
        "test.vela",
        concat!(
            "struct Box<T> {\n",
            "    T value\n",
            "}\n",
            "void f() {\n",
            "    var a = Box<int>(1)\n",
            "}\n",
            "void g() {\n",
            "    var b = Box<int>(2)\n",
            "}\n",
        ),
        &options,
        &mut map,
    )
    .unwrap();
    let mut module = Module::new();
    module.add_source_file(file);

    let mut checker = Typechecker::new(&options);
    checker.check_module(&module).unwrap();

    let Some(Symbol::Type(cached)) = checker.symbols.find("Box<int>").first().cloned() else {
        panic!("instantiation should be registered under its qualified name");
    };
    let Some(Symbol::TypeTemplate(template)) = checker.symbols.find("Box").first().cloned() else {
        panic!("template should be registered");
    };

    // A third request from a new call site returns the identical cached
    // declaration, not a structurally equal copy.
    let again = checker
        .instantiator
        .instantiate_type(&template, &[Type::basic("int", cached.location)], cached.location)
        .unwrap();
    assert!(Rc::ptr_eq(&cached, &again));
}

#[test]
fn function_templates_support_explicit_and_inferred_arguments() {
    check(concat!(
        "T identity<T>(T value) {\n",
        "    return value\n",
        "}\n",
        "void f() {\n",
        "    int x = identity<int>(5)\n",
        "    int y = identity(7)\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn generic_constraints_must_be_interfaces() {
    let err = check_err(concat!(
        "struct Plain {\n",
        "    int x\n",
        "}\n",
        "void f<T: Plain>(T value) {\n",
        "}\n",
    ));
    assert!(err.message.contains("only interface types"));
}

// ============================================================================
// Interfaces
// ============================================================================

#[test]
fn conformance_failure_names_the_missing_requirement() {
    let err = check_err(concat!(
        "interface Printable {\n",
        "    void print()\n",
        "}\n",
        "struct Point: Printable {\n",
        "    int x\n",
        "}\n",
    ));
    assert_eq!(err.kind, ErrorKind::Conformance);
    assert!(err.message.contains("'print'"));
    assert!(err.message.contains("'Printable'"));
    assert_eq!(err.notes.len(), 1, "the requirement's location is attached as a note");
}

#[test]
fn providing_the_requirement_satisfies_conformance() {
    check(concat!(
        "interface Printable {\n",
        "    void print()\n",
        "}\n",
        "struct Point: Printable {\n",
        "    int x\n",
        "    void print() {}\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn default_bodies_are_copied_into_conforming_types() {
    check(concat!(
        "interface Greeter {\n",
        "    string name()\n",
        "    string greeting() {\n",
        "        return this.name()\n",
        "    }\n",
        "}\n",
        "struct Person: Greeter {\n",
        "    string title\n",
        "    string name() {\n",
        "        return this.title\n",
        "    }\n",
        "}\n",
        "string hello(Person p) {\n",
        "    return p.greeting()\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn conforming_to_a_non_interface_is_rejected() {
    let err = check_err(concat!(
        "struct Base {\n",
        "    int x\n",
        "}\n",
        "struct Derived: Base {\n",
        "    int y\n",
        "}\n",
    ));
    assert_eq!(err.kind, ErrorKind::Conformance);
    assert!(err.message.contains("not an interface"));
}

// ============================================================================
// Access levels
// ============================================================================

#[test]
fn private_types_are_invisible_to_public_signatures() {
    let err = check_err(concat!(
        "private struct Secret {\n",
        "    int value\n",
        "}\n",
        "Secret reveal() {\n",
        "    return Secret(42)\n",
        "}\n",
    ));
    assert!(err.message.contains("'Secret' is private"));

    check(concat!(
        "private struct Secret {\n",
        "    int value\n",
        "}\n",
        "private Secret reveal() {\n",
        "    return Secret(42)\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn private_fields_are_invisible_outside_their_type() {
    let err = check_err(concat!(
        "struct Vault {\n",
        "    private int secret\n",
        "    int peek() {\n",
        "        return this.secret\n",
        "    }\n",
        "}\n",
        "int f(Vault v) {\n",
        "    return v.secret\n",
        "}\n",
    ));
    assert!(err.message.contains("'secret' is private"));
}

// ============================================================================
// Initializers
// ============================================================================

#[test]
fn autogenerated_initializer_checks_and_constructs() {
    check(concat!(
        "struct Point {\n",
        "    int x\n",
        "    int y\n",
        "}\n",
        "Point origin() {\n",
        "    return Point(0, 0)\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn uninitialized_fields_warn_per_field() {
    let (result, warnings) = check_with_warnings(concat!(
        "struct Pair {\n",
        "    int first\n",
        "    int second\n",
        "    init(int value) {\n",
        "        this.first = value\n",
        "    }\n",
        "}\n",
    ));
    result.unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("doesn't initialize member variable 'second'"));
}

#[test]
fn delegating_initializers_do_not_warn() {
    let (result, warnings) = check_with_warnings(concat!(
        "struct Pair {\n",
        "    int first\n",
        "    int second\n",
        "    init(int first, int second) {\n",
        "        this.first = first\n",
        "        this.second = second\n",
        "    }\n",
        "    init(int value) {\n",
        "        init(value, value)\n",
        "    }\n",
        "}\n",
    ));
    result.unwrap();
    assert!(warnings.is_empty(), "delegation suppresses the warning: {warnings:?}");
}

// ============================================================================
// Operators and lambdas
// ============================================================================

#[test]
fn operator_functions_apply_to_their_operand_types() {
    check(concat!(
        "struct Point {\n",
        "    int x\n",
        "    int y\n",
        "}\n",
        "Point operator+(Point a, Point b) {\n",
        "    return Point(a.x + b.x, a.y + b.y)\n",
        "}\n",
        "Point translate(Point a, Point b) {\n",
        "    return a + b\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn subscript_operator_members_type_subscripts() {
    check(concat!(
        "struct Buffer {\n",
        "    int length\n",
        "    int operator[](int index) {\n",
        "        return index\n",
        "    }\n",
        "}\n",
        "int f(Buffer b) {\n",
        "    return b[3]\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn lambda_return_types_are_inferred_from_their_body() {
    check(concat!(
        "void f() {\n",
        "    var double = (int x) -> x * 2\n",
        "    int y = double(21)\n",
        "}\n",
    ))
    .unwrap();
}

#[test]
fn unwrap_requires_an_optional() {
    check("int f(int? x) {\n    return x!\n}\n").unwrap();

    let err = check_err("int f(int x) {\n    return x!\n}\n");
    assert!(err.message.contains("non-optional"));
}

// ============================================================================
// Imports
// ============================================================================

#[test]
fn unresolved_imports_are_fatal() {
    let err = check_err("import missing_module\n");
    assert_eq!(err.kind, ErrorKind::UnresolvedImport);
    assert!(err.message.contains("missing_module"));
}

#[test]
fn resolved_imports_pass() {
    use super::imports::{ImportOutcome, ModuleImporter};

    struct StubImporter;
    impl ModuleImporter for StubImporter {
        fn import_module(&mut self, target: &str) -> ImportOutcome {
            if target == "math" {
                ImportOutcome::Resolved
            } else {
                ImportOutcome::NotFound
            }
        }
    }

    let options = CompileOptions::default();
    let mut map = SourceMap::new();
    let (file, _) = parser::parse_source("test.vela", "import math\n", &options, &mut map).unwrap();
    let mut module = Module::new();
    module.add_source_file(file);

    let mut importer = StubImporter;
    let mut checker = Typechecker::new(&options).with_module_importer(&mut importer);
    checker.check_module(&module).unwrap();
}

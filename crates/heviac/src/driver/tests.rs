use super::*;
use crate::ast::{AstBuilder, Constant, Fixity, NodeKind};
use crate::common::{ErrorKind, Span};
use crate::import::MemoryProvider;
use crate::sema::ScopeId;
use crate::types::Associativity;
use pretty_assertions::assert_eq;

fn analyze(ast: &mut Ast) -> CompileResult<Analysis> {
    Compiler::default().analyze(ast)
}

fn type_of(ast: &Ast, id: NodeId) -> String {
    ast.resolved_type(id)
        .map(|ty| ast.type_name(&ty).to_string())
        .unwrap_or_default()
}

fn body_of(ast: &Ast, block: NodeId) -> Vec<NodeId> {
    match ast.kind(block) {
        NodeKind::Block { body } => body.clone(),
        _ => Vec::new(),
    }
}

/// Tiny line format for module sources: `import x`, `let x`, `func x`
struct LineParser;

impl SourceParser for LineParser {
    fn parse(&self, source: &str, path: &Path, ast: &mut Ast) -> CompileResult<NodeId> {
        let mut b = AstBuilder::new(ast);
        let mut body = Vec::new();
        for line in source.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let (word, arg) = line.split_once(' ').unwrap_or((line, ""));
            let stmt = match word {
                "import" => b.import(&[arg]),
                "let" => {
                    let one = b.number("1");
                    b.let_(arg, None, Some(one))
                }
                "func" => {
                    let one = b.number("1");
                    let ret = b.ret(Some(one));
                    b.function(arg, vec![], Some("Int"), vec![ret])
                }
                _ => {
                    return Err(CompileError::import(format!("Unknown line '{}'", line), path));
                }
            };
            body.push(stmt);
        }
        let body = b.block(body);
        Ok(b.ast().add(NodeKind::Program { body }, None))
    }
}

/// Writes every variable under its emit name
struct Names;

impl Emitter for Names {
    fn name(&self) -> &'static str {
        "names"
    }

    fn emit(&self, ast: &Ast, root: NodeId, writer: &mut Writer) -> CompileResult<()> {
        for id in ast.descendants(root) {
            if let NodeKind::Variable(var) = ast.kind(id) {
                let name = ast.ann(id).emit_name.unwrap_or(var.name);
                writer.line(ast.name(name));
            }
        }
        Ok(())
    }
}

#[test]
fn test_expressions_are_typed() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let two = b.number("2");
    let sum = b.binary("+", one, two);
    let x = b.var("x", None, Some(sum));
    let hi = b.string("hi");
    let s = b.let_("s", Some("String"), Some(hi));
    let read = b.ident("x");
    let limit = b.number("2");
    let test = b.binary(">", read, limit);
    let then = b.ident("x");
    let zero = b.number("0");
    let pick = b.ternary(test, then, zero);
    let c = b.let_("c", None, Some(pick));
    let shown = b.ident("c");
    let print = b.call("print", vec![shown]);
    let root = b.program(vec![x, s, c, print]);

    analyze(&mut ast).unwrap();

    for id in ast.descendants(root) {
        if matches!(
            ast.tag(id),
            NodeTag::Literal | NodeTag::Binary | NodeTag::Member | NodeTag::Call | NodeTag::Ternary
        ) {
            assert!(ast.resolved_type(id).is_some(), "{} has no type", ast.tag(id));
        }
    }
    assert_eq!(type_of(&ast, x), "Int");
    assert_eq!(type_of(&ast, s), "String");
    assert_eq!(type_of(&ast, test), "Boolean");
    assert_eq!(type_of(&ast, c), "Int");
    assert_eq!(type_of(&ast, print), "Void");
    assert!(ast.ann(x).is_inferenced);
    assert!(!ast.ann(s).is_inferenced);
}

#[test]
fn test_double_arithmetic() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let half = b.number("1.5");
    let two = b.number("2.0");
    let product = b.binary("*", half, two);
    let d = b.let_("d", None, Some(product));
    b.program(vec![d]);

    analyze(&mut ast).unwrap();
    assert_eq!(type_of(&ast, product), "Double");
    assert_eq!(type_of(&ast, d), "Double");

    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let half = b.number("1.5");
    let one = b.number("1");
    let mixed = b.binary("+", half, one);
    b.program(vec![mixed]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.message(), "Operator '+' expected 'Double' but got 'Int'");
}

#[test]
fn test_block_locals_are_invisible_outside() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let y = b.let_("y", None, Some(one));
    let yes = b.boolean(true);
    let branch = b.if_(yes, vec![y], None);
    let read = b.ident("y");
    let print = b.call("print", vec![read]);
    b.program(vec![branch, print]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameResolution);
    assert_eq!(err.message(), "'y' is not defined");
}

#[test]
fn test_redeclaration_in_same_scope() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let first = b.var("a", None, Some(one));
    let two = b.number("2");
    let second = b.var("a", None, Some(two));
    b.program(vec![first, second]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Redeclaration);
    assert_eq!(err.message(), "'a' is already declared in this scope");
}

#[test]
fn test_shadowing_is_renamed() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let outer = b.var("x", None, Some(one));
    let text = b.string("s");
    let inner = b.var("x", None, Some(text));
    let read = b.ident("x");
    let print = b.call("print", vec![read]);
    let func = b.function("f", vec![], None, vec![inner, print]);
    b.program(vec![outer, func]);

    analyze(&mut ast).unwrap();

    assert_eq!(type_of(&ast, outer), "Int");
    assert_eq!(type_of(&ast, inner), "String");
    assert_eq!(type_of(&ast, read), "String");
    assert_eq!(type_of(&ast, func), "Void");
    assert_eq!(ast.ann(outer).emit_name, None);
    let renamed = ast.ann(inner).emit_name.map(|name| ast.name(name).to_string());
    assert_eq!(renamed.as_deref(), Some("x_1"));
    assert_eq!(ast.ann(read).emit_name, ast.ann(inner).emit_name);
}

#[test]
fn test_rename_can_be_disabled() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let outer = b.var("x", None, Some(one));
    let two = b.number("2");
    let inner = b.var("x", None, Some(two));
    let func = b.function("f", vec![], None, vec![inner]);
    b.program(vec![outer, func]);

    let config = AnalysisConfig {
        rename_identifiers: false,
        ..AnalysisConfig::default()
    };
    Compiler::new(config).analyze(&mut ast).unwrap();
    assert_eq!(ast.ann(inner).emit_name, None);
}

#[test]
fn test_second_pass_registers_nothing() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let zero = b.number("0");
    let i = b.var("i", None, Some(zero));
    let read = b.ident("i");
    let three = b.number("3");
    let test = b.binary("<", read, three);
    let target = b.ident("i");
    let value = b.ident("i");
    let one = b.number("1");
    let next = b.binary("+", value, one);
    let step = b.assign(target, next);
    let stop = b.break_();
    let current = b.ident("i");
    let two = b.number("2");
    let done = b.binary("==", current, two);
    let check = b.if_(done, vec![stop], None);
    let looping = b.while_(test, vec![step, check]);
    let func = b.function("count", vec![], None, vec![i, looping]);
    let red = b.ident("Red");
    let green = b.ident("Green");
    let color = b.enumeration("Color", vec![red, green]);
    let root = b.program(vec![func, color]);

    let Analysis {
        root: analyzed,
        mut scopes,
        mut context,
    } = analyze(&mut ast).unwrap();
    assert_eq!(analyzed, root);

    let owners: Vec<ScopeId> = ast.ids().filter_map(|id| ast.ann(id).context).collect();
    assert_eq!(owners.len(), scopes.len());
    let sizes = |scopes: &ScopeArena| -> Vec<usize> {
        owners.iter().map(|scope| scopes.get(*scope).len()).collect()
    };
    let before = sizes(&scopes);

    context.set_phase(Phase::Semantic);
    let mut imports = ImportResolver::default();
    Walker::new(&mut ast, &mut scopes, &mut context, &mut imports)
        .walk(root)
        .unwrap();

    assert_eq!(scopes.len(), owners.len());
    assert_eq!(sizes(&scopes), before);
}

#[test]
fn test_statements_hang_off_their_owner() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let ret = b.ret(Some(one));
    let func = b.function("f", vec![], Some("Int"), vec![ret]);
    let yes = b.boolean(true);
    let inner = b.number("2");
    let local = b.let_("y", None, Some(inner));
    let branch = b.if_(yes, vec![local], None);
    let root = b.program(vec![func, branch]);

    analyze(&mut ast).unwrap();

    assert_eq!(ast.parent(ret), Some(func));
    assert_eq!(ast.parent(func), Some(root));
    let NodeKind::If { consequent, .. } = ast.kind(branch) else {
        panic!("expected if");
    };
    assert_eq!(ast.parent(local), Some(*consequent));
    assert!(ast.ann(*consequent).context.is_some());
}

#[test]
fn test_reference_marks_reach_earlier_uses() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let n = b.inout_param("n", "Int");
    let lhs = b.ident("n");
    let value = b.ident("n");
    let one = b.number("1");
    let sum = b.binary("+", value, one);
    let bump = b.assign(lhs, sum);
    let inc = b.function("inc", vec![n], None, vec![bump]);
    let zero = b.number("0");
    let count = b.var("count", None, Some(zero));
    let before = b.ident("count");
    let print_before = b.call("print", vec![before]);
    let arg = b.ident("count");
    let call = b.call("inc", vec![arg]);
    let after = b.ident("count");
    let print_after = b.call("print", vec![after]);
    b.program(vec![inc, count, print_before, call, print_after]);

    analyze(&mut ast).unwrap();

    assert!(ast.ann(n).is_argument);
    assert!(ast.ann(n).is_reference);
    assert!(ast.ann(lhs).is_reference);
    assert!(ast.ann(count).is_pointer);
    assert!(ast.ann(before).is_reference);
    assert!(ast.ann(after).is_reference);
    assert!(ast.ann(arg).is_parameter);
    assert!(ast.ann(arg).is_reference_argument);
    assert!(!ast.ann(arg).is_reference);
}

#[test]
fn test_later_shadow_is_invisible_to_earlier_uses() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let outer = b.var("x", None, Some(one));
    let read = b.ident("x");
    let y = b.var("y", Some("Int"), Some(read));
    let text = b.string("s");
    let inner = b.var("x", None, Some(text));
    let result = b.ident("y");
    let ret = b.ret(Some(result));
    let func = b.function("f", vec![], Some("Int"), vec![y, inner, ret]);
    b.program(vec![outer, func]);

    analyze(&mut ast).unwrap();
    assert_eq!(type_of(&ast, read), "Int");
    assert_eq!(type_of(&ast, inner), "String");
    assert!(ast.ann(inner).emit_name.is_some());
    assert_eq!(ast.ann(read).emit_name, None);
}

#[test]
fn test_reference_marks_skip_later_shadow() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let n = b.inout_param("n", "Int");
    let inc = b.function("inc", vec![n], None, vec![]);
    let zero = b.number("0");
    let outer = b.var("c", None, Some(zero));
    let read = b.ident("c");
    let print = b.call("print", vec![read]);
    let five = b.number("5");
    let inner = b.var("c", None, Some(five));
    let g = b.function("g", vec![], None, vec![print, inner]);
    let arg = b.ident("c");
    let call = b.call("inc", vec![arg]);
    b.program(vec![inc, outer, g, call]);

    analyze(&mut ast).unwrap();
    assert!(ast.ann(outer).is_pointer);
    assert!(!ast.ann(inner).is_pointer);
    assert!(ast.ann(read).is_reference);
}

fn inout_call(argument: impl FnOnce(&mut AstBuilder<'_>) -> (Vec<NodeId>, NodeId)) -> CompileError {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let n = b.inout_param("n", "Int");
    let inc = b.function("inc", vec![n], None, vec![]);
    let (mut setup, operand) = argument(&mut b);
    let call = b.call("inc", vec![operand]);
    let mut body = vec![inc];
    body.append(&mut setup);
    body.push(call);
    b.program(body);
    analyze(&mut ast).unwrap_err()
}

#[test]
fn test_inout_rejects_constants() {
    let err = inout_call(|b| {
        let one = b.number("1");
        let k = b.const_("k", None, Some(one));
        (vec![k], b.ident("k"))
    });
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Cannot pass immutable 'k' as reference to 'n' of 'inc'");

    let err = inout_call(|b| (vec![], b.number("1")));
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Argument 'n' of 'inc' is not mutable");
}

/// `operator infix <+> { init(inout a: Int, b: Int) -> Int { return b } }`
fn bump_operator(b: &mut AstBuilder<'_>) -> NodeId {
    let a = b.inout_param("a", "Int");
    let c = b.param("b", "Int");
    let value = b.ident("b");
    let ret = b.ret(Some(value));
    b.operator("<+>", Fixity::Infix, None, None, vec![a, c], Some("Int"), vec![ret])
}

#[test]
fn test_operator_inout_operand() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let op = bump_operator(&mut b);
    let zero = b.number("0");
    let v = b.var("v", None, Some(zero));
    let before = b.ident("v");
    let print = b.call("print", vec![before]);
    let left = b.ident("v");
    let one = b.number("1");
    let apply = b.binary("<+>", left, one);
    b.program(vec![op, v, print, apply]);

    analyze(&mut ast).unwrap();
    assert_eq!(type_of(&ast, apply), "Int");
    assert!(ast.ann(left).is_operator_parameter);
    assert!(!ast.ann(left).is_reference);
    assert!(!ast.ann(one).is_operator_parameter);
    assert!(ast.ann(v).is_pointer);
    assert!(ast.ann(before).is_reference);
}

#[test]
fn test_operator_inout_rejects_constants() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let op = bump_operator(&mut b);
    let one = b.number("1");
    let k = b.const_("k", None, Some(one));
    let left = b.ident("k");
    let two = b.number("2");
    let apply = b.binary("<+>", left, two);
    b.program(vec![op, k, apply]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Cannot pass immutable 'k' as reference to 'a' of '<+>'");

    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let op = bump_operator(&mut b);
    let one = b.number("1");
    let two = b.number("2");
    let apply = b.binary("<+>", one, two);
    b.program(vec![op, apply]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Argument 'a' of '<+>' is not mutable");
}

#[test]
fn test_operator_operand_types() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let op = bump_operator(&mut b);
    let zero = b.number("0");
    let v = b.var("v", None, Some(zero));
    let left = b.ident("v");
    let text = b.string("s");
    let apply = b.binary("<+>", left, text);
    b.program(vec![op, v, apply]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.message(), "Operator '<+>' expected 'Int' but got 'String'");
}

#[test]
fn test_void_function_returning_value() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let ret = b.ret(Some(one));
    let func = b.function("f", vec![], Some("Void"), vec![ret]);
    b.program(vec![func]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.message(), "'f' is declared 'Void' but returns 'Int'");
}

#[test]
fn test_missing_return() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let print = b.call("print", vec![one]);
    let func = b.function("f", vec![], Some("Int"), vec![print]);
    b.program(vec![func]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "'f' must return a value of type 'Int'");
}

fn inferred_program(ast: &mut Ast) -> (NodeId, NodeId) {
    let mut b = AstBuilder::new(ast);
    let half = b.number("1.5");
    let ret = b.ret(Some(half));
    let func = b.function("f", vec![], None, vec![ret]);
    let call = b.call("f", vec![]);
    let d = b.let_("d", None, Some(call));
    b.program(vec![func, d]);
    (func, d)
}

#[test]
fn test_return_type_inference() {
    let mut ast = Ast::new();
    let (func, d) = inferred_program(&mut ast);

    analyze(&mut ast).unwrap();
    assert!(ast.ann(func).is_inferenced);
    assert_eq!(type_of(&ast, func), "Double");
    assert_eq!(type_of(&ast, d), "Double");
}

#[test]
fn test_inference_can_be_disabled() {
    let mut ast = Ast::new();
    inferred_program(&mut ast);

    let config = AnalysisConfig {
        infer_return_types: false,
        ..AnalysisConfig::default()
    };
    let err = Compiler::new(config).analyze(&mut ast).unwrap_err();
    assert_eq!(err.message(), "'f' is declared 'Void' but returns 'Double'");
}

#[test]
fn test_forward_call_to_hoisted_function() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let call = b.call("later", vec![]);
    let v = b.let_("v", None, Some(call));
    let two = b.number("2");
    let ret = b.ret(Some(two));
    let later = b.function("later", vec![], Some("Int"), vec![ret]);
    b.program(vec![v, later]);

    analyze(&mut ast).unwrap();
    assert_eq!(type_of(&ast, v), "Int");
}

fn color_program(ast: &mut Ast, key: &str) -> NodeId {
    let mut b = AstBuilder::new(ast);
    let red = b.ident("Red");
    let green = b.ident("Green");
    let blue = b.ident("Blue");
    let color = b.enumeration("Color", vec![red, green, blue]);
    let object = b.ident("Color");
    let member = b.member(object, key);
    let g = b.let_("g", None, Some(member));
    b.program(vec![color, g]);
    member
}

#[test]
fn test_enum_member_value() {
    let mut ast = Ast::new();
    let member = color_program(&mut ast, "Green");

    analyze(&mut ast).unwrap();
    assert_eq!(ast.ann(member).enum_value, Some(1));
    assert_eq!(type_of(&ast, member), "Int");
    assert!(ast.ann(member).is_constant);
    assert!(ast.ann(member).is_absolute);
}

#[test]
fn test_unknown_enum_member() {
    let mut ast = Ast::new();
    color_program(&mut ast, "Purple");

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameResolution);
    assert_eq!(err.message(), "Enum 'Color' has no member 'Purple'");
}

#[test]
fn test_enum_explicit_values_and_shorthand() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let five = b.number("5");
    let low = b.enum_key_value("Low", five);
    let high = b.ident("High");
    let level = b.enumeration("Level", vec![low, high]);
    let short = b.enum_shorthand("High");
    let h = b.let_("h", None, Some(short));
    b.program(vec![level, h]);

    analyze(&mut ast).unwrap();
    assert_eq!(ast.ann(low).enum_value, Some(5));
    assert_eq!(ast.ann(high).enum_value, Some(6));
    assert_eq!(ast.ann(short).enum_value, Some(6));
    let NodeKind::Member { object, .. } = ast.kind(short) else {
        panic!("expected member");
    };
    let object = object.expect("shorthand object filled in");
    assert_eq!(ast.identifier(object).map(|name| ast.name(name)), Some("Level"));
}

#[test]
fn test_enum_value_overflow() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let max = b.number("9223372036854775807");
    let a = b.enum_key_value("A", max);
    let next = b.ident("B");
    let e = b.enumeration("E", vec![a, next]);
    b.program(vec![e]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "Value of enum key 'B' overflows");
}

#[test]
fn test_condition_must_be_boolean() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let other = b.number("1");
    let sum = b.binary("+", one, other);
    let sum = b.at(sum, Span::at(3, 7));
    let branch = b.if_(sum, vec![], None);
    b.program(vec![branch]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(
        err.to_string(),
        "Condition expected 'Boolean' but got 'Int' at 3:7"
    );
}

#[test]
fn test_arity() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let a = b.param("a", "Int");
    let c = b.param("b", "Int");
    let left = b.ident("a");
    let right = b.ident("b");
    let sum = b.binary("+", left, right);
    let ret = b.ret(Some(sum));
    let add = b.function("add", vec![a, c], Some("Int"), vec![ret]);
    let one = b.number("1");
    let call = b.call("add", vec![one]);
    b.program(vec![add, call]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
    assert_eq!(
        err.message(),
        "Not enough arguments in call to 'add': expected 2, got 1"
    );
}

#[test]
fn test_too_many_arguments() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let a = b.param("a", "Int");
    let value = b.ident("a");
    let ret = b.ret(Some(value));
    let id = b.function("id", vec![a], Some("Int"), vec![ret]);
    let one = b.number("1");
    let two = b.number("2");
    let call = b.call("id", vec![one, two]);
    b.program(vec![id, call]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
    assert_eq!(
        err.message(),
        "Too many arguments in call to 'id': expected 1, got 2"
    );
}

#[test]
fn test_ternary_branches_must_agree() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let test = b.boolean(true);
    let one = b.number("1");
    let text = b.string("s");
    let pick = b.ternary(test, one, text);
    let t = b.let_("t", None, Some(pick));
    b.program(vec![t]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.message(), "Ternary branches expected 'Int' but got 'String'");
}

#[test]
fn test_increment_needs_mutable_storage() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let k = b.const_("k", None, Some(one));
    let target = b.ident("k");
    let bump = b.postfix("++", target);
    b.program(vec![k, bump]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Operator '++' cannot modify a constant");

    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let drop = b.prefix("--", one);
    b.program(vec![drop]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Operator '--' needs an assignable operand");
}

#[test]
fn test_assignment_to_constant() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let k = b.const_("k", None, Some(one));
    let target = b.ident("k");
    let two = b.number("2");
    let assign = b.assign(target, two);
    b.program(vec![k, assign]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "Constant 'k' is immutable");
}

#[test]
fn test_break_outside_loop() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let stop = b.break_();
    let func = b.function("f", vec![], None, vec![stop]);
    b.program(vec![func]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "'break' is only valid inside a loop");
}

#[test]
fn test_operator_markers_outside_operator() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let level = b.precedence(10);
    b.program(vec![level]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "'precedence' is only allowed inside an operator declaration");

    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let marker = b.associativity(Associativity::Right);
    let func = b.function("f", vec![], None, vec![marker]);
    b.program(vec![func]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "'associativity' is only allowed inside an operator declaration");
}

/// `class Point { init(x: Int) {} var x: Int = 0; func norm() -> Int { return this.x } }`
fn point_class(b: &mut AstBuilder<'_>) -> (NodeId, NodeId) {
    let px = b.param("x", "Int");
    let ctor = b.constructor(vec![px], None, vec![]);
    let zero = b.number("0");
    let field = b.var("x", Some("Int"), Some(zero));
    let this = b.this();
    let read = b.member(this, "x");
    let ret = b.ret(Some(read));
    let norm = b.function("norm", vec![], Some("Int"), vec![ret]);
    (b.class("Point", vec![ctor, field, norm]), ctor)
}

#[test]
fn test_class_instances_and_members() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let (class, ctor) = point_class(&mut b);
    let three = b.number("3");
    let create = b.call("Point", vec![three]);
    let p = b.let_("p", None, Some(create));
    let object = b.ident("p");
    let member = b.member(object, "x");
    let n = b.let_("n", None, Some(member));
    b.program(vec![class, p, n]);

    analyze(&mut ast).unwrap();

    let NodeKind::Class(decl) = ast.kind(class) else {
        panic!("expected class");
    };
    assert_eq!(body_of(&ast, decl.body).last(), Some(&ctor));
    assert_eq!(ast.ann(class).constructor, Some(ctor));
    assert_eq!(type_of(&ast, p), "Point");
    assert_eq!(type_of(&ast, n), "Int");
    assert!(ast.ann(p).is_instantiated_class);
    assert!(ast.ann(create).is_class_creation);
    assert!(ast.ann(member).is_absolute);
}

#[test]
fn test_member_of_copy_is_not_an_instance() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let (class, _) = point_class(&mut b);
    let three = b.number("3");
    let create = b.call("Point", vec![three]);
    let p = b.let_("p", None, Some(create));
    let copy = b.ident("p");
    let q = b.let_("q", None, Some(copy));
    let object = b.ident("q");
    let member = b.member(object, "x");
    let m = b.let_("m", None, Some(member));
    b.program(vec![class, p, q, m]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "'q' is not an instance of 'Point'");
}

#[test]
fn test_constructor_arity() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let (class, _) = point_class(&mut b);
    let create = b.call("Point", vec![]);
    let p = b.let_("p", None, Some(create));
    b.program(vec![class, p]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
    assert_eq!(
        err.message(),
        "Not enough arguments in call to 'Point': expected 1, got 0"
    );
}

#[test]
fn test_class_needs_constructor() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let class = b.class("Empty", vec![]);
    b.program(vec![class]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.message(), "Class 'Empty' has no constructor");
}

#[test]
fn test_class_name_is_immutable() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let (class, _) = point_class(&mut b);
    let target = b.ident("Point");
    let one = b.number("1");
    let assign = b.assign(target, one);
    b.program(vec![class, assign]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Mutability);
    assert_eq!(err.message(), "'Point' is immutable");
}

#[test]
fn test_instance_member_through_class_name() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let (class, _) = point_class(&mut b);
    let object = b.ident("Point");
    let member = b.member(object, "x");
    let n = b.let_("n", None, Some(member));
    b.program(vec![class, n]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "Cannot access non-static member 'x' through class 'Point'");
}

#[test]
fn test_static_member_through_this() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let zero = b.number("0");
    let count = b.var("count", Some("Int"), Some(zero));
    let count = b.make_static(count);
    let this = b.this();
    let read = b.member(this, "count");
    let ret = b.ret(Some(read));
    let total = b.function("total", vec![], Some("Int"), vec![ret]);
    let ctor = b.constructor(vec![], None, vec![]);
    let class = b.class("Counter", vec![count, total, ctor]);
    b.program(vec![class]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "Static member 'count' cannot be accessed through 'this'");
}

#[test]
fn test_second_constructor() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let first = b.constructor(vec![], None, vec![]);
    let second = b.constructor(vec![], None, vec![]);
    let class = b.class("Twice", vec![first, second]);
    b.program(vec![class]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "Class 'Twice' has more than one constructor");
}

#[test]
fn test_computed_property_outside_class() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let ret = b.ret(Some(one));
    let get = b.getter(vec![ret]);
    let prop = b.computed("p", "Int", vec![get]);
    b.program(vec![prop]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "Accessors are only allowed on class properties");

    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let prop = b.computed("p", "Int", vec![]);
    b.program(vec![prop]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "Computed property 'p' must be declared inside a class");
}

#[test]
fn test_getter_must_return() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let print = b.call("print", vec![one]);
    let get = b.getter(vec![print]);
    let area = b.computed("area", "Int", vec![get]);
    let ctor = b.constructor(vec![], None, vec![]);
    let class = b.class("Square", vec![area, ctor]);
    b.program(vec![class]);

    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.message(), "'area.get' must return a value of type 'Int'");
}

#[test]
fn test_custom_operator() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let a = b.param("a", "Int");
    let c = b.param("b", "Int");
    let left = b.ident("a");
    let ret = b.ret(Some(left));
    let op = b.operator(
        "<>",
        Fixity::Infix,
        Some(140),
        Some(Associativity::Left),
        vec![a, c],
        Some("Int"),
        vec![ret],
    );
    let one = b.number("1");
    let two = b.number("2");
    let apply = b.binary("<>", one, two);
    let r = b.let_("r", None, Some(apply));
    b.program(vec![op, r]);

    analyze(&mut ast).unwrap();

    assert_eq!(type_of(&ast, op), "Int");
    assert_eq!(type_of(&ast, r), "Int");
    assert_eq!(ast.ann(op).precedence, Some(140));
    assert_eq!(ast.ann(apply).precedence, Some(140));
    assert_eq!(ast.ann(apply).associativity, Some(Associativity::Left));
    // Custom operators are never folded
    assert_eq!(ast.ann(apply).constant, None);
}

#[test]
fn test_constant_folding() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let two = b.number("2");
    let three = b.number("3");
    let product = b.binary("*", two, three);
    let one = b.number("1");
    let sum = b.binary("+", product, one);
    let k = b.let_("k", None, Some(sum));
    let small = b.number("1");
    let large = b.number("2");
    let less = b.binary("<", small, large);
    let not = b.prefix("!", less);
    let flag = b.let_("flag", None, Some(not));
    b.program(vec![k, flag]);

    analyze(&mut ast).unwrap();
    assert_eq!(ast.ann(sum).constant, Some(Constant::Int(7)));
    assert_eq!(ast.ann(not).constant, Some(Constant::Boolean(false)));
    assert_eq!(type_of(&ast, flag), "Boolean");
}

fn module_files() -> MemoryProvider {
    let mut files = MemoryProvider::new();
    files.insert("app/main.hevia", "import math\nlet x");
    files.insert("app/math.hevia", "func one\nimport util");
    files.insert("app/util/index.hevia", "let helper");
    files
}

#[test]
fn test_imports_are_spliced() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let import = b.import(&["math"]);
    let call = b.call("one", vec![]);
    let x = b.let_("x", None, Some(call));
    let root = b.program(vec![import, x]);

    let mut compiler = Compiler::with_provider(AnalysisConfig::default(), Box::new(module_files()));
    compiler.set_parser(Box::new(LineParser));
    compiler.set_root("app");
    compiler.analyze(&mut ast).unwrap();

    let NodeKind::Program { body } = ast.kind(root) else {
        panic!("expected program");
    };
    let statements = body_of(&ast, *body);
    let names: Vec<&str> = statements
        .iter()
        .filter_map(|id| ast.declared_name(*id))
        .map(|name| ast.name(name))
        .collect();
    assert_eq!(names, vec!["one", "helper", "x"]);
    assert_eq!(ast.ann(statements[0]).import_uid, Some(1));
    assert_eq!(ast.ann(statements[1]).import_uid, Some(2));
    assert_eq!(ast.ann(statements[2]).import_uid, None);
    assert_eq!(type_of(&ast, x), "Int");
}

#[test]
fn test_missing_import() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let import = b.import(&["nope"]);
    b.program(vec![import]);

    let mut compiler = Compiler::with_provider(AnalysisConfig::default(), Box::new(module_files()));
    compiler.set_parser(Box::new(LineParser));
    compiler.set_root("app");
    let err = compiler.analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Import);
    assert_eq!(err.message(), "Cannot resolve module 'nope'");
}

#[test]
fn test_cyclic_imports() {
    let mut files = MemoryProvider::new();
    files.insert("app/self.hevia", "import self");
    files.insert("app/a.hevia", "import b");
    files.insert("app/b.hevia", "let shared\nimport a");

    for entry in ["self", "a"] {
        let mut ast = Ast::new();
        let mut b = AstBuilder::new(&mut ast);
        let import = b.import(&[entry]);
        b.program(vec![import]);

        let mut compiler = Compiler::with_provider(AnalysisConfig::default(), Box::new(files.clone()));
        compiler.set_parser(Box::new(LineParser));
        compiler.set_root("app");
        let err = compiler.analyze(&mut ast).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Import);
        assert_eq!(err.message(), format!("Cyclic import of '{}'", entry));
    }
}

#[test]
fn test_entry_file_cannot_be_imported() {
    let mut files = MemoryProvider::new();
    files.insert("app/main.hevia", "let x\nimport main");

    let mut compiler = Compiler::with_provider(AnalysisConfig::default(), Box::new(files));
    compiler.set_parser(Box::new(LineParser));
    let Err(err) = compiler.compile_file(Path::new("app/main.hevia")) else {
        panic!("expected a cyclic import");
    };
    assert_eq!(err.kind(), ErrorKind::Import);
    assert_eq!(err.message(), "Cyclic import of 'main'");
}

#[test]
fn test_repeated_import_is_spliced_once() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let first = b.import(&["util"]);
    let second = b.import(&["util"]);
    let root = b.program(vec![first, second]);

    let mut compiler = Compiler::with_provider(AnalysisConfig::default(), Box::new(module_files()));
    compiler.set_parser(Box::new(LineParser));
    compiler.set_root("app");
    compiler.analyze(&mut ast).unwrap();

    let NodeKind::Program { body } = ast.kind(root) else {
        panic!("expected program");
    };
    let names: Vec<&str> = body_of(&ast, *body)
        .iter()
        .filter_map(|id| ast.declared_name(*id))
        .map(|name| ast.name(name))
        .collect();
    assert_eq!(names, vec!["helper"]);
}

#[test]
fn test_emitters_run_in_order() {
    let mut ast = Ast::new();
    let mut b = AstBuilder::new(&mut ast);
    let one = b.number("1");
    let outer = b.var("x", None, Some(one));
    let text = b.string("s");
    let inner = b.var("x", None, Some(text));
    let func = b.function("f", vec![], None, vec![inner]);
    b.program(vec![outer, func]);

    let mut compiler = Compiler::default();
    compiler.register_emitter(Box::new(Names)).unwrap();
    compiler.register_emitter(Box::new(OutlineEmitter)).unwrap();
    assert!(compiler.register_emitter(Box::new(Names)).is_err());

    let outputs = compiler.compile(&mut ast).unwrap();
    let names: Vec<&str> = outputs.iter().map(|output| output.name).collect();
    assert_eq!(names, vec!["names", "outline"]);
    assert_eq!(outputs[0].text, "x\nx_1\n");
    assert!(outputs[1].text.contains("FunctionDeclaration f: Void"));
}

#[test]
fn test_compile_file() {
    let mut compiler = Compiler::with_provider(AnalysisConfig::default(), Box::new(module_files()));
    compiler.set_parser(Box::new(LineParser));
    compiler.register_emitter(Box::new(Names)).unwrap();

    let (ast, outputs) = compiler.compile_file(Path::new("app/main.hevia")).unwrap();
    assert_eq!(outputs[0].text, "helper\nx\n");
    assert!(ast.root().is_some());
}

#[test]
fn test_missing_root() {
    let mut ast = Ast::new();
    let err = analyze(&mut ast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

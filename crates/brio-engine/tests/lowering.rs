//! End-to-end lowering tests: whole programs through the pipeline,
//! asserting the structure of the produced IR

use brio_engine::ast::{
    AssignExpr, BinaryExpr, BinaryOp, Block, CallExpr, ClassDecl, Expression, ExpressionStmt,
    FieldDecl, ForeachStmt, FunctionDecl, IfStmt, ImportStmt, IndexedExpr, MemberExpr, NewExpr,
    NumberExpr, Param, Program, RangeExpr, ReturnStmt, Span, Statement, StringExpr, SymbolExpr,
    TypeName, VariableDecl,
};
use brio_engine::error::CompileError;
use brio_engine::ir::{
    CastKind, IntPredicate, IrConstant, IrFunction, IrInstr, IrValue, RuntimeFn, Terminator,
};
use brio_engine::{compile, IrModule};

fn num(value: f64) -> Expression {
    Expression::Number(NumberExpr {
        value,
        span: Span::default(),
    })
}

fn string(value: &str) -> Expression {
    Expression::Str(StringExpr {
        value: value.to_string(),
        span: Span::default(),
    })
}

fn sym(name: &str) -> Expression {
    Expression::Symbol(SymbolExpr {
        name: name.to_string(),
        span: Span::default(),
    })
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span: Span::default(),
    })
}

fn assign(target: Expression, value: Expression) -> Expression {
    Expression::Assignment(AssignExpr {
        target: Box::new(target),
        value: Box::new(value),
        span: Span::default(),
    })
}

fn member(object: Expression, property: &str) -> Expression {
    Expression::Member(MemberExpr {
        object: Box::new(object),
        property: property.to_string(),
        span: Span::default(),
    })
}

fn indexed(target: Expression, indices: Vec<Expression>) -> Expression {
    Expression::Indexed(IndexedExpr {
        target: Box::new(target),
        indices,
        span: Span::default(),
    })
}

fn call(callee: Expression, args: Vec<Expression>) -> Expression {
    Expression::Call(CallExpr {
        callee: Box::new(callee),
        args,
        span: Span::default(),
    })
}

fn new_expr(class: &str, args: Vec<Expression>) -> Expression {
    Expression::New(NewExpr {
        class: class.to_string(),
        args,
        span: Span::default(),
    })
}

fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStmt {
        expression,
        span: Span::default(),
    })
}

fn var_decl(name: &str, ty: TypeName, initializer: Option<Expression>) -> Statement {
    Statement::VariableDecl(VariableDecl {
        name: name.to_string(),
        ty,
        initializer,
        span: Span::default(),
    })
}

fn block(statements: Vec<Statement>) -> Block {
    Block {
        statements,
        span: Span::default(),
    }
}

fn field(name: &str, ty: TypeName, initializer: Option<Expression>) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        ty,
        initializer,
        span: Span::default(),
    }
}

fn param(name: &str, ty: TypeName) -> Param {
    Param {
        name: name.to_string(),
        ty,
        span: Span::default(),
    }
}

fn method(
    name: &str,
    params: Vec<Param>,
    return_type: Option<TypeName>,
    body: Vec<Statement>,
) -> FunctionDecl {
    FunctionDecl {
        name: name.to_string(),
        params,
        return_type,
        body: block(body),
        span: Span::default(),
    }
}

fn class_stmt(
    name: &str,
    parent: Option<&str>,
    fields: Vec<FieldDecl>,
    methods: Vec<FunctionDecl>,
) -> Statement {
    Statement::ClassDecl(ClassDecl {
        name: name.to_string(),
        parent: parent.map(|p| p.to_string()),
        fields,
        methods,
        span: Span::default(),
    })
}

fn import(module: &str) -> Statement {
    Statement::Import(ImportStmt {
        module: module.to_string(),
        span: Span::default(),
    })
}

fn main_fn(statements: Vec<Statement>) -> Statement {
    Statement::FunctionDecl(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: None,
        body: block(statements),
        span: Span::default(),
    })
}

fn program(statements: Vec<Statement>) -> Program {
    Program { statements }
}

fn all_instrs(func: &IrFunction) -> Vec<&IrInstr> {
    func.blocks.iter().flat_map(|b| b.instructions.iter()).collect()
}

fn trap_messages(func: &IrFunction) -> Vec<&str> {
    all_instrs(func)
        .into_iter()
        .filter_map(|i| match i {
            IrInstr::RuntimeCall {
                func: RuntimeFn::Error,
                args,
                ..
            } => match args.first() {
                Some(IrValue::Constant(IrConstant::Str(s))) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn main_func(module: &IrModule) -> &IrFunction {
    module.get_function_by_name("main").expect("main lowered")
}

#[test]
fn test_counter_class_scenario() {
    // class Counter { x: int = 0; Counter() {} inc() { x = x + 1 } }
    // main { say c: Counter = new Counter(); c.inc(); c.inc(); c.inc() }
    let counter = class_stmt(
        "Counter",
        None,
        vec![field("x", TypeName::Int64, Some(num(0.0)))],
        vec![
            method("Counter", vec![], None, vec![]),
            method(
                "inc",
                vec![],
                None,
                vec![expr_stmt(assign(
                    sym("x"),
                    binary(BinaryOp::Add, sym("x"), num(1.0)),
                ))],
            ),
        ],
    );
    let main = main_fn(vec![
        var_decl(
            "c",
            TypeName::Class("Counter".to_string()),
            Some(new_expr("Counter", vec![])),
        ),
        expr_stmt(call(member(sym("c"), "inc"), vec![])),
        expr_stmt(call(member(sym("c"), "inc"), vec![])),
        expr_stmt(call(member(sym("c"), "inc"), vec![])),
    ]);

    let module = compile(&program(vec![counter, main])).unwrap();
    module.validate().unwrap();

    assert!(module.get_function_by_name("Counter.Counter").is_some());
    let inc = module.get_function_by_name("Counter.inc").unwrap();
    // receiver only
    assert_eq!(inc.param_count(), 1);

    let main = main_func(&module);
    let inc_id = module.get_function_id("Counter.inc").unwrap();
    let ctor_id = module.get_function_id("Counter.Counter").unwrap();
    let calls: Vec<_> = all_instrs(main)
        .into_iter()
        .filter_map(|i| match i {
            IrInstr::Call { func, .. } => Some(*func),
            _ => None,
        })
        .collect();
    assert_eq!(calls.iter().filter(|f| **f == inc_id).count(), 3);
    assert_eq!(calls.iter().filter(|f| **f == ctor_id).count(), 1);
    // construction allocates eight bytes for the one int field
    assert!(all_instrs(main).into_iter().any(|i| matches!(
        i,
        IrInstr::RuntimeCall {
            func: RuntimeFn::Alloc,
            args,
            ..
        } if matches!(args.first(), Some(IrValue::Constant(IrConstant::Int { value: 8, .. })))
    )));
}

#[test]
fn test_two_dimensional_array_scenario() {
    // main {
    //   say a: [][]... = array.create(int, 3, 4)
    //   a[2, 3] = 42
    //   say v: int = a[2, 3]
    // }
    let main = main_fn(vec![
        var_decl(
            "a",
            TypeName::Array(Box::new(TypeName::Int64)),
            Some(call(
                member(sym("array"), "create"),
                vec![sym("int"), num(3.0), num(4.0)],
            )),
        ),
        expr_stmt(assign(
            indexed(sym("a"), vec![num(2.0), num(3.0)]),
            num(42.0),
        )),
        var_decl(
            "v",
            TypeName::Int64,
            Some(indexed(sym("a"), vec![num(0.0), num(0.0)])),
        ),
    ]);
    let module = compile(&program(vec![import("array"), main])).unwrap();
    module.validate().unwrap();

    let main = main_func(&module);
    // one allocation with rank 2
    let array_allocs: Vec<_> = all_instrs(main)
        .into_iter()
        .filter_map(|i| match i {
            IrInstr::RuntimeCall {
                func: RuntimeFn::ArrayAlloc,
                args,
                ..
            } => Some(args.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(array_allocs.len(), 1);
    assert!(matches!(
        array_allocs[0][2],
        IrValue::Constant(IrConstant::Int { value: 2, .. })
    ));

    // each of the four indices is guarded below and above
    let messages = trap_messages(main);
    assert_eq!(
        messages
            .iter()
            .filter(|m| **m == "array index < 0")
            .count(),
        4
    );
    assert_eq!(
        messages
            .iter()
            .filter(|m| **m == "array index out of bounds")
            .count(),
        4
    );
}

#[test]
fn test_if_else_merge_scenario() {
    // if (5 > 3) { x = 1 } else { x = 2 }
    let main = main_fn(vec![
        var_decl("x", TypeName::Int64, None),
        Statement::If(IfStmt {
            condition: binary(BinaryOp::Gt, num(5.0), num(3.0)),
            then_branch: block(vec![expr_stmt(assign(sym("x"), num(1.0)))]),
            else_branch: Some(block(vec![expr_stmt(assign(sym("x"), num(2.0)))])),
            span: Span::default(),
        }),
    ]);
    let module = compile(&program(vec![main])).unwrap();
    module.validate().unwrap();

    let main = main_func(&module);
    let labels: Vec<_> = main.blocks.iter().filter_map(|b| b.label.as_deref()).collect();
    assert!(labels.contains(&"if.then"));
    assert!(labels.contains(&"if.else"));
    assert!(labels.contains(&"if.end"));

    // both arms jump to the merge block
    let end = main
        .blocks
        .iter()
        .find(|b| b.label.as_deref() == Some("if.end"))
        .unwrap();
    let jumps_to_end = main
        .blocks
        .iter()
        .filter(|b| b.terminator == Some(Terminator::Jump(end.id)))
        .count();
    assert_eq!(jumps_to_end, 2);
}

#[test]
fn test_foreach_sum_scenario() {
    // say sum: int = 0; for i in 0..5 { sum = sum + i }
    let main = main_fn(vec![
        var_decl("sum", TypeName::Int64, Some(num(0.0))),
        Statement::Foreach(ForeachStmt {
            binding: "i".to_string(),
            iterable: Expression::Range(RangeExpr {
                lower: Box::new(num(0.0)),
                upper: Box::new(num(5.0)),
                span: Span::default(),
            }),
            body: block(vec![expr_stmt(assign(
                sym("sum"),
                binary(BinaryOp::Add, sym("sum"), sym("i")),
            ))]),
            span: Span::default(),
        }),
    ]);
    let module = compile(&program(vec![main])).unwrap();
    module.validate().unwrap();

    let main = main_func(&module);
    let labels: Vec<_> = main.blocks.iter().filter_map(|b| b.label.as_deref()).collect();
    for expected in ["for.cond", "for.body", "for.inc", "for.exit"] {
        assert!(labels.contains(&expected), "missing {}", expected);
    }
    let cond = main
        .blocks
        .iter()
        .find(|b| b.label.as_deref() == Some("for.cond"))
        .unwrap();
    assert!(cond.instructions.iter().any(|i| matches!(
        i,
        IrInstr::IntCmp {
            pred: IntPredicate::Slt,
            ..
        }
    )));
}

#[test]
fn test_entry_initializes_runtime_and_returns_zero() {
    let module = compile(&program(vec![main_fn(vec![])])).unwrap();
    let main = main_func(&module);
    let entry = main.entry().unwrap();
    assert!(matches!(
        entry.instructions.first(),
        Some(IrInstr::RuntimeCall {
            func: RuntimeFn::Init,
            ..
        })
    ));
    assert!(matches!(entry.terminator, Some(Terminator::Return(Some(_)))));
}

#[test]
fn test_narrowing_declaration_compiles_guards_in() {
    // say x: int8 = 300 traps at runtime, not at compile time
    let module = compile(&program(vec![main_fn(vec![var_decl(
        "x",
        TypeName::Int8,
        Some(num(300.0)),
    )])]))
    .unwrap();
    module.validate().unwrap();
    let messages = trap_messages(main_func(&module));
    assert_eq!(messages, vec!["runtime overflow in float to int cast"]);
}

#[test]
fn test_inherited_method_call_casts_receiver() {
    // class Base { describe() {} }
    // class Child : Base {}
    // main { say c: Child = new Child(); c.describe() }
    let base = class_stmt(
        "Base",
        None,
        vec![],
        vec![method("describe", vec![], None, vec![])],
    );
    let child = class_stmt("Child", Some("Base"), vec![], vec![]);
    let main = main_fn(vec![
        var_decl(
            "c",
            TypeName::Class("Child".to_string()),
            Some(new_expr("Child", vec![])),
        ),
        expr_stmt(call(member(sym("c"), "describe"), vec![])),
    ]);
    let module = compile(&program(vec![base, child, main])).unwrap();
    module.validate().unwrap();

    // only the parent's function exists
    assert!(module.get_function_by_name("Base.describe").is_some());
    assert!(module.get_function_by_name("Child.describe").is_none());

    // the child receiver is reinterpreted as the declaring class's
    // struct pointer at the call site
    let main = main_func(&module);
    let describe_id = module.get_function_id("Base.describe").unwrap();
    assert!(all_instrs(main)
        .into_iter()
        .any(|i| matches!(i, IrInstr::Call { func, .. } if *func == describe_id)));
    let ptr_casts = all_instrs(main)
        .into_iter()
        .filter(|i| matches!(
            i,
            IrInstr::Cast {
                kind: CastKind::PtrCast,
                ..
            }
        ))
        .count();
    // one from construction, one from the receiver adjustment
    assert_eq!(ptr_casts, 2);
}

#[test]
fn test_constructor_arguments_are_counted() {
    // class Point { x: float; Point(x0: float) { ... } }
    let point = class_stmt(
        "Point",
        None,
        vec![field("x", TypeName::Float64, None)],
        vec![method(
            "Point",
            vec![param("x0", TypeName::Float64)],
            None,
            vec![expr_stmt(assign(sym("x"), sym("x0")))],
        )],
    );
    let bad_main = main_fn(vec![expr_stmt(new_expr("Point", vec![]))]);
    let err = compile(&program(vec![point.clone(), bad_main])).unwrap_err();
    match err {
        CompileError::ArityMismatch {
            expected, found, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(found, 0);
        }
        other => panic!("expected arity error, got {:?}", other),
    }

    let good_main = main_fn(vec![expr_stmt(new_expr("Point", vec![num(1.5)]))]);
    let module = compile(&program(vec![point, good_main])).unwrap();
    module.validate().unwrap();
}

#[test]
fn test_field_initializers_see_earlier_fields() {
    // class Pair { a: int = 2; b: int = a * 3 }
    let pair = class_stmt(
        "Pair",
        None,
        vec![
            field("a", TypeName::Int64, Some(num(2.0))),
            field("b", TypeName::Int64, Some(binary(BinaryOp::Mul, sym("a"), num(3.0)))),
        ],
        vec![],
    );
    let main = main_fn(vec![expr_stmt(new_expr("Pair", vec![]))]);
    let module = compile(&program(vec![pair, main])).unwrap();
    module.validate().unwrap();
}

#[test]
fn test_self_referential_class() {
    // class Node { next: Node }
    let node = class_stmt(
        "Node",
        None,
        vec![field("next", TypeName::Class("Node".to_string()), None)],
        vec![],
    );
    let main = main_fn(vec![var_decl(
        "n",
        TypeName::Class("Node".to_string()),
        Some(new_expr("Node", vec![])),
    )]);
    let module = compile(&program(vec![node, main])).unwrap();
    module.validate().unwrap();

    // the struct holds one pointer field to itself
    let node_struct = module.get_struct_id("Node").unwrap();
    let shape = module.get_struct(node_struct).unwrap();
    assert_eq!(shape.fields.len(), 1);
}

#[test]
fn test_print_call_lowered_to_runtime() {
    let main = main_fn(vec![expr_stmt(call(
        member(sym("io"), "print"),
        vec![string("x = %d\n"), num(42.0)],
    ))]);
    let module = compile(&program(vec![import("io"), main])).unwrap();
    module.validate().unwrap();
    assert!(all_instrs(main_func(&module)).into_iter().any(|i| matches!(
        i,
        IrInstr::RuntimeCall {
            func: RuntimeFn::Print,
            ..
        }
    )));
}

#[test]
fn test_print_without_import_is_undefined() {
    let main = main_fn(vec![expr_stmt(call(
        member(sym("io"), "print"),
        vec![string("hi")],
    ))]);
    let err = compile(&program(vec![main])).unwrap_err();
    // io never imported: the bare symbol does not resolve
    assert!(matches!(err, CompileError::UndefinedVariable { .. }));
}

#[test]
fn test_unknown_field_and_method() {
    let empty = class_stmt("Empty", None, vec![], vec![]);
    let bad_field = main_fn(vec![
        var_decl(
            "e",
            TypeName::Class("Empty".to_string()),
            Some(new_expr("Empty", vec![])),
        ),
        expr_stmt(member(sym("e"), "ghost")),
    ]);
    let err = compile(&program(vec![empty.clone(), bad_field])).unwrap_err();
    assert!(matches!(err, CompileError::UndefinedField { .. }));

    let bad_method = main_fn(vec![
        var_decl(
            "e",
            TypeName::Class("Empty".to_string()),
            Some(new_expr("Empty", vec![])),
        ),
        expr_stmt(call(member(sym("e"), "ghost"), vec![])),
    ]);
    let err = compile(&program(vec![empty, bad_method])).unwrap_err();
    assert!(matches!(err, CompileError::UndefinedMethod { .. }));
}

#[test]
fn test_duplicate_field_aborts() {
    let broken = class_stmt(
        "Broken",
        None,
        vec![
            field("x", TypeName::Int64, None),
            field("x", TypeName::Float64, None),
        ],
        vec![],
    );
    let err = compile(&program(vec![broken, main_fn(vec![])])).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateField { .. }));
}

#[test]
fn test_shadowing_across_blocks() {
    // say x: int = 1; if 1 { say x: float = 2.0 }
    let main = main_fn(vec![
        var_decl("x", TypeName::Int64, Some(num(1.0))),
        Statement::If(IfStmt {
            condition: num(1.0),
            then_branch: block(vec![var_decl("x", TypeName::Float64, Some(num(2.0)))]),
            else_branch: None,
            span: Span::default(),
        }),
    ]);
    let module = compile(&program(vec![main])).unwrap();
    module.validate().unwrap();

    // but a duplicate in the same block aborts
    let dup = main_fn(vec![
        var_decl("x", TypeName::Int64, None),
        var_decl("x", TypeName::Int64, None),
    ]);
    let err = compile(&program(vec![dup])).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateVariable { .. }));
}

#[test]
fn test_method_returning_value_through_cast() {
    // class Box { v: int32; get(): int { return v } }
    let boxed = class_stmt(
        "Box",
        None,
        vec![field("v", TypeName::Int32, None)],
        vec![method(
            "get",
            vec![],
            Some(TypeName::Int64),
            vec![Statement::Return(ReturnStmt {
                value: Some(sym("v")),
                span: Span::default(),
            })],
        )],
    );
    let main = main_fn(vec![
        var_decl(
            "b",
            TypeName::Class("Box".to_string()),
            Some(new_expr("Box", vec![])),
        ),
        var_decl("v", TypeName::Int64, Some(call(member(sym("b"), "get"), vec![]))),
    ]);
    let module = compile(&program(vec![boxed, main])).unwrap();
    module.validate().unwrap();

    // int32 widens to int64 with a plain sign extension, no guard
    let get = module.get_function_by_name("Box.get").unwrap();
    assert!(all_instrs(get).into_iter().any(|i| matches!(
        i,
        IrInstr::Cast {
            kind: CastKind::Sext,
            ..
        }
    )));
    assert!(trap_messages(get).is_empty());
}

#[test]
fn test_while_with_break() {
    let main = main_fn(vec![Statement::While(brio_engine::ast::WhileStmt {
        condition: num(1.0),
        body: block(vec![Statement::Break(brio_engine::ast::BreakStmt {
            span: Span::default(),
        })]),
        span: Span::default(),
    })]);
    let module = compile(&program(vec![main])).unwrap();
    module.validate().unwrap();

    let main = main_func(&module);
    let exit = main
        .blocks
        .iter()
        .find(|b| b.label.as_deref() == Some("while.exit"))
        .unwrap();
    let body = main
        .blocks
        .iter()
        .find(|b| b.label.as_deref() == Some("while.body"))
        .unwrap();
    assert_eq!(body.terminator, Some(Terminator::Jump(exit.id)));
}

#[test]
fn test_module_serializes_to_json() {
    let main = main_fn(vec![var_decl("x", TypeName::Int64, Some(num(7.0)))]);
    let module = compile(&program(vec![main])).unwrap();

    let json = module.to_json().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.ir.json");
    std::fs::write(&path, &json).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed["name"], "main");
    let functions = parsed["functions"].as_array().unwrap();
    assert!(functions.iter().any(|f| f["name"] == "main"));
    let structs = parsed["structs"].as_array().unwrap();
    assert!(structs.iter().any(|s| s["name"] == "array"));
}

#[test]
fn test_string_values_are_pointers() {
    let main = main_fn(vec![
        var_decl("s", TypeName::Str, Some(string("hello"))),
        var_decl("t", TypeName::Str, Some(sym("s"))),
        var_decl(
            "same",
            TypeName::Boolean,
            Some(binary(BinaryOp::Eq, sym("s"), sym("t"))),
        ),
    ]);
    let module = compile(&program(vec![main])).unwrap();
    module.validate().unwrap();
    // string equality is pointer identity
    assert!(all_instrs(main_func(&module)).into_iter().any(|i| matches!(
        i,
        IrInstr::IntCmp {
            pred: IntPredicate::Eq,
            ..
        }
    )));
}

//! Code-generator behavior: emitted shapes, label closure, method offsets.

use arx_asm::{Instruction, Opcode, Operation};
use arx_compiler::ast::*;
use arx_compiler::{build, compile, plus_is_concat};
use arx_mod::{class_id, ModuleFlags};

use proptest::prelude::*;
use rstest::rstest;

fn hello() -> Module {
    Module::executable(
        "hello",
        vec![Stmt::writeln(Expr::str("Hello, World"))],
    )
}

#[test]
fn hello_emits_literal_print_and_newline() {
    let compiled = build(&hello()).unwrap();

    assert_eq!(compiled.strings.get(0), Some("Hello, World"));

    let expected = [
        Instruction::lit(0),
        Instruction::opr(Operation::OutString),
        Instruction::opr(Operation::Writeln),
    ];
    let found = compiled
        .instructions
        .windows(expected.len())
        .any(|w| w == expected);
    assert!(found, "missing writeln lowering in {:?}", compiled.instructions);
}

#[test]
fn implicit_return_closes_every_method() {
    let compiled = build(&hello()).unwrap();
    assert_eq!(
        compiled.instructions.last(),
        Some(&Instruction::opr(Operation::Ret))
    );
}

#[test]
fn string_literals_are_interned_once() {
    let module = Module::executable(
        "intern",
        vec![
            Stmt::writeln(Expr::str("same")),
            Stmt::writeln(Expr::str("same")),
            Stmt::writeln(Expr::str("other")),
        ],
    );
    let compiled = build(&module).unwrap();
    assert_eq!(compiled.strings.len(), 2);
}

#[rstest]
#[case(Expr::str("a"), Expr::int(1), true)] // string literal on the left
#[case(Expr::int(1), Expr::str("a"), true)] // string literal on the right
#[case(
    Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2)),
    Expr::int(3),
    true
)] // nested + on the left
#[case(Expr::int(1), Expr::ident("i"), true)] // identifier on the right
#[case(Expr::int(1), Expr::int(2), false)]
#[case(Expr::ident("i"), Expr::int(2), false)]
fn plus_heuristic_matches_reference(
    #[case] lhs: Expr,
    #[case] rhs: Expr,
    #[case] concat: bool,
) {
    assert_eq!(plus_is_concat(&lhs, &rhs), concat);
}

#[test]
fn identifier_rhs_is_coerced_before_concat() {
    let module = Module::executable(
        "coerce",
        vec![
            Stmt::var("i", Expr::int(5)),
            Stmt::writeln(Expr::binary(
                BinaryOp::Add,
                Expr::str("Result: "),
                Expr::ident("i"),
            )),
        ],
    );
    let compiled = build(&module).unwrap();

    let expected = [
        Instruction::opr(Operation::IntToStr),
        Instruction::opr(Operation::StrConcat),
    ];
    assert!(compiled
        .instructions
        .windows(expected.len())
        .any(|w| w == expected));
}

#[test]
fn for_loop_emits_spec_shape() {
    let module = Module::executable(
        "loop",
        vec![Stmt::For {
            var: "i".to_string(),
            from: Expr::int(1),
            to: Expr::int(3),
            body: vec![Stmt::writeln(Expr::ident("i"))],
        }],
    );
    let compiled = build(&module).unwrap();
    let ins = &compiled.instructions;

    // Initialization stores the start value into the loop slot.
    assert_eq!(ins[0], Instruction::lit(1));
    assert_eq!(ins[1], Instruction::sto(0, 0));
    // The condition reloads the variable and compares with LEQ.
    assert_eq!(ins[2], Instruction::lod(0, 0));
    assert_eq!(ins[3], Instruction::lit(3));
    assert_eq!(ins[4], Instruction::opr(Operation::Leq));
    assert_eq!(ins[5].opcode(), Ok(Opcode::Jpc));
    // The increment is LOD; LIT 1; ADD; STO; JMP back to the condition.
    let back = ins
        .iter()
        .position(|i| i.opcode() == Ok(Opcode::Jmp))
        .unwrap();
    assert_eq!(ins[back].operand(), 2);
    assert_eq!(ins[back - 1], Instruction::sto(0, 0));
    assert_eq!(ins[back - 2], Instruction::opr(Operation::Add));
}

fn person_module() -> Module {
    Module {
        name: "people".to_string(),
        classes: vec![
            Class {
                name: "Person".to_string(),
                parent: None,
                fields: vec![
                    Field {
                        name: "name".to_string(),
                        type_name: "string".to_string(),
                    },
                    Field {
                        name: "age".to_string(),
                        type_name: "integer".to_string(),
                    },
                ],
                methods: vec![
                    Method {
                        name: "Person".to_string(),
                        kind: MethodKind::Procedure,
                        params: vec![
                            Param {
                                name: "n".to_string(),
                                type_name: "string".to_string(),
                            },
                            Param {
                                name: "a".to_string(),
                                type_name: "integer".to_string(),
                            },
                        ],
                        return_type: None,
                        body: vec![
                            Stmt::assign("name", Expr::ident("n")),
                            Stmt::assign("age", Expr::ident("a")),
                        ],
                    },
                    Method {
                        name: "getName".to_string(),
                        kind: MethodKind::Function,
                        params: Vec::new(),
                        return_type: Some("string".to_string()),
                        body: vec![Stmt::Return(Some(Expr::ident("name")))],
                    },
                ],
            },
            Class {
                name: "App".to_string(),
                parent: None,
                fields: Vec::new(),
                methods: vec![Method {
                    name: "Main".to_string(),
                    kind: MethodKind::Procedure,
                    params: Vec::new(),
                    return_type: None,
                    body: vec![
                        Stmt::var(
                            "p",
                            Expr::new_object(
                                "Person",
                                vec![Expr::str("A"), Expr::int(30)],
                            ),
                        ),
                        Stmt::writeln(Expr::method_call(
                            Expr::ident("p"),
                            "getName",
                            Vec::new(),
                        )),
                    ],
                }],
            },
        ],
    }
}

#[test]
fn method_offsets_point_at_first_body_instruction() {
    let compiled = build(&person_module()).unwrap();

    // getName's body is: OBJ_SELF; LIT <"name">; OBJ_GET_FIELD; RET.
    let get_name = compiled.manifest.method("Person", "getName").unwrap();
    let at = get_name.offset as usize;
    assert_eq!(
        compiled.instructions[at],
        Instruction::opr(Operation::ObjSelf)
    );

    // Main lives in the second class, so its offset must be shifted past
    // Person's code.
    let main = compiled.manifest.method("App", "Main").unwrap();
    let person_ctor = compiled.manifest.method("Person", "Person").unwrap();
    assert!(main.offset > person_ctor.offset);
    assert_eq!(
        compiled.instructions[main.offset as usize],
        Instruction::lit(class_id("people", "Person"))
    );
}

#[test]
fn manifest_records_fields_and_signatures() {
    let compiled = build(&person_module()).unwrap();
    let person = compiled.manifest.find_class("Person").unwrap();

    assert_eq!(person.fields.len(), 2);
    assert_eq!(person.fields[0].offset, 0);
    assert_eq!(person.fields[1].offset, 8);
    assert_eq!(person.entry.instance_size, 16);

    let ctor = compiled.manifest.method("Person", "Person").unwrap();
    assert_eq!(ctor.param_count, 2);
    assert_eq!(ctor.param_types, "string,integer");

    let get_name = compiled.manifest.method("Person", "getName").unwrap();
    assert_eq!(get_name.param_count, 0);
    assert_eq!(get_name.return_type, "string");
    assert!(get_name.is_function());
}

#[test]
fn entry_point_is_main_offset() {
    let compiled = build(&person_module()).unwrap();
    assert!(compiled.flags.contains(ModuleFlags::EXECUTABLE));
    assert_eq!(
        compiled.entry_point,
        compiled.manifest.method("App", "Main").unwrap().offset
    );
}

#[test]
fn module_without_main_is_a_library() {
    let module = Module {
        name: "libdemo".to_string(),
        classes: vec![Class {
            name: "Util".to_string(),
            parent: None,
            fields: Vec::new(),
            methods: vec![Method {
                name: "helper".to_string(),
                kind: MethodKind::Procedure,
                params: Vec::new(),
                return_type: None,
                body: vec![Stmt::writeln(Expr::str("hi"))],
            }],
        }],
    };
    let compiled = build(&module).unwrap();
    assert!(compiled.flags.contains(ModuleFlags::LIBRARY));
    assert_eq!(compiled.entry_point, 0);
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (-100i64..100).prop_map(Expr::int),
        "[a-z]{1,4}".prop_map(|s| Expr::ident(&s)),
        "[a-z ]{0,8}".prop_map(|s| Expr::str(&s)),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Expr::binary(BinaryOp::Add, a, b)),
            (inner.clone(), inner)
                .prop_map(|(a, b)| Expr::binary(BinaryOp::Less, a, b)),
        ]
    })
}

fn arb_stmt() -> impl Strategy<Value = Stmt> {
    let leaf = prop_oneof![
        ("[a-z]{1,4}", arb_expr()).prop_map(|(n, e)| Stmt::var(&n, e)),
        arb_expr().prop_map(Stmt::writeln),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        let body = proptest::collection::vec(inner.clone(), 0..3);
        prop_oneof![
            (arb_expr(), body.clone(), body.clone()).prop_map(|(c, t, e)| Stmt::If {
                arms: vec![IfArm { cond: c, body: t }],
                else_body: e,
            }),
            (arb_expr(), body.clone())
                .prop_map(|(c, b)| Stmt::While { cond: c, body: b }),
            ("[a-z]{1,3}", arb_expr(), arb_expr(), body).prop_map(
                |(v, f, t, b)| Stmt::For {
                    var: v,
                    from: f,
                    to: t,
                    body: b,
                }
            ),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Label closure: after resolution every jump operand is a valid
    /// instruction index.
    #[test]
    fn jumps_land_inside_the_stream(stmts in proptest::collection::vec(arb_stmt(), 0..6)) {
        let compiled = compile(&Module::executable("prop", stmts));

        let no_unbound_labels = compiled
            .warnings
            .iter()
            .all(|w| !matches!(w, arx_compiler::CodegenWarning::UnboundLabel { .. }));
        prop_assert!(no_unbound_labels);

        for ins in &compiled.instructions {
            if matches!(ins.opcode(), Ok(Opcode::Jmp | Opcode::Jpc)) {
                prop_assert!((ins.operand() as usize) < compiled.instructions.len(),
                    "jump target {} out of range {}", ins.operand(), compiled.instructions.len());
            }
        }
    }
}

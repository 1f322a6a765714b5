//! VM behavior driven by hand-built instruction streams.

use arx_asm::{Instruction, Operation, Word};
use arx_mod::{ClassManifest, ModuleFlags, ModuleHeader, StringTable};
use arx_vm::registry::ClassRegistry;
use arx_vm::{ExecuteState, Interpreter, ModuleImage, VmFault, VmParams, VmState};

use proptest::prelude::*;
use rstest::rstest;

type TestVm = Interpreter<&'static [u8], Vec<u8>>;

fn header(flags: ModuleFlags, entry_point: u64) -> ModuleHeader {
    ModuleHeader {
        flags,
        toc_offset: 80,
        toc_size: 192,
        data_offset: 272,
        data_size: 0,
        app_name_len: 0,
        app_data_size: 0,
        entry_point,
    }
}

fn vm_with(
    instructions: Vec<Instruction>,
    strings: StringTable,
    manifest: &ClassManifest,
) -> TestVm {
    let image = ModuleImage {
        header: header(ModuleFlags::EXECUTABLE, 0),
        instructions,
        strings,
        registry: ClassRegistry::from_manifest(manifest),
        app: None,
    };
    Interpreter::new(image, VmParams::default(), &b""[..], Vec::new()).unwrap()
}

fn vm(instructions: Vec<Instruction>) -> TestVm {
    vm_with(instructions, StringTable::new(), &ClassManifest::default())
}

fn run_to_stack(instructions: Vec<Instruction>) -> Vec<Word> {
    let mut vm = vm(instructions);
    vm.run().unwrap();
    vm.stack().to_vec()
}

#[rstest]
#[case(Operation::Add, 7, 5, 12)]
#[case(Operation::Sub, 7, 5, 2)]
#[case(Operation::Mul, 7, 5, 35)]
#[case(Operation::Div, 7, 2, 3)]
#[case(Operation::Mod, 7, 5, 2)]
#[case(Operation::Pow, 2, 10, 1024)]
#[case(Operation::Eq, 7, 7, 1)]
#[case(Operation::Neq, 7, 7, 0)]
#[case(Operation::Less, 3, 7, 1)]
#[case(Operation::Leq, 7, 7, 1)]
#[case(Operation::Greater, 7, 3, 1)]
#[case(Operation::Geq, 3, 7, 0)]
#[case(Operation::And, 2, 0, 0)]
#[case(Operation::Or, 0, 2, 1)]
#[case(Operation::Shl, 1, 4, 16)]
#[case(Operation::Shr, 16, 4, 1)]
fn binary_operations(
    #[case] op: Operation,
    #[case] a: Word,
    #[case] b: Word,
    #[case] expected: Word,
) {
    let stack = run_to_stack(vec![
        Instruction::lit(a),
        Instruction::lit(b),
        Instruction::opr(op),
        Instruction::halt(),
    ]);
    assert_eq!(stack, vec![expected]);
}

#[rstest]
#[case(Operation::Neg, 5, (-5i64) as Word)]
#[case(Operation::Not, 0, 1)]
#[case(Operation::Not, 9, 0)]
#[case(Operation::Odd, 9, 1)]
#[case(Operation::Odd, 8, 0)]
fn unary_operations(#[case] op: Operation, #[case] a: Word, #[case] expected: Word) {
    let stack = run_to_stack(vec![
        Instruction::lit(a),
        Instruction::opr(op),
        Instruction::halt(),
    ]);
    assert_eq!(stack, vec![expected]);
}

#[test]
fn signed_comparison_handles_negatives() {
    let stack = run_to_stack(vec![
        Instruction::lit((-3i64) as Word),
        Instruction::lit(2),
        Instruction::opr(Operation::Less),
        Instruction::halt(),
    ]);
    assert_eq!(stack, vec![1]);
}

proptest! {
    /// Stack discipline: every two-operand ALU op consumes exactly two
    /// slots and leaves exactly one.
    #[test]
    fn binary_ops_consume_two_push_one(a in any::<Word>(), b in 1u64.., padding in 0u64..8) {
        for op in [
            Operation::Add,
            Operation::Sub,
            Operation::Mul,
            Operation::Div,
            Operation::Mod,
            Operation::Eq,
            Operation::Less,
            Operation::Greater,
            Operation::And,
            Operation::Or,
        ] {
            let mut program: Vec<Instruction> =
                (0..padding).map(Instruction::lit).collect();
            program.extend([
                Instruction::lit(a),
                Instruction::lit(b),
                Instruction::opr(op),
                Instruction::halt(),
            ]);

            let stack = run_to_stack(program);
            prop_assert_eq!(stack.len(), padding as usize + 1);
        }
    }
}

#[test]
fn division_by_zero_faults() {
    let mut vm = vm(vec![
        Instruction::lit(7),
        Instruction::lit(0),
        Instruction::opr(Operation::Div),
    ]);
    assert_eq!(vm.run(), Err(VmFault::DivisionByZero));
    assert_eq!(vm.state(), VmState::Faulted);
}

#[test]
fn pop_on_empty_stack_faults() {
    let mut vm = vm(vec![Instruction::opr(Operation::Add)]);
    assert_eq!(vm.run(), Err(VmFault::StackUnderflow));
}

#[test]
fn stack_overflow_faults() {
    let mut vm = vm(vec![
        Instruction::int(2_000),
        Instruction::halt(),
    ]);
    assert_eq!(vm.run(), Err(VmFault::StackOverflow));
}

#[test]
fn unknown_opcode_faults() {
    let mut vm = vm(vec![Instruction::from_parts(0x0f, 0)]);
    assert_eq!(vm.run(), Err(VmFault::InvalidInstruction(0x0f)));
}

#[test]
fn unknown_operation_faults() {
    let mut vm = vm(vec![Instruction::new(arx_asm::Opcode::Opr, 0, 0xff)]);
    assert_eq!(vm.run(), Err(VmFault::InvalidOperation(0xff)));
}

#[test]
fn jump_out_of_range_faults() {
    let mut vm = vm(vec![Instruction::jmp(99)]);
    assert_eq!(vm.run(), Err(VmFault::InvalidAddress(99)));
}

#[test]
fn stuck_program_counter_guard_trips() {
    let mut vm = vm(vec![Instruction::jmp(0)]);
    assert_eq!(vm.run(), Err(VmFault::StuckProgramCounter(0)));
}

#[test]
fn step_limit_guard_trips() {
    // Two jumps chasing each other: the pc keeps moving, the program never
    // ends, and the stack never grows.
    let mut vm = vm(vec![Instruction::jmp(1), Instruction::jmp(0)]);
    assert_eq!(
        vm.run(),
        Err(VmFault::StepLimit(VmParams::default().step_limit))
    );
}

#[test]
fn int_grows_the_stack_with_zeroes() {
    let stack = run_to_stack(vec![
        Instruction::lit(9),
        Instruction::int(3),
        Instruction::halt(),
    ]);
    assert_eq!(stack, vec![9, 0, 0, 0]);
}

#[test]
fn load_and_store_round_trip_through_memory() {
    let stack = run_to_stack(vec![
        Instruction::lit(42),
        Instruction::sto(0, 5),
        Instruction::lod(0, 5),
        Instruction::halt(),
    ]);
    assert_eq!(stack, vec![42]);
}

#[test]
fn indexed_load_and_store() {
    let stack = run_to_stack(vec![
        // memory[base + 4 + 2] := 7
        Instruction::lit(2),
        Instruction::lit(7),
        Instruction::stox(0, 4),
        // push memory[base + 4 + 2]
        Instruction::lit(2),
        Instruction::lodx(0, 4),
        Instruction::halt(),
    ]);
    assert_eq!(stack, vec![7]);
}

#[test]
fn call_and_return_restore_the_stack() {
    // 0: CAL 3; 1: LIT 11; 2: HALT; 3: LIT 5; 4: OPR RET
    let mut vm = vm(vec![
        Instruction::cal(0, 3),
        Instruction::lit(11),
        Instruction::halt(),
        Instruction::lit(5),
        Instruction::opr(Operation::Ret),
    ]);
    vm.run().unwrap();
    // The procedure's 5 is dropped by the stack restore; only 11 remains.
    assert_eq!(vm.stack(), &[11]);
    assert!(vm.frames().is_empty());
}

#[test]
fn call_stack_overflow_faults() {
    // 0: CAL 0 — every call re-enters itself.
    let mut vm = vm(vec![Instruction::cal(0, 0)]);
    assert_eq!(vm.run(), Err(VmFault::CallStackOverflow));
}

#[test]
fn ret_with_no_frames_is_a_clean_halt() {
    let mut vm = vm(vec![
        Instruction::lit(1),
        Instruction::opr(Operation::Ret),
    ]);
    assert_eq!(vm.run(), Ok(VmState::Halted));
}

#[test]
fn falling_off_the_stream_halts_cleanly() {
    let mut vm = vm(vec![Instruction::lit(1)]);
    assert_eq!(vm.run(), Ok(VmState::Halted));
    assert_eq!(vm.state(), VmState::Halted);
}

#[test]
fn terminal_states_are_sticky() {
    let mut vm = vm(vec![Instruction::halt()]);
    vm.run().unwrap();
    assert_eq!(vm.step(), Ok(ExecuteState::Halt));
    assert_eq!(vm.state(), VmState::Halted);
}

#[test]
fn ready_to_running_to_halted() {
    let mut vm = vm(vec![Instruction::lit(1), Instruction::halt()]);
    assert_eq!(vm.state(), VmState::Ready);
    vm.step().unwrap();
    assert_eq!(vm.state(), VmState::Running);
    vm.step().unwrap();
    assert_eq!(vm.state(), VmState::Halted);
}

#[test]
fn oversized_literal_pool_is_rejected_at_construction() {
    let mut strings = StringTable::new();
    for i in 0..5_000 {
        strings.intern(&format!("s{i}"));
    }
    let image = ModuleImage {
        header: header(ModuleFlags::EXECUTABLE, 0),
        instructions: vec![Instruction::halt()],
        strings,
        registry: ClassRegistry::from_manifest(&ClassManifest::default()),
        app: None,
    };
    let result = Interpreter::new(image, VmParams::default(), &b""[..], Vec::new());
    assert!(matches!(result, Err(VmFault::StringTableFull)));
}

#[test]
fn out_int_and_out_char_render() {
    let mut vm = vm(vec![
        Instruction::lit((-42i64) as Word),
        Instruction::opr(Operation::OutInt),
        Instruction::lit(Word::from(b'!')),
        Instruction::opr(Operation::OutChar),
        Instruction::opr(Operation::Writeln),
        Instruction::halt(),
    ]);
    vm.run().unwrap();
    assert_eq!(vm.output(), &b"-42!\n".to_vec());
}

#[test]
fn in_int_reads_a_line() {
    let image = ModuleImage {
        header: header(ModuleFlags::EXECUTABLE, 0),
        instructions: vec![
            Instruction::opr(Operation::InInt),
            Instruction::opr(Operation::OutInt),
            Instruction::halt(),
        ],
        strings: StringTable::new(),
        registry: ClassRegistry::from_manifest(&ClassManifest::default()),
        app: None,
    };
    let mut vm =
        Interpreter::new(image, VmParams::default(), &b"123\n"[..], Vec::new()).unwrap();
    vm.run().unwrap();
    assert_eq!(vm.output(), &b"123".to_vec());
}

#[test]
fn string_concat_builds_a_string_object() {
    let mut strings = StringTable::new();
    strings.intern("foo");
    strings.intern("bar");

    let mut vm = vm_with(
        vec![
            Instruction::lit(0),
            Instruction::lit(1),
            Instruction::opr(Operation::StrConcat),
            Instruction::opr(Operation::OutString),
            Instruction::halt(),
        ],
        strings,
        &ClassManifest::default(),
    );
    vm.run().unwrap();
    assert_eq!(vm.output(), &b"foobar".to_vec());

    // The concatenation lives in the object region as a tagged string.
    let entry = &vm.objects().entries()[0];
    assert!(entry.address >= arx_vm::consts::OBJECT_REGION_BASE as Word);
    assert_eq!(entry.size, 6 + 3);
}

#[rstest]
#[case(Operation::StrLen, &["abcd"], &[0], 4)]
#[case(Operation::StrEq, &["x", "x"], &[0, 1], 1)]
#[case(Operation::StrEq, &["x", "y"], &[0, 1], 0)]
#[case(Operation::StrCmp, &["a", "b"], &[0, 1], (-1i64) as Word)]
#[case(Operation::StrToInt, &["77"], &[0], 77)]
fn string_queries(
    #[case] op: Operation,
    #[case] pool: &[&str],
    #[case] pushes: &[Word],
    #[case] expected: Word,
) {
    let mut strings = StringTable::new();
    for s in pool {
        strings.intern(s);
    }

    let mut program: Vec<Instruction> =
        pushes.iter().map(|&v| Instruction::lit(v)).collect();
    program.push(Instruction::opr(op));
    program.push(Instruction::halt());

    let mut vm = vm_with(program, strings, &ClassManifest::default());
    vm.run().unwrap();
    assert_eq!(vm.stack(), &[expected]);
}

#[test]
fn int_to_str_renders_decimal() {
    let mut vm = vm(vec![
        Instruction::lit((-7i64) as Word),
        Instruction::opr(Operation::IntToStr),
        Instruction::opr(Operation::OutString),
        Instruction::halt(),
    ]);
    vm.run().unwrap();
    assert_eq!(vm.output(), &b"-7".to_vec());
}

#[test]
fn library_module_loads_without_executing() {
    let image = ModuleImage {
        header: header(ModuleFlags::LIBRARY, 0),
        instructions: vec![
            Instruction::lit(1),
            Instruction::opr(Operation::OutInt),
            Instruction::halt(),
        ],
        strings: StringTable::new(),
        registry: ClassRegistry::from_manifest(&ClassManifest::default()),
        app: None,
    };
    let mut vm =
        Interpreter::new(image, VmParams::default(), &b""[..], Vec::new()).unwrap();
    assert_eq!(vm.run(), Ok(VmState::Halted));
    assert_eq!(vm.steps(), 0);
    assert_eq!(vm.output(), &b"library module loaded\n".to_vec());
}

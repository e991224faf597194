use super::*;
use crate::virtual_machine::assembler::assemble_source;
use super::fuel::{StepCategory, DEFAULT_STEP_BUDGET};

/// The "Hello, world!" example image for the Tomtel Core i69. The last five
/// bytes are data the program reads, not instructions.
const HELLO_IMAGE: [u8; 82] = [
    0x50, 0x48, 0xC2, 0x02, 0xA8, 0x4D, 0x00, 0x00, 0x00, 0x4F, 0x02, 0x50, 0x09, 0xC4, 0x02,
    0x02, 0xE1, 0x01, 0x4F, 0x02, 0xC1, 0x22, 0x1D, 0x00, 0x00, 0x00, 0x48, 0x30, 0x02, 0x58,
    0x03, 0x4F, 0x02, 0xB0, 0x29, 0x00, 0x00, 0x00, 0x48, 0x31, 0x02, 0x50, 0x0C, 0xC3, 0x02,
    0xAA, 0x57, 0x48, 0x02, 0xC1, 0x21, 0x3A, 0x00, 0x00, 0x00, 0x48, 0x32, 0x02, 0x48, 0x77,
    0x02, 0x48, 0x6F, 0x02, 0x48, 0x72, 0x02, 0x48, 0x6C, 0x02, 0x48, 0x64, 0x02, 0x48, 0x21,
    0x02, 0x01, 0x65, 0x6F, 0x33, 0x34, 0x2C,
];

fn run_image(image: &[u8]) -> Outcome {
    Vm::new(image.to_vec()).run().expect("vm run failed")
}

fn run_asm(source: &str) -> Outcome {
    let image = assemble_source(source).expect("assembly failed");
    Vm::new(image).run().expect("vm run failed")
}

fn run_expect_err(image: &[u8]) -> VmError {
    Vm::new(image.to_vec()).run().expect_err("expected error")
}

// ==================== End to end ====================

#[test]
fn hello_world() {
    let outcome = run_image(&HELLO_IMAGE);
    assert_eq!(outcome.output, b"Hello, world!");
    assert_eq!(outcome.status, ExitStatus::Halted);
}

#[test]
fn canonical_program_round_trips_through_the_assembler() {
    // Source form of HELLO_IMAGE, data segment included.
    let image = assemble_source(
        r#"
            MVI b, 0x48
            ADD
            OUT
            MVI32 ptr, data
            MV a, mem
            OUT
            MVI b, 0x09
            XOR
            OUT
            OUT
            APTR 1
            MV a, mem
            OUT
            CMP
            JNZ first_skip
            MVI a, 0x30
            OUT
            first_skip:
            MVI c, 3
            MV a, mem
            OUT
            MVI32 pc, second_skip
            MVI a, 0x31
            OUT
            second_skip:
            MVI b, 0x0C
            SUB
            OUT
            MV32 ptr, lb
            MV b, mem
            MVI a, 2
            CMP
            JEZ tail
            MVI a, 0x32
            OUT
            tail:
            MVI a, 0x77
            OUT
            MVI a, 0x6F
            OUT
            MVI a, 0x72
            OUT
            MVI a, 0x6C
            OUT
            MVI a, 0x64
            OUT
            MVI a, 0x21
            OUT
            HALT
            data:
            DATA 0x65, 0x6F, 0x33, 0x34, 0x2C
        "#,
    )
    .expect("assembly failed");
    assert_eq!(image, HELLO_IMAGE);

    let outcome = run_image(&image);
    assert_eq!(outcome.output, b"Hello, world!");
}

#[test]
fn runs_are_deterministic() {
    let first = run_image(&HELLO_IMAGE);
    let second = run_image(&HELLO_IMAGE);
    assert_eq!(first.output, second.output);
    assert_eq!(first.status, second.status);
    assert_eq!(first.steps(), second.steps());
}

#[test]
fn empty_image_stops_immediately() {
    let outcome = run_image(&[]);
    assert_eq!(outcome.status, ExitStatus::Stopped);
    assert!(outcome.output.is_empty());
    assert_eq!(outcome.steps(), 0);
}

// ==================== Termination ====================

#[test]
fn unknown_opcode_fails_at_address_zero() {
    assert!(matches!(
        run_expect_err(&[0xFF]),
        VmError::UnknownOpcode { opcode: 0xFF, pc: 0 }
    ));
}

#[test]
fn unknown_opcode_mid_program_reports_pc() {
    // OUT executes, then 0x00 matches nothing. The run aborts and discards
    // the byte already emitted.
    assert!(matches!(
        run_expect_err(&[0x02, 0x00]),
        VmError::UnknownOpcode { opcode: 0x00, pc: 1 }
    ));
}

#[test]
fn truncated_operand_stops_instead_of_failing() {
    // OUT emits one byte, then APTR is missing its imm8.
    let outcome = run_image(&[0x02, 0xE1]);
    assert_eq!(outcome.output, [0x00]);
    assert_eq!(outcome.status, ExitStatus::Stopped);
}

#[test]
fn partial_imm32_stops() {
    let outcome = run_image(&[0x21, 0x1D, 0x00]);
    assert_eq!(outcome.status, ExitStatus::Stopped);
    assert!(outcome.output.is_empty());
}

// ==================== Arithmetic ====================

#[test]
fn add_wraps_mod_256() {
    let outcome = run_asm(
        r#"
            MVI a, 255
            MVI b, 2
            ADD
            OUT
            HALT
        "#,
    );
    assert_eq!(outcome.output, [1]);
}

#[test]
fn sub_wraps_mod_256() {
    let outcome = run_asm(
        r#"
            MVI a, 1
            MVI b, 2
            SUB
            OUT
            HALT
        "#,
    );
    assert_eq!(outcome.output, [255]);
}

#[test]
fn xor_combines_a_and_b() {
    let outcome = run_asm(
        r#"
            MVI a, 0xF0
            MVI b, 0x0F
            XOR
            OUT
            HALT
        "#,
    );
    assert_eq!(outcome.output, [0xFF]);
}

#[test]
fn aptr_wraps_mod_2_pow_32() {
    // ptr = 0xFFFFFFFF, APTR 2 wraps it to 1, so the pseudo-register read
    // observes the image byte at address 1.
    let outcome = run_image(&[
        0xA8, 0xFF, 0xFF, 0xFF, 0xFF, // MVI32 ptr, 0xFFFFFFFF
        0xE1, 0x02, // APTR 2
        0x4F, // MV a, mem
        0x02, // OUT
        0x01, // HALT
    ]);
    assert_eq!(outcome.output, [0xFF]);
    assert_eq!(outcome.status, ExitStatus::Halted);
}

// ==================== Control flow ====================

#[test]
fn jez_taken_when_flag_clear() {
    let outcome = run_asm(
        r#"
            MVI a, 5
            MVI b, 5
            CMP
            JEZ equal
            MVI a, 0x4E    # 'N'
            OUT
            HALT
            equal:
            MVI a, 0x59    # 'Y'
            OUT
            HALT
        "#,
    );
    assert_eq!(outcome.output, b"Y");
}

#[test]
fn jnz_taken_when_flag_set() {
    let outcome = run_asm(
        r#"
            MVI a, 1
            MVI b, 2
            CMP
            JNZ differ
            MVI a, 0x4E    # 'N'
            OUT
            HALT
            differ:
            MVI a, 0x59    # 'Y'
            OUT
            HALT
        "#,
    );
    assert_eq!(outcome.output, b"Y");
}

#[test]
fn mvi32_into_pc_does_not_also_advance() {
    // Jump over a byte that is not a valid opcode; a double pc advance (set
    // target, then step past the 5-byte instruction) would instead resume on
    // the 0xFF byte and fail.
    let outcome = run_image(&[
        0xB0, 0x06, 0x00, 0x00, 0x00, // MVI32 pc, 6
        0xFF, // not an instruction
        0x01, // HALT
    ]);
    assert_eq!(outcome.status, ExitStatus::Halted);
    assert!(outcome.output.is_empty());
}

#[test]
fn mv32_into_pc_does_not_also_advance() {
    let outcome = run_image(&[
        0x88, 0x07, 0x00, 0x00, 0x00, // MVI32 la, 7
        0xB1, // MV32 pc, la
        0xFF, // not an instruction
        0x01, // HALT
    ]);
    assert_eq!(outcome.status, ExitStatus::Halted);
}

// ==================== Memory ====================

#[test]
fn pseudo_register_reads_memory_at_ptr_plus_c() {
    let outcome = run_image(&[
        0xA8, 0x08, 0x00, 0x00, 0x00, // MVI32 ptr, 8
        0x4F, // MV a, mem
        0x02, // OUT
        0x01, // HALT
        0x5A, // data
    ]);
    assert_eq!(outcome.output, [0x5A]);
}

#[test]
fn pseudo_register_write_modifies_later_fetches() {
    // The program patches the 0xFF placeholder into a HALT before execution
    // reaches it; without the write the run would fail on an unknown opcode.
    let outcome = run_image(&[
        0xA8, 0x08, 0x00, 0x00, 0x00, // MVI32 ptr, 8
        0x78, 0x01, // MVI mem, 0x01
        0x02, // OUT
        0xFF, // patched to HALT at runtime
    ]);
    assert_eq!(outcome.status, ExitStatus::Halted);
    assert_eq!(outcome.output, [0x00]);
}

#[test]
fn out_of_range_read_yields_zero() {
    let outcome = run_asm(
        r#"
            MVI a, 9
            MVI32 ptr, 0x1000
            MV a, mem
            OUT
            HALT
        "#,
    );
    assert_eq!(outcome.output, [0]);
}

#[test]
fn out_of_range_write_is_discarded() {
    let outcome = run_asm(
        r#"
            MVI32 ptr, 0x1000
            MVI mem, 0x42
            HALT
        "#,
    );
    assert_eq!(outcome.status, ExitStatus::Halted);
    assert!(outcome.output.is_empty());
}

// ==================== Step metering ====================

#[test]
fn profile_counts_output_instructions() {
    let outcome = run_image(&HELLO_IMAGE);
    assert_eq!(outcome.profile.get(StepCategory::Output), 13);
    assert_eq!(outcome.steps(), outcome.profile.iter().map(|(_, n)| n).sum());
}

#[test]
fn bounded_run_completes_within_budget() {
    let outcome = Vm::new(HELLO_IMAGE.to_vec())
        .run_bounded(DEFAULT_STEP_BUDGET)
        .expect("vm run failed");
    assert_eq!(outcome.output, b"Hello, world!");
}

#[test]
fn bounded_run_reports_exhausted_budget() {
    // MVI32 pc, 0 jumps to itself forever.
    let err = Vm::new(vec![0xB0, 0x00, 0x00, 0x00, 0x00])
        .run_bounded(1000)
        .expect_err("expected error");
    assert!(matches!(
        err,
        VmError::StepBudgetExhausted {
            budget: 1000,
            pc: 0
        }
    ));
}

use tomtel_derive::Error;

/// Errors that can occur during VM execution or assembly.
#[derive(Debug, Error)]
pub enum VmError {
    /// Fetched byte matched no instruction encoding. Fatal: decode either hit
    /// corrupt bytecode or control flow jumped into data.
    #[error("unknown opcode {opcode:#04x} at pc={pc:#x}")]
    UnknownOpcode { opcode: u8, pc: u32 },
    /// A bounded run used up its step allowance before terminating.
    #[error("step budget of {budget} exhausted at pc={pc:#x}")]
    StepBudgetExhausted { budget: u64, pc: u32 },
    /// Unrecognized instruction mnemonic during assembly.
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },
    /// Operand named a register the instruction cannot address.
    #[error("line {line}: unknown register `{name}`")]
    UnknownRegister { line: usize, name: String },
    /// Wrong number of operands for an instruction.
    #[error("line {line}: {mnemonic} expects {expected} operand(s), got {found}")]
    ArityMismatch {
        line: usize,
        mnemonic: String,
        expected: usize,
        found: usize,
    },
    /// Immediate operand is malformed or does not fit its width.
    #[error("line {line}: bad immediate `{token}`")]
    BadImmediate { line: usize, token: String },
    /// Label defined more than once.
    #[error("line {line}: duplicate label `{label}`")]
    DuplicateLabel { line: usize, label: String },
    /// Reference to a label that is never defined.
    #[error("line {line}: undefined label `{label}`")]
    UndefinedLabel { line: usize, label: String },
}

//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the Tomtel instruction set. The
//! [`for_each_fixed_op!`](crate::for_each_fixed_op) macro holds the canonical
//! definitions of the nine fixed-opcode instructions and invokes a callback
//! macro for code generation, so the assembler and the decoder share one
//! table. The two bit-pattern move families (`01dddsss` and `10dddsss`) claim
//! whole opcode ranges and are decoded separately in [`decode`].
//!
//! # Bytecode Format
//!
//! Instructions use variable-length encoding:
//! - Opcode: 1 byte
//! - Immediate u8: 1 byte
//! - Immediate u32: 4 bytes (little-endian)
//!
//! Register operands are packed into the opcode byte itself: the move
//! families encode destination and source ids in the `ddd` and `sss` fields,
//! with `sss == 0` selecting the immediate form.

use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::vm::fuel::StepCategory;

/// 8-bit register ids (`ddd`/`sss` fields of the `01dddsss` family).
pub const REG_A: u8 = 1;
pub const REG_B: u8 = 2;
pub const REG_C: u8 = 3;
pub const REG_D: u8 = 4;
pub const REG_E: u8 = 5;
pub const REG_F: u8 = 6;
/// Memory pseudo-register: not physical storage, accesses the byte at `ptr + c`.
pub const REG_MEM: u8 = 7;

/// 32-bit register ids (`ddd`/`sss` fields of the `10dddsss` family).
pub const REG_LA: u8 = 1;
pub const REG_LB: u8 = 2;
pub const REG_LC: u8 = 3;
pub const REG_LD: u8 = 4;
pub const REG_PTR: u8 = 5;
pub const REG_PC: u8 = 6;

/// Resolves an 8-bit register name to its id.
pub fn reg8_from_name(name: &str) -> Option<u8> {
    match name {
        "a" => Some(REG_A),
        "b" => Some(REG_B),
        "c" => Some(REG_C),
        "d" => Some(REG_D),
        "e" => Some(REG_E),
        "f" => Some(REG_F),
        "mem" => Some(REG_MEM),
        _ => None,
    }
}

/// Resolves a 32-bit register name to its id.
pub fn reg32_from_name(name: &str) -> Option<u8> {
    match name {
        "la" => Some(REG_LA),
        "lb" => Some(REG_LB),
        "lc" => Some(REG_LC),
        "ld" => Some(REG_LD),
        "ptr" => Some(REG_PTR),
        "pc" => Some(REG_PC),
        _ => None,
    }
}

/// Trailing operand shape of a fixed-opcode instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    None,
    Imm8,
    Imm32,
}

/// Invokes a callback macro with the complete fixed-opcode definition list.
///
/// This macro enables code generation for instructions in multiple modules
/// without duplicating the instruction definitions.
#[macro_export]
macro_rules! for_each_fixed_op {
    ($callback:ident) => {
        $callback! {
            /// HALT ; stop execution
            Halt = 0x01, "HALT", None,
            /// OUT ; append register a to the output stream
            Out = 0x02, "OUT", None,
            /// JEZ imm32 ; pc = imm32 if f == 0, else fall through
            Jez = 0x21, "JEZ", Imm32,
            /// JNZ imm32 ; pc = imm32 if f != 0, else fall through
            Jnz = 0x22, "JNZ", Imm32,
            /// CMP ; f = 1 if a != b else 0
            Cmp = 0xC1, "CMP", None,
            /// ADD ; a = a + b (mod 256)
            Add = 0xC2, "ADD", None,
            /// SUB ; a = a - b (mod 256)
            Sub = 0xC3, "SUB", None,
            /// XOR ; a = a ^ b
            Xor = 0xC4, "XOR", None,
            /// APTR imm8 ; ptr = ptr + imm8 (mod 2^32)
            Aptr = 0xE1, "APTR", Imm8,
        }
    };
}

#[macro_export]
macro_rules! define_fixed_ops {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:expr, $mnemonic:literal, $operand:ident
        ),* $(,)?
    ) => {
        /// Fixed single-opcode instructions.
        ///
        /// The move families are not listed here; they occupy the `01xxxxxx`
        /// and `10xxxxxx` ranges and carry their register operands inside the
        /// opcode byte.
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum FixedOp {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl FixedOp {
            /// Decodes a fixed opcode byte, if it matches one.
            pub const fn from_u8(byte: u8) -> Option<FixedOp> {
                match byte {
                    $( $opcode => Some(FixedOp::$name), )*
                    _ => None,
                }
            }

            /// Looks up a fixed op by its assembly mnemonic.
            pub fn from_mnemonic(mnemonic: &str) -> Option<FixedOp> {
                match mnemonic {
                    $( $mnemonic => Some(FixedOp::$name), )*
                    _ => None,
                }
            }

            /// Returns the opcode byte for this instruction.
            pub const fn opcode(&self) -> u8 {
                match self {
                    $( FixedOp::$name => $opcode, )*
                }
            }

            /// Returns the assembly mnemonic for this instruction.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( FixedOp::$name => $mnemonic, )*
                }
            }

            /// Returns the trailing operand shape for this instruction.
            pub const fn operand(&self) -> OperandKind {
                match self {
                    $( FixedOp::$name => OperandKind::$operand, )*
                }
            }
        }
    };
}

for_each_fixed_op!(define_fixed_ops);

/// One fully decoded instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    Halt,
    Out,
    Cmp,
    Add,
    Sub,
    Xor,
    Aptr { imm: u8 },
    Jez { target: u32 },
    Jnz { target: u32 },
    /// `01dddsss`, `sss != 0`: 8-bit register-to-register move.
    Mv { dest: u8, src: u8 },
    /// `01ddd000`: 8-bit immediate move.
    Mvi { dest: u8, imm: u8 },
    /// `10dddsss`, `sss != 0`: 32-bit register-to-register move.
    Mv32 { dest: u8, src: u8 },
    /// `10ddd000`: 32-bit immediate move.
    Mvi32 { dest: u8, imm: u32 },
}

impl Instruction {
    /// Encoded length in bytes, opcode included.
    pub const fn size(&self) -> u32 {
        match self {
            Instruction::Halt
            | Instruction::Out
            | Instruction::Cmp
            | Instruction::Add
            | Instruction::Sub
            | Instruction::Xor
            | Instruction::Mv { .. }
            | Instruction::Mv32 { .. } => 1,
            Instruction::Aptr { .. } | Instruction::Mvi { .. } => 2,
            Instruction::Jez { .. } | Instruction::Jnz { .. } | Instruction::Mvi32 { .. } => 5,
        }
    }

    /// Step-profile category this instruction is accounted under.
    pub const fn category(&self) -> StepCategory {
        match self {
            Instruction::Halt | Instruction::Jez { .. } | Instruction::Jnz { .. } => {
                StepCategory::Control
            }
            Instruction::Cmp | Instruction::Add | Instruction::Sub | Instruction::Xor => {
                StepCategory::Arithmetic
            }
            Instruction::Aptr { .. } => StepCategory::Memory,
            Instruction::Out => StepCategory::Output,
            Instruction::Mv { .. }
            | Instruction::Mvi { .. }
            | Instruction::Mv32 { .. }
            | Instruction::Mvi32 { .. } => StepCategory::Move,
        }
    }

    /// Appends the encoded form of this instruction to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            Instruction::Halt => out.push(FixedOp::Halt.opcode()),
            Instruction::Out => out.push(FixedOp::Out.opcode()),
            Instruction::Cmp => out.push(FixedOp::Cmp.opcode()),
            Instruction::Add => out.push(FixedOp::Add.opcode()),
            Instruction::Sub => out.push(FixedOp::Sub.opcode()),
            Instruction::Xor => out.push(FixedOp::Xor.opcode()),
            Instruction::Aptr { imm } => {
                out.push(FixedOp::Aptr.opcode());
                out.push(imm);
            }
            Instruction::Jez { target } => {
                out.push(FixedOp::Jez.opcode());
                out.extend_from_slice(&target.to_le_bytes());
            }
            Instruction::Jnz { target } => {
                out.push(FixedOp::Jnz.opcode());
                out.extend_from_slice(&target.to_le_bytes());
            }
            Instruction::Mv { dest, src } => out.push(0b0100_0000 | dest << 3 | src),
            Instruction::Mvi { dest, imm } => {
                out.push(0b0100_0000 | dest << 3);
                out.push(imm);
            }
            Instruction::Mv32 { dest, src } => out.push(0b1000_0000 | dest << 3 | src),
            Instruction::Mvi32 { dest, imm } => {
                out.push(0b1000_0000 | dest << 3);
                out.extend_from_slice(&imm.to_le_bytes());
            }
        }
    }
}

/// Result of fetching one instruction at `pc`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fetch {
    /// A fully decoded instruction.
    Decoded(Instruction),
    /// `pc` or a required operand byte lies past the end of memory. Not an
    /// error: the program fell off the end of its data.
    Truncated,
}

/// Reads a little-endian u32 whose four bytes must all be in bounds.
fn read_u32_le(memory: &[u8], at: usize) -> Option<u32> {
    let bytes = memory.get(at..at.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Decodes the instruction at `pc`.
///
/// The move families take priority over exact opcode matches. A byte that
/// matches neither a family nor a fixed opcode is a hard error carrying the
/// opcode value and the failing `pc`.
pub fn decode(memory: &[u8], pc: u32) -> Result<Fetch, VmError> {
    let at = pc as usize;
    let Some(&opcode) = memory.get(at) else {
        return Ok(Fetch::Truncated);
    };

    match opcode >> 6 {
        0b01 => {
            let dest = (opcode >> 3) & 0b111;
            let src = opcode & 0b111;
            return if src == 0 {
                match memory.get(at + 1) {
                    Some(&imm) => Ok(Fetch::Decoded(Instruction::Mvi { dest, imm })),
                    None => Ok(Fetch::Truncated),
                }
            } else {
                Ok(Fetch::Decoded(Instruction::Mv { dest, src }))
            };
        }
        0b10 => {
            let dest = (opcode >> 3) & 0b111;
            let src = opcode & 0b111;
            return if src == 0 {
                match read_u32_le(memory, at + 1) {
                    Some(imm) => Ok(Fetch::Decoded(Instruction::Mvi32 { dest, imm })),
                    None => Ok(Fetch::Truncated),
                }
            } else {
                Ok(Fetch::Decoded(Instruction::Mv32 { dest, src }))
            };
        }
        _ => {}
    }

    let Some(op) = FixedOp::from_u8(opcode) else {
        return Err(VmError::UnknownOpcode { opcode, pc });
    };

    match op {
        FixedOp::Halt => Ok(Fetch::Decoded(Instruction::Halt)),
        FixedOp::Out => Ok(Fetch::Decoded(Instruction::Out)),
        FixedOp::Cmp => Ok(Fetch::Decoded(Instruction::Cmp)),
        FixedOp::Add => Ok(Fetch::Decoded(Instruction::Add)),
        FixedOp::Sub => Ok(Fetch::Decoded(Instruction::Sub)),
        FixedOp::Xor => Ok(Fetch::Decoded(Instruction::Xor)),
        FixedOp::Aptr => match memory.get(at + 1) {
            Some(&imm) => Ok(Fetch::Decoded(Instruction::Aptr { imm })),
            None => Ok(Fetch::Truncated),
        },
        FixedOp::Jez => match read_u32_le(memory, at + 1) {
            Some(target) => Ok(Fetch::Decoded(Instruction::Jez { target })),
            None => Ok(Fetch::Truncated),
        },
        FixedOp::Jnz => match read_u32_le(memory, at + 1) {
            Some(target) => Ok(Fetch::Decoded(Instruction::Jnz { target })),
            None => Ok(Fetch::Truncated),
        },
    }
}

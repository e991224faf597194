//! Assembly language parser and image encoder.
//!
//! Converts human-readable Tomtel assembly into a raw bytecode image that
//! [`Vm`](super::vm::Vm) can execute. Fixed-opcode mnemonics come from
//! [`for_each_fixed_op!`](crate::for_each_fixed_op) via
//! [`FixedOp::from_mnemonic`]; the move families get their own mnemonics.
//!
//! # Syntax
//!
//! ```text
//! INSTRUCTION operand1, operand2   # optional comment
//! label:
//! ```
//!
//! - Mnemonics are uppercase (e.g., `MVI`, `JEZ`)
//! - 8-bit registers are `a b c d e f`, plus `mem` for the memory
//!   pseudo-register; 32-bit registers are `la lb lc ld ptr pc`
//! - Immediates are decimal or `0x`-prefixed hex
//! - `JEZ`, `JNZ`, and `MVI32` targets may name a label instead of a number
//! - `DATA byte, byte, ...` emits raw bytes verbatim, for the data segment
//!   a program reads through the memory pseudo-register
//! - Labels are defined alone on a line as `name:`
//! - Comments start with `#`; commas between operands are optional

use crate::{error, info};
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::isa::{
    reg32_from_name, reg8_from_name, FixedOp, Instruction, OperandKind,
};
use std::collections::HashMap;
use std::fmt::Write;

const COMMENT_CHAR: char = '#';
const LABEL_SUFFIX: char = ':';

/// One parsed line, waiting for label resolution.
enum Item {
    /// Instruction with all operands known.
    Ready(Instruction),
    /// Instruction whose 4-byte immediate names a label resolved in pass two.
    LabelRef {
        line: usize,
        opcode: u8,
        label: String,
    },
    /// Raw bytes from a `DATA` directive, emitted verbatim.
    Data(Vec<u8>),
}

impl Item {
    /// Encoded length in bytes.
    fn size(&self) -> u32 {
        match self {
            Item::Ready(instr) => instr.size(),
            Item::LabelRef { .. } => 5,
            Item::Data(bytes) => bytes.len() as u32,
        }
    }
}

/// Assembles a source listing into a bytecode image.
///
/// On failure, logs a compiler-style diagnostic pointing at the offending
/// line and returns the error.
pub fn assemble_source(source: &str) -> Result<Vec<u8>, VmError> {
    let image = assemble_inner(source).map_err(|err| {
        error!("{}", render_diagnostic(source, &err));
        err
    })?;
    info!("assembled {} byte image", image.len());
    Ok(image)
}

fn assemble_inner(source: &str) -> Result<Vec<u8>, VmError> {
    let mut items: Vec<Item> = Vec::new();
    let mut labels: HashMap<String, u32> = HashMap::new();
    let mut offset: u32 = 0;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = match raw_line.find(COMMENT_CHAR) {
            Some(at) => &raw_line[..at],
            None => raw_line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_suffix(LABEL_SUFFIX) {
            let name = name.trim();
            if !is_label_name(name) {
                return Err(VmError::BadImmediate {
                    line: line_no,
                    token: line.to_string(),
                });
            }
            if labels.insert(name.to_string(), offset).is_some() {
                return Err(VmError::DuplicateLabel {
                    line: line_no,
                    label: name.to_string(),
                });
            }
            continue;
        }

        let item = parse_line(line_no, line)?;
        offset += item.size();
        items.push(item);
    }

    let mut image = Vec::with_capacity(offset as usize);
    for item in items {
        match item {
            Item::Ready(instr) => instr.encode_into(&mut image),
            Item::LabelRef {
                line,
                opcode,
                label,
            } => {
                let Some(&target) = labels.get(&label) else {
                    return Err(VmError::UndefinedLabel { line, label });
                };
                image.push(opcode);
                image.extend_from_slice(&target.to_le_bytes());
            }
            Item::Data(bytes) => image.extend_from_slice(&bytes),
        }
    }
    Ok(image)
}

/// Formats a compiler-style diagnostic for an assembly failure.
pub fn render_diagnostic(source: &str, err: &VmError) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {err}");
    if let Some(line) = error_line(err) {
        if let Some(text) = source.lines().nth(line.saturating_sub(1)) {
            let _ = writeln!(diag, "{:>4} | {}", line, text.trim_end());
        }
    }
    diag
}

/// Returns the source line an assembly error points at, if any.
fn error_line(err: &VmError) -> Option<usize> {
    match err {
        VmError::UnknownMnemonic { line, .. }
        | VmError::UnknownRegister { line, .. }
        | VmError::ArityMismatch { line, .. }
        | VmError::BadImmediate { line, .. }
        | VmError::DuplicateLabel { line, .. }
        | VmError::UndefinedLabel { line, .. } => Some(*line),
        _ => None,
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<Item, VmError> {
    let mut parts = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    let Some(mnemonic) = parts.next() else {
        return Err(VmError::UnknownMnemonic {
            line: line_no,
            mnemonic: line.to_string(),
        });
    };
    let args: Vec<&str> = parts.collect();

    if mnemonic == "DATA" {
        if args.is_empty() {
            return Err(VmError::ArityMismatch {
                line: line_no,
                mnemonic: mnemonic.to_string(),
                expected: 1,
                found: 0,
            });
        }
        let mut bytes = Vec::with_capacity(args.len());
        for token in args {
            bytes.push(parse_imm(line_no, token, u8::MAX as u64)? as u8);
        }
        return Ok(Item::Data(bytes));
    }

    if let Some(op) = FixedOp::from_mnemonic(mnemonic) {
        let expected = match op.operand() {
            OperandKind::None => 0,
            OperandKind::Imm8 | OperandKind::Imm32 => 1,
        };
        expect_arity(line_no, mnemonic, &args, expected)?;

        return match op {
            FixedOp::Halt => Ok(Item::Ready(Instruction::Halt)),
            FixedOp::Out => Ok(Item::Ready(Instruction::Out)),
            FixedOp::Cmp => Ok(Item::Ready(Instruction::Cmp)),
            FixedOp::Add => Ok(Item::Ready(Instruction::Add)),
            FixedOp::Sub => Ok(Item::Ready(Instruction::Sub)),
            FixedOp::Xor => Ok(Item::Ready(Instruction::Xor)),
            FixedOp::Aptr => {
                let imm = parse_imm(line_no, args[0], u8::MAX as u64)? as u8;
                Ok(Item::Ready(Instruction::Aptr { imm }))
            }
            FixedOp::Jez | FixedOp::Jnz => {
                parse_imm32_or_label(line_no, op.opcode(), args[0], |target| match op {
                    FixedOp::Jez => Instruction::Jez { target },
                    _ => Instruction::Jnz { target },
                })
            }
        };
    }

    match mnemonic {
        "MV" => {
            expect_arity(line_no, mnemonic, &args, 2)?;
            let dest = parse_reg8(line_no, args[0])?;
            let src = parse_reg8(line_no, args[1])?;
            Ok(Item::Ready(Instruction::Mv { dest, src }))
        }
        "MVI" => {
            expect_arity(line_no, mnemonic, &args, 2)?;
            let dest = parse_reg8(line_no, args[0])?;
            let imm = parse_imm(line_no, args[1], u8::MAX as u64)? as u8;
            Ok(Item::Ready(Instruction::Mvi { dest, imm }))
        }
        "MV32" => {
            expect_arity(line_no, mnemonic, &args, 2)?;
            let dest = parse_reg32(line_no, args[0])?;
            let src = parse_reg32(line_no, args[1])?;
            Ok(Item::Ready(Instruction::Mv32 { dest, src }))
        }
        "MVI32" => {
            expect_arity(line_no, mnemonic, &args, 2)?;
            let dest = parse_reg32(line_no, args[0])?;
            parse_imm32_or_label(line_no, 0b1000_0000 | dest << 3, args[1], |imm| {
                Instruction::Mvi32 { dest, imm }
            })
        }
        _ => Err(VmError::UnknownMnemonic {
            line: line_no,
            mnemonic: mnemonic.to_string(),
        }),
    }
}

fn expect_arity(
    line: usize,
    mnemonic: &str,
    args: &[&str],
    expected: usize,
) -> Result<(), VmError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(VmError::ArityMismatch {
            line,
            mnemonic: mnemonic.to_string(),
            expected,
            found: args.len(),
        })
    }
}

fn parse_reg8(line: usize, token: &str) -> Result<u8, VmError> {
    reg8_from_name(token).ok_or_else(|| VmError::UnknownRegister {
        line,
        name: token.to_string(),
    })
}

fn parse_reg32(line: usize, token: &str) -> Result<u8, VmError> {
    reg32_from_name(token).ok_or_else(|| VmError::UnknownRegister {
        line,
        name: token.to_string(),
    })
}

/// Parses a decimal or `0x` hex immediate no greater than `max`.
fn parse_imm(line: usize, token: &str, max: u64) -> Result<u64, VmError> {
    let parsed = match token.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => token.parse::<u64>(),
    };
    match parsed {
        Ok(value) if value <= max => Ok(value),
        _ => Err(VmError::BadImmediate {
            line,
            token: token.to_string(),
        }),
    }
}

/// Parses a 4-byte immediate operand that is either a number or a label name.
fn parse_imm32_or_label(
    line: usize,
    opcode: u8,
    token: &str,
    make: impl FnOnce(u32) -> Instruction,
) -> Result<Item, VmError> {
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        let value = parse_imm(line, token, u32::MAX as u64)? as u32;
        return Ok(Item::Ready(make(value)));
    }
    if is_label_name(token) {
        return Ok(Item::LabelRef {
            line,
            opcode,
            label: token.to_string(),
        });
    }
    Err(VmError::BadImmediate {
        line,
        token: token.to_string(),
    })
}

fn is_label_name(token: &str) -> bool {
    let mut chars = token.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_fixed_and_move_forms() {
        let image = assemble_source(
            r#"
                MVI b, 0x48   # load 'H'
                ADD
                OUT
                MV a, mem
                MV32 ptr, la
                HALT
            "#,
        )
        .unwrap();
        assert_eq!(image, [0x50, 0x48, 0xC2, 0x02, 0x4F, 0xA9, 0x01]);
    }

    #[test]
    fn commas_are_optional() {
        assert_eq!(
            assemble_source("MV a b").unwrap(),
            assemble_source("MV a, b").unwrap()
        );
    }

    #[test]
    fn labels_resolve_forward_and_backward() {
        let image = assemble_source(
            r#"
                start:
                CMP
                JNZ start
                JEZ end
                end:
                HALT
            "#,
        )
        .unwrap();
        // JNZ back to offset 0, JEZ forward to offset 11.
        assert_eq!(
            image,
            [0xC1, 0x22, 0x00, 0x00, 0x00, 0x00, 0x21, 0x0B, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn mvi32_accepts_labels() {
        let image = assemble_source(
            r#"
                MVI32 pc, done
                done:
                HALT
            "#,
        )
        .unwrap();
        assert_eq!(image, [0xB0, 0x05, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn data_directive_emits_raw_bytes() {
        let image = assemble_source(
            r#"
                HALT
                DATA 0x65, 0x6F, 51
            "#,
        )
        .unwrap();
        assert_eq!(image, [0x01, 0x65, 0x6F, 0x33]);
    }

    #[test]
    fn data_directive_rejects_wide_and_missing_bytes() {
        let err = assemble_source("DATA 256").unwrap_err();
        assert!(matches!(err, VmError::BadImmediate { line: 1, .. }));

        let err = assemble_source("DATA").unwrap_err();
        assert!(matches!(err, VmError::ArityMismatch { line: 1, found: 0, .. }));
    }

    #[test]
    fn labels_account_for_data_bytes() {
        // The 3-byte DATA block shifts the label to offset 8.
        let image = assemble_source(
            r#"
                JEZ end
                DATA 1, 2, 3
                end:
                HALT
            "#,
        )
        .unwrap();
        assert_eq!(image, [0x21, 0x08, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x01]);
    }

    #[test]
    fn unknown_mnemonic() {
        let err = assemble_source("NOP").unwrap_err();
        assert!(matches!(err, VmError::UnknownMnemonic { line: 1, .. }));
    }

    #[test]
    fn unknown_register() {
        let err = assemble_source("MV a, r7").unwrap_err();
        assert!(matches!(err, VmError::UnknownRegister { line: 1, .. }));
        // mem is not addressable as a 32-bit register
        let err = assemble_source("MV32 mem, la").unwrap_err();
        assert!(matches!(err, VmError::UnknownRegister { line: 1, .. }));
    }

    #[test]
    fn arity_mismatch() {
        let err = assemble_source("HALT a").unwrap_err();
        assert!(matches!(
            err,
            VmError::ArityMismatch {
                line: 1,
                expected: 0,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn immediate_out_of_range() {
        let err = assemble_source("MVI a, 256").unwrap_err();
        assert!(matches!(err, VmError::BadImmediate { line: 1, .. }));
        assert!(assemble_source("MVI a, 255").is_ok());
    }

    #[test]
    fn duplicate_and_undefined_labels() {
        let err = assemble_source("x:\nx:\n").unwrap_err();
        assert!(matches!(err, VmError::DuplicateLabel { line: 2, .. }));

        let err = assemble_source("HALT\nJEZ nowhere").unwrap_err();
        assert!(matches!(err, VmError::UndefinedLabel { line: 2, .. }));
    }

    #[test]
    fn diagnostic_points_at_offending_line() {
        let source = "HALT\nBOGUS a";
        let err = assemble_inner(source).unwrap_err();
        let diag = render_diagnostic(source, &err);
        assert!(diag.contains("unknown mnemonic `BOGUS`"), "{diag}");
        assert!(diag.contains("   2 | BOGUS a"), "{diag}");
    }
}

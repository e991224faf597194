//! Core virtual machine implementation.
//!
//! A [`Vm`] owns one memory image for the duration of one run. Code and data
//! alias the same buffer, so a write through the memory pseudo-register may
//! change bytes a later cycle fetches as instructions. All register
//! arithmetic wraps: mod 256 for the 8-bit file, mod 2^32 for the 32-bit
//! file.

use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::isa::{self, decode, Fetch, Instruction};
use crate::warn;

pub mod fuel;
mod registers;
#[cfg(test)]
mod tests;

use fuel::StepProfile;
use registers::Registers;

/// Terminal state of a normally ended run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExitStatus {
    /// The program executed HALT.
    Halted,
    /// The instruction pointer or a required operand byte ran past the end
    /// of memory. Treated as the program's implicit end, not an error.
    Stopped,
}

/// Result of a completed run.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// Bytes the program emitted via OUT, in order.
    pub output: Vec<u8>,
    /// How the run ended.
    pub status: ExitStatus,
    /// Executed-instruction counts by category.
    pub profile: StepProfile,
}

impl Outcome {
    /// Total instructions executed during the run.
    pub fn steps(&self) -> u64 {
        self.profile.total()
    }
}

/// Tomtel Core i69 virtual machine.
///
/// Created from a bytecode image and consumed by a single run; registers
/// start zeroed and memory is exactly the input image. An unknown opcode
/// aborts the run with [`VmError::UnknownOpcode`] and discards any output
/// collected before the fault.
pub struct Vm {
    /// Memory image: program, data segment, and write destination all alias
    /// this one buffer. Its length never changes during a run.
    memory: Vec<u8>,
    /// 8-bit and 32-bit register files.
    regs: Registers,
    /// Output stream appended by OUT.
    output: Vec<u8>,
    /// Executed-instruction counts by category.
    profile: StepProfile,
}

impl Vm {
    /// Creates a VM whose memory is the given image.
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            memory: image,
            regs: Registers::new(),
            output: Vec::new(),
            profile: StepProfile::new(),
        }
    }

    /// Runs to termination with no step bound.
    ///
    /// An image containing a jump cycle that never halts or leaves memory
    /// bounds runs forever; use [`run_bounded`](Self::run_bounded) for
    /// untrusted images.
    pub fn run(self) -> Result<Outcome, VmError> {
        self.run_inner(None)
    }

    /// Runs with a step allowance, failing with
    /// [`VmError::StepBudgetExhausted`] once `budget` instructions have
    /// executed without terminating.
    pub fn run_bounded(self, budget: u64) -> Result<Outcome, VmError> {
        self.run_inner(Some(budget))
    }

    fn run_inner(mut self, budget: Option<u64>) -> Result<Outcome, VmError> {
        loop {
            if let Some(limit) = budget {
                if self.profile.total() >= limit {
                    let pc = self.regs.pc();
                    warn!("step budget of {} exhausted at pc={:#x}", limit, pc);
                    return Err(VmError::StepBudgetExhausted { budget: limit, pc });
                }
            }
            if let Some(status) = self.step()? {
                return Ok(Outcome {
                    output: self.output,
                    status,
                    profile: self.profile,
                });
            }
        }
    }

    /// Executes one fetch-decode-execute cycle.
    ///
    /// Returns `Ok(Some(status))` when the cycle terminated the run.
    fn step(&mut self) -> Result<Option<ExitStatus>, VmError> {
        let pc = self.regs.pc();
        let instr = match decode(&self.memory, pc)? {
            Fetch::Truncated => return Ok(Some(ExitStatus::Stopped)),
            Fetch::Decoded(instr) => instr,
        };
        self.profile.add(instr.category(), 1);
        Ok(self.exec(instr, pc))
    }

    fn exec(&mut self, instr: Instruction, pc: u32) -> Option<ExitStatus> {
        let next = pc.wrapping_add(instr.size());
        match instr {
            Instruction::Halt => return Some(ExitStatus::Halted),
            Instruction::Out => {
                self.output.push(self.regs.gp8(isa::REG_A));
                self.regs.set_pc(next);
            }
            Instruction::Cmp => {
                let f = (self.regs.gp8(isa::REG_A) != self.regs.gp8(isa::REG_B)) as u8;
                self.regs.set_gp8(isa::REG_F, f);
                self.regs.set_pc(next);
            }
            Instruction::Add => {
                let v = self
                    .regs
                    .gp8(isa::REG_A)
                    .wrapping_add(self.regs.gp8(isa::REG_B));
                self.regs.set_gp8(isa::REG_A, v);
                self.regs.set_pc(next);
            }
            Instruction::Sub => {
                let v = self
                    .regs
                    .gp8(isa::REG_A)
                    .wrapping_sub(self.regs.gp8(isa::REG_B));
                self.regs.set_gp8(isa::REG_A, v);
                self.regs.set_pc(next);
            }
            Instruction::Xor => {
                let v = self.regs.gp8(isa::REG_A) ^ self.regs.gp8(isa::REG_B);
                self.regs.set_gp8(isa::REG_A, v);
                self.regs.set_pc(next);
            }
            Instruction::Aptr { imm } => {
                let ptr = self.regs.get32(isa::REG_PTR).wrapping_add(imm as u32);
                self.regs.set32(isa::REG_PTR, ptr);
                self.regs.set_pc(next);
            }
            Instruction::Jez { target } => {
                if self.regs.gp8(isa::REG_F) == 0 {
                    self.regs.set_pc(target);
                } else {
                    self.regs.set_pc(next);
                }
            }
            Instruction::Jnz { target } => {
                if self.regs.gp8(isa::REG_F) != 0 {
                    self.regs.set_pc(target);
                } else {
                    self.regs.set_pc(next);
                }
            }
            Instruction::Mv { dest, src } => {
                let v = self.read8(src);
                self.write8(dest, v);
                self.regs.set_pc(next);
            }
            Instruction::Mvi { dest, imm } => {
                self.write8(dest, imm);
                self.regs.set_pc(next);
            }
            Instruction::Mv32 { dest, src } => {
                let v = self.regs.get32(src);
                self.regs.set32(dest, v);
                // A move into pc is the jump itself; advancing past the
                // instruction afterwards would abandon the target and resume
                // at unrelated bytes.
                if dest != isa::REG_PC {
                    self.regs.set_pc(next);
                }
            }
            Instruction::Mvi32 { dest, imm } => {
                self.regs.set32(dest, imm);
                if dest != isa::REG_PC {
                    self.regs.set_pc(next);
                }
            }
        }
        None
    }

    /// Reads an 8-bit register; id 7 reads the memory byte at `ptr + c`.
    fn read8(&self, id: u8) -> u8 {
        if id == isa::REG_MEM {
            self.load_byte(self.regs.cursor())
        } else {
            self.regs.gp8(id)
        }
    }

    /// Writes an 8-bit register; id 7 stores to the memory byte at `ptr + c`.
    fn write8(&mut self, id: u8, value: u8) {
        if id == isa::REG_MEM {
            self.store_byte(self.regs.cursor(), value);
        } else {
            self.regs.set_gp8(id, value);
        }
    }

    /// Reads the memory byte at `addr`; out-of-range reads yield 0.
    fn load_byte(&self, addr: u32) -> u8 {
        self.memory.get(addr as usize).copied().unwrap_or(0)
    }

    /// Writes the memory byte at `addr`; out-of-range writes are discarded.
    /// Memory never grows.
    fn store_byte(&mut self, addr: u32, value: u8) {
        if let Some(slot) = self.memory.get_mut(addr as usize) {
            *slot = value;
        }
    }
}

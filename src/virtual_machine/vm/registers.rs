use crate::virtual_machine::isa::{REG_C, REG_PC, REG_PTR};

/// Register file holding the six 8-bit and six 32-bit registers.
///
/// Ids 1-6 address the files; id 0 and ids past the end read as 0 and drop
/// writes. The memory pseudo-register (8-bit id 7) is resolved by the VM,
/// which owns memory; this struct only supplies the `ptr + c` cursor address.
pub(super) struct Registers {
    /// `a`, `b`, `c`, `d`, `e`, `f`.
    r8: [u8; 6],
    /// `la`, `lb`, `lc`, `ld`, `ptr`, `pc`.
    r32: [u32; 6],
}

impl Registers {
    /// Creates a zero-initialized register file.
    pub(super) fn new() -> Self {
        Self {
            r8: [0; 6],
            r32: [0; 6],
        }
    }

    /// Reads 8-bit register `id`; ids outside 1-6 read as 0.
    pub(super) fn gp8(&self, id: u8) -> u8 {
        match id {
            1..=6 => self.r8[(id - 1) as usize],
            _ => 0,
        }
    }

    /// Writes 8-bit register `id`; writes outside 1-6 are dropped.
    pub(super) fn set_gp8(&mut self, id: u8, value: u8) {
        if let 1..=6 = id {
            self.r8[(id - 1) as usize] = value;
        }
    }

    /// Reads 32-bit register `id`; ids outside 1-6 read as 0.
    pub(super) fn get32(&self, id: u8) -> u32 {
        match id {
            1..=6 => self.r32[(id - 1) as usize],
            _ => 0,
        }
    }

    /// Writes 32-bit register `id`; writes outside 1-6 are dropped.
    pub(super) fn set32(&mut self, id: u8, value: u32) {
        if let 1..=6 = id {
            self.r32[(id - 1) as usize] = value;
        }
    }

    pub(super) fn pc(&self) -> u32 {
        self.get32(REG_PC)
    }

    pub(super) fn set_pc(&mut self, value: u32) {
        self.set32(REG_PC, value);
    }

    /// Address the memory pseudo-register resolves to: `ptr + c`, wrapping.
    pub(super) fn cursor(&self) -> u32 {
        self.get32(REG_PTR).wrapping_add(self.gp8(REG_C) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_file_ids_read_zero_and_drop_writes() {
        let mut regs = Registers::new();
        regs.set_gp8(0, 0xAA);
        regs.set_gp8(7, 0xAA);
        regs.set32(0, 1);
        regs.set32(9, 1);
        assert_eq!(regs.gp8(0), 0);
        assert_eq!(regs.gp8(7), 0);
        assert_eq!(regs.get32(0), 0);
        assert_eq!(regs.get32(9), 0);
    }

    #[test]
    fn cursor_wraps_mod_2_pow_32() {
        let mut regs = Registers::new();
        regs.set32(REG_PTR, 0xFFFF_FFFF);
        regs.set_gp8(REG_C, 2);
        assert_eq!(regs.cursor(), 1);
    }
}

//! Register-based bytecode virtual machine for the Tomtel Core i69.
//!
//! The VM executes the final-layer bytecode image produced by the upstream
//! decode pipeline and collects the bytes the program writes to its output
//! stream.
//!
//! # Architecture
//!
//! - **Memory**: one mutable byte buffer holding both code and data; writes
//!   through the memory pseudo-register may alter bytes that are later
//!   fetched as instructions
//! - **Registers**: six 8-bit registers (`a`..`f`), six 32-bit registers
//!   (`la`, `lb`, `lc`, `ld`, `ptr`, `pc`), all unsigned with wrapping
//!   arithmetic
//! - **Pseudo-register**: 8-bit register id 7 reads and writes the memory
//!   byte at `ptr + c` instead of physical storage
//! - **Termination**: HALT and running past the end of memory both end the
//!   run normally; an unrecognized opcode aborts it with an error
//!
//! # Modules
//!
//! - [`assembler`]: Assembly parsing, diagnostics, and image encoding
//! - [`errors`]: Assembly and execution error types
//! - [`isa`]: Instruction set definition and opcode decoding
//! - [`vm`]: Core virtual machine implementation and step metering

pub mod assembler;
pub mod errors;
pub mod isa;
pub mod vm;

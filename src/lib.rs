//! Tomtel Core i69 interpreter library.
//!
//! Executes the bytecode image handed over by the upstream decode pipeline and
//! collects the plaintext output stream. The pipeline itself (and all file or
//! CLI handling) lives outside this crate; callers pass in a byte buffer and
//! get back the bytes the program emitted.

pub mod utils;
pub mod virtual_machine;

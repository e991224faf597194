//! Cross-cutting utilities.

pub mod log;

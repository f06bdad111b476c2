//! Opcode implementations.
//!
//! Each function is registered in [`crate::vm::dispatch::OpcodeTable`]. The
//! interpreter has already checked that the stack holds the declared input
//! count before calling it; the function pops exactly that many words and
//! pushes exactly the declared output count.

pub mod flow;
pub mod general;
pub mod logic;
pub mod math;
pub mod store;

use thiserror::Error;

use crate::vm::integrity::IntegrityError;

/// Every variant is fatal: the evaluation that raised it is abandoned and
/// none of its store writes are committed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("out of gas")]
    OutOfGas,
    #[error("unknown opcode: {0:#06x}")]
    UnknownOpcode(u16),
    #[error("invalid operand {operand:#06x} for {opcode}")]
    InvalidOperand { opcode: &'static str, operand: u16 },
    #[error("stack underflow: {opcode} needs {needed} words, {available} available")]
    StackUnderflow { opcode: &'static str, needed: usize, available: usize },
    #[error("stack overflow (capacity {0})")]
    StackOverflow(usize),
    #[error("{opcode} left {actual} words on the stack, expected {expected}")]
    ArityMismatch { opcode: &'static str, expected: usize, actual: usize },
    #[error("source index {0} out of range")]
    SourceOutOfRange(usize),
    #[error("constant index {0} out of range")]
    ConstantOutOfRange(usize),
    #[error("stack read at index {index} past height {height}")]
    StackReadOutOfRange { index: usize, height: usize },
    #[error("context read out of bounds at row {row}, column {column}")]
    ContextOutOfBounds { row: usize, column: usize },
    #[error("call depth limit exceeded ({0})")]
    CallDepth(usize),
    #[error("ensure failed (code {0})")]
    EnsureFailed(u16),
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
    #[error("arithmetic underflow in {0}")]
    Underflow(&'static str),
    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),
    #[error("malformed bytecode: {0}")]
    MalformedBytecode(String),
    #[error("entrypoint {entrypoint} produced {actual} outputs, expected at least {min}")]
    InsufficientOutputs { entrypoint: usize, min: usize, actual: usize },
    #[error("state error: {0}")]
    State(String),
    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("unknown expression {0}")]
    UnknownExpression(String),
    #[error("unknown entrypoint {0}")]
    UnknownEntrypoint(usize),
}

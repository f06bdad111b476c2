//! IONA expression VM.

pub mod bytecode;
pub mod context;
pub mod debug;
pub mod dispatch;
pub mod errors;
pub mod gas;
pub mod integrity;
pub mod interpreter;
pub mod opcodes;
pub mod stack;
pub mod state;
pub mod word;

pub use bytecode::{ExpressionBundle, ExpressionId, Op, Operand, Source};
pub use context::Context;
pub use dispatch::OpcodeTable;
pub use errors::VmError;
pub use interpreter::{eval, EvalArgs, EvalOutput, Limits};
pub use state::{MemoryStore, Store};
pub use word::{Caller, Word, U256};

pub mod config;
pub mod host;
pub mod sentinel;

pub mod vm;

pub use config::InterpreterConfig;
pub use host::{EvalResult, Interpreter};

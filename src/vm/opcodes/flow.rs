//! Control-flow ops.
//!
//! Each runs another source in a fresh frame via [`EvalState::eval_nested`].
//! Words cross the frame boundary only as the popped inputs and the pushed
//! outputs; the callee never sees the caller's stack below its inputs.
//!
//! `do-while` has no static iteration bound. It terminates because the body
//! eventually leaves a zero condition or because the host's gas budget runs
//! out.

use crate::vm::{
    bytecode::Operand,
    errors::VmError,
    interpreter::EvalState,
    word::word_is_zero,
};

/// Operand: source (bits 0..8), inputs (8..12), outputs (12..16).
pub fn call(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let (source, inputs, outputs) = (operand.low_byte(), operand.nibble_2(), operand.nibble_3());
    let args = state.stack.pop_n("call", inputs)?;
    let callee = state.eval_nested(source, args)?;
    let results = callee.top_n("call", outputs)?;
    state.stack.extend(results)
}

/// Operand: source (bits 0..8), carried words (8..12), iterations (12..16).
pub fn loop_n(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let (source, carried, iterations) = (operand.low_byte(), operand.nibble_2(), operand.nibble_3());
    let mut words = state.stack.pop_n("loop-n", carried)?;
    for _ in 0..iterations {
        let frame = state.eval_nested(source, words)?;
        words = frame.top_n("loop-n", carried)?;
    }
    state.stack.extend(words)
}

/// Operand: source (bits 0..8), carried words (8..12).
///
/// Stack: `[..carried, condition]`. While the condition is non-zero the body
/// runs on the carried words and must leave `[..carried, condition]` on top.
pub fn do_while(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let (source, carried) = (operand.low_byte(), operand.nibble_2());
    let mut cond = state.stack.pop("do-while")?;
    let mut words = state.stack.pop_n("do-while", carried)?;
    while !word_is_zero(&cond) {
        let frame = state.eval_nested(source, words)?;
        let mut top = frame.top_n("do-while", carried + 1)?;
        cond = top.pop().ok_or(VmError::StackUnderflow { opcode: "do-while", needed: 1, available: 0 })?;
        words = top;
    }
    state.stack.extend(words)
}

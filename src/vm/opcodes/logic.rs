//! Comparison and logic. Binary comparisons compute `a OP b` where `a` was
//! pushed first.

use crate::vm::{
    bytecode::Operand,
    errors::VmError,
    interpreter::EvalState,
    word::{word_bool, word_is_zero, Word, U256},
};

fn compare(state: &mut EvalState<'_>, name: &'static str, f: fn(&Word, &Word) -> bool) -> Result<(), VmError> {
    let b = state.stack.pop(name)?;
    let a = state.stack.pop(name)?;
    state.stack.push(word_bool(f(&a, &b)))
}

pub fn less_than(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    compare(state, "less-than", |a, b| a < b)
}

pub fn greater_than(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    compare(state, "greater-than", |a, b| a > b)
}

pub fn equal_to(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    compare(state, "equal-to", |a, b| a == b)
}

pub fn less_than_or_equal_to(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    compare(state, "less-than-or-equal-to", |a, b| a <= b)
}

pub fn greater_than_or_equal_to(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    compare(state, "greater-than-or-equal-to", |a, b| a >= b)
}

pub fn is_zero(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    let a = state.stack.pop("is-zero")?;
    state.stack.push(word_bool(word_is_zero(&a)))
}

/// Last input if every input is non-zero, else zero.
pub fn every(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let inputs = state.stack.pop_n("every", operand.count())?;
    let out = if inputs.iter().any(word_is_zero) {
        U256::ZERO
    } else {
        inputs.last().copied().unwrap_or(U256::ZERO)
    };
    state.stack.push(out)
}

/// First non-zero input, else zero.
pub fn any(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let inputs = state.stack.pop_n("any", operand.count())?;
    let out = inputs.into_iter().find(|w| !word_is_zero(w)).unwrap_or(U256::ZERO);
    state.stack.push(out)
}

/// `[condition, if_true, if_false]`; both branches are already evaluated.
pub fn eager_if(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    let if_false = state.stack.pop("eager-if")?;
    let if_true = state.stack.pop("eager-if")?;
    let cond = state.stack.pop("eager-if")?;
    state.stack.push(if word_is_zero(&cond) { if_false } else { if_true })
}

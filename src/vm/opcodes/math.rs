//! Unsigned 256-bit arithmetic.
//!
//! Variadic: the operand is the input count and inputs fold left in push
//! order, so `sub` over `[a, b, c]` is `a - b - c`. Checked ops fail on
//! overflow, underflow and division by zero; they never wrap.

use crate::vm::{
    bytecode::Operand,
    errors::VmError,
    interpreter::EvalState,
    word::Word,
};

fn fold(
    state:   &mut EvalState<'_>,
    operand: Operand,
    name:    &'static str,
    f:       impl Fn(Word, Word) -> Result<Word, VmError>,
) -> Result<(), VmError> {
    let inputs = state.stack.pop_n(name, operand.count())?;
    let mut it = inputs.into_iter();
    let first = it.next().ok_or(VmError::InvalidOperand { opcode: name, operand: operand.raw() })?;
    let acc = it.try_fold(first, f)?;
    state.stack.push(acc)
}

pub fn add(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "add", |a, b| a.checked_add(b).ok_or(VmError::Overflow("add")))
}

pub fn sub(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "sub", |a, b| a.checked_sub(b).ok_or(VmError::Underflow("sub")))
}

pub fn mul(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "mul", |a, b| a.checked_mul(b).ok_or(VmError::Overflow("mul")))
}

pub fn div(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "div", |a, b| a.checked_div(b).ok_or(VmError::DivisionByZero("div")))
}

pub fn modulo(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "mod", |a, b| a.checked_rem(b).ok_or(VmError::DivisionByZero("mod")))
}

pub fn exp(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "exp", |a, b| a.checked_pow(b).ok_or(VmError::Overflow("exp")))
}

pub fn min(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "min", |a, b| Ok(a.min(b)))
}

pub fn max(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "max", |a, b| Ok(a.max(b)))
}

pub fn saturating_add(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "saturating-add", |a, b| Ok(a.saturating_add(b)))
}

pub fn saturating_sub(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "saturating-sub", |a, b| Ok(a.saturating_sub(b)))
}

pub fn saturating_mul(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    fold(state, operand, "saturating-mul", |a, b| Ok(a.saturating_mul(b)))
}

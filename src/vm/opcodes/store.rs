use crate::vm::{bytecode::Operand, errors::VmError, interpreter::EvalState};

/// `[key, value]` → store[caller][key] = value (buffered until commit).
pub fn set(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    let value = state.stack.pop("set")?;
    let key = state.stack.pop("set")?;
    state.store_set(key, value);
    Ok(())
}

pub fn get(state: &mut EvalState<'_>, _: Operand) -> Result<(), VmError> {
    let key = state.stack.pop("get")?;
    let value = state.store_get(&key)?;
    state.stack.push(value)
}

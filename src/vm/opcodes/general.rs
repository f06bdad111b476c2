use crate::vm::{
    bytecode::{MemoryRegion, Operand},
    debug::DebugMode,
    errors::VmError,
    interpreter::EvalState,
    word::{keccak_words, word_is_zero},
};

/// Push a copy of a constant, or of a word already on the current frame.
pub fn read_memory(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let index = operand.memory_index();
    let v = match operand.memory_region() {
        MemoryRegion::Constants => state.bundle().constant(index)?,
        MemoryRegion::Stack => state.stack.get(index)?,
    };
    state.stack.push(v)
}

/// Push `context[row][column]`; row is the operand's high byte.
pub fn context(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let v = state.context().get(operand.high_byte(), operand.low_byte())?;
    state.stack.push(v)
}

pub fn debug(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let mode = DebugMode::from_operand(operand.raw())
        .ok_or(VmError::InvalidOperand { opcode: "debug", operand: operand.raw() })?;
    state.emit_debug(mode);
    Ok(())
}

/// Pops one word; zero aborts the evaluation with the operand as error code.
pub fn ensure(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let cond = state.stack.pop("ensure")?;
    if word_is_zero(&cond) {
        return Err(VmError::EnsureFailed(operand.raw()));
    }
    Ok(())
}

pub fn hash(state: &mut EvalState<'_>, operand: Operand) -> Result<(), VmError> {
    let words = state.stack.pop_n("hash", operand.count())?;
    state.stack.push(keccak_words(&words))
}

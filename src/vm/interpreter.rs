//! IONA expression interpreter.
//!
//! `eval` is a pure function of (bundle, entrypoint, context, store
//! snapshot): it runs one source to completion in a fresh [`EvalState`] and
//! returns the final stack plus the store writes the evaluation buffered.
//! Nothing is committed here; the host applies the writes on success.
//!
//! Ops run strictly in sequence. The only way to reach another source is a
//! control-flow op (`call`, `loop-n`, `do-while`), which runs the target in a
//! new stack frame seeded with explicitly popped words and pushes back an
//! explicit number of results.

use std::mem;

use tracing::trace;

use crate::vm::{
    bytecode::ExpressionBundle,
    context::Context,
    debug::{DebugEvent, DebugMode, DebugSink},
    dispatch::OpcodeTable,
    errors::VmError,
    gas::GasMeter,
    stack::Stack,
    state::{Store, StoreOverlay},
    word::{Caller, Word},
};

pub const DEFAULT_STACK_LIMIT: usize = 1024;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 32;
/// Hard ceiling on nested frames. Each frame costs several native stack
/// frames, so configured depths are clamped to this.
pub const MAX_CALL_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Words per stack frame.
    pub max_stack:      usize,
    /// Nested frames opened by control-flow ops.
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_stack: DEFAULT_STACK_LIMIT, max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}

impl Limits {
    /// `max_call_depth` capped at [`MAX_CALL_DEPTH`].
    pub fn clamped(self) -> Self {
        Self { max_call_depth: self.max_call_depth.min(MAX_CALL_DEPTH), ..self }
    }
}

/// What to evaluate.
#[derive(Debug, Clone, Copy)]
pub struct EvalArgs<'a> {
    pub bundle:      &'a ExpressionBundle,
    pub source_index: usize,
    pub context:     &'a Context,
    pub caller:      Caller,
    /// Return only the top `n` words (in push order); `None` returns all.
    pub max_outputs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOutput {
    pub stack:    Vec<Word>,
    pub writes:   Vec<(Word, Word)>,
    pub gas_used: u64,
}

/// Transient state of one top-level evaluation.
pub struct EvalState<'a> {
    pub stack:        Stack,
    pub source_index: usize,
    pub ip:           usize,
    pub call_depth:   usize,
    bundle:  &'a ExpressionBundle,
    context: &'a Context,
    store:   StoreOverlay<'a>,
    table:   &'a OpcodeTable,
    limits:  Limits,
    gas:     &'a mut GasMeter,
    sink:    &'a mut dyn DebugSink,
}

impl<'a> EvalState<'a> {
    pub fn bundle(&self) -> &'a ExpressionBundle { self.bundle }

    pub fn context(&self) -> &'a Context { self.context }

    pub fn store_get(&self, key: &Word) -> Result<Word, VmError> {
        self.store.get(key)
    }

    pub fn store_set(&mut self, key: Word, value: Word) {
        self.store.set(key, value);
    }

    pub fn emit_debug(&mut self, mode: DebugMode) {
        let words = match mode {
            DebugMode::Stack => self.stack.as_slice().to_vec(),
            DebugMode::Constants => self.bundle.constants.clone(),
            DebugMode::Context => self.context.flatten(),
            DebugMode::State => DebugEvent::pack_state(
                self.source_index,
                self.ip,
                self.call_depth,
                self.stack.as_slice(),
            ),
        };
        self.sink.emit(DebugEvent {
            mode,
            source_index: self.source_index,
            ip: self.ip,
            call_depth: self.call_depth,
            words,
        });
    }

    /// Run `source_index` in a new frame seeded with `inputs` and return that
    /// frame's final stack. The caller's frame is restored either way.
    pub fn eval_nested(&mut self, source_index: usize, inputs: Vec<Word>) -> Result<Stack, VmError> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(VmError::CallDepth(self.limits.max_call_depth));
        }
        self.gas.charge_frame(inputs.len())?;
        let frame = Stack::seeded(inputs, self.limits.max_stack)?;
        let caller_stack = mem::replace(&mut self.stack, frame);
        let (caller_source, caller_ip) = (self.source_index, self.ip);

        self.source_index = source_index;
        self.call_depth += 1;
        let result = self.run_source();
        self.call_depth -= 1;
        self.source_index = caller_source;
        self.ip = caller_ip;

        let callee_stack = mem::replace(&mut self.stack, caller_stack);
        result.map(|()| callee_stack)
    }

    /// Execute `self.source_index` from ip 0 on the current frame.
    fn run_source(&mut self) -> Result<(), VmError> {
        let bundle = self.bundle;
        let table = self.table;
        let source = bundle.source(self.source_index)?;
        self.ip = 0;

        while self.ip < source.len() {
            let op = source.ops()[self.ip];
            let def = table.lookup(op.opcode)?;
            self.gas.charge(def.gas)?;

            let inputs = (def.inputs)(op.operand);
            if let Some(min) = def.variadic_min {
                if inputs < min {
                    return Err(VmError::InvalidOperand { opcode: def.name, operand: op.operand.raw() });
                }
            }
            let available = self.stack.len();
            if available < inputs {
                return Err(VmError::StackUnderflow { opcode: def.name, needed: inputs, available });
            }
            let expected = available - inputs + (def.outputs)(op.operand);

            trace!(source = self.source_index, ip = self.ip, depth = self.call_depth, opcode = def.name, "exec");
            (def.run)(self, op.operand)?;

            if self.stack.len() != expected {
                return Err(VmError::ArityMismatch { opcode: def.name, expected, actual: self.stack.len() });
            }
            self.ip += 1;
        }
        Ok(())
    }
}

/// Evaluate one entrypoint of `args.bundle`.
pub fn eval(
    table:  &OpcodeTable,
    limits: Limits,
    args:   EvalArgs<'_>,
    store:  &dyn Store,
    gas:    &mut GasMeter,
    sink:   &mut dyn DebugSink,
) -> Result<EvalOutput, VmError> {
    args.bundle.source(args.source_index)?;
    let limits = limits.clamped();

    let mut state = EvalState {
        stack: Stack::new(limits.max_stack),
        source_index: args.source_index,
        ip: 0,
        call_depth: 0,
        bundle: args.bundle,
        context: args.context,
        store: StoreOverlay::new(store, args.caller),
        table,
        limits,
        gas,
        sink,
    };
    state.run_source()?;

    let EvalState { stack, store, gas, .. } = state;
    let mut stack = stack.into_vec();
    if let Some(n) = args.max_outputs {
        if stack.len() > n {
            stack.drain(..stack.len() - n);
        }
    }
    Ok(EvalOutput { stack, writes: store.into_writes(), gas_used: gas.used })
}

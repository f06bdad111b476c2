//! Expression host: deploy bundles and evaluate their entrypoints.
//!
//! Deploy flow:
//!   1. Run integrity analysis with the declared per-entrypoint min outputs
//!   2. Derive the expression id (blake3 of the canonical encoding)
//!   3. Keep the bundle; redeploying the same bundle returns the same id
//!
//! Evaluate flow:
//!   1. Resolve expression and entrypoint
//!   2. Run the pure interpreter against a read-only view of the store
//!   3. Reject results shorter than the entrypoint's declared min outputs
//!   4. Commit the buffered writes under the caller, then return
//!
//! A failed evaluation commits nothing.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::config::{DebugSinkKind, InterpreterConfig};
use crate::vm::{
    bytecode::{ExpressionBundle, ExpressionId},
    context::Context,
    debug::{DebugSink, NoopSink, TracingSink},
    dispatch::OpcodeTable,
    errors::VmError,
    gas::GasMeter,
    integrity,
    interpreter::{self, EvalArgs},
    state::{MemoryStore, Store},
    word::{Caller, Word},
};

/// A deployed bundle plus the min outputs it was checked against.
#[derive(Debug, Clone)]
pub struct Deployed {
    pub bundle:      ExpressionBundle,
    pub min_outputs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
    pub stack:    Vec<Word>,
    /// Writes committed to the store, in key order.
    pub writes:   Vec<(Word, Word)>,
    pub gas_used: u64,
}

pub struct Interpreter<S: Store = MemoryStore> {
    config:      InterpreterConfig,
    table:       OpcodeTable,
    expressions: HashMap<ExpressionId, Deployed>,
    store:       S,
}

impl Interpreter<MemoryStore> {
    pub fn new(config: InterpreterConfig) -> Self {
        Self::with_store(config, MemoryStore::default())
    }
}

impl<S: Store> Interpreter<S> {
    pub fn with_store(config: InterpreterConfig, store: S) -> Self {
        Self { config, table: OpcodeTable::standard(), expressions: HashMap::new(), store }
    }

    pub fn config(&self) -> &InterpreterConfig { &self.config }

    pub fn store(&self) -> &S { &self.store }

    pub fn store_mut(&mut self) -> &mut S { &mut self.store }

    pub fn get(&self, id: &ExpressionId) -> Option<&Deployed> {
        self.expressions.get(id)
    }

    /// Check and register `bundle`. Its first `min_outputs.len()` sources
    /// become the callable entrypoints.
    pub fn deploy(&mut self, bundle: ExpressionBundle, min_outputs: &[usize]) -> Result<ExpressionId, VmError> {
        let report = integrity::check(&bundle, &self.table, self.config.limits(), min_outputs)?;
        let id = bundle.id();
        if self.expressions.contains_key(&id) {
            debug!(expression = %id, "redeploy of known expression");
            return Ok(id);
        }
        info!(
            expression = %id,
            sources = bundle.sources.len(),
            constants = bundle.constants.len(),
            entrypoints = report.entrypoints.len(),
            "expression deployed"
        );
        self.expressions.insert(id, Deployed { bundle, min_outputs: min_outputs.to_vec() });
        Ok(id)
    }

    pub fn evaluate(
        &mut self,
        id:         &ExpressionId,
        entrypoint: usize,
        context:    &Context,
        caller:     &Caller,
    ) -> Result<EvalResult, VmError> {
        match self.config.observability.debug_sink {
            DebugSinkKind::Tracing => self.evaluate_with_sink(id, entrypoint, context, caller, &mut TracingSink),
            DebugSinkKind::None => self.evaluate_with_sink(id, entrypoint, context, caller, &mut NoopSink),
        }
    }

    pub fn evaluate_with_sink(
        &mut self,
        id:         &ExpressionId,
        entrypoint: usize,
        context:    &Context,
        caller:     &Caller,
        sink:       &mut dyn DebugSink,
    ) -> Result<EvalResult, VmError> {
        let deployed = self
            .expressions
            .get(id)
            .ok_or_else(|| VmError::UnknownExpression(id.to_hex()))?;
        let min = *deployed.min_outputs.get(entrypoint).ok_or(VmError::UnknownEntrypoint(entrypoint))?;

        let mut gas = GasMeter::new(self.config.gas.limit);
        let args = EvalArgs {
            bundle: &deployed.bundle,
            source_index: entrypoint,
            context,
            caller: *caller,
            max_outputs: None,
        };
        let out = match interpreter::eval(&self.table, self.config.limits(), args, &self.store, &mut gas, sink) {
            Ok(out) => out,
            Err(e) => {
                warn!(expression = %id, entrypoint, gas_used = gas.used, error = %e, "evaluation failed");
                return Err(e);
            }
        };
        if out.stack.len() < min {
            return Err(VmError::InsufficientOutputs { entrypoint, min, actual: out.stack.len() });
        }

        self.store.commit(caller, &out.writes)?;
        debug!(
            expression = %id,
            entrypoint,
            outputs = out.stack.len(),
            writes = out.writes.len(),
            gas_used = out.gas_used,
            "evaluation ok"
        );
        Ok(EvalResult { stack: out.stack, writes: out.writes, gas_used: out.gas_used })
    }
}

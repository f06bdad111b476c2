//! Deploy-time integrity analysis.
//!
//! Simulates stack heights through every entrypoint, following control-flow
//! ops into their target sources with the declared input counts. Each
//! (source, input height) pair is walked once. A call site that re-enters a
//! pair still being walked is checked against that pair's final height once
//! the walk completes. Cycles themselves are accepted and left to the runtime
//! depth limit.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::vm::{
    bytecode::{self as op, ExpressionBundle, MemoryRegion, Operand},
    debug::DebugMode,
    dispatch::OpcodeTable,
    interpreter::Limits,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("no entrypoints declared")]
    NoEntrypoints,
    #[error("{entrypoints} entrypoints declared but bundle has {sources} sources")]
    TooManyEntrypoints { entrypoints: usize, sources: usize },
    #[error("source {source_index} op {ip}: unknown opcode {opcode:#06x}")]
    UnknownOpcode { source_index: usize, ip: usize, opcode: u16 },
    #[error("source {source_index} op {ip}: invalid operand {operand:#06x} for {opcode}")]
    InvalidOperand { source_index: usize, ip: usize, opcode: &'static str, operand: u16 },
    #[error("source {source_index} op {ip}: {opcode} needs {needed} words, {available} available")]
    StackUnderflow { source_index: usize, ip: usize, opcode: &'static str, needed: usize, available: usize },
    #[error("source {source_index} op {ip}: stack height {height} exceeds limit {limit}")]
    StackOverflow { source_index: usize, ip: usize, height: usize, limit: usize },
    #[error("source {source_index} op {ip}: constant {index} out of range")]
    ConstantOutOfRange { source_index: usize, ip: usize, index: usize },
    #[error("source {source_index} op {ip}: stack read at {index} past height {height}")]
    StackReadOutOfRange { source_index: usize, ip: usize, index: usize, height: usize },
    #[error("source {source_index} op {ip}: target source {target} out of range")]
    TargetOutOfRange { source_index: usize, ip: usize, target: usize },
    #[error("source {source_index} op {ip}: source {target} leaves {actual} words, {needed} needed")]
    CalleeOutputs { source_index: usize, ip: usize, target: usize, needed: usize, actual: usize },
    #[error("entrypoint {entrypoint} leaves {actual} words, expected at least {min}")]
    MinOutputs { entrypoint: usize, min: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrypointReport {
    pub source_index: usize,
    /// Words left on the stack when the entrypoint finishes.
    pub outputs:      usize,
    /// Highest stack height reached in any frame.
    pub max_stack:    usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub entrypoints: Vec<EntrypointReport>,
}

#[derive(Debug, Clone, Copy)]
struct Summary {
    final_height: usize,
    max_height:   usize,
}

struct Analyzer<'a> {
    bundle:      &'a ExpressionBundle,
    table:       &'a OpcodeTable,
    limits:      Limits,
    memo:        HashMap<(usize, usize), Summary>,
    in_progress: HashSet<(usize, usize)>,
    deferred:    Vec<DeferredCall>,
}

/// A call site into a (source, height) pair that was still being walked.
#[derive(Debug, Clone, Copy)]
struct DeferredCall {
    source_index: usize,
    ip:           usize,
    target:       usize,
    initial:      usize,
    needed:       usize,
}

/// The first `min_outputs.len()` sources are entrypoints, each run from an
/// empty stack and required to leave at least `min_outputs[i]` words.
pub fn check(
    bundle:      &ExpressionBundle,
    table:       &OpcodeTable,
    limits:      Limits,
    min_outputs: &[usize],
) -> Result<IntegrityReport, IntegrityError> {
    if min_outputs.is_empty() {
        return Err(IntegrityError::NoEntrypoints);
    }
    if min_outputs.len() > bundle.sources.len() {
        return Err(IntegrityError::TooManyEntrypoints {
            entrypoints: min_outputs.len(),
            sources: bundle.sources.len(),
        });
    }
    let mut a = Analyzer {
        bundle,
        table,
        limits,
        memo: HashMap::new(),
        in_progress: HashSet::new(),
        deferred: Vec::new(),
    };
    let mut report = IntegrityReport::default();
    for (entrypoint, &min) in min_outputs.iter().enumerate() {
        // Nothing is in progress at the top level, so the summary is known.
        let s = a.analyze(entrypoint, 0)?.unwrap_or(Summary { final_height: 0, max_height: 0 });
        if s.final_height < min {
            return Err(IntegrityError::MinOutputs { entrypoint, min, actual: s.final_height });
        }
        report.entrypoints.push(EntrypointReport {
            source_index: entrypoint,
            outputs: s.final_height,
            max_stack: s.max_height,
        });
    }
    a.resolve_deferred()?;
    Ok(report)
}

impl<'a> Analyzer<'a> {
    /// `None` when `(source_index, initial)` is already being walked further up.
    fn analyze(&mut self, source_index: usize, initial: usize) -> Result<Option<Summary>, IntegrityError> {
        if let Some(s) = self.memo.get(&(source_index, initial)) {
            return Ok(Some(*s));
        }
        if !self.in_progress.insert((source_index, initial)) {
            return Ok(None);
        }
        let result = self.walk(source_index, initial);
        self.in_progress.remove(&(source_index, initial));
        let summary = result?;
        self.memo.insert((source_index, initial), summary);
        Ok(Some(summary))
    }

    fn walk(&mut self, source_index: usize, initial: usize) -> Result<Summary, IntegrityError> {
        let bundle = self.bundle;
        let table = self.table;
        let source = &bundle.sources[source_index];
        let mut height = initial;
        let mut max_height = initial;

        for (ip, o) in source.ops().iter().enumerate() {
            let def = table
                .get(o.opcode)
                .ok_or(IntegrityError::UnknownOpcode { source_index, ip, opcode: o.opcode })?;
            let operand = o.operand;
            let invalid = || IntegrityError::InvalidOperand { source_index, ip, opcode: def.name, operand: operand.raw() };

            let inputs = (def.inputs)(operand);
            if def.variadic_min.is_some_and(|min| inputs < min) {
                return Err(invalid());
            }
            if height < inputs {
                return Err(IntegrityError::StackUnderflow {
                    source_index, ip, opcode: def.name, needed: inputs, available: height,
                });
            }

            match o.opcode {
                op::READ_MEMORY => {
                    let index = operand.memory_index();
                    match operand.memory_region() {
                        MemoryRegion::Constants if index >= bundle.constants.len() => {
                            return Err(IntegrityError::ConstantOutOfRange { source_index, ip, index });
                        }
                        MemoryRegion::Stack if index >= height => {
                            return Err(IntegrityError::StackReadOutOfRange { source_index, ip, index, height });
                        }
                        _ => {}
                    }
                }
                op::DEBUG => {
                    if DebugMode::from_operand(operand.raw()).is_none() {
                        return Err(invalid());
                    }
                }
                op::CALL | op::LOOP_N | op::DO_WHILE => {
                    let callee_max = self.check_callee(source_index, ip, o.opcode, operand)?;
                    max_height = max_height.max(callee_max);
                }
                _ => {}
            }

            height = height - inputs + (def.outputs)(operand);
            if height > self.limits.max_stack {
                return Err(IntegrityError::StackOverflow { source_index, ip, height, limit: self.limits.max_stack });
            }
            max_height = max_height.max(height);
        }
        Ok(Summary { final_height: height, max_height })
    }

    /// Returns the callee's max height (0 when it is part of a cycle).
    fn check_callee(&mut self, source_index: usize, ip: usize, opcode: u16, operand: Operand) -> Result<usize, IntegrityError> {
        let target = operand.low_byte();
        if target >= self.bundle.sources.len() {
            return Err(IntegrityError::TargetOutOfRange { source_index, ip, target });
        }
        let carried = operand.nibble_2();
        let needed = match opcode {
            op::CALL => operand.nibble_3(),
            op::LOOP_N => carried,
            _ => carried + 1,
        };
        match self.analyze(target, carried)? {
            Some(s) if s.final_height < needed => Err(IntegrityError::CalleeOutputs {
                source_index, ip, target, needed, actual: s.final_height,
            }),
            Some(s) => Ok(s.max_height),
            None => {
                self.deferred.push(DeferredCall { source_index, ip, target, initial: carried, needed });
                Ok(0)
            }
        }
    }

    fn resolve_deferred(&self) -> Result<(), IntegrityError> {
        for d in &self.deferred {
            // Absent only when the walk of the pair itself failed, which
            // already returned an error.
            let Some(s) = self.memo.get(&(d.target, d.initial)) else { continue };
            if s.final_height < d.needed {
                return Err(IntegrityError::CalleeOutputs {
                    source_index: d.source_index,
                    ip: d.ip,
                    target: d.target,
                    needed: d.needed,
                    actual: s.final_height,
                });
            }
        }
        Ok(())
    }
}

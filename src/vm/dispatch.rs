//! Opcode dispatch table.
//!
//! A dense table indexed by opcode id. Each entry declares its gas cost and
//! input/output arity as functions of the operand; the interpreter checks
//! inputs before running an op and the resulting stack height after it.

use std::collections::HashSet;

use crate::vm::bytecode::{self as op, Operand, OPCODE_COUNT};
use crate::vm::errors::VmError;
use crate::vm::interpreter::EvalState;
use crate::vm::opcodes::{flow, general, logic, math, store};

pub type ArityFn = fn(Operand) -> usize;
pub type OpFn = fn(&mut EvalState<'_>, Operand) -> Result<(), VmError>;

// ── Gas costs ──────────────────────────────────────────────────────────────
pub const GAS_DEBUG: u64    = 0;
pub const GAS_VERYLOW: u64  = 3;    // memory reads, comparisons, logic
pub const GAS_LOW: u64      = 5;    // add, sub, mul, div, mod
pub const GAS_EXP: u64      = 10;
pub const GAS_HASH: u64     = 30;
pub const GAS_FLOW: u64     = 8;    // per control-flow op; each frame also pays gas::GAS_FRAME
pub const GAS_GET: u64      = 100;
pub const GAS_SET: u64      = 2_900;

#[derive(Debug, Clone, Copy)]
pub struct OpcodeDef {
    pub id:      u16,
    pub name:    &'static str,
    pub gas:     u64,
    pub inputs:  ArityFn,
    pub outputs: ArityFn,
    /// Lowest operand-encoded input count a variadic op accepts.
    pub variadic_min: Option<usize>,
    pub run:     OpFn,
}

fn zero(_: Operand) -> usize { 0 }
fn one(_: Operand) -> usize { 1 }
fn two(_: Operand) -> usize { 2 }
fn three(_: Operand) -> usize { 3 }
fn operand_count(o: Operand) -> usize { o.count() }
fn flow_inputs(o: Operand) -> usize { o.nibble_2() }
fn call_outputs(o: Operand) -> usize { o.nibble_3() }
fn do_while_inputs(o: Operand) -> usize { o.nibble_2() + 1 }

fn fixed(id: u16, name: &'static str, gas: u64, inputs: ArityFn, outputs: ArityFn, run: OpFn) -> OpcodeDef {
    OpcodeDef { id, name, gas, inputs, outputs, variadic_min: None, run }
}

fn variadic(id: u16, name: &'static str, gas: u64, min: usize, run: OpFn) -> OpcodeDef {
    OpcodeDef { id, name, gas, inputs: operand_count, outputs: one, variadic_min: Some(min), run }
}

#[derive(Debug, Clone)]
pub struct OpcodeTable {
    defs: Vec<OpcodeDef>,
}

impl OpcodeTable {
    /// The full opcode set, indexed by id.
    pub fn standard() -> Self {
        let defs = vec![
            fixed(op::READ_MEMORY, "read-memory", GAS_VERYLOW, zero, one, general::read_memory),
            fixed(op::CONTEXT, "context", GAS_VERYLOW, zero, one, general::context),
            fixed(op::CALL, "call", GAS_FLOW, flow_inputs, call_outputs, flow::call),
            fixed(op::LOOP_N, "loop-n", GAS_FLOW, flow_inputs, flow_inputs, flow::loop_n),
            fixed(op::DO_WHILE, "do-while", GAS_FLOW, do_while_inputs, flow_inputs, flow::do_while),
            fixed(op::DEBUG, "debug", GAS_DEBUG, zero, zero, general::debug),
            fixed(op::ENSURE, "ensure", GAS_VERYLOW, one, zero, general::ensure),
            fixed(op::SET, "set", GAS_SET, two, zero, store::set),
            fixed(op::GET, "get", GAS_GET, one, one, store::get),
            variadic(op::HASH, "hash", GAS_HASH, 0, general::hash),
            variadic(op::ADD, "add", GAS_LOW, 2, math::add),
            variadic(op::SUB, "sub", GAS_LOW, 2, math::sub),
            variadic(op::MUL, "mul", GAS_LOW, 2, math::mul),
            variadic(op::DIV, "div", GAS_LOW, 2, math::div),
            variadic(op::MOD, "mod", GAS_LOW, 2, math::modulo),
            variadic(op::EXP, "exp", GAS_EXP, 2, math::exp),
            variadic(op::MIN, "min", GAS_VERYLOW, 2, math::min),
            variadic(op::MAX, "max", GAS_VERYLOW, 2, math::max),
            variadic(op::SATURATING_ADD, "saturating-add", GAS_LOW, 2, math::saturating_add),
            variadic(op::SATURATING_SUB, "saturating-sub", GAS_LOW, 2, math::saturating_sub),
            variadic(op::SATURATING_MUL, "saturating-mul", GAS_LOW, 2, math::saturating_mul),
            fixed(op::LESS_THAN, "less-than", GAS_VERYLOW, two, one, logic::less_than),
            fixed(op::GREATER_THAN, "greater-than", GAS_VERYLOW, two, one, logic::greater_than),
            fixed(op::EQUAL_TO, "equal-to", GAS_VERYLOW, two, one, logic::equal_to),
            fixed(op::IS_ZERO, "is-zero", GAS_VERYLOW, one, one, logic::is_zero),
            fixed(op::LESS_THAN_OR_EQUAL_TO, "less-than-or-equal-to", GAS_VERYLOW, two, one, logic::less_than_or_equal_to),
            fixed(op::GREATER_THAN_OR_EQUAL_TO, "greater-than-or-equal-to", GAS_VERYLOW, two, one, logic::greater_than_or_equal_to),
            variadic(op::EVERY, "every", GAS_VERYLOW, 1, logic::every),
            variadic(op::ANY, "any", GAS_VERYLOW, 1, logic::any),
            fixed(op::EAGER_IF, "eager-if", GAS_VERYLOW, three, one, logic::eager_if),
        ];
        let table = Self { defs };
        debug_assert!(table.validate().is_ok(), "standard opcode table is inconsistent");
        table
    }

    /// Ids must be dense and in order; names must be unique.
    pub fn validate(&self) -> Result<(), String> {
        if self.defs.len() != OPCODE_COUNT {
            return Err(format!("expected {OPCODE_COUNT} opcodes, got {}", self.defs.len()));
        }
        let mut names = HashSet::new();
        for (i, def) in self.defs.iter().enumerate() {
            if def.id as usize != i {
                return Err(format!("opcode {} registered at slot {i}", def.name));
            }
            if !names.insert(def.name) {
                return Err(format!("duplicate opcode name {}", def.name));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: u16) -> Option<&OpcodeDef> {
        self.defs.get(id as usize)
    }

    pub fn lookup(&self, id: u16) -> Result<&OpcodeDef, VmError> {
        self.get(id).ok_or(VmError::UnknownOpcode(id))
    }

    pub fn by_name(&self, name: &str) -> Option<&OpcodeDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize { self.defs.len() }

    pub fn is_empty(&self) -> bool { self.defs.is_empty() }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        Self::standard()
    }
}

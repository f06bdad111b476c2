//! IONA expression bytecode.
//!
//! An op is 4 bytes big-endian: a u16 opcode id followed by a u16 operand.
//! A source is a flat sequence of ops; a bundle is a set of sources plus the
//! constants table they index into.

use serde::{Deserialize, Serialize};

use crate::vm::debug::DebugMode;
use crate::vm::errors::VmError;
use crate::vm::word::{word_to_bytes, Word};

// ── Memory / environment ───────────────────────────────────────────────────
pub const READ_MEMORY: u16 = 0;
pub const CONTEXT:     u16 = 1;

// ── Control flow ───────────────────────────────────────────────────────────
pub const CALL:        u16 = 2;
pub const LOOP_N:      u16 = 3;
pub const DO_WHILE:    u16 = 4;

// ── Introspection / assertions ─────────────────────────────────────────────
pub const DEBUG:       u16 = 5;
pub const ENSURE:      u16 = 6;

// ── Store ──────────────────────────────────────────────────────────────────
pub const SET:         u16 = 7;
pub const GET:         u16 = 8;
pub const HASH:        u16 = 9;

// ── Arithmetic ─────────────────────────────────────────────────────────────
pub const ADD:         u16 = 10;
pub const SUB:         u16 = 11;
pub const MUL:         u16 = 12;
pub const DIV:         u16 = 13;
pub const MOD:         u16 = 14;
pub const EXP:         u16 = 15;
pub const MIN:         u16 = 16;
pub const MAX:         u16 = 17;
pub const SATURATING_ADD: u16 = 18;
pub const SATURATING_SUB: u16 = 19;
pub const SATURATING_MUL: u16 = 20;

// ── Comparison / logic ─────────────────────────────────────────────────────
pub const LESS_THAN:    u16 = 21;
pub const GREATER_THAN: u16 = 22;
pub const EQUAL_TO:     u16 = 23;
pub const IS_ZERO:      u16 = 24;
pub const LESS_THAN_OR_EQUAL_TO:    u16 = 25;
pub const GREATER_THAN_OR_EQUAL_TO: u16 = 26;
pub const EVERY:        u16 = 27;
pub const ANY:          u16 = 28;
pub const EAGER_IF:     u16 = 29;

pub const OPCODE_COUNT: usize = 30;

pub const OP_BYTES: usize = 4;

/// Opcode-specific 16-bit argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand(pub u16);

impl Operand {
    pub fn raw(self) -> u16 { self.0 }

    /// Low byte: source index for control flow, column for `context`.
    pub fn low_byte(self) -> usize { (self.0 & 0xFF) as usize }

    pub fn high_byte(self) -> usize { (self.0 >> 8) as usize }

    /// Bits 8..12: input count for control flow.
    pub fn nibble_2(self) -> usize { ((self.0 >> 8) & 0x0F) as usize }

    /// Bits 12..16: output count for `call`, iteration count for `loop-n`.
    pub fn nibble_3(self) -> usize { (self.0 >> 12) as usize }

    pub fn count(self) -> usize { self.0 as usize }
}

/// Region addressed by `read-memory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryRegion {
    Stack,
    Constants,
}

impl Operand {
    pub fn memory_region(self) -> MemoryRegion {
        if self.0 & 1 == 0 { MemoryRegion::Stack } else { MemoryRegion::Constants }
    }

    pub fn memory_index(self) -> usize { (self.0 >> 1) as usize }
}

/// Largest index a `read-memory` operand can address.
pub const MAX_MEMORY_INDEX: u16 = 0x7FFF;
/// Largest input/output/iteration count a flow operand nibble holds.
pub const MAX_FLOW_COUNT: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Op {
    pub opcode:  u16,
    pub operand: Operand,
}

impl Op {
    pub const fn new(opcode: u16, operand: u16) -> Self {
        Self { opcode, operand: Operand(operand) }
    }

    /// `index` must fit the 15-bit memory index field.
    pub fn constant(index: u16) -> Self {
        debug_assert!(index <= MAX_MEMORY_INDEX, "constant index {index} exceeds {MAX_MEMORY_INDEX}");
        Self::new(READ_MEMORY, (index << 1) | 1)
    }

    /// Copy the word at absolute `index` of the current frame.
    pub fn stack(index: u16) -> Self {
        debug_assert!(index <= MAX_MEMORY_INDEX, "stack index {index} exceeds {MAX_MEMORY_INDEX}");
        Self::new(READ_MEMORY, index << 1)
    }

    pub fn context(row: u8, column: u8) -> Self {
        Self::new(CONTEXT, ((row as u16) << 8) | column as u16)
    }

    /// Counts must fit 4 bits.
    pub fn call(source: u8, inputs: u8, outputs: u8) -> Self {
        Self::new(CALL, pack_flow(source, inputs, outputs))
    }

    pub fn loop_n(iterations: u8, source: u8, inputs: u8) -> Self {
        Self::new(LOOP_N, pack_flow(source, inputs, iterations))
    }

    pub fn do_while(source: u8, inputs: u8) -> Self {
        Self::new(DO_WHILE, pack_flow(source, inputs, 0))
    }

    pub fn debug(mode: DebugMode) -> Self {
        Self::new(DEBUG, mode as u16)
    }

    pub fn ensure(code: u16) -> Self {
        Self::new(ENSURE, code)
    }

    /// Variadic ops take their input count as operand.
    pub fn variadic(opcode: u16, inputs: u16) -> Self {
        Self::new(opcode, inputs)
    }

    pub fn simple(opcode: u16) -> Self {
        Self::new(opcode, 0)
    }

    pub fn encode(&self) -> [u8; OP_BYTES] {
        let o = self.opcode.to_be_bytes();
        let a = self.operand.0.to_be_bytes();
        [o[0], o[1], a[0], a[1]]
    }
}

fn pack_flow(source: u8, low: u8, high: u8) -> u16 {
    debug_assert!(low <= MAX_FLOW_COUNT && high <= MAX_FLOW_COUNT, "flow counts {low}/{high} exceed {MAX_FLOW_COUNT}");
    ((high as u16 & 0x0F) << 12) | ((low as u16 & 0x0F) << 8) | source as u16
}

/// One callable entrypoint. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    ops: Vec<Op>,
}

impl Source {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, VmError> {
        if bytes.len() % OP_BYTES != 0 {
            return Err(VmError::MalformedBytecode(format!(
                "source length {} is not a multiple of {OP_BYTES}",
                bytes.len()
            )));
        }
        let ops = bytes
            .chunks_exact(OP_BYTES)
            .map(|c| Op::new(u16::from_be_bytes([c[0], c[1]]), u16::from_be_bytes([c[2], c[3]])))
            .collect();
        Ok(Self { ops })
    }

    pub fn encode(&self) -> Vec<u8> {
        self.ops.iter().flat_map(|op| op.encode()).collect()
    }

    pub fn ops(&self) -> &[Op] { &self.ops }

    pub fn len(&self) -> usize { self.ops.len() }

    pub fn is_empty(&self) -> bool { self.ops.is_empty() }
}

/// Sources plus constants: the unit of deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionBundle {
    pub sources:   Vec<Source>,
    pub constants: Vec<Word>,
}

/// blake3 of the bundle's canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpressionId(pub [u8; 32]);

impl ExpressionId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl ExpressionBundle {
    pub fn new(sources: Vec<Source>, constants: Vec<Word>) -> Self {
        Self { sources, constants }
    }

    pub fn source(&self, index: usize) -> Result<&Source, VmError> {
        self.sources.get(index).ok_or(VmError::SourceOutOfRange(index))
    }

    pub fn constant(&self, index: usize) -> Result<Word, VmError> {
        self.constants.get(index).copied().ok_or(VmError::ConstantOutOfRange(index))
    }

    /// Length-prefixed sources, then length-prefixed 32-byte constants.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.sources.len() as u32).to_be_bytes());
        for s in &self.sources {
            let bytes = s.encode();
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(&bytes);
        }
        out.extend_from_slice(&(self.constants.len() as u32).to_be_bytes());
        for c in &self.constants {
            out.extend_from_slice(&word_to_bytes(c));
        }
        out
    }

    pub fn id(&self) -> ExpressionId {
        ExpressionId(*blake3::hash(&self.encode()).as_bytes())
    }
}

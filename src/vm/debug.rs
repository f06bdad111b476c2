//! Read-only debug tap.
//!
//! A `debug` op hands a snapshot to the host's sink and leaves the stack,
//! store and gas meter untouched.

use crate::vm::word::{Word, U256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DebugMode {
    Stack     = 0,
    Constants = 1,
    Context   = 2,
    /// `[source, ip, depth, stack height, ..stack]` packed into words.
    State     = 3,
}

impl DebugMode {
    pub fn from_operand(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Stack),
            1 => Some(Self::Constants),
            2 => Some(Self::Context),
            3 => Some(Self::State),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEvent {
    pub mode:         DebugMode,
    pub source_index: usize,
    pub ip:           usize,
    pub call_depth:   usize,
    pub words:        Vec<Word>,
}

impl DebugEvent {
    pub fn pack_state(source_index: usize, ip: usize, call_depth: usize, stack: &[Word]) -> Vec<Word> {
        let mut words = Vec::with_capacity(stack.len() + 4);
        words.push(U256::from(source_index as u64));
        words.push(U256::from(ip as u64));
        words.push(U256::from(call_depth as u64));
        words.push(U256::from(stack.len() as u64));
        words.extend_from_slice(stack);
        words
    }
}

/// Host-side observability channel for `debug` ops.
pub trait DebugSink {
    fn emit(&mut self, event: DebugEvent);
}

#[derive(Debug, Default)]
pub struct NoopSink;

impl DebugSink for NoopSink {
    fn emit(&mut self, _event: DebugEvent) {}
}

/// Logs every event at debug level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn emit(&mut self, event: DebugEvent) {
        let words: Vec<String> = event.words.iter().map(|w| format!("{w:#x}")).collect();
        tracing::debug!(
            mode = ?event.mode,
            source = event.source_index,
            ip = event.ip,
            depth = event.call_depth,
            words = %words.join(","),
            "expr debug"
        );
    }
}

/// Keeps every event; used by tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<DebugEvent>,
}

impl DebugSink for RecordingSink {
    fn emit(&mut self, event: DebugEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_operand() {
        assert_eq!(DebugMode::from_operand(0), Some(DebugMode::Stack));
        assert_eq!(DebugMode::from_operand(3), Some(DebugMode::State));
        assert_eq!(DebugMode::from_operand(4), None);
    }

    #[test]
    fn test_pack_state_layout() {
        let packed = DebugEvent::pack_state(2, 5, 1, &[U256::from(9u64)]);
        assert_eq!(
            packed,
            vec![U256::from(2u64), U256::from(5u64), U256::from(1u64), U256::from(1u64), U256::from(9u64)]
        );
    }
}

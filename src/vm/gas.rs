//! Gas accounting for one evaluation.
//!
//! The host sizes the budget; the interpreter charges each op its table cost
//! and each nested frame (call, loop-n iteration, do-while iteration) a base
//! cost plus one unit per word copied in. Without the frame charge a body of
//! zero-cost ops would loop for free. `do-while` has no static bound, so this
//! budget is what guarantees it terminates.

use crate::vm::errors::VmError;

/// Base cost of opening a nested frame.
pub const GAS_FRAME: u64 = 2;
/// Per word seeded into a nested frame.
pub const GAS_FRAME_WORD: u64 = 1;

#[derive(Debug, Clone, Copy)]
pub struct GasMeter {
    pub limit: u64,
    pub used:  u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charge `amount`. On exhaustion `used` is pinned at `limit` so the
    /// reported usage of a failed evaluation is the whole budget.
    pub fn charge(&mut self, amount: u64) -> Result<(), VmError> {
        match self.used.checked_add(amount) {
            Some(next) if next <= self.limit => {
                self.used = next;
                Ok(())
            }
            _ => {
                self.used = self.limit;
                Err(VmError::OutOfGas)
            }
        }
    }

    /// Charge for a nested frame seeded with `words` inputs.
    pub fn charge_frame(&mut self, words: usize) -> Result<(), VmError> {
        let per_word = GAS_FRAME_WORD.saturating_mul(words as u64);
        self.charge(GAS_FRAME.saturating_add(per_word))
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used == self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_cost_scales_with_inputs() {
        let mut g = GasMeter::new(1_000);
        g.charge_frame(0).unwrap();
        assert_eq!(g.used, GAS_FRAME);
        g.charge_frame(3).unwrap();
        assert_eq!(g.used, 2 * GAS_FRAME + 3 * GAS_FRAME_WORD);
    }

    #[test]
    fn test_failed_charge_reports_full_budget() {
        let mut g = GasMeter::new(10);
        g.charge(4).unwrap();
        assert_eq!(g.charge_frame(8), Err(VmError::OutOfGas));
        assert_eq!(g.used, 10);
        assert!(g.is_exhausted());
        assert_eq!(g.remaining(), 0);
    }

    #[test]
    fn test_debug_cost_allowed_after_exhaustion() {
        let mut g = GasMeter::new(5);
        g.charge(5).unwrap();
        assert!(g.is_exhausted());
        // debug ops are table cost zero
        assert_eq!(g.charge(0), Ok(()));
        assert_eq!(g.charge(1), Err(VmError::OutOfGas));
    }

    #[test]
    fn test_huge_charge_does_not_wrap() {
        let mut g = GasMeter::new(u64::MAX);
        g.charge(u64::MAX - 1).unwrap();
        assert_eq!(g.charge(u64::MAX), Err(VmError::OutOfGas));
        assert_eq!(g.used, u64::MAX);
    }
}

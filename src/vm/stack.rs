//! Bounded word stack. Index 0 is the bottom (first pushed word).

use crate::vm::errors::VmError;
use crate::vm::word::Word;

#[derive(Debug, Clone)]
pub struct Stack {
    words:    Vec<Word>,
    capacity: usize,
}

impl Stack {
    pub fn new(capacity: usize) -> Self {
        Self { words: Vec::with_capacity(capacity.min(64)), capacity }
    }

    /// A fresh frame holding `words`; fails if they already exceed `capacity`.
    pub fn seeded(words: Vec<Word>, capacity: usize) -> Result<Self, VmError> {
        if words.len() > capacity {
            return Err(VmError::StackOverflow(capacity));
        }
        Ok(Self { words, capacity })
    }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    pub fn capacity(&self) -> usize { self.capacity }

    pub fn push(&mut self, v: Word) -> Result<(), VmError> {
        if self.words.len() >= self.capacity {
            return Err(VmError::StackOverflow(self.capacity));
        }
        self.words.push(v);
        Ok(())
    }

    pub fn extend(&mut self, vs: impl IntoIterator<Item = Word>) -> Result<(), VmError> {
        for v in vs {
            self.push(v)?;
        }
        Ok(())
    }

    pub fn pop(&mut self, opcode: &'static str) -> Result<Word, VmError> {
        self.words.pop().ok_or(VmError::StackUnderflow { opcode, needed: 1, available: 0 })
    }

    /// Pop the top `n` words, returned in push order.
    pub fn pop_n(&mut self, opcode: &'static str, n: usize) -> Result<Vec<Word>, VmError> {
        let available = self.words.len();
        if available < n {
            return Err(VmError::StackUnderflow { opcode, needed: n, available });
        }
        Ok(self.words.split_off(available - n))
    }

    /// Copy of the top `n` words, in push order.
    pub fn top_n(&self, opcode: &'static str, n: usize) -> Result<Vec<Word>, VmError> {
        let available = self.words.len();
        if available < n {
            return Err(VmError::StackUnderflow { opcode, needed: n, available });
        }
        Ok(self.words[available - n..].to_vec())
    }

    pub fn get(&self, index: usize) -> Result<Word, VmError> {
        self.words
            .get(index)
            .copied()
            .ok_or(VmError::StackReadOutOfRange { index, height: self.words.len() })
    }

    pub fn as_slice(&self) -> &[Word] { &self.words }

    pub fn into_vec(self) -> Vec<Word> { self.words }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::word::U256;

    fn w(v: u64) -> Word { U256::from(v) }

    #[test]
    fn test_push_past_capacity_overflows() {
        let mut s = Stack::new(2);
        s.push(w(1)).unwrap();
        s.push(w(2)).unwrap();
        assert_eq!(s.push(w(3)), Err(VmError::StackOverflow(2)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut s = Stack::new(4);
        assert!(matches!(s.pop("test"), Err(VmError::StackUnderflow { needed: 1, available: 0, .. })));
    }

    #[test]
    fn test_pop_n_keeps_push_order() {
        let mut s = Stack::new(8);
        s.extend([w(1), w(2), w(3)]).unwrap();
        assert_eq!(s.pop_n("test", 2).unwrap(), vec![w(2), w(3)]);
        assert_eq!(s.as_slice(), &[w(1)]);
        assert!(s.pop_n("test", 2).is_err());
    }

    #[test]
    fn test_seeded_respects_capacity() {
        assert!(Stack::seeded(vec![w(1), w(2)], 1).is_err());
        let s = Stack::seeded(vec![w(1)], 1).unwrap();
        assert_eq!(s.get(0).unwrap(), w(1));
        assert!(s.get(1).is_err());
    }
}

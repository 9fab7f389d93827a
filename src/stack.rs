use crate::error::{LispError, LispResult};
use crate::value::ObjId;

/// The operand stack. Used by the reader to assemble pairs and by the
/// evaluator to pass arguments. Every entry is a GC root.
#[derive(Debug, Default)]
pub struct OperandStack {
    entries: Vec<ObjId>,
}

impl OperandStack {
    pub fn new() -> Self {
        OperandStack {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, id: ObjId) {
        self.entries.push(id);
    }

    pub fn pop(&mut self) -> LispResult<ObjId> {
        self.entries.pop().ok_or(LispError::StackUnderflow)
    }

    /// Pop exactly `n` entries and return the last one popped.
    /// Used to drain arguments a builtin refuses to use.
    pub fn pop_n_discard(&mut self, n: usize) -> LispResult<Option<ObjId>> {
        let mut last = None;
        for _ in 0..n {
            last = Some(self.pop()?);
        }
        Ok(last)
    }

    /// Pop `n` entries, returned in pop order (last pushed first).
    pub fn pop_n(&mut self, n: usize) -> LispResult<Vec<ObjId>> {
        if n > self.entries.len() {
            return Err(LispError::StackUnderflow);
        }
        let at = self.entries.len() - n;
        let mut popped = self.entries.split_off(at);
        popped.reverse();
        Ok(popped)
    }

    /// Entry `depth` places below the top (0 is the top).
    pub fn peek(&self, depth: usize) -> LispResult<ObjId> {
        self.entries
            .len()
            .checked_sub(depth + 1)
            .map(|i| self.entries[i])
            .ok_or(LispError::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_is_lifo() {
        let mut s = OperandStack::new();
        s.push(ObjId(1));
        s.push(ObjId(2));
        assert_eq!(s.pop(), Ok(ObjId(2)));
        assert_eq!(s.pop(), Ok(ObjId(1)));
    }

    #[test]
    fn pop_on_empty_underflows() {
        let mut s = OperandStack::new();
        assert_eq!(s.pop(), Err(LispError::StackUnderflow));
    }

    #[test]
    fn pop_n_discard_returns_last_popped() {
        let mut s = OperandStack::new();
        for i in 0..4 {
            s.push(ObjId(i));
        }
        assert_eq!(s.pop_n_discard(3), Ok(Some(ObjId(1))));
        assert_eq!(s.len(), 1);
        assert_eq!(s.pop_n_discard(0), Ok(None));
        assert_eq!(s.pop_n_discard(2), Err(LispError::StackUnderflow));
    }

    #[test]
    fn pop_n_keeps_pop_order() {
        let mut s = OperandStack::new();
        for i in 0..3 {
            s.push(ObjId(i));
        }
        assert_eq!(s.pop_n(2), Ok(vec![ObjId(2), ObjId(1)]));
        assert_eq!(s.pop_n(2), Err(LispError::StackUnderflow));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn peek_counts_from_the_top() {
        let mut s = OperandStack::new();
        s.push(ObjId(7));
        s.push(ObjId(8));
        assert_eq!(s.peek(0), Ok(ObjId(8)));
        assert_eq!(s.peek(1), Ok(ObjId(7)));
        assert_eq!(s.peek(2), Err(LispError::StackUnderflow));
    }
}

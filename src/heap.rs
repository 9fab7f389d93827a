use log::trace;

use crate::error::{LispError, LispResult};
use crate::value::{ObjId, Object};

/// Default number of slots in the arena.
pub const DEFAULT_CAPACITY: usize = 256;

/// Live-object count that triggers the first collection.
pub const DEFAULT_GC_THRESHOLD: usize = 8;

/// A single occupied arena slot.
#[derive(Debug)]
pub struct Slot {
    pub object: Object,
    pub mark: bool,
}

/// The object arena. All objects are allocated here.
/// ObjId is an index into `slots`; the table is never resized.
pub struct Heap {
    slots: Vec<Option<Slot>>,
    /// Index of the most recently allocated slot; the next search starts
    /// just after it.
    last: Option<usize>,
    live: usize,
    initial_threshold: usize,
    /// GC threshold: collect when the live count reaches this.
    gc_threshold: usize,
}

impl Heap {
    pub fn new(capacity: usize, initial_threshold: usize) -> Self {
        let capacity = capacity.max(1);
        let initial_threshold = initial_threshold.clamp(1, capacity);
        Heap {
            slots: (0..capacity).map(|_| None).collect(),
            last: None,
            live: 0,
            initial_threshold,
            gc_threshold: initial_threshold,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn gc_threshold(&self) -> usize {
        self.gc_threshold
    }

    pub fn is_full(&self) -> bool {
        self.live >= self.capacity()
    }

    /// Returns true if the next allocation should be preceded by a GC cycle.
    pub fn should_gc(&self) -> bool {
        self.live >= self.gc_threshold || self.is_full()
    }

    /// Linear scan for an empty slot, starting after the last allocated
    /// slot and wrapping around.
    fn find_free_slot(&self) -> Option<usize> {
        let cap = self.capacity();
        let start = self.last.map_or(0, |i| i + 1);
        (0..cap)
            .map(|step| (start + step) % cap)
            .find(|&i| self.slots[i].is_none())
    }

    /// Place an object in a free slot. Does not collect; the machine decides
    /// when a collection must run first.
    pub fn place(&mut self, object: Object) -> LispResult<ObjId> {
        let index = self.find_free_slot().ok_or(LispError::OutOfMemory)?;
        trace!("alloc {:?} in slot {}", object.kind(), index);
        self.slots[index] = Some(Slot {
            object,
            mark: false,
        });
        self.last = Some(index);
        self.live += 1;
        Ok(ObjId(index as u32))
    }

    /// Empty a slot, returning the object it held.
    pub fn release(&mut self, id: ObjId) -> LispResult<Object> {
        let slot = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(LispError::DoubleFree(id))?;
        trace!("free slot {}", id.0);
        self.live -= 1;
        Ok(slot.object)
    }

    #[inline]
    pub fn get(&self, id: ObjId) -> Option<&Object> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map(|slot| &slot.object)
    }

    pub fn is_occupied(&self, id: ObjId) -> bool {
        self.get(id).is_some()
    }

    // === GC methods ===

    /// Clear all mark bits.
    pub fn clear_marks(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.mark = false;
        }
    }

    /// Mark an object as reachable and queue it so its children get marked.
    pub fn mark_value(&mut self, id: ObjId, worklist: &mut Vec<ObjId>) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            if !slot.mark {
                slot.mark = true;
                worklist.push(id);
            }
        }
    }

    /// Drain the worklist, marking the car and cdr of every queued pair.
    /// The mark bit doubles as the visited set, so cycles terminate.
    pub fn process_worklist(&mut self, worklist: &mut Vec<ObjId>) {
        while let Some(id) = worklist.pop() {
            let children = self.get(id).and_then(Object::children);
            if let Some((car, cdr)) = children {
                self.mark_value(car, worklist);
                self.mark_value(cdr, worklist);
            }
        }
    }

    pub fn is_marked(&self, id: ObjId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(slot)) if slot.mark)
    }

    pub fn marked_count(&self) -> usize {
        self.slots.iter().flatten().filter(|s| s.mark).count()
    }

    /// Occupied slots left unmarked by the mark phase.
    pub fn unmarked(&self) -> Vec<ObjId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot, Some(s) if !s.mark))
            .map(|(i, _)| ObjId(i as u32))
            .collect()
    }

    /// Next threshold is twice the surviving population, never below the
    /// initial threshold and never above capacity.
    pub fn adjust_gc_threshold(&mut self) {
        self.gc_threshold = (self.live * 2).clamp(self.initial_threshold, self.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Object {
        Object::Integer(n)
    }

    #[test]
    fn allocation_advances_the_cursor() {
        let mut heap = Heap::new(4, 4);
        assert_eq!(heap.place(int(0)), Ok(ObjId(0)));
        assert_eq!(heap.place(int(1)), Ok(ObjId(1)));
        heap.release(ObjId(0)).unwrap();
        // slot 0 is free again, but the scan resumes after slot 1
        assert_eq!(heap.place(int(2)), Ok(ObjId(2)));
        assert_eq!(heap.place(int(3)), Ok(ObjId(3)));
        assert_eq!(heap.place(int(4)), Ok(ObjId(0)));
        assert_eq!(heap.live_count(), 4);
    }

    #[test]
    fn full_table_is_out_of_memory() {
        let mut heap = Heap::new(2, 2);
        heap.place(int(0)).unwrap();
        heap.place(int(1)).unwrap();
        assert!(heap.is_full());
        assert_eq!(heap.place(int(2)), Err(LispError::OutOfMemory));
        assert_eq!(heap.live_count(), 2);
    }

    #[test]
    fn release_twice_is_double_free() {
        let mut heap = Heap::new(4, 4);
        let id = heap.place(int(9)).unwrap();
        assert!(matches!(heap.release(id), Ok(Object::Integer(9))));
        assert!(matches!(heap.release(id), Err(LispError::DoubleFree(x)) if x == id));
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn marking_follows_pairs_and_survives_cycles() {
        let mut heap = Heap::new(8, 8);
        let a = heap.place(int(1)).unwrap();
        let b = heap.place(int(2)).unwrap();
        let pair = heap.place(Object::Cons { car: a, cdr: b }).unwrap();
        let loose = heap.place(int(3)).unwrap();
        // a self-referential pair
        let cyc = heap
            .place(Object::Cons {
                car: ObjId(4),
                cdr: ObjId(4),
            })
            .unwrap();
        assert_eq!(cyc, ObjId(4));

        let mut worklist = Vec::new();
        heap.mark_value(pair, &mut worklist);
        heap.mark_value(cyc, &mut worklist);
        heap.process_worklist(&mut worklist);

        assert!(heap.is_marked(a));
        assert!(heap.is_marked(b));
        assert!(heap.is_marked(cyc));
        assert_eq!(heap.unmarked(), vec![loose]);
        assert_eq!(heap.marked_count(), 4);

        heap.clear_marks();
        assert_eq!(heap.marked_count(), 0);
    }

    #[test]
    fn threshold_tracks_survivors() {
        let mut heap = Heap::new(16, 4);
        for n in 0..6 {
            heap.place(int(n)).unwrap();
        }
        heap.adjust_gc_threshold();
        assert_eq!(heap.gc_threshold(), 12);
        for n in 0..6 {
            heap.place(int(n)).unwrap();
        }
        heap.adjust_gc_threshold();
        assert_eq!(heap.gc_threshold(), 16);
    }
}

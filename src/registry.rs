use std::collections::HashMap;

use crate::alloc::{RangeAllocator, VertexRange};
use crate::error::TerrainError;
use crate::types::{MAX_CHUNKS, MAX_VERTICES_PER_CHUNK};

/// One live chunk section: identity, current mega-buffer range, world offset.
#[derive(Copy, Clone, Debug)]
pub struct ChunkSlot {
    pub chunk_index: i32,
    pub range: VertexRange,
    pub offset: [f32; 3],
}

/// What a successful `set` decided, for the device-side mirror to act on.
#[derive(Copy, Clone, Debug)]
pub struct SetOutcome {
    /// Dense slot index, stable while the identity stays live. Doubles as the
    /// ChunkInfo storage index and the draw's first_instance.
    pub slot: usize,
    pub range: VertexRange,
    /// New capacity in vertices when the arena had to grow for this set.
    pub grown_capacity: Option<u32>,
}

/// Authoritative chunk-identity -> range mapping for one render type.
///
/// Slots are dense and registration-ordered; identities are only ever removed
/// wholesale by `clear`, so slot indices of live chunks never move. A `set`
/// on an existing identity allocates the replacement range first and frees
/// the old one after, so an in-flight frame never sees a freed range.
#[derive(Debug)]
pub struct ChunkStore {
    allocator: RangeAllocator,
    slots: Vec<ChunkSlot>,
    by_id: HashMap<i32, usize>,
    max_capacity: u32,
}

impl ChunkStore {
    pub fn new(initial_capacity: u32, max_capacity: u32) -> Self {
        Self {
            allocator: RangeAllocator::new(initial_capacity),
            slots: Vec::new(),
            by_id: HashMap::new(),
            max_capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> u32 {
        self.allocator.capacity()
    }

    /// Live chunks in registration order. No sorting, no culling; visibility
    /// was decided upstream by the mesher's feed.
    pub fn slots(&self) -> &[ChunkSlot] {
        &self.slots
    }

    pub fn set(
        &mut self,
        chunk_index: i32,
        vertex_count: u32,
        offset: [f32; 3],
    ) -> Result<SetOutcome, TerrainError> {
        if vertex_count % 4 != 0 {
            return Err(TerrainError::NotQuadAligned(vertex_count));
        }
        if vertex_count > MAX_VERTICES_PER_CHUNK {
            return Err(TerrainError::ChunkTooLarge(vertex_count));
        }
        let existing = self.by_id.get(&chunk_index).copied();
        if existing.is_none() && self.slots.len() >= MAX_CHUNKS {
            return Err(TerrainError::TooManyChunks);
        }

        // A same-size rebuild of a live identity overwrites its range in
        // place, so a fully occupied arena can still take mesh updates.
        if let Some(slot) = existing {
            if self.slots[slot].range.count == vertex_count {
                let range = self.slots[slot].range;
                self.slots[slot] = ChunkSlot {
                    chunk_index,
                    range,
                    offset,
                };
                return Ok(SetOutcome {
                    slot,
                    range,
                    grown_capacity: None,
                });
            }
        }

        // Allocate the replacement before touching the old range; on failure
        // the previous entry stays valid and rendering continues on it. The
        // final capacity is decided up front so a rejected request never
        // leaves the arena grown.
        let mut grown_capacity = None;
        let range = match self.allocator.allocate(vertex_count) {
            Some(range) => range,
            None => {
                let capacity = self.allocator.capacity() as u64;
                // Growth extends the free block at the top of the arena, so
                // this much total capacity is sufficient for the request.
                let needed = capacity + (vertex_count - self.allocator.tail_free()) as u64;
                let doubled = (capacity.max(1) * 2).max(needed);
                let new_capacity = doubled.min(self.max_capacity as u64) as u32;
                if (new_capacity as u64) < needed {
                    return Err(TerrainError::OutOfSpace {
                        needed,
                        max: self.max_capacity as u64,
                    });
                }
                self.allocator.grow(new_capacity);
                grown_capacity = Some(new_capacity);
                self.allocator
                    .allocate(vertex_count)
                    .ok_or(TerrainError::OutOfSpace {
                        needed,
                        max: self.max_capacity as u64,
                    })?
            }
        };

        let slot = match existing {
            Some(slot) => {
                let old = std::mem::replace(
                    &mut self.slots[slot],
                    ChunkSlot {
                        chunk_index,
                        range,
                        offset,
                    },
                );
                self.allocator.free(old.range);
                slot
            }
            None => {
                let slot = self.slots.len();
                self.slots.push(ChunkSlot {
                    chunk_index,
                    range,
                    offset,
                });
                self.by_id.insert(chunk_index, slot);
                slot
            }
        };

        Ok(SetOutcome {
            slot,
            range,
            grown_capacity,
        })
    }

    /// Frees every range and empties the registry for this render type.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_id.clear();
        self.allocator.reset();
    }

    #[cfg(test)]
    pub fn get(&self, chunk_index: i32) -> Option<&ChunkSlot> {
        self.by_id.get(&chunk_index).map(|&slot| &self.slots[slot])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ChunkStore {
        ChunkStore::new(4096, 1 << 20)
    }

    #[test]
    fn repeated_set_converges_to_latest_upload() {
        let mut s = store();
        for i in 1..=10u32 {
            let count = i * 4;
            s.set(7, count, [i as f32, 0.0, 0.0]).unwrap();
        }
        assert_eq!(s.len(), 1);
        let slot = s.get(7).unwrap();
        assert_eq!(slot.range.count, 40);
        assert_eq!(slot.offset, [10.0, 0.0, 0.0]);
        // Nothing but the live range is held.
        assert_eq!(s.allocator.used(), 40);
    }

    #[test]
    fn misaligned_and_oversized_counts_are_rejected_without_side_effects() {
        let mut s = store();
        s.set(1, 8, [0.0; 3]).unwrap();

        assert!(matches!(
            s.set(2, 6, [0.0; 3]),
            Err(TerrainError::NotQuadAligned(6))
        ));
        assert!(matches!(
            s.set(2, MAX_VERTICES_PER_CHUNK + 4, [0.0; 3]),
            Err(TerrainError::ChunkTooLarge(_))
        ));
        assert_eq!(s.len(), 1);
        assert_eq!(s.allocator.used(), 8);
    }

    #[test]
    fn failed_replacement_keeps_previous_entry_valid() {
        let mut s = ChunkStore::new(64, 64);
        s.set(1, 32, [0.0; 3]).unwrap();
        let before = *s.get(1).unwrap();
        // 32 live + 64 requested won't fit and the arena cannot grow.
        assert!(matches!(
            s.set(1, 64, [9.0; 3]),
            Err(TerrainError::OutOfSpace { .. })
        ));
        let after = *s.get(1).unwrap();
        assert_eq!(after.range, before.range);
        assert_eq!(after.offset, before.offset);
    }

    #[test]
    fn chunk_8193_is_rejected_and_existing_slots_survive() {
        let mut s = ChunkStore::new(MAX_CHUNKS as u32 * 4, MAX_CHUNKS as u32 * 4);
        for i in 0..MAX_CHUNKS as i32 {
            s.set(i, 4, [0.0; 3]).unwrap();
        }
        assert!(matches!(
            s.set(MAX_CHUNKS as i32, 4, [0.0; 3]),
            Err(TerrainError::TooManyChunks)
        ));
        assert_eq!(s.len(), MAX_CHUNKS);
        // Replacing a live identity still works at the cap.
        let out = s.set(0, 4, [1.0; 3]).unwrap();
        assert_eq!(out.slot, 0);
    }

    #[test]
    fn clear_then_refill_does_not_grow_the_arena() {
        let mut s = ChunkStore::new(1024, 1024);
        for round in 0..20 {
            for i in 0..8 {
                s.set(i, 128, [round as f32, 0.0, 0.0]).unwrap();
            }
            assert_eq!(s.len(), 8);
            s.clear();
            assert!(s.is_empty());
        }
        assert_eq!(s.capacity(), 1024);
    }

    #[test]
    fn growth_doubles_and_preserves_offsets() {
        let mut s = ChunkStore::new(64, 1 << 16);
        let a = s.set(1, 64, [0.0; 3]).unwrap();
        assert_eq!(a.grown_capacity, None);
        let b = s.set(2, 64, [0.0; 3]).unwrap();
        assert_eq!(b.grown_capacity, Some(128));
        // First chunk's range is untouched by growth.
        assert_eq!(s.get(1).unwrap().range.offset, a.range.offset);

        let c = s.set(3, 512, [0.0; 3]).unwrap();
        // Doubling alone (256) would not fit 512 on top of 128 used.
        assert_eq!(c.grown_capacity, Some(640));
    }

    #[test]
    fn rejected_growth_leaves_the_arena_capacity_untouched() {
        let mut s = ChunkStore::new(100, 150);
        s.set(1, 100, [0.0; 3]).unwrap();
        // 60 on top of 100 used would need 160 vertices; the cap is 150.
        assert!(matches!(
            s.set(2, 60, [0.0; 3]),
            Err(TerrainError::OutOfSpace { .. })
        ));
        assert_eq!(s.capacity(), 100);
        assert_eq!(s.len(), 1);

        // A request that does fit under the cap grows and says so, keeping
        // the device-side buffer in lockstep.
        let out = s.set(3, 40, [0.0; 3]).unwrap();
        assert_eq!(out.grown_capacity, Some(150));
        assert_eq!(out.range.offset, 100);
    }

    #[test]
    fn same_size_replacement_reuses_the_range_in_a_full_arena() {
        let mut s = ChunkStore::new(64, 64);
        let a = s.set(1, 64, [0.0; 3]).unwrap();
        let b = s.set(1, 64, [2.0; 3]).unwrap();
        assert_eq!(b.range, a.range);
        assert_eq!(b.grown_capacity, None);
        assert_eq!(s.get(1).unwrap().offset, [2.0; 3]);
        assert_eq!(s.allocator.used(), 64);
    }

    #[test]
    fn slot_indices_stay_dense_and_stable_across_replacement() {
        let mut s = store();
        let a = s.set(10, 8, [0.0; 3]).unwrap();
        let b = s.set(20, 8, [0.0; 3]).unwrap();
        assert_eq!((a.slot, b.slot), (0, 1));
        let a2 = s.set(10, 16, [0.0; 3]).unwrap();
        assert_eq!(a2.slot, 0);
        assert_eq!(s.slots()[0].range.count, 16);
        assert_eq!(s.slots()[1].chunk_index, 20);
    }
}

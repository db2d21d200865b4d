use std::collections::BTreeMap;

/// A contiguous span of vertices inside one render type's mega-buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VertexRange {
    pub offset: u32,
    pub count: u32,
}

/// Free-list arena over vertex index ranges.
///
/// Chunk sizes are bounded (64k vertices) and live ranges are capped at 8192,
/// so a best-fit scan over the free list is cheap; the free list is keyed by
/// offset so adjacent blocks coalesce on free and fragmentation stays low
/// under the steady churn of chunk rebuilds.
#[derive(Debug)]
pub struct RangeAllocator {
    capacity: u32,
    /// offset -> length of each free block, non-adjacent by construction.
    free: BTreeMap<u32, u32>,
}

impl RangeAllocator {
    pub fn new(capacity: u32) -> Self {
        let mut free = BTreeMap::new();
        if capacity > 0 {
            free.insert(0, capacity);
        }
        Self { capacity, free }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Total vertices currently handed out.
    pub fn used(&self) -> u32 {
        self.capacity - self.free.values().sum::<u32>()
    }

    /// Size of the free block ending exactly at the top of the arena, or 0.
    /// Growth appends to this block, so `tail_free` tells the caller how much
    /// extra capacity a request of a given size actually needs.
    pub fn tail_free(&self) -> u32 {
        match self.free.iter().next_back() {
            Some((&offset, &len)) if offset + len == self.capacity => len,
            _ => 0,
        }
    }

    /// Best-fit allocation. Returns `None` when no free block is large enough;
    /// the caller decides whether to grow or fail.
    pub fn allocate(&mut self, count: u32) -> Option<VertexRange> {
        if count == 0 {
            return Some(VertexRange { offset: 0, count: 0 });
        }
        let (&offset, &len) = self
            .free
            .iter()
            .filter(|(_, &len)| len >= count)
            .min_by_key(|(_, &len)| len)?;
        self.free.remove(&offset);
        if len > count {
            self.free.insert(offset + count, len - count);
        }
        Some(VertexRange { offset, count })
    }

    /// Returns a range to the pool, coalescing with adjacent free blocks.
    /// Only ever called once per registry transition.
    pub fn free(&mut self, range: VertexRange) {
        if range.count == 0 {
            return;
        }
        debug_assert!(range.offset as u64 + range.count as u64 <= self.capacity as u64);

        let mut offset = range.offset;
        let mut count = range.count;

        // Merge with the preceding block if it ends exactly at `offset`.
        if let Some((&prev_off, &prev_len)) = self.free.range(..offset).next_back() {
            debug_assert!(prev_off + prev_len <= offset, "double free");
            if prev_off + prev_len == offset {
                self.free.remove(&prev_off);
                offset = prev_off;
                count += prev_len;
            }
        }
        // Merge with the following block if it starts exactly at the end.
        if let Some(&next_len) = self.free.get(&(offset + count)) {
            self.free.remove(&(offset + count));
            count += next_len;
        }
        self.free.insert(offset, count);
    }

    /// Extends the arena to `new_capacity` vertices, appending the fresh space
    /// to the free list. Existing ranges keep their offsets, so the device
    /// buffer can be reallocated and its old contents copied forward.
    pub fn grow(&mut self, new_capacity: u32) {
        assert!(new_capacity > self.capacity);
        let added = new_capacity - self.capacity;
        let old_capacity = self.capacity;
        self.capacity = new_capacity;
        self.free(VertexRange {
            offset: old_capacity,
            count: added,
        });
    }

    /// Drops every allocation and restores the single full-capacity free block.
    pub fn reset(&mut self) {
        self.free.clear();
        if self.capacity > 0 {
            self.free.insert(0, self.capacity);
        }
    }
}

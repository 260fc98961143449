use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3, Vec4, Vec4Swizzles};

use crate::{AtomicSlots, Normal, ShRgb, LIGHTING_WORKGROUP_SIZE, SH_MAX_COEFFS};

/// Index of a cache entry (a slot within the cache table).
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CacheIndex(u32);

impl CacheIndex {
    pub const NONE: Self = Self(u32::MAX);

    /// Cell of the address volume that doesn't point at any cache.
    pub const CELL_EMPTY: u32 = 0;

    /// Cell of the address volume whose cache is being allocated (or whose
    /// allocation failed because the table ran out of slots).
    pub const CELL_RESERVED: u32 = u32::MAX;

    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    /// Decodes index stored in the address volume; cells keep `index + 1` so
    /// that zero-clearing the volume marks all of them as empty.
    pub fn from_cell(cell: u32) -> Self {
        if cell == Self::CELL_EMPTY || cell == Self::CELL_RESERVED {
            Self::NONE
        } else {
            Self(cell - 1)
        }
    }

    pub fn to_cell(self) -> u32 {
        self.0 + 1
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_some(self) -> bool {
        self.0 != u32::MAX
    }

    pub fn is_none(self) -> bool {
        !self.is_some()
    }
}

#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Allocation {
    pub index: CacheIndex,

    /// Whether this invocation was the one that allocated the cache (as
    /// compared to finding one that has been already requested).
    pub is_new: bool,
}

impl Allocation {
    pub fn none() -> Self {
        Self {
            index: CacheIndex::NONE,
            is_new: false,
        }
    }
}

/// Layout of the counter buffer: three words of indirect-dispatch arguments
/// (written by the prepare pass) followed by the number of allocated caches.
pub struct CacheCounter;

impl CacheCounter {
    pub const WORDS: usize = 4;
    pub const COUNT: u32 = 3;
}

/// Makes sure that the cell at `address` points at a cache, allocating one if
/// the cell is empty.
///
/// Out of all invocations racing for the same empty cell, exactly one wins
/// the reservation, claims a slot and publishes it - the rest observe either
/// the reservation or the published index. When the table is full the cell
/// remains reserved, which everyone reads as "no cache".
pub fn try_allocate(
    addresses: &mut impl AtomicSlots,
    counter: &mut impl AtomicSlots,
    headers: &mut impl AtomicSlots,
    header: CacheHeader,
    capacity: u32,
) -> Allocation {
    let prev = addresses.compare_exchange(
        header.address,
        CacheIndex::CELL_EMPTY,
        CacheIndex::CELL_RESERVED,
    );

    if prev != CacheIndex::CELL_EMPTY {
        return Allocation {
            index: CacheIndex::from_cell(prev),
            is_new: false,
        };
    }

    let index = claim_slot(counter, capacity);

    if index.is_none() {
        return Allocation::none();
    }

    header.write(headers, index);
    addresses.store(header.address, index.to_cell());

    Allocation {
        index,
        is_new: true,
    }
}

/// Claims the next free slot of the cache table; the counter never goes past
/// `capacity`, so slots stay dense and in-bounds even under contention.
pub fn claim_slot(counter: &mut impl AtomicSlots, capacity: u32) -> CacheIndex {
    let mut count = counter.load(CacheCounter::COUNT);

    while count < capacity {
        let prev =
            counter.compare_exchange(CacheCounter::COUNT, count, count + 1);

        if prev == count {
            return CacheIndex::new(count);
        }

        count = prev;
    }

    CacheIndex::NONE
}

/// What the gather pass knows about a freshly allocated cache - the lighting
/// pass expands this into a complete [`CacheEntry`].
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CacheHeader {
    /// Address of the cell (within the address volume) owning this cache
    pub address: u32,

    /// Normal of the surface that requested this cache
    pub normal: Vec3,
}

impl CacheHeader {
    pub const WORDS: u32 = 2;

    pub fn read(headers: &[u32], index: CacheIndex) -> Self {
        let idx = (index.get() * Self::WORDS) as usize;

        Self {
            address: headers[idx],
            normal: Normal::unpack(headers[idx + 1]),
        }
    }

    pub fn write(self, headers: &mut impl AtomicSlots, index: CacheIndex) {
        let idx = index.get() * Self::WORDS;

        headers.store(idx, self.address);
        headers.store(idx + 1, Normal::pack(self.normal));
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct CacheEntry {
    /// x, y, z - world-space position (center of the owning cell)
    /// w - cascade (as u32)
    pub d0: Vec4,

    /// x, y, z - normal of the surface that requested this cache
    /// w - unused
    pub d1: Vec4,

    /// Spherical-harmonics coefficients of incoming radiance, one rgb triple
    /// (in x, y, z) per coefficient
    pub sh: [Vec4; SH_MAX_COEFFS],
}

impl CacheEntry {
    pub fn new(position: Vec3, normal: Vec3, cascade: u32, sh: ShRgb) -> Self {
        let mut this = Self {
            d0: position.extend(f32::from_bits(cascade)),
            d1: normal.extend(0.0),
            sh: [Vec4::ZERO; SH_MAX_COEFFS],
        };

        let mut i = 0;

        while i < SH_MAX_COEFFS {
            this.sh[i] = sh.coeffs[i].extend(0.0);
            i += 1;
        }

        this
    }

    pub fn position(&self) -> Vec3 {
        self.d0.xyz()
    }

    pub fn cascade(&self) -> u32 {
        self.d0.w.to_bits()
    }

    pub fn normal(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn radiance(&self) -> ShRgb {
        let mut sh = ShRgb::default();
        let mut i = 0;

        while i < SH_MAX_COEFFS {
            sh.coeffs[i] = self.sh[i].xyz();
            i += 1;
        }

        sh
    }
}

/// Arguments of `draw_indexed_indirect()`, used to render the allocated
/// caches as instanced gizmos when debugging.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DrawIndexedIndirectArgs {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    pub const WORDS: usize = 5;
}

/// Turns number of allocated caches into the lighting pass' dispatch size and
/// the debug draw's arguments.
pub fn prepare_dispatch(
    count: u32,
    capacity: u32,
    debug_index_count: u32,
) -> (UVec3, DrawIndexedIndirectArgs) {
    let count = count.min(capacity);

    let groups = UVec3::new(
        (count + LIGHTING_WORKGROUP_SIZE - 1) / LIGHTING_WORKGROUP_SIZE,
        1,
        1,
    );

    let draw = DrawIndexedIndirectArgs {
        index_count: debug_index_count,
        instance_count: count,
        ..Default::default()
    };

    (groups, draw)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::thread;

    use glam::vec3;

    use super::*;

    fn slots(len: usize) -> Vec<AtomicU32> {
        (0..len).map(|_| AtomicU32::new(0)).collect()
    }

    fn header(address: u32) -> CacheHeader {
        CacheHeader {
            address,
            normal: vec3(0.0, 1.0, 0.0),
        }
    }

    #[test]
    fn cell_encoding() {
        assert!(CacheIndex::from_cell(CacheIndex::CELL_EMPTY).is_none());
        assert!(CacheIndex::from_cell(CacheIndex::CELL_RESERVED).is_none());
        assert_eq!(CacheIndex::new(0), CacheIndex::from_cell(1));
        assert_eq!(
            41,
            CacheIndex::from_cell(CacheIndex::new(41).to_cell()).get()
        );
    }

    #[test]
    fn allocate_once_per_cell() {
        let addresses = slots(16);
        let counter = slots(CacheCounter::WORDS);
        let headers = slots(64);

        let alloc = |address| {
            try_allocate(
                &mut addresses.as_slice(),
                &mut counter.as_slice(),
                &mut headers.as_slice(),
                header(address),
                32,
            )
        };

        let a = alloc(5);
        let b = alloc(5);
        let c = alloc(7);

        assert!(a.is_new);
        assert!(!b.is_new);
        assert!(c.is_new);
        assert_eq!(a.index, b.index);
        assert_eq!(0, a.index.get());
        assert_eq!(1, c.index.get());

        let headers: Vec<_> =
            headers.iter().map(|h| h.load(Ordering::Relaxed)).collect();

        assert_eq!(5, CacheHeader::read(&headers, a.index).address);
        assert_eq!(7, CacheHeader::read(&headers, c.index).address);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let addresses = slots(100);
        let counter = slots(CacheCounter::WORDS);
        let headers = slots(20);

        let allocs: Vec<_> = (0..100)
            .map(|address| {
                try_allocate(
                    &mut addresses.as_slice(),
                    &mut counter.as_slice(),
                    &mut headers.as_slice(),
                    header(address),
                    10,
                )
            })
            .collect();

        assert_eq!(
            10,
            counter[CacheCounter::COUNT as usize].load(Ordering::Relaxed)
        );
        assert_eq!(10, allocs.iter().filter(|a| a.index.is_some()).count());

        // Cells that didn't fit stay reserved and read as "no cache"
        assert_eq!(
            CacheIndex::CELL_RESERVED,
            addresses[50].load(Ordering::Relaxed)
        );

        let retry = try_allocate(
            &mut addresses.as_slice(),
            &mut counter.as_slice(),
            &mut headers.as_slice(),
            header(50),
            10,
        );

        assert!(retry.index.is_none());
        assert!(!retry.is_new);
    }

    #[test]
    fn concurrent_allocations() {
        const THREADS: usize = 8;
        const CELLS: u32 = 500;
        const CAPACITY: u32 = 300;

        let addresses = slots(CELLS as usize);
        let counter = slots(CacheCounter::WORDS);
        let headers = slots((CAPACITY * CacheHeader::WORDS) as usize);
        let winners = AtomicU32::new(0);

        thread::scope(|s| {
            for tid in 0..THREADS {
                let addresses = addresses.as_slice();
                let counter = counter.as_slice();
                let headers = headers.as_slice();
                let winners = &winners;

                s.spawn(move || {
                    // Every thread walks all the cells, starting at a
                    // different offset, so that the races actually happen
                    for i in 0..CELLS {
                        let address = (i + tid as u32 * 61) % CELLS;

                        let alloc = try_allocate(
                            &mut { addresses },
                            &mut { counter },
                            &mut { headers },
                            header(address),
                            CAPACITY,
                        );

                        if alloc.is_new {
                            winners.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let count =
            counter[CacheCounter::COUNT as usize].load(Ordering::Relaxed);

        assert_eq!(CAPACITY, count);
        assert_eq!(CAPACITY, winners.load(Ordering::Relaxed));

        // Each claimed slot is owned by exactly one cell, and that cell's
        // header points back at it
        let headers: Vec<_> =
            headers.iter().map(|h| h.load(Ordering::Relaxed)).collect();

        let mut owners = vec![0; CAPACITY as usize];

        for (address, cell) in addresses.iter().enumerate() {
            let index = CacheIndex::from_cell(cell.load(Ordering::Relaxed));

            if index.is_some() {
                owners[index.get() as usize] += 1;

                assert_eq!(
                    address as u32,
                    CacheHeader::read(&headers, index).address
                );
            }
        }

        assert!(owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn prepare() {
        let (groups, draw) = prepare_dispatch(0, 100, 36);

        assert_eq!(UVec3::new(0, 1, 1), groups);
        assert_eq!(0, draw.instance_count);

        let (groups, draw) = prepare_dispatch(65, 100, 36);

        assert_eq!(UVec3::new(2, 1, 1), groups);
        assert_eq!(65, draw.instance_count);
        assert_eq!(36, draw.index_count);

        let (_, draw) = prepare_dispatch(500, 100, 36);

        assert_eq!(100, draw.instance_count);
    }
}

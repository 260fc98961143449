#[cfg(not(target_arch = "spirv"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_arch = "spirv")]
use spirv_std::arch::IndexUnchecked;
#[cfg(target_arch = "spirv")]
use spirv_std::memory::{Scope, Semantics};

/// Array of `u32` slots that can be accessed concurrently.
///
/// Shaders implement this on top of storage buffers (with SPIR-V atomics),
/// while the software pipeline implements it on top of `AtomicU32`s - this
/// way the allocation protocol is written once and exercised on both sides.
pub trait AtomicSlots {
    fn load(&mut self, idx: u32) -> u32;

    fn store(&mut self, idx: u32, val: u32);

    /// Atomically replaces `current` with `new` and returns the value that
    /// was stored there before (the exchange succeeded if that's `current`).
    fn compare_exchange(&mut self, idx: u32, current: u32, new: u32) -> u32;
}

#[cfg(target_arch = "spirv")]
impl AtomicSlots for &mut [u32] {
    fn load(&mut self, idx: u32) -> u32 {
        unsafe {
            spirv_std::arch::atomic_load::<
                u32,
                { Scope::Device as u32 },
                { Semantics::NONE.bits() },
            >(self.index_unchecked(idx as usize))
        }
    }

    fn store(&mut self, idx: u32, val: u32) {
        unsafe {
            spirv_std::arch::atomic_store::<
                u32,
                { Scope::Device as u32 },
                { Semantics::NONE.bits() },
            >(self.index_unchecked_mut(idx as usize), val)
        }
    }

    fn compare_exchange(&mut self, idx: u32, current: u32, new: u32) -> u32 {
        unsafe {
            spirv_std::arch::atomic_compare_exchange::<
                u32,
                { Scope::Device as u32 },
                { Semantics::NONE.bits() },
                { Semantics::NONE.bits() },
            >(self.index_unchecked_mut(idx as usize), new, current)
        }
    }
}

/// Exclusive access doesn't need atomics; this lets shaders be type-checked
/// on the host as well.
#[cfg(not(target_arch = "spirv"))]
impl AtomicSlots for &mut [u32] {
    fn load(&mut self, idx: u32) -> u32 {
        self[idx as usize]
    }

    fn store(&mut self, idx: u32, val: u32) {
        self[idx as usize] = val;
    }

    fn compare_exchange(&mut self, idx: u32, current: u32, new: u32) -> u32 {
        let prev = self[idx as usize];

        if prev == current {
            self[idx as usize] = new;
        }

        prev
    }
}

#[cfg(not(target_arch = "spirv"))]
impl AtomicSlots for &[AtomicU32] {
    fn load(&mut self, idx: u32) -> u32 {
        self[idx as usize].load(Ordering::Acquire)
    }

    fn store(&mut self, idx: u32, val: u32) {
        self[idx as usize].store(val, Ordering::Release);
    }

    fn compare_exchange(&mut self, idx: u32, current: u32, new: u32) -> u32 {
        match self[idx as usize].compare_exchange(
            current,
            new,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(prev) | Err(prev) => prev,
        }
    }
}

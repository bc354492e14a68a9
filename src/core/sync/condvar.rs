/*!
 * Keyed Condvar with Sharded Architecture
 *
 * # Design: Fixed Sharded Array Over a Map of Condvars
 *
 * Instead of allocating a condvar per key (per share group), keys hash into
 * a fixed array of slots:
 * - Zero allocations after initialization
 * - Stable addresses for the lifetime of the arbiter
 * - O(1) lookup via hash and mask
 *
 * Trade-off: Multiple keys may share a slot (spurious wakeups), which the
 * caller's re-check loop absorbs.
 *
 * Every slot pairs with the same external `parking_lot::Mutex`; callers pass
 * their held guard so the lock is released and re-acquired atomically
 * around the sleep.
 */

use super::traits::WakeResult;
use super::wait::{Deadline, WaitError, WaitResult};
use parking_lot::{Condvar, MutexGuard};
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A single condvar slot with waiter count
#[repr(C, align(64))] // Cache-line aligned to prevent false sharing
struct CondvarSlot {
    condvar: Condvar,
    waiters: AtomicUsize,
}

impl CondvarSlot {
    const fn new() -> Self {
        Self {
            condvar: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }
}

/// Wait channels keyed by `K`, all guarded by one external mutex
pub struct KeyedCondvar<K>
where
    K: Eq + Hash + Copy,
{
    slots: Box<[CondvarSlot]>,
    mask: usize,
    hasher: ahash::RandomState,
    _phantom: std::marker::PhantomData<fn(K)>,
}

impl<K> KeyedCondvar<K>
where
    K: Eq + Hash + Copy,
{
    /// Create with `slots` rounded up to a power of two (at least one)
    pub fn new(slots: usize) -> Self {
        let count = slots.max(1).next_power_of_two();
        Self {
            slots: (0..count).map(|_| CondvarSlot::new()).collect(),
            mask: count - 1,
            hasher: ahash::RandomState::new(),
            _phantom: std::marker::PhantomData,
        }
    }

    /// Hash key to slot
    #[inline]
    fn slot(&self, key: K) -> &CondvarSlot {
        let idx = (self.hasher.hash_one(key) as usize) & self.mask;
        &self.slots[idx]
    }

    /// Sleep on `key`'s channel, atomically releasing `guard` while asleep
    ///
    /// Returns `Ok(())` when notified (possibly spuriously) and
    /// `Err(WaitError::Timeout)` once `deadline` passes. The guard is held
    /// again in both cases.
    pub fn wait<T>(
        &self,
        key: K,
        guard: &mut MutexGuard<'_, T>,
        deadline: Deadline,
    ) -> WaitResult<()> {
        if deadline.has_expired() {
            return Err(WaitError::Timeout);
        }
        let slot = self.slot(key);
        slot.waiters.fetch_add(1, Ordering::Relaxed);

        let timed_out = match deadline {
            Deadline::Never => {
                slot.condvar.wait(guard);
                false
            }
            Deadline::At(at) => slot.condvar.wait_until(guard, at).timed_out(),
        };

        slot.waiters.fetch_sub(1, Ordering::Relaxed);

        if timed_out {
            Err(WaitError::Timeout)
        } else {
            Ok(())
        }
    }

    /// Wake every waiter whose key shares `key`'s slot
    pub fn wake_all(&self, key: K) -> WakeResult {
        let slot = self.slot(key);
        let count = slot.waiters.load(Ordering::Relaxed);
        if count == 0 {
            return WakeResult::NoWaiters;
        }
        slot.condvar.notify_all();
        WakeResult::Woken(count)
    }

    /// Wake every waiter on every slot
    pub fn wake_everyone(&self) -> WakeResult {
        let mut total = 0;
        for slot in self.slots.iter() {
            let count = slot.waiters.load(Ordering::Relaxed);
            if count > 0 {
                slot.condvar.notify_all();
                total += count;
            }
        }
        if total == 0 {
            WakeResult::NoWaiters
        } else {
            WakeResult::Woken(total)
        }
    }

    /// Approximate number of sleepers sharing `key`'s slot (for diagnostics)
    pub fn waiter_count(&self, key: K) -> usize {
        self.slot(key).waiters.load(Ordering::Relaxed)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

// LRU eviction policy. Removes least-recently-accessed entries until the
// requested space is free or the removal cap is exhausted; the cap keeps a
// single oversized write from emptying a whole partition.

use std::sync::atomic::Ordering;

use tracing::debug;

use crate::store::partition::Inner;

/// Evict least-recently-used entries from `inner` until `required` bytes
/// have been freed or the removal cap (a percentage of the current entry
/// count, at least one entry) is reached. Returns the bytes freed.
///
/// Must be called with the partition write lock held, which is enforced by
/// taking `&mut Inner`.
pub(crate) fn make_room(inner: &mut Inner, required: u64, cap_pct: u32) -> u64 {
    if inner.entries.is_empty() {
        return 0;
    }

    let cap = ((inner.entries.len() as u64 * cap_pct as u64) / 100).max(1) as usize;

    // Oldest access tick first.
    let mut candidates: Vec<(String, u64, u64)> = inner
        .entries
        .iter()
        .map(|(key, entry)| {
            (
                key.clone(),
                entry.last_access.load(Ordering::Relaxed),
                entry.size,
            )
        })
        .collect();
    candidates.sort_by_key(|(_, last_access, _)| *last_access);

    let mut freed = 0u64;
    let mut removed = 0usize;
    for (key, _, size) in candidates {
        if freed >= required || removed >= cap {
            break;
        }
        inner.entries.remove(&key);
        inner.total_size -= size;
        freed += size;
        removed += 1;
        debug!(key = %key, size, "evicted LRU entry");
    }

    freed
}

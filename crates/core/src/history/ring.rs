//! "Ago" addressing shared by every ring query.

/// Slot index of the entry `ago` positions before the most recent write.
///
/// `write` is the next slot to be written, so `ago == 0` maps to `write - 1`.
/// Total for all inputs: `ago` wraps modulo `len`. Callers clamp `ago` to the
/// populated range first so that it never reaches into unwritten slots.
#[inline]
pub(crate) fn slot_ago(write: usize, ago: usize, len: usize) -> usize {
    debug_assert!(len > 0);
    let back = ago % len + 1;
    (write + len - back) % len
}

/// Clamps an offset to the oldest of `available` populated entries.
#[inline]
pub(crate) fn clamp_ago(ago: usize, available: usize) -> usize {
    ago.min(available.saturating_sub(1))
}

//! Growable byte buffer: appends byte slices into one contiguous
//! array and hands back stable integer offsets.

/// Minimum capacity a non-empty buffer ever allocates, matching the
/// 16 KiB floor the original C `char_buf` uses for its first allocation.
const INIT_CAPACITY: usize = 1 << 14;

/// A single growing byte array that never shrinks and never moves an
/// already-issued offset out from under its caller.
///
/// Capacity is always zero or a power of two `>= INIT_CAPACITY`, doubling
/// whenever an append would overflow it. Offsets returned by [`append`]
/// stay valid for the lifetime of the buffer: the backing storage may be
/// reallocated, but callers only ever see integer offsets, never
/// addresses.
///
/// [`append`]: GrowableBuffer::append
#[derive(Debug, Default)]
pub struct GrowableBuffer {
    data: Vec<u8>,
}

impl GrowableBuffer {
    /// Creates an empty buffer with no backing allocation.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Appends `bytes` to the end of the buffer, growing capacity by
    /// doubling (from a 16 KiB floor) if needed, and returns the offset
    /// at which the bytes now start.
    ///
    /// Panics on allocation failure; callers on the `add` path that must
    /// surface resource exhaustion as `NG` instead of aborting use
    /// [`try_append`](Self::try_append).
    pub fn append(&mut self, bytes: &[u8]) -> u32 {
        self.try_append(bytes).expect("allocation failed")
    }

    /// Same as [`append`](Self::append), but reports allocation failure
    /// instead of panicking, via `Vec::try_reserve_exact` (the resource
    /// exhaustion case).
    pub fn try_append(&mut self, bytes: &[u8]) -> Result<u32, std::collections::TryReserveError> {
        let offset = self.data.len();
        self.try_reserve_additional(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(offset as u32)
    }

    /// Grows capacity by doubling (from the 16 KiB floor) until at least
    /// `additional` more bytes fit, without copying any data in. Split
    /// out of [`try_append`](Self::try_append) so the capacity-overflow
    /// path can be exercised without ever materializing a multi-exabyte
    /// slice (`additional` alone is enough to trigger it; arithmetic
    /// here saturates instead of overflowing so a pathological caller
    /// gets `Err` from `try_reserve_exact`, not a panic).
    fn try_reserve_additional(&mut self, additional: usize) -> Result<(), std::collections::TryReserveError> {
        let required = self.data.len().saturating_add(additional);
        if required > self.data.capacity() {
            let mut new_cap = self.data.capacity().max(INIT_CAPACITY);
            while new_cap < required {
                new_cap = new_cap.saturating_mul(2);
                if new_cap == usize::MAX {
                    break;
                }
            }
            self.data.try_reserve_exact(new_cap.saturating_sub(self.data.len()))?;
        }
        Ok(())
    }

    /// Number of live bytes in the buffer.
    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    /// Returns the slice `[offset, offset+length)`.
    ///
    /// Panics if the range is out of bounds, matching the precondition
    /// that callers only ever slice within already-appended data.
    pub fn slice(&self, offset: u32, length: u32) -> &[u8] {
        let start = offset as usize;
        let end = start + length as usize;
        &self.data[start..end]
    }

    /// Full live contents, for the brute-force fallback scanner and
    /// `dump`.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

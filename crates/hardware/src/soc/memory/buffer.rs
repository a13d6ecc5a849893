//! Backing store for simulated memory.
//!
//! Memories in the model can be large (the queue region alone defaults to 256 MiB)
//! while tests touch only a few bytes of them. On Unix systems the store is an
//! anonymous `mmap`, so pages are only allocated by the OS when first written;
//! elsewhere, or if the mapping fails, it falls back to a zeroed heap buffer.

use std::ptr::NonNull;
use std::slice;

/// Where the bytes live.
enum Storage {
    /// Anonymous private mapping of `len` bytes.
    #[cfg(unix)]
    Mapped { ptr: NonNull<u8>, len: usize },
    /// Plain heap allocation.
    Heap(Vec<u8>),
}

/// Zero-initialized, lazily allocated byte storage.
pub struct BackingStore {
    storage: Storage,
}

// SAFETY: the mapping is exclusively owned by this value and only reachable
// through `&self`/`&mut self`, so moving it to another thread is sound.
unsafe impl Send for BackingStore {}

impl std::fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingStore")
            .field("len", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

impl BackingStore {
    /// Creates a zeroed store of `size` bytes.
    ///
    /// # Arguments
    ///
    /// * `size` - Size of the store in bytes.
    pub fn new(size: usize) -> Self {
        #[cfg(unix)]
        {
            if size > 0 {
                // SAFETY: anonymous private mapping with no address hint; the
                // result is checked against MAP_FAILED before use.
                let ptr = unsafe {
                    libc::mmap(
                        std::ptr::null_mut(),
                        size,
                        libc::PROT_READ | libc::PROT_WRITE,
                        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                        -1,
                        0,
                    )
                };
                if ptr != libc::MAP_FAILED {
                    if let Some(ptr) = NonNull::new(ptr.cast::<u8>()) {
                        return Self {
                            storage: Storage::Mapped { ptr, len: size },
                        };
                    }
                }
                tracing::warn!(size, "mmap failed, falling back to a heap buffer");
            }
        }
        Self {
            storage: Storage::Heap(vec![0; size]),
        }
    }

    /// Returns the size of the store in bytes.
    pub fn len(&self) -> usize {
        match &self.storage {
            #[cfg(unix)]
            Storage::Mapped { len, .. } => *len,
            Storage::Heap(v) => v.len(),
        }
    }

    /// Returns `true` if the store holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the store is backed by an `mmap`.
    pub const fn is_mapped(&self) -> bool {
        match &self.storage {
            #[cfg(unix)]
            Storage::Mapped { .. } => true,
            Storage::Heap(_) => false,
        }
    }

    fn as_slice(&self) -> &[u8] {
        match &self.storage {
            #[cfg(unix)]
            // SAFETY: `ptr` points to `len` readable bytes owned by this store.
            Storage::Mapped { ptr, len } => unsafe { slice::from_raw_parts(ptr.as_ptr(), *len) },
            Storage::Heap(v) => v.as_slice(),
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.storage {
            #[cfg(unix)]
            // SAFETY: `ptr` points to `len` writable bytes owned exclusively by
            // this store, and `&mut self` guarantees no other borrow exists.
            Storage::Mapped { ptr, len } => unsafe {
                slice::from_raw_parts_mut(ptr.as_ptr(), *len)
            },
            Storage::Heap(v) => v.as_mut_slice(),
        }
    }

    /// Copies `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// Returns `false` and leaves `buf` untouched if the range is out of bounds.
    pub fn read(&self, offset: u64, buf: &mut [u8]) -> bool {
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        match self.as_slice().get(start..start.saturating_add(buf.len())) {
            Some(src) => {
                buf.copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    /// Copies `data` into the store starting at `offset`.
    ///
    /// Returns `false` and writes nothing if the range is out of bounds.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> bool {
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        match self
            .as_mut_slice()
            .get_mut(start..start.saturating_add(data.len()))
        {
            Some(dst) => {
                dst.copy_from_slice(data);
                true
            }
            None => false,
        }
    }
}

impl Drop for BackingStore {
    /// Unmaps the store if it was mapped.
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Storage::Mapped { ptr, len } = self.storage {
            // SAFETY: `ptr`/`len` describe a live mapping created in `new` and
            // never unmapped before.
            let _ = unsafe { libc::munmap(ptr.as_ptr().cast(), len) };
        }
    }
}

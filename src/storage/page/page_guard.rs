use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::buffer_pool_manager::{BufferPoolManager, FrameHeader, PageId};

// Common core of the guard family. Owns one pin on the frame and gives it
// back on every exit path; the dirty hint accumulated through the mutable
// accessors travels with the unpin.
struct FrameGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame: Arc<FrameHeader>,
    page_id: PageId,
    is_dirty: bool,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin_page(self.page_id, self.is_dirty);
    }
}

/// Pinned page with no latch held. The latch is taken per access through
/// `data` / `data_mut`.
pub struct BasicGuard<'a> {
    inner: FrameGuard<'a>,
}

impl<'a> BasicGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page_id: PageId, frame: Arc<FrameHeader>) -> Self {
        BasicGuard {
            inner: FrameGuard {
                bpm,
                frame,
                page_id,
                is_dirty: false,
            },
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.inner.frame.data()
    }

    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.inner.is_dirty = true;
        self.inner.frame.data_mut()
    }

    pub fn upgrade_read(self) -> ReadGuard<'a> {
        ReadGuard { inner: self.inner }
    }

    pub fn upgrade_write(self) -> WriteGuard<'a> {
        WriteGuard { inner: self.inner }
    }
}

/// Pinned page intended for shared access.
pub struct ReadGuard<'a> {
    inner: FrameGuard<'a>,
}

impl<'a> ReadGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page_id: PageId, frame: Arc<FrameHeader>) -> Self {
        ReadGuard {
            inner: FrameGuard {
                bpm,
                frame,
                page_id,
                is_dirty: false,
            },
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.inner.frame.data()
    }
}

/// Pinned page intended for exclusive access. Any mutable access marks the
/// frame dirty on unpin.
pub struct WriteGuard<'a> {
    inner: FrameGuard<'a>,
}

impl<'a> WriteGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, page_id: PageId, frame: Arc<FrameHeader>) -> Self {
        WriteGuard {
            inner: FrameGuard {
                bpm,
                frame,
                page_id,
                is_dirty: false,
            },
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.inner.frame.data()
    }

    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.inner.is_dirty = true;
        self.inner.frame.data_mut()
    }
}

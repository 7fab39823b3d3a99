use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use hashlink::LinkedHashMap;
use log::debug;

use crate::{
    storage::{
        disk::manager::Manager,
        page::{
            page::page_constants::{INVALID_PAGE_ID, PAGE_SIZE},
            page_guard::{BasicGuard, ReadGuard, WriteGuard},
        },
    },
    utils::replacer::{AccessType, LRUKReplacer, Replacer},
};

pub type FrameId = u32;
pub type PageId = u32;

/// One buffer pool frame: a page-sized slab plus its residency metadata.
///
/// The bytes sit behind the frame's reader-writer latch. The metadata is
/// only ever mutated while the pool mutex is held; it is atomic so that
/// guards and tests can read it without taking that mutex.
pub struct FrameHeader {
    pub frame_id: FrameId,
    page_id: AtomicU32,
    pin_count: AtomicU32,
    is_dirty: AtomicBool,
    data: RwLock<Box<[u8]>>,
}

impl FrameHeader {
    fn new(frame_id: FrameId) -> Self {
        FrameHeader {
            frame_id,
            page_id: AtomicU32::new(INVALID_PAGE_ID),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new(vec![0u8; PAGE_SIZE].into_boxed_slice()),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id.load(Ordering::Relaxed)
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.data.read().unwrap()
    }

    pub fn data_mut(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.data.write().unwrap()
    }
}

struct PoolState {
    // Exactly the resident pages. A page is in here iff its frame is off
    // the free list.
    page_table: LinkedHashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
}

pub struct BufferPoolManager {
    pool_size: usize,
    next_page_id: AtomicU32,

    // The frame headers of the frames that this buffer pool manages.
    frames: Vec<Arc<FrameHeader>>,

    state: Mutex<PoolState>,

    // The replacer finds unpinned candidate frames for eviction. It is
    // internally synchronized and only touched while the pool mutex is held.
    replacer: LRUKReplacer,

    manager: Mutex<Manager>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, manager: Manager, k_dist: usize) -> Self {
        let frames = (0..pool_size)
            .map(|i| Arc::new(FrameHeader::new(i as FrameId)))
            .collect();

        let free_list = (0..pool_size).map(|i| i as FrameId).collect();

        BufferPoolManager {
            pool_size,
            next_page_id: AtomicU32::new(0),
            frames,
            state: Mutex::new(PoolState {
                page_table: LinkedHashMap::new(),
                free_list,
            }),
            replacer: LRUKReplacer::new(pool_size, k_dist),
            manager: Mutex::new(manager),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    fn allocate_page(&self) -> PageId {
        self.next_page_id.fetch_add(1, Ordering::Relaxed)
    }

    // The allocator is a monotonic counter; freed ids are not recycled.
    fn deallocate_page(&self, _page_id: PageId) {}

    /// Finds a frame to host a page: the free list first, otherwise an
    /// eviction victim. A dirty victim is written back and its old mapping
    /// dropped before the frame is handed out.
    fn acquire_frame(&self, state: &mut PoolState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.evict()?;
        let frame = &self.frames[frame_id as usize];
        let old_page_id = frame.page_id();

        debug!("evicting page {} from frame {}", old_page_id, frame_id);

        if frame.is_dirty() {
            let data = frame.data();
            self.manager
                .lock()
                .unwrap()
                .write_page(old_page_id, &data)
                .expect("disk write failed");
            frame.is_dirty.store(false, Ordering::Relaxed);
        }

        state.page_table.remove(&old_page_id);

        Some(frame_id)
    }

    /// Allocates a fresh page pinned into a frame. Returns `None` when every
    /// frame is pinned.
    pub fn new_page(&self) -> Option<(PageId, Arc<FrameHeader>)> {
        let mut state = self.state.lock().unwrap();

        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = self.allocate_page();

        let frame = &self.frames[frame_id as usize];
        frame.data_mut().fill(0);
        frame.page_id.store(page_id, Ordering::Relaxed);
        frame.pin_count.store(1, Ordering::Relaxed);
        frame.is_dirty.store(false, Ordering::Relaxed);

        state.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, AccessType::Write);
        self.replacer.set_evictable(frame_id, false);

        Some((page_id, Arc::clone(frame)))
    }

    /// Pins the requested page, reading it from disk on a miss. Returns
    /// `None` for the invalid id or when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId, access_type: AccessType) -> Option<Arc<FrameHeader>> {
        if page_id == INVALID_PAGE_ID {
            return None;
        }

        let mut state = self.state.lock().unwrap();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id as usize];
            frame.pin_count.fetch_add(1, Ordering::Relaxed);
            self.replacer.record_access(frame_id, access_type);
            self.replacer.set_evictable(frame_id, false);
            return Some(Arc::clone(frame));
        }

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id as usize];

        {
            // The read finishes before the pool mutex is released, so no
            // concurrent fetch of this page can see an uninitialized frame.
            let mut data = frame.data_mut();
            data.fill(0);
            self.manager
                .lock()
                .unwrap()
                .read_page(page_id, &mut data)
                .expect("disk read failed");
        }

        frame.page_id.store(page_id, Ordering::Relaxed);
        frame.pin_count.store(1, Ordering::Relaxed);
        frame.is_dirty.store(false, Ordering::Relaxed);

        state.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, access_type);
        self.replacer.set_evictable(frame_id, false);

        Some(Arc::clone(frame))
    }

    /// Drops one pin. The dirty hint is OR-assigned so a read-only caller
    /// cannot clear a writer's mark. The frame becomes evictable when the
    /// last pin goes away.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        if page_id == INVALID_PAGE_ID {
            return false;
        }

        let state = self.state.lock().unwrap();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id as usize];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.is_dirty.store(true, Ordering::Relaxed);
        }

        let remaining = frame.pin_count.fetch_sub(1, Ordering::Relaxed) - 1;
        if remaining == 0 {
            self.replacer.set_evictable(frame_id, true);
        }

        true
    }

    /// Writes the page back whether or not it is dirty; clears the dirty
    /// mark. `false` when the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let state = self.state.lock().unwrap();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return false;
        };

        let frame = &self.frames[frame_id as usize];
        let data = frame.data();
        self.manager
            .lock()
            .unwrap()
            .write_page(page_id, &data)
            .expect("disk write failed");
        frame.is_dirty.store(false, Ordering::Relaxed);

        true
    }

    pub fn flush_all_pages(&self) {
        // Inlined rather than delegating to flush_page, which would retake
        // the pool mutex.
        let state = self.state.lock().unwrap();
        let mut manager = self.manager.lock().unwrap();

        for (&page_id, &frame_id) in state.page_table.iter() {
            let frame = &self.frames[frame_id as usize];
            let data = frame.data();
            manager
                .write_page(page_id, &data)
                .expect("disk write failed");
            frame.is_dirty.store(false, Ordering::Relaxed);
        }
    }

    /// Evicts the page's frame back to the free list. Not resident counts
    /// as deleted; a pinned page cannot be deleted. The bytes are not
    /// written back, callers wanting durability flush first.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock().unwrap();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        let frame = &self.frames[frame_id as usize];
        if frame.pin_count() > 0 {
            return false;
        }

        state.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        state.free_list.push_back(frame_id);

        frame.data_mut().fill(0);
        frame.page_id.store(INVALID_PAGE_ID, Ordering::Relaxed);
        frame.is_dirty.store(false, Ordering::Relaxed);

        self.deallocate_page(page_id);

        true
    }

    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock().unwrap();
        let &frame_id = state.page_table.get(&page_id)?;
        Some(self.frames[frame_id as usize].pin_count())
    }

    pub fn fetch_page_basic(&self, page_id: PageId) -> Option<BasicGuard<'_>> {
        let frame = self.fetch_page(page_id, AccessType::Read)?;
        Some(BasicGuard::new(self, page_id, frame))
    }

    pub fn fetch_page_read(&self, page_id: PageId) -> Option<ReadGuard<'_>> {
        let frame = self.fetch_page(page_id, AccessType::Read)?;
        Some(ReadGuard::new(self, page_id, frame))
    }

    pub fn fetch_page_write(&self, page_id: PageId) -> Option<WriteGuard<'_>> {
        let frame = self.fetch_page(page_id, AccessType::Write)?;
        Some(WriteGuard::new(self, page_id, frame))
    }

    pub fn new_page_guarded(&self) -> Option<(PageId, BasicGuard<'_>)> {
        let (page_id, frame) = self.new_page()?;
        Some((page_id, BasicGuard::new(self, page_id, frame)))
    }
}

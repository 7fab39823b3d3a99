use std::{collections::VecDeque, sync::Mutex};

use hashlink::LinkedHashMap;

use crate::buffer::buffer_pool_manager::FrameId;

// The access type is recorded with every frame touch. Classic LRU-K treats
// all access types alike, so the replacer accepts and ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

pub trait Replacer {
    fn evict(&self) -> Option<FrameId>;
    fn record_access(&self, frame_id: FrameId, access_type: AccessType);
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);
    fn remove(&self, frame_id: FrameId);
    fn size(&self) -> usize;
}

struct LRUKNode {
    // Last up to k access timestamps, oldest at the front. While the frame
    // has fewer than k recorded accesses the front is also its first access
    // ever, which is the tie-break for infinite backward distance.
    history: VecDeque<u64>,
    is_evictable: bool,
}

impl LRUKNode {
    fn new() -> Self {
        LRUKNode {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    fn push_timestamp(&mut self, timestamp: u64, k: usize) {
        self.history.push_back(timestamp);
        if self.history.len() > k {
            self.history.pop_front();
        }
    }

    fn oldest_retained(&self) -> u64 {
        *self.history.front().expect("tracked frame has no history")
    }
}

struct ReplacerInner {
    node_store: LinkedHashMap<FrameId, LRUKNode>,
    current_timestamp: u64,
    // Number of evictable frames, not tracked frames.
    curr_size: usize,
}

/// Picks the frame whose k-th most recent access lies furthest in the past.
/// Frames with fewer than k accesses count as infinitely far and are
/// preferred, earliest first access first.
pub struct LRUKReplacer {
    inner: Mutex<ReplacerInner>,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k >= 1, "lru-k requires k >= 1");

        LRUKReplacer {
            inner: Mutex::new(ReplacerInner {
                node_store: LinkedHashMap::new(),
                current_timestamp: 0,
                curr_size: 0,
            }),
            replacer_size: num_frames,
            k,
        }
    }

    fn check_frame_id(&self, frame_id: FrameId) {
        if frame_id as usize >= self.replacer_size {
            panic!(
                "frame id {} out of range, replacer tracks {} frames",
                frame_id, self.replacer_size
            );
        }
    }
}

impl Replacer for LRUKReplacer {
    fn evict(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock().unwrap();

        if inner.curr_size == 0 {
            return None;
        }

        let now = inner.current_timestamp;

        let mut victim: Option<FrameId> = None;
        let mut victim_is_infinite = false;
        // First access for the infinite class, backward k-distance for the
        // finite class.
        let mut victim_key = 0u64;

        for (&frame_id, node) in inner.node_store.iter() {
            if !node.is_evictable {
                continue;
            }

            let oldest = node.oldest_retained();

            if node.history.len() < self.k {
                if !victim_is_infinite || oldest < victim_key {
                    victim = Some(frame_id);
                    victim_is_infinite = true;
                    victim_key = oldest;
                }
            } else if !victim_is_infinite {
                // Front of the retained window is the k-th most recent access.
                let distance = now - oldest;
                if victim.is_none() || distance > victim_key {
                    victim = Some(frame_id);
                    victim_key = distance;
                }
            }
        }

        let frame_id = victim?;
        inner.node_store.remove(&frame_id);
        inner.curr_size -= 1;

        Some(frame_id)
    }

    fn record_access(&self, frame_id: FrameId, _access_type: AccessType) {
        self.check_frame_id(frame_id);

        let mut inner = self.inner.lock().unwrap();

        inner.current_timestamp += 1;
        let timestamp = inner.current_timestamp;

        let node = inner
            .node_store
            .entry(frame_id)
            .or_insert_with(LRUKNode::new);
        node.push_timestamp(timestamp, self.k);
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.check_frame_id(frame_id);

        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if let Some(node) = inner.node_store.get_mut(&frame_id) {
            if node.is_evictable != evictable {
                node.is_evictable = evictable;
                if evictable {
                    inner.curr_size += 1;
                } else {
                    inner.curr_size -= 1;
                }
            }
        }
    }

    fn remove(&self, frame_id: FrameId) {
        self.check_frame_id(frame_id);

        let mut inner = self.inner.lock().unwrap();

        let Some(node) = inner.node_store.get(&frame_id) else {
            return;
        };

        // Callers must clear the pin before forgetting a frame.
        if !node.is_evictable {
            panic!("remove called on non-evictable frame {}", frame_id);
        }

        inner.node_store.remove(&frame_id);
        inner.curr_size -= 1;
    }

    fn size(&self) -> usize {
        self.inner.lock().unwrap().curr_size
    }
}

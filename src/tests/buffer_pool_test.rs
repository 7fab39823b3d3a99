#[cfg(test)]
pub mod test {
    use byteorder::{ByteOrder, LittleEndian};
    use tempfile::TempDir;

    use crate::{
        buffer::buffer_pool_manager::BufferPoolManager,
        storage::{
            disk::manager::Manager,
            page::page::page_constants::{INVALID_PAGE_ID, PAGE_SIZE},
        },
        utils::replacer::AccessType,
    };

    const NUM_FRAMES: usize = 10;
    const K_DIST: usize = 2;

    fn setup(dir: &TempDir, pool_size: usize) -> BufferPoolManager {
        let _ = env_logger::builder().try_init();

        let manager = Manager::new(dir.path().join("test.db")).unwrap();
        BufferPoolManager::new(pool_size, manager, K_DIST)
    }

    #[test]
    fn guard_drop_releases_pin() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, NUM_FRAMES);

        {
            let (pid_0, guard) = bpm.new_page_guarded().unwrap();
            assert_eq!(Some(1), bpm.get_pin_count(pid_0));
            drop(guard);
            assert_eq!(Some(0), bpm.get_pin_count(pid_0));
        }

        let (pid_1, frame) = bpm.new_page().unwrap();
        assert_eq!(Some(1), bpm.get_pin_count(pid_1));
        assert!(bpm.unpin_page(pid_1, false));
        drop(frame);

        {
            let _read_one = bpm.fetch_page_read(pid_1).unwrap();
            assert_eq!(Some(1), bpm.get_pin_count(pid_1));

            let _read_two = bpm.fetch_page_read(pid_1).unwrap();
            assert_eq!(Some(2), bpm.get_pin_count(pid_1));
        } // Both guards drop here.

        assert_eq!(Some(0), bpm.get_pin_count(pid_1));

        {
            let write = bpm.fetch_page_write(pid_1).unwrap();
            assert_eq!(Some(1), bpm.get_pin_count(pid_1));
            drop(write);
        }

        assert_eq!(Some(0), bpm.get_pin_count(pid_1));
    }

    #[test]
    fn data_survives_eviction() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, NUM_FRAMES);

        let marked_pid;
        {
            let (pid, mut guard) = bpm.new_page_guarded().unwrap();
            let mut data = guard.data_mut();
            LittleEndian::write_u32(&mut data[..4], 0xDEAD_BEEF);
            marked_pid = pid;
        }

        // Fill the pool twice over so the marked page is forced to disk.
        let mut page_ids: Vec<u32> = Vec::new();
        for _ in 0..2 * NUM_FRAMES {
            let (pid, mut guard) = bpm.new_page_guarded().unwrap();
            let mut data = guard.data_mut();
            LittleEndian::write_u32(&mut data[..4], pid);
            page_ids.push(pid);
        }

        assert_eq!(None, bpm.get_pin_count(marked_pid));

        let guard = bpm.fetch_page_read(marked_pid).unwrap();
        assert_eq!(0xDEAD_BEEF, LittleEndian::read_u32(&guard.data()[..4]));
        drop(guard);

        // Every filler page kept its stamp through its own eviction.
        for pid in page_ids {
            let guard = bpm.fetch_page_read(pid).unwrap();
            assert_eq!(pid, LittleEndian::read_u32(&guard.data()[..4]));
        }
    }

    #[test]
    fn miss_path_writes_back_dirty_victim() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, 1);

        let (pid_0, frame) = bpm.new_page().unwrap();
        {
            let mut data = frame.data_mut();
            LittleEndian::write_u32(&mut data[..4], 7);
        }
        drop(frame);
        assert!(bpm.unpin_page(pid_0, true));

        // A page that was never written: the sole frame is evicted,
        // reassigned, and comes back zero filled from disk.
        let ghost_pid = pid_0 + 1;
        let frame = bpm.fetch_page(ghost_pid, AccessType::Read).unwrap();
        assert_eq!(ghost_pid, frame.page_id());
        assert!(frame.data().iter().all(|byte| *byte == 0));
        assert_eq!(None, bpm.get_pin_count(pid_0));
        drop(frame);
        assert!(bpm.unpin_page(ghost_pid, false));

        // The dirty victim went to disk on the way out.
        let frame = bpm.fetch_page(pid_0, AccessType::Read).unwrap();
        assert_eq!(7, LittleEndian::read_u32(&frame.data()[..4]));
    }

    #[test]
    fn saturated_pool_rejects_new_pages() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, 2);

        let (pid_0, _frame_0) = bpm.new_page().unwrap();
        let (pid_1, _frame_1) = bpm.new_page().unwrap();

        // Both frames pinned: nothing to evict.
        assert!(bpm.new_page().is_none());
        assert!(bpm.fetch_page(pid_1 + 1, AccessType::Read).is_none());

        // A resident page can still be fetched at saturation.
        let frame = bpm.fetch_page(pid_1, AccessType::Read).unwrap();
        assert_eq!(Some(2), bpm.get_pin_count(pid_1));
        drop(frame);
        assert!(bpm.unpin_page(pid_1, false));

        assert!(bpm.unpin_page(pid_0, false));
        assert!(bpm.new_page().is_some());
    }

    #[test]
    fn unpin_contract() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, NUM_FRAMES);

        assert!(!bpm.unpin_page(INVALID_PAGE_ID, false));
        assert!(!bpm.unpin_page(999, false));

        let (pid, _frame) = bpm.new_page().unwrap();
        assert!(bpm.unpin_page(pid, false));

        // The pin is already gone.
        assert!(!bpm.unpin_page(pid, false));
    }

    #[test]
    fn dirty_hint_is_sticky() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, 1);

        let (pid, frame) = bpm.new_page().unwrap();
        {
            let mut data = frame.data_mut();
            LittleEndian::write_u32(&mut data[..4], 99);
        }
        drop(frame);
        assert!(bpm.unpin_page(pid, true));

        // A read-only unpin afterwards must not clear the dirty mark.
        let frame = bpm.fetch_page(pid, AccessType::Read).unwrap();
        drop(frame);
        assert!(bpm.unpin_page(pid, false));

        // Evict the page; the write-back must still happen.
        let frame = bpm.fetch_page(pid + 1, AccessType::Read).unwrap();
        drop(frame);
        assert!(bpm.unpin_page(pid + 1, false));

        let frame = bpm.fetch_page(pid, AccessType::Read).unwrap();
        assert_eq!(99, LittleEndian::read_u32(&frame.data()[..4]));
    }

    #[test]
    fn delete_page_contract() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, 2);

        let (pid_0, _frame) = bpm.new_page().unwrap();

        // Pinned pages cannot be deleted.
        assert!(!bpm.delete_page(pid_0));

        assert!(bpm.unpin_page(pid_0, false));
        assert!(bpm.delete_page(pid_0));
        assert_eq!(None, bpm.get_pin_count(pid_0));

        // Already gone and never existed both count as deleted.
        assert!(bpm.delete_page(pid_0));
        assert!(bpm.delete_page(12345));

        // The freed frame hosts new pages again without any eviction.
        let (pid_1, _frame_1) = bpm.new_page().unwrap();
        let (pid_2, _frame_2) = bpm.new_page().unwrap();
        assert_ne!(pid_1, pid_0);
        assert_ne!(pid_2, pid_0);
    }

    #[test]
    fn flush_page_is_durable() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");

        let manager = Manager::new(&db_path).unwrap();
        let bpm = BufferPoolManager::new(NUM_FRAMES, manager, K_DIST);

        let (pid, mut guard) = bpm.new_page_guarded().unwrap();
        {
            let mut data = guard.data_mut();
            LittleEndian::write_u32(&mut data[..4], 42);
        }
        drop(guard);

        assert!(bpm.flush_page(pid));
        assert!(!bpm.flush_page(999));

        // Read the file back through an independent manager.
        let mut check = Manager::new(&db_path).unwrap();
        let mut buffer = [0u8; PAGE_SIZE];
        check.read_page(pid, &mut buffer).unwrap();
        assert_eq!(42, LittleEndian::read_u32(&buffer[..4]));
    }

    #[test]
    fn flush_all_pages_writes_every_resident_page() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("test.db");

        let manager = Manager::new(&db_path).unwrap();
        let bpm = BufferPoolManager::new(NUM_FRAMES, manager, K_DIST);

        let mut page_ids: Vec<u32> = Vec::new();
        for i in 0..3u32 {
            let (pid, mut guard) = bpm.new_page_guarded().unwrap();
            let mut data = guard.data_mut();
            LittleEndian::write_u32(&mut data[..4], i + 100);
            page_ids.push(pid);
        }

        bpm.flush_all_pages();

        let mut check = Manager::new(&db_path).unwrap();
        for (i, pid) in page_ids.into_iter().enumerate() {
            let mut buffer = [0u8; PAGE_SIZE];
            check.read_page(pid, &mut buffer).unwrap();
            assert_eq!(i as u32 + 100, LittleEndian::read_u32(&buffer[..4]));
        }
    }

    #[test]
    fn fetch_rejects_invalid_page_id() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, NUM_FRAMES);

        assert!(bpm.fetch_page(INVALID_PAGE_ID, AccessType::Read).is_none());
        assert!(bpm.fetch_page_read(INVALID_PAGE_ID).is_none());
    }

    #[test]
    fn basic_guard_upgrades() {
        let dir = TempDir::new().unwrap();
        let bpm = setup(&dir, NUM_FRAMES);

        let pid;
        {
            let (new_pid, guard) = bpm.new_page_guarded().unwrap();
            pid = new_pid;

            let mut write = guard.upgrade_write();
            let mut data = write.data_mut();
            LittleEndian::write_u32(&mut data[..4], 5);
        }
        assert_eq!(Some(0), bpm.get_pin_count(pid));

        {
            let basic = bpm.fetch_page_basic(pid).unwrap();
            let read = basic.upgrade_read();
            assert_eq!(5, LittleEndian::read_u32(&read.data()[..4]));
            assert_eq!(pid, read.page_id());
        }
        assert_eq!(Some(0), bpm.get_pin_count(pid));
    }
}

pub mod page_constants {
    /// Size of a page slab on disk and of every buffer pool frame.
    pub const PAGE_SIZE: usize = 1024 * 4;

    /// Reserved id, never handed out by the allocator.
    pub const INVALID_PAGE_ID: u32 = u32::MAX;
}

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use log::debug;

use crate::{buffer::buffer_pool_manager::PageId, storage::page::page::page_constants::PAGE_SIZE};

/// Synchronous page store over a single database file. Pages live at
/// `page_id * PAGE_SIZE`; the file grows as higher ids are written.
pub struct Manager {
    db_io: File,
    db_file_name: PathBuf,

    num_writes: u32,
    num_flushes: u32,
}

impl Manager {
    pub fn new(db_file: impl AsRef<Path>) -> Result<Self> {
        let path = db_file.as_ref();

        let db_io = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .with_context(|| format!("failed to open db file {}", path.display()))?;

        Ok(Manager {
            db_io,
            db_file_name: path.to_path_buf(),
            num_writes: 0,
            num_flushes: 0,
        })
    }

    pub fn write_page(&mut self, page_id: PageId, page_data: &[u8]) -> Result<()> {
        if page_data.len() != PAGE_SIZE {
            bail!(
                "write buffer for page {} is {} bytes, expected {}",
                page_id,
                page_data.len(),
                PAGE_SIZE
            );
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;

        self.db_io
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek failed for page {}", page_id))?;

        self.db_io
            .write_all(page_data)
            .with_context(|| format!("write failed for page {}", page_id))?;

        self.db_io
            .flush()
            .with_context(|| format!("flush failed for page {}", page_id))?;

        self.num_writes += 1;
        self.num_flushes += 1;

        Ok(())
    }

    pub fn read_page(&mut self, page_id: PageId, page_data: &mut [u8]) -> Result<()> {
        if page_data.len() != PAGE_SIZE {
            bail!(
                "read buffer for page {} is {} bytes, expected {}",
                page_id,
                page_data.len(),
                PAGE_SIZE
            );
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let file_len = self
            .db_io
            .metadata()
            .context("failed to stat db file")?
            .len();

        // Reads past the end of the file are legal: the page has been
        // allocated but never written. Hand back zeroes.
        if offset >= file_len {
            debug!(
                "read of page {} past end of {}, zero filling",
                page_id,
                self.db_file_name.display()
            );
            page_data.fill(0);
            return Ok(());
        }

        self.db_io
            .seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek failed for page {}", page_id))?;

        let mut read = 0;
        while read < PAGE_SIZE {
            let n = self
                .db_io
                .read(&mut page_data[read..])
                .with_context(|| format!("read failed for page {}", page_id))?;
            if n == 0 {
                break;
            }
            read += n;
        }

        if read < PAGE_SIZE {
            debug!("short read of page {}, zero filling {} bytes", page_id, PAGE_SIZE - read);
            page_data[read..].fill(0);
        }

        Ok(())
    }

    pub fn num_writes(&self) -> u32 {
        self.num_writes
    }

    pub fn num_flushes(&self) -> u32 {
        self.num_flushes
    }
}

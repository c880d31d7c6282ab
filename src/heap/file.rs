//! Page-granular heap file I/O.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::HeapError;
use super::page::{HeapPage, PAGE_SIZE};
use super::Rid;

/// A heap file storing records as fixed-size slotted pages.
///
/// # File Layout
///
/// ```text
/// +------------------+------------------+------------------+
/// | Page 0 (8KB)     | Page 1 (8KB)     | Page 2 (8KB)     | ...
/// +------------------+------------------+------------------+
/// ^ offset 0         ^ offset 8192      ^ offset 16384
/// ```
///
/// Records are always appended to the last page; a full page starts a new
/// one. Page I/O goes straight through `std::fs`: the engine is a
/// single-threaded process and statements run to completion, so there is
/// no page cache to keep coherent.
pub struct HeapFile {
    path: PathBuf,
    file: File,
    page_count: u32,
}

impl HeapFile {
    /// Opens or creates a heap file at the given path.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::Corrupted` if the file size is not a multiple
    /// of the page size.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HeapError> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(HeapError::Corrupted(format!(
                "file size {} is not a multiple of page size {}",
                file_size, PAGE_SIZE
            )));
        }

        Ok(Self {
            path,
            file,
            page_count: (file_size / PAGE_SIZE as u64) as u32,
        })
    }

    /// Returns the path of the heap file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of pages in the file.
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    fn read_page(&mut self, page: u32) -> Result<HeapPage, HeapError> {
        if page >= self.page_count {
            return Err(HeapError::Corrupted(format!(
                "page {} out of range ({} pages)",
                page, self.page_count
            )));
        }
        let mut buf = vec![0u8; PAGE_SIZE];
        self.file
            .seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        self.file.read_exact(&mut buf)?;
        HeapPage::from_buf(buf.into_boxed_slice().try_into().expect("exact page buffer"))
    }

    fn write_page(&mut self, page: u32, data: &HeapPage) -> Result<(), HeapError> {
        self.file
            .seek(SeekFrom::Start(page as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(data.as_bytes())?;
        Ok(())
    }

    /// Appends a record, returning its rid.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::RecordTooLarge` if the record exceeds the page
    /// capacity.
    pub fn insert(&mut self, data: &[u8]) -> Result<Rid, HeapError> {
        // Try the last page first; start a fresh one when it is full.
        if self.page_count > 0 {
            let page_no = self.page_count - 1;
            let mut page = self.read_page(page_no)?;
            if page.fits(data.len()) {
                let slot = page.insert(data)?;
                self.write_page(page_no, &page)?;
                return Ok(Rid {
                    page: page_no,
                    slot,
                });
            }
        }

        let mut page = HeapPage::new();
        let slot = page.insert(data)?;
        let page_no = self.page_count;
        self.write_page(page_no, &page)?;
        self.page_count += 1;
        Ok(Rid {
            page: page_no,
            slot,
        })
    }

    /// Reads the record at `rid`.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::InvalidRid` if no live record exists there.
    pub fn get(&mut self, rid: Rid) -> Result<Vec<u8>, HeapError> {
        if rid.page >= self.page_count {
            return Err(HeapError::InvalidRid(rid));
        }
        let page = self.read_page(rid.page)?;
        page.get(rid.slot)
            .map(|data| data.to_vec())
            .ok_or(HeapError::InvalidRid(rid))
    }

    /// Rewrites the record at `rid` in place. Returns false when the new
    /// payload does not fit in its page; the record is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::InvalidRid` if no live record exists there.
    pub fn update(&mut self, rid: Rid, data: &[u8]) -> Result<bool, HeapError> {
        if rid.page >= self.page_count {
            return Err(HeapError::InvalidRid(rid));
        }
        let mut page = self.read_page(rid.page)?;
        if page.get(rid.slot).is_none() {
            return Err(HeapError::InvalidRid(rid));
        }
        if !page.update(rid.slot, data) {
            return Ok(false);
        }
        self.write_page(rid.page, &page)?;
        Ok(true)
    }

    /// Deletes the record at `rid`. Returns false if it was already dead.
    pub fn delete(&mut self, rid: Rid) -> Result<bool, HeapError> {
        if rid.page >= self.page_count {
            return Ok(false);
        }
        let mut page = self.read_page(rid.page)?;
        if !page.delete(rid.slot) {
            return Ok(false);
        }
        self.write_page(rid.page, &page)?;
        Ok(true)
    }

    /// Visits every live record in page/slot order (insertion order for a
    /// heap that never saw a delete), collecting `(rid, bytes)` pairs.
    pub fn scan_all(&mut self) -> Result<Vec<(Rid, Vec<u8>)>, HeapError> {
        let mut out = Vec::new();
        for page_no in 0..self.page_count {
            let page = self.read_page(page_no)?;
            for slot in 0..page.slot_count() {
                if let Some(data) = page.get(slot) {
                    out.push((
                        Rid {
                            page: page_no,
                            slot,
                        },
                        data.to_vec(),
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Truncates the file to zero pages.
    pub fn truncate(&mut self) -> Result<(), HeapError> {
        self.file.set_len(0)?;
        self.page_count = 0;
        Ok(())
    }

    /// Flushes pending writes to disk.
    pub fn sync(&mut self) -> Result<(), HeapError> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_heap() -> (tempfile::TempDir, HeapFile) {
        let dir = tempfile::tempdir().unwrap();
        let heap = HeapFile::open(dir.path().join("t.tdata")).unwrap();
        (dir, heap)
    }

    #[test]
    fn test_insert_get_roundtrip() {
        let (_dir, mut heap) = temp_heap();
        let a = heap.insert(b"first").unwrap();
        let b = heap.insert(b"second").unwrap();
        assert_eq!(heap.get(a).unwrap(), b"first");
        assert_eq!(heap.get(b).unwrap(), b"second");
    }

    #[test]
    fn test_scan_insertion_order() {
        let (_dir, mut heap) = temp_heap();
        // Spill over several pages
        for i in 0..1000u32 {
            heap.insert(format!("record-{:04}", i).as_bytes()).unwrap();
        }
        assert!(heap.page_count() > 1);
        let rows = heap.scan_all().unwrap();
        assert_eq!(rows.len(), 1000);
        for (i, (_, data)) in rows.iter().enumerate() {
            assert_eq!(data, format!("record-{:04}", i).as_bytes());
        }
    }

    #[test]
    fn test_delete_and_rescan() {
        let (_dir, mut heap) = temp_heap();
        let a = heap.insert(b"a").unwrap();
        let b = heap.insert(b"b").unwrap();
        assert!(heap.delete(a).unwrap());
        assert!(!heap.delete(a).unwrap());
        let rows = heap.scan_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, b);
        assert!(matches!(heap.get(a), Err(HeapError::InvalidRid(_))));
    }

    #[test]
    fn test_update_keeps_rid() {
        let (_dir, mut heap) = temp_heap();
        let rid = heap.insert(b"short").unwrap();
        assert!(heap.update(rid, b"a considerably longer payload").unwrap());
        assert_eq!(heap.get(rid).unwrap(), b"a considerably longer payload");
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.tdata");
        let rid = {
            let mut heap = HeapFile::open(&path).unwrap();
            let rid = heap.insert(b"durable").unwrap();
            heap.sync().unwrap();
            rid
        };
        let mut heap = HeapFile::open(&path).unwrap();
        assert_eq!(heap.get(rid).unwrap(), b"durable");
    }
}

//! Supplemental page table: per-process map from user virtual page to the
//! metadata needed to materialize its contents.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{KernelError, KernelResult};
use crate::fs::file::File;
use crate::process::pcb::ProcessId;

use super::{frame_table, pagedir, VirtualAddress, PAGE_SIZE};

/// What an SPT entry's page is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpteKind {
    /// Anonymous, writable, swappable. Stack pages and promoted FILE pages.
    Code,
    /// Read-only, executable-backed. Dropped (never swapped) on eviction.
    File,
    /// Memory-mapped file page. Dirty pages are written back on eviction.
    Mmap,
}

/// A single supplemental page table entry.
pub struct SptEntry {
    pub kind: SpteKind,
    pub upage: VirtualAddress,
    /// Kernel virtual address of the backing frame, when resident.
    pub frame: Option<u64>,
    pub file: Option<Arc<File>>,
    pub ofs: u64,
    pub page_read_bytes: usize,
    pub page_zero_bytes: usize,
    pub writable: bool,
    pub pinned: bool,
    pub in_swap: bool,
    pub swap_idx: Option<usize>,
}

impl SptEntry {
    fn lazy(kind: SpteKind, upage: VirtualAddress, writable: bool) -> Self {
        Self {
            kind,
            upage,
            frame: None,
            file: None,
            ofs: 0,
            page_read_bytes: 0,
            page_zero_bytes: PAGE_SIZE,
            writable,
            pinned: false,
            in_swap: false,
            swap_idx: None,
        }
    }

    pub fn resident(&self) -> bool {
        self.frame.is_some()
    }
}

/// Shared handle to an SPT entry. The frame table holds clones of these
/// rather than a raw back-pointer into the SPT's storage.
pub type SpteHandle = Arc<Mutex<SptEntry>>;

/// Per-process supplemental page table.
pub struct SupplementalPageTable {
    owner: ProcessId,
    entries: BTreeMap<u64, SpteHandle>,
}

impl SupplementalPageTable {
    /// `spt_init`: create an empty table for `owner`.
    pub fn new(owner: ProcessId) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    /// `spt_find`: round `uvaddr` down to the page and look up.
    pub fn find(&self, uvaddr: VirtualAddress) -> Option<SpteHandle> {
        let key = uvaddr.page_align_down().as_u64();
        self.entries.get(&key).cloned()
    }

    fn insert(&mut self, entry: SptEntry) -> SpteHandle {
        let key = entry.upage.as_u64();
        let handle = Arc::new(Mutex::new(entry));
        self.entries.insert(key, handle.clone());
        handle
    }

    /// Install a sequence of FILE entries spanning `read_bytes + zero_bytes`
    /// starting at `upage`, one per page. Lazy: no frame is allocated yet.
    pub fn create_file_region(
        &mut self,
        file: Arc<File>,
        ofs: u64,
        upage: VirtualAddress,
        read_bytes: usize,
        zero_bytes: usize,
        writable: bool,
    ) {
        let total = read_bytes + zero_bytes;
        let mut remaining_read = read_bytes;
        let mut remaining_zero = zero_bytes;
        let mut page = upage.as_u64();
        let mut file_ofs = ofs;
        let mut consumed = 0usize;

        while consumed < total {
            let page_read = remaining_read.min(PAGE_SIZE);
            let page_zero = PAGE_SIZE - page_read;
            remaining_read -= page_read;
            remaining_zero = remaining_zero.saturating_sub(page_zero);
            let _ = remaining_zero;

            let entry = SptEntry {
                kind: SpteKind::File,
                upage: VirtualAddress::new(page),
                frame: None,
                file: Some(file.clone()),
                ofs: file_ofs,
                page_read_bytes: page_read,
                page_zero_bytes: page_zero,
                writable,
                pinned: false,
                in_swap: false,
                swap_idx: None,
            };
            self.insert(entry);

            page += PAGE_SIZE as u64;
            file_ofs += page_read as u64;
            consumed += PAGE_SIZE;
        }
    }

    /// Install a sequence of MMAP entries covering `length` bytes starting
    /// at `upage`. Fails and rolls back if any target page is already
    /// occupied, giving atomic `mmap` semantics.
    pub fn create_mmap_region(
        &mut self,
        file: Arc<File>,
        length: usize,
        upage: VirtualAddress,
    ) -> Option<SpteHandle> {
        self.create_mmap_region_at(file, 0, length, upage)
    }

    /// As [`Self::create_mmap_region`], but the file region backing the
    /// mapping starts at `file_ofs` instead of the beginning of the file.
    pub fn create_mmap_region_at(
        &mut self,
        file: Arc<File>,
        file_ofs: u64,
        length: usize,
        upage: VirtualAddress,
    ) -> Option<SpteHandle> {
        let num_pages = length.div_ceil(PAGE_SIZE);
        for i in 0..num_pages {
            let page = upage.as_u64() + (i * PAGE_SIZE) as u64;
            if self.entries.contains_key(&page) {
                return None;
            }
        }

        let mut first = None;
        for i in 0..num_pages {
            let page = upage.as_u64() + (i * PAGE_SIZE) as u64;
            let ofs = file_ofs + (i * PAGE_SIZE) as u64;
            let page_read = (length - i * PAGE_SIZE).min(PAGE_SIZE);
            let page_zero = PAGE_SIZE - page_read;

            let entry = SptEntry {
                kind: SpteKind::Mmap,
                upage: VirtualAddress::new(page),
                frame: None,
                file: Some(file.clone()),
                ofs,
                page_read_bytes: page_read,
                page_zero_bytes: page_zero,
                writable: true,
                pinned: false,
                in_swap: false,
                swap_idx: None,
            };
            let handle = self.insert(entry);
            if first.is_none() {
                first = Some(handle);
            }
        }
        first
    }

    /// `create_code`: anonymous CODE page, used by stack growth and
    /// FILE-to-CODE promotion.
    pub fn create_code(&mut self, upage: VirtualAddress, writable: bool) -> SpteHandle {
        self.insert(SptEntry::lazy(SpteKind::Code, upage, writable))
    }

    /// Remove the entry for `upage` without touching its frame or the MMU;
    /// used once the caller has already torn the page down.
    fn remove(&mut self, upage: VirtualAddress) -> Option<SpteHandle> {
        self.entries.remove(&upage.as_u64())
    }

    /// `free_mmap_region`: tear down the MMAP region beginning at
    /// `first.upage`, writing back dirty pages and dropping each entry.
    pub fn free_mmap_region(&mut self, first: &SpteHandle, page_table_root: u64) -> KernelResult<()> {
        let (start, file) = {
            let e = first.lock();
            (e.upage.as_u64(), e.file.clone())
        };
        let file = file.ok_or(KernelError::InvalidArgument {
            name: "mmap_region",
            value: "entry has no backing file",
        })?;
        let length = file.length()?;
        let num_pages = (length as usize).div_ceil(PAGE_SIZE);

        for i in 0..num_pages {
            let page = VirtualAddress::new(start + (i * PAGE_SIZE) as u64);
            let Some(handle) = self.find(page) else {
                continue;
            };
            {
                let entry = handle.lock();
                if entry.file.as_ref().map(|f| Arc::ptr_eq(f, &file)) != Some(true) {
                    continue;
                }
            }
            writeback_if_dirty(&handle, page_table_root)?;
            if let Some(frame) = handle.lock().frame.take() {
                frame_table::free_frame(frame);
            }
            pagedir::pagedir_clear_page(page_table_root, page);
            self.remove(page);
        }
        Ok(())
    }

    /// `spt_destroy`: tear down every entry. Writes back dirty MMAP/writable
    /// FILE pages, clears MMU mappings, frees frames, and releases swap
    /// slots still held by CODE entries.
    pub fn destroy(&mut self, page_table_root: u64) {
        let handles: Vec<SpteHandle> = self.entries.values().cloned().collect();
        for handle in handles {
            let upage = handle.lock().upage;
            if let Err(e) = writeback_if_dirty(&handle, page_table_root) {
                log::warn!("[spt] writeback failed during destroy: {e:?}");
            }
            let mut entry = handle.lock();
            if let Some(frame) = entry.frame.take() {
                drop(entry);
                pagedir::pagedir_clear_page(page_table_root, upage);
                frame_table::free_frame(frame);
            } else if let Some(slot) = entry.swap_idx.take() {
                entry.in_swap = false;
                drop(entry);
                super::swap::free_slot(slot);
            }
        }
        self.entries.clear();
        log::debug!("[spt] destroyed supplemental page table for {:?}", self.owner);
    }

    pub fn owner(&self) -> ProcessId {
        self.owner
    }
}

/// Write the page backing `handle` to its file if it is resident, MMAP or
/// writable-FILE, and the MMU dirty bit is set.
fn writeback_if_dirty(handle: &SpteHandle, page_table_root: u64) -> KernelResult<()> {
    let (kind, upage, frame, file, ofs, read_bytes) = {
        let e = handle.lock();
        (e.kind, e.upage, e.frame, e.file.clone(), e.ofs, e.page_read_bytes)
    };
    if !matches!(kind, SpteKind::Mmap) || frame.is_none() {
        return Ok(());
    }
    if !pagedir::pagedir_is_dirty(page_table_root, upage) {
        return Ok(());
    }
    let frame = frame.unwrap();
    let file = file.ok_or(KernelError::InvalidArgument {
        name: "mmap_entry",
        value: "entry has no backing file",
    })?;
    // SAFETY: `frame` is a kernel virtual address of a live, resident frame
    // owned by this SPT entry; it remains valid for the duration of this
    // read because the frame table lock (or the caller's teardown path) has
    // excluded concurrent eviction.
    let bytes = unsafe { core::slice::from_raw_parts(frame as *const u8, read_bytes) };
    file.write_at(ofs as usize, bytes)?;
    pagedir::pagedir_set_dirty(page_table_root, upage, false);
    Ok(())
}

/// Materialize `handle`'s page: obtain a frame, fill its contents according
/// to `kind`, and install the MMU mapping. Dispatch point named
/// `install_load_page` in the host specification.
pub fn install_load_page(
    handle: &SpteHandle,
    owner: ProcessId,
    page_table_root: u64,
) -> KernelResult<()> {
    let (kind, upage, writable, in_swap) = {
        let e = handle.lock();
        (e.kind, e.upage, e.writable, e.in_swap)
    };

    match kind {
        SpteKind::File | SpteKind::Mmap => {
            let frame_kaddr =
                frame_table::frame_alloc_for(owner, page_table_root, handle.clone(), false)?;
            let (file, ofs, read_bytes, zero_bytes) = {
                let e = handle.lock();
                (e.file.clone(), e.ofs, e.page_read_bytes, e.page_zero_bytes)
            };
            let result = (|| -> KernelResult<()> {
                let file = file.ok_or(KernelError::InvalidArgument {
                    name: "file_region",
                    value: "entry has no backing file",
                })?;
                // SAFETY: frame_kaddr was just allocated and registered in
                // the frame table for this entry; nothing else can alias it
                // until this function records it in the SPT entry below.
                let buf = unsafe {
                    core::slice::from_raw_parts_mut(frame_kaddr as *mut u8, read_bytes)
                };
                let got = file.read_at(ofs as usize, buf)?;
                if got != read_bytes {
                    return Err(KernelError::InvalidState {
                        expected: "full page read from backing file",
                        actual: "short read",
                    });
                }
                if zero_bytes > 0 {
                    // SAFETY: see above; writes the trailing zero-fill region.
                    unsafe {
                        core::ptr::write_bytes(
                            (frame_kaddr as usize + read_bytes) as *mut u8,
                            0,
                            zero_bytes,
                        );
                    }
                }
                Ok(())
            })();

            if let Err(e) = result {
                frame_table::free_frame(frame_kaddr);
                return Err(e);
            }

            if !pagedir::install_page(page_table_root, upage, frame_kaddr, writable) {
                frame_table::free_frame(frame_kaddr);
                return Err(KernelError::InvalidAddress {
                    addr: upage.as_usize(),
                });
            }
            handle.lock().frame = Some(frame_kaddr);
            Ok(())
        }
        SpteKind::Code => {
            let frame_kaddr =
                frame_table::frame_alloc_for(owner, page_table_root, handle.clone(), true)?;
            if !pagedir::install_page(page_table_root, upage, frame_kaddr, true) {
                frame_table::free_frame(frame_kaddr);
                return Err(KernelError::InvalidAddress {
                    addr: upage.as_usize(),
                });
            }
            if in_swap {
                let slot = handle.lock().swap_idx.take().unwrap();
                super::swap::swap_in(slot, frame_kaddr)?;
                let mut e = handle.lock();
                e.in_swap = false;
            }
            handle.lock().frame = Some(frame_kaddr);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::file::OpenFlags;
    use crate::fs::{DirEntry, Metadata, NodeType, Permissions, VfsNode};

    /// Minimal in-memory [`VfsNode`] backing a fixed byte buffer, standing
    /// in for a real file so `create_file_region`/`create_mmap_region` can
    /// be exercised without a mounted filesystem.
    struct TestNode {
        data: spin::Mutex<Vec<u8>>,
    }

    impl VfsNode for TestNode {
        fn node_type(&self) -> NodeType {
            NodeType::File
        }

        fn read(&self, offset: usize, buffer: &mut [u8]) -> Result<usize, &'static str> {
            let data = self.data.lock();
            if offset >= data.len() {
                return Ok(0);
            }
            let n = buffer.len().min(data.len() - offset);
            buffer[..n].copy_from_slice(&data[offset..offset + n]);
            Ok(n)
        }

        fn write(&self, offset: usize, data: &[u8]) -> Result<usize, &'static str> {
            let mut buf = self.data.lock();
            if offset + data.len() > buf.len() {
                buf.resize(offset + data.len(), 0);
            }
            buf[offset..offset + data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        fn metadata(&self) -> Result<Metadata, &'static str> {
            Ok(Metadata {
                node_type: NodeType::File,
                size: self.data.lock().len(),
                permissions: Permissions::default(),
                uid: 0,
                gid: 0,
                created: 0,
                modified: 0,
                accessed: 0,
            })
        }

        fn readdir(&self) -> Result<Vec<DirEntry>, &'static str> {
            Err("not a directory")
        }

        fn lookup(&self, _name: &str) -> Result<Arc<dyn VfsNode>, &'static str> {
            Err("not a directory")
        }

        fn create(
            &self,
            _name: &str,
            _permissions: Permissions,
        ) -> Result<Arc<dyn VfsNode>, &'static str> {
            Err("not a directory")
        }

        fn mkdir(
            &self,
            _name: &str,
            _permissions: Permissions,
        ) -> Result<Arc<dyn VfsNode>, &'static str> {
            Err("not a directory")
        }

        fn unlink(&self, _name: &str) -> Result<(), &'static str> {
            Err("not a directory")
        }

        fn truncate(&self, size: usize) -> Result<(), &'static str> {
            self.data.lock().resize(size, 0);
            Ok(())
        }
    }

    fn test_file(data: &[u8]) -> Arc<File> {
        let node: Arc<dyn VfsNode> = Arc::new(TestNode {
            data: spin::Mutex::new(data.to_vec()),
        });
        Arc::new(File::new(node, OpenFlags::read_write()))
    }

    #[test]
    fn find_rounds_down_to_page() {
        let mut spt = SupplementalPageTable::new(ProcessId(1));
        let page = VirtualAddress::new(0x4000);
        spt.create_code(page, true);
        let found = spt.find(VirtualAddress::new(0x4123));
        assert!(found.is_some());
        assert_eq!(found.unwrap().lock().upage, page);
    }

    #[test]
    fn create_file_region_spans_one_entry_per_page() {
        let mut spt = SupplementalPageTable::new(ProcessId(1));
        let file = test_file(&[0u8; PAGE_SIZE]);
        let base = VirtualAddress::new(0x08048000);
        // 12 KiB .text segment, matching the lazy-load scenario in the spec.
        spt.create_file_region(file, 0, base, 3 * PAGE_SIZE, 0, false);

        for i in 0..3 {
            let page = VirtualAddress::new(base.as_u64() + (i * PAGE_SIZE) as u64);
            let handle = spt.find(page).expect("entry installed");
            let entry = handle.lock();
            assert_eq!(entry.kind, SpteKind::File);
            assert!(!entry.resident());
            assert_eq!(entry.page_read_bytes, PAGE_SIZE);
        }
    }

    #[test]
    fn mmap_region_rejects_overlap_and_rolls_back() {
        let mut spt = SupplementalPageTable::new(ProcessId(1));
        let occupied = VirtualAddress::new(0x2000);
        spt.create_code(occupied, true);

        let file = test_file(&[0u8; 2 * PAGE_SIZE]);
        // Starts at 0x1000 so the region covers both 0x1000 and the
        // already-occupied 0x2000.
        let base = VirtualAddress::new(0x1000);
        let result = spt.create_mmap_region(file, 2 * PAGE_SIZE, base);

        assert!(result.is_none());
        // Nothing from the rejected region was left behind; the
        // pre-existing CODE entry is untouched.
        assert!(spt.find(base).is_none());
        assert!(spt.find(occupied).is_some());
        assert_eq!(spt.find(occupied).unwrap().lock().kind, SpteKind::Code);
    }

    #[test]
    fn mmap_region_installs_lazy_entries() {
        let mut spt = SupplementalPageTable::new(ProcessId(1));
        let file = test_file(&[0xABu8; 2 * PAGE_SIZE]);
        let base = VirtualAddress::new(0x2000_0000);

        let first = spt
            .create_mmap_region(file, 2 * PAGE_SIZE, base)
            .expect("no overlap");
        assert_eq!(first.lock().upage, base);
        assert_eq!(first.lock().kind, SpteKind::Mmap);

        let second = spt
            .find(VirtualAddress::new(base.as_u64() + PAGE_SIZE as u64))
            .expect("second page installed");
        assert!(!second.lock().resident());
    }
}

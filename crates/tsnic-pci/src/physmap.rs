//! Physical memory mapping for MMIO access
//!
//! Maps a PCI BAR into the process, either through the BAR's sysfs
//! `resourceN` file or through /dev/mem at the BAR's physical address.
//!
//! # Safety
//!
//! Accessing device memory is inherently unsafe and requires root
//! privileges. The mapping functions take care of page alignment; the
//! accessors only check offsets in debug builds.

use crate::error::PciError;

/// A mapped region of device memory
#[cfg(target_os = "linux")]
pub struct PhysMap {
    /// Pointer to the requested start of the region
    ptr: *mut u8,
    /// Size of the region as requested
    size: usize,
    /// Distance from the page-aligned mmap start to `ptr`
    page_offset: usize,
    /// Size passed to mmap
    map_size: usize,
    /// Physical address (for error reporting)
    phys_addr: u64,
}

#[cfg(target_os = "linux")]
impl PhysMap {
    /// Map `size` bytes of physical memory at `phys_addr` via /dev/mem
    pub fn new(phys_addr: u64, size: usize) -> Result<Self, PciError> {
        Self::map_path(std::path::Path::new("/dev/mem"), phys_addr, phys_addr, size)
    }

    /// Map `size` bytes of a sysfs `resourceN` file
    ///
    /// `phys_addr` is the BAR's physical address and is only kept for
    /// error reporting; the file itself starts at the BAR base.
    pub fn from_resource(
        path: &std::path::Path,
        phys_addr: u64,
        size: usize,
    ) -> Result<Self, PciError> {
        Self::map_path(path, 0, phys_addr, size)
    }

    fn map_path(
        path: &std::path::Path,
        file_offset: u64,
        phys_addr: u64,
        size: usize,
    ) -> Result<Self, PciError> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        let map_err = |source| PciError::MemoryMap {
            address: phys_addr,
            size,
            source,
        };

        // O_SYNC for uncached access (required for MMIO through /dev/mem)
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(map_err)?;

        // Linux only maps whole pages; if the region is not page aligned we
        // add the missing offset ourselves.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;
        let page_offset = (file_offset as usize) & page_mask;
        let aligned_offset = file_offset & !(page_mask as u64);
        let map_size = (size + page_offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_offset as libc::off_t,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(map_err(std::io::Error::last_os_error()));
        }

        log::debug!(
            "Mapped {:#x} bytes at physical {:#x} from {}",
            size,
            phys_addr,
            path.display()
        );

        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(page_offset) },
            size,
            page_offset,
            map_size,
            phys_addr,
        })
    }

    /// Read a 32-bit value from the mapped region
    #[inline]
    pub fn read32(&self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit read");
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u32) }
    }

    /// Write a 32-bit value to the mapped region
    #[inline]
    pub fn write32(&self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.size);
        debug_assert!(offset & 3 == 0, "unaligned 32-bit write");
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u32, value) }
    }

    /// Read a 64-bit value from the mapped region
    #[inline]
    pub fn read64(&self, offset: usize) -> u64 {
        debug_assert!(offset + 8 <= self.size);
        debug_assert!(offset & 7 == 0, "unaligned 64-bit read");
        unsafe { core::ptr::read_volatile(self.ptr.add(offset) as *const u64) }
    }

    /// Write a 64-bit value to the mapped region
    #[inline]
    pub fn write64(&self, offset: usize, value: u64) {
        debug_assert!(offset + 8 <= self.size);
        debug_assert!(offset & 7 == 0, "unaligned 64-bit write");
        unsafe { core::ptr::write_volatile(self.ptr.add(offset) as *mut u64, value) }
    }

    /// Get the physical address of this mapping
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Get the size of this mapping
    pub fn size(&self) -> usize {
        self.size
    }
}

#[cfg(target_os = "linux")]
impl Drop for PhysMap {
    fn drop(&mut self) {
        unsafe {
            let base = self.ptr.sub(self.page_offset);
            libc::munmap(base as *mut libc::c_void, self.map_size);
        }
        log::debug!("Unmapped physical {:#x}", self.phys_addr);
    }
}

// The mapping is owned exclusively and only touched through volatile
// accesses, so moving it to another thread is fine.
#[cfg(target_os = "linux")]
unsafe impl Send for PhysMap {}

// Stub for non-Linux platforms
#[cfg(not(target_os = "linux"))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PhysMap {
    pub fn new(_phys_addr: u64, _size: usize) -> Result<Self, PciError> {
        Err(PciError::NotSupported("Physical memory mapping only supported on Linux"))
    }

    pub fn from_resource(
        _path: &std::path::Path,
        _phys_addr: u64,
        _size: usize,
    ) -> Result<Self, PciError> {
        Err(PciError::NotSupported("Physical memory mapping only supported on Linux"))
    }

    pub fn read32(&self, _offset: usize) -> u32 { 0 }
    pub fn write32(&self, _offset: usize, _value: u32) {}
    pub fn read64(&self, _offset: usize) -> u64 { 0 }
    pub fn write64(&self, _offset: usize, _value: u64) {}
    pub fn phys_addr(&self) -> u64 { 0 }
    pub fn size(&self) -> usize { 0 }
}

// src/types.rs
use std::fmt;

/// Size of the user-data region of one NAND page.
pub const PAGE_DATA_SIZE: usize = 0x200;

/// Size of the out-of-band spare window stored after each page's data.
pub const SPARE_SIZE: usize = 0x10;

/// Raw on-disk stride of one page when spare data is present (data + spare).
pub const RAW_PAGE_SIZE: usize = PAGE_DATA_SIZE + SPARE_SIZE;

/// Logical size of a small block (32 pages).
pub const SMALL_BLOCK_SIZE: u64 = 0x4000;

/// Raw size of a small block including spare windows.
pub const SMALL_BLOCK_RAW_SIZE: u64 = 0x4200;

/// Logical size of a big block (256 pages, Type2 only).
pub const BIG_BLOCK_SIZE: u64 = 0x20000;

/// Raw size of a big block including spare windows.
pub const BIG_BLOCK_RAW_SIZE: u64 = 0x21000;

/// Magic signature at raw offset 0 of every dump.
pub const MAGIC: [u8; 2] = [0xFF, 0x4F];

/// Spare metadata layout variant, distinguishing flash controller generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaType {
    /// Spare data present but no known variant matched. Transient during
    /// detection; never stored by a successfully constructed reader.
    Uninitialized,
    /// Pre-Jasper controllers.
    Type0,
    /// Jasper, Trinity and Corona controllers.
    Type1,
    /// Big-block Jasper controllers.
    Type2,
    /// No spare data at all: a plain 512-byte-page image.
    None,
}

impl MetaType {
    /// Logical block size for this layout. `force_small_block` pins Type2 to
    /// small-block addressing.
    pub fn block_size(&self, force_small_block: bool) -> u64 {
        match self {
            MetaType::Type2 if !force_small_block => BIG_BLOCK_SIZE,
            _ => SMALL_BLOCK_SIZE,
        }
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetaType::Uninitialized => "Uninitialized",
            MetaType::Type0 => "Type0",
            MetaType::Type1 => "Type1",
            MetaType::Type2 => "Type2",
            MetaType::None => "None",
        };
        f.write_str(name)
    }
}

/// A versioned pointer to a filesystem root structure, found in spare
/// metadata by [`NandReader::scan_for_fs_root`](crate::NandReader::scan_for_fs_root).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsRootEntry {
    /// Logical offset at which the root page was found.
    pub offset: u64,
    /// Block-aligned raw offset of the containing small block.
    pub raw_offset: u64,
    /// Sequence number from the spare metadata; higher means newer.
    pub version: u32,
}

impl FsRootEntry {
    pub fn new(offset: u64, version: u32) -> Self {
        FsRootEntry {
            offset,
            raw_offset: (offset / SMALL_BLOCK_SIZE) * SMALL_BLOCK_RAW_SIZE,
            version,
        }
    }
}

impl fmt::Display for FsRootEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FsRootEntry @ 0x{:X} (0x{:X}) Version: {}",
            self.offset, self.raw_offset, self.version
        )
    }
}

/// A versioned pointer to an auxiliary "mobile" structure, with its one-byte
/// type tag from the spare metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobileEntry {
    /// Logical offset at which the mobile page was found.
    pub offset: u64,
    /// Block-aligned raw offset of the containing small block.
    pub raw_offset: u64,
    /// Sequence number from the spare metadata; higher means newer.
    pub version: u32,
    /// Mobile structure type tag.
    pub mobile_type: u8,
}

impl MobileEntry {
    pub fn new(offset: u64, version: u32, mobile_type: u8) -> Self {
        MobileEntry {
            offset,
            raw_offset: (offset / SMALL_BLOCK_SIZE) * SMALL_BLOCK_RAW_SIZE,
            version,
            mobile_type,
        }
    }
}

impl fmt::Display for MobileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MobileEntry @ 0x{:X} (0x{:X}) Version: {} Type: 0x{:X}",
            self.offset, self.raw_offset, self.version, self.mobile_type
        )
    }
}

// tests/common/mod.rs
//! Synthetic NAND image builder shared by the integration tests.
//!
//! Lays out raw pages (512 data bytes + 16 spare bytes), fills per-variant
//! spare metadata and computes real ECD bytes so the spare probe passes.
#![allow(dead_code)] // not every test binary uses every helper

use nand_rs::{calculate_ecd, MetaType, MAGIC, PAGE_DATA_SIZE, RAW_PAGE_SIZE, SPARE_SIZE};

pub const PAGES_PER_SMALL_BLOCK: usize = 32;
pub const PAGES_PER_BIG_BLOCK: usize = 256;

/// Offset of the stored ECD within a raw page. The low 6 bits of the first
/// stored byte are the block-type field; the code's packing leaves them free.
const ECD_OFFSET: usize = 524;
const BLOCK_TYPE_OFFSET: usize = 12;

pub struct ImageBuilder {
    meta_type: MetaType,
    raw: Vec<u8>,
    pages: usize,
}

impl ImageBuilder {
    /// A fresh image of `block_count` native blocks (32 pages for
    /// Type0/Type1, 256 for Type2), all blocks good, block ids in sequence.
    pub fn new(meta_type: MetaType, block_count: usize) -> Self {
        let pages_per_block = match meta_type {
            MetaType::Type2 => PAGES_PER_BIG_BLOCK,
            _ => PAGES_PER_SMALL_BLOCK,
        };
        let pages = block_count * pages_per_block;
        let mut raw = vec![0u8; pages * RAW_PAGE_SIZE];
        for page in 0..pages {
            let spare = page * RAW_PAGE_SIZE + PAGE_DATA_SIZE;
            raw[spare..spare + SPARE_SIZE].fill(0xFF);
            // block-type field zeroed so unmarked pages classify as neither
            // root nor mobile and the ECD probe windows verify
            raw[spare + BLOCK_TYPE_OFFSET] = 0x00;
        }
        raw[..2].copy_from_slice(&MAGIC);

        let mut builder = ImageBuilder {
            meta_type,
            raw,
            pages,
        };
        for block in 0..block_count {
            builder.set_block_id(block, block as u16);
        }
        builder
    }

    fn pages_per_block(&self) -> usize {
        match self.meta_type {
            MetaType::Type2 => PAGES_PER_BIG_BLOCK,
            _ => PAGES_PER_SMALL_BLOCK,
        }
    }

    fn spare_mut(&mut self, page: usize) -> &mut [u8] {
        let start = page * RAW_PAGE_SIZE + PAGE_DATA_SIZE;
        &mut self.raw[start..start + SPARE_SIZE]
    }

    /// Spare window of `page` within `block`, in native-block coordinates.
    pub fn page_spare_mut(&mut self, block: usize, page: usize) -> &mut [u8] {
        let page = block * self.pages_per_block() + page;
        self.spare_mut(page)
    }

    /// Fill a page's 512-byte data region.
    pub fn set_data(&mut self, page: usize, fill: u8) {
        let start = page * RAW_PAGE_SIZE;
        self.raw[start..start + PAGE_DATA_SIZE].fill(fill);
        if page == 0 {
            self.raw[..2].copy_from_slice(&MAGIC);
        }
    }

    /// Store the 16-bit block identifier in the block's page-0 spare window,
    /// at the variant's identifier offset.
    pub fn set_block_id(&mut self, block: usize, id: u16) {
        let offset = match self.meta_type {
            MetaType::Type0 => 0,
            _ => 1,
        };
        let spare = self.page_spare_mut(block, 0);
        spare[offset..offset + 2].copy_from_slice(&id.to_le_bytes());
    }

    fn set_sequence(&mut self, block: usize, page: usize, sequence: u32) {
        let meta_type = self.meta_type;
        let spare = self.page_spare_mut(block, page);
        let bytes = sequence.to_le_bytes();
        match meta_type {
            MetaType::Type0 => {
                spare[2] = bytes[0];
                spare[3] = bytes[1];
                spare[4] = bytes[2];
                spare[6] = bytes[3];
            }
            MetaType::Type1 => {
                spare[0] = bytes[0];
                spare[3] = bytes[1];
                spare[4] = bytes[2];
                spare[6] = bytes[3];
            }
            MetaType::Type2 => {
                spare[5] = bytes[0];
                spare[4] = bytes[1];
                spare[3] = bytes[2];
            }
            _ => panic!("no sequence layout for {meta_type}"),
        }
    }

    /// Mark a block's page 0 as a filesystem root page.
    pub fn mark_fs_root(&mut self, block: usize, sequence: u32) {
        self.set_sequence(block, 0, sequence);
        self.page_spare_mut(block, 0)[BLOCK_TYPE_OFFSET] = 0x30;
    }

    /// Mark one page of a block as a mobile structure page.
    pub fn mark_mobile(&mut self, block: usize, page: usize, mobile_type: u8, sequence: u32) {
        assert!((0x01..=0x2F).contains(&mobile_type));
        self.set_sequence(block, page, sequence);
        self.page_spare_mut(block, page)[BLOCK_TYPE_OFFSET] = mobile_type;
    }

    /// Set the variant's bad-block marker on a block's page-0 spare window.
    pub fn mark_bad_block(&mut self, block: usize) {
        let offset = match self.meta_type {
            MetaType::Type2 => 0,
            _ => 5,
        };
        self.page_spare_mut(block, 0)[offset] = 0x00;
    }

    /// Finalize: compute and store the ECD of every page.
    pub fn build(mut self) -> Vec<u8> {
        for page in 0..self.pages {
            let start = page * RAW_PAGE_SIZE;
            self.raw[start + ECD_OFFSET] &= 0x3F;
            self.raw[start + ECD_OFFSET + 1..start + ECD_OFFSET + 4].fill(0);
            let ecd = calculate_ecd(&self.raw, start);
            self.raw[start + ECD_OFFSET] |= ecd[0];
            self.raw[start + ECD_OFFSET + 1..start + ECD_OFFSET + 4].copy_from_slice(&ecd[1..]);
        }
        self.raw
    }
}

/// A plain 512-byte-page image without spare data, magic in place.
pub fn plain_image(len: usize) -> Vec<u8> {
    assert!(len >= 2);
    let mut raw = vec![0u8; len];
    raw[..2].copy_from_slice(&MAGIC);
    raw
}

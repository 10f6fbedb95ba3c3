// src/spare/meta.rs
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{NandError, Result};
use crate::types::{MetaType, PAGE_DATA_SIZE, SPARE_SIZE};

// Per-variant hardware format constants. These are fixed properties of the
// flash controller generations, not configuration.

/// Bad-block marker byte within the spare window, Type0/Type1.
const BAD_BLOCK_OFFSET_T01: usize = 5;
/// Bad-block marker byte within the spare window, Type2.
const BAD_BLOCK_OFFSET_T2: usize = 0;
/// Block identifier offset within the spare window, Type0.
const BLOCK_ID_OFFSET_T0: usize = 0;
/// Block identifier offset within the spare window, Type1/Type2.
const BLOCK_ID_OFFSET_T12: usize = 1;
/// Block-type field: low 6 bits of spare byte 12.
const BLOCK_TYPE_OFFSET: usize = 12;
const BLOCK_TYPE_MASK: u8 = 0x3F;
/// Block type marking a filesystem root page.
const FS_ROOT_BLOCK_TYPE: u8 = 0x30;
/// Inclusive range of block types marking mobile structure pages.
const MOBILE_BLOCK_TYPE_MIN: u8 = 0x01;
const MOBILE_BLOCK_TYPE_MAX: u8 = 0x2F;

const ERASED: u8 = 0xFF;

/// Check whether a 16-byte spare window carries the variant's bad-block
/// marker. The `Uninitialized` form treats any window that is not entirely
/// erased as a signal; it is only meaningful during layout detection.
pub fn is_bad_block_spare(spare: &[u8], meta_type: MetaType) -> Result<bool> {
    match meta_type {
        MetaType::Type0 | MetaType::Type1 => Ok(spare[BAD_BLOCK_OFFSET_T01] != ERASED),
        MetaType::Type2 => Ok(spare[BAD_BLOCK_OFFSET_T2] != ERASED),
        MetaType::Uninitialized => {
            Ok(spare.iter().filter(|&&b| b == ERASED).count() != spare.len())
        }
        MetaType::None => Err(NandError::NotSupported(
            "bad block check without a spare layout",
        )),
    }
}

/// Block-data form of the bad-block check: `block` starts at a page's data
/// region, so the spare window sits at offset 0x200.
pub fn is_bad_block(block: &[u8], meta_type: MetaType) -> Result<bool> {
    match meta_type {
        MetaType::Type0 | MetaType::Type1 => {
            Ok(block[PAGE_DATA_SIZE + BAD_BLOCK_OFFSET_T01] != ERASED)
        }
        MetaType::Type2 => Ok(block[PAGE_DATA_SIZE + BAD_BLOCK_OFFSET_T2] != ERASED),
        MetaType::Uninitialized => {
            let window = &block[PAGE_DATA_SIZE..PAGE_DATA_SIZE + SPARE_SIZE];
            Ok(window.iter().filter(|&&b| b == ERASED).count() != SPARE_SIZE)
        }
        MetaType::None => Err(NandError::NotSupported(
            "bad block check without a spare layout",
        )),
    }
}

/// Extract the 16-bit block identifier from a spare window. Fails with
/// [`NandError::BadBlock`] if the window carries the bad-block marker.
pub fn block_id_from_spare(spare: &[u8], meta_type: MetaType) -> Result<u16> {
    if is_bad_block_spare(spare, meta_type)? {
        return Err(NandError::BadBlock);
    }
    match meta_type {
        MetaType::Type0 => Ok(LittleEndian::read_u16(&spare[BLOCK_ID_OFFSET_T0..])),
        MetaType::Type1 | MetaType::Type2 => {
            Ok(LittleEndian::read_u16(&spare[BLOCK_ID_OFFSET_T12..]))
        }
        MetaType::Uninitialized | MetaType::None => Err(NandError::NotSupported(
            "block id extraction on an unclassified layout",
        )),
    }
}

/// Extract the 16-bit block identifier from block data (page data followed by
/// its spare window). Fails with [`NandError::BadBlock`] on marked blocks.
pub fn block_id_from_block(block: &[u8], meta_type: MetaType) -> Result<u16> {
    if is_bad_block(block, meta_type)? {
        return Err(NandError::BadBlock);
    }
    match meta_type {
        MetaType::Type0 => Ok(LittleEndian::read_u16(
            &block[PAGE_DATA_SIZE + BLOCK_ID_OFFSET_T0..],
        )),
        MetaType::Type1 | MetaType::Type2 => Ok(LittleEndian::read_u16(
            &block[PAGE_DATA_SIZE + BLOCK_ID_OFFSET_T12..],
        )),
        MetaType::Uninitialized | MetaType::None => Err(NandError::NotSupported(
            "block id extraction on an unclassified layout",
        )),
    }
}

/// Decoded spare metadata for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpareData {
    pub block_id: u16,
    pub fs_sequence: u32,
    pub fs_page_count: u8,
    pub fs_block_type: u8,
    pub bad_block: bool,
}

impl SpareData {
    /// Decode a 16-byte spare window under the given layout variant.
    pub fn parse(spare: &[u8], meta_type: MetaType) -> Result<SpareData> {
        if spare.len() < SPARE_SIZE {
            return Err(NandError::NotSupported("spare window shorter than 16 bytes"));
        }
        let (block_id, fs_sequence, bad_block) = match meta_type {
            MetaType::Type0 => (
                LittleEndian::read_u16(&spare[BLOCK_ID_OFFSET_T0..]),
                u32::from_le_bytes([spare[2], spare[3], spare[4], spare[6]]),
                spare[BAD_BLOCK_OFFSET_T01] != ERASED,
            ),
            MetaType::Type1 => (
                LittleEndian::read_u16(&spare[BLOCK_ID_OFFSET_T12..]),
                u32::from_le_bytes([spare[0], spare[3], spare[4], spare[6]]),
                spare[BAD_BLOCK_OFFSET_T01] != ERASED,
            ),
            MetaType::Type2 => (
                LittleEndian::read_u16(&spare[BLOCK_ID_OFFSET_T12..]),
                u32::from_le_bytes([spare[5], spare[4], spare[3], 0]),
                spare[BAD_BLOCK_OFFSET_T2] != ERASED,
            ),
            MetaType::Uninitialized | MetaType::None => {
                return Err(NandError::NotSupported(
                    "spare decoding on an unclassified layout",
                ))
            }
        };
        Ok(SpareData {
            block_id,
            fs_sequence,
            fs_page_count: spare[9],
            fs_block_type: spare[BLOCK_TYPE_OFFSET] & BLOCK_TYPE_MASK,
            bad_block,
        })
    }

    /// True if this page carries a filesystem root record.
    pub fn is_fs_root(&self) -> bool {
        self.fs_block_type == FS_ROOT_BLOCK_TYPE
    }

    /// True if this page carries a mobile structure record.
    pub fn is_mobile(&self) -> bool {
        (MOBILE_BLOCK_TYPE_MIN..=MOBILE_BLOCK_TYPE_MAX).contains(&self.fs_block_type)
    }
}

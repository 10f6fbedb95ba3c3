// src/spare/detect.rs
use std::io::SeekFrom;

use crate::error::{NandError, Result};
use crate::reader::{NandReader, ReadSeek};
use crate::spare::meta::{block_id_from_spare, is_bad_block_spare};
use crate::types::{MetaType, SPARE_SIZE};

/// Raw offset of the second physical block's spare window under small-block
/// addressing. Block 1 is expected to carry logical block id 1 adjacent to
/// block 0's system structures.
const PROBE_OFFSET_SMALL: u64 = 0x4400;

/// Same probe point under big-block (Type2) addressing.
const PROBE_OFFSET_BIG: u64 = 0x21200;

/// Fallback probes land one small block before the end of the image.
const PROBE_TAIL_DISTANCE: u64 = 0x4000;

/// Big-block images address system structures within the first 64MiB only;
/// the fallback Type2 probe is clamped to that span.
const PROBE_BIG_LIMIT: u64 = 0x4200000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Probe near the start of the image.
    First,
    /// Block 1 itself can be marked bad; seek the signal near the end instead.
    Fallback,
}

/// Classify the spare layout of an image already known to carry spare data.
///
/// Each phase reads one 16-byte spare window per addressing scheme and tests
/// the bad-block marker plus an expected block identifier of exactly 1.
/// If neither phase matches, classification fails with
/// [`NandError::UnknownMetaType`]; an unclassified layout is never stored.
pub(crate) fn detect_spare_type<R: ReadSeek>(reader: &mut NandReader<R>) -> Result<MetaType> {
    let raw_len = reader.raw_len();
    for phase in [Phase::First, Phase::Fallback] {
        let probe = match phase {
            Phase::First => PROBE_OFFSET_SMALL,
            Phase::Fallback => raw_len.saturating_sub(PROBE_TAIL_DISTANCE),
        };
        log::debug!("probing spare layout at raw offset 0x{probe:X} ({phase:?})");
        reader.raw_seek(SeekFrom::Start(probe))?;
        let window = reader.raw_read_bytes(SPARE_SIZE)?;
        if window.len() < SPARE_SIZE {
            continue;
        }

        // A fully erased window carries no classification signal at all.
        if !is_bad_block_spare(&window, MetaType::Uninitialized)? {
            log::debug!("probe window is fully erased, no signal in this phase");
            continue;
        }

        if !is_bad_block_spare(&window, MetaType::Type0)? {
            if block_id_from_spare(&window, MetaType::Type0)? == 1 {
                return Ok(MetaType::Type0);
            }
            if block_id_from_spare(&window, MetaType::Type1)? == 1 {
                return Ok(MetaType::Type1);
            }
        }

        if !is_bad_block_spare(&window, MetaType::Type2)? {
            let probe2 = match phase {
                Phase::First => PROBE_OFFSET_BIG,
                Phase::Fallback => raw_len.min(PROBE_BIG_LIMIT).saturating_sub(PROBE_TAIL_DISTANCE),
            };
            reader.raw_seek(SeekFrom::Start(probe2))?;
            let window2 = reader.raw_read_bytes(SPARE_SIZE)?;
            if window2.len() == SPARE_SIZE
                && !is_bad_block_spare(&window2, MetaType::Type2)?
                && block_id_from_spare(&window2, MetaType::Type2)? == 1
            {
                return Ok(MetaType::Type2);
            }
        } else {
            log::debug!(
                "{}",
                match phase {
                    Phase::First => "block 1 is bad",
                    Phase::Fallback => "the last system block is bad",
                }
            );
        }
    }
    Err(NandError::UnknownMetaType)
}

// src/reader/nand_reader.rs
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{NandError, Result};
use crate::reader::progress::{NoProgress, ReadProgress};
use crate::spare::{check_page_ecd, detect_spare_type, is_bad_block_spare, SpareData};
use crate::types::{
    FsRootEntry, MetaType, MobileEntry, BIG_BLOCK_RAW_SIZE, BIG_BLOCK_SIZE, MAGIC, PAGE_DATA_SIZE,
    RAW_PAGE_SIZE, SMALL_BLOCK_RAW_SIZE, SPARE_SIZE,
};

#[cfg(feature = "mmap")]
use memmap2::Mmap;
#[cfg(feature = "mmap")]
use std::io::Cursor;

/// Trait alias for Read + Seek
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Span covered by the spare probe: the first three raw page strides.
const SPARE_PROBE_SPAN: usize = 3 * RAW_PAGE_SIZE;

/// Raw offset where the structure scan starts: page 0 of small block 2, the
/// first block past the system area.
const SCAN_START_OFFSET: u64 = 0x8600;

/// Raw distance from just past one small block's page-0 spare window to the
/// next small block's page-0 spare window.
const SMALL_BLOCK_SKIP: i64 = (SMALL_BLOCK_RAW_SIZE - SPARE_SIZE as u64) as i64;

/// Same skip under big-block (Type2) addressing.
const BIG_BLOCK_SKIP: i64 = (BIG_BLOCK_RAW_SIZE - SPARE_SIZE as u64) as i64;

/// Translate a logical offset to its raw offset in a spare-bearing image.
fn logical_to_raw(offset: u64) -> u64 {
    (offset / PAGE_DATA_SIZE as u64) * RAW_PAGE_SIZE as u64 + offset % PAGE_DATA_SIZE as u64
}

/// Seekable logical view over a raw NAND dump.
///
/// Translates logical offsets to raw offsets, skipping the 16-byte spare
/// window interleaved after every 512-byte data page when the dump carries
/// spare data. Plain images pass through untranslated. The view is strictly
/// read-only; there are no write or set-length operations.
pub struct NandReader<R: ReadSeek> {
    inner: R,
    raw_len: u64,
    has_spare: bool,
    meta_type: MetaType,
    progress: Box<dyn ReadProgress>,
    report_position: bool,
    fs_root_entries: Vec<FsRootEntry>,
    mobile_entries: Vec<MobileEntry>,
    bad_blocks: Vec<u64>,
    forced_small_block: bool,
}

impl<R: ReadSeek> std::fmt::Debug for NandReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NandReader")
            .field("raw_len", &self.raw_len)
            .field("has_spare", &self.has_spare)
            .field("meta_type", &self.meta_type)
            .field("report_position", &self.report_position)
            .field("fs_root_entries", &self.fs_root_entries)
            .field("mobile_entries", &self.mobile_entries)
            .field("bad_blocks", &self.bad_blocks)
            .field("forced_small_block", &self.forced_small_block)
            .finish_non_exhaustive()
    }
}

/// Constructor for standard file I/O
impl NandReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_progress(path, Box::new(NoProgress))
    }

    pub fn open_with_progress(
        path: impl AsRef<Path>,
        progress: Box<dyn ReadProgress>,
    ) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with_progress(BufReader::with_capacity(65536, file), progress)
    }
}

/// Constructor for memory-mapped file I/O (requires "mmap" feature)
#[cfg(feature = "mmap")]
impl NandReader<Cursor<Mmap>> {
    pub fn open_mmap(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_reader_with_progress(Cursor::new(mmap), Box::new(NoProgress))
    }
}

/// Generic implementation for all NandReader variants
impl<R: ReadSeek> NandReader<R> {
    pub fn from_reader(inner: R) -> Result<Self> {
        Self::from_reader_with_progress(inner, Box::new(NoProgress))
    }

    pub fn from_reader_with_progress(
        mut inner: R,
        progress: Box<dyn ReadProgress>,
    ) -> Result<Self> {
        let raw_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        let mut reader = NandReader {
            inner,
            raw_len,
            has_spare: false,
            meta_type: MetaType::None,
            progress,
            report_position: false,
            fs_root_entries: Vec::new(),
            mobile_entries: Vec::new(),
            bad_blocks: Vec::new(),
            forced_small_block: false,
        };

        reader.verify_magic()?;
        log::debug!("checking for spare data");
        reader.has_spare = reader.check_for_spare()?;
        reader.report_position = true;
        if reader.has_spare {
            reader.progress.total_blocks(raw_len / SMALL_BLOCK_RAW_SIZE);
            log::debug!("detecting spare layout");
            reader.meta_type = detect_spare_type(&mut reader)?;
            log::debug!("spare layout: {}", reader.meta_type);
        } else {
            log::debug!("no spare data, plain 512-byte-page image");
            reader.progress.total_blocks(raw_len / PAGE_DATA_SIZE as u64);
            reader.meta_type = MetaType::None;
        }
        reader.raw_seek(SeekFrom::Start(0))?;
        Ok(reader)
    }

    fn verify_magic(&mut self) -> Result<()> {
        log::debug!("checking magic bytes");
        self.raw_seek(SeekFrom::Start(0))?;
        let tmp = self.raw_read_bytes(2)?;
        self.raw_seek(SeekFrom::Start(0))?;
        let mut found = [0u8; 2];
        found[..tmp.len()].copy_from_slice(&tmp);
        if found != MAGIC {
            return Err(NandError::BadMagic { found });
        }
        Ok(())
    }

    fn check_for_spare(&mut self) -> Result<bool> {
        self.raw_seek(SeekFrom::Start(0))?;
        let tmp = self.raw_read_bytes(SPARE_PROBE_SPAN)?;
        self.raw_seek(SeekFrom::Start(0))?;
        if tmp.len() < SPARE_PROBE_SPAN {
            return Ok(false);
        }
        for offset in (0..SPARE_PROBE_SPAN).step_by(RAW_PAGE_SIZE) {
            if !check_page_ecd(&tmp, offset) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether the dump interleaves spare metadata with page data.
    pub fn has_spare(&self) -> bool {
        self.has_spare
    }

    /// The spare layout variant, [`MetaType::None`] for plain images.
    pub fn meta_type(&self) -> MetaType {
        self.meta_type
    }

    /// Logical length: spare bytes are never counted, and a trailing partial
    /// raw page is truncated from the view.
    pub fn len(&self) -> u64 {
        if self.has_spare {
            (self.raw_len / RAW_PAGE_SIZE as u64) * PAGE_DATA_SIZE as u64
        } else {
            self.raw_len
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw length of the underlying source.
    pub fn raw_len(&self) -> u64 {
        self.raw_len
    }

    /// Current logical position. A cursor inside a spare window reports the
    /// end of that page's data region.
    pub fn position(&mut self) -> Result<u64> {
        let raw = self.inner.stream_position()?;
        if self.has_spare {
            let page = raw / RAW_PAGE_SIZE as u64;
            let in_page = (raw % RAW_PAGE_SIZE as u64).min(PAGE_DATA_SIZE as u64);
            Ok(page * PAGE_DATA_SIZE as u64 + in_page)
        } else {
            Ok(raw)
        }
    }

    /// Current raw position.
    pub fn raw_position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to a logical offset. All origins resolve to an absolute logical
    /// target before translation. Returns the new raw position.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.position()? as i128 + delta as i128,
            SeekFrom::End(delta) => self.len() as i128 + delta as i128,
        };
        let target = u64::try_from(target).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;
        let raw = if self.has_spare {
            logical_to_raw(target)
        } else {
            target
        };
        Ok(self.inner.seek(SeekFrom::Start(raw))?)
    }

    /// Read logical bytes at the current position, skipping spare windows.
    /// Returns the number of bytes delivered; short only at end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let count = buf.len();
        if self.report_position {
            let end = self.position()? + count as u64;
            self.progress.position(end);
        }
        if !self.has_spare {
            return Ok(self.inner.read(buf)?);
        }
        let mut filled = 0;
        while filled < count {
            let in_page = (self.inner.stream_position()? % RAW_PAGE_SIZE as u64) as usize;
            if in_page >= PAGE_DATA_SIZE {
                // inside a spare window, realign to the next data page
                self.inner
                    .seek(SeekFrom::Current((RAW_PAGE_SIZE - in_page) as i64))?;
                continue;
            }
            let take = (count - filled).min(PAGE_DATA_SIZE - in_page);
            let n = self.inner.read(&mut buf[filled..filled + take])?;
            if n == 0 {
                break;
            }
            filled += n;
            if in_page + n == PAGE_DATA_SIZE {
                self.inner.seek(SeekFrom::Current(SPARE_SIZE as i64))?;
            }
        }
        Ok(filled)
    }

    /// Read a single logical byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        if self.read(&mut buf)? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
        }
        Ok(buf[0])
    }

    /// Read up to `count` logical bytes, truncated at end of stream.
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let filled = self.read(&mut buf)?;
        buf.truncate(filled);
        Ok(buf)
    }

    /// Seek on the raw source, bypassing address translation.
    pub fn raw_seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    /// Read raw bytes at the current raw position, bypassing translation.
    pub fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(buf)?)
    }

    /// Read up to `count` raw bytes, truncated at end of stream.
    pub fn raw_read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        if self.report_position {
            let end = self.position()? + count as u64;
            self.progress.position(end);
        }
        let mut buf = vec![0u8; count];
        let mut filled = 0;
        while filled < count {
            let n = self.inner.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Filesystem root records found by [`scan_for_fs_root`](Self::scan_for_fs_root).
    pub fn fs_root_entries(&self) -> &[FsRootEntry] {
        &self.fs_root_entries
    }

    /// Mobile records found by [`scan_for_fs_root`](Self::scan_for_fs_root).
    pub fn mobile_entries(&self) -> &[MobileEntry] {
        &self.mobile_entries
    }

    /// Sweep the image for filesystem root and mobile records embedded in
    /// spare metadata.
    ///
    /// Idempotent: returns immediately once roots have been found. Fails with
    /// [`NandError::DataNotFound`] if the sweep finishes without a single
    /// root record; mobile records found up to that point remain accessible.
    pub fn scan_for_fs_root(&mut self) -> Result<()> {
        if !self.has_spare {
            return Err(NandError::NotSupported("structure scan requires spare data"));
        }
        if !self.fs_root_entries.is_empty() {
            return Ok(());
        }
        self.raw_seek(SeekFrom::Start(SCAN_START_OFFSET))?;
        let limit = self.raw_len.saturating_sub(SPARE_SIZE as u64);
        while self.inner.stream_position()? < limit {
            let window = self.raw_read_bytes(SPARE_SIZE)?;
            if window.len() < SPARE_SIZE {
                break;
            }
            let meta = SpareData::parse(&window, self.meta_type)?;
            if meta.is_fs_root() {
                let entry = FsRootEntry::new(self.position()?, meta.fs_sequence);
                log::debug!("fs root found @ 0x{:X} version {}", entry.offset, entry.version);
                self.fs_root_entries.push(entry);
                self.raw_seek(SeekFrom::Current(SMALL_BLOCK_SKIP))?;
            } else {
                // walk the remaining 31 pages of this small block
                for _ in 0..31 {
                    self.raw_seek(SeekFrom::Current(PAGE_DATA_SIZE as i64))?;
                    let window = self.raw_read_bytes(SPARE_SIZE)?;
                    if window.len() < SPARE_SIZE {
                        break;
                    }
                    let meta = SpareData::parse(&window, self.meta_type)?;
                    if meta.is_mobile() {
                        let entry = MobileEntry::new(
                            self.position()?,
                            meta.fs_sequence,
                            meta.fs_block_type,
                        );
                        log::debug!(
                            "mobile found @ 0x{:X} version {} type 0x{:X}",
                            entry.offset,
                            entry.version,
                            entry.mobile_type
                        );
                        self.mobile_entries.push(entry);
                    }
                }
                self.raw_seek(SeekFrom::Current(PAGE_DATA_SIZE as i64))?;
            }
        }
        if self.fs_root_entries.is_empty() {
            return Err(NandError::DataNotFound("filesystem root record"));
        }
        Ok(())
    }

    /// Enumerate blocks whose spare metadata carries the bad-block marker.
    ///
    /// The result is cached; toggling `force_small_block` (which pins Type2
    /// images to small-block addressing) invalidates the cache and rescans.
    /// A scan that finds no marked blocks fails with
    /// [`NandError::DataNotFound`].
    pub fn find_bad_blocks(&mut self, force_small_block: bool) -> Result<Vec<u64>> {
        if !self.has_spare || self.meta_type == MetaType::Uninitialized {
            return Err(NandError::NotSupported(
                "bad block scan requires a classified spare layout",
            ));
        }
        if self.forced_small_block != force_small_block {
            self.bad_blocks.clear();
        }
        if !self.bad_blocks.is_empty() {
            return Ok(self.bad_blocks.clone());
        }
        self.forced_small_block = force_small_block;

        // first page's spare window
        self.raw_seek(SeekFrom::Start(PAGE_DATA_SIZE as u64))?;
        let block_size = self.meta_type.block_size(force_small_block);
        let total_blocks = self.len() / block_size;
        let skip = if block_size == BIG_BLOCK_SIZE {
            BIG_BLOCK_SKIP
        } else {
            SMALL_BLOCK_SKIP
        };
        for block in 0..total_blocks {
            let window = self.raw_read_bytes(SPARE_SIZE)?;
            if window.len() < SPARE_SIZE {
                break;
            }
            if is_bad_block_spare(&window, self.meta_type)? {
                log::debug!("bad block marker detected @ block 0x{block:X}");
                self.bad_blocks.push(block);
            }
            self.raw_seek(SeekFrom::Current(skip))?;
        }
        if self.bad_blocks.is_empty() {
            return Err(NandError::DataNotFound("bad block marker"));
        }
        Ok(self.bad_blocks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_to_raw_translation() {
        assert_eq!(logical_to_raw(0), 0);
        assert_eq!(logical_to_raw(0x1FF), 0x1FF);
        assert_eq!(logical_to_raw(0x200), 0x210);
        assert_eq!(logical_to_raw(0x201), 0x211);
        assert_eq!(logical_to_raw(0x4000), 0x4200);
        assert_eq!(logical_to_raw(0x8000 + 5), 0x8400 + 5);
    }

    #[test]
    fn test_scan_constants_line_up_with_block_geometry() {
        // scan start is the page-0 spare window of small block 2
        assert_eq!(SCAN_START_OFFSET, 2 * SMALL_BLOCK_RAW_SIZE + PAGE_DATA_SIZE as u64);
        assert_eq!(SMALL_BLOCK_SKIP, 0x41F0);
        assert_eq!(BIG_BLOCK_SKIP, 0x20FF0);
        assert_eq!(SPARE_PROBE_SPAN, 0x630);
    }
}

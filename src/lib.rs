// src/lib.rs
//! # nand-rs
//!
//! A Rust library for reading raw NAND flash dumps extracted from Xbox 360
//! consoles, exposing them as a logically addressable byte stream while
//! transparently handling the out-of-band "spare" metadata the flash
//! controller interleaves with user data.
//!
//! ## Features
//!
//! - 🔍 **Layout detection**: Classifies the spare-area format across the
//!   hardware generations (pre-Jasper, Jasper/Trinity/Corona, big-block)
//! - 🧮 **ECD verification**: Bit-exact reimplementation of the controller's
//!   polynomial error-detection code
//! - 📐 **Address translation**: Seekable logical view that skips the 16-byte
//!   spare window after every 512-byte page
//! - 🗺️ **Structure scanning**: Locates filesystem root and mobile records
//!   embedded in spare metadata, and enumerates bad blocks
//! - 📦 **Pluggable sources**: Works over any `Read + Seek`, with optional
//!   memory-mapped input
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nand_rs::*;
//!
//! fn main() -> Result<()> {
//!     let mut reader = NandReader::open("flashdmp.bin")?;
//!     println!("spare: {}, layout: {}", reader.has_spare(), reader.meta_type());
//!
//!     // Logical reads skip spare data transparently
//!     let header = reader.read_bytes(0x200)?;
//!     println!("read {} bytes", header.len());
//!
//!     // Locate filesystem bookkeeping structures
//!     reader.scan_for_fs_root()?;
//!     for entry in reader.fs_root_entries() {
//!         println!("{entry}");
//!     }
//!     Ok(())
//! }
//! ```

// Modules
pub mod error;
pub mod reader;
pub mod spare;
pub mod types;

// Re-export commonly used types at the crate root for convenience
pub use error::{NandError, Result};

pub use types::{
    FsRootEntry, MetaType, MobileEntry, BIG_BLOCK_SIZE, MAGIC, PAGE_DATA_SIZE, RAW_PAGE_SIZE,
    SMALL_BLOCK_SIZE, SPARE_SIZE,
};

pub use spare::{
    block_id_from_block, block_id_from_spare, calculate_ecd, check_page_ecd, is_bad_block,
    is_bad_block_spare, SpareData,
};

pub use reader::{NandReader, NoProgress, ReadProgress, ReadSeek};

// Prelude module for glob imports
pub mod prelude {
    //! Convenient imports for common use cases.
    //!
    //! ```rust
    //! use nand_rs::prelude::*;
    //! ```

    pub use crate::error::{NandError, Result};
    pub use crate::reader::{NandReader, NoProgress, ReadProgress};
    pub use crate::types::{FsRootEntry, MetaType, MobileEntry};
}

/// The library version
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!LIBRARY_VERSION.is_empty());
    }

    #[test]
    fn test_magic_constant() {
        assert_eq!(MAGIC, [0xFF, 0x4F]);
    }

    #[test]
    fn test_page_geometry() {
        assert_eq!(PAGE_DATA_SIZE + SPARE_SIZE, RAW_PAGE_SIZE);
        assert_eq!(SMALL_BLOCK_SIZE, 0x4000);
        assert_eq!(BIG_BLOCK_SIZE, 0x20000);
    }
}

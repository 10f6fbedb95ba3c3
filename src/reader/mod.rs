// src/reader/mod.rs
mod nand_reader;
mod progress;

pub use nand_reader::{NandReader, ReadSeek};
pub use progress::{NoProgress, ReadProgress};

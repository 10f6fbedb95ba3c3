// src/error.rs
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NandError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Bad magic: expected [FF, 4F], found {found:02X?}")]
    BadMagic { found: [u8; 2] },

    #[error("Unknown spare metadata layout: no variant matched at either probe phase")]
    UnknownMetaType,

    #[error("Bad block marker detected")]
    BadBlock,

    #[error("Data not found: {0}")]
    DataNotFound(&'static str),

    #[error("Operation not supported: {0}")]
    NotSupported(&'static str),
}

pub type Result<T> = std::result::Result<T, NandError>;

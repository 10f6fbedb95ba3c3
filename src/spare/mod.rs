// src/spare/mod.rs
mod detect;
mod ecd;
mod meta;

pub(crate) use detect::detect_spare_type;
pub use ecd::{calculate_ecd, check_page_ecd, ECD_OFFSET};
pub use meta::{
    block_id_from_block, block_id_from_spare, is_bad_block, is_bad_block_spare, SpareData,
};

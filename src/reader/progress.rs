// src/reader/progress.rs

/// Callback for observing read progress on a [`NandReader`](crate::NandReader).
///
/// Purely observational: implementations must not fail, and nothing they
/// return is consumed. Use [`NoProgress`] when no reporting is needed.
pub trait ReadProgress {
    /// Called once at construction with the estimated total block count of
    /// the image.
    fn total_blocks(&mut self, count: u64);

    /// Called before every translated or raw read with the logical position
    /// the read will end at.
    fn position(&mut self, logical_position: u64);
}

/// A no-op progress reporter.
pub struct NoProgress;

impl ReadProgress for NoProgress {
    fn total_blocks(&mut self, _count: u64) {}
    fn position(&mut self, _logical_position: u64) {}
}

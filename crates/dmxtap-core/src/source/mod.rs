//! Capture sources for analysis.
//!
//! Sources abstract capture inputs (raw SPI sample dumps today) and keep
//! file I/O separate from signal decoding. A `CaptureSource` yields byte
//! chunks in capture order together with their file offset.

mod spi;

pub use spi::SpiCaptureFileSource;

use thiserror::Error;

/// One chunk of capture bytes emitted by a `CaptureSource`.
#[derive(Debug, Clone)]
pub struct CaptureChunk {
    /// Offset of the first byte within the capture.
    pub offset_bytes: u64,
    /// Packed samples, MSB first.
    pub data: Vec<u8>,
}

/// Abstract capture input for the analysis pipeline.
///
/// # Examples
/// ```
/// use dmxtap_core::{CaptureChunk, CaptureSource, SourceError};
///
/// struct OneChunk(Option<CaptureChunk>);
///
/// impl CaptureSource for OneChunk {
///     fn next_chunk(&mut self) -> Result<Option<CaptureChunk>, SourceError> {
///         Ok(self.0.take())
///     }
/// }
/// ```
pub trait CaptureSource {
    /// Returns the next chunk, or `None` at end of capture.
    fn next_chunk(&mut self) -> Result<Option<CaptureChunk>, SourceError>;
}

/// Errors produced by `CaptureSource` implementations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{CaptureChunk, CaptureSource, SourceError};

/// Capture source backed by a raw SPI sample dump.
///
/// The default mode delivers the whole file as a single chunk: the decoder
/// does not carry lock state across chunks, so this is the only mode that
/// never splits a frame. Block mode bounds memory instead and mirrors the
/// block-wise hardware ingestion the capture came from; frames spanning a
/// block boundary are surfaced as truncated frames.
pub struct SpiCaptureFileSource {
    file: File,
    offset: u64,
    mode: ReadMode,
    done: bool,
}

enum ReadMode {
    Whole,
    Blocks { size: usize },
}

impl SpiCaptureFileSource {
    /// Opens a capture for whole-file delivery.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        Ok(Self {
            file: File::open(path)?,
            offset: 0,
            mode: ReadMode::Whole,
            done: false,
        })
    }

    /// Opens a capture for fixed-size block delivery.
    ///
    /// # Panics
    /// Panics when `size` is zero.
    pub fn with_chunk_size(path: &Path, size: usize) -> Result<Self, SourceError> {
        assert!(size > 0, "chunk size must be non-zero");
        Ok(Self {
            file: File::open(path)?,
            offset: 0,
            mode: ReadMode::Blocks { size },
            done: false,
        })
    }
}

impl CaptureSource for SpiCaptureFileSource {
    fn next_chunk(&mut self) -> Result<Option<CaptureChunk>, SourceError> {
        if self.done {
            return Ok(None);
        }

        let mut data = Vec::new();
        match self.mode {
            ReadMode::Whole => {
                self.file.read_to_end(&mut data)?;
                self.done = true;
            }
            ReadMode::Blocks { size } => {
                data.resize(size, 0);
                let mut filled = 0usize;
                while filled < size {
                    let read = self.file.read(&mut data[filled..])?;
                    if read == 0 {
                        break;
                    }
                    filled += read;
                }
                data.truncate(filled);
                if filled < size {
                    self.done = true;
                }
            }
        }

        if data.is_empty() {
            return Ok(None);
        }

        let chunk = CaptureChunk {
            offset_bytes: self.offset,
            data,
        };
        self.offset += chunk.data.len() as u64;
        Ok(Some(chunk))
    }
}

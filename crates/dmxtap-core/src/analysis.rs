use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use thiserror::Error;

use crate::decoder::timing::SAMPLE_RATE_HZ;
use crate::decoder::SpiDmxParser;
use crate::frame::DmxFrame;
use crate::source::{CaptureSource, SourceError, SpiCaptureFileSource};
use crate::{make_base_report, CaptureSummary, FrameSummary, Report};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Decodes a raw capture file and reports on the frames it carried.
pub fn analyze_capture_file(path: &Path) -> Result<Report, AnalysisError> {
    let source = SpiCaptureFileSource::open(path)?;
    analyze_source(path, source)
}

/// Decodes every chunk of `source` and builds the report.
///
/// The decoder writes into a shared frame; a summary is snapshotted each
/// time the completion callback fires, so truncated frames are counted
/// exactly like complete ones.
pub fn analyze_source<S: CaptureSource>(
    path: &Path,
    mut source: S,
) -> Result<Report, AnalysisError> {
    let frame = Rc::new(RefCell::new(DmxFrame::new()));
    let summaries: Rc<RefCell<Vec<FrameSummary>>> = Rc::new(RefCell::new(Vec::new()));

    let mut bytes_total = 0u64;
    {
        let seen = Rc::clone(&frame);
        let collected = Rc::clone(&summaries);
        let mut parser = SpiDmxParser::with_callback(
            Rc::clone(&frame),
            Box::new(move || {
                let mut collected = collected.borrow_mut();
                let index = collected.len() as u64;
                let summary = summarize_frame(index, &seen.borrow());
                collected.push(summary);
            }),
        );

        while let Some(chunk) = source.next_chunk()? {
            bytes_total += chunk.data.len() as u64;
            parser.parse(&chunk.data);
        }
    }

    let frames = summaries.take();
    let samples_total = bytes_total * 8;
    let duration_s = samples_total as f64 / f64::from(SAMPLE_RATE_HZ);
    let frame_rate = if duration_s > 0.0 && !frames.is_empty() {
        Some(frames.len() as f64 / duration_s)
    } else {
        None
    };

    let mut report = make_base_report(&path.display().to_string(), bytes_total);
    report.capture_summary = Some(CaptureSummary {
        samples_total,
        duration_s,
        frames_total: frames.len() as u64,
        frame_rate,
    });
    report.frames = frames;
    Ok(report)
}

fn summarize_frame(index: u64, frame: &DmxFrame) -> FrameSummary {
    let mut nonzero_slots = 0u16;
    let mut peak_level = 0u8;
    for value in frame.slots() {
        if *value != 0 {
            nonzero_slots += 1;
        }
        peak_level = peak_level.max(*value);
    }
    FrameSummary {
        index,
        nonzero_slots,
        peak_level,
    }
}

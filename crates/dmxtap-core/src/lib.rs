use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

mod analysis;
mod decoder;
mod frame;
mod source;
mod synth;

pub use analysis::{analyze_capture_file, analyze_source, AnalysisError};
pub use decoder::{timing, FrameCallback, SpiDmxParser};
pub use frame::{DmxFrame, DmxSink, DMX_CHANNELS};
pub use source::{CaptureChunk, CaptureSource, SourceError, SpiCaptureFileSource};
pub use synth::{CaptureBuilder, DEFAULT_BREAK_SAMPLES, DEFAULT_MAB_SAMPLES};

pub const REPORT_VERSION: u32 = 1;

/// Versioned report emitted by the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub report_version: u32,
    pub tool: ToolInfo,
    pub generated_at: String,

    pub input: InputInfo,

    pub capture_summary: Option<CaptureSummary>,
    pub frames: Vec<FrameSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    pub path: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub samples_total: u64,
    /// Capture length at the 2 MHz sample clock.
    pub duration_s: f64,
    pub frames_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

/// One decoded frame, snapshotted at its completion signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    pub index: u64,
    pub nonzero_slots: u16,
    pub peak_level: u8,
}

/// Builds a report with the tool and input fields filled in.
pub fn make_base_report(input_path: &str, input_bytes: u64) -> Report {
    let now = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string());

    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "dmxtap".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: now,
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        frames: vec![],
    }
}

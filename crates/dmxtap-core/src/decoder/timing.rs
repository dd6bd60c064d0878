//! Sample-count timing windows.
//!
//! Captures are taken at a nominal 2 MHz, one bit per 500 ns sample. DMX
//! runs at 245 000–255 000 bit/s, so one DMX bit spans 7.84–8.16 samples;
//! the windows below are sized for 7.5–8.5 to leave headroom at both ends.

/// Nominal capture sample clock.
pub const SAMPLE_RATE_HZ: u32 = 2_000_000;

/// 88 us break / 4 us per DMX bit * 7.5 samples.
pub const BREAK_MIN_SAMPLES: u32 = 165;

/// 8 us mark-after-break / 4 us per DMX bit * 7.5 samples.
pub const MAB_MIN_SAMPLES: u32 = 15;

/// (1 start bit + 8 NULL code bits) * 7.5 samples; exclusive lower bound.
pub const STARTCODE_LOW_MIN_SAMPLES: u32 = 67;

/// (1 start bit + 8 NULL code bits) * 8.5 samples; exclusive upper bound.
pub const STARTCODE_LOW_MAX_SAMPLES: u32 = 77;

/// Two stop bits, same floor as the mark-after-break.
pub const STOP_BITS_MIN_SAMPLES: u32 = 15;

/// An all-zero byte this early in the stop bits can only be the next break.
pub const EARLY_BREAK_MAX_SAMPLES: u32 = 11;

/// Break credit when the early-termination shortcut re-enters the break:
/// the ten or so bytes consumed while misreading it as channel data.
pub const RESUMED_BREAK_SAMPLES: u32 = 80;

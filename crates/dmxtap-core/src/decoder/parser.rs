use super::edges::{falling_edge, rising_edge};
use super::timing;
use crate::frame::{DmxSink, DMX_CHANNELS};

const LAST_CHANNEL: i32 = DMX_CHANNELS as i32 - 1;

/// Completion handler, run once per fully decoded frame.
pub type FrameCallback<'a> = Box<dyn FnMut() + 'a>;

/// Framing states. A frame cycles back through `WaitForBreak` or `InBreak`;
/// there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitForBreak,
    InBreak,
    WaitForMab,
    InMab,
    InStartcode,
    InStartcodeStopbits,
    InDataStartbit,
    InDataBits,
    InDataStopbits,
}

impl State {
    /// True once the machine has reached the channel-data region of a frame.
    fn in_data_region(self) -> bool {
        matches!(
            self,
            State::InDataStartbit | State::InDataBits | State::InDataStopbits
        )
    }
}

/// Recovers DMX512 frames from an oversampled capture of the line.
///
/// Each capture byte holds eight 500 ns samples, MSB first (bit 7 is the
/// earliest sample, mark = 1, space = 0). `parse` walks a chunk byte by
/// byte, locks onto the break / mark-after-break sequence, validates the
/// NULL start code, then recovers channel bytes by sampling each DMX bit
/// near its centre. Channel values are written through the [`DmxSink`]; the
/// optional callback fires once per completed frame, including frames cut
/// short by the end of the chunk.
///
/// Anything that violates the timing windows silently drops the lock and
/// waits for the next break; there is no error channel. The callback runs
/// inline and must not call [`SpiDmxParser::parse`] re-entrantly.
///
/// # Examples
/// ```
/// use dmxtap_core::{CaptureBuilder, DmxFrame, SpiDmxParser};
///
/// let mut values = [0u8; 512];
/// values[0] = 128;
/// let mut builder = CaptureBuilder::new();
/// builder.frame(&values);
/// builder.space(176);
///
/// let mut parser = SpiDmxParser::new(DmxFrame::new());
/// parser.parse(&builder.build());
/// assert_eq!(parser.sink().get(0), Some(128));
/// ```
pub struct SpiDmxParser<'a, S: DmxSink> {
    sink: S,
    on_frame: Option<FrameCallback<'a>>,
    state: State,
    /// Sample bits accumulated in the current state.
    state_bitcount: u32,
    /// Sub-byte bit position (LSB-relative) at which data bits are sampled.
    sampling_position: u8,
    /// Bits of the in-flight channel, assembled LSB first.
    current_value: u8,
    /// Index of the last accepted channel; -1 before the first one.
    channel: i32,
}

impl<'a, S: DmxSink> SpiDmxParser<'a, S> {
    /// Creates a parser writing into `sink`, with no completion callback.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            on_frame: None,
            state: State::WaitForBreak,
            state_bitcount: 0,
            sampling_position: 0,
            current_value: 0,
            channel: -1,
        }
    }

    /// Creates a parser that runs `on_frame` once per completed frame.
    pub fn with_callback(sink: S, on_frame: FrameCallback<'a>) -> Self {
        Self {
            on_frame: Some(on_frame),
            ..Self::new(sink)
        }
    }

    /// The sink the parser writes into.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the parser and returns the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Decodes one capture chunk.
    ///
    /// State is single-shot per chunk: the cursor rewinds and the machine
    /// re-arms at `WaitForBreak` on entry, so a frame spanning two calls is
    /// surfaced as two truncated frames, not one. An empty chunk has no
    /// side effects and fires no completion.
    pub fn parse(&mut self, chunk: &[u8]) {
        self.change_state(State::WaitForBreak);
        let mut pos = 0usize;

        while pos < chunk.len() {
            match self.state {
                State::WaitForBreak => self.wait_for_break(chunk, &mut pos),
                State::InBreak => self.in_break(chunk, &mut pos),
                State::WaitForMab => self.wait_for_mab(chunk, &mut pos),
                State::InMab => self.in_mab(chunk, &mut pos),
                State::InStartcode => self.in_startcode(chunk, &mut pos),
                State::InStartcodeStopbits => self.in_startcode_stopbits(chunk, &mut pos),
                State::InDataStartbit => self.in_data_startbit(chunk, &mut pos),
                State::InDataBits => {
                    if self.state_bitcount < 7 {
                        self.in_data_bit(chunk, &mut pos);
                    } else {
                        self.in_last_data_bit(chunk, &mut pos);
                    }
                }
                State::InDataStopbits => self.in_data_stopbits(chunk, &mut pos),
            }
        }

        // A chunk that ends inside the data region still carries a frame;
        // surface it even though its tail is truncated.
        if self.state.in_data_region() {
            self.complete_frame();
        }
    }

    fn change_state(&mut self, next: State) {
        self.state = next;
        self.state_bitcount = 0;
        if next == State::WaitForMab {
            self.channel = -1;
        }
    }

    fn complete_frame(&mut self) {
        if let Some(on_frame) = self.on_frame.as_mut() {
            on_frame();
        }
    }

    fn wait_for_break(&mut self, chunk: &[u8], pos: &mut usize) {
        if let Some(zeros) = falling_edge(chunk[*pos]) {
            self.change_state(State::InBreak);
            self.state_bitcount = u32::from(zeros);
        }
        *pos += 1;
    }

    fn in_break(&mut self, chunk: &[u8], pos: &mut usize) {
        if chunk[*pos] == 0x00 {
            self.state_bitcount += 8;
            if self.state_bitcount > timing::BREAK_MIN_SAMPLES {
                self.change_state(State::WaitForMab);
            }
        } else {
            self.change_state(State::WaitForBreak);
        }
        *pos += 1;
    }

    fn wait_for_mab(&mut self, chunk: &[u8], pos: &mut usize) {
        let byte = chunk[*pos];
        if byte != 0x00 {
            match rising_edge(byte) {
                Some(ones) => {
                    self.change_state(State::InMab);
                    self.state_bitcount = u32::from(ones);
                }
                None => self.change_state(State::WaitForBreak),
            }
        }
        *pos += 1;
    }

    fn in_mab(&mut self, chunk: &[u8], pos: &mut usize) {
        let byte = chunk[*pos];
        if byte == 0xFF {
            self.state_bitcount += 8;
        } else {
            match falling_edge(byte) {
                Some(zeros)
                    if self.state_bitcount + u32::from(8 - zeros) > timing::MAB_MIN_SAMPLES =>
                {
                    self.change_state(State::InStartcode);
                    self.state_bitcount = u32::from(zeros);
                }
                _ => self.change_state(State::WaitForBreak),
            }
        }
        *pos += 1;
    }

    fn in_startcode(&mut self, chunk: &[u8], pos: &mut usize) {
        let byte = chunk[*pos];
        if byte == 0x00 {
            self.state_bitcount += 8;
        } else {
            match rising_edge(byte) {
                Some(ones) => {
                    // Start bit plus eight NULL code bits, all low.
                    let low_total = self.state_bitcount + u32::from(8 - ones);
                    if low_total > timing::STARTCODE_LOW_MIN_SAMPLES
                        && low_total < timing::STARTCODE_LOW_MAX_SAMPLES
                    {
                        self.change_state(State::InStartcodeStopbits);
                        self.state_bitcount = u32::from(ones);
                    } else {
                        self.change_state(State::WaitForBreak);
                    }
                }
                None => self.change_state(State::WaitForBreak),
            }
        }
        *pos += 1;
    }

    fn in_startcode_stopbits(&mut self, chunk: &[u8], pos: &mut usize) {
        let byte = chunk[*pos];
        if byte == 0xFF {
            self.state_bitcount += 8;
        } else {
            match falling_edge(byte) {
                Some(zeros)
                    if self.state_bitcount + u32::from(8 - zeros)
                        > timing::STOP_BITS_MIN_SAMPLES =>
                {
                    self.change_state(State::InDataStartbit);
                    self.state_bitcount = u32::from(zeros);
                }
                _ => self.change_state(State::WaitForBreak),
            }
        }
        *pos += 1;
    }

    /// Picks the sub-byte position at which every data bit of this channel
    /// will be sampled, targeting the centre of a nominal eight-sample bit.
    ///
    /// `state_bitcount` holds the zero samples already seen after the start
    /// bit's falling edge. Four or more means the edge fell in the previous
    /// byte and the centre of the first data bit lies before the midpoint
    /// of the current one, so the previous byte is inspected again without
    /// advancing; fewer than four means the centre is still ahead in the
    /// current byte, which is consumed as usual.
    fn in_data_startbit(&mut self, chunk: &[u8], pos: &mut usize) {
        let byte;
        if self.state_bitcount >= 4 {
            byte = chunk[*pos - 1];
            self.sampling_position = (self.state_bitcount - 4) as u8;
        } else {
            byte = chunk[*pos];
            self.sampling_position = (self.state_bitcount + 4) as u8;
            *pos += 1;
        }

        // The sampled start bit must read low.
        if byte & (1 << self.sampling_position) != 0 {
            self.change_state(State::WaitForBreak);
        } else {
            self.current_value = 0;
            self.change_state(State::InDataBits);
        }
    }

    fn in_data_bit(&mut self, chunk: &[u8], pos: &mut usize) {
        let bit = (chunk[*pos] >> self.sampling_position) & 1;
        self.current_value |= bit << self.state_bitcount;
        self.state_bitcount += 1;
        *pos += 1;
    }

    fn in_last_data_bit(&mut self, chunk: &[u8], pos: &mut usize) {
        let bit = (chunk[*pos] >> self.sampling_position) & 1;
        self.current_value |= bit << 7;

        self.change_state(State::InDataStopbits);
        // Stop-bit counting starts at the sample point, not the byte
        // boundary: the samples after it in this byte already belong to the
        // stop bits. A sample in the first half of the byte puts the whole
        // next byte inside the stop bits as well, so it is skipped unread.
        if self.sampling_position >= 4 {
            self.state_bitcount = u32::from(self.sampling_position);
        } else {
            self.state_bitcount = u32::from(self.sampling_position) + 8;
            *pos += 1;
        }
        *pos += 1;
    }

    fn in_data_stopbits(&mut self, chunk: &[u8], pos: &mut usize) {
        let byte = chunk[*pos];
        if byte == 0xFF {
            self.state_bitcount += 8;
            *pos += 1;
            return;
        }

        if byte == 0x00
            && self.state_bitcount <= timing::EARLY_BREAK_MAX_SAMPLES
            && self.current_value == 0x00
        {
            // An all-zero byte this early means the "channel" being decoded
            // was really the next break, so every remaining channel is zero.
            let first_unwritten = (self.channel + 1) as usize;
            self.sink
                .set_range(first_unwritten, 0x00, (LAST_CHANNEL - self.channel) as usize);
            self.channel = LAST_CHANNEL;
            self.complete_frame();

            self.change_state(State::InBreak);
            self.state_bitcount = timing::RESUMED_BREAK_SAMPLES;
            *pos += 1;
            return;
        }

        let edge = falling_edge(byte);
        // No clean falling edge counts as nine mark samples so that the
        // short-stop check runs before the 0x01 special case below.
        let ones = edge.map_or(9, |zeros| u32::from(8 - zeros));
        if self.state_bitcount + ones <= timing::STOP_BITS_MIN_SAMPLES {
            self.complete_frame();
            self.change_state(State::WaitForBreak);
            *pos += 1;
            return;
        }

        let zeros = match edge {
            Some(zeros) => zeros,
            // Not a falling edge: the only shape accepted is 0x01, a mark
            // region ending one sample into the byte whose remaining seven
            // samples already belong to the next start bit.
            None if rising_edge(byte) == Some(1) => 7,
            None => {
                self.complete_frame();
                self.change_state(State::WaitForBreak);
                *pos += 1;
                return;
            }
        };

        self.channel += 1;
        self.sink.set(self.channel as usize, self.current_value);

        if self.channel == LAST_CHANNEL {
            self.complete_frame();
            self.change_state(State::InBreak);
        } else {
            self.change_state(State::InDataStartbit);
        }
        self.state_bitcount = u32::from(zeros);
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::{SpiDmxParser, State};
    use crate::frame::DmxFrame;
    use crate::synth::CaptureBuilder;

    fn preamble() -> Vec<u8> {
        let mut bytes = vec![0x00; 22];
        bytes.extend([0xFF, 0xFF]);
        bytes.extend([0x00; 9]);
        bytes.extend([0xFF, 0xFF]);
        bytes
    }

    /// Channel byte at an exact eight-sample bit width, byte aligned:
    /// one start-bit byte then one byte per data bit, LSB first.
    fn aligned_channel(value: u8) -> Vec<u8> {
        let mut bytes = vec![0x00];
        for bit in 0..8 {
            bytes.push(if value & (1 << bit) != 0 { 0xFF } else { 0x00 });
        }
        bytes
    }

    #[test]
    fn empty_chunk_has_no_side_effects() {
        let completions = Cell::new(0u32);
        let mut parser =
            SpiDmxParser::with_callback(DmxFrame::new(), Box::new(|| completions.set(completions.get() + 1)));
        parser.parse(&[]);
        assert_eq!(completions.get(), 0);
        assert_eq!(parser.state, State::WaitForBreak);
        assert!(parser.sink().slots().iter().all(|v| *v == 0));
    }

    #[test]
    fn break_threshold_enters_wait_for_mab_and_resets_channel() {
        let mut parser = SpiDmxParser::new(DmxFrame::new());
        parser.channel = 17;
        parser.parse(&[0x00; 22]);
        assert_eq!(parser.state, State::WaitForMab);
        assert_eq!(parser.channel, -1);
    }

    #[test]
    fn noisy_byte_in_break_drops_the_lock() {
        let mut bytes = vec![0x00; 5];
        bytes.push(0x7E);
        let mut parser = SpiDmxParser::new(DmxFrame::new());
        parser.parse(&bytes);
        assert_eq!(parser.state, State::WaitForBreak);
    }

    #[test]
    fn short_mab_is_rejected_without_writes() {
        // 8 mark samples from 0xFF plus 7 from 0xFE is exactly the floor,
        // which is not enough.
        let mut bytes = vec![0x00; 22];
        bytes.extend([0xFF, 0xFE]);

        let completions = Cell::new(0u32);
        let mut frame = DmxFrame::new();
        frame.set_range(0, 9, 512);
        let mut parser =
            SpiDmxParser::with_callback(frame, Box::new(|| completions.set(completions.get() + 1)));
        parser.parse(&bytes);

        assert_eq!(parser.state, State::WaitForBreak);
        assert_eq!(completions.get(), 0);
        assert!(parser.sink().slots().iter().all(|v| *v == 9));
    }

    #[test]
    fn stop_bit_boundary_byte_0x01_is_accepted() {
        let mut bytes = preamble();
        bytes.extend(aligned_channel(0x55));
        // One full stop byte, then a mark region ending one sample into
        // the byte.
        bytes.extend([0xFF, 0x01]);

        let completions = Cell::new(0u32);
        let mut parser = SpiDmxParser::with_callback(
            DmxFrame::new(),
            Box::new(|| completions.set(completions.get() + 1)),
        );
        parser.parse(&bytes);

        assert_eq!(parser.sink().get(0), Some(0x55));
        assert_eq!(parser.channel, 0);
        assert_eq!(parser.state, State::InDataStartbit);
        assert_eq!(parser.state_bitcount, 7);
        // The chunk ends inside the data region: exactly one completion.
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn early_termination_fills_tail_and_resumes_in_break() {
        let mut values = [0u8; 512];
        for (i, value) in values.iter_mut().enumerate().take(38) {
            *value = i as u8 + 1;
        }
        let mut builder = CaptureBuilder::new();
        builder.frame(&values[..38]);
        // Ten break bytes: the falling edge that ends channel 37 plus the
        // nine consumed while misreading the break as channel 38.
        builder.space(80);

        let completions = Cell::new(0u32);
        let mut parser = SpiDmxParser::with_callback(
            DmxFrame::new(),
            Box::new(|| completions.set(completions.get() + 1)),
        );
        parser.parse(&builder.build());

        for i in 0..38 {
            assert_eq!(parser.sink().get(i), Some(i as u8 + 1), "channel {i}");
        }
        assert!(parser.sink().slots()[38..].iter().all(|v| *v == 0));
        assert_eq!(parser.channel, 511);
        assert_eq!(parser.state, State::InBreak);
        assert_eq!(parser.state_bitcount, 80);
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn short_stop_bits_complete_without_writing_the_channel() {
        let mut bytes = preamble();
        bytes.extend(aligned_channel(0xC3));
        // 4 counted samples at the last data bit plus 8 from the full stop
        // byte plus 3 leading marks of 0xE0 is exactly the floor of 15, so
        // the channel is dropped and the frame is surfaced as truncated.
        bytes.extend([0xFF, 0xE0, 0x5A]);

        let completions = Cell::new(0u32);
        let mut frame = DmxFrame::new();
        frame.set_range(0, 7, 512);
        let mut parser =
            SpiDmxParser::with_callback(frame, Box::new(|| completions.set(completions.get() + 1)));
        parser.parse(&bytes);

        assert!(parser.sink().slots().iter().all(|v| *v == 7));
        assert_eq!(parser.state, State::WaitForBreak);
        // One completion at the abort; none again at end of chunk.
        assert_eq!(completions.get(), 1);
    }
}

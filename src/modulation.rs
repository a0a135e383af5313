use crate::baud::BaudConfig;
use crate::{MARK_FREQUENCY, SPACE_FREQUENCY};
use std::f32::consts::PI;
use tokio::sync::mpsc;

/// One transmitted tone. Mark (1200 Hz) carries bit 0, space (2400 Hz)
/// carries bit 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Mark,
    Space,
}

impl Symbol {
    pub fn frequency(self) -> f32 {
        match self {
            Symbol::Mark => MARK_FREQUENCY,
            Symbol::Space => SPACE_FREQUENCY,
        }
    }

    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Symbol::Space
        } else {
            Symbol::Mark
        }
    }

    pub fn bit(self) -> bool {
        self == Symbol::Space
    }

    pub fn flip(self) -> Self {
        match self {
            Symbol::Mark => Symbol::Space,
            Symbol::Space => Symbol::Mark,
        }
    }
}

/// Line-coding variant. Standard maps bits straight to tones; NRZI carries
/// bit 1 as a polarity transition and bit 0 as a repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LineCoding {
    Standard,
    Nrzi,
}

impl LineCoding {
    pub fn encoder(self) -> Encoder {
        match self {
            LineCoding::Standard => Encoder::Standard,
            LineCoding::Nrzi => Encoder::Nrzi { polarity: Symbol::Mark },
        }
    }

    pub fn decoder(self) -> Decoder {
        match self {
            LineCoding::Standard => Decoder::Standard,
            LineCoding::Nrzi => Decoder::Nrzi { polarity: Symbol::Mark },
        }
    }
}

/// Bit-to-symbol step function. The NRZI variant holds one bit of polarity
/// history; encoder and decoder must start at the same polarity (mark), and
/// nothing on the wire re-synchronizes them if they diverge.
#[derive(Debug, Clone, Copy)]
pub enum Encoder {
    Standard,
    Nrzi { polarity: Symbol },
}

impl Encoder {
    pub fn encode(&mut self, bit: bool) -> Symbol {
        match self {
            Encoder::Standard => Symbol::from_bit(bit),
            Encoder::Nrzi { polarity } => {
                if bit {
                    *polarity = polarity.flip();
                }
                *polarity
            }
        }
    }
}

/// Symbol-to-bit step function mirroring [`Encoder`].
#[derive(Debug, Clone, Copy)]
pub enum Decoder {
    Standard,
    Nrzi { polarity: Symbol },
}

impl Decoder {
    pub fn decode(&mut self, symbol: Symbol) -> bool {
        match self {
            Decoder::Standard => symbol.bit(),
            Decoder::Nrzi { polarity } => {
                if symbol == *polarity {
                    false
                } else {
                    *polarity = symbol;
                    true
                }
            }
        }
    }
}

/// Bits of a byte, most-significant first.
pub fn iter_bits(byte: u8) -> impl Iterator<Item = bool> {
    (0..8).rev().map(move |shift| (byte >> shift) & 1 == 1)
}

/// Two-tone AFSK modulator/demodulator for a fixed baud configuration.
///
/// Carries no state of its own; line-coding state lives in the per-stream
/// [`Encoder`]/[`Decoder`] created when a pipeline stage starts.
pub struct Modulator {
    baud: BaudConfig,
    amplitude: f32,
    coding: LineCoding,
    mark_reference: Vec<f32>,
    space_reference: Vec<f32>,
}

impl Modulator {
    pub fn new(baud: BaudConfig, coding: LineCoding, amplitude: f32) -> Self {
        let mut modulator = Self {
            baud,
            amplitude,
            coding,
            mark_reference: Vec::new(),
            space_reference: Vec::new(),
        };
        modulator.mark_reference = modulator.modulate_bit(Symbol::Mark);
        modulator.space_reference = modulator.modulate_bit(Symbol::Space);
        modulator
    }

    pub fn frame_size(&self) -> usize {
        self.baud.frame_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.baud.sample_rate
    }

    /// One frame of amplitude-scaled cosine at the symbol's tone frequency.
    pub fn modulate_bit(&self, symbol: Symbol) -> Vec<f32> {
        let frequency = symbol.frequency();
        let sample_rate = self.baud.sample_rate as f32;
        (0..self.baud.frame_size)
            .map(|n| self.amplitude * (2.0 * PI * frequency * n as f32 / sample_rate).cos())
            .collect()
    }

    /// Minimum-distance decision against the two reference tones. Ties go
    /// to mark. Always yields a symbol; there is no confidence signal.
    pub fn detect(&self, frame: &[f32]) -> Symbol {
        let mark_diff: f32 = frame
            .iter()
            .zip(&self.mark_reference)
            .map(|(sample, reference)| (sample - reference).abs())
            .sum();
        let space_diff: f32 = frame
            .iter()
            .zip(&self.space_reference)
            .map(|(sample, reference)| (sample - reference).abs())
            .sum();

        if space_diff < mark_diff {
            Symbol::Space
        } else {
            Symbol::Mark
        }
    }

    /// Pipeline stage: pull byte messages, emit one frame per bit onto the
    /// outbound sample queue, eight frames per byte in order. Runs until
    /// the byte queue closes or the sample queue's consumer goes away.
    pub async fn modulate(
        &self,
        mut data_in: mpsc::UnboundedReceiver<Vec<u8>>,
        audio_out: crossbeam_channel::Sender<Vec<f32>>,
    ) {
        let mut encoder = self.coding.encoder();

        while let Some(packet) = data_in.recv().await {
            for &byte in &packet {
                for bit in iter_bits(byte) {
                    let frame = self.modulate_bit(encoder.encode(bit));
                    if audio_out.send(frame).is_err() {
                        log::debug!("outbound sample queue closed, modulator exiting");
                        return;
                    }
                }
            }
        }
    }

    /// Pipeline stage: consume exactly eight aligned frames per decoded
    /// byte, most-significant bit first.
    pub async fn demodulate(
        &self,
        mut audio_in: mpsc::UnboundedReceiver<Vec<f32>>,
        data_out: mpsc::UnboundedSender<u8>,
    ) {
        let mut decoder = self.coding.decoder();

        'bytes: loop {
            let mut byte = 0u8;
            for _ in 0..8 {
                let Some(frame) = audio_in.recv().await else {
                    break 'bytes;
                };
                let bit = decoder.decode(self.detect(&frame));
                byte = (byte << 1) | bit as u8;
            }
            if data_out.send(byte).is_err() {
                log::debug!("inbound byte queue closed, demodulator exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modulator(coding: LineCoding) -> Modulator {
        Modulator::new(BaudConfig::new(300).unwrap(), coding, 0.2)
    }

    #[test]
    fn test_iter_bits_msb_first() {
        let bits: Vec<bool> = iter_bits(0b0100_0001).collect();
        let expected = [false, true, false, false, false, false, false, true];
        assert_eq!(bits, expected);
    }

    #[test]
    fn test_modulate_bit_shape() {
        let modulator = modulator(LineCoding::Standard);
        for symbol in [Symbol::Mark, Symbol::Space] {
            let frame = modulator.modulate_bit(symbol);
            assert_eq!(frame.len(), 160);
            assert!((frame[0] - 0.2).abs() < 1e-6);
            assert!(frame.iter().all(|sample| sample.abs() <= 0.2 + 1e-6));
        }
    }

    #[test]
    fn test_modulate_bit_deterministic() {
        let modulator = modulator(LineCoding::Standard);
        assert_eq!(
            modulator.modulate_bit(Symbol::Mark),
            modulator.modulate_bit(Symbol::Mark)
        );
    }

    #[test]
    fn test_detect_clean_tones() {
        let modulator = modulator(LineCoding::Standard);
        assert_eq!(modulator.detect(&modulator.modulate_bit(Symbol::Mark)), Symbol::Mark);
        assert_eq!(modulator.detect(&modulator.modulate_bit(Symbol::Space)), Symbol::Space);
    }

    #[test]
    fn test_detect_tolerates_one_sample_shift() {
        // The synchronizer can leave one residual silence sample at the
        // front of a window; detection must still resolve the tone.
        let modulator = modulator(LineCoding::Standard);
        for symbol in [Symbol::Mark, Symbol::Space] {
            let mut frame = modulator.modulate_bit(symbol);
            frame.pop();
            frame.insert(0, 0.0);
            assert_eq!(modulator.detect(&frame), symbol);
        }
    }

    #[test]
    fn test_standard_coding_is_stateless() {
        let mut encoder = LineCoding::Standard.encoder();
        let mut decoder = LineCoding::Standard.decoder();
        for bit in [true, false, true, true, false] {
            assert_eq!(decoder.decode(encoder.encode(bit)), bit);
        }
        assert_eq!(encoder.encode(false), Symbol::Mark);
        assert_eq!(encoder.encode(true), Symbol::Space);
    }

    #[test]
    fn test_nrzi_encoder_flips_on_one() {
        let mut encoder = LineCoding::Nrzi.encoder();
        let symbols: Vec<Symbol> = [true, false, true, true, false]
            .into_iter()
            .map(|bit| encoder.encode(bit))
            .collect();
        assert_eq!(
            symbols,
            [Symbol::Space, Symbol::Space, Symbol::Mark, Symbol::Space, Symbol::Space]
        );
    }

    #[test]
    fn test_nrzi_roundtrip_from_shared_initial_polarity() {
        let mut encoder = LineCoding::Nrzi.encoder();
        let mut decoder = LineCoding::Nrzi.decoder();
        let bits = [true, true, false, true, false, false, true, true, false];
        for bit in bits {
            assert_eq!(decoder.decode(encoder.encode(bit)), bit);
        }
    }

    #[tokio::test]
    async fn test_modulate_stage_emits_eight_frames_per_byte() {
        let modulator = modulator(LineCoding::Standard);
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        let (audio_tx, audio_rx) = crossbeam_channel::unbounded();

        data_tx.send(vec![0xA5, 0x00]).unwrap();
        drop(data_tx);
        modulator.modulate(data_rx, audio_tx).await;

        let frames: Vec<Vec<f32>> = audio_rx.try_iter().collect();
        assert_eq!(frames.len(), 16);
        assert!(frames.iter().all(|frame| frame.len() == 160));
    }

    #[tokio::test]
    async fn test_demodulate_stage_rebuilds_bytes() {
        for coding in [LineCoding::Standard, LineCoding::Nrzi] {
            let modulator = modulator(coding);
            let (frame_tx, frame_rx) = mpsc::unbounded_channel();
            let (byte_tx, mut byte_rx) = mpsc::unbounded_channel();

            let mut encoder = coding.encoder();
            for byte in [0x00u8, 0xFF, 0x42, 0xA5] {
                for bit in iter_bits(byte) {
                    frame_tx
                        .send(modulator.modulate_bit(encoder.encode(bit)))
                        .unwrap();
                }
            }
            drop(frame_tx);
            modulator.demodulate(frame_rx, byte_tx).await;

            let mut decoded = Vec::new();
            while let Ok(byte) = byte_rx.try_recv() {
                decoded.push(byte);
            }
            assert_eq!(decoded, [0x00, 0xFF, 0x42, 0xA5]);
        }
    }
}

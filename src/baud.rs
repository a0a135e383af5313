use crate::error::{ModemError, Result};

/// Fixed oversampling rate shared by every baud option.
pub const SAMPLE_RATE: u32 = 48_000;

pub const BAUD_RATES: [u32; 6] = [30, 300, 600, 1200, 1800, 2400];
pub const DEFAULT_BAUD: u32 = 300;

/// Validated (baud, sample_rate, frame_size) triple. One frame carries one
/// bit, so `frame_size = sample_rate / baud` must divide evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudConfig {
    pub baud: u32,
    pub sample_rate: u32,
    pub frame_size: usize,
}

impl BaudConfig {
    pub fn new(baud: u32) -> Result<Self> {
        if !BAUD_RATES.contains(&baud) || SAMPLE_RATE % baud != 0 {
            return Err(ModemError::InvalidBaud(baud));
        }
        Ok(Self {
            baud,
            sample_rate: SAMPLE_RATE,
            frame_size: (SAMPLE_RATE / baud) as usize,
        })
    }

    /// Wall-clock duration of one frame at the audio boundary's cadence.
    pub fn frame_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_size as f64 / self.sample_rate as f64)
    }
}

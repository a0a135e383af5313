use thiserror::Error;

use crate::baud::SAMPLE_RATE;

#[derive(Error, Debug)]
pub enum ModemError {
    #[error("unsupported baud rate {0}: must divide the {SAMPLE_RATE} Hz sample rate evenly")]
    InvalidBaud(u32),

    #[error("amplitude {0} is outside (0, 1]")]
    InvalidAmplitude(f32),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("timed out waiting for data")]
    Timeout,

    #[error("uncorrectable codeword {0:#010b}")]
    Uncorrectable(u8),

    #[error("transport is already connected")]
    AlreadyConnected,

    #[error("transport is not connected")]
    Disconnected,

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ModemError>;

pub mod audio;
pub mod baud;
pub mod ecc;
pub mod error;
pub mod modulation;
pub mod signal;
pub mod sync;
pub mod transport;
pub mod wav;

pub use baud::{BaudConfig, BAUD_RATES, DEFAULT_BAUD, SAMPLE_RATE};
pub use ecc::{Hamming84, HAMMING_8_4};
pub use error::{ModemError, Result};
pub use modulation::{iter_bits, Decoder, Encoder, LineCoding, Modulator, Symbol};
pub use signal::StatusLatch;
pub use sync::FrameSynchronizer;
pub use transport::{ModemConfig, Transport};
pub use wav::{read_wav, write_wav};

/// Tone frequency for the bit-0 (mark) symbol.
pub const MARK_FREQUENCY: f32 = 1200.0;
/// Tone frequency for the bit-1 (space) symbol.
pub const SPACE_FREQUENCY: f32 = 2400.0;

pub const DEFAULT_AMPLITUDE: f32 = 0.2;

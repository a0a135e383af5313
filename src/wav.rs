use crate::baud::BaudConfig;
use crate::error::Result;
use crate::modulation::{iter_bits, LineCoding, Modulator};
use std::path::Path;

/// Modulates `data` into a mono float PCM file: `frame_size * 8` samples
/// per byte, raw concatenated bit frames, no preamble or framing.
pub fn write_wav(
    path: &Path,
    data: &[u8],
    baud: u32,
    coding: LineCoding,
    amplitude: f32,
) -> Result<()> {
    let config = BaudConfig::new(baud)?;
    let modulator = Modulator::new(config, coding, amplitude);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let mut encoder = coding.encoder();
    for &byte in data {
        for bit in iter_bits(byte) {
            for sample in modulator.modulate_bit(encoder.encode(bit)) {
                writer.write_sample(sample)?;
            }
        }
    }
    writer.finalize()?;
    log::debug!("wrote {} bytes as {} frames to {}", data.len(), data.len() * 8, path.display());
    Ok(())
}

/// Exact inverse of [`write_wav`]: the file must be byte-boundary aligned
/// with no leading silence. A trailing partial byte is ignored. This is
/// not general-purpose demodulation of an arbitrary recording.
pub fn read_wav(path: &Path, baud: u32, coding: LineCoding) -> Result<Vec<u8>> {
    let config = BaudConfig::new(baud)?;
    // Detection runs against unit-amplitude references; minimum distance
    // still resolves files recorded at lower amplitudes.
    let modulator = Modulator::new(config, coding, 1.0);

    let reader = hound::WavReader::open(path)?;
    let samples: Vec<f32> = reader
        .into_samples::<f32>()
        .collect::<std::result::Result<_, _>>()?;

    let mut decoder = coding.decoder();
    let mut message = Vec::new();
    let mut byte = 0u8;
    let mut bits = 0;
    for frame in samples.chunks_exact(config.frame_size) {
        let bit = decoder.decode(modulator.detect(frame));
        byte = (byte << 1) | bit as u8;
        bits += 1;
        if bits == 8 {
            message.push(byte);
            byte = 0;
            bits = 0;
        }
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8], baud: u32, coding: LineCoding, amplitude: f32) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("message.wav");
        write_wav(&path, data, baud, coding, amplitude).unwrap();
        assert_eq!(read_wav(&path, baud, coding).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_300_baud() {
        roundtrip(b"hello jake", 300, LineCoding::Standard, 1.0);
    }

    #[test]
    fn test_roundtrip_1200_baud() {
        roundtrip(b"\xffderp", 1200, LineCoding::Standard, 1.0);
    }

    #[test]
    fn test_roundtrip_nrzi() {
        roundtrip(b"hello jake", 300, LineCoding::Nrzi, 1.0);
    }

    #[test]
    fn test_roundtrip_low_amplitude() {
        roundtrip(b"quiet", 600, LineCoding::Standard, 0.2);
    }

    #[test]
    fn test_sample_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.wav");
        write_wav(&path, b"ab", 300, LineCoding::Standard, 1.0).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 48_000);
        assert_eq!(reader.len(), 2 * 8 * 160);
    }
}

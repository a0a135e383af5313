use crate::error::{ModemError, Result};

/// Hamming(8,4) nibble codec: single-error correction, double-error
/// detection. Not wired into the live pipeline; available for callers that
/// want to spend the unused nibble on forward error correction.
///
/// Codeword layout, bit 7 down to bit 0: `p0 p1 d0 p2 d1 d2 d3 p3`, where
/// p3 is the overall parity across the other seven bits.
#[derive(Debug, Clone, Copy)]
pub struct Hamming84 {
    table: [u8; 16],
}

/// The 16 valid codewords, built once as a process-wide constant.
pub const HAMMING_8_4: Hamming84 = Hamming84::new();

const fn codeword(nibble: u8) -> u8 {
    let d0 = nibble & 1;
    let d1 = (nibble >> 1) & 1;
    let d2 = (nibble >> 2) & 1;
    let d3 = (nibble >> 3) & 1;
    let p0 = d0 ^ d1 ^ d3;
    let p1 = d0 ^ d2 ^ d3;
    let p2 = d1 ^ d2 ^ d3;
    let p3 = p0 ^ p1 ^ p2 ^ d0 ^ d1 ^ d2 ^ d3;
    (p0 << 7) | (p1 << 6) | (d0 << 5) | (p2 << 4) | (d1 << 3) | (d2 << 2) | (d3 << 1) | p3
}

impl Hamming84 {
    pub const fn new() -> Self {
        let mut table = [0u8; 16];
        let mut nibble = 0;
        while nibble < 16 {
            table[nibble] = codeword(nibble as u8);
            nibble += 1;
        }
        Self { table }
    }

    /// Table lookup; the upper four bits of `nibble` are ignored.
    pub fn encode(&self, nibble: u8) -> u8 {
        self.table[(nibble & 0x0F) as usize]
    }

    /// Scans all 16 codewords by Hamming distance. An exact match returns
    /// immediately; otherwise a unique distance-1 candidate is returned
    /// corrected, and zero or two-plus distinct candidates are
    /// uncorrectable.
    pub fn decode(&self, encoded: u8) -> Result<u8> {
        let mut candidate: Option<u8> = None;
        let mut ambiguous = false;

        for (nibble, &code) in self.table.iter().enumerate() {
            match (encoded ^ code).count_ones() {
                0 => return Ok(nibble as u8),
                1 => match candidate {
                    None => candidate = Some(nibble as u8),
                    Some(found) if found != nibble as u8 => ambiguous = true,
                    Some(_) => {}
                },
                _ => {}
            }
        }

        if ambiguous {
            return Err(ModemError::Uncorrectable(encoded));
        }
        candidate.ok_or(ModemError::Uncorrectable(encoded))
    }
}

impl Default for Hamming84 {
    fn default() -> Self {
        Self::new()
    }
}

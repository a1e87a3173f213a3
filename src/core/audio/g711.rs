//! G.711 u-law companding.
//!
//! Telephony audio arrives as 8-bit logarithmically companded samples. These
//! helpers expand them to 16-bit linear PCM and compress linear samples back,
//! using the standard segment/mantissa layout with a bias of 0x84.

/// Bias added before segment lookup.
const ULAW_BIAS: i32 = 0x84;

/// Largest magnitude that can be encoded without overflowing the top segment.
const ULAW_CLIP: i32 = 32635;

/// Expand a single u-law byte to a linear 16-bit sample.
#[inline]
pub fn ulaw_to_linear(byte: u8) -> i16 {
    let inverted = !byte;
    let sign = inverted & 0x80;
    let exponent = (inverted >> 4) & 0x07;
    let mantissa = inverted & 0x0F;

    let magnitude = ((((mantissa as i32) << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Compress a linear 16-bit sample to a u-law byte.
#[inline]
pub fn linear_to_ulaw(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign: u8 = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };

    magnitude = magnitude.min(ULAW_CLIP) + ULAW_BIAS;

    let mut exponent: u8 = 7;
    let mut mask: i32 = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = ((magnitude >> (exponent + 3)) & 0x0F) as u8;
    !(sign | (exponent << 4) | mantissa)
}

/// Decode a buffer of u-law bytes into linear samples.
pub fn decode_ulaw(bytes: &[u8]) -> Vec<i16> {
    bytes.iter().map(|&b| ulaw_to_linear(b)).collect()
}

/// Encode linear samples into u-law bytes.
pub fn encode_ulaw(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| linear_to_ulaw(s)).collect()
}

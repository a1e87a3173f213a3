//! Integer-factor sample rate conversion between the telephony rate (8 kHz)
//! and the model rate (24 kHz).
//!
//! Upsampling uses linear interpolation; downsampling averages each group of
//! samples before decimating. Both are stateless per chunk, so the last input
//! sample is held at the chunk boundary.

/// Ratio between the model and telephony sample rates.
pub const RATE_FACTOR: usize = 3;

/// Upsample by [`RATE_FACTOR`]. Output length is exactly `3 * input.len()`.
pub fn upsample(samples: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(samples.len() * RATE_FACTOR);

    for (i, &current) in samples.iter().enumerate() {
        let next = samples.get(i + 1).copied().unwrap_or(current);
        let current = current as i32;
        let delta = next as i32 - current;

        for step in 0..RATE_FACTOR as i32 {
            out.push((current + delta * step / RATE_FACTOR as i32) as i16);
        }
    }

    out
}

/// Downsample by [`RATE_FACTOR`]. Output length is `ceil(input.len() / 3)`;
/// a trailing partial group is averaged over the samples it has.
pub fn downsample(samples: &[i16]) -> Vec<i16> {
    samples
        .chunks(RATE_FACTOR)
        .map(|group| {
            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            (sum / group.len() as i32) as i16
        })
        .collect()
}

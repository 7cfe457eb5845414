//! 16-bit PCM WAV encoding
//!
//! Always two channels, canonical 44-byte header:
//!
//! ```text
//! Offset  Size  Field
//! 0       4     "RIFF"
//! 4       4     file length - 8
//! 8       4     "WAVE"
//! 12      4     "fmt "
//! 16      4     16 (fmt chunk length)
//! 20      2     1 (PCM)
//! 22      2     channels (2)
//! 24      4     sample rate
//! 28      4     byte rate = sample rate × channels × 2
//! 32      2     block align = channels × 2
//! 34      2     16 (bits per sample)
//! 36      4     "data"
//! 40      4     data length = frames × channels × 2
//! 44      ...   interleaved little-endian i16
//! ```
//!
//! Samples are clamped to [-1, 1] and scaled asymmetrically, ×32768 when
//! negative and ×32767 otherwise, then truncated toward zero. So 0.5
//! becomes 16383 and -0.5 becomes -16384.

use crate::error::EncodingError;
use crate::signal::StereoBuffer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const HEADER_LEN: usize = 44;
pub const CHANNELS: u16 = 2;
pub const BITS_PER_SAMPLE: u16 = 16;

/// Float sample to 16-bit PCM
#[inline]
pub fn quantize(sample: f32) -> i16 {
    // NaN reads as silence
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Byte length of the data chunk, checked against the 32-bit RIFF limit
fn data_len(buffer: &StereoBuffer) -> Result<u32, EncodingError> {
    if buffer.left.len() != buffer.right.len() {
        return Err(EncodingError::ChannelMismatch {
            left: buffer.left.len(),
            right: buffer.right.len(),
        });
    }
    let bytes = buffer.frames() as u64 * CHANNELS as u64 * (BITS_PER_SAMPLE / 8) as u64;
    // RIFF length field holds data + 36 header bytes
    if bytes + (HEADER_LEN as u64 - 8) > u32::MAX as u64 {
        return Err(EncodingError::TooLarge(bytes));
    }
    Ok(bytes as u32)
}

/// Write `buffer` as a WAV stream
pub fn write<W: Write>(writer: &mut W, buffer: &StereoBuffer) -> Result<(), EncodingError> {
    if buffer.sample_rate == 0 {
        return Err(EncodingError::ZeroSampleRate);
    }
    let data_size = data_len(buffer)?;

    let sample_rate = buffer.sample_rate;
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * block_align as u32;
    let file_size = data_size + (HEADER_LEN as u32 - 8);

    writer.write_all(b"RIFF")?;
    writer.write_all(&file_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_all(&16u32.to_le_bytes())?;
    writer.write_all(&1u16.to_le_bytes())?;
    writer.write_all(&CHANNELS.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;
    writer.write_all(&byte_rate.to_le_bytes())?;
    writer.write_all(&block_align.to_le_bytes())?;
    writer.write_all(&BITS_PER_SAMPLE.to_le_bytes())?;

    writer.write_all(b"data")?;
    writer.write_all(&data_size.to_le_bytes())?;

    for (&l, &r) in buffer.left.iter().zip(buffer.right.iter()) {
        writer.write_all(&quantize(l).to_le_bytes())?;
        writer.write_all(&quantize(r).to_le_bytes())?;
    }

    writer.flush()?;
    Ok(())
}

/// Encode `buffer` into an in-memory WAV file
pub fn encode(buffer: &StereoBuffer) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(HEADER_LEN + buffer.frames() * 4);
    write(&mut out, buffer)?;
    Ok(out)
}

/// Encode `buffer` straight to a file
pub fn write_file<P: AsRef<Path>>(path: P, buffer: &StereoBuffer) -> Result<(), EncodingError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(&mut writer, buffer)?;
    log::debug!(
        "Wrote {} frames at {}Hz to {}",
        buffer.frames(),
        buffer.sample_rate,
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
    }

    // ==========================================================================
    // QUANTIZATION
    // ==========================================================================
    //
    //   1.0  →  32767      0.5  →  16383  (16383.5 truncated)
    //  -1.0  → -32768     -0.5  → -16384
    // ==========================================================================

    #[test]
    fn test_asymmetric_scaling() {
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
        assert_eq!(quantize(0.0), 0);
    }

    #[test]
    fn test_half_scale_truncates_rather_than_rounds() {
        // 0.5 · 32767 = 16383.5 truncates toward zero, as a browser
        // DataView.setInt16 encoder does; rounding would give 16384
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
    }

    #[test]
    fn test_out_of_range_clamps() {
        assert_eq!(quantize(3.0), 32767);
        assert_eq!(quantize(-7.5), -32768);
        assert_eq!(quantize(f32::INFINITY), 32767);
        assert_eq!(quantize(f32::NAN), 0);
    }

    // ==========================================================================
    // HEADER
    // ==========================================================================

    #[test]
    fn test_header_layout() {
        let buffer = StereoBuffer::silent(100, 48000);
        let bytes = encode(&buffer).unwrap();

        assert_eq!(bytes.len(), 44 + 400);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), bytes.len() as u32 - 8);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16);
        assert_eq!(u16_at(&bytes, 20), 1);
        assert_eq!(u16_at(&bytes, 22), 2);
        assert_eq!(u32_at(&bytes, 24), 48000);
        assert_eq!(u32_at(&bytes, 28), 48000 * 4);
        assert_eq!(u16_at(&bytes, 32), 4);
        assert_eq!(u16_at(&bytes, 34), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), 400);
        assert!(bytes[44..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_samples_are_interleaved() {
        let buffer = StereoBuffer {
            left: vec![1.0, 0.0],
            right: vec![-1.0, 0.5],
            sample_rate: 44100,
        };
        let bytes = encode(&buffer).unwrap();
        let samples: Vec<i16> = bytes[44..]
            .chunks(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(samples, vec![32767, -32768, 0, 16383]);
    }

    #[test]
    fn test_empty_buffer_is_header_only() {
        let bytes = encode(&StereoBuffer::silent(0, 44100)).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(u32_at(&bytes, 40), 0);
    }

    // ==========================================================================
    // ERRORS
    // ==========================================================================

    #[test]
    fn test_zero_sample_rate() {
        assert!(matches!(
            encode(&StereoBuffer::silent(10, 0)),
            Err(EncodingError::ZeroSampleRate)
        ));
    }

    #[test]
    fn test_channel_mismatch() {
        let buffer = StereoBuffer {
            left: vec![0.0; 3],
            right: vec![0.0; 2],
            sample_rate: 44100,
        };
        assert!(matches!(
            encode(&buffer),
            Err(EncodingError::ChannelMismatch { left: 3, right: 2 })
        ));
    }
}

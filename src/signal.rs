//! Signal primitives: sample buffers, level helpers, bin/Hz mapping and decoding
//!
//! # Levels
//!
//! Everything downstream reasons about loudness with three numbers:
//!
//! ```text
//! RMS      sqrt(mean(x²))              perceived loudness proxy
//! Peak     max(|x|)                    headroom / clipping risk
//! dB       20·log10(max(rms, 1e-5))    floored at -100 dB so silence stays finite
//! ```
//!
//! # Frequency bins
//!
//! A spectrum snapshot with `N` bins spans 0..Nyquist, so each bin covers
//! `sample_rate / 2 / N` Hz and a frequency `f` lands in bin `floor(f / width)`.

use crate::error::DecodeError;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Smallest RMS considered when converting to decibels.
pub const RMS_FLOOR: f64 = 1e-5;

/// Calculate RMS of a slice
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Largest absolute sample value
pub fn peak(samples: &[f32]) -> f64 {
    samples
        .iter()
        .fold(0.0_f64, |acc, &x| acc.max((x as f64).abs()))
}

/// Convert an RMS level to decibels, flooring at [`RMS_FLOOR`]
pub fn rms_to_db(rms: f64) -> f64 {
    20.0 * rms.max(RMS_FLOOR).log10()
}

/// Convert decibels to a linear gain factor
pub fn db_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Width in Hz of one bin of a `bin_count`-bin spectrum
pub fn bin_width(sample_rate: f64, bin_count: usize) -> f64 {
    if bin_count == 0 {
        return 0.0;
    }
    sample_rate / 2.0 / bin_count as f64
}

/// Index of the bin containing `hz`. `None` for a degenerate spectrum
/// (no bins or a non-finite / non-positive sample rate).
pub fn hz_to_bin(hz: f64, sample_rate: f64, bin_count: usize) -> Option<usize> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 || bin_count == 0 {
        return None;
    }
    let index = (hz / bin_width(sample_rate, bin_count)).floor();
    if index.is_finite() && index >= 0.0 {
        Some(index as usize)
    } else {
        None
    }
}

/// Lower edge frequency of a bin
pub fn bin_to_hz(bin: usize, sample_rate: f64, bin_count: usize) -> f64 {
    bin as f64 * bin_width(sample_rate, bin_count)
}

/// Immutable multichannel sample buffer.
///
/// Channels are stored de-interleaved and always have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Build a signal from de-interleaved channels.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, DecodeError> {
        Self::validated(channels, sample_rate, Path::new("<memory>"))
    }

    /// Build a signal holding `amplitude` on every sample of every channel.
    pub fn constant(amplitude: f32, channel_count: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![amplitude; frames]; channel_count.max(1)],
            sample_rate,
        }
    }

    fn validated(channels: Vec<Vec<f32>>, sample_rate: u32, path: &Path) -> Result<Self, DecodeError> {
        if sample_rate == 0 {
            return Err(DecodeError::UnknownSampleRate {
                path: path.to_path_buf(),
            });
        }
        let Some(first) = channels.first() else {
            return Err(DecodeError::InvalidLayout {
                path: path.to_path_buf(),
                reason: "no channels".to_string(),
            });
        };
        let frames = first.len();
        if let Some(bad) = channels.iter().position(|c| c.len() != frames) {
            return Err(DecodeError::InvalidLayout {
                path: path.to_path_buf(),
                reason: format!(
                    "channel {} has {} frames, expected {}",
                    bad,
                    channels[bad].len(),
                    frames
                ),
            });
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Decode an audio file (WAV, MP3, FLAC, OGG, ...) into a signal.
    pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DecodeError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        decode_source(Box::new(file), hint, path)
    }

    /// Decode an in-memory file. `label` names it in errors.
    pub fn decode_bytes(data: &[u8], label: &str) -> Result<Self, DecodeError> {
        let cursor = std::io::Cursor::new(data.to_vec());
        // No hint - let symphonia auto-detect the format
        decode_source(Box::new(cursor), Hint::new(), Path::new(label))
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// RMS over every sample of every channel
    pub fn rms(&self) -> f64 {
        let count: usize = self.channels.iter().map(Vec::len).sum();
        if count == 0 {
            return 0.0;
        }
        let sum_sq: f64 = self
            .channels
            .iter()
            .flat_map(|c| c.iter())
            .map(|&x| (x as f64) * (x as f64))
            .sum();
        (sum_sq / count as f64).sqrt()
    }

    /// Peak over every sample of every channel
    pub fn peak(&self) -> f64 {
        self.channels.iter().map(|c| peak(c)).fold(0.0, f64::max)
    }

    /// Mono mixdown (channel average)
    pub fn mono(&self) -> Vec<f32> {
        let n = self.channel_count() as f32;
        (0..self.frames())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() / n)
            .collect()
    }

    /// Two-channel view at `sample_rate`.
    ///
    /// Mono is duplicated to both sides; extra channels beyond the first two
    /// are dropped. A different rate is reached by linear interpolation.
    pub fn to_stereo(&self, sample_rate: u32) -> StereoBuffer {
        let left = self.channels[0].clone();
        let right = self.channels.get(1).cloned().unwrap_or_else(|| left.clone());

        if sample_rate == self.sample_rate {
            return StereoBuffer {
                left,
                right,
                sample_rate,
            };
        }

        StereoBuffer {
            left: resample_linear(&left, self.sample_rate, sample_rate),
            right: resample_linear(&right, self.sample_rate, sample_rate),
            sample_rate,
        }
    }
}

/// Two-channel working buffer used by the mixing pipeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl StereoBuffer {
    pub fn silent(frames: usize, sample_rate: u32) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Zero-pad (or truncate) both channels to `frames`.
    pub fn fit_to(&mut self, frames: usize) {
        self.left.resize(frames, 0.0);
        self.right.resize(frames, 0.0);
    }

    pub fn scale(&mut self, gain: f64) {
        let g = gain as f32;
        for s in self.left.iter_mut().chain(self.right.iter_mut()) {
            *s *= g;
        }
    }

    pub fn peak(&self) -> f64 {
        peak(&self.left).max(peak(&self.right))
    }

    pub fn as_signal(&self) -> AudioSignal {
        AudioSignal {
            channels: vec![self.left.clone(), self.right.clone()],
            sample_rate: self.sample_rate,
        }
    }
}

/// Linear-interpolation sample rate conversion
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            let a = samples[idx];
            let b = samples[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

/// Decode a media source keeping channels separate
fn decode_source(
    source: Box<dyn MediaSource>,
    hint: Hint,
    path: &Path,
) -> Result<AudioSignal, DecodeError> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoAudioTrack {
            path: path.to_path_buf(),
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnknownSampleRate {
            path: path.to_path_buf(),
        })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                log::warn!("{}: error reading packet: {}", path.display(), e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("{}: skipping undecodable packet: {}", path.display(), e);
                continue;
            }
        };

        let channel_count = decoded.spec().channels.count();
        if channel_count == 0 {
            continue;
        }

        let needs_buffer = sample_buf
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * channel_count);
        if needs_buffer {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            for frame in buf.samples().chunks(channel_count) {
                for (ch, &sample) in channels.iter_mut().zip(frame.iter()) {
                    ch.push(sample);
                }
            }
        }
    }

    if channels.first().map_or(true, Vec::is_empty) {
        return Err(DecodeError::Empty {
            path: path.to_path_buf(),
        });
    }

    log::debug!(
        "{}: decoded {} channel(s), {} frames @ {}Hz",
        path.display(),
        channels.len(),
        channels[0].len(),
        sample_rate
    );

    AudioSignal::validated(channels, sample_rate, path)
}

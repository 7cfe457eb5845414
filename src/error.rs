//! Error types for decoding, mixing and encoding
//!
//! The analyzer never fails (malformed snapshots degrade to zero readings),
//! so every error here belongs to a single mix request. Nothing is retried
//! and no partial output is produced.

use std::path::PathBuf;
use thiserror::Error;

/// An input file could not be turned into an [`AudioSignal`](crate::AudioSignal).
///
/// Every variant names the offending file so the caller can tell the user
/// which of the two stems was at fault.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format in {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("No audio track found in {path}")]
    NoAudioTrack { path: PathBuf },

    #[error("Unknown sample rate in {path}")]
    UnknownSampleRate { path: PathBuf },

    #[error("No decodable audio in {path}")]
    Empty { path: PathBuf },

    #[error("Invalid signal layout in {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },
}

impl DecodeError {
    /// The file this error refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            DecodeError::Open { path, .. }
            | DecodeError::UnsupportedFormat { path, .. }
            | DecodeError::NoAudioTrack { path }
            | DecodeError::UnknownSampleRate { path }
            | DecodeError::Empty { path }
            | DecodeError::InvalidLayout { path, .. } => path,
        }
    }
}

/// Signal-chain construction or render failure.
#[derive(Error, Debug)]
pub enum MixingError {
    #[error("Invalid {stage} stage in {chain} chain: {reason}")]
    InvalidStage {
        chain: &'static str,
        stage: &'static str,
        reason: String,
    },

    #[error("The {0} stem contains no samples")]
    EmptyStem(&'static str),

    #[error("Invalid render sample rate: {0}Hz")]
    InvalidSampleRate(u32),

    #[error("Invalid reverb impulse response: {0}")]
    InvalidImpulse(String),

    #[error("Stem length mismatch on master bus: beat={beat} vocals={vocals} frames")]
    LengthMismatch { beat: usize, vocals: usize },

    #[error("Rendering the {chain} chain failed")]
    Render {
        chain: &'static str,
        #[source]
        source: Box<MixingError>,
    },
}

/// The rendered buffer could not be serialized to a WAV container.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("Channel length mismatch: left={left} right={right} frames")]
    ChannelMismatch { left: usize, right: usize },

    #[error("Audio data too large for a RIFF container: {0} bytes")]
    TooLarge(u64),

    #[error("Failed to write WAV data")]
    Io(#[from] std::io::Error),
}

/// Any failure of a mix request.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Mixing failed: {0}")]
    Mixing(#[from] MixingError),

    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

/// Result type for mix requests
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_file() {
        let err = DecodeError::NoAudioTrack {
            path: PathBuf::from("vocals.m4a"),
        };
        assert!(err.to_string().contains("vocals.m4a"));
        assert_eq!(err.path(), &PathBuf::from("vocals.m4a"));
    }

    #[test]
    fn test_render_error_keeps_cause() {
        use std::error::Error as _;

        let err = MixingError::Render {
            chain: "vocals",
            source: Box::new(MixingError::EmptyStem("vocals")),
        };
        let cause = err.source().expect("render error should carry its cause");
        assert!(cause.to_string().contains("vocals stem"));
    }

    #[test]
    fn test_crate_error_wraps_each_domain() {
        let e: Error = EncodingError::ZeroSampleRate.into();
        assert!(matches!(e, Error::Encoding(_)));
        assert!(e.to_string().starts_with("Encoding failed"));

        let e: Error = MixingError::InvalidSampleRate(0).into();
        assert!(matches!(e, Error::Mixing(_)));
    }
}

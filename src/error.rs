//! Error types for the mSBC decoder.

use thiserror::Error;

use crate::audio::backend::SbcStatus;

/// Result type alias for decoder operations
pub type Result<T> = std::result::Result<T, MsbcError>;

#[derive(Error, Debug)]
pub enum MsbcError {
    /// Backend rejected the decoder reset
    #[error("SBC decoder reset failed with error code {status}")]
    Reset { status: SbcStatus },

    /// Backend rejected the mSBC configuration
    #[error("SBC decoder mSBC configuration failed with error code {status}")]
    ConfigureMsbc { status: SbcStatus },

    /// Backend failed to decode a frame, or consumed/produced the wrong amount
    #[error(
        "Decoding failure: status {status}, remaining input {remaining_input}, remaining output {remaining_output}"
    )]
    Decode {
        status: SbcStatus,
        remaining_input: usize,
        remaining_output: usize,
    },

    #[error("Decoder is not initialized")]
    NotInitialized,

    #[error("Invalid mSBC packet length: expected {expected}, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Giving up after {consecutive} consecutive decode failures")]
    TooManyFailures { consecutive: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MsbcError {
    /// True for failures reported by the codec itself (as opposed to misuse or IO).
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            MsbcError::Reset { .. } | MsbcError::ConfigureMsbc { .. } | MsbcError::Decode { .. }
        )
    }
}

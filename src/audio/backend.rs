//! The seam between the mSBC adapter and the codec library that does the
//! actual SBC synthesis.

use std::fmt;

/// Status code returned by the codec backend. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SbcStatus(pub i32);

impl SbcStatus {
    pub const OK: SbcStatus = SbcStatus(0);

    pub fn is_success(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for SbcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameters passed to the backend on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetParams {
    pub max_channels: u8,
    pub pcm_stride: u8,
    pub enhanced: bool,
}

impl ResetParams {
    /// mSBC is mono with no enhanced (CRC-extended) mode.
    pub const MSBC: ResetParams = ResetParams {
        max_channels: 1,
        pcm_stride: 1,
        enhanced: false,
    };
}

/// What a single `decode_frame` call did.
///
/// `consumed` and `produced` are byte counts: input bytes taken from the
/// frame and PCM bytes written into the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    pub status: SbcStatus,
    pub consumed: usize,
    pub produced: usize,
}

/// A codec library able to decode mSBC frames.
///
/// Implementations own the opaque decoder context and its working memory.
pub trait MsbcBackend: Send {
    /// Reset the decoder context against its working memory.
    fn reset(&mut self, params: ResetParams) -> SbcStatus;

    /// Switch the reset context to the mSBC frame variant.
    fn configure_msbc(&mut self) -> SbcStatus;

    /// Decode one frame from `input` into `output`.
    fn decode_frame(&mut self, input: &[u8], output: &mut [i16]) -> DecodeOutcome;

    /// Zero the context and working memory.
    fn zero(&mut self);
}

impl<B: MsbcBackend + ?Sized> MsbcBackend for Box<B> {
    fn reset(&mut self, params: ResetParams) -> SbcStatus {
        (**self).reset(params)
    }

    fn configure_msbc(&mut self) -> SbcStatus {
        (**self).configure_msbc()
    }

    fn decode_frame(&mut self, input: &[u8], output: &mut [i16]) -> DecodeOutcome {
        (**self).decode_frame(input, output)
    }

    fn zero(&mut self) {
        (**self).zero()
    }
}

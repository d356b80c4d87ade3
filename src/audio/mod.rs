//! audio - HFP mSBC decoding and playback
//!
//! The codec itself is provided by a backend (the OI SBC decoder from the
//! Android Bluetooth stack when built with `oi-sbc`). This module adds the
//! mSBC framing checks, a recovering decode pipeline, and optional ALSA
//! playback of the decoded 16 kHz mono stream.

pub mod backend;
mod msbc_decoder;
pub mod pipeline;

#[cfg(feature = "oi-sbc")]
mod oi_sbc;

#[cfg(feature = "playback")]
mod play;

pub use backend::{DecodeOutcome, MsbcBackend, ResetParams, SbcStatus};
pub use msbc_decoder::{
    MSBC_FRAME_BYTES, MSBC_FRAME_SAMPLES, MSBC_PACKET_LEN, MSBC_SAMPLE_RATE, MsbcDecoder, PcmFrame,
};
pub use pipeline::{DecodePipeline, DecodeStats, PipelineConfig};

#[cfg(feature = "oi-sbc")]
pub use oi_sbc::OiSbcBackend;

#[cfg(feature = "playback")]
pub use play::{PlaybackConfig, Player};

//! hfp_msbc_rs - Bluetooth HFP wideband speech (mSBC) decoding
//!
//! `audio::MsbcDecoder` wraps an SBC codec backend with the fixed mSBC
//! framing, `audio::DecodePipeline` drives it over a packet stream, and
//! `packet::PacketReader` splits captured HFP traffic into packets.

pub mod audio;
pub mod config;
pub mod error;
pub mod packet;

pub use error::{MsbcError, Result};

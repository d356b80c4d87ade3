//! Drives an `MsbcDecoder` over a stream of packets.
//!
//! The decoder itself never retries. This layer counts consecutive decode
//! failures, re-initializes the decoder after a run of them, and gives up
//! once the configured limit is reached.

use std::io::{Read, Write};

use super::backend::MsbcBackend;
use super::msbc_decoder::{MsbcDecoder, PcmFrame};
use crate::config::Config;
use crate::error::{MsbcError, Result};
use crate::packet::PacketReader;

/// Failure handling for a decode pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Re-initialize the decoder after this many consecutive failures (0 = never)
    pub reinit_after_failures: u32,
    /// Abort after this many consecutive failures (0 = never)
    pub max_consecutive_failures: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reinit_after_failures: 3,
            max_consecutive_failures: 50,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            reinit_after_failures: config.reinit_after_failures,
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    pub packets: u64,
    pub decoded: u64,
    pub failed: u64,
    pub reinits: u64,
}

pub struct DecodePipeline<B: MsbcBackend> {
    decoder: MsbcDecoder<B>,
    config: PipelineConfig,
    consecutive_failures: u32,
    stats: DecodeStats,
}

impl<B: MsbcBackend> DecodePipeline<B> {
    pub fn new(decoder: MsbcDecoder<B>, config: PipelineConfig) -> Self {
        Self {
            decoder,
            config,
            consecutive_failures: 0,
            stats: DecodeStats::default(),
        }
    }

    /// Initialize the decoder. Must succeed before any packet is pushed.
    pub fn start(&mut self) -> Result<()> {
        self.decoder.init()?;
        log::info!(
            "mSBC pipeline started: reinit_after={}, max_failures={}",
            self.config.reinit_after_failures,
            self.config.max_consecutive_failures
        );
        Ok(())
    }

    /// Decode one packet.
    ///
    /// Returns `Ok(None)` for a packet the decoder rejected; the failure is
    /// counted and may trigger a re-init. Packets of the wrong size are a
    /// caller error and are returned as such.
    pub fn push(&mut self, packet: &[u8]) -> Result<Option<PcmFrame>> {
        self.stats.packets += 1;

        match self.decoder.decode(packet) {
            Ok(frame) => {
                self.consecutive_failures = 0;
                self.stats.decoded += 1;
                Ok(Some(frame))
            }
            Err(e) if e.is_backend_failure() || matches!(e, MsbcError::NotInitialized) => {
                self.stats.failed += 1;
                self.consecutive_failures += 1;

                let max = self.config.max_consecutive_failures;
                if max > 0 && self.consecutive_failures >= max {
                    log::error!(
                        "{} consecutive decode failures, giving up",
                        self.consecutive_failures
                    );
                    return Err(MsbcError::TooManyFailures {
                        consecutive: self.consecutive_failures,
                    });
                }

                let reinit_after = self.config.reinit_after_failures;
                if reinit_after > 0 && self.consecutive_failures % reinit_after == 0 {
                    self.reinit();
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn reinit(&mut self) {
        log::warn!(
            "Re-initializing mSBC decoder after {} consecutive failures",
            self.consecutive_failures
        );
        self.stats.reinits += 1;
        self.decoder.cleanup();
        // A failed init leaves the decoder Uninitialized; the following
        // packets fail with NotInitialized and count toward the next attempt.
        if let Err(e) = self.decoder.init() {
            log::error!("Re-initialization failed: {}", e);
        }
    }

    /// Decode every packet from `reader`, handing each decoded frame to `on_frame`.
    pub fn run_with<R, F>(
        &mut self,
        reader: PacketReader<R>,
        mut on_frame: F,
    ) -> Result<DecodeStats>
    where
        R: Read,
        F: FnMut(&PcmFrame) -> Result<()>,
    {
        for packet in reader {
            let packet = packet?;
            if let Some(frame) = self.push(&packet)? {
                on_frame(&frame)?;
            }
        }

        log::info!(
            "mSBC pipeline finished: packets={}, decoded={}, failed={}, reinits={}",
            self.stats.packets,
            self.stats.decoded,
            self.stats.failed,
            self.stats.reinits
        );
        Ok(self.stats)
    }

    /// Decode every packet from `reader` and write the PCM as s16le to `sink`.
    pub fn run<R: Read, W: Write>(
        &mut self,
        reader: PacketReader<R>,
        sink: &mut W,
    ) -> Result<DecodeStats> {
        let stats = self.run_with(reader, |frame| {
            sink.write_all(&frame.to_le_bytes())?;
            Ok(())
        })?;
        sink.flush()?;
        Ok(stats)
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    pub fn decoder(&self) -> &MsbcDecoder<B> {
        &self.decoder
    }

    /// Zero the decoder and hand it back.
    pub fn finish(mut self) -> MsbcDecoder<B> {
        self.decoder.cleanup();
        self.decoder
    }
}

//! Plays decoded mSBC frames on an ALSA device.
//!
//! Uses a dedicated std::thread for the blocking ALSA writes; frames arrive
//! over a bounded channel.

use std::thread::{self, JoinHandle};

use alsa::pcm::{Access, Format, Frames, HwParams, IO, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::msbc_decoder::{MSBC_FRAME_SAMPLES, MSBC_SAMPLE_RATE, PcmFrame};
use crate::config::Config;

const FRAME_QUEUE_DEPTH: usize = 32;
const MAX_WRITE_RETRIES: u32 = 3;

/// Playback device configuration.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// ALSA playback device name (e.g. "default", "plughw:0,0")
    pub device: String,
    /// Desired ALSA playback channel count; mono frames are duplicated
    pub channels: u32,
    /// Desired ALSA playback period size (0 = let ALSA decide)
    pub period_size: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            channels: 2,
            period_size: 0,
        }
    }
}

impl From<&Config> for PlaybackConfig {
    fn from(config: &Config) -> Self {
        Self {
            device: config.playback_device.clone(),
            channels: config.playback_channels,
            period_size: config.playback_period_size,
        }
    }
}

/// Handle to the playback thread. Dropping it drains the queue and joins.
pub struct Player {
    tx: Option<mpsc::Sender<PcmFrame>>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    pub fn start(config: PlaybackConfig) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<PcmFrame>(FRAME_QUEUE_DEPTH);

        let handle = thread::Builder::new()
            .name("audio-play".into())
            .spawn(move || {
                if let Err(e) = play_thread(&config, rx) {
                    log::error!("Playback thread error: {}", e);
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a frame, blocking while the queue is full.
    pub fn send(&self, frame: PcmFrame) -> Result<()> {
        match &self.tx {
            Some(tx) => tx
                .blocking_send(frame)
                .map_err(|_| anyhow::anyhow!("Playback thread has stopped")),
            None => anyhow::bail!("Player already stopped"),
        }
    }

    /// Close the queue and wait for the remaining frames to play.
    pub fn stop(&mut self) {
        self.tx.take();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Hardware parameters the device actually accepted.
struct DeviceParams {
    sample_rate: u32,
    channels: usize,
    period_frames: usize,
}

/// Open the playback device for 16 kHz s16le interleaved output.
fn open_device(config: &PlaybackConfig) -> Result<(PCM, DeviceParams)> {
    let pcm = PCM::new(&config.device, Direction::Playback, false)
        .with_context(|| format!("Failed to open playback device '{}'", config.device))?;

    {
        let hwp = HwParams::any(&pcm).context("Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(config.channels)?;
        hwp.set_rate_near(MSBC_SAMPLE_RATE, ValueOr::Nearest)?;
        if config.period_size > 0 {
            hwp.set_period_size_near(config.period_size as Frames, ValueOr::Nearest)?;
        }
        pcm.hw_params(&hwp)?;
    }

    let params = {
        let hwp = pcm.hw_params_current()?;
        DeviceParams {
            sample_rate: hwp.get_rate()?,
            channels: hwp.get_channels()? as usize,
            period_frames: hwp.get_period_size()? as usize,
        }
    };

    if params.sample_rate != MSBC_SAMPLE_RATE {
        log::warn!(
            "Device '{}' negotiated {}Hz instead of {}Hz, playback will be pitched",
            config.device,
            params.sample_rate,
            MSBC_SAMPLE_RATE
        );
    }

    Ok((pcm, params))
}

/// Collects upmixed mSBC frames until at least one device period is queued.
///
/// mSBC frames are 120 samples, device periods are usually larger; writing
/// whole periods keeps the number of `writei` calls (and XRUN chances) down.
struct PeriodBuffer {
    channels: usize,
    period_samples: usize,
    samples: Vec<i16>,
}

impl PeriodBuffer {
    /// A period of 0 frames (device did not report one) means one mSBC frame.
    fn new(period_frames: usize, channels: usize) -> Self {
        let channels = channels.max(1);
        let period_frames = if period_frames == 0 {
            MSBC_FRAME_SAMPLES
        } else {
            period_frames
        };
        Self {
            channels,
            period_samples: period_frames * channels,
            samples: Vec::with_capacity(period_frames * channels * 2),
        }
    }

    /// Append one frame, duplicating each mono sample across all channels.
    fn push(&mut self, frame: &PcmFrame) {
        for &s in frame.samples() {
            self.samples.extend(std::iter::repeat_n(s, self.channels));
        }
    }

    /// Take all complete periods, leaving the remainder queued.
    fn take_periods(&mut self) -> Option<Vec<i16>> {
        let ready = (self.samples.len() / self.period_samples) * self.period_samples;
        if ready == 0 {
            return None;
        }
        Some(self.samples.drain(..ready).collect())
    }

    /// Take whatever is left, complete period or not.
    fn take_rest(&mut self) -> Option<Vec<i16>> {
        if self.samples.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.samples))
        }
    }
}

/// Write interleaved samples, recovering from XRUNs a bounded number of times.
fn write_all(pcm: &PCM, io: &IO<i16>, data: &[i16], channels: usize) {
    let total_frames = data.len() / channels;
    let mut frames_written = 0;
    let mut retry_count = 0u32;

    while frames_written < total_frames {
        let offset = frames_written * channels;
        match io.writei(&data[offset..]) {
            Ok(n) => {
                frames_written += n;
                retry_count = 0;
            }
            Err(e) => {
                log::warn!("ALSA XRUN or error: {}, recovering...", e);
                retry_count += 1;

                if let Err(e2) = pcm.prepare() {
                    log::error!("Failed to recover PCM playback: {}", e2);
                    return;
                }

                if retry_count >= MAX_WRITE_RETRIES {
                    log::error!(
                        "Max recovery retries ({}) reached. Dropping {} unwritten frames.",
                        retry_count,
                        total_frames - frames_written
                    );
                    return;
                }
            }
        }
    }
}

fn play_thread(config: &PlaybackConfig, mut rx: mpsc::Receiver<PcmFrame>) -> Result<()> {
    let (pcm, params) = open_device(config)?;
    let io = pcm.io_i16()?;
    let mut buffer = PeriodBuffer::new(params.period_frames, params.channels);

    log::info!(
        "Playback started: device={}, rate={}, ch={}, period={}",
        config.device,
        params.sample_rate,
        params.channels,
        params.period_frames
    );

    // Block until a frame arrives (or the channel closes)
    while let Some(frame) = rx.blocking_recv() {
        buffer.push(&frame);
        if let Some(data) = buffer.take_periods() {
            write_all(&pcm, &io, &data, params.channels);
        }
    }

    if let Some(data) = buffer.take_rest() {
        write_all(&pcm, &io, &data, params.channels);
    }
    let _ = pcm.drain();
    log::info!("Playback stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(value: i16) -> PcmFrame {
        PcmFrame::from([value; MSBC_FRAME_SAMPLES])
    }

    #[test]
    fn test_push_duplicates_mono_across_channels() {
        let mut samples = [0i16; MSBC_FRAME_SAMPLES];
        samples[0] = 1;
        samples[1] = -2;
        let mut buffer = PeriodBuffer::new(MSBC_FRAME_SAMPLES, 2);
        buffer.push(&PcmFrame::from(samples));

        let data = buffer.take_periods().unwrap();
        assert_eq!(data.len(), MSBC_FRAME_SAMPLES * 2);
        assert_eq!(&data[..4], &[1, 1, -2, -2]);
    }

    #[test]
    fn test_batches_frames_into_device_periods() {
        // 256-frame period: the third frame completes the first period
        let mut buffer = PeriodBuffer::new(256, 2);
        buffer.push(&frame_of(1));
        assert!(buffer.take_periods().is_none());
        buffer.push(&frame_of(2));
        assert!(buffer.take_periods().is_none());
        buffer.push(&frame_of(3));

        let period = buffer.take_periods().unwrap();
        assert_eq!(period.len(), 256 * 2);
        assert_eq!(period[0], 1);
        assert_eq!(period[period.len() - 1], 3);

        let rest = buffer.take_rest().unwrap();
        assert_eq!(rest.len(), (3 * MSBC_FRAME_SAMPLES - 256) * 2);
        assert!(buffer.take_rest().is_none());
    }

    #[test]
    fn test_unknown_period_flushes_every_frame() {
        let mut buffer = PeriodBuffer::new(0, 1);
        buffer.push(&frame_of(7));
        let data = buffer.take_periods().unwrap();
        assert_eq!(data, vec![7; MSBC_FRAME_SAMPLES]);
        assert!(buffer.take_rest().is_none());
    }
}

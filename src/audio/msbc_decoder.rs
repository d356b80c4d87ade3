//! mSBC decoder for Bluetooth HFP wideband speech.
//!
//! Wraps a codec backend with the fixed mSBC framing: every 60-byte HFP
//! packet must decode to exactly 120 samples (240 bytes) of 16 kHz mono PCM.

use super::backend::{MsbcBackend, ResetParams};
use crate::error::{MsbcError, Result};

/// Size of one mSBC packet as carried over HFP.
pub const MSBC_PACKET_LEN: usize = 60;
/// Samples in one decoded mSBC frame.
pub const MSBC_FRAME_SAMPLES: usize = 120;
/// Bytes in one decoded mSBC frame.
pub const MSBC_FRAME_BYTES: usize = MSBC_FRAME_SAMPLES * size_of::<i16>();
/// mSBC is always 16 kHz mono.
pub const MSBC_SAMPLE_RATE: u32 = 16000;

/// One decoded mSBC frame, owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFrame([i16; MSBC_FRAME_SAMPLES]);

impl PcmFrame {
    pub fn samples(&self) -> &[i16; MSBC_FRAME_SAMPLES] {
        &self.0
    }

    /// The frame as little-endian s16 bytes.
    pub fn to_le_bytes(&self) -> [u8; MSBC_FRAME_BYTES] {
        let mut bytes = [0u8; MSBC_FRAME_BYTES];
        for (chunk, sample) in bytes.chunks_exact_mut(2).zip(self.0.iter()) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        bytes
    }
}

impl Default for PcmFrame {
    fn default() -> Self {
        Self([0; MSBC_FRAME_SAMPLES])
    }
}

impl From<[i16; MSBC_FRAME_SAMPLES]> for PcmFrame {
    fn from(samples: [i16; MSBC_FRAME_SAMPLES]) -> Self {
        Self(samples)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Uninitialized,
    Ready,
}

/// HFP mSBC decoder.
///
/// Created zeroed and Uninitialized; `init` makes it Ready, `cleanup`
/// zeroes everything and returns it to Uninitialized.
pub struct MsbcDecoder<B: MsbcBackend> {
    backend: B,
    state: DecoderState,
    // Scratch for the backend; only copied out after a fully validated decode.
    decode_buf: [i16; MSBC_FRAME_SAMPLES],
}

impl<B: MsbcBackend> MsbcDecoder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: DecoderState::Uninitialized,
            decode_buf: [0; MSBC_FRAME_SAMPLES],
        }
    }

    /// Reset the backend and configure it for mSBC.
    pub fn init(&mut self) -> Result<()> {
        self.state = DecoderState::Uninitialized;

        let status = self.backend.reset(ResetParams::MSBC);
        if !status.is_success() {
            log::error!("SBC decoder reset failed with error code {}", status);
            return Err(MsbcError::Reset { status });
        }

        let status = self.backend.configure_msbc();
        if !status.is_success() {
            log::error!("SBC decoder mSBC configuration failed with error code {}", status);
            return Err(MsbcError::ConfigureMsbc { status });
        }

        self.state = DecoderState::Ready;
        log::debug!("mSBC decoder initialized");
        Ok(())
    }

    /// Zero the backend context, its working memory and the decode buffer.
    pub fn cleanup(&mut self) {
        self.backend.zero();
        self.decode_buf = [0; MSBC_FRAME_SAMPLES];
        self.state = DecoderState::Uninitialized;
    }

    pub fn is_ready(&self) -> bool {
        self.state == DecoderState::Ready
    }

    /// Decode one 60-byte HFP packet into a fresh PCM frame.
    pub fn decode(&mut self, packet: &[u8]) -> Result<PcmFrame> {
        let mut frame = PcmFrame::default();
        self.decode_into(packet, &mut frame.0)?;
        Ok(frame)
    }

    /// Decode one 60-byte HFP packet into `out`.
    ///
    /// `out` is written only on success.
    pub fn decode_into(
        &mut self,
        packet: &[u8],
        out: &mut [i16; MSBC_FRAME_SAMPLES],
    ) -> Result<()> {
        if packet.len() != MSBC_PACKET_LEN {
            return Err(MsbcError::FrameLength {
                expected: MSBC_PACKET_LEN,
                actual: packet.len(),
            });
        }
        if !self.is_ready() {
            return Err(MsbcError::NotInitialized);
        }

        let outcome = self.backend.decode_frame(packet, &mut self.decode_buf);
        let remaining_input = MSBC_PACKET_LEN.saturating_sub(outcome.consumed);
        let remaining_output = MSBC_FRAME_BYTES.saturating_sub(outcome.produced);

        if !outcome.status.is_success()
            || outcome.consumed != MSBC_PACKET_LEN
            || outcome.produced != MSBC_FRAME_BYTES
        {
            log::error!(
                "Decoding failure: status={}, remaining_output={}, remaining_input={}",
                outcome.status,
                remaining_output,
                remaining_input
            );
            return Err(MsbcError::Decode {
                status: outcome.status,
                remaining_input,
                remaining_output,
            });
        }

        out.copy_from_slice(&self.decode_buf);
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::{DecodeOutcome, SbcStatus};

    /// Backend whose answers are set by the test.
    struct ScriptedBackend {
        reset_status: SbcStatus,
        configure_status: SbcStatus,
        outcome: DecodeOutcome,
        resets: Vec<ResetParams>,
        decodes: usize,
        memory: [u32; 8],
    }

    impl ScriptedBackend {
        fn ok() -> Self {
            Self {
                reset_status: SbcStatus::OK,
                configure_status: SbcStatus::OK,
                outcome: DecodeOutcome {
                    status: SbcStatus::OK,
                    consumed: MSBC_PACKET_LEN,
                    produced: MSBC_FRAME_BYTES,
                },
                resets: Vec::new(),
                decodes: 0,
                memory: [0; 8],
            }
        }
    }

    impl MsbcBackend for ScriptedBackend {
        fn reset(&mut self, params: ResetParams) -> SbcStatus {
            self.resets.push(params);
            self.memory = [0xA5A5_A5A5; 8];
            self.reset_status
        }

        fn configure_msbc(&mut self) -> SbcStatus {
            self.configure_status
        }

        fn decode_frame(&mut self, input: &[u8], output: &mut [i16]) -> DecodeOutcome {
            self.decodes += 1;
            // Sample i = first input byte + i, so frames are distinguishable
            for (i, sample) in output.iter_mut().enumerate() {
                *sample = input[0] as i16 + i as i16;
            }
            self.outcome
        }

        fn zero(&mut self) {
            self.memory = [0; 8];
        }
    }

    fn ready_decoder() -> MsbcDecoder<ScriptedBackend> {
        let mut decoder = MsbcDecoder::new(ScriptedBackend::ok());
        decoder.init().unwrap();
        decoder
    }

    #[test]
    fn test_init_uses_msbc_reset_params() {
        let decoder = ready_decoder();
        assert!(decoder.is_ready());
        assert_eq!(decoder.backend().resets, vec![ResetParams::MSBC]);
        assert_eq!(ResetParams::MSBC.max_channels, 1);
        assert_eq!(ResetParams::MSBC.pcm_stride, 1);
        assert!(!ResetParams::MSBC.enhanced);
    }

    #[test]
    fn test_init_fails_when_reset_rejected() {
        let mut backend = ScriptedBackend::ok();
        backend.reset_status = SbcStatus(-3);
        let mut decoder = MsbcDecoder::new(backend);

        let err = decoder.init().unwrap_err();
        assert!(matches!(err, MsbcError::Reset { status } if status == SbcStatus(-3)));
        assert!(!decoder.is_ready());
    }

    #[test]
    fn test_init_fails_when_configure_rejected() {
        let mut backend = ScriptedBackend::ok();
        backend.configure_status = SbcStatus(7);
        let mut decoder = MsbcDecoder::new(backend);

        let err = decoder.init().unwrap_err();
        assert!(matches!(err, MsbcError::ConfigureMsbc { status } if status == SbcStatus(7)));
        assert!(!decoder.is_ready());
        assert!(matches!(decoder.decode(&[0u8; 60]), Err(MsbcError::NotInitialized)));
    }

    #[test]
    fn test_failed_reinit_drops_ready_state() {
        let mut decoder = ready_decoder();
        decoder.backend.reset_status = SbcStatus(1);
        assert!(decoder.init().is_err());
        assert!(!decoder.is_ready());
    }

    #[test]
    fn test_decode_well_formed_frame() {
        let mut decoder = ready_decoder();
        let frame = decoder.decode(&[0u8; MSBC_PACKET_LEN]).unwrap();

        assert_eq!(frame.samples().len(), MSBC_FRAME_SAMPLES);
        assert_eq!(frame.to_le_bytes().len(), MSBC_FRAME_BYTES);
        assert_eq!(frame.samples()[119], 119);
    }

    #[test]
    fn test_decode_before_init_is_rejected() {
        let mut decoder = MsbcDecoder::new(ScriptedBackend::ok());
        let err = decoder.decode(&[0u8; MSBC_PACKET_LEN]).unwrap_err();
        assert!(matches!(err, MsbcError::NotInitialized));
        assert_eq!(decoder.backend().decodes, 0);
    }

    #[test]
    fn test_decode_rejects_wrong_packet_length() {
        let mut decoder = ready_decoder();
        for len in [0usize, 57, 59, 61, 120] {
            let packet = vec![0u8; len];
            let err = decoder.decode(&packet).unwrap_err();
            assert!(
                matches!(err, MsbcError::FrameLength { expected: 60, actual } if actual == len),
                "length {} not rejected",
                len
            );
        }
        assert_eq!(decoder.backend().decodes, 0);
    }

    #[test]
    fn test_leftover_input_fails_even_with_success_status() {
        let mut decoder = ready_decoder();
        decoder.backend.outcome.consumed = 57;

        let err = decoder.decode(&[0u8; MSBC_PACKET_LEN]).unwrap_err();
        match err {
            MsbcError::Decode { status, remaining_input, remaining_output } => {
                assert!(status.is_success());
                assert_eq!(remaining_input, 3);
                assert_eq!(remaining_output, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_output_fails_even_with_success_status() {
        let mut decoder = ready_decoder();
        decoder.backend.outcome.produced = 200;

        let err = decoder.decode(&[0u8; MSBC_PACKET_LEN]).unwrap_err();
        assert!(matches!(
            err,
            MsbcError::Decode { remaining_output: 40, remaining_input: 0, .. }
        ));
    }

    #[test]
    fn test_backend_error_status_fails() {
        let mut decoder = ready_decoder();
        decoder.backend.outcome.status = SbcStatus(12);

        let err = decoder.decode(&[0u8; MSBC_PACKET_LEN]).unwrap_err();
        assert!(err.is_backend_failure());
        assert!(matches!(err, MsbcError::Decode { status, .. } if status == SbcStatus(12)));
        // Decoding errors do not take the decoder out of Ready
        assert!(decoder.is_ready());
    }

    #[test]
    fn test_failed_decode_leaves_destination_untouched() {
        let mut decoder = ready_decoder();
        let mut out = [7i16; MSBC_FRAME_SAMPLES];
        decoder.backend.outcome.consumed = 0;

        assert!(decoder.decode_into(&[1u8; MSBC_PACKET_LEN], &mut out).is_err());
        assert!(out.iter().all(|&s| s == 7));
    }

    #[test]
    fn test_consecutive_decodes_return_independent_frames() {
        let mut decoder = ready_decoder();
        let first = decoder.decode(&[10u8; MSBC_PACKET_LEN]).unwrap();
        let second = decoder.decode(&[20u8; MSBC_PACKET_LEN]).unwrap();

        assert_eq!(first.samples()[0], 10);
        assert_eq!(second.samples()[0], 20);
        assert_ne!(first, second);
    }

    #[test]
    fn test_cleanup_zeroes_everything() {
        let mut decoder = ready_decoder();
        decoder.decode(&[5u8; MSBC_PACKET_LEN]).unwrap();
        assert!(decoder.decode_buf.iter().any(|&s| s != 0));

        decoder.cleanup();
        assert!(!decoder.is_ready());
        assert!(decoder.decode_buf.iter().all(|&s| s == 0));
        assert!(decoder.backend().memory.iter().all(|&w| w == 0));

        decoder.cleanup();
        assert!(!decoder.is_ready());
        assert!(decoder.decode_buf.iter().all(|&s| s == 0));
        assert!(decoder.backend().memory.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_init_after_cleanup_restores_ready() {
        let mut decoder = ready_decoder();
        decoder.cleanup();
        assert!(matches!(
            decoder.decode(&[0u8; MSBC_PACKET_LEN]),
            Err(MsbcError::NotInitialized)
        ));
        decoder.init().unwrap();
        assert!(decoder.decode(&[0u8; MSBC_PACKET_LEN]).is_ok());
    }

    #[test]
    fn test_to_le_bytes_layout() {
        let mut samples = [0i16; MSBC_FRAME_SAMPLES];
        samples[0] = 0x0102;
        samples[1] = -2;
        let bytes = PcmFrame::from(samples).to_le_bytes();
        assert_eq!(&bytes[..4], &[0x02, 0x01, 0xFE, 0xFF]);
    }
}

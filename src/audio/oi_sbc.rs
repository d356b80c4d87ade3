//! Safe wrapper around the OI SBC decoder shipped with the Android Bluetooth stack.

use std::ffi::c_int;

use super::backend::{DecodeOutcome, MsbcBackend, ResetParams, SbcStatus};

// ======================== FFI declarations ========================

/// Opaque type for OI_CODEC_SBC_DECODER_CONTEXT
#[repr(C)]
pub struct OiCodecSbcDecoderContext {
    _private: [u8; 0],
}

type OiStatus = c_int;
type OiBool = c_int;

unsafe extern "C" {
    fn OI_CODEC_SBC_DecoderReset(
        context: *mut OiCodecSbcDecoderContext,
        decoder_data: *mut u32,
        decoder_data_bytes: u32,
        max_channels: u8,
        pcm_stride: u8,
        enhanced: OiBool,
    ) -> OiStatus;
    fn OI_CODEC_SBC_DecoderConfigureMSbc(context: *mut OiCodecSbcDecoderContext) -> OiStatus;
    fn OI_CODEC_SBC_DecodeFrame(
        context: *mut OiCodecSbcDecoderContext,
        frame_data: *mut *const u8,
        frame_bytes: *mut u32,
        pcm_data: *mut i16,
        pcm_bytes: *mut u32,
    ) -> OiStatus;

    // csrc/oi_sbc_shim.c
    fn hfp_msbc_oi_context_size() -> usize;
    fn hfp_msbc_oi_context_data_words() -> usize;
}

// ======================== Backend ========================

/// OI decoder context plus the working memory it was reset against.
///
/// Both live in boxed slices so the pointers the library keeps into
/// `data` stay valid when the backend is moved.
pub struct OiSbcBackend {
    context: Box<[u64]>,
    data: Box<[u32]>,
}

impl OiSbcBackend {
    /// Allocate a zeroed context and working memory sized for two channels
    /// with the fast filter buffers.
    pub fn new() -> Self {
        let (context_bytes, data_words) =
            unsafe { (hfp_msbc_oi_context_size(), hfp_msbc_oi_context_data_words()) };
        let context_words = context_bytes.div_ceil(size_of::<u64>());

        log::debug!(
            "OI SBC backend: context={} bytes, working memory={} words",
            context_bytes,
            data_words
        );

        Self {
            context: vec![0u64; context_words].into_boxed_slice(),
            data: vec![0u32; data_words].into_boxed_slice(),
        }
    }

    fn context_ptr(&mut self) -> *mut OiCodecSbcDecoderContext {
        self.context.as_mut_ptr() as *mut OiCodecSbcDecoderContext
    }
}

impl Default for OiSbcBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MsbcBackend for OiSbcBackend {
    fn reset(&mut self, params: ResetParams) -> SbcStatus {
        let data_bytes = (self.data.len() * size_of::<u32>()) as u32;
        let context = self.context_ptr();
        let status = unsafe {
            OI_CODEC_SBC_DecoderReset(
                context,
                self.data.as_mut_ptr(),
                data_bytes,
                params.max_channels,
                params.pcm_stride,
                params.enhanced as OiBool,
            )
        };
        SbcStatus(status)
    }

    fn configure_msbc(&mut self) -> SbcStatus {
        let context = self.context_ptr();
        SbcStatus(unsafe { OI_CODEC_SBC_DecoderConfigureMSbc(context) })
    }

    fn decode_frame(&mut self, input: &[u8], output: &mut [i16]) -> DecodeOutcome {
        let context = self.context_ptr();
        let mut frame_data = input.as_ptr();
        let mut frame_bytes = input.len() as u32;
        // In: space available. Out: bytes written.
        let mut pcm_bytes = (output.len() * size_of::<i16>()) as u32;

        let status = unsafe {
            OI_CODEC_SBC_DecodeFrame(
                context,
                &mut frame_data,
                &mut frame_bytes,
                output.as_mut_ptr(),
                &mut pcm_bytes,
            )
        };

        DecodeOutcome {
            status: SbcStatus(status),
            consumed: input.len().saturating_sub(frame_bytes as usize),
            produced: pcm_bytes as usize,
        }
    }

    fn zero(&mut self) {
        self.context.fill(0);
        self.data.fill(0);
    }
}

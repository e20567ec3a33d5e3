//! Native engine backed by libxvcenc / libxvcdec.
//!
//! The API function tables are fetched once per process and shared by every
//! session.

use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::{self, NonNull};

use lazy_static::lazy_static;
use tracing::{debug, warn};

use xvc_sys::{
    xvc_dec_return_code, xvc_decoded_picture, xvc_decoder, xvc_decoder_api, xvc_decoder_api_get,
    xvc_decoder_parameters, xvc_enc_nal_unit, xvc_enc_return_code, xvc_encoder, xvc_encoder_api,
    xvc_encoder_api_get, xvc_encoder_parameters, XVC_DEC_OK, XVC_ENC_OK,
};

use super::{
    DecoderBackend, DecoderEngine, EncodeInput, EncoderBackend, EncoderEngine, EngineNal,
    EnginePicture,
};
use crate::params::{DecoderParams, EncoderParams};
use crate::{ChromaFormat, CodecError, ColorMatrix, DecStatus, EncStatus, NalUnitType};

lazy_static! {
    /// Encoder API table, `None` if the library returned no table.
    static ref ENCODER_API: Option<&'static xvc_encoder_api> =
        unsafe { xvc_encoder_api_get().as_ref() };

    /// Decoder API table, `None` if the library returned no table.
    static ref DECODER_API: Option<&'static xvc_decoder_api> =
        unsafe { xvc_decoder_api_get().as_ref() };
}

fn encoder_api() -> Result<&'static xvc_encoder_api, CodecError> {
    ENCODER_API.ok_or_else(|| CodecError::engine_create("xvc_encoder_api_get returned null"))
}

fn decoder_api() -> Result<&'static xvc_decoder_api, CodecError> {
    DECODER_API.ok_or_else(|| CodecError::engine_create("xvc_decoder_api_get returned null"))
}

/// Extension trait turning engine return codes into results.
trait ReturnCodeExt {
    type Status;
    fn result(self) -> Result<(), Self::Status>;
}

impl ReturnCodeExt for xvc_enc_return_code {
    type Status = EncStatus;

    fn result(self) -> Result<(), EncStatus> {
        if self == XVC_ENC_OK {
            Ok(())
        } else {
            Err(EncStatus::from_code(self as u32))
        }
    }
}

/// Decoder return code. Both sides are `c_int`, so the decoder needs its own
/// wrapper type.
struct DecCode(xvc_dec_return_code);

impl ReturnCodeExt for DecCode {
    type Status = DecStatus;

    fn result(self) -> Result<(), DecStatus> {
        if self.0 == XVC_DEC_OK {
            Ok(())
        } else {
            Err(DecStatus::from_code(self.0 as u32))
        }
    }
}

fn to_c_int(value: u32) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

fn error_text(api: &xvc_encoder_api, status: EncStatus) -> String {
    let text = unsafe { (api.xvc_enc_get_error_text)(status.code() as c_int) };
    if text.is_null() {
        return status.to_string();
    }
    unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}

// ============================================================================
// Encoder
// ============================================================================

/// Temporary encoder parameter handle, destroyed on drop.
struct EncoderParamHandle {
    api: &'static xvc_encoder_api,
    ptr: NonNull<xvc_encoder_parameters>,
}

impl EncoderParamHandle {
    /// Allocates a handle, applies engine defaults and overlays `params`.
    fn prepare(api: &'static xvc_encoder_api, params: &EncoderParams) -> Result<Self, CodecError> {
        let ptr = NonNull::new(unsafe { (api.parameters_create)() })
            .ok_or_else(|| CodecError::engine_create("xvc_encoder_parameters_create failed"))?;
        let handle = Self { api, ptr };
        unsafe { (api.parameters_set_default)(handle.ptr.as_ptr()) }
            .result()
            .map_err(|s| CodecError::InvalidParameters(s.into()))?;

        // SAFETY: ptr is a live parameter block owned by this handle
        let raw = unsafe { &mut *handle.ptr.as_ptr() };
        raw.width = to_c_int(params.width);
        raw.height = to_c_int(params.height);
        raw.framerate = params.framerate;
        raw.chroma_format = params.chroma_format.to_raw();
        raw.color_matrix = params.color_matrix.to_raw();
        raw.input_bitdepth = params.bit_depth;
        raw.internal_bitdepth = params.internal_bit_depth;
        raw.threads = params.threads.to_raw();
        raw.qp = params.qp;
        raw.deblock = params.deblock.to_raw();
        raw.low_delay = c_int::from(params.low_delay);
        raw.speed_mode = params.speed_mode.to_raw();
        raw.tune_mode = params.tune_mode.to_raw();
        raw.restricted_mode = params.restricted_mode;
        Ok(handle)
    }

    fn check(&self) -> Result<(), EncStatus> {
        unsafe { (self.api.parameters_check)(self.ptr.as_ptr()) }.result()
    }
}

impl Drop for EncoderParamHandle {
    fn drop(&mut self) {
        unsafe { (self.api.parameters_destroy)(self.ptr.as_ptr()) }
            .result()
            .ok();
    }
}

/// Backend producing [`NativeEncoder`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeEncoderBackend;

impl EncoderBackend for NativeEncoderBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn check(&self, params: &EncoderParams) -> Result<(), EncStatus> {
        let api = encoder_api().map_err(|_| EncStatus::InvalidArgument)?;
        let handle = EncoderParamHandle::prepare(api, params).map_err(|e| match e.status() {
            Some(crate::EngineStatus::Encoder(s)) => s,
            _ => EncStatus::InvalidArgument,
        })?;
        handle.check()
    }

    fn create(&self, params: &EncoderParams) -> Result<Box<dyn EncoderEngine>, CodecError> {
        let api = encoder_api()?;
        let handle = EncoderParamHandle::prepare(api, params)?;
        if let Err(status) = handle.check() {
            warn!(%status, text = %error_text(api, status), "xvc encoder parameters rejected");
            return Err(CodecError::InvalidParameters(status.into()));
        }
        let ptr = NonNull::new(unsafe { (api.encoder_create)(handle.ptr.as_ptr()) })
            .ok_or_else(|| CodecError::engine_create("xvc_encoder_create returned null"))?;
        debug!("native xvc encoder created");
        Ok(Box::new(NativeEncoder {
            api,
            ptr,
            nals: ptr::null_mut(),
            num_nals: 0,
        }))
    }
}

/// Encoder handle owned by a session.
pub struct NativeEncoder {
    api: &'static xvc_encoder_api,
    ptr: NonNull<xvc_encoder>,
    nals: *mut xvc_enc_nal_unit,
    num_nals: c_int,
}

// SAFETY: the encoder handle is only touched through &mut self, so it is
// never used from two threads at once.
unsafe impl Send for NativeEncoder {}

impl NativeEncoder {
    /// Views the NAL array written by the last call.
    fn last_output(&self) -> Vec<EngineNal<'_>> {
        if self.nals.is_null() || self.num_nals <= 0 {
            return Vec::new();
        }
        // SAFETY: the engine keeps the array alive until the next call on
        // this handle, and &self prevents that call while the views exist.
        let units = unsafe { std::slice::from_raw_parts(self.nals, self.num_nals as usize) };
        units
            .iter()
            .map(|unit| EngineNal {
                bytes: if unit.bytes.is_null() {
                    &[]
                } else {
                    unsafe { std::slice::from_raw_parts(unit.bytes, unit.size) }
                },
                nal_type: NalUnitType::from_raw(unit.stats.nal_unit_type),
                user_data: unit.user_data,
            })
            .collect()
    }
}

impl EncoderEngine for NativeEncoder {
    fn encode(&mut self, input: EncodeInput<'_>) -> Result<Vec<EngineNal<'_>>, EncStatus> {
        let planes = [
            input.planes[0].as_ptr(),
            input.planes[1].as_ptr(),
            input.planes[2].as_ptr(),
        ];
        let strides = [
            c_int::try_from(input.strides[0]).map_err(|_| EncStatus::InvalidArgument)?,
            c_int::try_from(input.strides[1]).map_err(|_| EncStatus::InvalidArgument)?,
            c_int::try_from(input.strides[2]).map_err(|_| EncStatus::InvalidArgument)?,
        ];
        self.nals = ptr::null_mut();
        self.num_nals = 0;
        let status = unsafe {
            (self.api.encoder_encode2)(
                self.ptr.as_ptr(),
                planes.as_ptr(),
                strides.as_ptr(),
                &mut self.nals,
                &mut self.num_nals,
                ptr::null_mut(),
                input.user_data,
            )
        }
        .result();
        match status {
            Ok(()) | Err(EncStatus::NoMoreOutput) => Ok(self.last_output()),
            Err(other) => Err(other),
        }
    }

    fn flush(&mut self) -> Result<Vec<EngineNal<'_>>, EncStatus> {
        self.nals = ptr::null_mut();
        self.num_nals = 0;
        unsafe {
            (self.api.encoder_flush)(
                self.ptr.as_ptr(),
                &mut self.nals,
                &mut self.num_nals,
                ptr::null_mut(),
            )
        }
        .result()?;
        Ok(self.last_output())
    }

    fn destroy(&mut self) -> Result<(), EncStatus> {
        self.nals = ptr::null_mut();
        self.num_nals = 0;
        unsafe { (self.api.encoder_destroy)(self.ptr.as_ptr()) }.result()
    }
}

// ============================================================================
// Decoder
// ============================================================================

struct DecoderParamHandle {
    api: &'static xvc_decoder_api,
    ptr: NonNull<xvc_decoder_parameters>,
}

impl DecoderParamHandle {
    fn prepare(api: &'static xvc_decoder_api, params: &DecoderParams) -> Result<Self, CodecError> {
        let ptr = NonNull::new(unsafe { (api.parameters_create)() })
            .ok_or_else(|| CodecError::engine_create("xvc_decoder_parameters_create failed"))?;
        let handle = Self { api, ptr };
        DecCode(unsafe { (api.parameters_set_default)(handle.ptr.as_ptr()) })
            .result()
            .map_err(|s| CodecError::InvalidParameters(s.into()))?;

        // SAFETY: ptr is a live parameter block owned by this handle
        let raw = unsafe { &mut *handle.ptr.as_ptr() };
        raw.output_width = to_c_int(params.output_width);
        raw.output_height = to_c_int(params.output_height);
        raw.output_chroma_format = params.chroma_format.to_raw();
        raw.output_color_matrix = params.color_matrix.to_raw();
        raw.output_bitdepth = to_c_int(params.bit_depth);
        raw.max_framerate = params.max_framerate;
        raw.threads = params.threads.to_raw();
        Ok(handle)
    }

    fn check(&self) -> Result<(), DecStatus> {
        DecCode(unsafe { (self.api.parameters_check)(self.ptr.as_ptr()) }).result()
    }
}

impl Drop for DecoderParamHandle {
    fn drop(&mut self) {
        DecCode(unsafe { (self.api.parameters_destroy)(self.ptr.as_ptr()) })
            .result()
            .ok();
    }
}

/// Backend producing [`NativeDecoder`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDecoderBackend;

impl DecoderBackend for NativeDecoderBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn check(&self, params: &DecoderParams) -> Result<(), DecStatus> {
        let api = decoder_api().map_err(|_| DecStatus::InvalidArgument)?;
        let handle = DecoderParamHandle::prepare(api, params).map_err(|e| match e.status() {
            Some(crate::EngineStatus::Decoder(s)) => s,
            _ => DecStatus::InvalidArgument,
        })?;
        handle.check()
    }

    fn create(&self, params: &DecoderParams) -> Result<Box<dyn DecoderEngine>, CodecError> {
        let api = decoder_api()?;
        let handle = DecoderParamHandle::prepare(api, params)?;
        handle
            .check()
            .map_err(|s| CodecError::InvalidParameters(s.into()))?;
        let ptr = NonNull::new(unsafe { (api.decoder_create)(handle.ptr.as_ptr()) })
            .ok_or_else(|| CodecError::engine_create("xvc_decoder_create returned null"))?;
        let picture = match NonNull::new(unsafe { (api.picture_create)(ptr.as_ptr()) }) {
            Some(picture) => picture,
            None => {
                DecCode(unsafe { (api.decoder_destroy)(ptr.as_ptr()) }).result().ok();
                return Err(CodecError::engine_create("xvc_decoder_picture_create returned null"));
            }
        };
        debug!("native xvc decoder created");
        Ok(Box::new(NativeDecoder { api, ptr, picture }))
    }
}

/// Decoder handle owned by a session.
pub struct NativeDecoder {
    api: &'static xvc_decoder_api,
    ptr: NonNull<xvc_decoder>,
    picture: NonNull<xvc_decoded_picture>,
}

// SAFETY: see NativeEncoder.
unsafe impl Send for NativeDecoder {}

impl DecoderEngine for NativeDecoder {
    fn decode_nal(&mut self, nal: &[u8], user_data: i64) -> Result<(), DecStatus> {
        DecCode(unsafe {
            (self.api.decoder_decode_nal)(self.ptr.as_ptr(), nal.as_ptr(), nal.len(), user_data)
        })
        .result()
    }

    fn flush(&mut self) -> Result<(), DecStatus> {
        DecCode(unsafe { (self.api.decoder_flush)(self.ptr.as_ptr()) }).result()
    }

    fn get_picture(&mut self) -> Result<Option<EnginePicture<'_>>, DecStatus> {
        match DecCode(unsafe {
            (self.api.decoder_get_picture)(self.ptr.as_ptr(), self.picture.as_ptr())
        })
        .result()
        {
            Ok(()) => {}
            Err(DecStatus::NoDecodedPic) => return Ok(None),
            Err(other) => return Err(other),
        }

        // SAFETY: the picture block stays valid until the next call on this
        // decoder, which &mut self rules out while the view is borrowed.
        let pic = unsafe { self.picture.as_ref() };
        if pic.bytes.is_null() {
            return Ok(None);
        }
        let bytes = unsafe { std::slice::from_raw_parts(pic.bytes as *const u8, pic.size) };
        Ok(Some(EnginePicture {
            bytes,
            strides: [
                pic.stride[0].max(0) as usize,
                pic.stride[1].max(0) as usize,
                pic.stride[2].max(0) as usize,
            ],
            width: pic.stats.width.max(0) as usize,
            height: pic.stats.height.max(0) as usize,
            chroma_format: ChromaFormat::from_raw(pic.stats.chroma_format),
            color_matrix: ColorMatrix::from_raw(pic.stats.color_matrix),
            bit_depth: pic.stats.bitdepth.max(0) as u32,
            nal_type: NalUnitType::from_raw(pic.stats.nal_unit_type),
            user_data: pic.user_data,
        }))
    }

    fn destroy(&mut self) -> Result<(), DecStatus> {
        DecCode(unsafe { (self.api.picture_destroy)(self.picture.as_ptr()) })
            .result()
            .ok();
        DecCode(unsafe { (self.api.decoder_destroy)(self.ptr.as_ptr()) }).result()
    }
}

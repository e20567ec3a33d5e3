//! xvc encoder bindings (xvcenc.h)
//!
//! Raw FFI bindings to the xvc encoder. All entry points other than
//! [`xvc_encoder_api_get`] are reached through the returned function table.

use std::os::raw::{c_char, c_double, c_int};

/// Opaque encoder handle
#[repr(C)]
pub struct xvc_encoder {
    _private: [u8; 0],
}

/// Return code of every encoder call
pub type xvc_enc_return_code = c_int;

// ============================================================================
// Return codes
// ============================================================================

pub const XVC_ENC_OK: xvc_enc_return_code = 0;
pub const XVC_ENC_NO_MORE_OUTPUT: xvc_enc_return_code = 1;
pub const XVC_ENC_INVALID_ARGUMENT: xvc_enc_return_code = 10;
pub const XVC_ENC_INVALID_PARAMETER: xvc_enc_return_code = 20;
pub const XVC_ENC_SIZE_TOO_SMALL: xvc_enc_return_code = 21;
pub const XVC_ENC_UNSUPPORTED_CHROMA_FORMAT: xvc_enc_return_code = 22;
pub const XVC_ENC_BITDEPTH_OUT_OF_RANGE: xvc_enc_return_code = 23;
pub const XVC_ENC_COMPILED_BITDEPTH_TOO_LOW: xvc_enc_return_code = 24;
pub const XVC_ENC_FRAMERATE_OUT_OF_RANGE: xvc_enc_return_code = 25;
pub const XVC_ENC_QP_OUT_OF_RANGE: xvc_enc_return_code = 26;
pub const XVC_ENC_SUB_GOP_LENGTH_TOO_LARGE: xvc_enc_return_code = 27;
pub const XVC_ENC_DEBLOCKING_SETTINGS_INVALID: xvc_enc_return_code = 28;
pub const XVC_ENC_TOO_MANY_REF_PICS: xvc_enc_return_code = 29;
pub const XVC_ENC_SIZE_TOO_LARGE: xvc_enc_return_code = 30;
pub const XVC_ENC_NO_SUCH_PRESET: xvc_enc_return_code = 100;

// ============================================================================
// Picture format
// ============================================================================

/// Chroma format enumeration
pub type xvc_enc_chroma_format = c_int;

pub const XVC_ENC_CHROMA_FORMAT_MONOCHROME: xvc_enc_chroma_format = 0;
pub const XVC_ENC_CHROMA_FORMAT_420: xvc_enc_chroma_format = 1;
pub const XVC_ENC_CHROMA_FORMAT_422: xvc_enc_chroma_format = 2;
pub const XVC_ENC_CHROMA_FORMAT_444: xvc_enc_chroma_format = 3;
pub const XVC_ENC_CHROMA_FORMAT_ARGB: xvc_enc_chroma_format = 4;
pub const XVC_ENC_CHROMA_FORMAT_UNDEFINED: xvc_enc_chroma_format = 255;

/// Color matrix enumeration
pub type xvc_enc_color_matrix = c_int;

pub const XVC_ENC_COLOR_MATRIX_UNDEFINED: xvc_enc_color_matrix = 0;
pub const XVC_ENC_COLOR_MATRIX_601: xvc_enc_color_matrix = 1;
pub const XVC_ENC_COLOR_MATRIX_709: xvc_enc_color_matrix = 2;
pub const XVC_ENC_COLOR_MATRIX_2020: xvc_enc_color_matrix = 3;

// ============================================================================
// Output structures
// ============================================================================

/// Per-NAL statistics reported by the encoder
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_enc_nal_stats {
    pub nal_unit_type: u32,
    /// Picture order count
    pub poc: u32,
    /// Decode order count
    pub doc: u32,
    /// Segment order count
    pub soc: u32,
    /// Temporal layer id
    pub tid: u32,
    pub qp: c_int,
    pub sse_y: c_double,
    pub sse_u: c_double,
    pub sse_v: c_double,
    pub psnr_y: c_double,
    pub psnr_u: c_double,
    pub psnr_v: c_double,
    pub l0: [i32; 5],
    pub l1: [i32; 5],
}

/// One NAL unit produced by encode/flush.
///
/// `bytes` points into encoder-owned memory that stays valid only until the
/// next call into the same encoder.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_enc_nal_unit {
    pub bytes: *mut u8,
    pub size: usize,
    pub buffer_flag: c_int,
    pub user_data: i64,
    pub stats: xvc_enc_nal_stats,
}

/// Optional reconstructed picture output
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_enc_pic_buffer {
    pub pic: *mut u8,
    pub size: usize,
}

/// Encoder parameters (allocated by `parameters_create`)
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_encoder_parameters {
    pub width: c_int,
    pub height: c_int,
    pub chroma_format: xvc_enc_chroma_format,
    pub color_matrix: xvc_enc_color_matrix,
    pub input_bitdepth: u32,
    pub internal_bitdepth: u32,
    pub framerate: c_double,
    pub sub_gop_length: c_int,
    pub max_keypic_distance: c_int,
    pub closed_gop: c_int,
    pub num_ref_pics: c_int,
    pub restricted_mode: c_int,
    pub checksum_mode: c_int,
    pub chroma_qp_offset_table: c_int,
    pub chroma_qp_offset_u: c_int,
    pub chroma_qp_offset_v: c_int,
    pub deblock: c_int,
    pub beta_offset: c_int,
    pub tc_offset: c_int,
    pub qp: c_int,
    pub flat_lambda: c_int,
    pub low_delay: c_int,
    pub multipass_rd: c_int,
    pub speed_mode: c_int,
    pub tune_mode: c_int,
    pub simd_mask: c_int,
    pub threads: c_int,
    pub explicit_encoder_settings: *const c_char,
}

// ============================================================================
// Function table
// ============================================================================

/// Encoder API function table returned by [`xvc_encoder_api_get`]
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_encoder_api {
    pub parameters_create: unsafe extern "C" fn() -> *mut xvc_encoder_parameters,
    pub parameters_destroy:
        unsafe extern "C" fn(param: *mut xvc_encoder_parameters) -> xvc_enc_return_code,
    pub parameters_set_default:
        unsafe extern "C" fn(param: *mut xvc_encoder_parameters) -> xvc_enc_return_code,
    pub parameters_apply_preset: unsafe extern "C" fn(
        param: *mut xvc_encoder_parameters,
        preset: c_int,
    ) -> xvc_enc_return_code,
    pub parameters_check:
        unsafe extern "C" fn(param: *mut xvc_encoder_parameters) -> xvc_enc_return_code,
    pub encoder_create:
        unsafe extern "C" fn(param: *mut xvc_encoder_parameters) -> *mut xvc_encoder,
    pub encoder_destroy: unsafe extern "C" fn(encoder: *mut xvc_encoder) -> xvc_enc_return_code,
    pub encoder_encode: unsafe extern "C" fn(
        encoder: *mut xvc_encoder,
        picture_bytes: *const u8,
        nal_units: *mut *mut xvc_enc_nal_unit,
        num_nal_units: *mut c_int,
        rec_pic: *mut xvc_enc_pic_buffer,
        user_data: i64,
    ) -> xvc_enc_return_code,
    pub encoder_encode2: unsafe extern "C" fn(
        encoder: *mut xvc_encoder,
        plane_bytes: *const *const u8,
        plane_stride: *const c_int,
        nal_units: *mut *mut xvc_enc_nal_unit,
        num_nal_units: *mut c_int,
        rec_pic: *mut xvc_enc_pic_buffer,
        user_data: i64,
    ) -> xvc_enc_return_code,
    pub encoder_flush: unsafe extern "C" fn(
        encoder: *mut xvc_encoder,
        nal_units: *mut *mut xvc_enc_nal_unit,
        num_nal_units: *mut c_int,
        rec_pic: *mut xvc_enc_pic_buffer,
    ) -> xvc_enc_return_code,
    pub xvc_enc_get_error_text: unsafe extern "C" fn(error_code: xvc_enc_return_code) -> *const c_char,
}

// ============================================================================
// External function declarations
// ============================================================================

extern "C" {
    /// Get the static encoder API table
    pub fn xvc_encoder_api_get() -> *const xvc_encoder_api;
}

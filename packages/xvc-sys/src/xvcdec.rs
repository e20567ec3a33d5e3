//! xvc decoder bindings (xvcdec.h)
//!
//! Raw FFI bindings to the xvc decoder. All entry points other than
//! [`xvc_decoder_api_get`] are reached through the returned function table.

use std::os::raw::{c_char, c_double, c_int};

/// Opaque decoder handle
#[repr(C)]
pub struct xvc_decoder {
    _private: [u8; 0],
}

/// Return code of every decoder call
pub type xvc_dec_return_code = c_int;

// ============================================================================
// Return codes
// ============================================================================

pub const XVC_DEC_OK: xvc_dec_return_code = 0;
pub const XVC_DEC_NO_DECODED_PIC: xvc_dec_return_code = 1;
pub const XVC_DEC_NOT_CONFORMING: xvc_dec_return_code = 10;
pub const XVC_DEC_INVALID_ARGUMENT: xvc_dec_return_code = 20;
pub const XVC_DEC_INVALID_PARAMETER: xvc_dec_return_code = 30;
pub const XVC_DEC_FRAMERATE_OUT_OF_RANGE: xvc_dec_return_code = 31;
pub const XVC_DEC_BITDEPTH_OUT_OF_RANGE: xvc_dec_return_code = 32;
pub const XVC_DEC_BITSTREAM_VERSION_HIGHER_THAN_DECODER: xvc_dec_return_code = 33;
pub const XVC_DEC_NO_SEGMENT_HEADER_DECODED: xvc_dec_return_code = 34;
pub const XVC_DEC_BITSTREAM_BITDEPTH_TOO_HIGH: xvc_dec_return_code = 35;
pub const XVC_DEC_BITSTREAM_VERSION_LOWER_THAN_SUPPORTED_BY_DECODER: xvc_dec_return_code = 36;

// ============================================================================
// Picture format
// ============================================================================

/// Chroma format enumeration
pub type xvc_dec_chroma_format = c_int;

pub const XVC_DEC_CHROMA_FORMAT_MONOCHROME: xvc_dec_chroma_format = 0;
pub const XVC_DEC_CHROMA_FORMAT_420: xvc_dec_chroma_format = 1;
pub const XVC_DEC_CHROMA_FORMAT_422: xvc_dec_chroma_format = 2;
pub const XVC_DEC_CHROMA_FORMAT_444: xvc_dec_chroma_format = 3;
pub const XVC_DEC_CHROMA_FORMAT_ARGB: xvc_dec_chroma_format = 4;
pub const XVC_DEC_CHROMA_FORMAT_UNDEFINED: xvc_dec_chroma_format = 255;

/// Color matrix enumeration
pub type xvc_dec_color_matrix = c_int;

pub const XVC_DEC_COLOR_MATRIX_UNDEFINED: xvc_dec_color_matrix = 0;
pub const XVC_DEC_COLOR_MATRIX_601: xvc_dec_color_matrix = 1;
pub const XVC_DEC_COLOR_MATRIX_709: xvc_dec_color_matrix = 2;
pub const XVC_DEC_COLOR_MATRIX_2020: xvc_dec_color_matrix = 3;

// ============================================================================
// Picture structures
// ============================================================================

/// Statistics attached to each decoded picture
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_dec_pic_stats {
    pub nal_unit_type: u32,
    pub poc: u32,
    pub doc: u32,
    pub soc: u32,
    pub tid: u32,
    pub width: c_int,
    pub height: c_int,
    pub bitdepth: c_int,
    pub chroma_format: xvc_dec_chroma_format,
    pub color_matrix: xvc_dec_color_matrix,
    pub qp: c_int,
    pub conformance: c_int,
    pub framerate: c_double,
    pub bitstream_bitdepth: c_int,
    pub l0: [i32; 5],
    pub l1: [i32; 5],
}

/// Decoded picture (allocated by `picture_create`).
///
/// `bytes` and `planes` point into decoder-owned memory that stays valid only
/// until the next call into the same decoder.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_decoded_picture {
    pub bytes: *mut c_char,
    pub size: usize,
    pub planes: [*mut c_char; 3],
    pub stride: [c_int; 3],
    pub user_data: i64,
    pub stats: xvc_dec_pic_stats,
}

/// Decoder parameters (allocated by `parameters_create`)
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_decoder_parameters {
    pub output_width: c_int,
    pub output_height: c_int,
    pub output_chroma_format: xvc_dec_chroma_format,
    pub output_color_matrix: xvc_dec_color_matrix,
    pub output_bitdepth: c_int,
    pub max_framerate: c_double,
    pub threads: c_int,
    pub simd_mask: c_int,
}

// ============================================================================
// Function table
// ============================================================================

/// Decoder API function table returned by [`xvc_decoder_api_get`]
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct xvc_decoder_api {
    pub parameters_create: unsafe extern "C" fn() -> *mut xvc_decoder_parameters,
    pub parameters_destroy:
        unsafe extern "C" fn(param: *mut xvc_decoder_parameters) -> xvc_dec_return_code,
    pub parameters_set_default:
        unsafe extern "C" fn(param: *mut xvc_decoder_parameters) -> xvc_dec_return_code,
    pub parameters_check:
        unsafe extern "C" fn(param: *mut xvc_decoder_parameters) -> xvc_dec_return_code,
    pub decoder_create:
        unsafe extern "C" fn(param: *mut xvc_decoder_parameters) -> *mut xvc_decoder,
    pub decoder_destroy: unsafe extern "C" fn(decoder: *mut xvc_decoder) -> xvc_dec_return_code,
    pub decoder_decode_nal: unsafe extern "C" fn(
        decoder: *mut xvc_decoder,
        nal_unit: *const u8,
        nal_unit_size: usize,
        user_data: i64,
    ) -> xvc_dec_return_code,
    pub decoder_get_picture: unsafe extern "C" fn(
        decoder: *mut xvc_decoder,
        out_pic: *mut xvc_decoded_picture,
    ) -> xvc_dec_return_code,
    pub decoder_flush: unsafe extern "C" fn(decoder: *mut xvc_decoder) -> xvc_dec_return_code,
    pub picture_create: unsafe extern "C" fn(decoder: *mut xvc_decoder) -> *mut xvc_decoded_picture,
    pub picture_destroy:
        unsafe extern "C" fn(picture: *mut xvc_decoded_picture) -> xvc_dec_return_code,
    pub xvc_dec_get_error_text: unsafe extern "C" fn(error_code: xvc_dec_return_code) -> *const c_char,
}

// ============================================================================
// External function declarations
// ============================================================================

extern "C" {
    /// Get the static decoder API table
    pub fn xvc_decoder_api_get() -> *const xvc_decoder_api;
}

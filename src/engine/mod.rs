//! Engine seam.
//!
//! The compression engine is reached through a small call contract: validate
//! a parameter record, create a handle, push pictures or NAL units, pull
//! output, destroy the handle. Output memory belongs to the engine and is only
//! valid until the next call on the same handle, which the traits below
//! express by borrowing the engine for the lifetime of the returned data.
//!
//! Two backends implement the contract:
//!
//! - [`raw`]: pure Rust, stores samples uncompressed. Always available.
//! - `native` (`native` feature): `libxvcenc` / `libxvcdec` through `xvc-sys`.

use std::fmt;
use std::sync::Arc;

use crate::params::{DecoderParams, EncoderParams};
use crate::{ChromaFormat, CodecError, ColorMatrix, DecStatus, EncStatus, NalUnitType};

pub mod raw;

#[cfg(feature = "native")]
pub mod native;

/// One picture submitted to an encoder engine.
#[derive(Debug, Clone, Copy)]
pub struct EncodeInput<'a> {
    /// Y, U, V plane data.
    pub planes: [&'a [u8]; 3],
    /// Y, U, V strides in bytes.
    pub strides: [usize; 3],
    /// Opaque tag returned with the resulting NAL units.
    pub user_data: i64,
}

/// NAL unit in engine-owned memory.
#[derive(Debug, Clone, Copy)]
pub struct EngineNal<'a> {
    pub bytes: &'a [u8],
    pub nal_type: NalUnitType,
    pub user_data: i64,
}

/// Decoded picture in engine-owned memory.
#[derive(Debug, Clone, Copy)]
pub struct EnginePicture<'a> {
    /// All planes back to back (Y, U, V), padding included.
    pub bytes: &'a [u8],
    pub strides: [usize; 3],
    pub width: usize,
    pub height: usize,
    pub chroma_format: ChromaFormat,
    pub color_matrix: ColorMatrix,
    pub bit_depth: u32,
    pub nal_type: NalUnitType,
    pub user_data: i64,
}

/// Live encoder handle.
pub trait EncoderEngine: Send {
    /// Submits one picture. Returns the NAL units that became ready.
    fn encode(&mut self, input: EncodeInput<'_>) -> Result<Vec<EngineNal<'_>>, EncStatus>;

    /// Forces out buffered pictures.
    ///
    /// `Err(EncStatus::NoMoreOutput)` when nothing is buffered.
    fn flush(&mut self) -> Result<Vec<EngineNal<'_>>, EncStatus>;

    /// Releases the handle. Called exactly once by the session.
    fn destroy(&mut self) -> Result<(), EncStatus>;
}

/// Live decoder handle.
pub trait DecoderEngine: Send {
    /// Submits one NAL unit payload.
    fn decode_nal(&mut self, nal: &[u8], user_data: i64) -> Result<(), DecStatus>;

    /// Signals end of stream so buffered pictures become available.
    fn flush(&mut self) -> Result<(), DecStatus>;

    /// Next decoded picture in output order, `None` when nothing is ready.
    fn get_picture(&mut self) -> Result<Option<EnginePicture<'_>>, DecStatus>;

    /// Releases the handle. Called exactly once by the session.
    fn destroy(&mut self) -> Result<(), DecStatus>;
}

/// Factory for encoder handles.
pub trait EncoderBackend: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Structural check of a parameter record after engine defaults have
    /// been applied.
    fn check(&self, params: &EncoderParams) -> Result<(), EncStatus>;

    fn create(&self, params: &EncoderParams) -> Result<Box<dyn EncoderEngine>, CodecError>;
}

/// Factory for decoder handles.
pub trait DecoderBackend: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, params: &DecoderParams) -> Result<(), DecStatus>;

    fn create(&self, params: &DecoderParams) -> Result<Box<dyn DecoderEngine>, CodecError>;
}

/// Encoder backend selected at compile time.
#[must_use]
pub fn default_encoder_backend() -> Arc<dyn EncoderBackend> {
    #[cfg(feature = "native")]
    {
        Arc::new(native::NativeEncoderBackend)
    }
    #[cfg(not(feature = "native"))]
    {
        Arc::new(raw::RawEncoderBackend)
    }
}

/// Decoder backend selected at compile time.
#[must_use]
pub fn default_decoder_backend() -> Arc<dyn DecoderBackend> {
    #[cfg(feature = "native")]
    {
        Arc::new(native::NativeDecoderBackend)
    }
    #[cfg(not(feature = "native"))]
    {
        Arc::new(raw::RawDecoderBackend)
    }
}

//! Safe sessions over the xvc video engine.
//!
//! This crate wraps the xvc encoder and decoder behind owned session types.
//! Every unit handed out is copied out of engine memory into a pooled buffer
//! and framed with a 4-byte big-endian length prefix, so streams can be
//! written to disk or sent over a socket as-is.
//!
//! # Quick Start (Encoding)
//!
//! ```ignore
//! use xvc::{Encoder, EncoderParams, PlanarFrame};
//!
//! // Validate parameters against the engine
//! let params = EncoderParams::new(1280, 720, 30.0).qp(28).build()?;
//! let mut encoder = Encoder::new(params)?;
//!
//! let frame = PlanarFrame::from_i420(1280, 720, i420_data)?;
//! for unit in encoder.encode_frame(&frame, 0)? {
//!     // unit.bytes() is one framed record
//!     writer.write_all(unit.bytes())?;
//! }
//!
//! let (tail, _) = encoder.flush()?;
//! ```
//!
//! # Quick Start (Decoding)
//!
//! ```ignore
//! use xvc::{Decoder, DecoderParams};
//!
//! let mut decoder = Decoder::new(DecoderParams::new().build()?)?;
//! decoder.decode(&record)?;
//!
//! while let Some(picture) = decoder.decoded_picture()? {
//!     if let Some(image) = picture.image() {
//!         // image.plane(Plane::Y), image.stride(Plane::Y), ...
//!     }
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `native` - Link `libxvcenc` / `libxvcdec` through `xvc-sys`. Without it
//!   the pure Rust raw engine is used, which stores samples uncompressed.
//! - `image` - RGB export of planar pictures through the `image` crate
//!
//! # Architecture
//!
//! Sessions talk to the engine through the [`engine`] traits. Parameters are
//! checked once by [`EncoderParams::build`] / [`DecoderParams::build`], and a
//! session can only be opened from the resulting [`Validated`] record.

mod decoder;
mod encoder;
mod error;
mod frame;
mod lifecycle;
mod params;
mod picture;
mod pool;
mod types;
mod unit;

pub mod engine;
pub mod framing;

pub use decoder::{DecodedPicture, Decoder, PictureRef};
pub use encoder::Encoder;
pub use error::{CodecError, DecStatus, EncStatus, EngineStatus, Result};
pub use frame::{expected_frame_size, PlanarFrame};
pub use framing::{frame, unframe, FramedReader, FramedRecord, FramedWriter, NalCodec};
pub use lifecycle::{CloseFlag, Resource, SessionState};
pub use params::{Checked, DecoderParams, EncoderParams, Validated, RESTRICTED_MODE_BASELINE};
pub use picture::{reconstruct, PictureLayout, PlanarImage};
pub use pool::{BufferPool, BufferPoolConfig, PoolStats, PooledBuffer};
pub use types::{
    ChromaFormat, ColorMatrix, DeblockMode, NalUnitType, Plane, SpeedMode, Threads, TuneMode,
};
pub use unit::CompressedUnit;

//! Session parameters and their engine-side validation.
//!
//! Parameters are plain records seeded with the engine defaults and adjusted
//! through consuming setters. A session can only be opened from a
//! [`Validated`] record, which is produced by `build()` after the engine has
//! applied its defaults, overlaid the record and run its structural check.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{default_decoder_backend, default_encoder_backend, DecoderBackend, EncoderBackend};
use crate::pool::{BufferPool, DEFAULT_MIN_CAPACITY};
use crate::{
    ChromaFormat, CodecError, ColorMatrix, DeblockMode, EngineStatus, SpeedMode, Threads, TuneMode,
};

/// Baseline restriction profile.
pub const RESTRICTED_MODE_BASELINE: i32 = 3;

/// Configuration for an encoder session.
#[derive(Debug, Clone)]
pub struct EncoderParams {
    /// Picture width in pixels.
    pub width: u32,
    /// Picture height in pixels.
    pub height: u32,
    /// Frames per second.
    pub framerate: f64,
    /// Chroma format of the input planes.
    pub chroma_format: ChromaFormat,
    pub color_matrix: ColorMatrix,
    /// Bit depth of the input samples.
    pub bit_depth: u32,
    /// Bit depth used inside the engine.
    pub internal_bit_depth: u32,
    pub threads: Threads,
    /// Quantization parameter (0..=63).
    pub qp: i32,
    pub deblock: DeblockMode,
    /// Disable picture reordering.
    pub low_delay: bool,
    pub speed_mode: SpeedMode,
    pub tune_mode: TuneMode,
    /// Restriction profile (0..=3, baseline = 3).
    pub restricted_mode: i32,
    /// Pool shared with other sessions. A private pool is created when unset.
    pub buffer_pool: Option<BufferPool>,
    /// Minimum capacity of the private pool's buffers.
    pub pool_capacity: usize,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            framerate: 30.0,
            chroma_format: ChromaFormat::Yuv420,
            color_matrix: ColorMatrix::Unified,
            bit_depth: 8,
            internal_bit_depth: 8,
            threads: Threads::Auto,
            qp: 32,
            deblock: DeblockMode::Enabled,
            low_delay: true,
            speed_mode: SpeedMode::Fast,
            tune_mode: TuneMode::VisualQuality,
            restricted_mode: RESTRICTED_MODE_BASELINE,
            buffer_pool: None,
            pool_capacity: DEFAULT_MIN_CAPACITY,
        }
    }
}

impl EncoderParams {
    /// Create encoder parameters for the given picture size and framerate.
    #[must_use]
    pub fn new(width: u32, height: u32, framerate: f64) -> Self {
        Self {
            width,
            height,
            framerate,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn chroma_format(mut self, format: ChromaFormat) -> Self {
        self.chroma_format = format;
        self
    }

    #[must_use]
    pub fn color_matrix(mut self, matrix: ColorMatrix) -> Self {
        self.color_matrix = matrix;
        self
    }

    #[must_use]
    pub fn bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    #[must_use]
    pub fn internal_bit_depth(mut self, bit_depth: u32) -> Self {
        self.internal_bit_depth = bit_depth;
        self
    }

    #[must_use]
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn qp(mut self, qp: i32) -> Self {
        self.qp = qp;
        self
    }

    #[must_use]
    pub fn deblock(mut self, mode: DeblockMode) -> Self {
        self.deblock = mode;
        self
    }

    #[must_use]
    pub fn low_delay(mut self, enabled: bool) -> Self {
        self.low_delay = enabled;
        self
    }

    #[must_use]
    pub fn speed_mode(mut self, mode: SpeedMode) -> Self {
        self.speed_mode = mode;
        self
    }

    #[must_use]
    pub fn tune_mode(mut self, mode: TuneMode) -> Self {
        self.tune_mode = mode;
        self
    }

    #[must_use]
    pub fn restricted_mode(mut self, mode: i32) -> Self {
        self.restricted_mode = mode;
        self
    }

    /// Share `pool` with this session.
    #[must_use]
    pub fn buffer_pool(mut self, pool: BufferPool) -> Self {
        self.buffer_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Validate against the default engine backend.
    pub fn build(self) -> Result<Validated<Self>, CodecError> {
        self.build_with(default_encoder_backend())
    }

    /// Validate against `backend`. Sessions opened from the result use the
    /// same backend.
    pub fn build_with(self, backend: Arc<dyn EncoderBackend>) -> Result<Validated<Self>, CodecError> {
        match backend.check(&self) {
            Ok(()) => {
                debug!(
                    backend = backend.name(),
                    width = self.width,
                    height = self.height,
                    "encoder parameters validated"
                );
                Ok(Validated {
                    params: self,
                    backend,
                })
            }
            Err(status) => {
                warn!(backend = backend.name(), %status, "encoder parameters rejected");
                Err(CodecError::InvalidParameters(EngineStatus::Encoder(status)))
            }
        }
    }

    pub(crate) fn session_pool(&self) -> BufferPool {
        self.buffer_pool
            .clone()
            .unwrap_or_else(|| BufferPool::with_capacity(self.pool_capacity))
    }
}

/// Configuration for a decoder session.
#[derive(Debug, Clone)]
pub struct DecoderParams {
    /// Output width; 0 keeps the bitstream width.
    pub output_width: u32,
    /// Output height; 0 keeps the bitstream height.
    pub output_height: u32,
    /// Output chroma format (`Unified` keeps the bitstream format).
    pub chroma_format: ChromaFormat,
    /// Output colour matrix (`Unified` keeps the bitstream matrix).
    pub color_matrix: ColorMatrix,
    /// Output bit depth.
    pub bit_depth: u32,
    /// Upper bound on the decoded framerate; 0 means unrestricted.
    pub max_framerate: f64,
    pub threads: Threads,
    pub buffer_pool: Option<BufferPool>,
    pub pool_capacity: usize,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            output_width: 0,
            output_height: 0,
            chroma_format: ChromaFormat::Yuv420,
            color_matrix: ColorMatrix::Unified,
            bit_depth: 8,
            max_framerate: 0.0,
            threads: Threads::Auto,
            buffer_pool: None,
            pool_capacity: DEFAULT_MIN_CAPACITY,
        }
    }
}

impl DecoderParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Crop decoded pictures to `width` x `height`.
    #[must_use]
    pub fn output_size(mut self, width: u32, height: u32) -> Self {
        self.output_width = width;
        self.output_height = height;
        self
    }

    #[must_use]
    pub fn chroma_format(mut self, format: ChromaFormat) -> Self {
        self.chroma_format = format;
        self
    }

    #[must_use]
    pub fn color_matrix(mut self, matrix: ColorMatrix) -> Self {
        self.color_matrix = matrix;
        self
    }

    #[must_use]
    pub fn bit_depth(mut self, bit_depth: u32) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    #[must_use]
    pub fn max_framerate(mut self, framerate: f64) -> Self {
        self.max_framerate = framerate;
        self
    }

    #[must_use]
    pub fn threads(mut self, threads: Threads) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn buffer_pool(mut self, pool: BufferPool) -> Self {
        self.buffer_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Validated<Self>, CodecError> {
        self.build_with(default_decoder_backend())
    }

    pub fn build_with(self, backend: Arc<dyn DecoderBackend>) -> Result<Validated<Self>, CodecError> {
        match backend.check(&self) {
            Ok(()) => {
                debug!(backend = backend.name(), "decoder parameters validated");
                Ok(Validated {
                    params: self,
                    backend,
                })
            }
            Err(status) => {
                warn!(backend = backend.name(), %status, "decoder parameters rejected");
                Err(CodecError::InvalidParameters(EngineStatus::Decoder(status)))
            }
        }
    }

    pub(crate) fn session_pool(&self) -> BufferPool {
        self.buffer_pool
            .clone()
            .unwrap_or_else(|| BufferPool::with_capacity(self.pool_capacity))
    }
}

/// Parameter records that an engine backend can validate.
pub trait Checked {
    /// Backend that validates and instantiates sessions for this record.
    type Backend: ?Sized + fmt::Debug + Send + Sync;
}

impl Checked for EncoderParams {
    type Backend = dyn EncoderBackend;
}

impl Checked for DecoderParams {
    type Backend = dyn DecoderBackend;
}

/// A parameter record that passed engine validation.
pub struct Validated<P: Checked> {
    params: P,
    backend: Arc<P::Backend>,
}

impl<P: Checked> Validated<P> {
    #[must_use]
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Backend that validated the record.
    #[must_use]
    pub fn backend(&self) -> &Arc<P::Backend> {
        &self.backend
    }

    /// Drops the validation, returning the plain record for further edits.
    #[must_use]
    pub fn into_inner(self) -> P {
        self.params
    }
}

impl<P: Checked> Deref for Validated<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.params
    }
}

impl<P: Checked + Clone> Clone for Validated<P> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<P: Checked + fmt::Debug> fmt::Debug for Validated<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validated")
            .field("params", &self.params)
            .field("backend", &self.backend)
            .finish()
    }
}

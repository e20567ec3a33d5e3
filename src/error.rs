//! Error types for xvc sessions.

use std::fmt;

use thiserror::Error;

use crate::{ChromaFormat, Plane};

/// Status code returned by the encoder engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncStatus {
    Ok,
    NoMoreOutput,
    InvalidArgument,
    InvalidParameter,
    SizeTooSmall,
    UnsupportedChromaFormat,
    BitDepthOutOfRange,
    CompiledBitDepthTooLow,
    FramerateOutOfRange,
    QpOutOfRange,
    SubGopLengthTooLarge,
    DeblockingSettingsInvalid,
    TooManyRefPics,
    SizeTooLarge,
    NoSuchPreset,
    Unknown(u32),
}

impl EncStatus {
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::NoMoreOutput,
            10 => Self::InvalidArgument,
            20 => Self::InvalidParameter,
            21 => Self::SizeTooSmall,
            22 => Self::UnsupportedChromaFormat,
            23 => Self::BitDepthOutOfRange,
            24 => Self::CompiledBitDepthTooLow,
            25 => Self::FramerateOutOfRange,
            26 => Self::QpOutOfRange,
            27 => Self::SubGopLengthTooLarge,
            28 => Self::DeblockingSettingsInvalid,
            29 => Self::TooManyRefPics,
            30 => Self::SizeTooLarge,
            100 => Self::NoSuchPreset,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::NoMoreOutput => 1,
            Self::InvalidArgument => 10,
            Self::InvalidParameter => 20,
            Self::SizeTooSmall => 21,
            Self::UnsupportedChromaFormat => 22,
            Self::BitDepthOutOfRange => 23,
            Self::CompiledBitDepthTooLow => 24,
            Self::FramerateOutOfRange => 25,
            Self::QpOutOfRange => 26,
            Self::SubGopLengthTooLarge => 27,
            Self::DeblockingSettingsInvalid => 28,
            Self::TooManyRefPics => 29,
            Self::SizeTooLarge => 30,
            Self::NoSuchPreset => 100,
            Self::Unknown(code) => code,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Ok => "XVC_ENC_OK",
            Self::NoMoreOutput => "XVC_ENC_NO_MORE_OUTPUT",
            Self::InvalidArgument => "XVC_ENC_INVALID_ARGUMENT",
            Self::InvalidParameter => "XVC_ENC_INVALID_PARAMETER",
            Self::SizeTooSmall => "XVC_ENC_SIZE_TOO_SMALL",
            Self::UnsupportedChromaFormat => "XVC_ENC_UNSUPPORTED_CHROMA_FORMAT",
            Self::BitDepthOutOfRange => "XVC_ENC_BITDEPTH_OUT_OF_RANGE",
            Self::CompiledBitDepthTooLow => "XVC_ENC_COMPILED_BITDEPTH_TOO_LOW",
            Self::FramerateOutOfRange => "XVC_ENC_FRAMERATE_OUT_OF_RANGE",
            Self::QpOutOfRange => "XVC_ENC_QP_OUT_OF_RANGE",
            Self::SubGopLengthTooLarge => "XVC_ENC_SUB_GOP_LENGTH_TOO_LARGE",
            Self::DeblockingSettingsInvalid => "XVC_ENC_DEBLOCKING_SETTINGS_INVALID",
            Self::TooManyRefPics => "XVC_ENC_TOO_MANY_REF_PICS",
            Self::SizeTooLarge => "XVC_ENC_SIZE_TOO_LARGE",
            Self::NoSuchPreset => "XVC_ENC_NO_SUCH_PRESET",
            Self::Unknown(_) => "XVC_ENC_UNKNOWN",
        }
    }
}

impl fmt::Display for EncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "XVC_ENC_UNKNOWN({code})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Status code returned by the decoder engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecStatus {
    Ok,
    NoDecodedPic,
    NotConforming,
    InvalidArgument,
    InvalidParameter,
    FramerateOutOfRange,
    BitDepthOutOfRange,
    BitstreamVersionTooNew,
    NoSegmentHeaderDecoded,
    BitstreamBitDepthTooHigh,
    BitstreamVersionTooOld,
    Unknown(u32),
}

impl DecStatus {
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::NoDecodedPic,
            10 => Self::NotConforming,
            20 => Self::InvalidArgument,
            30 => Self::InvalidParameter,
            31 => Self::FramerateOutOfRange,
            32 => Self::BitDepthOutOfRange,
            33 => Self::BitstreamVersionTooNew,
            34 => Self::NoSegmentHeaderDecoded,
            35 => Self::BitstreamBitDepthTooHigh,
            36 => Self::BitstreamVersionTooOld,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::NoDecodedPic => 1,
            Self::NotConforming => 10,
            Self::InvalidArgument => 20,
            Self::InvalidParameter => 30,
            Self::FramerateOutOfRange => 31,
            Self::BitDepthOutOfRange => 32,
            Self::BitstreamVersionTooNew => 33,
            Self::NoSegmentHeaderDecoded => 34,
            Self::BitstreamBitDepthTooHigh => 35,
            Self::BitstreamVersionTooOld => 36,
            Self::Unknown(code) => code,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Ok => "XVC_DEC_OK",
            Self::NoDecodedPic => "XVC_DEC_NO_DECODED_PIC",
            Self::NotConforming => "XVC_DEC_NOT_CONFORMING",
            Self::InvalidArgument => "XVC_DEC_INVALID_ARGUMENT",
            Self::InvalidParameter => "XVC_DEC_INVALID_PARAMETER",
            Self::FramerateOutOfRange => "XVC_DEC_FRAMERATE_OUT_OF_RANGE",
            Self::BitDepthOutOfRange => "XVC_DEC_BITDEPTH_OUT_OF_RANGE",
            Self::BitstreamVersionTooNew => "XVC_DEC_BITSTREAM_VERSION_HIGHER_THAN_DECODER",
            Self::NoSegmentHeaderDecoded => "XVC_DEC_NO_SEGMENT_HEADER_DECODED",
            Self::BitstreamBitDepthTooHigh => "XVC_DEC_BITSTREAM_BITDEPTH_TOO_HIGH",
            Self::BitstreamVersionTooOld => {
                "XVC_DEC_BITSTREAM_VERSION_LOWER_THAN_SUPPORTED_BY_DECODER"
            }
            Self::Unknown(_) => "XVC_DEC_UNKNOWN",
        }
    }
}

impl fmt::Display for DecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "XVC_DEC_UNKNOWN({code})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Engine status tagged with the side that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineStatus {
    Encoder(EncStatus),
    Decoder(DecStatus),
}

impl EngineStatus {
    /// Codes that only mean "no output right now".
    #[must_use]
    pub fn is_advisory(self) -> bool {
        matches!(
            self,
            Self::Encoder(EncStatus::NoMoreOutput) | Self::Decoder(DecStatus::NoDecodedPic)
        )
    }

    /// Codes after which the stream cannot be decoded by this engine.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::Decoder(
                DecStatus::BitstreamVersionTooNew
                    | DecStatus::BitstreamVersionTooOld
                    | DecStatus::BitstreamBitDepthTooHigh
            )
        )
    }

    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Encoder(s) => s.code(),
            Self::Decoder(s) => s.code(),
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoder(s) => s.fmt(f),
            Self::Decoder(s) => s.fmt(f),
        }
    }
}

impl From<EncStatus> for EngineStatus {
    fn from(status: EncStatus) -> Self {
        Self::Encoder(status)
    }
}

impl From<DecStatus> for EngineStatus {
    fn from(status: DecStatus) -> Self {
        Self::Decoder(status)
    }
}

/// Errors that can occur in an xvc session.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The engine rejected the parameter record.
    #[error("invalid parameters: {0}")]
    InvalidParameters(EngineStatus),

    /// The engine returned a non-advisory status code.
    #[error("engine error: {0}")]
    Engine(EngineStatus),

    /// A framed record is shorter than its prefix says.
    #[error("malformed framing: need {needed} bytes, {available} available")]
    MalformedFraming { needed: usize, available: usize },

    /// Bytes remain after a single framed record.
    #[error("{0} trailing bytes after framed record")]
    TrailingBytes(usize),

    /// The picture layout cannot be reconstructed.
    #[error("unsupported chroma format: {0}")]
    UnsupportedFormat(ChromaFormat),

    /// A plane extends past the end of its buffer.
    #[error("plane {plane} out of bounds: need {needed} bytes, {available} available")]
    PlaneOutOfBounds {
        plane: Plane,
        needed: usize,
        available: usize,
    },

    /// A plane stride is smaller than its row width.
    #[error("plane {plane} stride {stride} is smaller than width {width}")]
    InvalidStride {
        plane: Plane,
        stride: usize,
        width: usize,
    },

    /// A raw frame does not match its declared geometry.
    #[error("frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    /// The session (or unit) was already closed.
    #[error("session closed")]
    SessionClosed,

    /// The engine could not create a handle.
    #[error("engine creation failed: {0}")]
    EngineCreate(String),

    /// A payload does not fit the 32-bit length prefix.
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// I/O error on a framed stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Create an EngineCreate error with a message.
    pub fn engine_create(msg: impl Into<String>) -> Self {
        Self::EngineCreate(msg.into())
    }

    /// Engine status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<EngineStatus> {
        match self {
            Self::InvalidParameters(s) | Self::Engine(s) => Some(*s),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

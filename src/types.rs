//! Core types shared by the encoder and decoder sessions.

use std::fmt;

/// Chroma subsampling of a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChromaFormat {
    /// Luma only.
    Monochrome,
    /// 4:2:0 (chroma planes halved in both directions).
    #[default]
    Yuv420,
    /// 4:2:2 (chroma planes halved horizontally).
    Yuv422,
    /// 4:4:4 (no subsampling).
    Yuv444,
    /// Packed ARGB.
    Argb,
    /// Let the engine pick (decoder: keep the bitstream format).
    Unified,
}

impl ChromaFormat {
    /// Numeric value used by the engine.
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Monochrome => 0,
            Self::Yuv420 => 1,
            Self::Yuv422 => 2,
            Self::Yuv444 => 3,
            Self::Argb => 4,
            Self::Unified => 255,
        }
    }

    /// Inverse of [`ChromaFormat::to_raw`]. Unknown values map to `Unified`.
    #[must_use]
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => Self::Monochrome,
            1 => Self::Yuv420,
            2 => Self::Yuv422,
            3 => Self::Yuv444,
            4 => Self::Argb,
            _ => Self::Unified,
        }
    }

    /// Chroma plane dimensions for a luma plane of `width` x `height`.
    ///
    /// Returns `None` for formats without separate chroma planes.
    #[must_use]
    pub fn chroma_dimensions(self, width: usize, height: usize) -> Option<(usize, usize)> {
        match self {
            Self::Yuv420 => Some((width / 2, height / 2)),
            Self::Yuv422 => Some((width / 2, height)),
            Self::Yuv444 => Some((width, height)),
            Self::Monochrome | Self::Argb | Self::Unified => None,
        }
    }

    /// Returns true if the picture has chroma planes.
    #[must_use]
    pub fn has_chroma(self) -> bool {
        self.chroma_dimensions(1, 1).is_some()
    }
}

impl fmt::Display for ChromaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Monochrome => "monochrome",
            Self::Yuv420 => "4:2:0",
            Self::Yuv422 => "4:2:2",
            Self::Yuv444 => "4:4:4",
            Self::Argb => "argb",
            Self::Unified => "unified",
        };
        f.write_str(name)
    }
}

/// Colour matrix used to interpret YUV samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorMatrix {
    /// Engine default.
    #[default]
    Unified,
    /// BT.601.
    Bt601,
    /// BT.709.
    Bt709,
    /// BT.2020.
    Bt2020,
}

impl ColorMatrix {
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Unified => 0,
            Self::Bt601 => 1,
            Self::Bt709 => 2,
            Self::Bt2020 => 3,
        }
    }

    #[must_use]
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => Self::Bt601,
            2 => Self::Bt709,
            3 => Self::Bt2020,
            _ => Self::Unified,
        }
    }
}

/// Type of a compressed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    IntraPicture,
    IntraAccessPicture,
    PredictedPicture,
    PredictedAccessPicture,
    BipredictedPicture,
    BipredictedAccessPicture,
    /// Reserved picture types 6..=10.
    ReservedPicture(u8),
    SegmentHeader,
    Sei,
    AccessUnitDelimiter,
    EndOfSegment,
    /// Any value the engine may add later.
    Unknown(u32),
}

impl NalUnitType {
    #[must_use]
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::IntraPicture,
            1 => Self::IntraAccessPicture,
            2 => Self::PredictedPicture,
            3 => Self::PredictedAccessPicture,
            4 => Self::BipredictedPicture,
            5 => Self::BipredictedAccessPicture,
            6..=10 => Self::ReservedPicture(value as u8),
            16 => Self::SegmentHeader,
            17 => Self::Sei,
            18 => Self::AccessUnitDelimiter,
            19 => Self::EndOfSegment,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub fn to_raw(self) -> u32 {
        match self {
            Self::IntraPicture => 0,
            Self::IntraAccessPicture => 1,
            Self::PredictedPicture => 2,
            Self::PredictedAccessPicture => 3,
            Self::BipredictedPicture => 4,
            Self::BipredictedAccessPicture => 5,
            Self::ReservedPicture(v) => u32::from(v),
            Self::Unknown(v) => v,
            Self::SegmentHeader => 16,
            Self::Sei => 17,
            Self::AccessUnitDelimiter => 18,
            Self::EndOfSegment => 19,
        }
    }

    /// Returns true if the unit carries picture data.
    #[must_use]
    pub fn is_picture(self) -> bool {
        self.to_raw() <= 10
    }

    /// Returns true for intra-coded pictures (random access points).
    #[must_use]
    pub fn is_intra(self) -> bool {
        matches!(self, Self::IntraPicture | Self::IntraAccessPicture)
    }
}

/// Deblocking filter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeblockMode {
    Disabled,
    #[default]
    Enabled,
    /// Cheaper filter decisions.
    LowComplexity,
}

impl DeblockMode {
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
            Self::LowComplexity => 2,
        }
    }
}

/// Encoder speed/quality tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpeedMode {
    /// Slowest, best compression.
    Placebo,
    Slow,
    #[default]
    Fast,
}

impl SpeedMode {
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Placebo => 0,
            Self::Slow => 1,
            Self::Fast => 2,
        }
    }
}

/// Encoder tuning target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TuneMode {
    /// Optimize for perceived quality.
    #[default]
    VisualQuality,
    /// Optimize for PSNR.
    Psnr,
}

impl TuneMode {
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::VisualQuality => 0,
            Self::Psnr => 1,
        }
    }
}

/// Worker thread setting of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Threads {
    /// Let the engine decide.
    #[default]
    Auto,
    /// Run on the calling thread only.
    Disabled,
    /// Fixed number of worker threads.
    Fixed(u32),
}

impl Threads {
    /// Engine encoding: -1 auto, 0 disabled, N fixed.
    #[must_use]
    pub fn to_raw(self) -> i32 {
        match self {
            Self::Auto => -1,
            Self::Disabled => 0,
            Self::Fixed(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }

    #[must_use]
    pub fn from_raw(value: i32) -> Self {
        match value {
            v if v < 0 => Self::Auto,
            0 => Self::Disabled,
            n => Self::Fixed(n as u32),
        }
    }
}

/// Plane of a planar picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Y,
    U,
    V,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Y, Plane::U, Plane::V];

    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Y => 0,
            Self::U => 1,
            Self::V => 2,
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Y => "Y",
            Self::U => "U",
            Self::V => "V",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chroma_format_raw_values() {
        for format in [
            ChromaFormat::Monochrome,
            ChromaFormat::Yuv420,
            ChromaFormat::Yuv422,
            ChromaFormat::Yuv444,
            ChromaFormat::Argb,
            ChromaFormat::Unified,
        ] {
            assert_eq!(ChromaFormat::from_raw(format.to_raw()), format);
        }
        assert_eq!(ChromaFormat::Unified.to_raw(), 255);
        assert_eq!(ChromaFormat::from_raw(42), ChromaFormat::Unified);
    }

    #[test]
    fn test_chroma_dimensions() {
        assert_eq!(ChromaFormat::Yuv420.chroma_dimensions(4, 4), Some((2, 2)));
        assert_eq!(ChromaFormat::Yuv420.chroma_dimensions(5, 3), Some((2, 1)));
        assert_eq!(ChromaFormat::Yuv422.chroma_dimensions(4, 4), Some((2, 4)));
        assert_eq!(ChromaFormat::Yuv444.chroma_dimensions(4, 4), Some((4, 4)));
        assert_eq!(ChromaFormat::Monochrome.chroma_dimensions(4, 4), None);
    }

    #[test]
    fn test_nal_unit_types() {
        assert_eq!(NalUnitType::from_raw(0), NalUnitType::IntraPicture);
        assert_eq!(NalUnitType::from_raw(7), NalUnitType::ReservedPicture(7));
        assert_eq!(NalUnitType::from_raw(16), NalUnitType::SegmentHeader);
        assert_eq!(NalUnitType::from_raw(19), NalUnitType::EndOfSegment);
        assert_eq!(NalUnitType::from_raw(12), NalUnitType::Unknown(12));
        assert_eq!(NalUnitType::from_raw(300).to_raw(), 300);
        assert_eq!(NalUnitType::from_raw(u32::MAX), NalUnitType::Unknown(u32::MAX));
        assert!(!NalUnitType::Unknown(300).is_picture());
        assert!(NalUnitType::BipredictedPicture.is_picture());
        assert!(!NalUnitType::Sei.is_picture());
        assert_eq!(NalUnitType::AccessUnitDelimiter.to_raw(), 18);
    }

    #[test]
    fn test_threads_encoding() {
        assert_eq!(Threads::Auto.to_raw(), -1);
        assert_eq!(Threads::Disabled.to_raw(), 0);
        assert_eq!(Threads::Fixed(4).to_raw(), 4);
        assert_eq!(Threads::from_raw(-1), Threads::Auto);
        assert_eq!(Threads::from_raw(8), Threads::Fixed(8));
    }
}

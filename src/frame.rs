//! Owned raw frames for feeding the encoder.

use crate::picture::{PictureLayout, PlanarImage};
use crate::{ChromaFormat, CodecError};

/// A tightly packed planar frame (I420 or I444).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanarFrame {
    layout: PictureLayout,
    data: Vec<u8>,
}

impl PlanarFrame {
    /// Wraps packed planar bytes, checking the size.
    pub fn new(
        width: u32,
        height: u32,
        chroma_format: ChromaFormat,
        data: Vec<u8>,
    ) -> Result<Self, CodecError> {
        let layout = PictureLayout::packed(width as usize, height as usize, chroma_format)?;
        let expected = layout.total_size();
        if data.len() != expected {
            return Err(CodecError::FrameSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { layout, data })
    }

    /// Frame from I420 bytes (Y, then U, then V; W*H*3/2 for even sizes).
    pub fn from_i420(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        Self::new(width, height, ChromaFormat::Yuv420, data)
    }

    /// Frame from I444 bytes (three W*H planes).
    pub fn from_i444(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        Self::new(width, height, ChromaFormat::Yuv444, data)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.layout.width() as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.layout.height() as u32
    }

    #[must_use]
    pub fn chroma_format(&self) -> ChromaFormat {
        self.layout.chroma_format()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn strides(&self) -> [usize; 3] {
        self.layout.strides()
    }

    /// Plane slices in Y, U, V order.
    #[must_use]
    pub fn planes(&self) -> [&[u8]; 3] {
        let y = self.layout.plane_size(crate::Plane::Y);
        let c = self.layout.plane_size(crate::Plane::U);
        let (luma, chroma) = self.data.split_at(y);
        let (u, v) = chroma.split_at(c);
        [luma, u, v]
    }

    /// Borrowed planar view.
    pub fn image(&self) -> Result<PlanarImage<'_>, CodecError> {
        self.layout.view(&self.data)
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Bytes of one packed frame.
///
/// Returns `None` for formats that have no planar layout.
#[must_use]
pub fn expected_frame_size(width: u32, height: u32, chroma_format: ChromaFormat) -> Option<usize> {
    let (w, h) = (width as usize, height as usize);
    match chroma_format {
        ChromaFormat::Monochrome => Some(w * h),
        ChromaFormat::Argb => Some(w * h * 4),
        ChromaFormat::Unified => None,
        other => other.chroma_dimensions(w, h).map(|(cw, ch)| w * h + 2 * cw * ch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_frame_size() {
        assert_eq!(expected_frame_size(1920, 1080, ChromaFormat::Yuv420), Some(1920 * 1080 * 3 / 2));
        assert_eq!(expected_frame_size(4, 4, ChromaFormat::Yuv444), Some(48));
        assert_eq!(expected_frame_size(4, 4, ChromaFormat::Yuv422), Some(32));
        assert_eq!(expected_frame_size(4, 4, ChromaFormat::Monochrome), Some(16));
        assert_eq!(expected_frame_size(4, 4, ChromaFormat::Unified), None);
    }

    #[test]
    fn test_from_i420_splits_planes() {
        let data: Vec<u8> = (0..24).collect();
        let frame = PlanarFrame::from_i420(4, 4, data).unwrap();
        let [y, u, v] = frame.planes();
        assert_eq!(y.len(), 16);
        assert_eq!(u, &[16, 17, 18, 19]);
        assert_eq!(v, &[20, 21, 22, 23]);
        assert_eq!(frame.strides(), [4, 2, 2]);
    }

    #[test]
    fn test_size_mismatch() {
        let err = PlanarFrame::from_i420(4, 4, vec![0; 23]).unwrap_err();
        assert!(matches!(
            err,
            CodecError::FrameSize { expected: 24, actual: 23 }
        ));
    }
}

//! Planar picture views over raw decoded memory.
//!
//! Decoders hand back one contiguous buffer plus per-plane strides. The planes
//! are laid out back to back (Y, then U, then V), each `rows * stride` bytes
//! long. [`PictureLayout`] checks that description against the buffer once;
//! the resulting [`PlanarImage`] can then index samples without further
//! bounds surprises.

use crate::{ChromaFormat, CodecError, Plane};

/// Geometry of a planar picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureLayout {
    width: usize,
    height: usize,
    strides: [usize; 3],
    chroma_format: ChromaFormat,
    chroma_width: usize,
    chroma_height: usize,
}

impl PictureLayout {
    /// Validates a layout.
    ///
    /// Only 4:2:0 and 4:4:4 are supported. Every stride must cover the
    /// width of its plane.
    pub fn new(
        width: usize,
        height: usize,
        strides: [usize; 3],
        chroma_format: ChromaFormat,
    ) -> Result<Self, CodecError> {
        let (chroma_width, chroma_height) = match chroma_format {
            ChromaFormat::Yuv420 | ChromaFormat::Yuv444 => chroma_format
                .chroma_dimensions(width, height)
                .ok_or(CodecError::UnsupportedFormat(chroma_format))?,
            other => return Err(CodecError::UnsupportedFormat(other)),
        };

        let layout = Self {
            width,
            height,
            strides,
            chroma_format,
            chroma_width,
            chroma_height,
        };
        for plane in Plane::ALL {
            let (plane_width, _) = layout.plane_dimensions(plane);
            let stride = strides[plane.index()];
            if stride < plane_width {
                return Err(CodecError::InvalidStride {
                    plane,
                    stride,
                    width: plane_width,
                });
            }
        }
        Ok(layout)
    }

    /// Tightly packed layout (stride == plane width).
    pub fn packed(
        width: usize,
        height: usize,
        chroma_format: ChromaFormat,
    ) -> Result<Self, CodecError> {
        let chroma_width = chroma_format
            .chroma_dimensions(width, height)
            .map_or(0, |(w, _)| w);
        Self::new(width, height, [width, chroma_width, chroma_width], chroma_format)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn chroma_format(&self) -> ChromaFormat {
        self.chroma_format
    }

    #[must_use]
    pub fn strides(&self) -> [usize; 3] {
        self.strides
    }

    /// Visible (width, height) of a plane.
    #[must_use]
    pub fn plane_dimensions(&self, plane: Plane) -> (usize, usize) {
        match plane {
            Plane::Y => (self.width, self.height),
            Plane::U | Plane::V => (self.chroma_width, self.chroma_height),
        }
    }

    /// Bytes occupied by a plane, padding included. Saturates at
    /// `usize::MAX`.
    #[must_use]
    pub fn plane_size(&self, plane: Plane) -> usize {
        let (_, rows) = self.plane_dimensions(plane);
        rows.saturating_mul(self.strides[plane.index()])
    }

    /// Bytes needed to hold all three planes. Saturates at `usize::MAX`.
    #[must_use]
    pub fn total_size(&self) -> usize {
        Plane::ALL
            .iter()
            .fold(0usize, |total, p| total.saturating_add(self.plane_size(*p)))
    }

    /// Builds a view over `data`, bounds-checking every plane first.
    pub fn view<'a>(&self, data: &'a [u8]) -> Result<PlanarImage<'a>, CodecError> {
        let mut offset = 0usize;
        let mut planes: [&'a [u8]; 3] = [&[]; 3];
        for plane in Plane::ALL {
            let end = match offset.checked_add(self.plane_size(plane)) {
                Some(end) if end <= data.len() => end,
                end => {
                    return Err(CodecError::PlaneOutOfBounds {
                        plane,
                        needed: end.unwrap_or(usize::MAX),
                        available: data.len(),
                    })
                }
            };
            planes[plane.index()] = &data[offset..end];
            offset = end;
        }
        Ok(PlanarImage {
            layout: *self,
            planes,
        })
    }
}

/// Reconstructs a planar view from a raw buffer and its stride metadata.
pub fn reconstruct(
    data: &[u8],
    width: usize,
    height: usize,
    strides: [usize; 3],
    chroma_format: ChromaFormat,
) -> Result<PlanarImage<'_>, CodecError> {
    PictureLayout::new(width, height, strides, chroma_format)?.view(data)
}

/// Borrowed view of a Y/U/V picture.
#[derive(Debug, Clone, Copy)]
pub struct PlanarImage<'a> {
    layout: PictureLayout,
    planes: [&'a [u8]; 3],
}

impl<'a> PlanarImage<'a> {
    #[must_use]
    pub fn layout(&self) -> &PictureLayout {
        &self.layout
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.layout.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.layout.height
    }

    #[must_use]
    pub fn chroma_format(&self) -> ChromaFormat {
        self.layout.chroma_format
    }

    /// Raw bytes of a plane, padding included.
    #[must_use]
    pub fn plane(&self, plane: Plane) -> &'a [u8] {
        self.planes[plane.index()]
    }

    #[must_use]
    pub fn stride(&self, plane: Plane) -> usize {
        self.layout.strides[plane.index()]
    }

    /// Luma sample at (x, y).
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the picture.
    #[must_use]
    pub fn y_at(&self, x: usize, y: usize) -> u8 {
        self.sample(Plane::Y, x, y)
    }

    /// Cb sample covering luma position (x, y).
    #[must_use]
    pub fn cb_at(&self, x: usize, y: usize) -> u8 {
        let (cx, cy) = self.chroma_position(x, y);
        self.sample(Plane::U, cx, cy)
    }

    /// Cr sample covering luma position (x, y).
    #[must_use]
    pub fn cr_at(&self, x: usize, y: usize) -> u8 {
        let (cx, cy) = self.chroma_position(x, y);
        self.sample(Plane::V, cx, cy)
    }

    fn chroma_position(&self, x: usize, y: usize) -> (usize, usize) {
        match self.layout.chroma_format {
            ChromaFormat::Yuv420 => (
                (x / 2).min(self.layout.chroma_width.saturating_sub(1)),
                (y / 2).min(self.layout.chroma_height.saturating_sub(1)),
            ),
            _ => (x, y),
        }
    }

    fn sample(&self, plane: Plane, x: usize, y: usize) -> u8 {
        let (w, h) = self.layout.plane_dimensions(plane);
        assert!(x < w && y < h, "sample ({x}, {y}) outside {plane} plane {w}x{h}");
        self.planes[plane.index()][y * self.stride(plane) + x]
    }

    /// Visible rows of a plane, without stride padding.
    pub fn rows(&self, plane: Plane) -> impl Iterator<Item = &'a [u8]> + 'a {
        let (w, h) = self.layout.plane_dimensions(plane);
        let stride = self.stride(plane);
        let data = self.planes[plane.index()];
        (0..h).map(move |row| &data[row * stride..row * stride + w])
    }

    /// Copies the visible samples into a tightly packed buffer (I420 / I444).
    #[must_use]
    pub fn to_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Plane::ALL
                .iter()
                .map(|p| {
                    let (w, h) = self.layout.plane_dimensions(*p);
                    w * h
                })
                .sum(),
        );
        for plane in Plane::ALL {
            for row in self.rows(plane) {
                out.extend_from_slice(row);
            }
        }
        out
    }

    /// Converts to 8-bit RGB using the given colour matrix.
    ///
    /// `Unified` is treated as BT.601.
    #[cfg(feature = "image")]
    #[must_use]
    pub fn to_rgb_image(&self, matrix: crate::ColorMatrix) -> image::RgbImage {
        let (kr, kgu, kgv, kb) = yuv_coefficients(matrix);
        let width = u32::try_from(self.width()).unwrap_or(u32::MAX);
        let height = u32::try_from(self.height()).unwrap_or(u32::MAX);
        image::RgbImage::from_fn(width, height, |x, y| {
            let (x, y) = (x as usize, y as usize);
            let luma = f32::from(self.y_at(x, y));
            let u = f32::from(self.cb_at(x, y)) - 128.0;
            let v = f32::from(self.cr_at(x, y)) - 128.0;

            let r = (luma + kr * v).clamp(0.0, 255.0) as u8;
            let g = (luma - kgu * u - kgv * v).clamp(0.0, 255.0) as u8;
            let b = (luma + kb * u).clamp(0.0, 255.0) as u8;
            image::Rgb([r, g, b])
        })
    }
}

/// Full-range YUV -> RGB coefficients (Cr->R, Cb->G, Cr->G, Cb->B).
#[cfg(feature = "image")]
fn yuv_coefficients(matrix: crate::ColorMatrix) -> (f32, f32, f32, f32) {
    use crate::ColorMatrix;
    match matrix {
        ColorMatrix::Bt709 => (1.5748, 0.187324, 0.468124, 1.8556),
        ColorMatrix::Bt2020 => (1.4746, 0.164553, 0.571353, 1.8814),
        ColorMatrix::Bt601 | ColorMatrix::Unified => (1.402, 0.344136, 0.714136, 1.772),
    }
}

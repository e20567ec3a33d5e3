//! Pure-Rust engine that honours the xvc call contract without compressing.
//!
//! Every picture becomes one NAL unit made of a 16-byte header followed by the
//! tightly packed 8-bit samples:
//!
//! ```text
//! 0        1          2         3         4           5..8      8..12        12..16
//! +--------+----------+---------+---------+-----------+---------+------------+-------------+
//! | ver=1  | nal type | chroma  | matrix  | bit depth | reserved| width (BE) | height (BE) |
//! +--------+----------+---------+---------+-----------+---------+------------+-------------+
//! ```
//!
//! The encoder mimics the engine's buffering: the first picture is emitted as
//! an intra picture right away; with low delay every later picture follows
//! immediately as a predicted picture, otherwise pictures are held back in
//! sub-GOPs of four until the group is full or the encoder is flushed.
//! The decoder queues pictures as soon as they arrive and hands them out with
//! row strides padded to 16 bytes.

use std::collections::VecDeque;

use tracing::trace;

use super::{
    DecoderBackend, DecoderEngine, EncodeInput, EncoderBackend, EncoderEngine, EngineNal,
    EnginePicture,
};
use crate::params::{DecoderParams, EncoderParams};
use crate::{ChromaFormat, CodecError, ColorMatrix, DecStatus, EncStatus, NalUnitType};

/// Bitstream version written by this engine.
pub const RAW_VERSION: u8 = 1;

/// Size of the per-unit header.
pub const RAW_HEADER_LEN: usize = 16;

/// Largest accepted picture dimension.
pub const MAX_DIMENSION: u32 = 16384;

/// Pictures held back per group when low delay is off.
pub const SUB_GOP_LENGTH: usize = 4;

const STRIDE_ALIGN: usize = 16;

/// Header of a raw NAL unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNalHeader {
    pub version: u8,
    pub nal_type: NalUnitType,
    pub chroma_format: ChromaFormat,
    pub color_matrix: ColorMatrix,
    pub bit_depth: u8,
    pub width: u32,
    pub height: u32,
}

impl RawNalHeader {
    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.version);
        out.push(self.nal_type.to_raw() as u8);
        out.push(self.chroma_format.to_raw() as u8);
        out.push(self.color_matrix.to_raw() as u8);
        out.push(self.bit_depth);
        out.extend_from_slice(&[0, 0, 0]);
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
    }

    pub fn parse(nal: &[u8]) -> Result<Self, DecStatus> {
        if nal.len() < RAW_HEADER_LEN {
            return Err(DecStatus::NotConforming);
        }
        let version = nal[0];
        if version == 0 {
            return Err(DecStatus::BitstreamVersionTooOld);
        }
        if version > RAW_VERSION {
            return Err(DecStatus::BitstreamVersionTooNew);
        }
        Ok(Self {
            version,
            nal_type: NalUnitType::from_raw(u32::from(nal[1])),
            chroma_format: ChromaFormat::from_raw(i32::from(nal[2])),
            color_matrix: ColorMatrix::from_raw(i32::from(nal[3])),
            bit_depth: nal[4],
            width: u32::from_be_bytes([nal[8], nal[9], nal[10], nal[11]]),
            height: u32::from_be_bytes([nal[12], nal[13], nal[14], nal[15]]),
        })
    }
}

fn is_planar(format: ChromaFormat) -> bool {
    matches!(
        format,
        ChromaFormat::Monochrome | ChromaFormat::Yuv420 | ChromaFormat::Yuv422 | ChromaFormat::Yuv444
    )
}

/// (luma, chroma) plane dimensions; chroma is (0, 0) for monochrome.
fn plane_dimensions(format: ChromaFormat, width: usize, height: usize) -> [(usize, usize); 3] {
    let chroma = format.chroma_dimensions(width, height).unwrap_or((0, 0));
    [(width, height), chroma, chroma]
}

/// Bytes of a tightly packed picture, `None` on overflow.
fn packed_size(format: ChromaFormat, width: usize, height: usize) -> Option<usize> {
    plane_dimensions(format, width, height)
        .iter()
        .try_fold(0usize, |total, (w, h)| total.checked_add(w.checked_mul(*h)?))
}

/// Horizontal and vertical chroma subsampling factors.
fn subsampling(format: ChromaFormat) -> (usize, usize) {
    match format {
        ChromaFormat::Yuv420 => (2, 2),
        ChromaFormat::Yuv422 => (2, 1),
        _ => (1, 1),
    }
}

fn align(n: usize) -> usize {
    n.div_ceil(STRIDE_ALIGN) * STRIDE_ALIGN
}

// ============================================================================
// Encoder
// ============================================================================

/// Backend producing [`RawEncoder`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawEncoderBackend;

impl EncoderBackend for RawEncoderBackend {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn check(&self, params: &EncoderParams) -> Result<(), EncStatus> {
        check_encoder(params)
    }

    fn create(&self, params: &EncoderParams) -> Result<Box<dyn EncoderEngine>, CodecError> {
        check_encoder(params).map_err(|status| CodecError::InvalidParameters(status.into()))?;
        Ok(Box::new(RawEncoder::new(params)))
    }
}

/// Structural validation mirroring the engine's parameter check.
pub fn check_encoder(params: &EncoderParams) -> Result<(), EncStatus> {
    if params.width < 1 || params.height < 1 {
        return Err(EncStatus::SizeTooSmall);
    }
    if params.width > MAX_DIMENSION || params.height > MAX_DIMENSION {
        return Err(EncStatus::SizeTooLarge);
    }
    if !is_planar(params.chroma_format) {
        return Err(EncStatus::UnsupportedChromaFormat);
    }
    if !(8..=16).contains(&params.bit_depth) || !(8..=16).contains(&params.internal_bit_depth) {
        return Err(EncStatus::BitDepthOutOfRange);
    }
    // Samples are stored as bytes.
    if params.bit_depth > 8 || params.internal_bit_depth > 8 {
        return Err(EncStatus::CompiledBitDepthTooLow);
    }
    if !(params.framerate > 0.0 && params.framerate <= 300.0) {
        return Err(EncStatus::FramerateOutOfRange);
    }
    if !(0..=63).contains(&params.qp) {
        return Err(EncStatus::QpOutOfRange);
    }
    if !(0..=2).contains(&params.deblock.to_raw()) {
        return Err(EncStatus::DeblockingSettingsInvalid);
    }
    if params.threads.to_raw() < -1 || !(0..=3).contains(&params.restricted_mode) {
        return Err(EncStatus::InvalidParameter);
    }
    Ok(())
}

struct PendingPicture {
    samples: Vec<u8>,
    user_data: i64,
}

struct OutputNal {
    bytes: Vec<u8>,
    nal_type: NalUnitType,
    user_data: i64,
}

/// Uncompressed encoder handle.
pub struct RawEncoder {
    width: usize,
    height: usize,
    chroma_format: ChromaFormat,
    color_matrix: ColorMatrix,
    low_delay: bool,
    pictures: u64,
    pending: Vec<PendingPicture>,
    output: Vec<OutputNal>,
}

impl RawEncoder {
    fn new(params: &EncoderParams) -> Self {
        Self {
            width: params.width as usize,
            height: params.height as usize,
            chroma_format: params.chroma_format,
            color_matrix: params.color_matrix,
            low_delay: params.low_delay,
            pictures: 0,
            pending: Vec::with_capacity(SUB_GOP_LENGTH),
            output: Vec::new(),
        }
    }

    /// Copies the visible rows of every plane into one packed buffer.
    fn pack(&self, input: &EncodeInput<'_>) -> Result<Vec<u8>, EncStatus> {
        let dims = plane_dimensions(self.chroma_format, self.width, self.height);
        let mut samples = Vec::with_capacity(
            packed_size(self.chroma_format, self.width, self.height).unwrap_or(0),
        );
        for (index, (w, h)) in dims.iter().copied().enumerate() {
            if w == 0 || h == 0 {
                continue;
            }
            let (plane, stride) = (input.planes[index], input.strides[index]);
            let needed = (h - 1).checked_mul(stride).and_then(|n| n.checked_add(w));
            if stride < w || needed.map_or(true, |n| plane.len() < n) {
                return Err(EncStatus::InvalidArgument);
            }
            for row in 0..h {
                samples.extend_from_slice(&plane[row * stride..row * stride + w]);
            }
        }
        Ok(samples)
    }

    fn push_output(&mut self, nal_type: NalUnitType, samples: &[u8], user_data: i64) {
        let header = RawNalHeader {
            version: RAW_VERSION,
            nal_type,
            chroma_format: self.chroma_format,
            color_matrix: self.color_matrix,
            bit_depth: 8,
            width: self.width as u32,
            height: self.height as u32,
        };
        let mut bytes = Vec::with_capacity(RAW_HEADER_LEN + samples.len());
        header.write(&mut bytes);
        bytes.extend_from_slice(samples);
        self.output.push(OutputNal {
            bytes,
            nal_type,
            user_data,
        });
    }

    /// Emits the held-back group: the last picture is the predicted anchor,
    /// the others are bipredicted.
    fn emit_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let last = pending.len().saturating_sub(1);
        for (i, picture) in pending.into_iter().enumerate() {
            let nal_type = if i == last {
                NalUnitType::PredictedPicture
            } else {
                NalUnitType::BipredictedPicture
            };
            self.push_output(nal_type, &picture.samples, picture.user_data);
        }
    }

    fn output_nals(&self) -> Vec<EngineNal<'_>> {
        self.output
            .iter()
            .map(|nal| EngineNal {
                bytes: &nal.bytes,
                nal_type: nal.nal_type,
                user_data: nal.user_data,
            })
            .collect()
    }
}

impl EncoderEngine for RawEncoder {
    fn encode(&mut self, input: EncodeInput<'_>) -> Result<Vec<EngineNal<'_>>, EncStatus> {
        let samples = self.pack(&input)?;
        self.output.clear();

        if self.pictures == 0 {
            self.push_output(NalUnitType::IntraPicture, &samples, input.user_data);
        } else if self.low_delay {
            self.push_output(NalUnitType::PredictedPicture, &samples, input.user_data);
        } else {
            self.pending.push(PendingPicture {
                samples,
                user_data: input.user_data,
            });
            if self.pending.len() >= SUB_GOP_LENGTH {
                self.emit_pending();
            }
        }
        self.pictures += 1;

        trace!(
            picture = self.pictures,
            emitted = self.output.len(),
            pending = self.pending.len(),
            "raw encode"
        );
        Ok(self.output_nals())
    }

    fn flush(&mut self) -> Result<Vec<EngineNal<'_>>, EncStatus> {
        self.output.clear();
        if self.pending.is_empty() {
            return Err(EncStatus::NoMoreOutput);
        }
        self.emit_pending();
        Ok(self.output_nals())
    }

    fn destroy(&mut self) -> Result<(), EncStatus> {
        self.pending.clear();
        self.output.clear();
        Ok(())
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Backend producing [`RawDecoder`] handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoderBackend;

impl DecoderBackend for RawDecoderBackend {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn check(&self, params: &DecoderParams) -> Result<(), DecStatus> {
        check_decoder(params)
    }

    fn create(&self, params: &DecoderParams) -> Result<Box<dyn DecoderEngine>, CodecError> {
        check_decoder(params).map_err(|status| CodecError::InvalidParameters(status.into()))?;
        Ok(Box::new(RawDecoder::new(params)))
    }
}

pub fn check_decoder(params: &DecoderParams) -> Result<(), DecStatus> {
    if params.output_width > MAX_DIMENSION || params.output_height > MAX_DIMENSION {
        return Err(DecStatus::InvalidParameter);
    }
    if !(is_planar(params.chroma_format) || params.chroma_format == ChromaFormat::Unified) {
        return Err(DecStatus::InvalidParameter);
    }
    if !(params.max_framerate >= 0.0 && params.max_framerate <= 300.0) {
        return Err(DecStatus::FramerateOutOfRange);
    }
    // Only 8-bit output is produced.
    if params.bit_depth != 8 {
        return Err(DecStatus::BitDepthOutOfRange);
    }
    if params.threads.to_raw() < -1 {
        return Err(DecStatus::InvalidParameter);
    }
    Ok(())
}

struct RawPicture {
    bytes: Vec<u8>,
    strides: [usize; 3],
    width: usize,
    height: usize,
    chroma_format: ChromaFormat,
    color_matrix: ColorMatrix,
    nal_type: NalUnitType,
    user_data: i64,
}

/// Uncompressed decoder handle.
pub struct RawDecoder {
    output_width: usize,
    output_height: usize,
    chroma_format: ChromaFormat,
    color_matrix: ColorMatrix,
    queue: VecDeque<RawPicture>,
    current: Option<RawPicture>,
}

impl RawDecoder {
    fn new(params: &DecoderParams) -> Self {
        Self {
            output_width: params.output_width as usize,
            output_height: params.output_height as usize,
            chroma_format: params.chroma_format,
            color_matrix: params.color_matrix,
            queue: VecDeque::new(),
            current: None,
        }
    }

    fn reconstruct(&self, header: &RawNalHeader, samples: &[u8], user_data: i64) -> RawPicture {
        let (src_w, src_h) = (header.width as usize, header.height as usize);
        let src_format = header.chroma_format;
        let width = match self.output_width {
            0 => src_w,
            w => w.min(src_w),
        };
        let height = match self.output_height {
            0 => src_h,
            h => h.min(src_h),
        };
        let chroma_format = match self.chroma_format {
            ChromaFormat::Unified => src_format,
            other => other,
        };
        let color_matrix = match self.color_matrix {
            ColorMatrix::Unified => header.color_matrix,
            other => other,
        };

        let dims = plane_dimensions(chroma_format, width, height);
        let strides = [align(dims[0].0), align(dims[1].0), align(dims[2].0)];
        let total: usize = dims.iter().zip(strides).map(|((_, h), s)| h * s).sum();
        let mut bytes = vec![0u8; total];

        // Luma: crop only
        for row in 0..height {
            let src = &samples[row * src_w..row * src_w + width];
            bytes[row * strides[0]..row * strides[0] + width].copy_from_slice(src);
        }

        // Chroma: nearest-neighbour resample from the source subsampling
        let src_dims = plane_dimensions(src_format, src_w, src_h);
        let (src_cw, src_ch) = src_dims[1];
        let (ssx, ssy) = subsampling(src_format);
        let (dsx, dsy) = subsampling(chroma_format);
        let luma_size = src_w * src_h;
        let src_planes = [
            &samples[luma_size..luma_size + src_cw * src_ch],
            &samples[luma_size + src_cw * src_ch..],
        ];
        let mut offset = height * strides[0];
        for (plane, src_plane) in src_planes.iter().enumerate() {
            let (cw, ch) = dims[plane + 1];
            let stride = strides[plane + 1];
            for cy in 0..ch {
                for cx in 0..cw {
                    let value = if src_cw == 0 || src_ch == 0 {
                        128
                    } else {
                        let sx = ((cx * dsx) / ssx).min(src_cw - 1);
                        let sy = ((cy * dsy) / ssy).min(src_ch - 1);
                        src_plane[sy * src_cw + sx]
                    };
                    bytes[offset + cy * stride + cx] = value;
                }
            }
            offset += ch * stride;
        }

        RawPicture {
            bytes,
            strides,
            width,
            height,
            chroma_format,
            color_matrix,
            nal_type: header.nal_type,
            user_data,
        }
    }
}

impl DecoderEngine for RawDecoder {
    fn decode_nal(&mut self, nal: &[u8], user_data: i64) -> Result<(), DecStatus> {
        let header = RawNalHeader::parse(nal)?;
        if !header.nal_type.is_picture() {
            trace!(nal_type = ?header.nal_type, "raw decoder skipping non-picture unit");
            return Ok(());
        }
        if !is_planar(header.chroma_format) || header.width == 0 || header.height == 0 {
            return Err(DecStatus::NotConforming);
        }
        if header.width > MAX_DIMENSION || header.height > MAX_DIMENSION {
            return Err(DecStatus::NotConforming);
        }
        if header.bit_depth > 8 {
            return Err(DecStatus::BitstreamBitDepthTooHigh);
        }
        let samples = &nal[RAW_HEADER_LEN..];
        let expected = packed_size(
            header.chroma_format,
            header.width as usize,
            header.height as usize,
        )
        .ok_or(DecStatus::NotConforming)?;
        if samples.len() != expected {
            return Err(DecStatus::NotConforming);
        }

        let picture = self.reconstruct(&header, samples, user_data);
        self.queue.push_back(picture);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DecStatus> {
        Ok(())
    }

    fn get_picture(&mut self) -> Result<Option<EnginePicture<'_>>, DecStatus> {
        self.current = self.queue.pop_front();
        Ok(self.current.as_ref().map(|p| EnginePicture {
            bytes: &p.bytes,
            strides: p.strides,
            width: p.width,
            height: p.height,
            chroma_format: p.chroma_format,
            color_matrix: p.color_matrix,
            bit_depth: 8,
            nal_type: p.nal_type,
            user_data: p.user_data,
        }))
    }

    fn destroy(&mut self) -> Result<(), DecStatus> {
        self.queue.clear();
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder(params: EncoderParams) -> Box<dyn EncoderEngine> {
        RawEncoderBackend.create(&params).unwrap()
    }

    fn decoder(params: DecoderParams) -> Box<dyn DecoderEngine> {
        RawDecoderBackend.create(&params).unwrap()
    }

    fn grey_4x4() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        ((0..16).collect(), vec![100, 101, 102, 103], vec![200, 201, 202, 203])
    }

    fn input<'a>(planes: &'a (Vec<u8>, Vec<u8>, Vec<u8>), user_data: i64) -> EncodeInput<'a> {
        EncodeInput {
            planes: [&planes.0, &planes.1, &planes.2],
            strides: [4, 2, 2],
            user_data,
        }
    }

    fn nal_types(nals: &[EngineNal<'_>]) -> Vec<NalUnitType> {
        nals.iter().map(|n| n.nal_type).collect()
    }

    #[test]
    fn test_low_delay_emits_every_picture() {
        let planes = grey_4x4();
        let mut enc = encoder(EncoderParams::new(4, 4, 30.0));
        let first = enc.encode(input(&planes, 1)).unwrap();
        assert_eq!(nal_types(&first), vec![NalUnitType::IntraPicture]);
        assert_eq!(first[0].bytes.len(), RAW_HEADER_LEN + 24);
        assert_eq!(first[0].user_data, 1);

        let second = enc.encode(input(&planes, 2)).unwrap();
        assert_eq!(nal_types(&second), vec![NalUnitType::PredictedPicture]);
        assert!(matches!(enc.flush(), Err(EncStatus::NoMoreOutput)));
    }

    #[test]
    fn test_sub_gop_buffering() {
        let planes = grey_4x4();
        let mut enc = encoder(EncoderParams::new(4, 4, 30.0).low_delay(false));
        assert_eq!(enc.encode(input(&planes, 0)).unwrap().len(), 1);
        for tag in 1..4 {
            assert!(enc.encode(input(&planes, tag)).unwrap().is_empty());
        }
        let group = enc.encode(input(&planes, 4)).unwrap();
        assert_eq!(
            nal_types(&group),
            vec![
                NalUnitType::BipredictedPicture,
                NalUnitType::BipredictedPicture,
                NalUnitType::BipredictedPicture,
                NalUnitType::PredictedPicture,
            ]
        );
        let tags: Vec<i64> = group.iter().map(|n| n.user_data).collect();
        assert_eq!(tags, vec![1, 2, 3, 4]);

        assert!(enc.encode(input(&planes, 5)).unwrap().is_empty());
        let flushed = enc.flush().unwrap();
        assert_eq!(nal_types(&flushed), vec![NalUnitType::PredictedPicture]);
        assert!(matches!(enc.flush(), Err(EncStatus::NoMoreOutput)));
    }

    #[test]
    fn test_short_plane_is_rejected() {
        let planes = (vec![0u8; 15], vec![0u8; 4], vec![0u8; 4]);
        let mut enc = encoder(EncoderParams::new(4, 4, 30.0));
        assert!(matches!(
            enc.encode(input(&planes, 0)),
            Err(EncStatus::InvalidArgument)
        ));
    }

    #[test]
    fn test_decoder_pads_strides() {
        let planes = grey_4x4();
        let mut enc = encoder(EncoderParams::new(4, 4, 30.0).color_matrix(ColorMatrix::Bt709));
        let nal = enc.encode(input(&planes, 9)).unwrap()[0].bytes.to_vec();

        let mut dec = decoder(DecoderParams::new());
        dec.decode_nal(&nal, 9).unwrap();
        let pic = dec.get_picture().unwrap().unwrap();
        assert_eq!((pic.width, pic.height), (4, 4));
        assert_eq!(pic.strides, [16, 16, 16]);
        assert_eq!(pic.bytes.len(), 16 * 4 + 16 * 2 * 2);
        assert_eq!(&pic.bytes[16..20], &[4, 5, 6, 7]);
        assert_eq!(&pic.bytes[64..66], &[100, 101]);
        assert_eq!(&pic.bytes[96..98], &[200, 201]);
        assert_eq!(pic.color_matrix, ColorMatrix::Bt709);
        assert_eq!(pic.user_data, 9);
        assert!(dec.get_picture().unwrap().is_none());
    }

    #[test]
    fn test_decoder_crop_and_resample() {
        let planes = grey_4x4();
        let mut enc = encoder(EncoderParams::new(4, 4, 30.0));
        let nal = enc.encode(input(&planes, 0)).unwrap()[0].bytes.to_vec();

        let mut dec = decoder(
            DecoderParams::new()
                .output_size(2, 2)
                .chroma_format(ChromaFormat::Yuv444),
        );
        dec.decode_nal(&nal, 0).unwrap();
        let pic = dec.get_picture().unwrap().unwrap();
        assert_eq!((pic.width, pic.height), (2, 2));
        assert_eq!(pic.chroma_format, ChromaFormat::Yuv444);
        assert_eq!(&pic.bytes[0..2], &[0, 1]);
        assert_eq!(&pic.bytes[16..18], &[4, 5]);
        // every 4:4:4 sample of the top-left 2x2 block maps to the first 4:2:0 sample
        assert_eq!(&pic.bytes[32..34], &[100, 100]);
        assert_eq!(&pic.bytes[48..50], &[100, 100]);
    }

    #[test]
    fn test_monochrome_source_fills_neutral_chroma() {
        let luma = vec![50u8; 16];
        let mut enc = encoder(EncoderParams::new(4, 4, 30.0).chroma_format(ChromaFormat::Monochrome));
        let nal = enc
            .encode(EncodeInput {
                planes: [&luma, &[], &[]],
                strides: [4, 0, 0],
                user_data: 0,
            })
            .unwrap()[0]
            .bytes
            .to_vec();
        assert_eq!(nal.len(), RAW_HEADER_LEN + 16);

        let mut dec = decoder(DecoderParams::new());
        dec.decode_nal(&nal, 0).unwrap();
        let pic = dec.get_picture().unwrap().unwrap();
        assert_eq!(pic.chroma_format, ChromaFormat::Yuv420);
        assert!(pic.bytes[64..].iter().all(|&b| b == 128));
    }

    #[test]
    fn test_decoder_status_codes() {
        let mut dec = decoder(DecoderParams::new());
        assert_eq!(dec.decode_nal(&[1, 2, 3], 0), Err(DecStatus::NotConforming));

        let mut header = Vec::new();
        RawNalHeader {
            version: RAW_VERSION,
            nal_type: NalUnitType::IntraPicture,
            chroma_format: ChromaFormat::Yuv420,
            color_matrix: ColorMatrix::Unified,
            bit_depth: 8,
            width: 4,
            height: 4,
        }
        .write(&mut header);
        assert_eq!(dec.decode_nal(&header, 0), Err(DecStatus::NotConforming));

        let mut newer = header.clone();
        newer[0] = RAW_VERSION + 1;
        assert_eq!(dec.decode_nal(&newer, 0), Err(DecStatus::BitstreamVersionTooNew));

        let mut older = header.clone();
        older[0] = 0;
        assert_eq!(dec.decode_nal(&older, 0), Err(DecStatus::BitstreamVersionTooOld));

        let mut deep = header.clone();
        deep[4] = 10;
        deep.extend_from_slice(&[0u8; 24]);
        assert_eq!(dec.decode_nal(&deep, 0), Err(DecStatus::BitstreamBitDepthTooHigh));

        let mut sei = header;
        sei[1] = NalUnitType::Sei.to_raw() as u8;
        assert_eq!(dec.decode_nal(&sei, 0), Ok(()));
        assert!(dec.get_picture().unwrap().is_none());
    }

    #[test]
    fn test_oversized_header_dimensions() {
        let mut dec = decoder(DecoderParams::new());
        let mut nal = vec![RAW_VERSION, 0, 1, 0, 8, 0, 0, 0];
        nal.extend_from_slice(&[0xff; 8]);
        nal.extend_from_slice(&[0; 8]);
        assert_eq!(dec.decode_nal(&nal, 0), Err(DecStatus::NotConforming));

        let mut wide = nal.clone();
        wide[12..16].copy_from_slice(&4u32.to_be_bytes());
        wide[8..12].copy_from_slice(&(MAX_DIMENSION + 1).to_be_bytes());
        assert_eq!(dec.decode_nal(&wide, 0), Err(DecStatus::NotConforming));
        assert!(dec.get_picture().unwrap().is_none());
    }

    #[test]
    fn test_packed_size_overflow() {
        assert_eq!(packed_size(ChromaFormat::Yuv420, 4, 4), Some(24));
        assert_eq!(packed_size(ChromaFormat::Yuv444, usize::MAX, 2), None);
    }
}

//! Decoder session and decoded pictures.

use tracing::{debug, trace, warn};

use crate::engine::{DecoderEngine, EnginePicture};
use crate::framing::{records, unframe};
use crate::lifecycle::{CloseFlag, Resource, SessionState};
use crate::params::{DecoderParams, Validated};
use crate::picture::{PictureLayout, PlanarImage};
use crate::pool::{BufferPool, PooledBuffer};
use crate::{ChromaFormat, CodecError, ColorMatrix, DecStatus, EngineStatus, NalUnitType};

/// Owns one decoder handle.
///
/// Feed framed records with [`decode`](Self::decode), then poll
/// [`decoded_picture`](Self::decoded_picture) until it returns `None`.
pub struct Decoder {
    engine: Option<Box<dyn DecoderEngine>>,
    pool: BufferPool,
    params: DecoderParams,
    state: SessionState,
    closed: CloseFlag,
    units: u64,
    pictures: u64,
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("state", &self.state)
            .field("units", &self.units)
            .field("pictures", &self.pictures)
            .finish()
    }
}

impl Decoder {
    pub fn new(params: Validated<DecoderParams>) -> Result<Self, CodecError> {
        let engine = params.backend().create(params.params())?;
        let params = params.into_inner();
        let pool = params.session_pool();
        debug!(
            output_width = params.output_width,
            output_height = params.output_height,
            chroma = %params.chroma_format,
            "decoder session created"
        );
        Ok(Self {
            engine: Some(engine),
            pool,
            params,
            state: SessionState::Created,
            closed: CloseFlag::new(),
            units: 0,
            pictures: 0,
        })
    }

    /// Validates `params` with the default backend and opens a session.
    pub fn with_params(params: DecoderParams) -> Result<Self, CodecError> {
        Self::new(params.build()?)
    }

    #[must_use]
    pub fn params(&self) -> &DecoderParams {
        &self.params
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Submits exactly one framed record.
    ///
    /// # Errors
    ///
    /// `MalformedFraming` for a truncated record, `TrailingBytes` if anything
    /// follows it, `Engine` for engine failures.
    pub fn decode(&mut self, record: &[u8]) -> Result<(), CodecError> {
        self.decode_tagged(record, 0)
    }

    /// Like [`decode`](Self::decode), attaching `user_data` to the picture.
    pub fn decode_tagged(&mut self, record: &[u8], user_data: i64) -> Result<(), CodecError> {
        let (payload, rest) = unframe(record)?;
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()));
        }
        self.decode_unit(payload, user_data)
    }

    /// Submits an already unframed NAL unit.
    pub fn decode_unit(&mut self, payload: &[u8], user_data: i64) -> Result<(), CodecError> {
        let engine = self.engine.as_mut().ok_or(CodecError::SessionClosed)?;
        self.state = SessionState::Active;
        match engine.decode_nal(payload, user_data) {
            Ok(()) => {}
            Err(status) if EngineStatus::Decoder(status).is_advisory() => {}
            Err(status) => {
                let status = EngineStatus::Decoder(status);
                if status.is_fatal() {
                    warn!(%status, "fatal decoder status");
                }
                return Err(CodecError::Engine(status));
            }
        }
        self.units += 1;
        trace!(unit = self.units, len = payload.len(), "submitted unit");
        Ok(())
    }

    /// Submits every record of a concatenated stream.
    ///
    /// Returns the number of records submitted.
    pub fn decode_all(&mut self, stream: &[u8]) -> Result<usize, CodecError> {
        let mut count = 0;
        for payload in records(stream) {
            self.decode_unit(payload?, 0)?;
            count += 1;
        }
        Ok(count)
    }

    /// Signals end of stream. Activates the session like any other call.
    ///
    /// Returns false if the engine reported a failure.
    pub fn flush(&mut self) -> Result<bool, CodecError> {
        let engine = self.engine.as_mut().ok_or(CodecError::SessionClosed)?;
        self.state = SessionState::Active;
        match engine.flush() {
            Ok(()) => Ok(true),
            Err(status) => {
                warn!(%status, "decoder flush failed");
                Ok(false)
            }
        }
    }

    /// Next decoded picture, copied into a pooled buffer.
    ///
    /// `None` means the decoder needs more input.
    pub fn decoded_picture(&mut self) -> Result<Option<DecodedPicture>, CodecError> {
        let engine = self.engine.as_mut().ok_or(CodecError::SessionClosed)?;
        let Some(picture) = next_picture(&mut **engine)? else {
            return Ok(None);
        };
        let layout = layout_of(&picture)?;

        let mut buf = self.pool.acquire();
        buf.extend_from_slice(picture.bytes);
        // validate once so image() cannot fail later
        layout.view(&buf)?;

        let decoded = DecodedPicture {
            buf: Some(buf),
            pool: self.pool.clone(),
            layout,
            color_matrix: picture.color_matrix,
            bit_depth: picture.bit_depth,
            nal_type: picture.nal_type,
            user_data: picture.user_data,
            closed: CloseFlag::new(),
        };
        self.pictures += 1;
        trace!(picture = self.pictures, "decoded picture copied out");
        Ok(Some(decoded))
    }

    /// Next decoded picture, viewed in place.
    ///
    /// The view borrows the decoder, so no other call can reach the engine
    /// while it is alive.
    pub fn decoded_picture_ref(&mut self) -> Result<Option<PictureRef<'_>>, CodecError> {
        let engine = self.engine.as_mut().ok_or(CodecError::SessionClosed)?;
        let Some(picture) = next_picture(&mut **engine)? else {
            return Ok(None);
        };
        let layout = layout_of(&picture)?;
        let image = layout.view(picture.bytes)?;
        self.pictures += 1;
        Ok(Some(PictureRef {
            image,
            color_matrix: picture.color_matrix,
            bit_depth: picture.bit_depth,
            nal_type: picture.nal_type,
            user_data: picture.user_data,
        }))
    }

    fn release(&mut self) -> Result<(), CodecError> {
        if !self.closed.begin_close() {
            return Ok(());
        }
        self.state = SessionState::Closed;
        let Some(mut engine) = self.engine.take() else {
            return Ok(());
        };
        debug!(
            units = self.units,
            pictures = self.pictures,
            "decoder session closed"
        );
        engine
            .destroy()
            .map_err(|status| CodecError::Engine(EngineStatus::Decoder(status)))
    }
}

fn next_picture(engine: &mut dyn DecoderEngine) -> Result<Option<EnginePicture<'_>>, CodecError> {
    match engine.get_picture() {
        Ok(picture) => Ok(picture),
        Err(DecStatus::NoDecodedPic) => Ok(None),
        Err(status) => Err(CodecError::Engine(EngineStatus::Decoder(status))),
    }
}

fn layout_of(picture: &EnginePicture<'_>) -> Result<PictureLayout, CodecError> {
    PictureLayout::new(
        picture.width,
        picture.height,
        picture.strides,
        picture.chroma_format,
    )
}

impl Resource for Decoder {
    fn close(&mut self) -> Result<(), CodecError> {
        self.release()
    }

    fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        if !self.closed.is_closed() {
            debug!("decoder dropped without close");
        }
        self.release().ok();
    }
}

/// A decoded picture copied out of engine memory.
///
/// Owns a pooled buffer that is handed back on close or drop.
#[derive(Debug)]
pub struct DecodedPicture {
    buf: Option<PooledBuffer>,
    pool: BufferPool,
    layout: PictureLayout,
    color_matrix: ColorMatrix,
    bit_depth: u32,
    nal_type: NalUnitType,
    user_data: i64,
    closed: CloseFlag,
}

impl DecodedPicture {
    #[must_use]
    pub fn width(&self) -> usize {
        self.layout.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.layout.height()
    }

    #[must_use]
    pub fn chroma_format(&self) -> ChromaFormat {
        self.layout.chroma_format()
    }

    #[must_use]
    pub fn color_matrix(&self) -> ColorMatrix {
        self.color_matrix
    }

    #[must_use]
    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    #[must_use]
    pub fn nal_type(&self) -> NalUnitType {
        self.nal_type
    }

    #[must_use]
    pub fn user_data(&self) -> i64 {
        self.user_data
    }

    /// Raw picture memory with the engine's strides.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.buf.as_deref().map(|buf| &buf[..]).unwrap_or(&[])
    }

    /// Planar view, `None` once the picture is closed.
    #[must_use]
    pub fn image(&self) -> Option<PlanarImage<'_>> {
        let buf = self.buf.as_ref()?;
        self.layout.view(buf).ok()
    }

    fn release(&mut self) {
        if self.closed.begin_close() {
            if let Some(buf) = self.buf.take() {
                self.pool.release(buf);
            }
        }
    }
}

impl Resource for DecodedPicture {
    fn close(&mut self) -> Result<(), CodecError> {
        self.release();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }
}

impl Drop for DecodedPicture {
    fn drop(&mut self) {
        self.release();
    }
}

/// Zero-copy view of a decoded picture, valid while the decoder is borrowed.
#[derive(Debug, Clone, Copy)]
pub struct PictureRef<'a> {
    image: PlanarImage<'a>,
    color_matrix: ColorMatrix,
    bit_depth: u32,
    nal_type: NalUnitType,
    user_data: i64,
}

impl<'a> PictureRef<'a> {
    #[must_use]
    pub fn image(&self) -> PlanarImage<'a> {
        self.image
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.image.height()
    }

    #[must_use]
    pub fn chroma_format(&self) -> ChromaFormat {
        self.image.chroma_format()
    }

    #[must_use]
    pub fn color_matrix(&self) -> ColorMatrix {
        self.color_matrix
    }

    #[must_use]
    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    #[must_use]
    pub fn nal_type(&self) -> NalUnitType {
        self.nal_type
    }

    #[must_use]
    pub fn user_data(&self) -> i64 {
        self.user_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::raw::{RawDecoderBackend, RawEncoderBackend};
    use crate::engine::DecoderBackend;
    use crate::framing::frame;
    use crate::params::EncoderParams;
    use crate::{Encoder, Plane};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn raw_decoder(params: DecoderParams) -> Decoder {
        Decoder::new(params.build_with(Arc::new(RawDecoderBackend)).unwrap()).unwrap()
    }

    /// Framed records for `count` 4x4 pictures with luma value = index.
    fn stream(count: u8) -> Vec<Vec<u8>> {
        let params = EncoderParams::new(4, 4, 30.0)
            .build_with(Arc::new(RawEncoderBackend))
            .unwrap();
        let mut enc = Encoder::new(params).unwrap();
        let mut out = Vec::new();
        for i in 0..count {
            let y = vec![i; 16];
            let c = vec![128u8; 4];
            for unit in enc.encode([&y, &c, &c], [4, 2, 2], i64::from(i)).unwrap() {
                out.push(unit.bytes().to_vec());
            }
        }
        out
    }

    #[test]
    fn test_decode_and_copy_out() {
        let records = stream(1);
        let mut dec = raw_decoder(DecoderParams::new());
        dec.decode_tagged(&records[0], 5).unwrap();
        assert!(dec.flush().unwrap());

        let mut picture = dec.decoded_picture().unwrap().unwrap();
        assert_eq!((picture.width(), picture.height()), (4, 4));
        assert_eq!(picture.chroma_format(), ChromaFormat::Yuv420);
        assert_eq!(picture.user_data(), 5);
        assert_eq!(picture.nal_type(), NalUnitType::IntraPicture);
        let image = picture.image().unwrap();
        assert_eq!(image.stride(Plane::Y), 16);
        assert_eq!(image.to_packed().len(), 24);

        picture.close().unwrap();
        assert!(picture.image().is_none());
        assert!(picture.bytes().is_empty());
        assert!(dec.decoded_picture().unwrap().is_none());
    }

    #[test]
    fn test_picture_close_twice_releases_once() {
        let pool = BufferPool::default();
        let records = stream(1);
        let mut dec = raw_decoder(DecoderParams::new().buffer_pool(pool.clone()));
        dec.decode(&records[0]).unwrap();

        let mut picture = dec.decoded_picture().unwrap().unwrap();
        assert!(pool.same_pool(dec.pool()));
        picture.close().unwrap();
        assert!(picture.is_closed());
        picture.close().unwrap();
        drop(picture);
        assert_eq!(pool.stats().releases, 1);
    }

    #[test]
    fn test_flush_activates_session() {
        let mut dec = raw_decoder(DecoderParams::new());
        assert_eq!(dec.state(), SessionState::Created);
        assert!(dec.flush().unwrap());
        assert_eq!(dec.state(), SessionState::Active);
        assert!(dec.decoded_picture().unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let records = stream(1);
        let mut joined = records[0].clone();
        joined.extend_from_slice(&[0, 0]);
        let mut dec = raw_decoder(DecoderParams::new());
        assert!(matches!(
            dec.decode(&joined),
            Err(CodecError::TrailingBytes(2))
        ));
        assert!(matches!(
            dec.decode(&records[0][..3]),
            Err(CodecError::MalformedFraming { .. })
        ));
    }

    #[test]
    fn test_decode_all_keeps_order() {
        let joined: Vec<u8> = stream(3).concat();
        let mut dec = raw_decoder(DecoderParams::new());
        assert_eq!(dec.decode_all(&joined).unwrap(), 3);
        dec.flush().unwrap();
        let mut lumas = Vec::new();
        while let Some(picture) = dec.decoded_picture_ref().unwrap() {
            lumas.push(picture.image().y_at(0, 0));
        }
        assert_eq!(lumas, vec![0, 1, 2]);
    }

    #[test]
    fn test_engine_errors_surface() {
        let pool = BufferPool::default();
        let mut garbage = vec![9u8; 20];
        garbage[0] = 1;
        let record = frame(&garbage, &pool).unwrap();
        let mut dec = raw_decoder(DecoderParams::new());
        let err = dec.decode(record.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Engine(EngineStatus::Decoder(DecStatus::NotConforming))
        ));
    }

    #[test]
    fn test_unsupported_output_format() {
        let records = stream(1);
        let mut dec = raw_decoder(DecoderParams::new().chroma_format(ChromaFormat::Yuv422));
        dec.decode(&records[0]).unwrap();
        assert!(matches!(
            dec.decoded_picture(),
            Err(CodecError::UnsupportedFormat(ChromaFormat::Yuv422))
        ));
    }

    #[derive(Debug, Default)]
    struct CountingBackend {
        destroyed: Arc<AtomicUsize>,
    }

    struct CountingEngine(Arc<AtomicUsize>);

    impl DecoderEngine for CountingEngine {
        fn decode_nal(&mut self, _nal: &[u8], _user_data: i64) -> Result<(), DecStatus> {
            Err(DecStatus::NoDecodedPic)
        }

        fn flush(&mut self) -> Result<(), DecStatus> {
            Err(DecStatus::InvalidArgument)
        }

        fn get_picture(&mut self) -> Result<Option<EnginePicture<'_>>, DecStatus> {
            Err(DecStatus::NoDecodedPic)
        }

        fn destroy(&mut self) -> Result<(), DecStatus> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl DecoderBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn check(&self, _params: &DecoderParams) -> Result<(), DecStatus> {
            Ok(())
        }

        fn create(&self, _params: &DecoderParams) -> Result<Box<dyn DecoderEngine>, CodecError> {
            Ok(Box::new(CountingEngine(Arc::clone(&self.destroyed))))
        }
    }

    #[test]
    fn test_advisory_codes_and_close() {
        let backend = Arc::new(CountingBackend::default());
        let params = DecoderParams::new().build_with(backend.clone()).unwrap();
        let mut dec = Decoder::new(params).unwrap();

        dec.decode_unit(&[1, 2, 3], 0).unwrap();
        assert!(dec.decoded_picture().unwrap().is_none());
        assert!(!dec.flush().unwrap());

        dec.close().unwrap();
        dec.close().unwrap();
        assert!(matches!(dec.decode_unit(&[1], 0), Err(CodecError::SessionClosed)));
        assert!(matches!(dec.decoded_picture(), Err(CodecError::SessionClosed)));
        drop(dec);
        assert_eq!(backend.destroyed.load(Ordering::SeqCst), 1);
    }
}

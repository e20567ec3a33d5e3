//! Encoder session.

use tracing::{debug, trace, warn};

use crate::engine::{EncodeInput, EncoderEngine};
use crate::frame::PlanarFrame;
use crate::framing::frame;
use crate::lifecycle::{CloseFlag, Resource, SessionState};
use crate::params::{EncoderParams, Validated};
use crate::pool::BufferPool;
use crate::unit::CompressedUnit;
use crate::{CodecError, EncStatus, EngineStatus, Plane};

/// Owns one encoder handle and turns raw planes into framed units.
///
/// All calls take `&mut self`; wrap the encoder in a mutex to share it
/// between threads.
pub struct Encoder {
    engine: Option<Box<dyn EncoderEngine>>,
    pool: BufferPool,
    params: EncoderParams,
    state: SessionState,
    closed: CloseFlag,
    pictures: u64,
    units: u64,
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("width", &self.params.width)
            .field("height", &self.params.height)
            .field("state", &self.state)
            .field("pictures", &self.pictures)
            .field("units", &self.units)
            .finish()
    }
}

impl Encoder {
    /// Instantiates the engine that validated `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to create a handle.
    pub fn new(params: Validated<EncoderParams>) -> Result<Self, CodecError> {
        let engine = params.backend().create(params.params())?;
        let params = params.into_inner();
        let pool = params.session_pool();
        debug!(
            width = params.width,
            height = params.height,
            framerate = params.framerate,
            chroma = %params.chroma_format,
            "encoder session created"
        );
        Ok(Self {
            engine: Some(engine),
            pool,
            params,
            state: SessionState::Created,
            closed: CloseFlag::new(),
            pictures: 0,
            units: 0,
        })
    }

    /// Validates `params` with the default backend and opens a session.
    pub fn with_params(params: EncoderParams) -> Result<Self, CodecError> {
        Self::new(params.build()?)
    }

    #[must_use]
    pub fn params(&self) -> &EncoderParams {
        &self.params
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Pool the units of this session are drawn from.
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Encodes one picture.
    ///
    /// Returns the units the engine emitted for this call, possibly none
    /// while it buffers. Every unit is copied out of engine memory and framed
    /// before this returns.
    pub fn encode(
        &mut self,
        planes: [&[u8]; 3],
        strides: [usize; 3],
        user_data: i64,
    ) -> Result<Vec<CompressedUnit>, CodecError> {
        let engine = self.engine.as_mut().ok_or(CodecError::SessionClosed)?;
        check_planes(&self.params, &planes, &strides)?;

        let nals = engine
            .encode(EncodeInput {
                planes,
                strides,
                user_data,
            })
            .map_err(|status| CodecError::Engine(EngineStatus::Encoder(status)))?;

        let mut units = Vec::with_capacity(nals.len());
        for nal in &nals {
            let record = frame(nal.bytes, &self.pool)?;
            units.push(CompressedUnit::new(
                record,
                self.pool.clone(),
                nal.nal_type,
                nal.user_data,
            ));
        }
        drop(nals);

        self.state = SessionState::Active;
        self.pictures += 1;
        self.units += units.len() as u64;
        trace!(picture = self.pictures, units = units.len(), "encoded picture");
        Ok(units)
    }

    /// Encodes a packed I420 / I444 frame.
    pub fn encode_frame(
        &mut self,
        frame: &PlanarFrame,
        user_data: i64,
    ) -> Result<Vec<CompressedUnit>, CodecError> {
        if frame.width() != self.params.width
            || frame.height() != self.params.height
            || frame.chroma_format() != self.params.chroma_format
        {
            return Err(CodecError::FrameSize {
                expected: crate::frame::expected_frame_size(
                    self.params.width,
                    self.params.height,
                    self.params.chroma_format,
                )
                .unwrap_or(0),
                actual: frame.data().len(),
            });
        }
        self.encode(frame.planes(), frame.strides(), user_data)
    }

    /// Forces out every buffered picture.
    ///
    /// The flag is false, with no units, when the engine had nothing to
    /// flush or the flush call failed.
    pub fn flush(&mut self) -> Result<(Vec<CompressedUnit>, bool), CodecError> {
        let engine = self.engine.as_mut().ok_or(CodecError::SessionClosed)?;
        let nals = match engine.flush() {
            Ok(nals) => nals,
            Err(EncStatus::NoMoreOutput) => {
                trace!("encoder flush: nothing buffered");
                return Ok((Vec::new(), false));
            }
            Err(status) => {
                warn!(%status, "encoder flush failed");
                return Ok((Vec::new(), false));
            }
        };

        let mut units = Vec::with_capacity(nals.len());
        for nal in &nals {
            let record = frame(nal.bytes, &self.pool)?;
            units.push(CompressedUnit::new(
                record,
                self.pool.clone(),
                nal.nal_type,
                nal.user_data,
            ));
        }
        drop(nals);

        self.units += units.len() as u64;
        trace!(units = units.len(), "encoder flushed");
        Ok((units, true))
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
            pictures = self.pictures,
            units = self.units,
            "encoder session closed"
        );
        engine
            .destroy()
            .map_err(|status| CodecError::Engine(EngineStatus::Encoder(status)))
    }
}

/// Bounds-checks every plane against `rows * stride`.
fn check_planes(
    params: &EncoderParams,
    planes: &[&[u8]; 3],
    strides: &[usize; 3],
) -> Result<(), CodecError> {
    let (width, height) = (params.width as usize, params.height as usize);
    let chroma = params.chroma_format.chroma_dimensions(width, height);
    for plane in Plane::ALL {
        let (w, h) = match plane {
            Plane::Y => (width, height),
            Plane::U | Plane::V => match chroma {
                Some(dims) => dims,
                None => continue,
            },
        };
        let stride = strides[plane.index()];
        if stride < w {
            return Err(CodecError::InvalidStride {
                plane,
                stride,
                width: w,
            });
        }
        let needed = h.checked_mul(stride).unwrap_or(usize::MAX);
        let available = planes[plane.index()].len();
        if available < needed {
            return Err(CodecError::PlaneOutOfBounds {
                plane,
                needed,
                available,
            });
        }
    }
    Ok(())
}

impl Resource for Encoder {
    fn close(&mut self) -> Result<(), CodecError> {
        self.release()
    }

    fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        if !self.closed.is_closed() {
            debug!("encoder dropped without close");
        }
        self.release().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::raw::RawEncoderBackend;
    use crate::engine::{EncoderBackend, EngineNal};
    use crate::NalUnitType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts engine calls and emits one fixed NAL per picture.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        created: AtomicUsize,
        destroyed: Arc<AtomicUsize>,
        flush_status: Option<EncStatus>,
    }

    struct RecordingEngine {
        destroyed: Arc<AtomicUsize>,
        flush_status: Option<EncStatus>,
        payload: Vec<u8>,
    }

    impl EncoderEngine for RecordingEngine {
        fn encode(&mut self, input: EncodeInput<'_>) -> Result<Vec<EngineNal<'_>>, EncStatus> {
            self.payload = vec![0xAB; 5];
            Ok(vec![EngineNal {
                bytes: &self.payload,
                nal_type: NalUnitType::IntraPicture,
                user_data: input.user_data,
            }])
        }

        fn flush(&mut self) -> Result<Vec<EngineNal<'_>>, EncStatus> {
            match self.flush_status {
                Some(status) => Err(status),
                None => Ok(vec![EngineNal {
                    bytes: &[7, 7],
                    nal_type: NalUnitType::PredictedPicture,
                    user_data: -1,
                }]),
            }
        }

        fn destroy(&mut self) -> Result<(), EncStatus> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl EncoderBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn check(&self, params: &EncoderParams) -> Result<(), EncStatus> {
            RawEncoderBackend.check(params)
        }

        fn create(&self, _params: &EncoderParams) -> Result<Box<dyn EncoderEngine>, CodecError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(RecordingEngine {
                destroyed: Arc::clone(&self.destroyed),
                flush_status: self.flush_status,
                payload: Vec::new(),
            }))
        }
    }

    fn session(backend: Arc<RecordingBackend>) -> Encoder {
        let params = EncoderParams::new(4, 4, 30.0).build_with(backend).unwrap();
        Encoder::new(params).unwrap()
    }

    fn planes() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (vec![16; 16], vec![128; 4], vec![128; 4])
    }

    #[test]
    fn test_encode_frames_units() {
        let backend = Arc::new(RecordingBackend::default());
        let mut enc = session(Arc::clone(&backend));
        assert_eq!(enc.state(), SessionState::Created);

        let (y, u, v) = planes();
        let units = enc.encode([&y, &u, &v], [4, 2, 2], 77).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].bytes(), &[0, 0, 0, 5, 0xAB, 0xAB, 0xAB, 0xAB, 0xAB]);
        assert_eq!(units[0].user_data(), 77);
        assert_eq!(enc.state(), SessionState::Active);
        assert_eq!(backend.created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_plane_bounds_checked_before_engine() {
        let backend = Arc::new(RecordingBackend::default());
        let mut enc = session(backend);
        let (y, u, _) = planes();
        let short = vec![0u8; 3];
        let err = enc.encode([&y, &u, &short], [4, 2, 2], 0).unwrap_err();
        assert!(matches!(
            err,
            CodecError::PlaneOutOfBounds { plane: Plane::V, needed: 4, available: 3 }
        ));
        let err = enc.encode([&y, &u, &u], [3, 2, 2], 0).unwrap_err();
        assert!(matches!(err, CodecError::InvalidStride { plane: Plane::Y, .. }));
        assert_eq!(enc.state(), SessionState::Created);
    }

    #[test]
    fn test_huge_stride_is_rejected() {
        let backend = Arc::new(RecordingBackend::default());
        let mut enc = session(backend);
        let (y, u, v) = planes();
        let err = enc
            .encode([&y, &u, &v], [usize::MAX / 2, 2, 2], 0)
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::PlaneOutOfBounds { plane: Plane::Y, needed: usize::MAX, available: 16 }
        ));
        assert_eq!(enc.state(), SessionState::Created);
    }

    #[test]
    fn test_flush_outcomes() {
        let mut enc = session(Arc::new(RecordingBackend::default()));
        let (units, ok) = enc.flush().unwrap();
        assert!(ok);
        assert_eq!(units[0].payload(), &[7, 7]);

        let quiet = RecordingBackend {
            flush_status: Some(EncStatus::NoMoreOutput),
            ..Default::default()
        };
        let mut enc = session(Arc::new(quiet));
        let (units, ok) = enc.flush().unwrap();
        assert!(!ok);
        assert!(units.is_empty());

        let failing = RecordingBackend {
            flush_status: Some(EncStatus::InvalidArgument),
            ..Default::default()
        };
        let mut enc = session(Arc::new(failing));
        assert!(!enc.flush().unwrap().1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let backend = Arc::new(RecordingBackend::default());
        let mut enc = session(Arc::clone(&backend));
        enc.close().unwrap();
        enc.close().unwrap();
        assert!(enc.is_closed());
        assert_eq!(enc.state(), SessionState::Closed);
        drop(enc);
        assert_eq!(backend.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_calls_after_close_fail() {
        let mut enc = session(Arc::new(RecordingBackend::default()));
        enc.close().unwrap();
        let (y, u, v) = planes();
        assert!(matches!(
            enc.encode([&y, &u, &v], [4, 2, 2], 0),
            Err(CodecError::SessionClosed)
        ));
        assert!(matches!(enc.flush(), Err(CodecError::SessionClosed)));
    }

    #[test]
    fn test_drop_destroys_engine() {
        let backend = Arc::new(RecordingBackend::default());
        drop(session(Arc::clone(&backend)));
        assert_eq!(backend.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_units_outlive_session() {
        let mut enc = session(Arc::new(RecordingBackend::default()));
        let pool = enc.pool().clone();
        let (y, u, v) = planes();
        let units = enc.encode([&y, &u, &v], [4, 2, 2], 0).unwrap();
        drop(enc);
        assert_eq!(units[0].payload().len(), 5);
        drop(units);
        assert_eq!(pool.stats().releases, 1);
    }

    #[test]
    fn test_encode_frame_checks_geometry() {
        let mut enc = session(Arc::new(RecordingBackend::default()));
        let frame = PlanarFrame::from_i420(2, 2, vec![0; 6]).unwrap();
        assert!(matches!(
            enc.encode_frame(&frame, 0),
            Err(CodecError::FrameSize { expected: 24, actual: 6 })
        ));
        let frame = PlanarFrame::from_i420(4, 4, vec![0; 24]).unwrap();
        assert_eq!(enc.encode_frame(&frame, 3).unwrap()[0].user_data(), 3);
    }
}

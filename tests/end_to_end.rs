//! Encoder -> framed stream -> decoder, through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use xvc::engine::raw::{check_encoder, RawDecoderBackend, RawEncoderBackend};
use xvc::engine::{EncoderBackend, EncoderEngine};
use xvc::{
    CodecError, CompressedUnit, Decoder, DecoderParams, EncStatus, Encoder, EncoderParams,
    EngineStatus, NalUnitType, Plane, Resource, SessionState,
};

fn encoder(width: u32, height: u32) -> Encoder {
    let params = EncoderParams::new(width, height, 30.0)
        .build_with(Arc::new(RawEncoderBackend))
        .unwrap();
    Encoder::new(params).unwrap()
}

fn decoder() -> Decoder {
    let params = DecoderParams::new()
        .build_with(Arc::new(RawDecoderBackend))
        .unwrap();
    Decoder::new(params).unwrap()
}

fn encode_gray(enc: &mut Encoder, luma: u8, tag: i64) -> Vec<CompressedUnit> {
    let y = vec![luma; 16];
    let c = vec![128u8; 4];
    enc.encode([&y, &c, &c], [4, 2, 2], tag).unwrap()
}

#[test]
fn test_single_picture_round_trip() {
    let mut enc = encoder(4, 4);
    let mut units = encode_gray(&mut enc, 77, 1);
    let (tail, _) = enc.flush().unwrap();
    units.extend(tail);
    assert!(!units.is_empty());

    for unit in &units {
        let prefix = u32::from_be_bytes(unit.bytes()[..4].try_into().unwrap());
        assert_eq!(prefix as usize, unit.payload().len());
        assert_eq!(unit.bytes().len(), unit.payload().len() + 4);
    }

    let mut dec = decoder();
    for unit in &units {
        dec.decode(unit.bytes()).unwrap();
    }
    assert!(dec.flush().unwrap());

    let picture = dec.decoded_picture().unwrap().unwrap();
    assert_eq!((picture.width(), picture.height()), (4, 4));
    let image = picture.image().unwrap();
    assert!(image.rows(Plane::Y).all(|row| row.iter().all(|&v| v == 77)));
    assert!(dec.decoded_picture().unwrap().is_none());
}

#[test]
fn test_sub_gop_output_is_in_display_order() {
    let params = EncoderParams::new(4, 4, 30.0)
        .low_delay(false)
        .build_with(Arc::new(RawEncoderBackend))
        .unwrap();
    let mut enc = Encoder::new(params).unwrap();

    let mut units = Vec::new();
    for i in 0..6u8 {
        units.extend(encode_gray(&mut enc, i * 10, i64::from(i)));
    }
    let (tail, ok) = enc.flush().unwrap();
    assert!(ok);
    units.extend(tail);
    assert_eq!(units.len(), 6);
    assert_eq!(units[0].nal_type(), NalUnitType::IntraPicture);

    let stream: Vec<u8> = units.iter().flat_map(|u| u.bytes().to_vec()).collect();
    let mut dec = decoder();
    assert_eq!(dec.decode_all(&stream).unwrap(), 6);
    dec.flush().unwrap();

    let mut lumas = Vec::new();
    while let Some(picture) = dec.decoded_picture_ref().unwrap() {
        lumas.push(picture.image().y_at(1, 1));
    }
    assert_eq!(lumas, vec![0, 10, 20, 30, 40, 50]);
}

#[derive(Debug, Default)]
struct CountingBackend {
    created: AtomicUsize,
}

impl EncoderBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn check(&self, params: &EncoderParams) -> Result<(), EncStatus> {
        check_encoder(params)
    }

    fn create(&self, params: &EncoderParams) -> Result<Box<dyn EncoderEngine>, CodecError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        RawEncoderBackend.create(params)
    }
}

#[test]
fn test_invalid_parameters_never_reach_the_engine() {
    let backend = Arc::new(CountingBackend::default());
    let err = EncoderParams::new(0, 4, 30.0)
        .build_with(backend.clone())
        .unwrap_err();
    assert!(matches!(
        err,
        CodecError::InvalidParameters(EngineStatus::Encoder(EncStatus::SizeTooSmall))
    ));
    assert_eq!(backend.created.load(Ordering::SeqCst), 0);

    let params = EncoderParams::new(4, 4, 30.0)
        .build_with(backend.clone())
        .unwrap();
    let _enc = Encoder::new(params).unwrap();
    assert_eq!(backend.created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_sessions_close_idempotently() {
    let mut enc = encoder(4, 4);
    let mut dec = decoder();
    let units = encode_gray(&mut enc, 1, 0);
    dec.decode(units[0].bytes()).unwrap();
    assert_eq!(enc.state(), SessionState::Active);

    enc.close().unwrap();
    enc.close().unwrap();
    dec.close().unwrap();
    dec.close().unwrap();
    assert_eq!(enc.state(), SessionState::Closed);
    assert!(dec.is_closed());

    let y = [0u8; 16];
    let c = [0u8; 4];
    assert!(matches!(
        enc.encode([&y, &c, &c], [4, 2, 2], 0),
        Err(CodecError::SessionClosed)
    ));
    assert!(matches!(
        dec.decode(units[0].bytes()),
        Err(CodecError::SessionClosed)
    ));

    // units outlive the session that produced them
    assert_eq!(units[0].nal_type(), NalUnitType::IntraPicture);
    assert!(!units[0].payload().is_empty());
}

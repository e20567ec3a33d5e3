//! Persisting encoder output and reading it back.

use std::io::Cursor;
use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::{Decoder as _, Encoder as _};
use xvc::engine::raw::{RawDecoderBackend, RawEncoderBackend};
use xvc::{
    CodecError, Decoder, DecoderParams, Encoder, EncoderParams, FramedReader, FramedWriter,
    NalCodec, PlanarFrame,
};

fn i420(width: u32, height: u32, seed: u8) -> PlanarFrame {
    let size = (width * height * 3 / 2) as usize;
    let data = (0..size).map(|i| seed.wrapping_add(i as u8)).collect();
    PlanarFrame::from_i420(width, height, data).unwrap()
}

fn encoded_stream(frames: &[PlanarFrame]) -> Vec<u8> {
    let first = &frames[0];
    let params = EncoderParams::new(first.width(), first.height(), 25.0)
        .build_with(Arc::new(RawEncoderBackend))
        .unwrap();
    let mut enc = Encoder::new(params).unwrap();

    let mut writer = FramedWriter::new(Vec::new());
    for (i, frame) in frames.iter().enumerate() {
        for unit in enc.encode_frame(frame, i as i64).unwrap() {
            writer.write_record(unit.bytes()).unwrap();
        }
    }
    let (tail, _) = enc.flush().unwrap();
    for unit in tail {
        writer.write_record(unit.bytes()).unwrap();
    }
    assert_eq!(writer.records_written(), frames.len() as u64);
    writer.into_inner()
}

#[test]
fn test_file_round_trip_preserves_pictures() {
    let frames: Vec<_> = (0..3).map(|i| i420(8, 6, i * 40)).collect();
    let stream = encoded_stream(&frames);

    let dec_params = DecoderParams::new()
        .build_with(Arc::new(RawDecoderBackend))
        .unwrap();
    let mut dec = Decoder::new(dec_params).unwrap();
    for payload in FramedReader::new(Cursor::new(stream)) {
        dec.decode_unit(&payload.unwrap(), 0).unwrap();
    }
    dec.flush().unwrap();

    let mut decoded = Vec::new();
    while let Some(picture) = dec.decoded_picture().unwrap() {
        decoded.push(picture.image().unwrap().to_packed());
    }
    let expected: Vec<_> = frames.iter().map(|f| f.data().to_vec()).collect();
    assert_eq!(decoded, expected);
}

#[test]
fn test_truncated_file_is_reported() {
    let frames = vec![i420(4, 4, 0), i420(4, 4, 1)];
    let mut stream = encoded_stream(&frames);
    stream.truncate(stream.len() - 3);

    let mut reader = FramedReader::new(Cursor::new(stream));
    assert!(reader.read_payload().unwrap().is_some());
    assert!(matches!(
        reader.read_payload(),
        Err(CodecError::MalformedFraming { .. })
    ));
}

#[test]
fn test_codec_matches_blocking_framing() {
    let frames = vec![i420(4, 4, 9)];
    let stream = encoded_stream(&frames);

    let mut codec = NalCodec::new();
    let mut src = BytesMut::from(&stream[..]);
    let payload = codec.decode(&mut src).unwrap().unwrap();
    assert!(src.is_empty());

    let mut dst = BytesMut::new();
    codec.encode(&payload[..], &mut dst).unwrap();
    assert_eq!(&dst[..], &stream[..]);
}

//! Length-prefixed record format for compressed units.
//!
//! Wire layout of one record:
//!
//! ```text
//! +----------------------+---------------------------+
//! | length (u32, BE)     | payload (length bytes)    |
//! +----------------------+---------------------------+
//! ```
//!
//! Unit type and user tag are not part of the record. A stream is simply a
//! concatenation of records.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::pool::{BufferPool, PooledBuffer};
use crate::CodecError;

/// Size of the length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Default upper bound for a single payload read from a stream (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// One framed record held in a pooled buffer.
#[derive(Debug)]
pub struct FramedRecord {
    buf: PooledBuffer,
}

impl FramedRecord {
    /// Full record, prefix included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Payload without the prefix.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf[LENGTH_PREFIX..]
    }

    /// Gives up the pooled buffer, e.g. to release it.
    #[must_use]
    pub fn into_buffer(self) -> PooledBuffer {
        self.buf
    }
}

/// Frames `payload` into a single buffer drawn from `pool`.
pub fn frame(payload: &[u8], pool: &BufferPool) -> Result<FramedRecord, CodecError> {
    let len = u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;
    let mut buf = pool.acquire();
    buf.reserve(LENGTH_PREFIX + payload.len());
    buf.put_u32(len);
    buf.extend_from_slice(payload);
    Ok(FramedRecord { buf })
}

/// Splits the first record off `bytes`.
///
/// Returns the payload and whatever follows the record.
pub fn unframe(bytes: &[u8]) -> Result<(&[u8], &[u8]), CodecError> {
    if bytes.len() < LENGTH_PREFIX {
        return Err(CodecError::MalformedFraming {
            needed: LENGTH_PREFIX,
            available: bytes.len(),
        });
    }
    let (prefix, rest) = bytes.split_at(LENGTH_PREFIX);
    let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len > rest.len() {
        return Err(CodecError::MalformedFraming {
            needed: len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

/// Iterator over the payloads of a concatenated record stream.
///
/// Stops after the first error.
pub fn records(stream: &[u8]) -> Records<'_> {
    Records {
        rest: stream,
        failed: false,
    }
}

/// Iterator returned by [`records`].
#[derive(Debug)]
pub struct Records<'a> {
    rest: &'a [u8],
    failed: bool,
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<&'a [u8], CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() || self.failed {
            return None;
        }
        match unframe(self.rest) {
            Ok((payload, rest)) => {
                self.rest = rest;
                Some(Ok(payload))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// ============================================================================
// Blocking stream I/O
// ============================================================================

/// Writes framed records to a byte sink.
#[derive(Debug)]
pub struct FramedWriter<W> {
    inner: W,
    records: u64,
}

impl<W: Write> FramedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0 }
    }

    /// Frames and writes one payload.
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        let len =
            u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;
        self.inner.write_all(&len.to_be_bytes())?;
        self.inner.write_all(payload)?;
        self.records += 1;
        Ok(())
    }

    /// Writes an already framed record verbatim.
    pub fn write_record(&mut self, record: &[u8]) -> Result<(), CodecError> {
        let (_, rest) = unframe(record)?;
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes(rest.len()));
        }
        self.inner.write_all(record)?;
        self.records += 1;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads framed records from a byte source.
#[derive(Debug)]
pub struct FramedReader<R> {
    inner: R,
    max_payload: usize,
}

impl<R: Read> FramedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Rejects records whose declared length exceeds `max_payload`.
    #[must_use]
    pub fn max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Reads the next payload.
    ///
    /// Returns `Ok(None)` on a clean end of stream between records.
    pub fn read_payload(&mut self) -> Result<Option<Vec<u8>>, CodecError> {
        let mut prefix = [0u8; LENGTH_PREFIX];
        let got = read_full(&mut self.inner, &mut prefix)?;
        if got == 0 {
            return Ok(None);
        }
        if got < LENGTH_PREFIX {
            return Err(CodecError::MalformedFraming {
                needed: LENGTH_PREFIX,
                available: got,
            });
        }

        let len = u32::from_be_bytes(prefix) as usize;
        if len > self.max_payload {
            return Err(CodecError::PayloadTooLarge(len));
        }
        let mut payload = vec![0u8; len];
        let got = read_full(&mut self.inner, &mut payload)?;
        if got < len {
            return Err(CodecError::MalformedFraming {
                needed: len,
                available: got,
            });
        }
        Ok(Some(payload))
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for FramedReader<R> {
    type Item = Result<Vec<u8>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_payload().transpose()
    }
}

/// Like `read_exact`, but reports how many bytes arrived before EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ============================================================================
// tokio-util codec
// ============================================================================

/// Record codec for `tokio_util::codec::Framed` transports.
#[derive(Debug, Clone, Copy)]
pub struct NalCodec {
    max_payload: usize,
}

impl Default for NalCodec {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl NalCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }
}

impl Decoder for NalCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, CodecError> {
        if src.len() < LENGTH_PREFIX {
            src.reserve(LENGTH_PREFIX - src.len());
            return Ok(None);
        }
        let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_payload {
            return Err(CodecError::PayloadTooLarge(len));
        }
        if src.len() < LENGTH_PREFIX + len {
            src.reserve(LENGTH_PREFIX + len - src.len());
            return Ok(None);
        }
        src.advance(LENGTH_PREFIX);
        Ok(Some(src.split_to(len)))
    }
}

impl Encoder<&[u8]> for NalCodec {
    type Error = CodecError;

    fn encode(&mut self, payload: &[u8], dst: &mut BytesMut) -> Result<(), CodecError> {
        if payload.len() > self.max_payload {
            return Err(CodecError::PayloadTooLarge(payload.len()));
        }
        let len =
            u32::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;
        dst.reserve(LENGTH_PREFIX + payload.len());
        dst.put_u32(len);
        dst.extend_from_slice(payload);
        Ok(())
    }
}

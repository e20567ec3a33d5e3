//! Compressed units handed out by the encoder.

use tracing::trace;

use crate::framing::{FramedRecord, LENGTH_PREFIX};
use crate::lifecycle::{CloseFlag, Resource};
use crate::pool::{BufferPool, PooledBuffer};
use crate::{CodecError, NalUnitType};

/// One NAL unit, framed and copied out of engine memory.
///
/// The unit owns a pooled buffer holding the framed record. Closing the unit
/// (or dropping it) hands that buffer back to the pool exactly once; after
/// that [`bytes`](Self::bytes) is empty.
#[derive(Debug)]
pub struct CompressedUnit {
    record: Option<PooledBuffer>,
    pool: BufferPool,
    nal_type: NalUnitType,
    user_data: i64,
    closed: CloseFlag,
}

impl CompressedUnit {
    pub(crate) fn new(
        record: FramedRecord,
        pool: BufferPool,
        nal_type: NalUnitType,
        user_data: i64,
    ) -> Self {
        Self {
            record: Some(record.into_buffer()),
            pool,
            nal_type,
            user_data,
            closed: CloseFlag::new(),
        }
    }

    /// Framed record (4-byte big-endian length + payload).
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.record.as_deref().map(|buf| &buf[..]).unwrap_or(&[])
    }

    /// Payload without the length prefix.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let bytes = self.bytes();
        bytes.get(LENGTH_PREFIX..).unwrap_or(&[])
    }

    #[must_use]
    pub fn nal_type(&self) -> NalUnitType {
        self.nal_type
    }

    /// Tag passed to the encode call that produced this unit.
    #[must_use]
    pub fn user_data(&self) -> i64 {
        self.user_data
    }

    fn release(&mut self) {
        if self.closed.begin_close() {
            if let Some(buf) = self.record.take() {
                trace!(len = buf.len(), "releasing compressed unit");
                self.pool.release(buf);
            }
        }
    }
}

impl Resource for CompressedUnit {
    fn close(&mut self) -> Result<(), CodecError> {
        self.release();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }
}

impl Drop for CompressedUnit {
    fn drop(&mut self) {
        self.release();
    }
}

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One frame as handed over by the packet queue, starting at the IP header.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub data: Bytes,
    pub captured_at: DateTime<Utc>,
}

impl RawPacket {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

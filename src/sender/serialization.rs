use crate::buffer::Batch;
use crate::domain::DataPoint;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use thiserror::Error;

/// Protocol signature opening every request and response frame.
pub const MAGIC: &[u8; 4] = b"ZBXD";
/// Only protocol version spoken by this client.
pub const PROTOCOL_VERSION: u8 = 0x01;
/// Magic followed by the version byte.
pub const FRAME_PREFIX: &[u8; 5] = b"ZBXD\x01";
/// Width of the little-endian length field that follows the prefix.
pub const LENGTH_FIELD_LEN: usize = 8;
pub const HEADER_LEN: usize = FRAME_PREFIX.len() + LENGTH_FIELD_LEN;

const REQUEST_KIND: &str = "sender data";

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct SenderRequest<'a> {
    request: &'static str,
    data: &'a [DataPoint],
    #[serde(skip_serializing_if = "Option::is_none")]
    clock: Option<i64>,
}

/// Turns batches into framed trap requests.
#[derive(Clone, Debug, Default)]
pub struct BatchSerializer;

impl BatchSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Minimal JSON envelope for `batch`. Empty batches produce `"data":[]`.
    pub fn encode_json(&self, batch: &Batch) -> Result<String, SerializationError> {
        let request = SenderRequest {
            request: REQUEST_KIND,
            data: batch.points(),
            clock: batch.packet_clock(),
        };
        Ok(serde_json::to_string(&request)?)
    }

    /// Header followed by the JSON envelope, ready to be written to the socket.
    pub fn encode_request(&self, batch: &Batch) -> Result<Bytes, SerializationError> {
        let json = self.encode_json(batch)?;
        Ok(frame(json.as_bytes()))
    }
}

/// Prefixes `body` with magic, version and its length as a u64 LE.
pub fn frame(body: &[u8]) -> Bytes {
    let mut buffer = BytesMut::with_capacity(HEADER_LEN + body.len());
    buffer.put_slice(FRAME_PREFIX);
    buffer.put_u64_le(body.len() as u64);
    buffer.put_slice(body);
    buffer.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(key: &str, clock: Option<i64>) -> DataPoint {
        DataPoint::new("h1", key, "5", clock).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let framed = frame(b"{}");
        assert_eq!(&framed[..4], b"ZBXD");
        assert_eq!(framed[4], 0x01);
        assert_eq!(&framed[5..13], &2u64.to_le_bytes());
        assert_eq!(&framed[13..], b"{}");
    }

    #[test]
    fn test_envelope_omits_absent_clocks() {
        let serializer = BatchSerializer::new();
        let batch = Batch::new(vec![point("k1", None), point("k2", Some(1000))], None);
        let json = serializer.encode_json(&batch).unwrap();
        assert_eq!(
            json,
            r#"{"request":"sender data","data":[{"host":"h1","key":"k1","value":"5"},{"host":"h1","key":"k2","value":"5","clock":1000}]}"#
        );
    }

    #[test]
    fn test_packet_clock_is_emitted_at_top_level() {
        let serializer = BatchSerializer::new();
        let batch = Batch::new(vec![point("k1", None)], Some(1_365_787_627));
        let json = serializer.encode_json(&batch).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["clock"], 1_365_787_627);
        assert!(parsed["data"][0].get("clock").is_none());
    }

    #[test]
    fn test_empty_batch_is_still_a_valid_envelope() {
        let serializer = BatchSerializer::new();
        let request = serializer.encode_request(&Batch::new(Vec::new(), None)).unwrap();
        let body = &request[HEADER_LEN..];
        assert_eq!(body, br#"{"request":"sender data","data":[]}"#);

        let declared = u64::from_le_bytes(request[5..13].try_into().unwrap());
        assert_eq!(declared as usize, body.len());
    }

    #[test]
    fn test_length_counts_bytes_not_chars() {
        let serializer = BatchSerializer::new();
        let batch = Batch::new(
            vec![DataPoint::new("hôte", "clé", "värde", None).unwrap()],
            None,
        );
        let request = serializer.encode_request(&batch).unwrap();
        let declared = u64::from_le_bytes(request[5..13].try_into().unwrap());
        assert_eq!(declared as usize, request.len() - HEADER_LEN);
    }
}

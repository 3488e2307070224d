use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;

/// Serialized request bytes, ready for a single write.
///
/// Compact UTF-8 JSON. Immutable; cloning shares the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    bytes: Bytes,
}

impl EncodedPayload {
    /// Wrap bytes that are already a JSON document.
    pub fn from_json_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    /// Decode the payload back into a structured value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.bytes)?)
    }
}

impl AsRef<[u8]> for EncodedPayload {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encodes structured requests as compact JSON.
///
/// Object keys come out in sorted order, so equal records always encode to
/// identical bytes. Encoding is pure: it never touches the transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestEncoder;

impl RequestEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode any serializable record.
    ///
    /// Fails with [`EncodeError::Json`](crate::EncodeError::Json) when the
    /// value falls outside the JSON data model, e.g. a map with non-string
    /// keys or a `Serialize` impl that reports an error.
    pub fn encode<T: Serialize + ?Sized>(&self, request: &T) -> Result<EncodedPayload> {
        // Round through `Value` so map keys are canonicalized regardless of
        // the source container's iteration order.
        let value = serde_json::to_value(request)?;
        let bytes = serde_json::to_vec(&value)?;
        trace!(size = bytes.len(), "encoded request");
        Ok(EncodedPayload::from_json_bytes(bytes))
    }
}

/// Encode with the default encoder.
pub fn encode<T: Serialize + ?Sized>(request: &T) -> Result<EncodedPayload> {
    RequestEncoder::new().encode(request)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::ser::Error as _;
    use serde::{Deserialize, Serializer};
    use serde_json::{json, Value};

    use super::*;
    use crate::error::EncodeError;
    use crate::request::ActionRequest;

    #[test]
    fn encodes_update_user_request() {
        let request = ActionRequest::new("update_user")
            .field("userId", 1001)
            .field("timestamp", 1_733_800_000_000u64)
            .field("message", "Hello");

        let payload = encode(&request).unwrap();
        assert_eq!(
            payload.as_bytes(),
            br#"{"action":"update_user","message":"Hello","timestamp":1733800000000,"userId":1001}"#
        );

        let decoded: ActionRequest = payload.decode().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn nested_values_survive_decoding() {
        let request = ActionRequest::new("set_config").field(
            "params",
            json!({
                "logLevel": "Debug",
                "enableFeatureX": true,
                "limits": [1, 2.5, null, {"deep": "value"}],
            }),
        );

        let payload = encode(&request).unwrap();
        let decoded: Value = payload.decode().unwrap();
        assert_eq!(decoded, serde_json::to_value(&request).unwrap());
    }

    #[test]
    fn key_order_is_canonical() {
        let mut first = HashMap::new();
        let mut second = HashMap::new();
        for (k, v) in [("b", 2), ("a", 1), ("c", 3)] {
            first.insert(k, v);
        }
        for (k, v) in [("c", 3), ("b", 2), ("a", 1)] {
            second.insert(k, v);
        }

        assert_eq!(encode(&first).unwrap(), encode(&second).unwrap());
        assert_eq!(encode(&first).unwrap().as_bytes(), br#"{"a":1,"b":2,"c":3}"#);
    }

    #[test]
    fn application_records_encode_directly() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct UpdateUser {
            action: String,
            user_id: u32,
            message: Option<String>,
        }

        let record = UpdateUser {
            action: "update_user".to_string(),
            user_id: 1001,
            message: None,
        };
        let payload = encode(&record).unwrap();
        assert_eq!(payload.decode::<UpdateUser>().unwrap(), record);
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut record = BTreeMap::new();
        record.insert(vec![1u8, 2], "value");

        let err = encode(&record).unwrap_err();
        assert!(matches!(err, EncodeError::Json(_)));
    }

    #[test]
    fn failing_serialize_impl_is_rejected() {
        struct Cyclic;

        impl Serialize for Cyclic {
            fn serialize<S: Serializer>(
                &self,
                _serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                Err(S::Error::custom("cyclic reference"))
            }
        }

        let err = encode(&json_with(Cyclic)).unwrap_err();
        assert!(err.to_string().contains("cyclic reference"));
    }

    fn json_with<T: Serialize>(inner: T) -> impl Serialize {
        #[derive(Serialize)]
        struct Wrapper<T> {
            action: &'static str,
            handle: T,
        }

        Wrapper {
            action: "update_user",
            handle: inner,
        }
    }

    #[test]
    fn decode_rejects_non_json_payload() {
        let payload = EncodedPayload::from_json_bytes(&b"not json"[..]);
        assert!(payload.decode::<Value>().is_err());
    }
}

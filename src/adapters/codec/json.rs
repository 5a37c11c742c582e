//! JSON value codec.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::ports::Codec;

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Error = serde_json::Error;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error> {
        serde_json::to_string(value)
    }

    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, Self::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Member {
        user_id: String,
        coins: u64,
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let codec = JsonCodec;
        let payload = codec.encode(&vec![1, 2, 3]).unwrap();
        assert!(codec.decode::<Member>(&payload).is_err());
    }

    #[test]
    fn test_none_is_encoded_as_null() {
        let codec = JsonCodec;
        assert_eq!(codec.encode(&Option::<Member>::None).unwrap(), "null");
        assert_eq!(codec.decode::<Option<Member>>("null").unwrap(), None);
    }
}

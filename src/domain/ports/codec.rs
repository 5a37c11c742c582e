//! Value serialization port.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encoding of cached values to and from their stored string form.
pub trait Codec: Send + Sync + 'static {
    /// Error reported by the codec; only its message is kept.
    type Error: std::fmt::Display;

    /// Encode a value into its stored form.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, Self::Error>;

    /// Decode a stored payload.
    fn decode<T: DeserializeOwned>(&self, payload: &str) -> Result<T, Self::Error>;
}

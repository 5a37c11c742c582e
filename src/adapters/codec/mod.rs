//! Value codecs.

pub mod json;

pub use json::JsonCodec;

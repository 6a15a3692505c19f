//! Lossless protobuf wire layer.
//!
//! A `RawMessage` keeps every field of a message in its original order, so
//! fields we never interpret (weights, unknown layer kinds, newer schema
//! additions) survive a decode/encode cycle untouched.

pub mod field;
pub mod message;
pub mod parse;

pub use field::{Field, FieldValue};
pub use message::RawMessage;

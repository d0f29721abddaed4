//! Transport layer: wire-format details (payload resolution and JSON encoding).

pub mod payload;

pub use payload::{
    Payload, PayloadError, build_batch, build_from_recipient, build_from_recipients, build_single,
    encode_json,
};

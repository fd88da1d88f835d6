//! Packet decoding.
//!
//! Turns raw capture frames into [`PacketRecord`](crate::PacketRecord)s.
//! Only IPv4 packets carrying TCP or UDP are kept; anything else is reported
//! as an explicit skip with a reason, so a corrupt frame never aborts a
//! capture and every discarded frame is accounted for in a
//! [`DecodeSummary`].

pub mod capture;
pub mod error;
pub mod parser;

pub use capture::{
    CaptureDecoder, CaptureInput, DecodeOutcome, DecodeSummary, DecodedCapture, decode_capture,
    decode_captures,
};
pub use error::{CaptureUnavailable, PacketDecodeError, SkipReason};
pub use parser::decode_packet;

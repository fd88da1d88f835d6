//! PCAP/PCAPNG source implementation.
//!
//! Provides a `PacketSource` backed by a legacy PCAP or a PCAPNG stream. The
//! container is detected from its magic bytes; timestamps are normalised to
//! seconds using the resolution announced by the file.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;

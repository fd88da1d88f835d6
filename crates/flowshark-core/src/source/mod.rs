//! Packet sources.
//!
//! A source yields raw link-layer frames with their capture timestamp. All
//! file I/O of the capture path lives here; decoding happens in `decode`.

pub mod pcap;

pub use pcap::PcapFileSource;

use pcap_parser::Linktype;
use thiserror::Error;

/// One raw frame read from a capture.
#[derive(Debug, Clone)]
pub struct PacketEvent {
    /// Capture timestamp in seconds, when the container records one.
    pub ts: Option<f64>,
    /// Link-layer type of `data`.
    pub linktype: Linktype,
    /// Captured bytes (may be shorter than the original frame).
    pub data: Vec<u8>,
}

/// Pull-based packet stream.
pub trait PacketSource {
    /// Return the next packet, `Ok(None)` at end of capture.
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
}

impl From<pcap::error::PcapSourceError> for SourceError {
    fn from(value: pcap::error::PcapSourceError) -> Self {
        match value {
            pcap::error::PcapSourceError::Io(err) => SourceError::Io(err),
            pcap::error::PcapSourceError::Pcap { context, message } => {
                SourceError::Pcap(format!("{context}: {message}"))
            }
            truncated @ pcap::error::PcapSourceError::Truncated { .. } => {
                SourceError::Pcap(truncated.to_string())
            }
        }
    }
}

/// In-memory source, mostly useful for feeding prepared frames to a decoder.
///
/// # Examples
/// ```
/// use flowshark_core::{PacketEvent, PacketSource, VecSource};
/// use pcap_parser::Linktype;
///
/// let mut source = VecSource::new(vec![PacketEvent {
///     ts: Some(1.0),
///     linktype: Linktype::ETHERNET,
///     data: vec![0u8; 4],
/// }]);
/// assert!(source.next_packet().unwrap().is_some());
/// assert!(source.next_packet().unwrap().is_none());
/// ```
#[derive(Debug, Default)]
pub struct VecSource {
    events: std::collections::VecDeque<PacketEvent>,
}

impl VecSource {
    pub fn new(events: Vec<PacketEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl PacketSource for VecSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        Ok(self.events.pop_front())
    }
}

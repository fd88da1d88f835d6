use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::source::SourceError;

/// Why a single frame was not turned into a packet record.
#[derive(Debug, Error)]
pub enum PacketDecodeError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("unsupported linktype {0}")]
    UnsupportedLinktype(i32),
    #[error("missing network layer in packet")]
    MissingNetworkLayer,
    #[error("network layer is not IPv4")]
    NotIpv4,
    #[error("missing transport layer in packet")]
    MissingTransport,
    #[error("transport layer is neither TCP nor UDP")]
    UnsupportedTransport,
    #[error("packet has no capture timestamp")]
    MissingTimestamp,
}

impl PacketDecodeError {
    pub fn reason(&self) -> SkipReason {
        match self {
            PacketDecodeError::Slice(_) => SkipReason::Malformed,
            PacketDecodeError::UnsupportedLinktype(_) => SkipReason::UnsupportedLinktype,
            PacketDecodeError::MissingNetworkLayer | PacketDecodeError::NotIpv4 => {
                SkipReason::NotIpv4
            }
            PacketDecodeError::MissingTransport | PacketDecodeError::UnsupportedTransport => {
                SkipReason::NotTcpUdp
            }
            PacketDecodeError::MissingTimestamp => SkipReason::MissingTimestamp,
        }
    }
}

/// Counting key for skipped frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Malformed,
    UnsupportedLinktype,
    NotIpv4,
    NotTcpUdp,
    MissingTimestamp,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipReason::Malformed => "malformed",
            SkipReason::UnsupportedLinktype => "unsupported_linktype",
            SkipReason::NotIpv4 => "not_ipv4",
            SkipReason::NotTcpUdp => "not_tcp_udp",
            SkipReason::MissingTimestamp => "missing_timestamp",
        };
        f.write_str(name)
    }
}

/// A capture that could not be opened or is not a supported format.
#[derive(Debug, Error)]
#[error("capture unavailable: {path}: {source}")]
pub struct CaptureUnavailable {
    pub path: PathBuf,
    #[source]
    pub source: SourceError,
}

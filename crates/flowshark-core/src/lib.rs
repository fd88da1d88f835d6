//! flowshark core library: traffic-to-feature pipeline and flow-based
//! application classification.
//!
//! The crate implements the offline pipeline used by the CLI:
//! capture sources feed the packet decoder, decoded records receive a stable
//! flow identifier and a per-flow inter-arrival time, and the resulting
//! feature table is validated and handed to the experiment runner, which
//! trains and scores one classifier per feature-set hypothesis.
//! All I/O is isolated in `source` and the CSV helpers of `table`; every
//! other stage is a pure function from an input table to a new output table.
//!
//! Invariants:
//! - Flow identifiers are deterministic and directional.
//! - Output row order always equals input row order.
//! - Standardisation is fitted on the training partition only.
//! - The same seed and input always produce the same accuracy report.
//!
//! # Examples
//! ```no_run
//! use std::fs::File;
//!
//! use flowshark_core::experiment::{ExperimentConfig, RandomForest, run_experiments};
//! use flowshark_core::pipeline::prepare_dataset;
//! use flowshark_core::table::csv::read_table;
//!
//! let table = read_table(File::open("combined_dataset.csv")?)?;
//! let config = ExperimentConfig::default();
//! let prepared = prepare_dataset(&table, config.iat_order)?;
//! let prototype = RandomForest::new(config.forest.clone());
//! let report = run_experiments(&prepared.rows, &config, &prototype)?;
//! print!("{}", report.render());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod decode;
pub mod experiment;
pub mod flow;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod table;
pub mod validate;

pub use decode::{
    CaptureDecoder, CaptureInput, CaptureUnavailable, DecodeOutcome, DecodeSummary,
    DecodedCapture, PacketDecodeError, SkipReason, decode_capture, decode_captures, decode_packet,
};
pub use flow::{FeatureRow, FlowError, FlowId, FlowKey, FlowTuple, IatOrder, resolve};
pub use report::{REPORT_VERSION, SizeDistribution, TrafficReport, build_traffic_report};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError, VecSource};

/// Transport protocol of a packet record.
///
/// # Examples
/// ```
/// use flowshark_core::Protocol;
///
/// assert_eq!(Protocol::Tcp.to_string(), "TCP");
/// assert_eq!("udp".parse::<Protocol>().unwrap(), Protocol::Udp);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
    Udp,
    Other,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Other => "OTHER",
        };
        f.write_str(name)
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Protocol::Tcp),
            "UDP" => Ok(Protocol::Udp),
            "OTHER" => Ok(Protocol::Other),
            other => Err(format!("unknown protocol '{other}'")),
        }
    }
}

/// TCP control flags, rendered as letters in bit order (`FSRPAUEC`).
///
/// A SYN/ACK renders as `SA`, a PSH/ACK as `PA`. A segment with no flag set
/// renders as `0`. Parsing accepts the letter form or a decimal bit value.
///
/// # Examples
/// ```
/// use flowshark_core::TcpFlags;
///
/// let flags = TcpFlags::SYN | TcpFlags::ACK;
/// assert_eq!(flags.to_string(), "SA");
/// assert_eq!("SA".parse::<TcpFlags>().unwrap(), flags);
/// assert_eq!("18".parse::<TcpFlags>().unwrap(), flags);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TcpFlags(u8);

const FLAG_LETTERS: [char; 8] = ['F', 'S', 'R', 'P', 'A', 'U', 'E', 'C'];

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);
    pub const ECE: TcpFlags = TcpFlags(0x40);
    pub const CWR: TcpFlags = TcpFlags(0x80);

    pub const fn from_bits(bits: u8) -> Self {
        TcpFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        TcpFlags(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TcpFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0");
        }
        for (bit, letter) in FLAG_LETTERS.iter().enumerate() {
            if self.0 & (1 << bit) != 0 {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for TcpFlags {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if let Ok(bits) = value.parse::<u8>() {
            return Ok(TcpFlags(bits));
        }
        let mut bits = 0u8;
        for letter in value.chars() {
            let bit = FLAG_LETTERS
                .iter()
                .position(|candidate| *candidate == letter.to_ascii_uppercase())
                .ok_or_else(|| format!("unknown TCP flag '{letter}' in '{value}'"))?;
            bits |= 1 << bit;
        }
        if bits == 0 {
            return Err("empty TCP flag string".to_string());
        }
        Ok(TcpFlags(bits))
    }
}

impl TryFrom<String> for TcpFlags {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TcpFlags> for String {
    fn from(value: TcpFlags) -> Self {
        value.to_string()
    }
}

/// One decoded packet.
///
/// Serialises with the traffic-table column names
/// (`Timestamp, Packet_Size, Src_IP, Dst_IP, Src_Port, Dst_Port, Protocol,
/// TCP_Flags, App`).
///
/// # Examples
/// ```
/// use flowshark_core::{PacketRecord, Protocol, TcpFlags};
///
/// let record = PacketRecord {
///     timestamp: 10.0,
///     size: 60,
///     src_addr: "10.0.0.1".parse().unwrap(),
///     dst_addr: "10.0.0.2".parse().unwrap(),
///     src_port: 51000,
///     dst_port: 443,
///     protocol: Protocol::Tcp,
///     tcp_flags: Some(TcpFlags::SYN),
///     app: "Chrome".to_string(),
/// };
/// assert_eq!(record.protocol, Protocol::Tcp);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Capture timestamp in seconds.
    #[serde(rename = "Timestamp")]
    pub timestamp: f64,
    /// Captured frame length in bytes.
    #[serde(rename = "Packet_Size")]
    pub size: u32,
    #[serde(rename = "Src_IP")]
    pub src_addr: Ipv4Addr,
    #[serde(rename = "Dst_IP")]
    pub dst_addr: Ipv4Addr,
    /// Source port (`0` when the protocol is `OTHER`).
    #[serde(rename = "Src_Port")]
    pub src_port: u16,
    /// Destination port (`0` when the protocol is `OTHER`).
    #[serde(rename = "Dst_Port")]
    pub dst_port: u16,
    #[serde(rename = "Protocol")]
    pub protocol: Protocol,
    /// TCP flags; always `None` for UDP.
    #[serde(rename = "TCP_Flags")]
    pub tcp_flags: Option<TcpFlags>,
    /// Application the capture was recorded from (ground-truth label).
    #[serde(rename = "App")]
    pub app: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_flags_render_in_bit_order() {
        assert_eq!((TcpFlags::PSH | TcpFlags::ACK).to_string(), "PA");
        assert_eq!((TcpFlags::FIN | TcpFlags::ACK).to_string(), "FA");
        assert_eq!(TcpFlags::RST.to_string(), "R");
        assert_eq!(TcpFlags::default().to_string(), "0");
    }

    #[test]
    fn tcp_flags_parse_letters_and_bits() {
        assert_eq!("pa".parse::<TcpFlags>().unwrap(), TcpFlags::PSH | TcpFlags::ACK);
        assert_eq!("0".parse::<TcpFlags>().unwrap(), TcpFlags::default());
        assert!("SX".parse::<TcpFlags>().is_err());
        assert!("".parse::<TcpFlags>().is_err());
    }

    #[test]
    fn tcp_flags_contains() {
        let flags = TcpFlags::SYN | TcpFlags::ACK;
        assert!(flags.contains(TcpFlags::SYN));
        assert!(!flags.contains(TcpFlags::FIN));
    }

    #[test]
    fn protocol_round_trips_through_strings() {
        for protocol in [Protocol::Tcp, Protocol::Udp, Protocol::Other] {
            assert_eq!(protocol.to_string().parse::<Protocol>().unwrap(), protocol);
        }
        assert!("icmp".parse::<Protocol>().is_err());
    }

    #[test]
    fn packet_record_serializes_with_traffic_columns() {
        let record = PacketRecord {
            timestamp: 1.5,
            size: 60,
            src_addr: Ipv4Addr::new(10, 0, 0, 1),
            dst_addr: Ipv4Addr::new(10, 0, 0, 2),
            src_port: 1000,
            dst_port: 53,
            protocol: Protocol::Udp,
            tcp_flags: None,
            app: "Zoom".to_string(),
        };
        let value = serde_json::to_value(&record).expect("record json");
        assert_eq!(value["Src_IP"], "10.0.0.1");
        assert_eq!(value["Protocol"], "UDP");
        assert!(value["TCP_Flags"].is_null());
    }
}

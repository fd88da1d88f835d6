use std::io::{self, Read};

use super::error::PcapSourceError;
use super::layout;
use pcap_parser::Linktype;

/// Per-interface state announced by a PCAPNG Interface Description Block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterfaceInfo {
    pub linktype: Linktype,
    pub tsresol: u8,
    pub tsoffset: i64,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        Self {
            linktype: Linktype::ETHERNET,
            tsresol: layout::PCAPNG_DEFAULT_TSRESOL,
            tsoffset: 0,
        }
    }
}

/// Read the head of a capture stream, up to `limit` bytes.
///
/// The block readers parse their file header from a single fill, so the
/// head is replayed in front of the rest of the stream and must hold at
/// least the whole header.
///
/// # Errors
/// Returns `PcapSourceError::Io` when fewer than four bytes are available.
pub fn read_head<R: Read>(reader: &mut R, limit: usize) -> Result<Vec<u8>, PcapSourceError> {
    let mut head = Vec::with_capacity(limit);
    reader.by_ref().take(limit as u64).read_to_end(&mut head)?;
    if head.len() < 4 {
        return Err(PcapSourceError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "capture shorter than its magic number",
        )));
    }
    Ok(head)
}

/// Magic number at the start of a head returned by [`read_head`].
pub fn magic_of(head: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&head[..4]);
    magic
}

pub fn is_pcapng_magic(magic: &[u8; 4]) -> bool {
    magic == &layout::PCAPNG_MAGIC
}

/// Resolve the interface for a given id, defaulting to Ethernet/microseconds.
pub fn interface_for_id(interfaces: &[InterfaceInfo], if_id: u32) -> InterfaceInfo {
    interfaces
        .get(if_id as usize)
        .copied()
        .unwrap_or_default()
}

/// Number of timestamp units per second for an `if_tsresol` value.
///
/// Returns `None` for resolutions that do not fit in 64 bits.
pub fn units_per_second(tsresol: u8) -> Option<u64> {
    let exponent = u32::from(tsresol & !layout::TSRESOL_BINARY_FLAG);
    if tsresol & layout::TSRESOL_BINARY_FLAG != 0 {
        2u64.checked_pow(exponent)
    } else {
        10u64.checked_pow(exponent)
    }
}

/// Convert a PCAPNG high/low timestamp to seconds for the given interface.
pub fn pcapng_ts_to_seconds(ts_high: u32, ts_low: u32, interface: &InterfaceInfo) -> Option<f64> {
    let ts = (u64::from(ts_high) << 32) | u64::from(ts_low);
    let units = units_per_second(interface.tsresol)?;
    Some(ts as f64 / units as f64 + interface.tsoffset as f64)
}

/// Convert a legacy PCAP second/fraction pair to seconds.
pub fn legacy_ts_to_seconds(ts_sec: u32, ts_frac: u32, nanosecond: bool) -> f64 {
    let scale = if nanosecond { 1e-9 } else { 1e-6 };
    f64::from(ts_sec) + f64::from(ts_frac) * scale
}

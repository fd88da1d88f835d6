use std::fmt;
use std::net::Ipv4Addr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::FlowError;
use crate::PacketRecord;

/// Flow identifiers are reduced into `[0, FLOW_ID_MODULUS)`.
pub const FLOW_ID_MODULUS: u64 = 100_000_000;

/// Stable grouping key derived from a [`FlowKey`].
///
/// Collisions are possible and accepted; the id is a feature and a grouping
/// key, never a security token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(u32);

impl FlowId {
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directional 4-tuple with addresses as network-order integers.
///
/// `a -> b` and `b -> a` are distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_addr: u32,
    pub dst_addr: u32,
    pub src_port: u16,
    pub dst_port: u16,
}

impl FlowKey {
    pub fn new(src_addr: Ipv4Addr, dst_addr: Ipv4Addr, src_port: u16, dst_port: u16) -> Self {
        Self {
            src_addr: u32::from(src_addr),
            dst_addr: u32::from(dst_addr),
            src_port,
            dst_port,
        }
    }

    /// Build a key from dotted-quad address literals.
    ///
    /// # Errors
    /// Returns `FlowError::InvalidAddress` for anything that is not an IPv4
    /// literal.
    pub fn from_literals(
        src_addr: &str,
        dst_addr: &str,
        src_port: u16,
        dst_port: u16,
    ) -> Result<Self, FlowError> {
        Ok(Self::new(
            parse_ipv4(src_addr)?,
            parse_ipv4(dst_addr)?,
            src_port,
            dst_port,
        ))
    }

    /// Hash input: `"{src}_{dst}_{src_port}_{dst_port}"`.
    pub fn canonical_string(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.src_addr, self.dst_addr, self.src_port, self.dst_port
        )
    }
}

fn parse_ipv4(value: &str) -> Result<Ipv4Addr, FlowError> {
    value
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| FlowError::InvalidAddress {
            value: value.to_string(),
        })
}

/// Reduce a flow key to its identifier.
///
/// The SHA-256 digest of the canonical key string is read as a big-endian
/// unsigned integer and reduced modulo [`FLOW_ID_MODULUS`].
///
/// # Examples
/// ```
/// use flowshark_core::{FlowKey, resolve};
///
/// let key = FlowKey::from_literals("10.0.0.1", "10.0.0.2", 51000, 443).unwrap();
/// assert_eq!(resolve(&key), resolve(&key));
/// assert!(resolve(&key).value() < 100_000_000);
/// ```
pub fn resolve(key: &FlowKey) -> FlowId {
    let digest = Sha256::digest(key.canonical_string().as_bytes());
    let reduced = digest
        .iter()
        .fold(0u64, |acc, byte| (acc * 256 + u64::from(*byte)) % FLOW_ID_MODULUS);
    FlowId(reduced as u32)
}

/// Records that carry a flow 4-tuple and a timestamp.
pub trait FlowTuple {
    fn flow_key(&self) -> Result<FlowKey, FlowError>;
    fn timestamp(&self) -> f64;
    fn size(&self) -> f64;
}

impl FlowTuple for PacketRecord {
    fn flow_key(&self) -> Result<FlowKey, FlowError> {
        Ok(FlowKey::new(
            self.src_addr,
            self.dst_addr,
            self.src_port,
            self.dst_port,
        ))
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }

    fn size(&self) -> f64 {
        f64::from(self.size)
    }
}

/// Records split by whether a flow id could be derived.
#[derive(Debug)]
pub struct Resolved<R> {
    /// Resolved records in input order.
    pub rows: Vec<(R, FlowId)>,
    /// Input position and error of every excluded record.
    pub rejected: Vec<(usize, FlowError)>,
}

/// Resolve every record, excluding those whose key cannot be derived.
pub fn resolve_all<R: FlowTuple>(records: Vec<R>) -> Resolved<R> {
    let mut rows = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match record.flow_key() {
            Ok(key) => {
                let id = resolve(&key);
                rows.push((record, id));
            }
            Err(err) => {
                debug!("row {index}: {err}");
                rejected.push((index, err));
            }
        }
    }
    if !rejected.is_empty() {
        warn!(
            "excluded {} record(s) without a valid IPv4 flow key",
            rejected.len()
        );
    }
    Resolved { rows, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Protocol;

    fn record(src: [u8; 4], dst: [u8; 4], sport: u16, dport: u16) -> PacketRecord {
        PacketRecord {
            timestamp: 0.0,
            size: 60,
            src_addr: Ipv4Addr::from(src),
            dst_addr: Ipv4Addr::from(dst),
            src_port: sport,
            dst_port: dport,
            protocol: Protocol::Tcp,
            tcp_flags: None,
            app: "app".to_string(),
        }
    }

    #[test]
    fn canonical_string_uses_network_order_integers() {
        let key = FlowKey::from_literals("10.0.0.1", "10.0.0.2", 51000, 443).unwrap();
        assert_eq!(key.canonical_string(), "167772161_167772162_51000_443");
    }

    #[test]
    fn resolve_matches_reference_digests() {
        let key = FlowKey::from_literals("10.0.0.1", "10.0.0.2", 51000, 443).unwrap();
        assert_eq!(resolve(&key).value(), 58_339_154);
        let key = FlowKey::from_literals("192.168.1.10", "8.8.8.8", 5353, 53).unwrap();
        assert_eq!(resolve(&key).value(), 87_819_678);
    }

    #[test]
    fn resolve_is_deterministic_and_directional() {
        let forward = record([10, 0, 0, 1], [10, 0, 0, 2], 51000, 443);
        let reverse = record([10, 0, 0, 2], [10, 0, 0, 1], 443, 51000);
        let first = resolve(&forward.flow_key().unwrap());
        let second = resolve(&forward.clone().flow_key().unwrap());
        assert_eq!(first, second);
        assert_eq!(resolve(&reverse.flow_key().unwrap()).value(), 38_696_763);
        assert_ne!(first, resolve(&reverse.flow_key().unwrap()));
    }

    #[test]
    fn invalid_literals_are_rejected() {
        for bad in ["", "10.0.0", "::1", "10.0.0.256", "host.example"] {
            let err = FlowKey::from_literals(bad, "10.0.0.1", 1, 2).unwrap_err();
            assert_eq!(
                err,
                FlowError::InvalidAddress {
                    value: bad.to_string()
                }
            );
        }
    }

    struct Literal(&'static str);

    impl FlowTuple for Literal {
        fn flow_key(&self) -> Result<FlowKey, FlowError> {
            FlowKey::from_literals(self.0, "10.0.0.1", 1, 2)
        }

        fn timestamp(&self) -> f64 {
            0.0
        }

        fn size(&self) -> f64 {
            0.0
        }
    }

    #[test]
    fn resolve_all_excludes_bad_records() {
        let resolved = resolve_all(vec![Literal("10.0.0.9"), Literal("nope"), Literal("10.0.0.8")]);
        assert_eq!(resolved.rows.len(), 2);
        assert_eq!(resolved.rejected.len(), 1);
        assert_eq!(resolved.rejected[0].0, 1);
    }
}

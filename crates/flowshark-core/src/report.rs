//! Per-application traffic summary over decoded captures.

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::PacketRecord;
use crate::decode::{DecodeSummary, DecodedCapture};
use crate::flow::{FeatureRow, FlowId};

/// Report schema version (not the binary version).
pub const REPORT_VERSION: u32 = 1;
/// Used when no packet time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";
/// Destination ports counted as TLS traffic.
pub const TLS_PORTS: [u16; 5] = [443, 993, 465, 587, 8443];

/// Versioned traffic report with deterministic ordering: inputs in the order
/// given, applications by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficReport {
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 time of the last packet seen.
    pub generated_at: String,
    pub inputs: Vec<InputInfo>,
    pub apps: Vec<AppSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            name: "flowshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputInfo {
    pub app: String,
    pub path: String,
    pub decode: DecodeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSummary {
    pub app: String,
    pub packets: u64,
    pub mean_packet_size: f64,
    pub packet_size: SizeDistribution,
    /// Packets whose destination port is in [`TLS_PORTS`].
    pub tls_packets: u64,
    pub unique_src_ports: usize,
    pub unique_src_ips: usize,
    /// Packet count per rendered flag set (`SA`, `PA`, ...); UDP packets are
    /// not counted.
    pub tcp_flags: BTreeMap<String, u64>,
    /// Mean gap between consecutive packets of the application, in time
    /// order and across flows. Absent below two packets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_inter_arrival: Option<f64>,
    pub flows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// Five-number summary of packet sizes, quartiles linearly interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SizeDistribution {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl SizeDistribution {
    fn from_sizes(mut sizes: Vec<u32>) -> Self {
        if sizes.is_empty() {
            return Self::default();
        }
        sizes.sort_unstable();
        let quantile = |q: f64| {
            let pos = q * (sizes.len() - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let low = f64::from(sizes[lower]);
            low + (f64::from(sizes[upper]) - low) * (pos - lower as f64)
        };
        Self {
            min: quantile(0.0),
            q1: quantile(0.25),
            median: quantile(0.5),
            q3: quantile(0.75),
            max: quantile(1.0),
        }
    }
}

#[derive(Default)]
struct AppAccumulator {
    packets: u64,
    bytes: f64,
    sizes: Vec<u32>,
    tls_packets: u64,
    src_ports: BTreeSet<u16>,
    src_ips: BTreeSet<Ipv4Addr>,
    tcp_flags: BTreeMap<String, u64>,
    timestamps: Vec<f64>,
    flows: BTreeSet<FlowId>,
    first_ts: Option<f64>,
    last_ts: Option<f64>,
}

impl AppAccumulator {
    fn add(&mut self, row: &FeatureRow<PacketRecord>) {
        let record = &row.record;
        self.packets += 1;
        self.bytes += f64::from(record.size);
        self.sizes.push(record.size);
        if TLS_PORTS.contains(&record.dst_port) {
            self.tls_packets += 1;
        }
        self.src_ports.insert(record.src_port);
        self.src_ips.insert(record.src_addr);
        if let Some(flags) = record.tcp_flags {
            *self.tcp_flags.entry(flags.to_string()).or_default() += 1;
        }
        self.timestamps.push(record.timestamp);
        self.flows.insert(row.flow_id);
        self.first_ts = Some(self.first_ts.map_or(record.timestamp, |ts| ts.min(record.timestamp)));
        self.last_ts = Some(self.last_ts.map_or(record.timestamp, |ts| ts.max(record.timestamp)));
    }

    fn finish(mut self, app: String) -> AppSummary {
        let count = self.packets.max(1) as f64;
        self.timestamps.sort_by(f64::total_cmp);
        let gaps = self.timestamps.len().saturating_sub(1);
        let mean_inter_arrival = (gaps > 0).then(|| {
            let total: f64 = self.timestamps.windows(2).map(|pair| pair[1] - pair[0]).sum();
            total / gaps as f64
        });
        AppSummary {
            app,
            packets: self.packets,
            mean_packet_size: self.bytes / count,
            packet_size: SizeDistribution::from_sizes(self.sizes),
            tls_packets: self.tls_packets,
            unique_src_ports: self.src_ports.len(),
            unique_src_ips: self.src_ips.len(),
            tcp_flags: self.tcp_flags,
            mean_inter_arrival,
            flows: self.flows.len(),
            first_seen: ts_to_rfc3339(self.first_ts),
            last_seen: ts_to_rfc3339(self.last_ts),
        }
    }
}

/// Build the traffic report for decoded captures and their feature rows.
///
/// # Examples
/// ```
/// use flowshark_core::{REPORT_VERSION, build_traffic_report};
///
/// let report = build_traffic_report(&[], &[]);
/// assert_eq!(report.report_version, REPORT_VERSION);
/// assert_eq!(report.generated_at, "1970-01-01T00:00:00Z");
/// assert!(report.apps.is_empty());
/// ```
pub fn build_traffic_report(
    captures: &[DecodedCapture],
    rows: &[FeatureRow<PacketRecord>],
) -> TrafficReport {
    let inputs = captures
        .iter()
        .map(|capture| InputInfo {
            app: capture.app.clone(),
            path: capture.path.display().to_string(),
            decode: capture.summary.clone(),
        })
        .collect();

    let mut apps: BTreeMap<&str, AppAccumulator> = BTreeMap::new();
    for row in rows {
        apps.entry(row.record.app.as_str()).or_default().add(row);
    }
    let last_ts = apps
        .values()
        .filter_map(|acc| acc.last_ts)
        .reduce(f64::max);

    TrafficReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo::default(),
        generated_at: ts_to_rfc3339(last_ts).unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string()),
        inputs,
        apps: apps
            .into_iter()
            .map(|(app, acc)| acc.finish(app.to_string()))
            .collect(),
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::identity::{FlowId, FlowTuple};

/// Order in which packets of a flow are differenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IatOrder {
    /// Stable sort by timestamp inside each flow; ties keep input order.
    #[default]
    Timestamp,
    /// Input order; out-of-order timestamps yield negative inter-arrival times.
    Arrival,
}

impl fmt::Display for IatOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IatOrder::Timestamp => f.write_str("timestamp"),
            IatOrder::Arrival => f.write_str("arrival"),
        }
    }
}

impl FromStr for IatOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "timestamp" => Ok(IatOrder::Timestamp),
            "arrival" => Ok(IatOrder::Arrival),
            other => Err(format!(
                "unknown inter-arrival order '{other}' (expected timestamp or arrival)"
            )),
        }
    }
}

/// A record enriched with its flow-scoped features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow<R> {
    pub record: R,
    pub flow_id: FlowId,
    /// Seconds since the previous packet of the same flow; `0` for the first.
    pub inter_arrival_time: f64,
}

/// Attach the inter-arrival time to every resolved record.
///
/// Rows are grouped by flow id only to compute the differences: the output
/// keeps the input row order.
///
/// # Examples
/// ```
/// use flowshark_core::flow::{IatOrder, attach_inter_arrival, resolve_all};
/// use flowshark_core::{PacketRecord, Protocol};
///
/// let packet = |ts: f64| PacketRecord {
///     timestamp: ts,
///     size: 60,
///     src_addr: "10.0.0.1".parse().unwrap(),
///     dst_addr: "10.0.0.2".parse().unwrap(),
///     src_port: 1000,
///     dst_port: 443,
///     protocol: Protocol::Tcp,
///     tcp_flags: None,
///     app: "Chrome".to_string(),
/// };
/// let resolved = resolve_all(vec![packet(10.0), packet(10.25)]);
/// let rows = attach_inter_arrival(resolved.rows, IatOrder::Timestamp);
/// assert_eq!(rows[0].inter_arrival_time, 0.0);
/// assert_eq!(rows[1].inter_arrival_time, 0.25);
/// ```
pub fn attach_inter_arrival<R: FlowTuple>(
    rows: Vec<(R, FlowId)>,
    order: IatOrder,
) -> Vec<FeatureRow<R>> {
    let mut flows: HashMap<FlowId, Vec<usize>> = HashMap::new();
    for (index, (_, flow_id)) in rows.iter().enumerate() {
        flows.entry(*flow_id).or_default().push(index);
    }

    let timestamps: Vec<f64> = rows.iter().map(|(record, _)| record.timestamp()).collect();
    let mut inter_arrival = vec![0.0; rows.len()];
    for members in flows.values_mut() {
        if order == IatOrder::Timestamp {
            members.sort_by(|a, b| timestamps[*a].total_cmp(&timestamps[*b]));
        }
        for pair in members.windows(2) {
            inter_arrival[pair[1]] = timestamps[pair[1]] - timestamps[pair[0]];
        }
    }

    rows.into_iter()
        .zip(inter_arrival)
        .map(|((record, flow_id), inter_arrival_time)| FeatureRow {
            record,
            flow_id,
            inter_arrival_time,
        })
        .collect()
}

/// Per-flow totals over a feature table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowStats {
    pub packets: u64,
    pub bytes: f64,
    pub first_ts: f64,
    pub last_ts: f64,
    pub max_inter_arrival: f64,
}

impl FlowStats {
    pub fn duration(&self) -> f64 {
        self.last_ts - self.first_ts
    }
}

/// Summarise every flow of a feature table, keyed in flow id order.
pub fn summarize_flows<R: FlowTuple>(rows: &[FeatureRow<R>]) -> BTreeMap<FlowId, FlowStats> {
    let mut flows: BTreeMap<FlowId, FlowStats> = BTreeMap::new();
    for row in rows {
        let ts = row.record.timestamp();
        flows
            .entry(row.flow_id)
            .and_modify(|stats| {
                stats.packets += 1;
                stats.bytes += row.record.size();
                stats.first_ts = stats.first_ts.min(ts);
                stats.last_ts = stats.last_ts.max(ts);
                stats.max_inter_arrival = stats.max_inter_arrival.max(row.inter_arrival_time);
            })
            .or_insert_with(|| FlowStats {
                packets: 1,
                bytes: row.record.size(),
                first_ts: ts,
                last_ts: ts,
                max_inter_arrival: row.inter_arrival_time,
            });
    }
    flows
}

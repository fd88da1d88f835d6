//! Flow identity and per-flow features.
//!
//! `identity` reduces a directional 4-tuple to a stable, low-cardinality
//! [`FlowId`]; `aggregate` groups records by that id and derives the
//! inter-arrival time of each packet within its flow.

pub mod aggregate;
pub mod error;
pub mod identity;

pub use aggregate::{FeatureRow, FlowStats, IatOrder, attach_inter_arrival, summarize_flows};
pub use error::FlowError;
pub use identity::{FLOW_ID_MODULUS, FlowId, FlowKey, FlowTuple, Resolved, resolve, resolve_all};

//! Column names of the delimited formats.

pub const TIMESTAMP: &str = "Timestamp";
pub const SIZE: &str = "Size";
pub const SOURCE_IP: &str = "Source IP";
pub const DEST_IP: &str = "Dest IP";
pub const SOURCE_PORT: &str = "Source Port";
pub const DEST_PORT: &str = "Dest Port";
pub const CLASSIFICATION: &str = "Classification";
pub const FLOW_ID_HASH: &str = "Flow ID Hash";
pub const INTER_ARRIVAL_TIME: &str = "Inter-Arrival Time";

/// Columns written by `write_dataset`.
pub const DATASET_COLUMNS: [&str; 9] = [
    TIMESTAMP,
    SIZE,
    SOURCE_IP,
    DEST_IP,
    SOURCE_PORT,
    DEST_PORT,
    CLASSIFICATION,
    FLOW_ID_HASH,
    INTER_ARRIVAL_TIME,
];

/// Columns of the capture-pipeline traffic table.
pub const TRAFFIC_COLUMNS: [&str; 9] = [
    "Timestamp",
    "Packet_Size",
    "Src_IP",
    "Dst_IP",
    "Src_Port",
    "Dst_Port",
    "Protocol",
    "TCP_Flags",
    "App",
];

use etherparse::PacketBuilder;
use flowshark_core::experiment::{ExperimentConfig, RandomForest, run_experiments};
use flowshark_core::pipeline::{extract_features, prepare_dataset};
use flowshark_core::table::LabelCatalog;
use flowshark_core::table::csv::{read_table, read_traffic, write_dataset, write_traffic};
use flowshark_core::{CaptureDecoder, DecodeOutcome, IatOrder, PacketEvent, VecSource, build_traffic_report};
use pcap_parser::Linktype;

fn frame(src: [u8; 4], sport: u16, dport: u16, udp: bool, payload: usize) -> Vec<u8> {
    let base = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [7, 8, 9, 10, 11, 12]).ipv4(
        src,
        [10, 0, 0, 254],
        64,
    );
    let payload = vec![0u8; payload];
    let mut packet = Vec::new();
    if udp {
        let builder = base.udp(sport, dport);
        builder.write(&mut packet, &payload).unwrap();
    } else {
        let builder = base.tcp(sport, dport, 1, 1024).ack(1);
        builder.write(&mut packet, &payload).unwrap();
    }
    packet
}

/// Chrome: small TCP segments to 443. Zoom: large UDP datagrams to 8801.
fn app_source(app: &str, count: usize) -> VecSource {
    let events = (0..count)
        .map(|i| {
            let (ts, data) = if app == "Chrome" {
                (i as f64 * 0.05, frame([10, 0, 0, 1], 51000, 443, false, 10))
            } else {
                (100.0 + i as f64 * 0.02, frame([10, 0, 0, 2], 6000, 8801, true, 900))
            };
            PacketEvent {
                ts: Some(ts),
                linktype: Linktype::ETHERNET,
                data,
            }
        })
        .collect();
    VecSource::new(events)
}

fn decode(app: &str, count: usize) -> Vec<flowshark_core::PacketRecord> {
    CaptureDecoder::new(app_source(app, count), app)
        .filter_map(|outcome| match outcome {
            DecodeOutcome::Decoded(record) => Some(record),
            DecodeOutcome::Skipped(_) => None,
        })
        .collect()
}

#[test]
fn captures_to_accuracy_report() {
    let mut records = decode("Chrome", 40);
    records.extend(decode("Zoom", 40));
    assert_eq!(records.len(), 80);

    let mut traffic = Vec::new();
    write_traffic(&records, &mut traffic).unwrap();
    let records = read_traffic(traffic.as_slice()).unwrap();
    assert_eq!(records.len(), 80);

    let rows = extract_features(records, IatOrder::Timestamp);
    let report = build_traffic_report(&[], &rows);
    assert_eq!(report.apps.len(), 2);
    assert_eq!(report.apps[0].app, "Chrome");
    assert_eq!(report.apps[0].tls_packets, 40);
    assert_eq!(report.apps[1].flows, 1);

    let mut labels = LabelCatalog::default();
    let mut dataset = Vec::new();
    write_dataset(&rows, &mut labels, &mut dataset).unwrap();
    assert_eq!(labels.names(), ["Chrome", "Zoom"]);

    let table = read_table(dataset.as_slice()).unwrap();
    let config = ExperimentConfig::default();
    let prepared = prepare_dataset(&table, config.iat_order).unwrap();
    assert_eq!(prepared.rows.len(), 80);
    assert_eq!(prepared.rows[1].inter_arrival_time, rows[1].inter_arrival_time);

    let prototype = RandomForest::new(config.forest.clone());
    let first = run_experiments(&prepared.rows, &config, &prototype).unwrap();
    let second = run_experiments(&prepared.rows, &config, &prototype).unwrap();
    assert_eq!(first.outcomes.len(), 2);
    assert_eq!(first, second);
    // Only the first packet of each flow (inter-arrival 0) is ambiguous.
    for outcome in &first.outcomes {
        let accuracy = outcome.accuracy.clone().unwrap();
        assert!(accuracy >= 0.9, "{}: {accuracy}", outcome.name);
    }
    assert!(first.render().starts_with("Accuracy for Case 1 (Flow ID included): "));
}

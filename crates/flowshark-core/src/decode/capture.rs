use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info, warn};
use serde::Serialize;

use super::error::{CaptureUnavailable, SkipReason};
use super::parser::decode_packet;
use crate::PacketRecord;
use crate::source::{PacketSource, PcapFileSource};

/// Per-frame result of a capture decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    Decoded(PacketRecord),
    Skipped(SkipReason),
}

/// Counters describing what a decoder did with a capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodeSummary {
    /// Frames read from the source.
    pub packets_seen: u64,
    /// Frames turned into packet records.
    pub decoded: u64,
    /// Skipped frames by reason.
    pub skipped: BTreeMap<SkipReason, u64>,
    /// Source error that ended the capture early, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<String>,
    /// Whether decoding stopped at the record limit.
    pub limit_reached: bool,
}

impl DecodeSummary {
    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }
}

/// Lazy decoder over a packet source.
///
/// Yields one [`DecodeOutcome`] per frame read. Iteration ends at the end of
/// the capture, once `limit` records were decoded, or at the first source
/// error (recorded as `truncated` in the summary).
pub struct CaptureDecoder<S> {
    source: S,
    app: String,
    limit: Option<usize>,
    summary: DecodeSummary,
    done: bool,
}

impl<S: PacketSource> CaptureDecoder<S> {
    pub fn new(source: S, app: impl Into<String>) -> Self {
        Self {
            source,
            app: app.into(),
            limit: None,
            summary: DecodeSummary::default(),
            done: false,
        }
    }

    /// Stop after `limit` accepted records (`None` means unbounded).
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn summary(&self) -> &DecodeSummary {
        &self.summary
    }

    pub fn into_summary(self) -> DecodeSummary {
        self.summary
    }

    fn limit_reached(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.summary.decoded >= limit as u64)
    }
}

impl<S: PacketSource> Iterator for CaptureDecoder<S> {
    type Item = DecodeOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.limit_reached() {
            self.summary.limit_reached = true;
            self.done = true;
            return None;
        }

        match self.source.next_packet() {
            Ok(Some(event)) => {
                self.summary.packets_seen += 1;
                match decode_packet(&event, &self.app) {
                    Ok(record) => {
                        self.summary.decoded += 1;
                        Some(DecodeOutcome::Decoded(record))
                    }
                    Err(err) => {
                        debug!(
                            "{}: skipping packet {}: {}",
                            self.app, self.summary.packets_seen, err
                        );
                        let reason = err.reason();
                        *self.summary.skipped.entry(reason).or_default() += 1;
                        Some(DecodeOutcome::Skipped(reason))
                    }
                }
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                warn!(
                    "{}: capture ended early after {} packets: {}",
                    self.app, self.summary.packets_seen, err
                );
                self.summary.truncated = Some(err.to_string());
                self.done = true;
                None
            }
        }
    }
}

/// A capture to decode and the application it was recorded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureInput {
    pub app: String,
    pub path: PathBuf,
}

impl CaptureInput {
    pub fn new(app: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            app: app.into(),
            path: path.into(),
        }
    }
}

/// All records decoded from one capture.
#[derive(Debug, Clone)]
pub struct DecodedCapture {
    pub app: String,
    pub path: PathBuf,
    pub records: Vec<PacketRecord>,
    pub summary: DecodeSummary,
}

/// Decode a capture file into packet records labelled with `app`.
///
/// # Errors
/// Returns `CaptureUnavailable` when the file cannot be opened or is not a
/// PCAP/PCAPNG capture. Problems inside the capture never fail the call.
pub fn decode_capture(
    path: &Path,
    app: &str,
    limit: Option<usize>,
) -> Result<DecodedCapture, CaptureUnavailable> {
    debug!("opening capture {} for {}", path.display(), app);
    let source = PcapFileSource::open(path).map_err(|source| CaptureUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut decoder = CaptureDecoder::new(source, app).with_limit(limit);
    let records: Vec<PacketRecord> = decoder
        .by_ref()
        .filter_map(|outcome| match outcome {
            DecodeOutcome::Decoded(record) => Some(record),
            DecodeOutcome::Skipped(_) => None,
        })
        .collect();
    let summary = decoder.into_summary();
    info!(
        "{}: decoded {} of {} packets ({} skipped)",
        app,
        summary.decoded,
        summary.packets_seen,
        summary.skipped_total()
    );

    Ok(DecodedCapture {
        app: app.to_string(),
        path: path.to_path_buf(),
        records,
        summary,
    })
}

/// Decode independent captures, on up to `jobs` worker threads.
///
/// Results are returned in input order, one per capture.
pub fn decode_captures(
    inputs: &[CaptureInput],
    limit: Option<usize>,
    jobs: usize,
) -> Vec<Result<DecodedCapture, CaptureUnavailable>> {
    let workers = jobs.clamp(1, inputs.len().max(1));
    if workers == 1 {
        return inputs
            .iter()
            .map(|input| decode_capture(&input.path, &input.app, limit))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let mut indexed: Vec<(usize, Result<DecodedCapture, CaptureUnavailable>)> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(input) = inputs.get(index) else {
                                break;
                            };
                            done.push((index, decode_capture(&input.path, &input.app, limit)));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parser::tests::{tcp_frame, udp_frame};
    use crate::source::{PacketEvent, SourceError, VecSource};
    use pcap_parser::Linktype;

    fn event(ts: f64, data: Vec<u8>) -> PacketEvent {
        PacketEvent {
            ts: Some(ts),
            linktype: Linktype::ETHERNET,
            data,
        }
    }

    fn mixed_source() -> VecSource {
        VecSource::new(vec![
            event(1.0, tcp_frame([10, 0, 0, 1], [10, 0, 0, 2], 1000, 443)),
            event(1.1, vec![0xff; 10]),
            event(1.2, udp_frame([10, 0, 0, 1], [10, 0, 0, 3], 2000, 53)),
            event(1.3, tcp_frame([10, 0, 0, 2], [10, 0, 0, 1], 443, 1000)),
        ])
    }

    #[test]
    fn decoder_skips_corrupt_packets_and_keeps_order() {
        let mut decoder = CaptureDecoder::new(mixed_source(), "Chrome");
        let outcomes: Vec<_> = decoder.by_ref().collect();
        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[1], DecodeOutcome::Skipped(SkipReason::Malformed)));
        let timestamps: Vec<f64> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                DecodeOutcome::Decoded(record) => Some(record.timestamp),
                DecodeOutcome::Skipped(_) => None,
            })
            .collect();
        assert_eq!(timestamps, vec![1.0, 1.2, 1.3]);

        let summary = decoder.summary();
        assert_eq!(summary.packets_seen, 4);
        assert_eq!(summary.decoded, 3);
        assert_eq!(summary.skipped.get(&SkipReason::Malformed), Some(&1));
        assert!(!summary.limit_reached);
    }

    #[test]
    fn decoder_stops_at_limit() {
        let mut decoder = CaptureDecoder::new(mixed_source(), "Chrome").with_limit(Some(2));
        let decoded = decoder
            .by_ref()
            .filter(|outcome| matches!(outcome, DecodeOutcome::Decoded(_)))
            .count();
        assert_eq!(decoded, 2);
        assert!(decoder.summary().limit_reached);
        assert_eq!(decoder.summary().packets_seen, 3);
    }

    struct FailingSource {
        remaining: VecSource,
    }

    impl PacketSource for FailingSource {
        fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
            match self.remaining.next_packet()? {
                Some(event) => Ok(Some(event)),
                None => Err(SourceError::Pcap("truncated block".to_string())),
            }
        }
    }

    #[test]
    fn source_error_truncates_without_failing() {
        let source = FailingSource {
            remaining: VecSource::new(vec![event(
                1.0,
                udp_frame([10, 0, 0, 1], [10, 0, 0, 2], 1, 2),
            )]),
        };
        let mut decoder = CaptureDecoder::new(source, "Zoom");
        assert!(matches!(decoder.next(), Some(DecodeOutcome::Decoded(_))));
        assert!(decoder.next().is_none());
        assert!(decoder.next().is_none());
        let summary = decoder.into_summary();
        assert_eq!(summary.decoded, 1);
        assert!(summary.truncated.unwrap().contains("truncated block"));
    }

    #[test]
    fn missing_capture_is_unavailable() {
        let err = decode_capture(Path::new("/nonexistent/capture.pcap"), "Edge", None).unwrap_err();
        assert!(matches!(err.source, SourceError::Io(_)));
        assert!(err.to_string().contains("capture unavailable"));
    }

    #[test]
    fn parallel_decode_preserves_input_order() {
        let inputs = vec![
            CaptureInput::new("a", "/nonexistent/a.pcap"),
            CaptureInput::new("b", "/nonexistent/b.pcap"),
            CaptureInput::new("c", "/nonexistent/c.pcap"),
        ];
        let results = decode_captures(&inputs, None, 3);
        assert_eq!(results.len(), 3);
        let paths: Vec<_> = results
            .iter()
            .map(|result| result.as_ref().unwrap_err().path.clone())
            .collect();
        let expected: Vec<_> = inputs.iter().map(|input| input.path.clone()).collect();
        assert_eq!(paths, expected);
    }
}

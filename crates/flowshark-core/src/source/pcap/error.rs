use thiserror::Error;

/// Failures of the capture container itself; per-frame problems are left to
/// the decoder.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{context}: {message}")]
    Pcap {
        context: &'static str,
        message: String,
    },
    #[error("capture ends inside a block ({refills} refills without progress)")]
    Truncated { refills: usize },
}

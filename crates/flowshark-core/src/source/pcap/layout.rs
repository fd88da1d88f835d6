pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

/// PCAPNG default timestamp resolution (`if_tsresol` absent): microseconds.
pub const PCAPNG_DEFAULT_TSRESOL: u8 = 6;
/// High bit of `if_tsresol` selects a power-of-two resolution.
pub const TSRESOL_BINARY_FLAG: u8 = 0x80;

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use pcap_parser::{
    Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader,
    traits::{PcapNGPacketBlock, PcapReaderIterator},
};

use crate::source::{PacketEvent, PacketSource, SourceError};

use super::error::PcapSourceError;
use super::layout;
use super::reader::{
    InterfaceInfo, interface_for_id, is_pcapng_magic, legacy_ts_to_seconds, magic_of,
    pcapng_ts_to_seconds, read_head,
};

/// Consecutive refills without a complete block before the stream is
/// considered truncated.
const MAX_STALLED_REFILLS: usize = 8;

type CaptureStream = Box<dyn Read + Send>;

/// Packet source over a legacy PCAP or PCAPNG stream.
pub struct PcapFileSource {
    inner: PcapReader,
    stalled: usize,
}

enum PcapReader {
    Legacy {
        reader: LegacyPcapReader<CaptureStream>,
        linktype: Option<Linktype>,
        nanosecond: bool,
    },
    Ng {
        reader: PcapNGReader<CaptureStream>,
        interfaces: Vec<InterfaceInfo>,
    },
}

impl PcapFileSource {
    /// Open a capture file, detecting the container from its magic bytes.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Wrap any byte stream holding a PCAP or PCAPNG capture.
    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Result<Self, SourceError> {
        let inner = create_reader(reader)?;
        Ok(Self { inner, stalled: 0 })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        next_packet(&mut self.inner, &mut self.stalled).map_err(SourceError::from)
    }
}

fn create_reader<R: Read + Send + 'static>(mut reader: R) -> Result<PcapReader, PcapSourceError> {
    let head = read_head(&mut reader, layout::PCAP_READER_BUFFER_SIZE)?;
    let magic = magic_of(&head);
    let stream: CaptureStream = Box::new(Cursor::new(head).chain(reader));

    if is_pcapng_magic(&magic) {
        let reader = PcapNGReader::new(layout::PCAP_READER_BUFFER_SIZE, stream).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcapng reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Ng {
            reader,
            interfaces: Vec::new(),
        })
    } else {
        let reader = LegacyPcapReader::new(layout::PCAP_READER_BUFFER_SIZE, stream).map_err(|e| {
            PcapSourceError::Pcap {
                context: "pcap reader init",
                message: e.to_string(),
            }
        })?;
        Ok(PcapReader::Legacy {
            reader,
            linktype: None,
            nanosecond: false,
        })
    }
}

fn next_packet(
    reader: &mut PcapReader,
    stalled: &mut usize,
) -> Result<Option<PacketEvent>, PcapSourceError> {
    loop {
        let step = match reader {
            PcapReader::Legacy {
                reader,
                linktype,
                nanosecond,
            } => match reader.next() {
                Ok((offset, block)) => {
                    let event = match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            *linktype = Some(header.network);
                            *nanosecond = header.is_nanosecond_precision();
                            None
                        }
                        PcapBlockOwned::Legacy(packet) => Some(PacketEvent {
                            ts: Some(legacy_ts_to_seconds(
                                packet.ts_sec,
                                packet.ts_usec,
                                *nanosecond,
                            )),
                            linktype: linktype.unwrap_or(Linktype::ETHERNET),
                            data: packet.data.to_vec(),
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    Step::Block(event)
                }
                Err(PcapError::Eof) => Step::Eof,
                Err(PcapError::UnexpectedEof) => {
                    return Err(PcapSourceError::Truncated { refills: *stalled });
                }
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcap reader refill",
                        message: e.to_string(),
                    })?;
                    Step::Refilled
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcap reader next",
                        message: e.to_string(),
                    });
                }
            },
            PcapReader::Ng { reader, interfaces } => match reader.next() {
                Ok((offset, block)) => {
                    let event = match block {
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                            interfaces.clear();
                            None
                        }
                        PcapBlockOwned::NG(Block::InterfaceDescription(intf)) => {
                            interfaces.push(InterfaceInfo {
                                linktype: intf.linktype,
                                tsresol: intf.if_tsresol,
                                tsoffset: intf.if_tsoffset,
                            });
                            None
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                            let interface = interface_for_id(interfaces, packet.if_id);
                            Some(PacketEvent {
                                ts: pcapng_ts_to_seconds(packet.ts_high, packet.ts_low, &interface),
                                linktype: interface.linktype,
                                data: packet.packet_data().to_vec(),
                            })
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(packet)) => Some(PacketEvent {
                            ts: None,
                            linktype: interface_for_id(interfaces, 0).linktype,
                            data: packet.packet_data().to_vec(),
                        }),
                        _ => None,
                    };
                    reader.consume(offset);
                    Step::Block(event)
                }
                Err(PcapError::Eof) => Step::Eof,
                Err(PcapError::UnexpectedEof) => {
                    return Err(PcapSourceError::Truncated { refills: *stalled });
                }
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| PcapSourceError::Pcap {
                        context: "pcapng reader refill",
                        message: e.to_string(),
                    })?;
                    Step::Refilled
                }
                Err(e) => {
                    return Err(PcapSourceError::Pcap {
                        context: "pcapng reader next",
                        message: e.to_string(),
                    });
                }
            },
        };

        match step {
            Step::Eof => return Ok(None),
            Step::Block(event) => {
                *stalled = 0;
                if event.is_some() {
                    return Ok(event);
                }
            }
            Step::Refilled => {
                *stalled += 1;
                if *stalled > MAX_STALLED_REFILLS {
                    return Err(PcapSourceError::Truncated { refills: *stalled });
                }
            }
        }
    }
}

enum Step {
    Eof,
    Block(Option<PacketEvent>),
    Refilled,
}

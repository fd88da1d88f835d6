use etherparse::{NetSlice, SlicedPacket, TransportSlice};
use pcap_parser::Linktype;

use super::error::PacketDecodeError;
use crate::source::PacketEvent;
use crate::{PacketRecord, Protocol, TcpFlags};

/// Decode one captured frame into a packet record labelled with `app`.
///
/// Supported link layers are Ethernet, raw IP and Linux cooked capture.
///
/// # Errors
/// Returns a `PacketDecodeError` when the frame is malformed or is not an
/// IPv4 TCP/UDP packet; the caller skips the frame.
pub fn decode_packet(event: &PacketEvent, app: &str) -> Result<PacketRecord, PacketDecodeError> {
    let timestamp = event.ts.ok_or(PacketDecodeError::MissingTimestamp)?;
    let data = event.data.as_slice();
    let sliced = match event.linktype {
        Linktype::ETHERNET => SlicedPacket::from_ethernet(data),
        Linktype::RAW | Linktype::IPV4 => SlicedPacket::from_ip(data),
        Linktype::LINUX_SLL => SlicedPacket::from_linux_sll(data),
        other => return Err(PacketDecodeError::UnsupportedLinktype(other.0)),
    }
    .map_err(|e| PacketDecodeError::Slice(e.to_string()))?;

    let ipv4 = match sliced.net {
        Some(NetSlice::Ipv4(ipv4)) => ipv4,
        Some(_) => return Err(PacketDecodeError::NotIpv4),
        None => return Err(PacketDecodeError::MissingNetworkLayer),
    };
    let transport = sliced
        .transport
        .ok_or(PacketDecodeError::MissingTransport)?;

    let (protocol, src_port, dst_port, tcp_flags) = match transport {
        TransportSlice::Tcp(tcp) => {
            let mut flags = TcpFlags::default();
            for (set, flag) in [
                (tcp.fin(), TcpFlags::FIN),
                (tcp.syn(), TcpFlags::SYN),
                (tcp.rst(), TcpFlags::RST),
                (tcp.psh(), TcpFlags::PSH),
                (tcp.ack(), TcpFlags::ACK),
                (tcp.urg(), TcpFlags::URG),
                (tcp.ece(), TcpFlags::ECE),
                (tcp.cwr(), TcpFlags::CWR),
            ] {
                if set {
                    flags |= flag;
                }
            }
            (
                Protocol::Tcp,
                tcp.source_port(),
                tcp.destination_port(),
                Some(flags),
            )
        }
        TransportSlice::Udp(udp) => (
            Protocol::Udp,
            udp.source_port(),
            udp.destination_port(),
            None,
        ),
        _ => return Err(PacketDecodeError::UnsupportedTransport),
    };

    Ok(PacketRecord {
        timestamp,
        size: u32::try_from(data.len()).unwrap_or(u32::MAX),
        src_addr: ipv4.header().source_addr(),
        dst_addr: ipv4.header().destination_addr(),
        src_port,
        dst_port,
        protocol,
        tcp_flags,
        app: app.to_string(),
    })
}

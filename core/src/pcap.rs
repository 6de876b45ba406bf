use crate::corpus::{Direction, Flow, UdpDatagram};
use crate::push::WAP_PUSH_PORT;
use crate::Error;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

const UDP_HEADER_LEN: usize = 8;

/// Parse un fichier PCAP et extrait les datagrammes UDP du push WAP
pub fn parse_pcap(path: &str) -> Result<Flow> {
    use std::fs::File;
    use std::io::BufReader;

    let file = File::open(path)?;
    // Buffer généreux pour couvrir des snaplen très grands
    let reader = BufReader::with_capacity(1_048_576, file);
    let mut pcap_reader = pcap_parser::create_reader(1_048_576, reader)
        .map_err(|e| Error::PcapParse(format!("Failed to create reader: {:?}", e)))?;

    let mut datagrams: Vec<UdpDatagram> = Vec::new();
    let mut skipped = 0usize;

    loop {
        match pcap_reader.next() {
            Ok((offset, pkt)) => {
                let (ts, data) = match &pkt {
                    pcap_parser::PcapBlockOwned::Legacy(block) => {
                        let ts = block.ts_sec as f64 + block.ts_usec as f64 / 1_000_000.0;
                        (ts, block.data)
                    }
                    // En-tête de fichier, et pcapng non géré
                    _ => {
                        pcap_reader.consume(offset);
                        continue;
                    }
                };

                match extract_push_datagram(ts, data) {
                    Some(datagram) => datagrams.push(datagram),
                    None => skipped += 1,
                }
                pcap_reader.consume(offset);
            }
            Err(pcap_parser::PcapError::Eof) => break,
            Err(pcap_parser::PcapError::Incomplete(_needed)) => {
                // Re-remplir le buffer et réessayer
                pcap_reader
                    .refill()
                    .map_err(|e| Error::PcapParse(format!("PCAP refill error: {:?}", e)))?;
                continue;
            }
            Err(e) => {
                return Err(Error::PcapParse(format!("PCAP parsing error: {:?}", e)));
            }
        }
    }

    debug!("{} paquets hors push WAP ignorés", skipped);
    datagrams.sort_by(|a, b| {
        a.timestamp
            .partial_cmp(&b.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(Flow {
        source: path.to_string(),
        datagrams,
    })
}

/// Ethernet (VLAN éventuel) / IP / UDP vers le port du push WAP, sinon None
///
/// La charge utile est bornée par la longueur UDP : le bourrage Ethernet des
/// trames courtes n'atteint jamais le décodeur WSP.
pub(crate) fn extract_push_datagram(ts: f64, data: &[u8]) -> Option<UdpDatagram> {
    let parsed = etherparse::PacketHeaders::from_ethernet_slice(data).ok()?;
    let etherparse::TransportHeader::Udp(udp) = parsed.transport? else {
        return None;
    };
    let (src_port, dst_port) = (udp.source_port, udp.destination_port);
    let direction = if dst_port == WAP_PUSH_PORT {
        Direction::ToTerminal
    } else if src_port == WAP_PUSH_PORT {
        Direction::FromTerminal
    } else {
        return None;
    };

    let etherparse::PayloadSlice::Udp(payload) = parsed.payload else {
        return None;
    };
    let udp_payload_len = (udp.length as usize).saturating_sub(UDP_HEADER_LEN);
    // Capture tronquée : on garde ce qui est présent
    let payload = payload.get(..udp_payload_len).unwrap_or(payload);
    if payload.is_empty() {
        return None;
    }

    Some(UdpDatagram {
        timestamp: ts,
        src_port,
        dst_port,
        direction,
        payload: Arc::from(payload),
    })
}

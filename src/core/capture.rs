/*!
 * Capture file reading
 *
 * Reads pcap and pcapng files (radiotap or bare 802.11 link types) into
 * `Frame` records and locates the beacon and the four handshake messages, either at
 * explicit packet indices or by scanning the key information of every
 * EAPOL-Key frame.
 */

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{create_reader, Block, Linktype, PcapBlockOwned, PcapError};

use crate::error::{CaptureError, ExtractionError};
use crate::frame::{Frame, MacAddr};
use crate::handshake::{self, message_number, HandshakeContext};

const READ_BUFFER_SIZE: usize = 65536;

const LINKTYPE_IEEE802_11: Linktype = Linktype(105);
const LINKTYPE_RADIOTAP: Linktype = Linktype(127);

/// Frame decoder selected by the capture's link type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkLayer {
    Radiotap,
    Ieee80211,
}

impl LinkLayer {
    fn from_linktype(linktype: Linktype) -> Result<Self, CaptureError> {
        if linktype == LINKTYPE_RADIOTAP {
            Ok(LinkLayer::Radiotap)
        } else if linktype == LINKTYPE_IEEE802_11 {
            Ok(LinkLayer::Ieee80211)
        } else {
            Err(CaptureError::UnsupportedLinkType(linktype.0))
        }
    }

    fn decode(self, data: &[u8]) -> Option<Frame> {
        match self {
            LinkLayer::Radiotap => Frame::from_radiotap(data),
            LinkLayer::Ieee80211 => Frame::from_ieee80211(data),
        }
    }
}

/// Beacon and messages 1-4 of one handshake, borrowed from a capture
#[derive(Debug, Clone, Copy)]
pub struct HandshakeFrames<'a> {
    pub beacon: &'a Frame,
    pub messages: [&'a Frame; 4],
}

impl HandshakeFrames<'_> {
    pub fn extract(&self) -> Result<HandshakeContext, ExtractionError> {
        handshake::extract(self.beacon, self.messages)
    }
}

/// Every packet of a capture, in file order.
///
/// Packets that do not decode as management or data frames are kept as
/// `None` so packet indices match the ones shown by other capture tools.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    packets: Vec<Option<Frame>>,
}

impl Capture {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path).map_err(|source| CaptureError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let capture = Self::from_reader(BufReader::new(file))?;
        tracing::info!(
            path = %path.display(),
            packets = capture.len(),
            "capture loaded"
        );
        Ok(capture)
    }

    /// Read a legacy pcap or pcapng stream; the format is detected from
    /// its magic number.
    pub fn from_reader<'r, R: Read + Send + 'r>(reader: R) -> Result<Self, CaptureError> {
        let mut reader = create_reader(READ_BUFFER_SIZE, reader)
            .map_err(|e| CaptureError::Read(format!("{:?}", e)))?;

        // Legacy files have one link type; pcapng has one per interface
        let mut link_layer = None;
        let mut interfaces: Vec<Linktype> = Vec::new();
        let mut packets = Vec::new();

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    match block {
                        PcapBlockOwned::LegacyHeader(header) => {
                            link_layer = Some(LinkLayer::from_linktype(header.network)?);
                        }
                        PcapBlockOwned::Legacy(packet) => {
                            let layer = link_layer.ok_or_else(|| {
                                CaptureError::Read("packet before file header".to_string())
                            })?;
                            packets.push(layer.decode(packet.data));
                        }
                        PcapBlockOwned::NG(Block::SectionHeader(_)) => interfaces.clear(),
                        PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                            interfaces.push(idb.linktype);
                        }
                        PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                            let layer = interface_layer(&interfaces, epb.if_id)?;
                            let data = epb.data.get(..epb.caplen as usize).unwrap_or(epb.data);
                            packets.push(layer.decode(data));
                        }
                        PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                            let layer = interface_layer(&interfaces, 0)?;
                            packets.push(layer.decode(spb.data));
                        }
                        PcapBlockOwned::NG(_) => {}
                    }
                    reader.consume(offset);
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    reader
                        .refill()
                        .map_err(|e| CaptureError::Read(format!("{:?}", e)))?;
                }
                Err(e) => return Err(CaptureError::Read(format!("{:?}", e))),
            }
        }

        let undecodable = packets.iter().filter(|p| p.is_none()).count();
        if undecodable > 0 {
            tracing::debug!(undecodable, "packets skipped (control or truncated frames)");
        }

        Ok(Self { packets })
    }

    pub fn from_frames(frames: Vec<Frame>) -> Self {
        Self {
            packets: frames.into_iter().map(Some).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Decoded frame at a packet index
    pub fn frame(&self, index: usize) -> Result<&Frame, CaptureError> {
        self.packets
            .get(index)
            .ok_or(CaptureError::MissingFrame {
                index,
                total: self.packets.len(),
            })?
            .as_ref()
            .ok_or(CaptureError::Undecodable { index })
    }

    fn frames(&self) -> impl Iterator<Item = (usize, &Frame)> {
        self.packets
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|f| (i, f)))
    }

    /// Handshake at fixed positions: the beacon at `beacon`, messages 1-4 at
    /// `first_message..first_message + 4`.
    pub fn handshake_at(
        &self,
        beacon: usize,
        first_message: usize,
    ) -> Result<HandshakeFrames<'_>, CaptureError> {
        Ok(HandshakeFrames {
            beacon: self.frame(beacon)?,
            messages: [
                self.frame(first_message)?,
                self.frame(first_message + 1)?,
                self.frame(first_message + 2)?,
                self.frame(first_message + 3)?,
            ],
        })
    }

    /// Find the first complete handshake in the capture.
    ///
    /// Each message 2 is paired with the latest earlier message 1 of the same
    /// AP/client pair and replay counter. Every later message 3 of that pair
    /// repeating message 1's ANonce is then tried, in order, until one is
    /// answered by a message 4 echoing its replay counter; retransmitted
    /// message 3s whose reply was lost are passed over. The beacon is the
    /// first beacon or probe response of that AP.
    pub fn find_handshake(&self) -> Result<HandshakeFrames<'_>, CaptureError> {
        let keyed: Vec<(usize, &Frame, u8)> = self
            .frames()
            .filter_map(|(i, f)| message_number(f).map(|n| (i, f, n)))
            .collect();
        let mut beaconless = None;

        for (pos, &(m2_index, m2, _)) in keyed.iter().enumerate().filter(|(_, k)| k.2 == 2) {
            let (ap, client) = (m2.destination, m2.source);
            let sent_by = |frame: &Frame, from: MacAddr, to: MacAddr| {
                frame.source == from && frame.destination == to
            };

            let m1 = keyed[..pos].iter().rev().find(|(_, f, n)| {
                *n == 1 && sent_by(f, ap, client) && f.replay_counter() == m2.replay_counter()
            });
            let Some(&(m1_index, m1, _)) = m1 else {
                continue;
            };

            let rest = &keyed[pos + 1..];
            let answered = rest.iter().enumerate().find_map(|(m3_pos, &(m3_index, m3, n))| {
                if n != 3 || !sent_by(m3, ap, client) || m3.key_nonce() != m1.key_nonce() {
                    return None;
                }
                rest[m3_pos + 1..]
                    .iter()
                    .find(|(_, f, n)| {
                        *n == 4
                            && sent_by(f, client, ap)
                            && f.replay_counter() == m3.replay_counter()
                    })
                    .map(|&(m4_index, m4, _)| (m3_index, m3, m4_index, m4))
            });
            let Some((m3_index, m3, m4_index, m4)) = answered else {
                continue;
            };

            let Some((beacon_index, beacon)) =
                self.frames().find(|(_, f)| f.is_beacon() && f.bssid == ap)
            else {
                tracing::debug!(ap = %ap, client = %client, "handshake without a beacon");
                beaconless.get_or_insert(ap);
                continue;
            };

            tracing::info!(
                ap = %ap,
                client = %client,
                beacon = beacon_index,
                messages = ?[m1_index, m2_index, m3_index, m4_index],
                "handshake located"
            );

            return Ok(HandshakeFrames {
                beacon,
                messages: [m1, m2, m3, m4],
            });
        }

        Err(beaconless.map_or(CaptureError::NoHandshake, CaptureError::NoBeacon))
    }
}

fn interface_layer(interfaces: &[Linktype], if_id: u32) -> Result<LinkLayer, CaptureError> {
    let linktype = interfaces.get(if_id as usize).ok_or_else(|| {
        CaptureError::Read(format!("packet on undeclared interface {}", if_id))
    })?;
    LinkLayer::from_linktype(*linktype)
}

/*!
 * 802.11 frame records
 *
 * Decodes raw 802.11 frames (optionally behind a radiotap header) into
 * `Frame` records: transmitter/receiver addresses, BSSID, payload bytes and,
 * for EAPOL frames, the parsed EAPOL header. The field extractor only ever
 * looks at these records, never at raw capture bytes.
 */

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// LLC/SNAP header announcing an EAPOL payload (EtherType 0x888E)
pub const LLC_SNAP_EAPOL: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];

/// EAPOL packet type of an EAPOL-Key frame
pub const EAPOL_KEY_TYPE: u8 = 3;

/// Length of the EAPOL header (version, type, body length)
pub const EAPOL_HEADER_LEN: usize = 4;

// Offsets inside the EAPOL-Key body (after the 4-byte EAPOL header).
pub const KEY_INFO: Range<usize> = 1..3;
pub const REPLAY_COUNTER: Range<usize> = 5..13;
pub const KEY_NONCE: Range<usize> = 13..45;
pub const KEY_MIC: Range<usize> = 77..93;

/// Smallest EAPOL-Key body: every fixed field up to and including the key data length
pub const KEY_BODY_MIN_LEN: usize = 95;

const IEEE80211_HEADER_LEN: usize = 24;
const BEACON_FIXED_FIELDS_LEN: usize = 12;
const SSID_ELEMENT_ID: u8 = 0;

/// 48-bit IEEE MAC address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> &[u8; 6] {
        &self.0
    }

    fn read(data: &[u8], offset: usize) -> Option<Self> {
        let octets: [u8; 6] = data.get(offset..offset + 6)?.try_into().ok()?;
        Some(Self(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid MAC address {0:?}")]
pub struct ParseMacError(String);

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` or 12 bare hex digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();
        let separators = s.len() - digits.len();
        if digits.len() != 12 || (separators != 0 && separators != 5) {
            return Err(ParseMacError(s.to_string()));
        }

        let mut octets = [0u8; 6];
        hex::decode_to_slice(&digits, &mut octets).map_err(|_| ParseMacError(s.to_string()))?;
        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// EAPOL header: protocol version, packet type and declared body length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EapolHeader {
    pub version: u8,
    pub packet_type: u8,
    pub body_length: u16,
}

impl EapolHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < EAPOL_HEADER_LEN {
            return None;
        }
        Some(Self {
            version: data[0],
            packet_type: data[1],
            body_length: u16::from_be_bytes([data[2], data[3]]),
        })
    }

    pub fn to_bytes(self) -> [u8; EAPOL_HEADER_LEN] {
        let [hi, lo] = self.body_length.to_be_bytes();
        [self.version, self.packet_type, hi, lo]
    }

    pub fn is_key(&self) -> bool {
        self.packet_type == EAPOL_KEY_TYPE
    }
}

/// EAPOL-Key "Key Information" field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo(pub u16);

impl KeyInfo {
    pub const PAIRWISE: u16 = 0x0008;
    pub const INSTALL: u16 = 0x0040;
    pub const ACK: u16 = 0x0080;
    pub const MIC: u16 = 0x0100;
    pub const SECURE: u16 = 0x0200;

    /// Key descriptor version (1 = HMAC-MD5, 2 = HMAC-SHA1, 3 = AES-CMAC)
    pub fn descriptor_version(self) -> u8 {
        (self.0 & 0x0007) as u8
    }

    pub fn has(self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    /// Handshake message number (1-4) implied by the ack/MIC/install/secure flags.
    ///
    /// M1: Ack, no MIC. M2: MIC, not secure. M3: Ack, MIC, Install. M4: MIC, secure.
    pub fn message_number(self) -> Option<u8> {
        if !self.has(Self::PAIRWISE) {
            return None;
        }
        match (self.has(Self::ACK), self.has(Self::MIC), self.has(Self::INSTALL)) {
            (true, false, false) => Some(1),
            (false, true, false) if self.has(Self::SECURE) => Some(4),
            (false, true, false) => Some(2),
            (true, true, true) => Some(3),
            _ => None,
        }
    }
}

/// What kind of frame a record holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Beacon,
    ProbeResponse,
    Eapol,
    Other,
}

/// One decoded 802.11 frame.
///
/// `source` and `destination` are the transmitter (address 2) and receiver
/// (address 1). For management frames `payload` is the frame body (fixed
/// fields and information elements); for EAPOL frames it is everything after
/// the 4-byte EAPOL header, as captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub source: MacAddr,
    pub destination: MacAddr,
    pub bssid: MacAddr,
    pub eapol: Option<EapolHeader>,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a beacon record from its management body.
    pub fn beacon(bssid: MacAddr, body: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Beacon,
            source: bssid,
            destination: MacAddr([0xFF; 6]),
            bssid,
            eapol: None,
            payload: body,
        }
    }

    /// Build an EAPOL record from its header and body.
    pub fn eapol(
        source: MacAddr,
        destination: MacAddr,
        bssid: MacAddr,
        header: EapolHeader,
        body: Vec<u8>,
    ) -> Self {
        Self {
            kind: FrameKind::Eapol,
            source,
            destination,
            bssid,
            eapol: Some(header),
            payload: body,
        }
    }

    pub fn is_beacon(&self) -> bool {
        matches!(self.kind, FrameKind::Beacon | FrameKind::ProbeResponse)
    }

    /// Key information of an EAPOL-Key frame
    pub fn key_info(&self) -> Option<KeyInfo> {
        if !self.eapol?.is_key() {
            return None;
        }
        let bytes = self.payload.get(KEY_INFO)?;
        Some(KeyInfo(u16::from_be_bytes([bytes[0], bytes[1]])))
    }

    /// Replay counter of an EAPOL-Key frame
    pub fn replay_counter(&self) -> Option<u64> {
        if !self.eapol?.is_key() {
            return None;
        }
        let bytes: [u8; 8] = self.payload.get(REPLAY_COUNTER)?.try_into().ok()?;
        Some(u64::from_be_bytes(bytes))
    }

    pub fn key_nonce(&self) -> Option<&[u8]> {
        if !self.eapol?.is_key() {
            return None;
        }
        self.payload.get(KEY_NONCE)
    }

    /// Value of the SSID information element of a beacon or probe response.
    ///
    /// Returns `None` when the element is absent or runs past the body.
    pub fn ssid_element(&self) -> Option<&[u8]> {
        let mut elements = self.payload.get(BEACON_FIXED_FIELDS_LEN..)?;
        while elements.len() >= 2 {
            let id = elements[0];
            let len = elements[1] as usize;
            let value = elements.get(2..2 + len)?;
            if id == SSID_ELEMENT_ID {
                return Some(value);
            }
            elements = &elements[2 + len..];
        }
        None
    }

    /// Decode a frame preceded by a radiotap header.
    pub fn from_radiotap(data: &[u8]) -> Option<Self> {
        if data.len() < 4 || data[0] != 0 {
            return None;
        }
        let radiotap_len = u16::from_le_bytes([data[2], data[3]]) as usize;
        // Trailing FCS bytes, if any, stay in the payload; EAPOL bodies are
        // bounded by their declared length and the SSID is the first element.
        Self::from_ieee80211(data.get(radiotap_len..)?)
    }

    /// Decode a bare 802.11 frame.
    ///
    /// Management and data frames are decoded; control frames and anything
    /// shorter than a 3-address header yield `None`.
    pub fn from_ieee80211(data: &[u8]) -> Option<Self> {
        if data.len() < IEEE80211_HEADER_LEN {
            return None;
        }

        let frame_control = u16::from_le_bytes([data[0], data[1]]);
        let frame_type = (frame_control >> 2) & 0x3;
        let subtype = (frame_control >> 4) & 0xF;
        let to_ds = frame_control & 0x0100 != 0;
        let from_ds = frame_control & 0x0200 != 0;
        let protected = frame_control & 0x4000 != 0;
        let order = frame_control & 0x8000 != 0;

        let addr1 = MacAddr::read(data, 4)?;
        let addr2 = MacAddr::read(data, 10)?;
        let addr3 = MacAddr::read(data, 16)?;

        match frame_type {
            0 => {
                let kind = match subtype {
                    8 => FrameKind::Beacon,
                    5 => FrameKind::ProbeResponse,
                    _ => FrameKind::Other,
                };
                let header_len = if order {
                    IEEE80211_HEADER_LEN + 4
                } else {
                    IEEE80211_HEADER_LEN
                };
                Some(Self {
                    kind,
                    source: addr2,
                    destination: addr1,
                    bssid: addr3,
                    eapol: None,
                    payload: data.get(header_len..)?.to_vec(),
                })
            }
            2 => {
                let mut header_len = IEEE80211_HEADER_LEN;
                if to_ds && from_ds {
                    header_len += 6;
                }
                if subtype & 0x8 != 0 {
                    // QoS control, plus HT control when the order bit is set
                    header_len += 2;
                    if order {
                        header_len += 4;
                    }
                }

                let bssid = match (to_ds, from_ds) {
                    (true, false) => addr1,
                    (false, true) => addr2,
                    _ => addr3,
                };
                let body = data.get(header_len..)?;

                let eapol = if !protected && body.starts_with(&LLC_SNAP_EAPOL) {
                    EapolHeader::parse(&body[LLC_SNAP_EAPOL.len()..])
                } else {
                    None
                };

                Some(match eapol {
                    Some(header) => Self::eapol(
                        addr2,
                        addr1,
                        bssid,
                        header,
                        body[LLC_SNAP_EAPOL.len() + EAPOL_HEADER_LEN..].to_vec(),
                    ),
                    None => Self {
                        kind: FrameKind::Other,
                        source: addr2,
                        destination: addr1,
                        bssid,
                        eapol: None,
                        payload: body.to_vec(),
                    },
                })
            }
            _ => None,
        }
    }
}

//! Synthetic handshakes for unit tests.
//!
//! `Fixture` builds a beacon and a self-consistent 4-way handshake whose
//! MICs are computed with the real key hierarchy, so a known passphrase
//! verifies against it.

use crate::crypto::{calculate_mic, calculate_pmk, calculate_ptk};
use crate::frame::{
    EapolHeader, Frame, MacAddr, EAPOL_KEY_TYPE, KEY_MIC, LLC_SNAP_EAPOL, REPLAY_COUNTER,
};
use crate::handshake::{extract, HandshakeContext};

pub const AP: MacAddr = MacAddr::new([0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F]);
pub const CLIENT: MacAddr = MacAddr::new([0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE]);

pub const LINKTYPE_IEEE802_11: u32 = 105;
pub const LINKTYPE_RADIOTAP: u32 = 127;

pub struct Fixture {
    pub ssid: Vec<u8>,
    pub passphrase: String,
    pub ap: MacAddr,
    pub client: MacAddr,
    pub anonce: [u8; 32],
    pub snonce: [u8; 32],
    /// Beacon followed by messages 1-4
    pub frames: Vec<Frame>,
    kck: Vec<u8>,
}

impl Fixture {
    pub fn new(ssid: &str, passphrase: &str) -> Self {
        Self::with_addresses(ssid, passphrase, AP, CLIENT)
    }

    pub fn with_addresses(ssid: &str, passphrase: &str, ap: MacAddr, client: MacAddr) -> Self {
        let mut anonce = [0u8; 32];
        let mut snonce = [0u8; 32];
        for i in 0..32 {
            anonce[i] = 0xA0 ^ i as u8;
            snonce[i] = 0x10 + i as u8;
        }

        let pmk = calculate_pmk(passphrase.as_bytes(), ssid.as_bytes());
        let ptk = calculate_ptk(&pmk, &ap, &client, &anonce, &snonce);
        let kck = ptk[..16].to_vec();

        let rsn_ie = rsn_element();
        let m1 = eapol_frame(ap, client, ap, 2, key_body(0x008a, 16, 1, &anonce, &[]));
        let mut m2 = eapol_frame(client, ap, ap, 1, key_body(0x010a, 0, 1, &snonce, &rsn_ie));
        let mut m3 = eapol_frame(ap, client, ap, 2, key_body(0x13ca, 16, 2, &anonce, &[0x5A; 56]));
        let mut m4 = eapol_frame(client, ap, ap, 1, key_body(0x030a, 0, 2, &[0u8; 32], &[]));
        for frame in [&mut m2, &mut m3, &mut m4] {
            seal(frame, &kck);
        }

        let beacon = Frame::beacon(ap, beacon_body(ssid.as_bytes()));

        Self {
            ssid: ssid.as_bytes().to_vec(),
            passphrase: passphrase.to_string(),
            ap,
            client,
            anonce,
            snonce,
            frames: vec![beacon, m1, m2, m3, m4],
            kck,
        }
    }

    /// Extracted context of the fixture's own frames
    pub fn context(&self) -> HandshakeContext {
        let f = &self.frames;
        extract(&f[0], [&f[1], &f[2], &f[3], &f[4]]).unwrap()
    }

    /// Replace the key data of message 4 and recompute its MIC
    pub fn set_m4_key_data(&mut self, data: &[u8]) {
        let m4 = &mut self.frames[4];
        m4.payload.truncate(93);
        m4.payload.extend_from_slice(&(data.len() as u16).to_be_bytes());
        m4.payload.extend_from_slice(data);
        if let Some(header) = m4.eapol.as_mut() {
            header.body_length = m4.payload.len() as u16;
        }
        seal(m4, &self.kck);
    }

    /// Messages 3 and 4 resent with another replay counter, MICs recomputed
    pub fn resent_exchange(&self, replay: u64) -> (Frame, Frame) {
        let mut m3 = self.frames[3].clone();
        let mut m4 = self.frames[4].clone();
        for frame in [&mut m3, &mut m4] {
            frame.payload[REPLAY_COUNTER].copy_from_slice(&replay.to_be_bytes());
            seal(frame, &self.kck);
        }
        (m3, m4)
    }

    /// The five frames as radiotap-wrapped 802.11 bytes
    pub fn raw_packets(&self) -> Vec<Vec<u8>> {
        self.frames
            .iter()
            .map(|frame| {
                if frame.is_beacon() {
                    radiotap(&beacon_bytes(frame.bssid, &self.ssid))
                } else {
                    radiotap(&eapol_bytes(frame))
                }
            })
            .collect()
    }
}

fn rsn_element() -> Vec<u8> {
    vec![
        0x30, 0x14, 0x01, 0x00, 0x00, 0x0F, 0xAC, 0x04, 0x01, 0x00, 0x00, 0x0F, 0xAC, 0x04, 0x01,
        0x00, 0x00, 0x0F, 0xAC, 0x02, 0x00, 0x00,
    ]
}

/// EAPOL-Key body: descriptor type, key info, key length, replay counter,
/// nonce, IV, RSC, ID, MIC (zero), key data length, key data
pub fn key_body(key_info: u16, key_len: u16, replay: u64, nonce: &[u8; 32], key_data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(95 + key_data.len());
    body.push(0x02);
    body.extend_from_slice(&key_info.to_be_bytes());
    body.extend_from_slice(&key_len.to_be_bytes());
    body.extend_from_slice(&replay.to_be_bytes());
    body.extend_from_slice(nonce);
    body.extend_from_slice(&[0u8; 16 + 8 + 8 + 16]);
    body.extend_from_slice(&(key_data.len() as u16).to_be_bytes());
    body.extend_from_slice(key_data);
    body
}

pub fn eapol_frame(
    source: MacAddr,
    destination: MacAddr,
    bssid: MacAddr,
    version: u8,
    body: Vec<u8>,
) -> Frame {
    let header = EapolHeader {
        version,
        packet_type: EAPOL_KEY_TYPE,
        body_length: body.len() as u16,
    };
    Frame::eapol(source, destination, bssid, header, body)
}

/// Compute and store the MIC of an EAPOL-Key frame.
fn seal(frame: &mut Frame, kck: &[u8]) {
    frame.payload[KEY_MIC].fill(0);
    let mut bytes = frame.eapol.map(|h| h.to_bytes().to_vec()).unwrap_or_default();
    bytes.extend_from_slice(&frame.payload);
    let mic = calculate_mic(kck, &bytes);
    frame.payload[KEY_MIC].copy_from_slice(&mic);
}

/// Beacon body: timestamp, interval, capabilities, then SSID, rates, DS and RSN elements
pub fn beacon_body(ssid: &[u8]) -> Vec<u8> {
    let mut body = vec![0u8; 8];
    body.extend_from_slice(&[0x64, 0x00, 0x11, 0x04]);
    body.push(0x00);
    body.push(ssid.len() as u8);
    body.extend_from_slice(ssid);
    body.extend_from_slice(&[0x01, 0x04, 0x82, 0x84, 0x8B, 0x96]);
    body.extend_from_slice(&[0x03, 0x01, 0x06]);
    body.extend_from_slice(&rsn_element());
    body
}

pub fn beacon_bytes(bssid: MacAddr, ssid: &[u8]) -> Vec<u8> {
    let mut raw = vec![0x80, 0x00, 0x00, 0x00];
    raw.extend_from_slice(&[0xFF; 6]);
    raw.extend_from_slice(bssid.octets());
    raw.extend_from_slice(bssid.octets());
    raw.extend_from_slice(&[0x10, 0x00]);
    raw.extend_from_slice(&beacon_body(ssid));
    raw
}

/// 802.11 data frame carrying an EAPOL record; FromDS when sent by the BSSID
pub fn eapol_bytes(frame: &Frame) -> Vec<u8> {
    let flags = if frame.source == frame.bssid { 0x02 } else { 0x01 };
    let mut raw = vec![0x08, flags, 0x00, 0x00];
    raw.extend_from_slice(frame.destination.octets());
    raw.extend_from_slice(frame.source.octets());
    raw.extend_from_slice(frame.bssid.octets());
    raw.extend_from_slice(&[0x20, 0x00]);
    raw.extend_from_slice(&LLC_SNAP_EAPOL);
    if let Some(header) = frame.eapol {
        raw.extend_from_slice(&header.to_bytes());
    }
    raw.extend_from_slice(&frame.payload);
    raw
}

/// Prefix a frame with a minimal 8-byte radiotap header
pub fn radiotap(frame: &[u8]) -> Vec<u8> {
    let mut raw = vec![0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
    raw.extend_from_slice(frame);
    raw
}

/// Little-endian legacy pcap file
pub fn pcap_file(packets: &[Vec<u8>], linktype: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&linktype.to_le_bytes());

    for (i, packet) in packets.iter().enumerate() {
        out.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(packet);
    }
    out
}

/// Little-endian pcapng file: one section, one interface
pub fn pcapng_file(packets: &[Vec<u8>], linktype: u16) -> Vec<u8> {
    let mut out = Vec::new();

    out.extend_from_slice(&0x0A0D_0D0Au32.to_le_bytes());
    out.extend_from_slice(&28u32.to_le_bytes());
    out.extend_from_slice(&0x1A2B_3C4Du32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(-1i64).to_le_bytes());
    out.extend_from_slice(&28u32.to_le_bytes());

    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&20u32.to_le_bytes());
    out.extend_from_slice(&linktype.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&20u32.to_le_bytes());

    for packet in packets {
        let padded = packet.len().div_ceil(4) * 4;
        let block_len = (32 + padded) as u32;
        out.extend_from_slice(&6u32.to_le_bytes());
        out.extend_from_slice(&block_len.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(packet);
        out.resize(out.len() + padded - packet.len(), 0);
        out.extend_from_slice(&block_len.to_le_bytes());
    }
    out
}

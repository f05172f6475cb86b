//! Builders for synthetic WPA2 captures.
#![allow(dead_code)]

use wpa_recover::{calculate_mic, calculate_pmk, calculate_ptk, MacAddr};

pub const AP: MacAddr = MacAddr::new([0x00, 0x14, 0x6C, 0x7E, 0x40, 0x80]);
pub const CLIENT: MacAddr = MacAddr::new([0x00, 0x13, 0x46, 0xFE, 0x32, 0x0C]);
pub const LINKTYPE_RADIOTAP: u32 = 127;

const LLC_SNAP_EAPOL: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];

pub fn anonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    for (i, b) in nonce.iter_mut().enumerate() {
        *b = 0x80 | i as u8;
    }
    nonce
}

pub fn snonce() -> [u8; 32] {
    let mut nonce = [0u8; 32];
    for (i, b) in nonce.iter_mut().enumerate() {
        *b = 0x3F ^ i as u8;
    }
    nonce
}

fn radiotap(frame: Vec<u8>) -> Vec<u8> {
    let mut raw = vec![0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
    raw.extend(frame);
    raw
}

fn header(frame_control: [u8; 2], addr1: MacAddr, addr2: MacAddr, addr3: MacAddr) -> Vec<u8> {
    let mut raw = vec![frame_control[0], frame_control[1], 0x3A, 0x01];
    raw.extend_from_slice(addr1.octets());
    raw.extend_from_slice(addr2.octets());
    raw.extend_from_slice(addr3.octets());
    raw.extend_from_slice(&[0x00, 0x00]);
    raw
}

pub fn beacon(ssid: &str) -> Vec<u8> {
    let mut raw = header([0x80, 0x00], MacAddr::new([0xFF; 6]), AP, AP);
    raw.extend_from_slice(&[0u8; 8]);
    raw.extend_from_slice(&[0x64, 0x00, 0x31, 0x04]);
    raw.push(0x00);
    raw.push(ssid.len() as u8);
    raw.extend_from_slice(ssid.as_bytes());
    raw.extend_from_slice(&[0x01, 0x02, 0x82, 0x84]);
    radiotap(raw)
}

/// Authentication request from the client, unrelated to the handshake
pub fn authentication() -> Vec<u8> {
    let mut raw = header([0xB0, 0x00], AP, CLIENT, AP);
    raw.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
    radiotap(raw)
}

struct Message {
    from_ap: bool,
    key_info: u16,
    replay: u64,
    nonce: [u8; 32],
    key_data: Vec<u8>,
}

impl Message {
    fn body(&self) -> Vec<u8> {
        let mut body = vec![0x02];
        body.extend_from_slice(&self.key_info.to_be_bytes());
        body.extend_from_slice(&[0x00, 0x10]);
        body.extend_from_slice(&self.replay.to_be_bytes());
        body.extend_from_slice(&self.nonce);
        body.extend_from_slice(&[0u8; 48]);
        body.extend_from_slice(&(self.key_data.len() as u16).to_be_bytes());
        body.extend_from_slice(&self.key_data);
        body
    }

    fn encode(&self, kck: Option<&[u8]>) -> Vec<u8> {
        let mut body = self.body();
        let mut eapol = vec![0x01, 0x03];
        eapol.extend_from_slice(&(body.len() as u16).to_be_bytes());
        if let Some(kck) = kck {
            let mut zeroed = eapol.clone();
            zeroed.extend_from_slice(&body);
            let mic = calculate_mic(kck, &zeroed);
            body[77..93].copy_from_slice(&mic);
        }
        eapol.extend_from_slice(&body);

        let mut raw = if self.from_ap {
            header([0x08, 0x02], CLIENT, AP, AP)
        } else {
            header([0x08, 0x01], AP, CLIENT, AP)
        };
        raw.extend_from_slice(&LLC_SNAP_EAPOL);
        raw.extend_from_slice(&eapol);
        radiotap(raw)
    }
}

/// Messages 1-4 of a handshake whose MICs verify for `passphrase`
pub fn handshake(ssid: &str, passphrase: &str) -> Vec<Vec<u8>> {
    let pmk = calculate_pmk(passphrase.as_bytes(), ssid.as_bytes());
    let ptk = calculate_ptk(&pmk, &AP, &CLIENT, &anonce(), &snonce());
    let kck = &ptk[..16];

    let messages = [
        Message { from_ap: true, key_info: 0x008a, replay: 7, nonce: anonce(), key_data: vec![] },
        Message { from_ap: false, key_info: 0x010a, replay: 7, nonce: snonce(), key_data: vec![0x30, 0x02, 0x01, 0x00] },
        Message { from_ap: true, key_info: 0x13ca, replay: 8, nonce: anonce(), key_data: vec![0x5A; 56] },
        Message { from_ap: false, key_info: 0x030a, replay: 8, nonce: [0u8; 32], key_data: vec![] },
    ];

    messages
        .iter()
        .enumerate()
        .map(|(i, m)| m.encode(if i == 0 { None } else { Some(kck) }))
        .collect()
}

/// Little-endian legacy pcap file
pub fn pcap(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&4u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&65535u32.to_le_bytes());
    out.extend_from_slice(&LINKTYPE_RADIOTAP.to_le_bytes());
    for packet in packets {
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
        out.extend_from_slice(packet);
    }
    out
}

/// Beacon at 0, three management frames, a second beacon, then the handshake at 5..=8
pub fn capture_file(ssid: &str, passphrase: &str) -> Vec<u8> {
    let mut packets = vec![beacon(ssid), authentication(), authentication(), authentication(), beacon(ssid)];
    packets.extend(handshake(ssid, passphrase));
    pcap(&packets)
}

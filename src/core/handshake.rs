/*!
 * WPA2 4-way handshake extraction
 *
 * Turns the beacon and the four EAPOL-Key messages of a handshake into a
 * `HandshakeContext`: every value needed to test passphrases offline.
 * Extraction is strict; a frame that is missing, truncated, out of order or
 * addressed to the wrong station fails with an error naming that frame.
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CrackError, ExtractionError, FrameRole};
use crate::frame::{
    Frame, KeyInfo, MacAddr, EAPOL_HEADER_LEN, KEY_BODY_MIN_LEN, KEY_MIC, KEY_NONCE,
};

/// Only HMAC-SHA1 / PRF-512 handshakes (WPA2-PSK) are supported
const SUPPORTED_KEY_VERSION: u8 = 2;

const MAX_SSID_LEN: usize = 32;

/// WPA2 4-way handshake data structure
///
/// Contains all necessary information to test a passphrase offline:
/// - SSID (PBKDF2 salt)
/// - AP and client MAC addresses
/// - ANonce and SNonce (random nonces from the handshake)
/// - MIC (Message Integrity Code to verify the passphrase)
/// - EAPOL frame for MIC calculation
///
/// Built once per capture and shared read-only between all workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeContext {
    /// Network SSID as broadcast, raw bytes
    #[serde(with = "hex::serde")]
    pub ssid: Vec<u8>,

    /// AP MAC address (authenticator)
    pub ap_mac: MacAddr,

    /// Client/Station MAC address (supplicant)
    pub client_mac: MacAddr,

    /// Authenticator Nonce (from message 1)
    #[serde(with = "hex::serde")]
    pub anonce: [u8; 32],

    /// Supplicant Nonce (from message 2)
    #[serde(with = "hex::serde")]
    pub snonce: [u8; 32],

    /// MIC captured in message 4
    #[serde(with = "hex::serde")]
    pub mic: [u8; 16],

    /// EAPOL frame of message 4 with the MIC field zeroed
    #[serde(with = "hex::serde")]
    pub eapol_frame: Vec<u8>,
}

impl HandshakeContext {
    /// SSID for display; non-UTF-8 bytes are replaced
    pub fn ssid_lossy(&self) -> String {
        String::from_utf8_lossy(&self.ssid).into_owned()
    }

    /// Save handshake to file (JSON format for simplicity)
    pub fn save_to_file(&self, path: &Path) -> Result<(), CrackError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| CrackError::HandshakeIo {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load handshake from file
    pub fn load_from_file(path: &Path) -> Result<Self, CrackError> {
        let json = std::fs::read_to_string(path).map_err(|source| CrackError::HandshakeIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Extract the handshake context from a beacon and messages 1-4.
///
/// - SSID: SSID element of the beacon
/// - AP / client MAC: transmitter / receiver of message 1
/// - ANonce / SNonce: key nonce of message 1 / message 2
/// - MIC: key MIC of message 4
/// - EAPOL frame: message 4 rebuilt from its header and declared length,
///   MIC zeroed
pub fn extract(beacon: &Frame, messages: [&Frame; 4]) -> Result<HandshakeContext, ExtractionError> {
    let ssid = extract_ssid(beacon)?;

    for (frame, role) in messages.iter().zip(FrameRole::MESSAGES) {
        check_message(frame, role)?;
    }
    let [m1, m2, m3, m4] = messages;

    let ap_mac = m1.source;
    let client_mac = m1.destination;
    check_direction(m2, FrameRole::Message2, client_mac, ap_mac)?;
    check_direction(m3, FrameRole::Message3, ap_mac, client_mac)?;
    check_direction(m4, FrameRole::Message4, client_mac, ap_mac)?;

    check_replay(m1, m2, FrameRole::Message2)?;
    check_replay(m3, m4, FrameRole::Message4)?;

    let anonce = read_nonce(m1, FrameRole::Message1)?;
    let snonce = read_nonce(m2, FrameRole::Message2)?;
    if read_nonce(m3, FrameRole::Message3)? != anonce {
        return Err(ExtractionError::NonceMismatch {
            frame: FrameRole::Message3,
        });
    }

    let (mic, eapol_frame) = mic_and_zeroed_frame(m4)?;

    tracing::debug!(
        ssid = %String::from_utf8_lossy(&ssid),
        ap = %ap_mac,
        client = %client_mac,
        eapol_len = eapol_frame.len(),
        "handshake extracted"
    );

    Ok(HandshakeContext {
        ssid,
        ap_mac,
        client_mac,
        anonce,
        snonce,
        mic,
        eapol_frame,
    })
}

fn extract_ssid(beacon: &Frame) -> Result<Vec<u8>, ExtractionError> {
    let frame = FrameRole::Beacon;
    if !beacon.is_beacon() {
        return Err(ExtractionError::NotABeacon { frame });
    }
    let ssid = beacon
        .ssid_element()
        .ok_or(ExtractionError::MissingSsid { frame })?;
    if ssid.len() > MAX_SSID_LEN {
        return Err(ExtractionError::SsidTooLong {
            frame,
            len: ssid.len(),
        });
    }
    Ok(ssid.to_vec())
}

/// Check that a frame is the EAPOL-Key message its position claims.
fn check_message(frame: &Frame, role: FrameRole) -> Result<(), ExtractionError> {
    match frame.eapol {
        Some(header) if header.is_key() => {}
        _ => return Err(ExtractionError::NotEapolKey { frame: role }),
    }
    if frame.payload.len() < KEY_BODY_MIN_LEN {
        return Err(ExtractionError::Truncated {
            frame: role,
            field: "EAPOL-Key body",
            needed: KEY_BODY_MIN_LEN,
            actual: frame.payload.len(),
        });
    }

    let key_info = frame
        .key_info()
        .ok_or(ExtractionError::NotEapolKey { frame: role })?;
    let version = key_info.descriptor_version();
    if version != SUPPORTED_KEY_VERSION {
        return Err(ExtractionError::UnsupportedKeyVersion {
            frame: role,
            version,
        });
    }

    let expected = match role {
        FrameRole::Message1 => 1,
        FrameRole::Message2 => 2,
        FrameRole::Message3 => 3,
        FrameRole::Message4 => 4,
        FrameRole::Beacon => 0,
    };
    if key_info.message_number() != Some(expected) {
        return Err(ExtractionError::UnexpectedMessage {
            frame: role,
            key_info: key_info.0,
        });
    }
    Ok(())
}

fn check_direction(
    frame: &Frame,
    role: FrameRole,
    sender: MacAddr,
    receiver: MacAddr,
) -> Result<(), ExtractionError> {
    if frame.source == sender && frame.destination == receiver {
        return Ok(());
    }
    Err(ExtractionError::AddressMismatch {
        frame: role,
        sender: frame.source,
        receiver: frame.destination,
        expected_sender: sender,
        expected_receiver: receiver,
    })
}

/// The reply to a message echoes its replay counter.
fn check_replay(request: &Frame, reply: &Frame, role: FrameRole) -> Result<(), ExtractionError> {
    let expected = request.replay_counter().unwrap_or_default();
    let actual = reply.replay_counter().unwrap_or_default();
    if expected != actual {
        return Err(ExtractionError::ReplayCounterMismatch {
            frame: role,
            expected,
            actual,
        });
    }
    Ok(())
}

fn read_nonce(frame: &Frame, role: FrameRole) -> Result<[u8; 32], ExtractionError> {
    frame
        .payload
        .get(KEY_NONCE)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(ExtractionError::Truncated {
            frame: role,
            field: "key nonce",
            needed: KEY_NONCE.end,
            actual: frame.payload.len(),
        })
}

/// Claimed MIC of message 4 and the frame the MIC was computed over.
///
/// The frame is `header || body[..77] || 16 zero bytes || body[93..declared]`.
/// Its length follows the declared EAPOL body length; a body shorter than
/// declared is an error, bytes beyond it (padding, FCS) are dropped.
fn mic_and_zeroed_frame(m4: &Frame) -> Result<([u8; 16], Vec<u8>), ExtractionError> {
    let role = FrameRole::Message4;
    let header = m4.eapol.ok_or(ExtractionError::NotEapolKey { frame: role })?;

    let declared = header.body_length as usize;
    if declared < KEY_BODY_MIN_LEN {
        return Err(ExtractionError::DeclaredLengthTooShort {
            frame: role,
            declared,
            minimum: KEY_BODY_MIN_LEN,
        });
    }
    let body = m4
        .payload
        .get(..declared)
        .ok_or(ExtractionError::Truncated {
            frame: role,
            field: "declared EAPOL body",
            needed: declared,
            actual: m4.payload.len(),
        })?;

    let mut mic = [0u8; 16];
    mic.copy_from_slice(&body[KEY_MIC]);

    let mut eapol_frame = Vec::with_capacity(EAPOL_HEADER_LEN + declared);
    eapol_frame.extend_from_slice(&header.to_bytes());
    eapol_frame.extend_from_slice(&body[..KEY_MIC.start]);
    eapol_frame.extend_from_slice(&[0u8; 16]);
    eapol_frame.extend_from_slice(&body[KEY_MIC.end..]);

    Ok((mic, eapol_frame))
}

/// Message number of an EAPOL-Key frame, if it is one of M1-M4
pub fn message_number(frame: &Frame) -> Option<u8> {
    frame.key_info().and_then(KeyInfo::message_number)
}

/*!
 * Error types
 *
 * Extraction errors are fatal for a capture and always name the frame and
 * the field that could not be read. Malformed candidates never abort a run;
 * the driver skips and counts them.
 */

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::frame::MacAddr;

/// Result type alias for cracking operations.
pub type Result<T, E = CrackError> = std::result::Result<T, E>;

/// Which of the five input frames an extraction error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRole {
    Beacon,
    Message1,
    Message2,
    Message3,
    Message4,
}

impl FrameRole {
    /// Roles of the four handshake messages, in order.
    pub const MESSAGES: [FrameRole; 4] = [
        FrameRole::Message1,
        FrameRole::Message2,
        FrameRole::Message3,
        FrameRole::Message4,
    ];
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRole::Beacon => write!(f, "beacon"),
            FrameRole::Message1 => write!(f, "message 1"),
            FrameRole::Message2 => write!(f, "message 2"),
            FrameRole::Message3 => write!(f, "message 3"),
            FrameRole::Message4 => write!(f, "message 4"),
        }
    }
}

/// The handshake frames do not describe a usable WPA2-PSK 4-way handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("{frame}: not a beacon or probe response frame")]
    NotABeacon { frame: FrameRole },

    #[error("{frame}: no SSID element in the management body")]
    MissingSsid { frame: FrameRole },

    #[error("{frame}: SSID element is {len} bytes long, at most 32 are allowed")]
    SsidTooLong { frame: FrameRole, len: usize },

    #[error("{frame}: not an EAPOL-Key frame")]
    NotEapolKey { frame: FrameRole },

    #[error("{frame}: {field} needs {needed} bytes but only {actual} were captured")]
    Truncated {
        frame: FrameRole,
        field: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("{frame}: key descriptor version {version} is not supported (expected 2, HMAC-SHA1)")]
    UnsupportedKeyVersion { frame: FrameRole, version: u8 },

    #[error("{frame}: key information {key_info:#06x} does not describe {frame}")]
    UnexpectedMessage { frame: FrameRole, key_info: u16 },

    #[error("{frame}: sent {sender} -> {receiver}, expected {expected_sender} -> {expected_receiver}")]
    AddressMismatch {
        frame: FrameRole,
        sender: MacAddr,
        receiver: MacAddr,
        expected_sender: MacAddr,
        expected_receiver: MacAddr,
    },

    #[error("{frame}: replay counter {actual} does not match {expected}")]
    ReplayCounterMismatch {
        frame: FrameRole,
        expected: u64,
        actual: u64,
    },

    #[error("{frame}: ANonce differs from the one sent in message 1")]
    NonceMismatch { frame: FrameRole },

    #[error("{frame}: declared EAPOL body length {declared} is below the {minimum}-byte EAPOL-Key minimum")]
    DeclaredLengthTooShort {
        frame: FrameRole,
        declared: usize,
        minimum: usize,
    },
}

/// Reading or searching a capture file failed.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read capture: {0}")]
    Read(String),

    #[error("unsupported link type {0} (expected 802.11 or radiotap)")]
    UnsupportedLinkType(i32),

    #[error("capture has no packet at index {index} ({total} packets)")]
    MissingFrame { index: usize, total: usize },

    #[error("packet {index} is not a decodable 802.11 frame")]
    Undecodable { index: usize },

    #[error("no complete 4-way handshake (messages 1-4 of one AP/client pair) found")]
    NoHandshake,

    #[error("no beacon or probe response found for AP {0}")]
    NoBeacon(MacAddr),
}

/// Reading the wordlist failed.
#[derive(Error, Debug)]
pub enum WordlistError {
    #[error("failed to open wordlist {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read wordlist at line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

/// A wordlist line that cannot be used as a passphrase candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedCandidate {
    #[error("line {line}: empty")]
    Empty { line: u64 },

    #[error("line {line}: not valid UTF-8")]
    InvalidUtf8 { line: u64 },

    #[error("line {line}: {len} bytes is outside the 8-63 WPA passphrase range")]
    Length { line: u64, len: usize },
}

/// Top-level error for the cracking pipeline.
#[derive(Error, Debug)]
pub enum CrackError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Wordlist(#[from] WordlistError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("handshake file {path}: {source}")]
    HandshakeIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake file is not valid JSON: {0}")]
    HandshakeFormat(#[from] serde_json::Error),
}

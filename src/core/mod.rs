//! WPA2-Personal passphrase recovery from a captured 4-way handshake.
//!
//! Pipeline: [`capture`] reads frames, [`handshake::extract`] builds a
//! [`HandshakeContext`], [`crypto`] derives and verifies keys and
//! [`bruteforce::OfflineBruteForcer`] drives a wordlist through them.

// Core library modules
pub mod bruteforce;
pub mod capture;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod report;
pub mod wordlist;

#[cfg(test)]
mod testutil;

// Re-exports
pub use bruteforce::{
    CrackOutcome, CrackProgress, CrackReport, CrackerConfig, OfflineBruteForcer, Recovered,
};
pub use capture::{Capture, HandshakeFrames};
pub use crypto::{
    calculate_mic, calculate_pmk, calculate_ptk, derive_keys, verify, verify_passphrase,
    DerivedKeyMaterial,
};
pub use error::{
    CaptureError, CrackError, ExtractionError, FrameRole, MalformedCandidate, Result,
    WordlistError,
};
pub use frame::{Frame, MacAddr};
pub use handshake::{extract, HandshakeContext};
pub use report::RecoveryReport;
pub use wordlist::{Candidate, Wordlist, WordlistLine};

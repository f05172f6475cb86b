/*!
 * Key report
 *
 * Everything that went into the key derivation for a passphrase and
 * everything that came out of it, as lowercase hex.
 */

use std::fmt::Write as _;

use serde::Serialize;

use crate::crypto::{self, DerivedKeyMaterial};
use crate::frame::MacAddr;
use crate::handshake::HandshakeContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub passphrase: String,
    /// Wordlist line the passphrase was found on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u64>,
    pub ssid: String,
    pub ap_mac: MacAddr,
    pub client_mac: MacAddr,
    pub anonce: String,
    pub snonce: String,
    pub pmk: String,
    pub ptk: String,
    pub kck: String,
    pub kek: String,
    pub tk: String,
    pub mick: String,
    /// MIC computed with this passphrase's KCK
    pub mic: String,
    /// MIC captured in message 4
    pub captured_mic: String,
    pub verified: bool,
}

impl RecoveryReport {
    pub fn from_parts(
        passphrase: &str,
        line: Option<u64>,
        context: &HandshakeContext,
        keys: &DerivedKeyMaterial,
    ) -> Self {
        let mic = crypto::calculate_mic(keys.kck(), &context.eapol_frame);
        Self {
            passphrase: passphrase.to_string(),
            line,
            ssid: context.ssid_lossy(),
            ap_mac: context.ap_mac,
            client_mac: context.client_mac,
            anonce: hex::encode(context.anonce),
            snonce: hex::encode(context.snonce),
            pmk: hex::encode(keys.pmk()),
            ptk: hex::encode(keys.ptk()),
            kck: hex::encode(keys.kck()),
            kek: hex::encode(keys.kek()),
            tk: hex::encode(keys.tk()),
            mick: hex::encode(keys.mick()),
            mic: hex::encode(mic),
            captured_mic: hex::encode(context.mic),
            verified: crypto::verify(keys, context),
        }
    }

    /// Two-section text block: the derivation inputs, then the key expansion.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Values used to derive keys");
        let _ = writeln!(out, "==========================");
        let _ = writeln!(out, "Passphrase:   {}", self.passphrase);
        let _ = writeln!(out, "SSID:         {}", self.ssid);
        let _ = writeln!(out, "AP MAC:       {}", self.ap_mac);
        let _ = writeln!(out, "Client MAC:   {}", self.client_mac);
        let _ = writeln!(out, "AP Nonce:     {}", self.anonce);
        let _ = writeln!(out, "Client Nonce: {}", self.snonce);
        let _ = writeln!(out);
        let _ = writeln!(out, "Results of the key expansion");
        let _ = writeln!(out, "============================");
        let _ = writeln!(out, "PMK:          {}", self.pmk);
        let _ = writeln!(out, "PTK:          {}", self.ptk);
        let _ = writeln!(out, "KCK:          {}", self.kck);
        let _ = writeln!(out, "KEK:          {}", self.kek);
        let _ = writeln!(out, "TK:           {}", self.tk);
        let _ = writeln!(out, "MICK:         {}", self.mick);
        let _ = writeln!(out, "MIC:          {}", self.mic);
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

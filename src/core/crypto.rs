/*!
 * WPA2-PSK cryptographic functions
 *
 * Implements the key hierarchy of a WPA2-Personal 4-way handshake:
 * - PMK (Pairwise Master Key) derivation using PBKDF2-HMAC-SHA1
 * - PTK (Pairwise Transient Key) expansion using the 802.11i PRF-512
 * - MIC (Message Integrity Code) calculation and verification
 *
 * References:
 * - IEEE 802.11i-2004 standard
 * - RFC 2898 (PBKDF2)
 */

use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::frame::MacAddr;
use crate::handshake::HandshakeContext;

type HmacSha1 = Hmac<Sha1>;

/// Label of the pairwise key expansion. Must never vary.
pub const PRF_LABEL: &[u8] = b"Pairwise key expansion";

/// PBKDF2 iteration count fixed by 802.11i
pub const PMK_ITERATIONS: u32 = 4096;

pub const PMK_LEN: usize = 32;
pub const PTK_LEN: usize = 64;
pub const SUB_KEY_LEN: usize = 16;
pub const MIC_LEN: usize = 16;

/// Calculate PMK (Pairwise Master Key) from passphrase and SSID
///
/// PMK = PBKDF2(passphrase, SSID, 4096 iterations, 256 bits)
///
/// This is the most computationally expensive part of WPA2 cracking.
/// The passphrase is used as raw bytes, never re-encoded.
#[inline]
pub fn calculate_pmk(passphrase: &[u8], ssid: &[u8]) -> [u8; PMK_LEN] {
    let mut pmk = [0u8; PMK_LEN];
    pbkdf2_hmac::<Sha1>(passphrase, ssid, PMK_ITERATIONS, &mut pmk);
    pmk
}

/// Calculate PTK (Pairwise Transient Key) from PMK and handshake data
///
/// PTK = PRF-512(PMK, "Pairwise key expansion",
///               min(AA, SPA) || max(AA, SPA) || min(ANonce, SNonce) || max(ANonce, SNonce))
///
/// Ordering is byte-lexicographic, so swapping the AP/client or
/// ANonce/SNonce arguments yields the same PTK.
#[inline]
pub fn calculate_ptk(
    pmk: &[u8; PMK_LEN],
    ap_mac: &MacAddr,
    client_mac: &MacAddr,
    anonce: &[u8; 32],
    snonce: &[u8; 32],
) -> [u8; PTK_LEN] {
    let mut data = [0u8; 76]; // 6 + 6 + 32 + 32

    let (low_mac, high_mac) = if ap_mac < client_mac {
        (ap_mac, client_mac)
    } else {
        (client_mac, ap_mac)
    };
    data[0..6].copy_from_slice(low_mac.octets());
    data[6..12].copy_from_slice(high_mac.octets());

    let (low_nonce, high_nonce) = if anonce < snonce {
        (anonce, snonce)
    } else {
        (snonce, anonce)
    };
    data[12..44].copy_from_slice(low_nonce);
    data[44..76].copy_from_slice(high_nonce);

    prf_512(pmk, PRF_LABEL, &data)
}

/// PRF-512: 802.11i pseudo-random function producing 64 bytes
///
/// Block i is HMAC-SHA1(key, label || 0x00 || data || i); four 20-byte
/// blocks are concatenated and truncated to 64 bytes.
pub fn prf_512(key: &[u8], label: &[u8], data: &[u8]) -> [u8; PTK_LEN] {
    let mut result = [0u8; PTK_LEN];

    let base = {
        let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
        mac.update(label);
        mac.update(&[0x00]);
        mac.update(data);
        mac
    };

    for (i, block) in result.chunks_mut(20).enumerate() {
        let mut mac = base.clone();
        mac.update(&[i as u8]);
        let hash = mac.finalize().into_bytes();
        block.copy_from_slice(&hash[..block.len()]);
    }

    result
}

/// Calculate the WPA2 MIC of an EAPOL frame
///
/// MIC = HMAC-SHA1(KCK, EAPOL_frame)[0..16]
///
/// `eapol_frame` must have its MIC field zeroed.
#[inline]
pub fn calculate_mic(kck: &[u8], eapol_frame: &[u8]) -> [u8; MIC_LEN] {
    let mut mac = HmacSha1::new_from_slice(kck).expect("HMAC can take key of any size");
    mac.update(eapol_frame);
    let hash = mac.finalize().into_bytes();

    let mut mic = [0u8; MIC_LEN];
    mic.copy_from_slice(&hash[..MIC_LEN]);
    mic
}

/// Key material derived for one candidate passphrase.
///
/// The PTK is KCK | KEK | TK | MICK, 16 bytes each. Wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKeyMaterial {
    pmk: [u8; PMK_LEN],
    ptk: [u8; PTK_LEN],
}

impl DerivedKeyMaterial {
    pub fn new(pmk: [u8; PMK_LEN], ptk: [u8; PTK_LEN]) -> Self {
        Self { pmk, ptk }
    }

    pub fn pmk(&self) -> &[u8; PMK_LEN] {
        &self.pmk
    }

    pub fn ptk(&self) -> &[u8; PTK_LEN] {
        &self.ptk
    }

    /// Key Confirmation Key, used for the handshake MIC
    pub fn kck(&self) -> &[u8] {
        &self.ptk[..SUB_KEY_LEN]
    }

    /// Key Encryption Key
    pub fn kek(&self) -> &[u8] {
        &self.ptk[SUB_KEY_LEN..2 * SUB_KEY_LEN]
    }

    /// Temporal Key
    pub fn tk(&self) -> &[u8] {
        &self.ptk[2 * SUB_KEY_LEN..3 * SUB_KEY_LEN]
    }

    /// Michael MIC key (TKIP only, derived for completeness)
    pub fn mick(&self) -> &[u8] {
        &self.ptk[3 * SUB_KEY_LEN..]
    }
}

impl std::fmt::Debug for DerivedKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyMaterial").finish_non_exhaustive()
    }
}

impl Drop for DerivedKeyMaterial {
    fn drop(&mut self) {
        self.pmk.zeroize();
        self.ptk.zeroize();
    }
}

/// Derive PMK and PTK for a candidate passphrase against a handshake
pub fn derive_keys(passphrase: impl AsRef<[u8]>, context: &HandshakeContext) -> DerivedKeyMaterial {
    let pmk = calculate_pmk(passphrase.as_ref(), &context.ssid);
    let ptk = calculate_ptk(
        &pmk,
        &context.ap_mac,
        &context.client_mac,
        &context.anonce,
        &context.snonce,
    );
    DerivedKeyMaterial::new(pmk, ptk)
}

/// Recompute the handshake MIC with the derived KCK and compare it, in
/// constant time, with the MIC captured on the wire.
pub fn verify(keys: &DerivedKeyMaterial, context: &HandshakeContext) -> bool {
    let calculated = calculate_mic(keys.kck(), &context.eapol_frame);
    calculated[..].ct_eq(&context.mic[..]).into()
}

/// Verify if a passphrase is correct by comparing the calculated MIC with
/// the captured MIC
///
/// 1. Calculate PMK from passphrase and SSID
/// 2. Calculate PTK from PMK and handshake data
/// 3. Calculate MIC using the KCK (first 16 bytes of PTK)
/// 4. Compare with the captured MIC
#[inline]
pub fn verify_passphrase(passphrase: impl AsRef<[u8]>, context: &HandshakeContext) -> bool {
    let keys = derive_keys(passphrase, context);
    verify(&keys, context)
}

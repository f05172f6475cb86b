use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wpa-recover")]
#[command(version)]
#[command(about = "Offline WPA2-Personal passphrase recovery - Educational use only", long_about = None)]
pub struct Args {
    /// Number of threads to use (default: CPU count)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose logging (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub mode: Mode,
}

/// Where the handshake sits in a capture.
///
/// Without indices the first complete handshake is located automatically.
#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct Location {
    /// Packet index of the beacon (0-based)
    #[arg(long, requires = "handshake_index")]
    pub beacon_index: Option<usize>,

    /// Packet index of handshake message 1; messages 2-4 follow it
    #[arg(long, requires = "beacon_index")]
    pub handshake_index: Option<usize>,
}

impl Location {
    pub fn indices(&self) -> Option<(usize, usize)> {
        self.beacon_index.zip(self.handshake_index)
    }
}

#[derive(Subcommand)]
pub enum Mode {
    /// Crack a captured handshake with a wordlist
    ///
    /// Tests every wordlist line, in order, against the handshake.
    /// The first line that verifies is reported with its full key material.
    ///
    /// Example: wpa-recover crack capture.cap rockyou.txt
    Crack {
        /// Capture file (.cap/.pcap) or handshake file (.json)
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,

        /// Path to wordlist file
        #[arg(value_name = "WORDLIST")]
        wordlist: PathBuf,

        #[command(flatten)]
        location: Location,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Skip lines outside the 8-63 character WPA passphrase range
        #[arg(long)]
        strict_length: bool,

        /// Report progress every N candidates
        #[arg(long, default_value = "500")]
        progress_interval: u64,
    },

    /// Derive and print the keys for a known passphrase
    ///
    /// Example: wpa-recover derive capture.cap "correct horse"
    Derive {
        /// Capture file (.cap/.pcap) or handshake file (.json)
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,

        /// Passphrase to derive keys from
        #[arg(value_name = "PASSPHRASE")]
        passphrase: String,

        #[command(flatten)]
        location: Location,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the handshake in a capture and save it as a handshake file
    ///
    /// Example: wpa-recover extract capture.cap -o handshake.json
    Extract {
        /// Capture file (.cap/.pcap)
        #[arg(value_name = "CAPTURE")]
        capture: PathBuf,

        #[command(flatten)]
        location: Location,

        /// Output handshake file (.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

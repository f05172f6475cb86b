/*!
 * wpa-recover command line
 *
 * Offline WPA2-Personal passphrase recovery:
 * - crack: test a wordlist against a captured handshake
 * - derive: print the full key material for a known passphrase
 * - extract: validate a capture's handshake and save it as JSON
 */

mod cli;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use cli::{Args, Location, Mode};
use wpa_recover::{
    derive_keys, Capture, CrackOutcome, CrackProgress, CrackerConfig, HandshakeContext,
    OfflineBruteForcer, RecoveryReport,
};

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.verbose);

    let threads = args.threads.unwrap_or_else(num_cpus::get);

    match args.mode {
        Mode::Crack {
            capture,
            wordlist,
            location,
            json,
            strict_length,
            progress_interval,
        } => {
            if !json {
                print_banner();
            }
            let config = CrackerConfig {
                threads,
                progress_interval,
                enforce_psk_length: strict_length,
                ..CrackerConfig::default()
            };
            handle_crack_mode(&capture, &wordlist, location, config, json)
        }
        Mode::Derive {
            capture,
            passphrase,
            location,
            json,
        } => {
            if !json {
                print_banner();
            }
            handle_derive_mode(&capture, &passphrase, location, json)
        }
        Mode::Extract {
            capture,
            location,
            output,
        } => {
            print_banner();
            handle_extract_mode(&capture, location, output.as_deref())
        }
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn print_banner() {
    println!(
        "\n{}",
        format!("📡 wpa-recover v{}", env!("CARGO_PKG_VERSION")).bold().cyan()
    );
    println!(
        "{}\n",
        "Offline WPA2-Personal passphrase recovery - Educational use only".dimmed()
    );
}

/// Load a handshake from a JSON handshake file or locate it in a capture.
fn load_context(path: &Path, location: Location) -> Result<HandshakeContext> {
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        if location.indices().is_some() {
            tracing::warn!("frame indices are ignored for handshake files");
        }
        return HandshakeContext::load_from_file(path)
            .with_context(|| format!("Failed to load handshake file {}", path.display()));
    }

    let capture = Capture::open(path)
        .with_context(|| format!("Failed to read capture {}", path.display()))?;
    let frames = match location.indices() {
        Some((beacon, first_message)) => capture.handshake_at(beacon, first_message),
        None => capture.find_handshake(),
    }
    .context("Failed to locate the handshake")?;

    frames.extract().context("Invalid handshake")
}

fn print_handshake(context: &HandshakeContext) {
    println!("{}", "Handshake:".bold());
    println!("  SSID:       {}", context.ssid_lossy().bold());
    println!("  AP MAC:     {}", context.ap_mac.to_string().cyan());
    println!("  Client MAC: {}", context.client_mac.to_string().cyan());
    println!("  MIC:        {}", hex::encode(context.mic).dimmed());
    println!();
}

/// Handle crack mode - offline wordlist attack against a handshake
fn handle_crack_mode(
    capture: &Path,
    wordlist: &Path,
    location: Location,
    config: CrackerConfig,
    json: bool,
) -> Result<ExitCode> {
    let context = load_context(capture, location)?;
    if !json {
        print_handshake(&context);
    }

    let cracker = OfflineBruteForcer::new(context, config)?;

    let stop = cracker.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "Ctrl-C handler not installed");
    }

    let total = count_lines(wordlist)?;
    let pb = if json {
        ProgressBar::hidden()
    } else {
        println!(
            "{}",
            format!(
                "🔓 Testing {} candidates with {} threads...",
                total,
                cracker.config().threads
            )
            .cyan()
        );
        ProgressBar::new(total)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {eta} {msg}")?
            .progress_chars("█▓▒░-"),
    );

    let mut on_progress = |progress: CrackProgress| {
        pb.set_position(progress.line);
        pb.set_message(format!("{:.0} pwd/s", progress.rate));
    };
    let report = cracker
        .crack_wordlist(
            wordlist,
            Some(&mut on_progress as &mut dyn FnMut(CrackProgress)),
        )
        .with_context(|| format!("Failed to crack with wordlist {}", wordlist.display()))?;
    pb.finish_and_clear();

    let found = match &report.outcome {
        CrackOutcome::Found(recovered) => {
            let result = RecoveryReport::from_parts(
                &recovered.passphrase,
                Some(recovered.line),
                cracker.context(),
                &recovered.keys,
            );
            if json {
                println!("{}", result.to_json()?);
            } else {
                println!(
                    "{} {} {}",
                    "✓ Passphrase found:".bold().green(),
                    recovered.passphrase.bold().cyan(),
                    format!("(line {})", recovered.line).dimmed()
                );
                println!("\n{}", result.render_text());
            }
            true
        }
        CrackOutcome::Exhausted | CrackOutcome::Stopped => {
            let stopped = matches!(report.outcome, CrackOutcome::Stopped);
            if json {
                let value = serde_json::json!({
                    "found": false,
                    "stopped": stopped,
                    "attempts": report.attempts,
                    "skipped": report.skipped,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if stopped {
                println!("{}", "✗ Interrupted before the wordlist was exhausted".yellow());
            } else {
                println!("{}", "✗ Passphrase not found in the wordlist".red());
            }
            false
        }
    };

    if !json {
        println!("{}", "Statistics:".bold());
        println!("  Attempts: {}", report.attempts.to_string().cyan());
        if report.skipped > 0 {
            println!("  Skipped:  {}", report.skipped.to_string().yellow());
        }
        println!("  Duration: {:.2}s", report.elapsed.as_secs_f64());
        println!(
            "  Speed:    {} passwords/second",
            format!("{:.0}", report.rate()).green()
        );
        if !found {
            println!("\n{}", "💡 Tips:".bold().yellow());
            println!("  - Try a larger wordlist (e.g., rockyou.txt)");
            println!("  - Check that the capture holds the right network's handshake");
        }
    }

    Ok(if found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Handle derive mode - full key material for one passphrase
fn handle_derive_mode(
    capture: &Path,
    passphrase: &str,
    location: Location,
    json: bool,
) -> Result<ExitCode> {
    let context = load_context(capture, location)?;
    let keys = derive_keys(passphrase, &context);
    let report = RecoveryReport::from_parts(passphrase, None, &context, &keys);

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.render_text());
        if report.verified {
            println!("{}", "✓ MIC matches the captured handshake".green());
        } else {
            println!(
                "{}",
                "✗ MIC does not match: wrong passphrase for this handshake".red()
            );
        }
    }

    Ok(if report.verified {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Handle extract mode - validate a capture and save its handshake
fn handle_extract_mode(capture: &Path, location: Location, output: Option<&Path>) -> Result<ExitCode> {
    let context = load_context(capture, location)?;
    print_handshake(&context);
    println!("  ANonce: {}", hex::encode(context.anonce));
    println!("  SNonce: {}", hex::encode(context.snonce));
    println!("  EAPOL:  {} bytes", context.eapol_frame.len());

    if let Some(path) = output {
        context
            .save_to_file(path)
            .with_context(|| format!("Failed to write handshake file {}", path.display()))?;
        println!(
            "\n{}",
            format!("✓ Saved handshake file: {}", path.display()).green()
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Number of lines in the wordlist, for the progress bar length
fn count_lines(path: &Path) -> Result<u64> {
    let file =
        File::open(path).with_context(|| format!("Failed to open wordlist {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut lines = 0u64;
    let mut last = b'\n';

    loop {
        let buf = reader
            .fill_buf()
            .with_context(|| format!("Failed to read wordlist {}", path.display()))?;
        let Some(&tail) = buf.last() else {
            break;
        };
        lines += buf.iter().filter(|b| **b == b'\n').count() as u64;
        last = tail;
        let len = buf.len();
        reader.consume(len);
    }

    if last != b'\n' {
        lines += 1;
    }
    Ok(lines)
}

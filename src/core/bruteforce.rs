/*!
 * Offline WPA2 bruteforce engine
 *
 * Tests wordlist candidates against an extracted handshake.
 *
 * - Candidates are read lazily in ordered batches
 * - Each batch is tested in parallel on a dedicated Rayon pool
 * - The lowest matching index wins, so the reported passphrase is always
 *   the earliest match in wordlist order regardless of thread count
 * - Malformed lines are skipped and counted, never fatal
 */

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::crypto::{self, DerivedKeyMaterial};
use crate::error::{Result, WordlistError};
use crate::handshake::HandshakeContext;
use crate::wordlist::{Candidate, Wordlist, WordlistLine};

/// Cracker configuration.
#[derive(Debug, Clone)]
pub struct CrackerConfig {
    /// Worker threads in the pool.
    pub threads: usize,
    /// Report progress every N candidates.
    pub progress_interval: u64,
    /// Candidates read from the wordlist per batch.
    pub batch_size: usize,
    /// Skip candidates outside the 8-63 byte WPA passphrase range.
    pub enforce_psk_length: bool,
}

impl Default for CrackerConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            progress_interval: 500,
            batch_size: 1024,
            enforce_psk_length: false,
        }
    }
}

/// Progress information.
#[derive(Debug, Clone)]
pub struct CrackProgress {
    /// Candidates tested so far.
    pub attempts: u64,
    /// Malformed lines skipped so far.
    pub skipped: u64,
    /// Last wordlist line read.
    pub line: u64,
    pub elapsed: Duration,
    /// Candidates per second.
    pub rate: f64,
}

/// The passphrase that verified, with the keys it produced.
#[derive(Debug)]
pub struct Recovered {
    pub passphrase: String,
    /// 1-based wordlist line
    pub line: u64,
    pub keys: DerivedKeyMaterial,
}

/// How a run ended.
#[derive(Debug)]
pub enum CrackOutcome {
    Found(Recovered),
    /// Every candidate was tested, none verified.
    Exhausted,
    /// Stopped through the stop handle.
    Stopped,
}

/// Crack result.
#[derive(Debug)]
pub struct CrackReport {
    pub outcome: CrackOutcome,
    pub attempts: u64,
    pub skipped: u64,
    pub elapsed: Duration,
}

impl CrackReport {
    pub fn found(&self) -> Option<&Recovered> {
        match &self.outcome {
            CrackOutcome::Found(recovered) => Some(recovered),
            _ => None,
        }
    }

    /// Average candidates per second
    pub fn rate(&self) -> f64 {
        rate(self.attempts, self.elapsed)
    }
}

fn rate(attempts: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        attempts as f64 / secs
    } else {
        0.0
    }
}

/// Offline bruteforce engine for WPA2 handshakes
pub struct OfflineBruteForcer {
    context: HandshakeContext,
    config: CrackerConfig,
    pool: rayon::ThreadPool,
    stop_flag: Arc<AtomicBool>,
    attempts: AtomicU64,
    skipped: AtomicU64,
}

impl OfflineBruteForcer {
    pub fn new(context: HandshakeContext, config: CrackerConfig) -> Result<Self> {
        let threads = config.threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .stack_size(4 * 1024 * 1024)
            .thread_name(|i| format!("wpa-worker-{}", i))
            .build()?;

        Ok(Self {
            context,
            config: CrackerConfig { threads, ..config },
            pool,
            stop_flag: Arc::new(AtomicBool::new(false)),
            attempts: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        })
    }

    /// Get a handle to signal stop from another thread (e.g. a Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    /// Candidates tested by the current or last run.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn context(&self) -> &HandshakeContext {
        &self.context
    }

    pub fn config(&self) -> &CrackerConfig {
        &self.config
    }

    /// Crack using a wordlist file.
    pub fn crack_wordlist(
        &self,
        path: &Path,
        on_progress: Option<&mut dyn FnMut(CrackProgress)>,
    ) -> Result<CrackReport> {
        tracing::info!(wordlist = %path.display(), "starting wordlist attack");
        let wordlist = Wordlist::open(path)?;
        self.crack(wordlist, on_progress)
    }

    /// Crack using an in-memory password list.
    pub fn crack_passwords<S: AsRef<[u8]>>(&self, passwords: &[S]) -> Result<CrackReport> {
        let lines = passwords
            .iter()
            .enumerate()
            .map(|(i, p)| Ok(WordlistLine::new(i as u64 + 1, p.as_ref())));
        self.crack(lines, None)
    }

    /// Test candidates in order until one verifies or the lines run out.
    pub fn crack<I>(
        &self,
        lines: I,
        mut on_progress: Option<&mut dyn FnMut(CrackProgress)>,
    ) -> Result<CrackReport>
    where
        I: IntoIterator<Item = std::result::Result<WordlistLine, WordlistError>>,
    {
        let start = Instant::now();
        let progress_interval = self.config.progress_interval.max(1);
        let batch_size = self.config.batch_size.max(1);
        let mut next_report = progress_interval;
        let mut last_line = 0;
        let mut lines = lines.into_iter();

        self.attempts.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);

        tracing::info!(
            ssid = %self.context.ssid_lossy(),
            ap = %self.context.ap_mac,
            threads = self.config.threads,
            "starting offline crack"
        );

        let outcome = loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                break CrackOutcome::Stopped;
            }

            let (batch, exhausted) = self.read_batch(&mut lines, batch_size, &mut last_line)?;
            if let Some((index, keys)) = self.test_batch(&batch) {
                let candidate = &batch[index];
                tracing::info!(line = candidate.line, "passphrase found");
                break CrackOutcome::Found(Recovered {
                    passphrase: candidate.passphrase.clone(),
                    line: candidate.line,
                    keys,
                });
            }

            let attempts = self.attempts();
            let skipped = self.skipped.load(Ordering::Relaxed);
            if exhausted || attempts + skipped >= next_report {
                let elapsed = start.elapsed();
                let progress = CrackProgress {
                    attempts,
                    skipped,
                    line: last_line,
                    elapsed,
                    rate: rate(attempts, elapsed),
                };
                tracing::debug!(
                    attempts,
                    skipped,
                    line = last_line,
                    rate = progress.rate,
                    "progress"
                );
                if let Some(cb) = on_progress.as_mut() {
                    cb(progress);
                }
                while next_report <= attempts + skipped {
                    next_report += progress_interval;
                }
            }

            if exhausted {
                break if self.stop_flag.load(Ordering::Relaxed) {
                    CrackOutcome::Stopped
                } else {
                    CrackOutcome::Exhausted
                };
            }
        };

        let report = CrackReport {
            outcome,
            attempts: self.attempts(),
            skipped: self.skipped.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
        };

        if report.skipped > 0 {
            tracing::warn!(skipped = report.skipped, "malformed wordlist lines skipped");
        }
        tracing::info!(
            attempts = report.attempts,
            elapsed = ?report.elapsed,
            rate = report.rate(),
            found = report.found().is_some(),
            "attack complete"
        );

        Ok(report)
    }

    /// Read up to `batch_size` valid candidates. Returns the batch and
    /// whether the lines ran out.
    fn read_batch<I>(
        &self,
        lines: &mut I,
        batch_size: usize,
        last_line: &mut u64,
    ) -> Result<(Vec<Candidate>, bool)>
    where
        I: Iterator<Item = std::result::Result<WordlistLine, WordlistError>>,
    {
        let mut batch = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            let Some(line) = lines.next() else {
                return Ok((batch, true));
            };
            let line = line?;
            *last_line = line.line;
            match Candidate::parse(line, self.config.enforce_psk_length) {
                Ok(candidate) => batch.push(candidate),
                Err(reason) => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%reason, "skipping candidate");
                }
            }
        }
        Ok((batch, false))
    }

    /// Test one batch in parallel; the lowest matching index wins.
    fn test_batch(&self, batch: &[Candidate]) -> Option<(usize, DerivedKeyMaterial)> {
        if batch.is_empty() {
            return None;
        }

        let chunk_size = (batch.len() / (self.config.threads * 4)).clamp(1, 256);
        let best = AtomicUsize::new(usize::MAX);
        let found: Mutex<Option<(usize, DerivedKeyMaterial)>> = Mutex::new(None);

        self.pool.install(|| {
            batch
                .par_chunks(chunk_size)
                .enumerate()
                .for_each(|(chunk_index, chunk)| {
                    for (offset, candidate) in chunk.iter().enumerate() {
                        let index = chunk_index * chunk_size + offset;
                        // Everything after a known match is irrelevant
                        if index > best.load(Ordering::Acquire)
                            || self.stop_flag.load(Ordering::Relaxed)
                        {
                            return;
                        }

                        self.attempts.fetch_add(1, Ordering::Relaxed);
                        let keys = crypto::derive_keys(&candidate.passphrase, &self.context);
                        if crypto::verify(&keys, &self.context) {
                            best.fetch_min(index, Ordering::AcqRel);
                            let mut slot = found.lock();
                            if slot.as_ref().map_or(true, |(i, _)| index < *i) {
                                *slot = Some((index, keys));
                            }
                            return;
                        }
                    }
                });
        });

        found.into_inner()
    }
}

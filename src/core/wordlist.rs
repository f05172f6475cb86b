/*!
 * Wordlist reading
 *
 * Wordlists are read lazily, one line at a time and in file order, so
 * multi-gigabyte lists never have to fit in memory. Lines are raw bytes;
 * turning a line into a passphrase candidate is a separate step that may
 * reject it without stopping the run.
 */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{MalformedCandidate, WordlistError};

/// Shortest and longest WPA-PSK passphrase, in bytes
pub const PSK_MIN_LEN: usize = 8;
pub const PSK_MAX_LEN: usize = 63;

/// One wordlist line with its line terminator removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordlistLine {
    /// 1-based line number
    pub line: u64,
    pub bytes: Vec<u8>,
}

impl WordlistLine {
    pub fn new(line: u64, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            line,
            bytes: bytes.into(),
        }
    }
}

/// Lazy line iterator over a wordlist
pub struct Wordlist<R> {
    reader: R,
    line: u64,
    buffer: Vec<u8>,
}

impl Wordlist<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, WordlistError> {
        let file = File::open(path).map_err(|source| WordlistError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Wordlist<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: Vec::with_capacity(64),
        }
    }
}

impl<R: BufRead> Iterator for Wordlist<R> {
    type Item = Result<WordlistLine, WordlistError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        self.line += 1;
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                let mut bytes = self.buffer.as_slice();
                if let [rest @ .., b'\n'] = bytes {
                    bytes = rest;
                }
                if let [rest @ .., b'\r'] = bytes {
                    bytes = rest;
                }
                Some(Ok(WordlistLine::new(self.line, bytes)))
            }
            Err(source) => Some(Err(WordlistError::Read {
                line: self.line,
                source,
            })),
        }
    }
}

/// A passphrase ready to be tested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub line: u64,
    pub passphrase: String,
}

impl Candidate {
    /// Validate a wordlist line. No trimming: surrounding spaces are part
    /// of the passphrase.
    pub fn parse(line: WordlistLine, enforce_psk_length: bool) -> Result<Self, MalformedCandidate> {
        let WordlistLine { line, bytes } = line;
        if bytes.is_empty() {
            return Err(MalformedCandidate::Empty { line });
        }
        if enforce_psk_length && !(PSK_MIN_LEN..=PSK_MAX_LEN).contains(&bytes.len()) {
            return Err(MalformedCandidate::Length {
                line,
                len: bytes.len(),
            });
        }
        let passphrase =
            String::from_utf8(bytes).map_err(|_| MalformedCandidate::InvalidUtf8 { line })?;
        Ok(Self { line, passphrase })
    }
}

//! Line-oriented streaming over the rule set.

use crate::{FilterResult, RuleSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest unterminated line held before it is flushed early.
pub const MAX_CARRY_BYTES: usize = 64 * 1024;

/// How far back from an early split an unfinished escape sequence is looked for.
const ESCAPE_LOOKBACK: usize = 64;

const READ_CHUNK: usize = 8 * 1024;

/// Open `path` for appending, creating it and its parent directory if needed.
pub fn open_append_sink(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Sanitizes bytes fed to it and writes whole lines to `sink`.
pub struct StreamFilter<W: Write> {
    rules: RuleSet,
    sink: W,
    carry: Vec<u8>,
    max_carry: usize,
    lines_written: u64,
}

impl<W: Write> StreamFilter<W> {
    pub fn new(rules: RuleSet, sink: W) -> Self {
        Self::with_max_carry(rules, sink, MAX_CARRY_BYTES)
    }

    pub fn with_max_carry(rules: RuleSet, sink: W, max_carry: usize) -> Self {
        Self {
            rules,
            sink,
            carry: Vec::new(),
            max_carry: max_carry.max(ESCAPE_LOOKBACK * 2),
            lines_written: 0,
        }
    }

    /// Feed a chunk of raw pane output.
    pub fn feed(&mut self, bytes: &[u8]) -> FilterResult<()> {
        self.carry.extend_from_slice(bytes);

        let mut start = 0;
        while let Some(offset) = self.carry[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset + 1;
            let line = self.carry[start..end].to_vec();
            self.write_segment(&line)?;
            self.lines_written += 1;
            start = end;
        }
        self.carry.drain(..start);

        while self.carry.len() > self.max_carry {
            let split = early_split_point(&self.carry, self.max_carry);
            let head: Vec<u8> = self.carry.drain(..split).collect();
            tracing::trace!(bytes = head.len(), "flushing long unterminated line");
            self.write_segment(&head)?;
        }

        self.sink.flush()?;
        Ok(())
    }

    /// Flush any unterminated tail and return the sink.
    pub fn finish(mut self) -> FilterResult<W> {
        if !self.carry.is_empty() {
            let tail = std::mem::take(&mut self.carry);
            self.write_segment(&tail)?;
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Complete lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Bytes currently held waiting for a newline.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    fn write_segment(&mut self, raw: &[u8]) -> FilterResult<()> {
        let text = String::from_utf8_lossy(raw);
        let clean = self.rules.apply(&text);
        self.sink.write_all(clean.as_bytes())?;
        Ok(())
    }
}

/// Where to cut an over-long carry: at most `limit` bytes, never inside a
/// UTF-8 character, and before a trailing escape sequence that has not
/// received its final byte yet.
fn early_split_point(buf: &[u8], limit: usize) -> usize {
    let mut split = limit.min(buf.len());

    // Continuation bytes look like 0b10xx_xxxx.
    while split > 0 && split < buf.len() && (buf[split] & 0xC0) == 0x80 {
        split -= 1;
    }

    let window_start = split.saturating_sub(ESCAPE_LOOKBACK);
    if let Some(esc) = buf[window_start..split].iter().rposition(|b| *b == 0x1b) {
        let esc = window_start + esc;
        if !escape_terminated(&buf[esc..split]) {
            split = esc;
        }
    }

    if split == 0 {
        limit.min(buf.len())
    } else {
        split
    }
}

/// Whether `seq` (starting at ESC) already contains a complete CSI sequence.
fn escape_terminated(seq: &[u8]) -> bool {
    match seq.get(1) {
        None => false,
        Some(b'[') => seq[2..].iter().any(|b| (0x40..=0x7e).contains(b)),
        Some(_) => true,
    }
}

/// Read `reader` to EOF, feeding everything through `filter`.
pub async fn pump<R, W>(mut reader: R, filter: &mut StreamFilter<W>) -> FilterResult<u64>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total += n as u64;
        filter.feed(&buf[..n])?;
    }

    Ok(total)
}

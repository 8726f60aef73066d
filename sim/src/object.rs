//! Loader for the textual object format (`.yo`) produced by the assembler.

use std::path::Path;

use anyhow::{bail, Context, Result};
use pest::Parser;
use pest_derive::Parser;

use crate::hardware::Memory;

#[derive(Parser)]
#[grammar = "object.pest"] // relative to src
struct ObjectParser;

/// Bytes of one object file line, to be placed at `addr`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk {
    addr: u64,
    bytes: Vec<u8>,
    /// 1-based source line, for error messages.
    line: usize,
}

/// Parsed object file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectImage {
    chunks: Vec<Chunk>,
}

fn decode_hex(digits: &str) -> Result<Vec<u8>> {
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits in `{}`", digits);
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid byte `{}`", &digits[i..i + 2]))
        })
        .collect()
}

impl ObjectImage {
    pub fn parse(src: &str) -> Result<Self> {
        let pairs = ObjectParser::parse(Rule::file, src).context("malformed object file")?;

        let mut chunks = Vec::new();
        for pair in pairs.flatten().filter(|p| p.as_rule() == Rule::record) {
            let (line, _) = pair.line_col();
            let mut addr = None;
            let mut bytes = Vec::new();
            for item in pair.into_inner() {
                match item.as_rule() {
                    Rule::addr => {
                        let value = u64::from_str_radix(&item.as_str()[2..], 16)
                            .with_context(|| format!("line {line}: address out of range"))?;
                        addr = Some(value);
                    }
                    Rule::bytes => {
                        bytes = decode_hex(item.as_str())
                            .with_context(|| format!("line {line}: bad instruction bytes"))?;
                    }
                    _ => {}
                }
            }
            let Some(addr) = addr else {
                bail!("line {line}: record without an address");
            };
            if !bytes.is_empty() {
                chunks.push(Chunk { addr, bytes, line });
            }
        }
        Ok(Self { chunks })
    }

    /// Total number of code and data bytes.
    pub fn byte_count(&self) -> usize {
        self.chunks.iter().map(|c| c.bytes.len()).sum()
    }

    /// Copy every chunk into `mem` and return the number of bytes written.
    /// An image without any bytes is rejected.
    pub fn load_into(&self, mem: &mut Memory) -> Result<usize> {
        let total = self.byte_count();
        if total == 0 {
            bail!("no lines of code found");
        }
        for chunk in &self.chunks {
            mem.write(chunk.addr, &chunk.bytes).with_context(|| {
                format!(
                    "line {}: {} bytes at {:#x} do not fit in {} bytes of memory",
                    chunk.line,
                    chunk.bytes.len(),
                    chunk.addr,
                    mem.capacity()
                )
            })?;
        }
        tracing::info!("{} bytes of code read", total);
        Ok(total)
    }
}

/// Read and parse an object file.
pub fn load_object_file(path: impl AsRef<Path>) -> Result<ObjectImage> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read file `{}`", path.display()))?;
    ObjectImage::parse(&content).with_context(|| format!("while loading `{}`", path.display()))
}

//! Digest accumulator for change detection between fetches.
//!
//! Bytes are appended with [`std::io::Write`]; [`DigestAccumulator::digest`]
//! hashes everything buffered since the previous digest or reset and then
//! empties the buffer. An accumulator belongs to one in-flight fetch at a time.

use std::fmt;
use std::io;

use sha2::{Digest as _, Sha256};

/// SHA-256 checksum of one payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Digest of an in-memory byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Buffers written bytes until a digest is requested.
#[derive(Debug, Default)]
pub struct DigestAccumulator {
    buf: Vec<u8>,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of everything written since the last digest or reset.
    /// Clears the buffer.
    pub fn digest(&mut self) -> Digest {
        let digest = Digest::of(&self.buf);
        self.buf.clear();
        digest
    }

    /// Drop buffered bytes without hashing them.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl io::Write for DigestAccumulator {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // sha256("")
    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_digest_covers_all_writes() {
        let mut acc = DigestAccumulator::new();
        acc.write_all(b"hello ").unwrap();
        acc.write_all(b"world").unwrap();

        assert_eq!(acc.digest(), Digest::of(b"hello world"));
        assert_eq!(
            Digest::of(b"hello world").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_digest_clears_buffer() {
        let mut acc = DigestAccumulator::new();
        acc.write_all(b"payload").unwrap();
        let _ = acc.digest();

        assert_eq!(acc.buffered(), 0);
        assert_eq!(acc.digest().to_hex(), EMPTY);
    }

    #[test]
    fn test_reset_discards_without_digest() {
        let mut acc = DigestAccumulator::new();
        acc.write_all(b"abandoned").unwrap();
        acc.reset();
        acc.write_all(b"fresh").unwrap();

        assert_eq!(acc.digest(), Digest::of(b"fresh"));
    }
}

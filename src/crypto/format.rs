//! Artifact header
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic "SEAL" | version u8 | cipher u8 | digest u8 | compression u8 | level u8
//! | iterations u32 | salt [16] | nonce [12] | name_len u16 | name (UTF-8)
//! ```
//!
//! The serialized header is authenticated as part of every segment's AAD.

use super::{CipherAlgo, CompressionAlgo, CryptoError, DigestAlgo};
use std::io::Read;

pub const MAGIC: &[u8; 4] = b"SEAL";
pub const VERSION: u8 = 1;
pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Upper bound on the KDF cost accepted when reading a header
const MAX_ITERATIONS: u32 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub cipher: CipherAlgo,
    pub digest: DigestAlgo,
    pub compression: CompressionAlgo,
    pub level: u8,
    pub iterations: u32,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// Original base filename, kept for provenance
    pub filename: String,
}

impl Header {
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        let name = self.filename.as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| {
            CryptoError::InvalidHeader(format!("filename too long ({} bytes)", name.len()))
        })?;

        let mut out = Vec::with_capacity(4 + 5 + 4 + SALT_LEN + NONCE_LEN + 2 + name.len());
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.push(self.cipher.id());
        out.push(self.digest.id());
        out.push(self.compression.id());
        out.push(self.level);
        out.extend_from_slice(&self.iterations.to_be_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&name_len.to_be_bytes());
        out.extend_from_slice(name);
        Ok(out)
    }

    /// Read a header, returning it together with its exact serialized bytes
    pub fn read_from<R: Read>(reader: &mut R) -> Result<(Self, Vec<u8>), CryptoError> {
        let mut fixed = [0u8; 4 + 5 + 4 + SALT_LEN + NONCE_LEN + 2];
        reader.read_exact(&mut fixed).map_err(truncated)?;

        if &fixed[0..4] != MAGIC {
            return Err(CryptoError::BadMagic);
        }
        if fixed[4] != VERSION {
            return Err(CryptoError::UnsupportedVersion(fixed[4]));
        }
        let cipher = CipherAlgo::from_id(fixed[5])?;
        let digest = DigestAlgo::from_id(fixed[6])?;
        let compression = CompressionAlgo::from_id(fixed[7])?;
        let level = fixed[8];
        if level > 9 {
            return Err(CryptoError::InvalidHeader(format!(
                "compression level {level} out of range"
            )));
        }
        let iterations = u32::from_be_bytes([fixed[9], fixed[10], fixed[11], fixed[12]]);
        if iterations == 0 || iterations > MAX_ITERATIONS {
            return Err(CryptoError::InvalidHeader(format!(
                "iteration count {iterations} out of range"
            )));
        }

        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&fixed[13..13 + SALT_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&fixed[13 + SALT_LEN..13 + SALT_LEN + NONCE_LEN]);

        let len_at = 13 + SALT_LEN + NONCE_LEN;
        let name_len = u16::from_be_bytes([fixed[len_at], fixed[len_at + 1]]) as usize;
        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name).map_err(truncated)?;

        let mut raw = fixed.to_vec();
        raw.extend_from_slice(&name);

        let filename = String::from_utf8(name)
            .map_err(|_| CryptoError::InvalidHeader("filename is not UTF-8".to_string()))?;

        Ok((
            Self {
                cipher,
                digest,
                compression,
                level,
                iterations,
                salt,
                nonce,
                filename,
            },
            raw,
        ))
    }
}

fn truncated(err: std::io::Error) -> CryptoError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        CryptoError::Truncated
    } else {
        CryptoError::Io(err)
    }
}

//! Encryption pipeline
//!
//! Turns a plaintext file into a temporary encrypted artifact under a
//! symmetric passphrase. The artifact is unarmored binary: a header that
//! records the algorithms, KDF salt and the original base filename, followed
//! by AEAD-sealed 64 KiB segments of the (optionally zlib-compressed)
//! plaintext. Segment nonces and AAD bind each segment to its position, to
//! the header and to whether it is the final one, so truncation or
//! reordering is detected by [`decrypt`].

mod cipher;
pub mod format;

use crate::types::SyncError;
use cipher::{derive_key, segment_aad, segment_nonce, SegmentCipher, TAG_LEN};
use flate2::read::ZlibEncoder;
use flate2::write::ZlibDecoder;
use flate2::Compression;
use format::{Header, NONCE_LEN, SALT_LEN};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::{NamedTempFile, TempPath};
use thiserror::Error;
use zeroize::Zeroizing;

/// Plaintext bytes per sealed segment
pub const SEGMENT_SIZE: usize = 64 * 1024;

/// Default PBKDF2 iteration count
pub const DEFAULT_ITERATIONS: u32 = 200_000;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("not a sealsync artifact (bad magic)")]
    BadMagic,
    #[error("unsupported artifact version {0}")]
    UnsupportedVersion(u8),
    #[error("unsupported cipher id {0}")]
    UnsupportedCipher(u8),
    #[error("unsupported digest id {0}")]
    UnsupportedDigest(u8),
    #[error("unsupported compression id {0}")]
    UnsupportedCompression(u8),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("encryption failed: {0}")]
    Seal(String),
    #[error("authentication failed (wrong passphrase or corrupted data)")]
    Authentication,
    #[error("artifact is truncated")]
    Truncated,
    #[error("unexpected data after final segment")]
    TrailingData,
    #[error("empty passphrase")]
    EmptyPassphrase,
}

/// Symmetric cipher, always used in an AEAD mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CipherAlgo {
    /// AES-128-GCM
    #[value(name = "aes128", alias = "aes")]
    Aes128,
    /// AES-256-GCM
    #[default]
    #[value(name = "aes256")]
    Aes256,
    /// ChaCha20-Poly1305
    #[value(name = "chacha20")]
    ChaCha20,
}

impl CipherAlgo {
    pub fn id(&self) -> u8 {
        match self {
            CipherAlgo::Aes128 => 1,
            CipherAlgo::Aes256 => 2,
            CipherAlgo::ChaCha20 => 3,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CryptoError> {
        match id {
            1 => Ok(CipherAlgo::Aes128),
            2 => Ok(CipherAlgo::Aes256),
            3 => Ok(CipherAlgo::ChaCha20),
            other => Err(CryptoError::UnsupportedCipher(other)),
        }
    }

    pub fn key_len(&self) -> usize {
        match self {
            CipherAlgo::Aes128 => 16,
            CipherAlgo::Aes256 | CipherAlgo::ChaCha20 => 32,
        }
    }
}

/// Digest driving the PBKDF2 key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DigestAlgo {
    #[default]
    #[value(name = "sha256")]
    Sha256,
    #[value(name = "sha512")]
    Sha512,
}

impl DigestAlgo {
    pub fn id(&self) -> u8 {
        match self {
            DigestAlgo::Sha256 => 1,
            DigestAlgo::Sha512 => 2,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CryptoError> {
        match id {
            1 => Ok(DigestAlgo::Sha256),
            2 => Ok(DigestAlgo::Sha512),
            other => Err(CryptoError::UnsupportedDigest(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CompressionAlgo {
    #[default]
    #[value(name = "none")]
    None,
    #[value(name = "zlib")]
    Zlib,
}

impl CompressionAlgo {
    pub fn id(&self) -> u8 {
        match self {
            CompressionAlgo::None => 0,
            CompressionAlgo::Zlib => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, CryptoError> {
        match id {
            0 => Ok(CompressionAlgo::None),
            1 => Ok(CompressionAlgo::Zlib),
            other => Err(CryptoError::UnsupportedCompression(other)),
        }
    }
}

/// Algorithm selection for newly encrypted artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionSettings {
    pub cipher: CipherAlgo,
    pub digest: DigestAlgo,
    pub compression: CompressionAlgo,
    /// 0-9, ignored without compression
    pub compression_level: u8,
    pub iterations: u32,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            cipher: CipherAlgo::default(),
            digest: DigestAlgo::default(),
            compression: CompressionAlgo::default(),
            compression_level: 6,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Temporary encrypted file produced by [`encrypt_file`].
///
/// The file is deleted when the artifact is dropped, so failure paths never
/// leak it; call [`Artifact::close`] after a successful upload to surface
/// deletion errors.
#[derive(Debug)]
pub struct Artifact {
    path: TempPath,
    size: u64,
}

impl Artifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the encrypted artifact in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Delete the temporary file
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Information recovered while decrypting an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedArtifact {
    /// Base filename embedded at encryption time
    pub filename: String,
    pub cipher: CipherAlgo,
    pub digest: DigestAlgo,
    pub compression: CompressionAlgo,
}

/// Holds the passphrase and settings for one run
pub struct Encryptor {
    passphrase: Zeroizing<String>,
    settings: EncryptionSettings,
}

impl Encryptor {
    pub fn new(passphrase: &str, settings: EncryptionSettings) -> Self {
        Self {
            passphrase: Zeroizing::new(passphrase.to_string()),
            settings,
        }
    }

    /// Encrypt one local file into a temporary artifact
    pub fn encrypt(&self, path: &Path) -> Result<Artifact, SyncError> {
        encrypt_file(path, &self.passphrase, &self.settings)
    }
}

/// Encrypt `path` into a new temporary artifact
///
/// # Errors
/// * `SyncError::Encryption` for any failure, including I/O errors reading
///   the input; the partially written artifact is removed.
pub fn encrypt_file(
    path: &Path,
    passphrase: &str,
    settings: &EncryptionSettings,
) -> Result<Artifact, SyncError> {
    seal_to_artifact(path, passphrase, settings).map_err(|e| SyncError::Encryption {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn seal_to_artifact(
    path: &Path,
    passphrase: &str,
    settings: &EncryptionSettings,
) -> Result<Artifact, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::EmptyPassphrase);
    }
    if settings.compression_level > 9 {
        return Err(CryptoError::InvalidHeader(format!(
            "compression level {} out of range",
            settings.compression_level
        )));
    }

    let input = File::open(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let header = Header {
        cipher: settings.cipher,
        digest: settings.digest,
        compression: settings.compression,
        level: settings.compression_level,
        iterations: settings.iterations,
        salt,
        nonce,
        filename,
    };

    let temp = NamedTempFile::new()?;
    let mut writer = BufWriter::new(temp.as_file());
    let mut reader: Box<dyn Read> = match settings.compression {
        CompressionAlgo::None => Box::new(BufReader::new(input)),
        CompressionAlgo::Zlib => Box::new(ZlibEncoder::new(
            BufReader::new(input),
            Compression::new(u32::from(settings.compression_level)),
        )),
    };

    let size = seal_stream(&mut reader, &mut writer, passphrase.as_bytes(), &header)?;
    writer.flush()?;
    drop(writer);

    Ok(Artifact {
        path: temp.into_temp_path(),
        size,
    })
}

/// Write header and sealed segments, returning the bytes written
fn seal_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    passphrase: &[u8],
    header: &Header,
) -> Result<u64, CryptoError> {
    let header_bytes = header.to_bytes()?;
    let key = derive_key(passphrase, header)?;
    let cipher = SegmentCipher::new(header.cipher, &key)?;

    writer.write_all(&header_bytes)?;
    let mut written = header_bytes.len() as u64;

    let mut current = vec![0u8; SEGMENT_SIZE];
    let mut next = vec![0u8; SEGMENT_SIZE];
    let mut current_len = read_full(reader, &mut current)?;
    let mut counter: u64 = 0;

    loop {
        // Look ahead one segment to know whether the current one is final
        let next_len = if current_len == SEGMENT_SIZE {
            read_full(reader, &mut next)?
        } else {
            0
        };
        let last = next_len == 0;

        let nonce = segment_nonce(&header.nonce, counter);
        let aad = segment_aad(&header_bytes, counter, last);
        let sealed = cipher.seal(&nonce, &current[..current_len], &aad)?;

        writer.write_all(&[u8::from(last)])?;
        writer.write_all(&(sealed.len() as u32).to_be_bytes())?;
        writer.write_all(&sealed)?;
        written += 5 + sealed.len() as u64;

        if last {
            break;
        }
        std::mem::swap(&mut current, &mut next);
        current_len = next_len;
        counter += 1;
    }

    Ok(written)
}

/// Decrypt an artifact, writing the original plaintext to `output`
///
/// # Errors
/// * `CryptoError::Authentication` for a wrong passphrase or tampered data
/// * `CryptoError::Truncated` / `TrailingData` for a damaged segment stream
pub fn decrypt<R: Read, W: Write>(
    input: &mut R,
    output: &mut W,
    passphrase: &str,
) -> Result<DecryptedArtifact, CryptoError> {
    let (header, header_bytes) = Header::read_from(input)?;
    let key = derive_key(passphrase.as_bytes(), &header)?;
    let cipher = SegmentCipher::new(header.cipher, &key)?;

    let mut sink = match header.compression {
        CompressionAlgo::None => PlainSink::Raw(output),
        CompressionAlgo::Zlib => PlainSink::Zlib(ZlibDecoder::new(output)),
    };

    let mut counter: u64 = 0;
    loop {
        let mut prefix = [0u8; 5];
        read_exact_or_truncated(input, &mut prefix)?;
        let last = match prefix[0] {
            0 => false,
            1 => true,
            other => {
                return Err(CryptoError::InvalidHeader(format!(
                    "invalid segment flag {other}"
                )))
            }
        };
        let len = u32::from_be_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]) as usize;
        if !(TAG_LEN..=SEGMENT_SIZE + TAG_LEN).contains(&len) {
            return Err(CryptoError::InvalidHeader(format!(
                "segment length {len} out of range"
            )));
        }

        let mut sealed = vec![0u8; len];
        read_exact_or_truncated(input, &mut sealed)?;

        let nonce = segment_nonce(&header.nonce, counter);
        let aad = segment_aad(&header_bytes, counter, last);
        let plain = cipher.open(&nonce, &sealed, &aad)?;
        sink.write_all(&plain)?;

        if last {
            break;
        }
        counter += 1;
    }

    let mut probe = [0u8; 1];
    if read_full(input, &mut probe)? != 0 {
        return Err(CryptoError::TrailingData);
    }
    sink.finish()?;

    Ok(DecryptedArtifact {
        filename: header.filename,
        cipher: header.cipher,
        digest: header.digest,
        compression: header.compression,
    })
}

enum PlainSink<'a, W: Write> {
    Raw(&'a mut W),
    Zlib(ZlibDecoder<&'a mut W>),
}

impl<W: Write> PlainSink<'_, W> {
    fn finish(self) -> io::Result<()> {
        match self {
            PlainSink::Raw(w) => w.flush(),
            PlainSink::Zlib(decoder) => decoder.finish()?.flush(),
        }
    }
}

impl<W: Write> Write for PlainSink<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            PlainSink::Raw(w) => w.write(buf),
            PlainSink::Zlib(d) => d.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            PlainSink::Raw(w) => w.flush(),
            PlainSink::Zlib(d) => d.flush(),
        }
    }
}

/// Read until `buf` is full or EOF, returning the number of bytes read
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn read_exact_or_truncated<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), CryptoError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CryptoError::Truncated
        } else {
            CryptoError::Io(e)
        }
    })
}
